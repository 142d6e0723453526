use std::cell::Cell;
use std::rc::Rc;

use vizij_motion_core::{Ease, Engine, LoopType, MotionHandle, UpdatePhase};

#[test]
fn ten_thousand_motions_complete_and_free_their_slots() {
    let mut engine = Engine::default();
    let completed = Rc::new(Cell::new(0usize));
    let checksum = Rc::new(Cell::new(0.0f64));
    let mut handles = Vec::with_capacity(10_000);
    for i in 0..10_000 {
        let done = Rc::clone(&completed);
        let sum = Rc::clone(&checksum);
        let duration = 0.5 + (i % 7) as f64 * 0.25;
        let h = engine
            .create(0.0f32, i as f32, duration)
            .with_ease(if i % 2 == 0 { Ease::OutQuad } else { Ease::Linear })
            .with_on_complete(move || done.set(done.get() + 1))
            .bind(move |v| sum.set(sum.get() + v as f64))
            .unwrap();
        handles.push(h);
    }
    assert_eq!(engine.motion_count(), 10_000);

    let mut ticks = 0;
    while engine.motion_count() > 0 {
        engine.update(UpdatePhase::Update, 1.0 / 60.0);
        ticks += 1;
        assert!(ticks < 1_000, "motions never drained");
    }
    assert_eq!(completed.get(), 10_000);
    assert!(handles.iter().all(|&h| !engine.is_active(h)));
    assert!(checksum.get() > 0.0);
    assert_eq!(engine.stats().callbacks, 0);
}

#[test]
fn mixed_removals_keep_every_survivor_reachable() {
    let mut engine = Engine::default();
    let handles: Vec<MotionHandle> = (0..500)
        .map(|i| {
            engine
                .create(0.0f32, 1.0, 1.0 + (i % 5) as f64)
                .with_loops(if i % 11 == 0 { -1 } else { 1 }, LoopType::Restart)
                .run()
                .unwrap()
        })
        .collect();
    // Cancel every third motion, then tick past the shortest durations.
    for h in handles.iter().step_by(3) {
        assert!(engine.cancel(*h));
    }
    engine.update(UpdatePhase::Update, 2.5);

    for (i, h) in handles.iter().enumerate() {
        let expect_live = i % 3 != 0 && (i % 11 == 0 || 1.0 + (i % 5) as f64 > 2.5);
        assert_eq!(engine.is_active(*h), expect_live, "motion {i}");
        if expect_live {
            assert_eq!(engine.time(*h), Some(2.5));
        }
    }

    // Freed slots are reused without disturbing live handles.
    let fresh: Vec<_> = (0..200)
        .map(|_| engine.create(0.0f32, 1.0, 1.0).run().unwrap())
        .collect();
    assert!(fresh.iter().all(|&h| engine.is_active(h)));
    assert!(fresh.iter().any(|h| handles.iter().any(|old| old.index == h.index)));
    for (i, h) in handles.iter().enumerate() {
        if engine.is_active(*h) {
            assert_eq!(engine.time(*h), Some(2.5), "motion {i}");
        }
    }
}
