use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vizij_motion_core::{
    Config, Ease, Engine, MotionHandle, MotionHandleGroup, MotionStatus, TickTime, TimeKind,
    UpdatePhase,
};

fn recorder<T: 'static>() -> (Rc<RefCell<Vec<T>>>, impl FnMut(T) + 'static) {
    let out = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&out);
    (out, move |v| sink.borrow_mut().push(v))
}

fn counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
    let n = Rc::new(Cell::new(0));
    let c = Rc::clone(&n);
    (n, move || c.set(c.get() + 1))
}

#[test]
fn canceled_handle_goes_stale() {
    let mut engine = Engine::default();
    let (_, sink) = recorder::<f32>();
    let h = engine.create(0.0f32, 1.0, 1.0).bind(sink).unwrap();
    assert!(h.is_active(&engine));
    assert!(h.cancel(&mut engine));
    assert!(!h.is_active(&engine));

    // Every operation on a stale handle is a no-op.
    assert!(!engine.cancel(h));
    assert!(!engine.complete(h));
    assert!(!engine.set_time(h, 0.5));
    assert!(!engine.set_playback_speed(h, 2.0));
    assert!(!engine.pause(h));
    assert_eq!(engine.time(h), None);
    assert_eq!(engine.status(h), None);

    // The slot is reused under a new version; the old handle stays dead.
    let fresh = engine.create(0.0f32, 1.0, 1.0).run().unwrap();
    assert_eq!(fresh.index, h.index);
    assert_ne!(fresh.version, h.version);
    assert!(fresh.is_active(&engine));
    assert!(!h.is_active(&engine));
}

#[test]
fn default_handle_never_resolves() {
    let mut engine = Engine::default();
    engine.create(0.0f32, 1.0, 1.0).run().unwrap();
    let h = MotionHandle::default();
    assert!(!engine.is_active(h));
    assert!(!engine.cancel(h));
}

#[test]
fn progress_is_monotonic_without_seeks() {
    let mut engine = Engine::default();
    let (values, sink) = recorder::<f32>();
    engine
        .create(0.0f32, 100.0, 2.0)
        .with_ease(Ease::InOutCubic)
        .bind(sink)
        .unwrap();
    for _ in 0..40 {
        engine.update(UpdatePhase::Update, 0.07);
    }
    let values = values.borrow();
    assert!(values.len() > 20);
    for w in values.windows(2) {
        assert!(w[1] >= w[0], "{} then {}", w[0], w[1]);
    }
}

#[test]
fn completion_emits_exact_end_value() {
    for ease in [Ease::Linear, Ease::OutBack, Ease::InOutElastic, Ease::OutBounce] {
        let mut engine = Engine::default();
        let (values, sink) = recorder::<f32>();
        let (completed, on_complete) = counter();
        let h = engine
            .create(0.0f32, 10.0, 1.0)
            .with_ease(ease)
            .with_on_complete(on_complete)
            .bind(sink)
            .unwrap();
        // 0.3 does not divide the duration; the last tick overshoots.
        for _ in 0..4 {
            engine.update(UpdatePhase::Update, 0.3);
        }
        assert_eq!(values.borrow().last().copied(), Some(10.0), "{ease:?}");
        assert_eq!(completed.get(), 1);
        assert!(!h.is_active(&engine));
        assert_eq!(engine.motion_count(), 0);
    }
}

#[test]
fn cancel_during_delay_fires_cancel_only() {
    let mut engine = Engine::default();
    let (values, sink) = recorder::<f32>();
    let (completed, on_complete) = counter();
    let (canceled, on_cancel) = counter();
    let h = engine
        .create(0.0f32, 1.0, 1.0)
        .with_delay(1.0)
        .with_on_complete(on_complete)
        .with_on_cancel(on_cancel)
        .bind(sink)
        .unwrap();
    engine.update(UpdatePhase::Update, 0.5);
    assert_eq!(engine.status(h), Some(MotionStatus::Delayed));
    assert!(engine.cancel(h));
    assert_eq!(canceled.get(), 1);
    assert_eq!(completed.get(), 0);
    assert!(values.borrow().is_empty());
    assert!(!engine.is_active(h));
}

#[test]
fn complete_forces_end_value() {
    let mut engine = Engine::default();
    let (values, sink) = recorder::<f32>();
    let (completed, on_complete) = counter();
    let h = engine
        .create(-5.0f32, 5.0, 2.0)
        .with_on_complete(on_complete)
        .bind(sink)
        .unwrap();
    engine.update(UpdatePhase::Update, 0.3);
    assert!(h.complete(&mut engine));
    assert_eq!(values.borrow().last().copied(), Some(5.0));
    assert_eq!(completed.get(), 1);
    assert!(!h.is_active(&engine));
}

#[test]
fn values_during_delay_follow_skip_flag() {
    let mut engine = Engine::default();
    let (skipped, sink_a) = recorder::<f32>();
    let (emitted, sink_b) = recorder::<f32>();
    engine
        .create(3.0f32, 4.0, 1.0)
        .with_delay(1.0)
        .bind(sink_a)
        .unwrap();
    engine
        .create(3.0f32, 4.0, 1.0)
        .with_delay(1.0)
        .with_skip_values_during_delay(false)
        .bind(sink_b)
        .unwrap();
    engine.update(UpdatePhase::Update, 0.5);
    assert!(skipped.borrow().is_empty());
    assert_eq!(*emitted.borrow(), vec![3.0]);
}

#[test]
fn zero_duration_completes_on_first_tick() {
    let mut engine = Engine::default();
    let (values, sink) = recorder::<f32>();
    let h = engine.create(1.0f32, 2.0, 0.0).bind(sink).unwrap();
    assert_eq!(engine.status(h), Some(MotionStatus::Scheduled));
    engine.update(UpdatePhase::Update, 0.016);
    assert_eq!(*values.borrow(), vec![2.0]);
    assert!(!h.is_active(&engine));
}

#[test]
fn preserved_motion_outlives_completion() {
    let mut engine = Engine::default();
    let (canceled, on_cancel) = counter();
    let h = engine
        .create(0.0f32, 1.0, 1.0)
        .with_delay(0.5)
        .with_preserve()
        .with_on_cancel(on_cancel)
        .run()
        .unwrap();
    engine.update(UpdatePhase::Update, 2.0);
    assert!(h.is_active(&engine));
    assert!(!h.is_playing(&engine));
    assert_eq!(engine.status(h), Some(MotionStatus::Completed));
    assert_eq!(engine.total_duration(h), Some(1.5));
    assert_eq!(engine.time(h), Some(1.5));

    // Completed motions cannot complete again; cancel just releases.
    assert!(!engine.complete(h));
    assert!(engine.cancel(h));
    assert_eq!(canceled.get(), 0);
    assert!(!h.is_active(&engine));
}

#[test]
fn pause_resume_and_playback_speed() {
    let mut engine = Engine::default();
    let h = engine.create(0.0f32, 1.0, 4.0).run().unwrap();
    engine.update(UpdatePhase::Update, 0.25);
    assert!(h.pause(&mut engine));
    assert!(!h.is_playing(&engine));
    engine.update(UpdatePhase::Update, 0.25);
    assert_eq!(h.time(&engine), Some(0.25));
    assert!(h.resume(&mut engine));

    assert!(h.set_playback_speed(&mut engine, 2.0));
    engine.update(UpdatePhase::Update, 0.25);
    assert_eq!(h.time(&engine), Some(0.75));

    h.set_playback_speed(&mut engine, 0.0);
    engine.update(UpdatePhase::Update, 0.25);
    assert_eq!(h.time(&engine), Some(0.75));

    h.set_playback_speed(&mut engine, -1.0);
    engine.update(UpdatePhase::Update, 0.5);
    assert_eq!(h.time(&engine), Some(0.25));
    engine.update(UpdatePhase::Update, 1.0);
    assert_eq!(h.time(&engine), Some(0.0));
    assert_eq!(h.playback_speed(&engine), Some(-1.0));
    assert!(h.is_active(&engine));
}

#[test]
fn phases_and_time_kinds_select_their_clock() {
    let mut engine = Engine::default();
    let manual = engine
        .create(0.0f32, 1.0, 4.0)
        .with_phase(UpdatePhase::Manual)
        .run()
        .unwrap();
    let late = engine
        .create(0.0f32, 1.0, 4.0)
        .with_phase(UpdatePhase::LateUpdate)
        .run()
        .unwrap();
    let unscaled = engine
        .create(0.0f32, 1.0, 4.0)
        .with_time_kind(TimeKind::Unscaled)
        .run()
        .unwrap();
    assert_eq!(engine.motion_count_in(UpdatePhase::Update), 1);
    assert_eq!(engine.motion_count_in(UpdatePhase::LateUpdate), 1);
    assert_eq!(engine.phase(manual), Some(UpdatePhase::Manual));

    engine.update_frame(TickTime {
        delta: 0.0,
        unscaled_delta: 0.5,
        realtime_delta: 0.0,
    });
    assert_eq!(engine.time(unscaled), Some(0.5));
    assert_eq!(engine.time(late), Some(0.0));
    assert_eq!(engine.time(manual), Some(0.0));

    engine.update_frame(0.25);
    assert_eq!(engine.time(late), Some(0.25));
    assert_eq!(engine.time(manual), Some(0.0));

    engine.update(UpdatePhase::Manual, 1.0);
    assert_eq!(engine.time(manual), Some(1.0));
}

#[test]
fn config_defaults_apply_to_builders() {
    let cfg = Config::from_json(r#"{ "default_phase": "LateUpdate", "skip_values_during_delay": false }"#)
        .unwrap();
    let mut engine = Engine::new(cfg);
    let (values, sink) = recorder::<f32>();
    let h = engine
        .create(7.0f32, 8.0, 1.0)
        .with_delay(1.0)
        .bind(sink)
        .unwrap();
    assert_eq!(engine.motion_count_in(UpdatePhase::LateUpdate), 1);
    engine.update(UpdatePhase::Update, 0.5);
    assert!(values.borrow().is_empty());
    engine.update(UpdatePhase::LateUpdate, 0.5);
    assert_eq!(*values.borrow(), vec![7.0]);
    assert_eq!(engine.status(h), Some(MotionStatus::Delayed));
}

#[test]
fn builder_rejects_bad_timing() {
    let mut engine = Engine::default();
    assert!(engine.create(0.0f32, 1.0, -1.0).run().is_err());
    assert!(engine.create(0.0f32, 1.0, f64::INFINITY).run().is_err());
    assert!(engine.create(0.0f32, 1.0, 1.0).with_delay(f64::NAN).run().is_err());
    assert!(engine
        .create(0.0f32, 1.0, 1.0)
        .with_playback_speed(f32::INFINITY)
        .run()
        .is_err());
    assert_eq!(engine.motion_count(), 0);
}

#[test]
fn completions_dispatch_in_creation_order() {
    let mut engine = Engine::default();
    let order = Rc::new(RefCell::new(Vec::new()));
    for i in 0..3 {
        let order = Rc::clone(&order);
        engine
            .create(0.0f32, 1.0, 0.5)
            .with_on_complete(move || order.borrow_mut().push(i))
            .run()
            .unwrap();
    }
    engine.update(UpdatePhase::Update, 1.0);
    assert_eq!(*order.borrow(), vec![0, 1, 2]);
}

#[test]
fn group_cancels_only_live_members() {
    let mut engine = Engine::default();
    let (canceled, on_cancel) = counter();
    let short = engine.create(0.0f32, 1.0, 0.5).run().unwrap();
    let mut group: MotionHandleGroup = (0..3)
        .map(|_| engine.create(0.0f32, 1.0, 2.0).run().unwrap())
        .collect();
    group.add(short);
    group.add(
        engine
            .create(0.0f32, 1.0, 2.0)
            .with_on_cancel(on_cancel)
            .run()
            .unwrap(),
    );
    engine.update(UpdatePhase::Update, 1.0);
    assert!(group.any_active(&engine));
    group.retain_active(&engine);
    assert_eq!(group.len(), 4);
    assert_eq!(group.cancel_all(&mut engine), 4);
    assert!(group.is_empty());
    assert_eq!(canceled.get(), 1);
    assert_eq!(engine.motion_count(), 0);
}

#[test]
fn bind_with_state_threads_state_through_sink() {
    let mut engine = Engine::default();
    let total = Rc::new(Cell::new(0.0f32));
    let out = Rc::clone(&total);
    engine
        .create(0.0f32, 1.0, 1.0)
        .bind_with_state(0u32, move |v, ticks: &mut u32| {
            *ticks += 1;
            out.set(v * *ticks as f32);
        })
        .unwrap();
    engine.update(UpdatePhase::Update, 0.5);
    engine.update(UpdatePhase::Update, 0.5);
    assert_eq!(total.get(), 2.0);
}
