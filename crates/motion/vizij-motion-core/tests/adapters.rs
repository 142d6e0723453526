use std::cell::RefCell;
use std::rc::Rc;

use vizij_motion_core::{
    ColorAdapter, Engine, IntegerOptions, NoOptions, PunchOptions, QuatAdapter, RoundingMode,
    ScrambleMode, TextOptions, UpdatePhase,
};

fn recorder<T: 'static>() -> (Rc<RefCell<Vec<T>>>, impl FnMut(T) + 'static) {
    let out = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&out);
    (out, move |v| sink.borrow_mut().push(v))
}

#[test]
fn integers_follow_rounding_mode() {
    let mut engine = Engine::default();
    let (even, sink_even) = recorder::<i32>();
    let (up, sink_up) = recorder::<i32>();
    engine.create(0i32, 5, 1.0).bind(sink_even).unwrap();
    engine
        .create(0i32, 5, 1.0)
        .with_options(IntegerOptions {
            rounding: RoundingMode::ToPositiveInfinity,
        })
        .bind(sink_up)
        .unwrap();
    for _ in 0..4 {
        engine.update(UpdatePhase::Update, 0.125);
    }
    // 0.625, 1.25, 1.875, 2.5
    assert_eq!(*even.borrow(), vec![1, 1, 2, 2]);
    assert_eq!(*up.borrow(), vec![1, 2, 2, 3]);
}

#[test]
fn vectors_and_colors_share_the_value_type() {
    let mut engine = Engine::default();
    let (pos, sink_pos) = recorder::<[f32; 4]>();
    let (col, sink_col) = recorder::<[f32; 4]>();
    let a = engine
        .create([0.0f32, 0.0, 0.0, 0.0], [2.0, 4.0, -2.0, 8.0], 1.0)
        .bind(sink_pos)
        .unwrap();
    let b = engine
        .create_with::<ColorAdapter, [f32; 4], NoOptions>(
            [0.0, 0.0, 0.0, 1.0],
            [2.0, 1.0, 0.5, 1.0],
            1.0,
        )
        .bind(sink_col)
        .unwrap();
    assert_ne!(a.storage, b.storage);
    engine.update(UpdatePhase::Update, 0.5);
    assert_eq!(pos.borrow()[0], [1.0, 2.0, -1.0, 4.0]);
    assert_eq!(col.borrow()[0], [1.0, 0.5, 0.25, 1.0]);
}

#[test]
fn quaternions_end_on_target_rotation() {
    let mut engine = Engine::default();
    let (rot, sink) = recorder::<[f32; 4]>();
    let half = std::f32::consts::FRAC_1_SQRT_2;
    engine
        .create_with::<QuatAdapter, [f32; 4], NoOptions>(
            [0.0, 0.0, 0.0, 1.0],
            [0.0, 0.0, half, half],
            1.0,
        )
        .bind(sink)
        .unwrap();
    engine.update(UpdatePhase::Update, 0.5);
    engine.update(UpdatePhase::Update, 0.5);
    let rot = rot.borrow();
    let mid = rot[0];
    let len: f32 = mid.iter().map(|c| c * c).sum::<f32>().sqrt();
    assert!((len - 1.0).abs() < 1e-5);
    assert!(mid[2] > 0.0 && mid[2] < half);
    assert_eq!(rot[1], [0.0, 0.0, half, half]);
}

#[test]
fn punch_returns_to_offset() {
    let mut engine = Engine::default();
    let (vals, sink) = recorder::<f32>();
    engine
        .punch(3.0f32, 1.0, 1.0)
        .with_options(PunchOptions {
            frequency: 3,
            damping_ratio: 0.5,
        })
        .bind(sink)
        .unwrap();
    for _ in 0..8 {
        engine.update(UpdatePhase::Update, 0.125);
    }
    let vals = vals.borrow();
    assert!(vals.iter().any(|v| (v - 3.0).abs() > 0.05));
    assert_eq!(vals.last().copied(), Some(3.0));
}

#[test]
fn shake_and_spring_settle() {
    let mut engine = Engine::default();
    let (shake, sink_shake) = recorder::<[f32; 2]>();
    let (spring, sink_spring) = recorder::<f32>();
    engine
        .shake([1.0f32, -1.0], [0.5, 0.5], 1.0)
        .bind(sink_shake)
        .unwrap();
    engine.spring(0.0f32, 10.0, 1.0).bind(sink_spring).unwrap();
    for _ in 0..4 {
        engine.update(UpdatePhase::Update, 0.25);
    }
    assert_eq!(shake.borrow().last().copied(), Some([1.0, -1.0]));
    assert_eq!(spring.borrow().last().copied(), Some(10.0));
}

#[test]
fn text_reveals_left_to_right() {
    let mut engine = Engine::default();
    let (text, sink) = recorder::<String>();
    engine
        .create(String::new(), "HELLO".to_string(), 1.0)
        .with_options(TextOptions {
            scramble: ScrambleMode::Numerals,
            seed: 7,
        })
        .bind(sink)
        .unwrap();
    engine.update(UpdatePhase::Update, 0.5);
    engine.update(UpdatePhase::Update, 0.5);
    let text = text.borrow();
    assert!(text[0].starts_with("HE"));
    assert_eq!(text[0].chars().count(), 3);
    assert!(text[0].chars().nth(2).is_some_and(|c| c.is_ascii_digit()));
    assert_eq!(text[1], "HELLO");
}
