// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bottom sheet dragged by pointer and by its own list, driven by a synthetic frame clock.
//!
//! Run:
//! - `cargo run -p understory_demos --example bottom_sheet`

use kurbo::{Point, Rect, Size, Vec2};
use understory_coordinator::{
    Axes, ChildId, Coordinator, LayoutSpec, Length, NodeFlags, PointerEvent,
};
use understory_motion::{PeekHeight, SheetBehavior, SheetConfig, SheetState};

const FRAME_MS: f64 = 16.0;

fn sheet_top(coordinator: &Coordinator, sheet: ChildId) -> f64 {
    coordinator.rect(sheet).map_or(f64::NAN, |r| r.y0)
}

fn settle(coordinator: &mut Coordinator, sheet: ChildId, label: &str) {
    let mut frames = 0;
    while coordinator.is_animating() {
        coordinator.frame(FRAME_MS);
        frames += 1;
    }
    let state = coordinator
        .behavior::<SheetBehavior>(sheet)
        .map(SheetBehavior::state);
    println!(
        "{label}: settled in {frames} frames at top {:.1}, {state:?}",
        sheet_top(coordinator, sheet)
    );
}

/// A press at `from`, moved to `to` over `steps` frames, released without pausing.
fn fling(coordinator: &mut Coordinator, from: f64, to: f64, steps: u64) {
    let mut t = 0;
    let down = PointerEvent::down(Point::new(200.0, from), t);
    if !coordinator.on_intercept_pointer(&down) {
        coordinator.on_pointer(&down);
    }
    for i in 1..=steps {
        t += 16;
        let y = from + (to - from) * i as f64 / steps as f64;
        coordinator.on_pointer(&PointerEvent::moved(Point::new(200.0, y), t));
    }
    coordinator.on_pointer(&PointerEvent::up(Point::new(200.0, to), t + 4));
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .init();

    let mut coordinator = Coordinator::default();
    let sheet = coordinator
        .add_child(LayoutSpec {
            width: Length::MatchParent,
            height: Length::MatchParent,
            ..LayoutSpec::with_behavior(SheetBehavior::new(SheetConfig {
                peek_height: PeekHeight::Fixed(160.0),
                hideable: true,
                ..SheetConfig::default()
            }))
        })
        .expect("sheet spec is valid");
    let list = coordinator
        .add_descendant(sheet, Rect::new(0.0, 48.0, 400.0, 720.0))
        .expect("sheet is live");
    coordinator.set_flags(list, NodeFlags::NESTED_SCROLLING);

    coordinator.with_behavior::<SheetBehavior, _>(sheet, |b, _| {
        b.set_state_listener(|state| println!("  state -> {state:?}"));
        b.set_slide_listener(|slide| println!("  slide {slide:+.3}"));
    });

    coordinator
        .layout_pass(Size::new(400.0, 720.0))
        .expect("layout succeeds");
    println!("collapsed at top {:.1}", sheet_top(&coordinator, sheet));

    // Flick the handle upwards: an upward release always expands.
    fling(&mut coordinator, 600.0, 500.0, 4);
    settle(&mut coordinator, sheet, "flick up");

    // The list pulls the sheet down from expanded; a downward stop collapses it.
    coordinator.start_nested_scroll(list, Axes::VERTICAL);
    for dy in [-40.0, -60.0, -80.0] {
        let consumed = coordinator.nested_pre_scroll(list, Vec2::new(0.0, dy));
        println!("list pull {dy:>6.1}: sheet took {:>6.1}", consumed.y);
    }
    coordinator.stop_nested_scroll(list);
    settle(&mut coordinator, sheet, "list pull");

    // A fast downward flick past the peek hides the sheet.
    fling(&mut coordinator, 600.0, 700.0, 2);
    settle(&mut coordinator, sheet, "flick down");

    // Bring it back programmatically.
    let result = coordinator
        .with_behavior::<SheetBehavior, _>(sheet, |b, ctx| b.set_state(ctx, SheetState::Collapsed));
    println!("set_state(Collapsed) -> {result:?}");
    settle(&mut coordinator, sheet, "programmatic");

    let rejected = coordinator
        .with_behavior::<SheetBehavior, _>(sheet, |b, ctx| b.set_state(ctx, SheetState::Settling));
    println!("set_state(Settling) -> {rejected:?}");
}
