// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collapsing header over a scrolling list, driven by a synthetic frame clock.
//!
//! The list reports its scroll gestures through the nested scroll protocol. The header
//! consumes them first, the content follows the header's bottom edge, and a fling that the
//! list does not consume collapses the header over several frames.
//!
//! Run:
//! - `cargo run -p understory_demos --example collapsing_header`

use kurbo::{Rect, Size, Vec2};
use understory_coordinator::{Axes, ChildId, Coordinator, LayoutSpec, Length, NodeFlags};
use understory_motion::{HeaderBehavior, HeaderSegment, ScrollFlags, ScrollingContentBehavior};

const FRAME_MS: f64 = 16.0;

/// Scroll position of the list's own content.
struct List {
    id: ChildId,
    scroll_y: f64,
    max_scroll_y: f64,
}

impl List {
    /// Scroll by `dy` the way a list does: pre-scroll, own scroll, then leftovers.
    fn drag(&mut self, coordinator: &mut Coordinator, dy: f64) {
        let pre = coordinator.nested_pre_scroll(self.id, Vec2::new(0.0, dy));
        let remaining = dy - pre.y;
        let target = (self.scroll_y + remaining).clamp(0.0, self.max_scroll_y);
        let own = target - self.scroll_y;
        self.scroll_y = target;
        let flags = if self.scroll_y > 0.0 {
            NodeFlags::NESTED_SCROLLING | NodeFlags::CAN_SCROLL_UP
        } else {
            NodeFlags::NESTED_SCROLLING
        };
        coordinator.set_flags(self.id, flags);
        coordinator.nested_scroll(
            self.id,
            Vec2::new(0.0, own),
            Vec2::new(0.0, remaining - own),
        );
        println!(
            "drag {dy:>6.1}: header took {:>6.1}, list scrolled {own:>6.1} (list at {:.1})",
            pre.y, self.scroll_y
        );
    }
}

fn print_rects(coordinator: &Coordinator, header: ChildId, content: ChildId, label: &str) {
    let h = coordinator.rect(header).unwrap_or(Rect::ZERO);
    let c = coordinator.rect(content).unwrap_or(Rect::ZERO);
    println!(
        "{label:<12} header y {:>7.1}..{:>6.1}   content top {:>6.1}",
        h.y0, h.y1, c.y0
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .init();

    let mut coordinator = Coordinator::default();
    let header = coordinator
        .add_child(LayoutSpec {
            width: Length::MatchParent,
            ..LayoutSpec::with_behavior(HeaderBehavior::new([
                HeaderSegment::new(
                    200.0,
                    ScrollFlags::SCROLL | ScrollFlags::EXIT_UNTIL_COLLAPSED | ScrollFlags::SNAP,
                )
                .with_min_height(56.0),
                HeaderSegment::new(48.0, ScrollFlags::empty()),
            ]))
        })
        .expect("header spec is valid");
    let content = coordinator
        .add_child(LayoutSpec {
            width: Length::MatchParent,
            height: Length::MatchParent,
            ..LayoutSpec::with_behavior(ScrollingContentBehavior::default())
        })
        .expect("content spec is valid");
    let list_id = coordinator
        .add_descendant(content, Rect::new(0.0, 0.0, 360.0, 536.0))
        .expect("content is live");
    coordinator.set_flags(list_id, NodeFlags::NESTED_SCROLLING);

    coordinator.with_behavior::<HeaderBehavior, _>(header, |h, _| {
        h.set_offset_listener(|offset| println!("  header offset {offset:.1}"));
    });

    coordinator
        .layout_pass(Size::new(360.0, 640.0))
        .expect("layout succeeds");
    print_rects(&coordinator, header, content, "laid out");

    let mut list = List {
        id: list_id,
        scroll_y: 0.0,
        max_scroll_y: 2000.0,
    };

    // Scroll up a little and let go: the snapping segment settles on its nearest edge.
    coordinator.start_nested_scroll(list.id, Axes::VERTICAL);
    for dy in [20.0, 30.0, 40.0] {
        list.drag(&mut coordinator, dy);
    }
    coordinator.stop_nested_scroll(list.id);
    run_frames(&mut coordinator, header, content, "snap");

    // Scroll up far: the header collapses to its pinned part, then the list scrolls.
    coordinator.start_nested_scroll(list.id, Axes::VERTICAL);
    for dy in [60.0, 80.0, 100.0] {
        list.drag(&mut coordinator, dy);
    }
    coordinator.stop_nested_scroll(list.id);
    print_rects(&coordinator, header, content, "collapsed");

    // Pull back down past the top of the list: the leftovers expand the header.
    coordinator.start_nested_scroll(list.id, Axes::VERTICAL);
    for dy in [-120.0, -100.0, -100.0] {
        list.drag(&mut coordinator, dy);
    }
    coordinator.stop_nested_scroll(list.id);
    run_frames(&mut coordinator, header, content, "expand");

    // A fling the list cannot use collapses the header over several frames.
    coordinator.start_nested_scroll(list.id, Axes::VERTICAL);
    if !coordinator.nested_pre_fling(list.id, Vec2::new(0.0, 3000.0)) {
        coordinator.nested_fling(list.id, Vec2::new(0.0, 3000.0), false);
    }
    coordinator.stop_nested_scroll(list.id);
    run_frames(&mut coordinator, header, content, "fling");

    coordinator.with_behavior::<HeaderBehavior, _>(header, |h, ctx| h.set_expanded(ctx, true, true));
    run_frames(&mut coordinator, header, content, "expand");
}

fn run_frames(coordinator: &mut Coordinator, header: ChildId, content: ChildId, label: &str) {
    let mut frames = 0;
    while coordinator.is_animating() {
        coordinator.frame(FRAME_MS);
        frames += 1;
        print_rects(coordinator, header, content, &format!("{label} #{frames}"));
    }
}
