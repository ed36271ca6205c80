use log::debug;

use crate::events::ReaderEvent;
use crate::layout::LayoutSurface;
use crate::loader::ChapterLoader;
use crate::locator::LocatorService;
use crate::navigation::Navigation;

/// A flick must finish within this window...
const FLICK_WINDOW_MS: u64 = 250;
/// ...and travel at least this far horizontally.
const FLICK_DISTANCE_PX: f32 = 20.0;

/// One touch interaction, created on start, mutated on move, consumed on
/// end/cancel.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSample {
    pub start_x: f32,
    pub start_y: f32,
    pub start_time_ms: u64,
    pub delta_x: Option<f32>,
    pub delta_y: Option<f32>,
    /// Set on the first move: `|dx| < |dy|` hands the interaction over to
    /// vertical scrolling and suppresses horizontal paging for its duration.
    pub vertical_lock: Option<bool>,
}

/// What the ended interaction landed on, as classified by the host's event
/// capture layer (raw hit-testing stays outside this core).
#[derive(Debug, Clone, Default)]
pub struct TapTarget {
    pub is_image: bool,
    pub inside_link: bool,
    pub image_src: Option<String>,
}

impl TapTarget {
    pub fn image(src: Option<String>) -> Self {
        Self {
            is_image: true,
            inside_link: false,
            image_src: src,
        }
    }

    pub fn other() -> Self {
        Self::default()
    }

    fn takes_double_tap(&self) -> bool {
        self.is_image && !self.inside_link
    }
}

/// How an ended interaction was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    SwipeNext,
    SwipePrev,
    /// A swipe at the edge of the book; the drag was rolled back.
    SwipeRejected,
    /// First tap on an image; a second within the double-tap window upgrades
    /// it, otherwise `tick` emits the unhandled-tap signal.
    PendingTap,
    /// Second tap on an image within the window.
    DoubleTap,
    /// Unhandled tap, emitted immediately.
    Tap,
    /// Horizontal drag that didn't qualify as a swipe; snapped back.
    SnapBack,
    Ignored,
}

/// Disposition of a move sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDisposition {
    /// Multi-touch or pinch; not ours.
    Ignored,
    /// Vertical scroll owns this interaction.
    VerticalScroll,
    /// Horizontal drag: default scrolling must be prevented, the surface is
    /// dragged live.
    Drag,
}

#[derive(Debug, Clone)]
struct PendingTap {
    x: f32,
    y: f32,
    time_ms: u64,
    deadline_ms: u64,
}

/// Classifies raw touch samples into navigation intents and drives the
/// controller. One instance per input surface; state is one interaction plus
/// an optional pending double-tap deadline polled via [`tick`].
///
/// [`tick`]: GestureClassifier::tick
#[derive(Debug, Default)]
pub struct GestureClassifier {
    sample: Option<GestureSample>,
    /// Reader offset captured on start; swipes that fail at a book edge and
    /// drags that don't qualify roll back to it.
    anchor_offset: f32,
    pending_tap: Option<PendingTap>,
}

impl GestureClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking an interaction and capture the rollback anchor.
    pub fn start<S, L, C>(&mut self, nav: &Navigation<S, L, C>, x: f32, y: f32, time_ms: u64)
    where
        S: LayoutSurface,
        L: LocatorService,
        C: ChapterLoader,
    {
        self.sample = Some(GestureSample {
            start_x: x,
            start_y: y,
            start_time_ms: time_ms,
            delta_x: None,
            delta_y: None,
            vertical_lock: None,
        });
        self.anchor_offset = nav.page_position();
    }

    /// Track a move sample. `touch_count`/`pinch_scale` come from the raw
    /// event; anything that looks like a pinch is ignored outright.
    pub fn track<S, L, C>(
        &mut self,
        nav: &mut Navigation<S, L, C>,
        x: f32,
        y: f32,
        touch_count: usize,
        pinch_scale: Option<f32>,
    ) -> MoveDisposition
    where
        S: LayoutSurface,
        L: LocatorService,
        C: ChapterLoader,
    {
        if touch_count > 1 || pinch_scale.is_some_and(|s| s != 1.0) {
            return MoveDisposition::Ignored;
        }
        let Some(sample) = self.sample.as_mut() else {
            return MoveDisposition::Ignored;
        };

        let dx = x - sample.start_x;
        let dy = y - sample.start_y;
        sample.delta_x = Some(dx);
        sample.delta_y = Some(dy);
        // Direction decision runs once per interaction.
        if sample.vertical_lock.is_none() {
            sample.vertical_lock = Some(dx.abs() < dy.abs());
        }
        if sample.vertical_lock == Some(true) {
            return MoveDisposition::VerticalScroll;
        }

        nav.set_page_position(self.anchor_offset + dx, 0);
        MoveDisposition::Drag
    }

    /// Finish the interaction and act on the classification.
    pub fn end<S, L, C>(
        &mut self,
        nav: &mut Navigation<S, L, C>,
        target: &TapTarget,
        time_ms: u64,
    ) -> GestureOutcome
    where
        S: LayoutSurface,
        L: LocatorService,
        C: ChapterLoader,
    {
        let Some(sample) = self.sample.take() else {
            return GestureOutcome::Ignored;
        };
        let is_short = time_ms.saturating_sub(sample.start_time_ms) < FLICK_WINDOW_MS;

        // Page turn: short flick, or a drag across more than half the page.
        if let Some(dx) = sample.delta_x {
            let flick = is_short && dx.abs() > FLICK_DISTANCE_PX;
            let dragged_past = dx.abs() > nav.page_width() / 2.0;
            if flick || dragged_past {
                let result = if dx < 0.0 { nav.next() } else { nav.prev() };
                return match result {
                    Ok(()) if dx < 0.0 => GestureOutcome::SwipeNext,
                    Ok(()) => GestureOutcome::SwipePrev,
                    Err(err) => {
                        debug!("swipe rejected at book edge: {err}");
                        self.rollback(nav);
                        GestureOutcome::SwipeRejected
                    }
                };
            }
        }

        // Not a page turn: a horizontal drag snaps back to where it started.
        let snapped = sample.delta_x.is_some() && sample.vertical_lock != Some(true);
        if snapped {
            self.rollback(nav);
        }

        if is_short {
            if target.takes_double_tap() {
                if self.pending_tap.take().is_some() {
                    nav.events_mut().push(ReaderEvent::ImageSelected {
                        src: target.image_src.clone(),
                    });
                    return GestureOutcome::DoubleTap;
                }
                self.pending_tap = Some(PendingTap {
                    x: sample.start_x,
                    y: sample.start_y,
                    time_ms: sample.start_time_ms,
                    deadline_ms: time_ms + nav.preferences().double_tap_delay_ms,
                });
                return GestureOutcome::PendingTap;
            }
            nav.events_mut().push(ReaderEvent::UnhandledTap {
                x: sample.start_x,
                y: sample.start_y,
                time_ms: sample.start_time_ms,
            });
            return GestureOutcome::Tap;
        }

        if snapped {
            GestureOutcome::SnapBack
        } else {
            GestureOutcome::Ignored
        }
    }

    /// Interaction canceled by the platform; handled exactly like `end` on a
    /// non-image target.
    pub fn cancel<S, L, C>(&mut self, nav: &mut Navigation<S, L, C>, time_ms: u64) -> GestureOutcome
    where
        S: LayoutSurface,
        L: LocatorService,
        C: ChapterLoader,
    {
        self.end(nav, &TapTarget::other(), time_ms)
    }

    /// Poll the double-tap deadline. Once it passes with no second tap, the
    /// held-back tap is released as an unhandled-tap signal.
    pub fn tick<S, L, C>(&mut self, nav: &mut Navigation<S, L, C>, now_ms: u64)
    where
        S: LayoutSurface,
        L: LocatorService,
        C: ChapterLoader,
    {
        if let Some(pending) = self.pending_tap.take() {
            if now_ms < pending.deadline_ms {
                self.pending_tap = Some(pending);
                return;
            }
            nav.events_mut().push(ReaderEvent::UnhandledTap {
                x: pending.x,
                y: pending.y,
                time_ms: pending.time_ms,
            });
        }
    }

    /// Drop the tracked interaction and any pending double-tap.
    pub fn reset(&mut self) {
        self.sample = None;
        self.pending_tap = None;
    }

    fn rollback<S, L, C>(&self, nav: &mut Navigation<S, L, C>)
    where
        S: LayoutSurface,
        L: LocatorService,
        C: ChapterLoader,
    {
        let duration = nav.preferences().transition_duration_ms;
        nav.set_page_position(self.anchor_offset, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;
    use crate::sim::{SimBook, SimulatedLoader, SimulatedLocators, SimulatedSurface};
    use crate::spine::{ChapterRef, Spine};

    const STRIDE: f32 = 620.0;

    type SimNavigation = Navigation<SimulatedSurface, SimulatedLocators, SimulatedLoader>;

    fn nav() -> SimNavigation {
        let (surface, locators, loader) = SimBook::new()
            .page_box(600.0, 20.0, 1)
            .chapter_with_extent(3.0 * STRIDE)
            .chapter_with_extent(2.0 * STRIDE)
            .build();
        let spine = Spine::new(vec![
            ChapterRef::new("chapter1.xhtml", true, 100),
            ChapterRef::new("chapter2.xhtml", true, 100),
        ]);
        let mut nav = Navigation::new(spine, surface, locators, loader, Preferences::default());
        nav.recompute_page_count();
        nav
    }

    fn swipe(
        classifier: &mut GestureClassifier,
        nav: &mut SimNavigation,
        dx: f32,
        dy: f32,
        duration_ms: u64,
    ) -> GestureOutcome {
        classifier.start(nav, 300.0, 400.0, 1_000);
        classifier.track(nav, 300.0 + dx, 400.0 + dy, 1, None);
        classifier.end(nav, &TapTarget::other(), 1_000 + duration_ms)
    }

    #[test]
    fn quick_flick_turns_the_page() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();

        let outcome = swipe(&mut classifier, &mut nav, -30.0, 0.0, 100);
        assert_eq!(outcome, GestureOutcome::SwipeNext);
        assert_eq!(nav.page(), 1);
    }

    #[test]
    fn slow_drag_past_half_page_still_turns() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();

        // 0.6 of the page width, well past the 250 ms flick window.
        let outcome = swipe(&mut classifier, &mut nav, -360.0, 0.0, 400);
        assert_eq!(outcome, GestureOutcome::SwipeNext);
        assert_eq!(nav.page(), 1);
    }

    #[test]
    fn positive_delta_swipes_backward() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();
        nav.load_page(crate::page::PageTarget::Absolute(2), false);

        let outcome = swipe(&mut classifier, &mut nav, 30.0, 0.0, 100);
        assert_eq!(outcome, GestureOutcome::SwipePrev);
        assert_eq!(nav.page(), 1);
    }

    #[test]
    fn tiny_diagonal_tap_is_never_a_swipe() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();

        let outcome = swipe(&mut classifier, &mut nav, 5.0, 5.0, 100);
        assert_ne!(outcome, GestureOutcome::SwipeNext);
        assert_ne!(outcome, GestureOutcome::SwipePrev);
        assert_eq!(nav.page(), 0);
    }

    #[test]
    fn swipe_at_book_start_rolls_back() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();

        let outcome = swipe(&mut classifier, &mut nav, 30.0, 0.0, 100);
        assert_eq!(outcome, GestureOutcome::SwipeRejected);
        assert_eq!(nav.page(), 0);
        assert_eq!(nav.page_position(), 0.0);
        // Rollback animates with the configured transition.
        assert_eq!(
            nav.surface().last_scroll_duration(),
            nav.preferences().transition_duration_ms
        );
    }

    #[test]
    fn vertical_first_move_locks_out_the_drag() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();

        classifier.start(&nav, 300.0, 400.0, 1_000);
        let disposition = classifier.track(&mut nav, 302.0, 480.0, 1, None);
        assert_eq!(disposition, MoveDisposition::VerticalScroll);
        // The surface never moved.
        assert_eq!(nav.page_position(), 0.0);
    }

    #[test]
    fn pinch_moves_are_ignored() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();

        classifier.start(&nav, 300.0, 400.0, 1_000);
        assert_eq!(
            classifier.track(&mut nav, 350.0, 400.0, 2, None),
            MoveDisposition::Ignored
        );
        assert_eq!(
            classifier.track(&mut nav, 350.0, 400.0, 1, Some(1.4)),
            MoveDisposition::Ignored
        );
    }

    #[test]
    fn short_drag_snaps_back_without_turning() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();

        classifier.start(&nav, 300.0, 400.0, 1_000);
        classifier.track(&mut nav, 200.0, 400.0, 1, None);
        assert_eq!(nav.page_position(), -100.0);

        // 100 px in 400 ms: neither flick nor past half the page.
        let outcome = classifier.end(&mut nav, &TapTarget::other(), 1_400);
        assert_eq!(outcome, GestureOutcome::SnapBack);
        assert_eq!(nav.page(), 0);
        assert_eq!(nav.page_position(), 0.0);
    }

    #[test]
    fn plain_tap_emits_unhandled_tap_immediately() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();

        classifier.start(&nav, 120.0, 240.0, 1_000);
        let outcome = classifier.end(&mut nav, &TapTarget::other(), 1_050);
        assert_eq!(outcome, GestureOutcome::Tap);
        assert_eq!(
            nav.drain_events(),
            vec![ReaderEvent::UnhandledTap {
                x: 120.0,
                y: 240.0,
                time_ms: 1_000,
            }]
        );
    }

    #[test]
    fn double_tap_on_image_selects_it() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();
        let image = TapTarget::image(Some("images/map.png".to_string()));

        classifier.start(&nav, 100.0, 100.0, 1_000);
        assert_eq!(
            classifier.end(&mut nav, &image, 1_050),
            GestureOutcome::PendingTap
        );
        assert!(nav.drain_events().is_empty());

        classifier.start(&nav, 100.0, 100.0, 1_150);
        assert_eq!(
            classifier.end(&mut nav, &image, 1_200),
            GestureOutcome::DoubleTap
        );
        assert_eq!(
            nav.drain_events(),
            vec![ReaderEvent::ImageSelected {
                src: Some("images/map.png".to_string()),
            }]
        );

        // The pending tap was consumed; the deadline no longer fires.
        classifier.tick(&mut nav, 10_000);
        assert!(nav.drain_events().is_empty());
    }

    #[test]
    fn lone_image_tap_surfaces_after_the_delay() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();
        let image = TapTarget::image(None);

        classifier.start(&nav, 100.0, 100.0, 1_000);
        classifier.end(&mut nav, &image, 1_050);

        // Before the deadline nothing fires.
        classifier.tick(&mut nav, 1_100);
        assert!(nav.drain_events().is_empty());

        let deadline = 1_050 + nav.preferences().double_tap_delay_ms;
        classifier.tick(&mut nav, deadline);
        assert_eq!(
            nav.drain_events(),
            vec![ReaderEvent::UnhandledTap {
                x: 100.0,
                y: 100.0,
                time_ms: 1_000,
            }]
        );
    }

    #[test]
    fn image_inside_link_is_a_plain_tap() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();
        let linked_image = TapTarget {
            is_image: true,
            inside_link: true,
            image_src: None,
        };

        classifier.start(&nav, 100.0, 100.0, 1_000);
        assert_eq!(
            classifier.end(&mut nav, &linked_image, 1_050),
            GestureOutcome::Tap
        );
    }

    #[test]
    fn cancel_behaves_like_end() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();

        classifier.start(&nav, 300.0, 400.0, 1_000);
        classifier.track(&mut nav, 270.0, 400.0, 1, None);
        let outcome = classifier.cancel(&mut nav, 1_100);
        assert_eq!(outcome, GestureOutcome::SwipeNext);
        assert_eq!(nav.page(), 1);
    }

    #[test]
    fn reset_drops_sample_and_pending_tap() {
        let mut nav = nav();
        let mut classifier = GestureClassifier::new();

        classifier.start(&nav, 100.0, 100.0, 1_000);
        classifier.end(&mut nav, &TapTarget::image(None), 1_050);
        classifier.reset();
        classifier.tick(&mut nav, 10_000);
        assert!(nav.drain_events().is_empty());
        assert_eq!(classifier.end(&mut nav, &TapTarget::other(), 2_000), GestureOutcome::Ignored);
    }
}
