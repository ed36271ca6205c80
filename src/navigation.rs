use log::{debug, warn};

use crate::chapter;
use crate::config::Preferences;
use crate::error::NavigationError;
use crate::events::{EventQueue, ReaderEvent};
use crate::images::{self, ReflowPolicy};
use crate::layout::LayoutSurface;
use crate::loader::ChapterLoader;
use crate::locator::{Locator, LocatorService};
use crate::page::{self, PageTarget};
use crate::position::NavigationState;
use crate::progress::ProgressEstimator;
use crate::saved_positions::SavedPositions;
use crate::spine::Spine;

/// The navigation controller: owns the position state and coordinates the
/// page index, chapter index, image loader and progress estimator over the
/// collaborator seams (layout surface, locator service, chapter loader).
///
/// Every navigation entry point takes `&mut self`, so overlapping calls
/// cannot be expressed; the single-threaded host drives one intent at a time
/// and drains the event queue between calls.
pub struct Navigation<S, L, C> {
    state: NavigationState,
    spine: Spine,
    surface: S,
    locators: L,
    loader: C,
    progress: ProgressEstimator,
    events: EventQueue,
    preferences: Preferences,
    positions: SavedPositions,
    book_key: Option<String>,
}

impl<S, L, C> Navigation<S, L, C>
where
    S: LayoutSurface,
    L: LocatorService,
    C: ChapterLoader,
{
    pub fn new(spine: Spine, surface: S, locators: L, loader: C, preferences: Preferences) -> Self {
        Self {
            state: NavigationState::new(),
            spine,
            surface,
            locators,
            loader,
            progress: ProgressEstimator::new(),
            events: EventQueue::new(),
            preferences,
            positions: SavedPositions::ephemeral(),
            book_key: None,
        }
    }

    /// Attach a reading-position store; the position for `book` is refreshed
    /// on every settle.
    pub fn attach_position_store(&mut self, book: impl Into<String>, positions: SavedPositions) {
        self.book_key = Some(book.into());
        self.positions = positions;
    }

    // ---- accessors ----

    pub fn chapter(&self) -> usize {
        self.state.chapter
    }

    pub fn chapter_doc_name(&self) -> &str {
        &self.state.chapter_doc_name
    }

    pub fn chapter_count(&self) -> usize {
        self.spine.len()
    }

    pub fn page(&self) -> usize {
        self.state.page
    }

    /// Index of the last page in the current chapter (pages run `0..=this`).
    pub fn page_count(&self) -> usize {
        self.state.pages_in_chapter
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress.percent()
    }

    pub fn locator(&self) -> Option<&Locator> {
        self.state.locator.as_ref()
    }

    pub fn spine(&self) -> &Spine {
        &self.spine
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn saved_positions(&self) -> &SavedPositions {
        &self.positions
    }

    pub fn drain_events(&mut self) -> Vec<ReaderEvent> {
        self.events.drain()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub(crate) fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Current horizontal offset of the reader container.
    pub fn page_position(&self) -> f32 {
        self.surface.reader_offset()
    }

    /// Raw scroll command, used for live gesture drags and rollbacks.
    pub fn set_page_position(&mut self, offset: f32, duration_ms: u64) {
        self.surface.set_reader_offset(offset, duration_ms);
    }

    pub fn page_width(&self) -> f32 {
        self.surface.page_box().width
    }

    // ---- position management ----

    /// Unconditional page overwrite, used when restoring a captured position.
    pub fn set_page(&mut self, page: usize) {
        self.state.page = page;
    }

    /// Re-read the layout and refresh the page count for the attached chapter.
    pub fn recompute_page_count(&mut self) {
        self.state.pages_in_chapter = page::total(&self.surface);
    }

    /// Set the chapter index and derive its document name from the spine.
    /// A malformed href is non-fatal: logged, name left unset.
    pub fn set_chapter(&mut self, index: usize) {
        self.state.chapter = index;
        match chapter::doc_name(&self.spine, index) {
            Some(name) => self.state.chapter_doc_name = name,
            None => warn!("set_chapter: no document name for spine entry {index}"),
        }
    }

    /// Snapshot the durable locator for the current page.
    pub fn capture_locator(&mut self) {
        self.state.locator = self.locators.capture(self.state.chapter, self.state.page);
    }

    /// Store a locator for later restoration; captures the current position
    /// when none is given.
    pub fn set_locator(&mut self, locator: Option<Locator>) {
        self.state.locator = locator.or_else(|| {
            self.locators.capture(self.state.chapter, self.state.page)
        });
    }

    // ---- navigation ----

    /// One page forward; crosses into the next chapter from the last page.
    pub fn next(&mut self) -> Result<(), NavigationError> {
        if self.state.page < self.state.pages_in_chapter {
            self.page_forward();
            return Ok(());
        }
        if self.state.chapter + 1 < self.spine.len() {
            self.events.push(ReaderEvent::ChapterLoading {
                chapter: self.state.chapter + 1,
            });
            chapter::advance(&mut self.state);
            self.loader.fetch(self.state.chapter)?;
            self.after_chapter_attached();
            self.load_page(PageTarget::Absolute(0), false);
            return Ok(());
        }
        Err(NavigationError::EndOfBook)
    }

    /// One page backward; crosses into the previous chapter's last page from
    /// page 0.
    pub fn prev(&mut self) -> Result<(), NavigationError> {
        if self.state.page > 0 {
            self.page_backward();
            return Ok(());
        }
        if self.state.chapter > 0 {
            self.events.push(ReaderEvent::ChapterLoading {
                chapter: self.state.chapter - 1,
            });
            chapter::retreat(&mut self.state);
            self.loader.fetch(self.state.chapter)?;
            self.after_chapter_attached();
            self.load_page(PageTarget::Last, false);
            return Ok(());
        }
        Err(NavigationError::StartOfBook)
    }

    /// Move to `target` within the current chapter and run an image pass.
    /// Each image that finishes layout may change the column count, so the
    /// target is re-resolved after every load. With `fixed` the caller is
    /// about to issue another navigation call and finalization (locator +
    /// progress + position store) is skipped.
    pub fn load_page(&mut self, target: PageTarget, fixed: bool) {
        page::move_to(&mut self.state, &mut self.surface, &self.locators, &target);
        let reverse = matches!(target, PageTarget::Last);
        images::load_nearby(
            &mut self.state,
            &mut self.surface,
            &self.locators,
            &mut self.events,
            reverse,
            ReflowPolicy::Reresolve(&target),
        );
        if !fixed {
            self.update();
        }
    }

    /// Resolve a `path#fragment` chapter URL against the spine and load it.
    /// An unmatched URL fails with `InvalidArgument` and mutates nothing.
    pub fn load_chapter(&mut self, url: &str) -> Result<(), NavigationError> {
        let parsed = chapter::parse_url(url);
        let Some(index) = self.spine.find_by_path(parsed.path) else {
            return Err(NavigationError::invalid_argument(
                "Specified chapter does not exist.",
            ));
        };
        debug!("load_chapter: {url} -> spine entry {index}");
        self.set_chapter(index);
        self.loader.fetch(index)?;
        self.recompute_page_count();
        let target = match parsed.fragment {
            Some(fragment) => PageTarget::Anchor(fragment.to_string()),
            None => PageTarget::Absolute(0),
        };
        self.load_page(target, false);
        Ok(())
    }

    /// Reflow recovery: the formatting collaborator changed the page box.
    /// Recounts the pages and jumps back to the previously captured locator
    /// when one exists (page 0 otherwise), then refreshes the position store
    /// and progress.
    pub fn refresh_layout(&mut self) {
        self.recompute_page_count();
        if let Some(locator) = self.state.locator.clone() {
            page::move_to(
                &mut self.state,
                &mut self.surface,
                &self.locators,
                &PageTarget::Locator(locator),
            );
        }
        self.refresh_position_store();
        self.progress.update(&self.state, &self.spine, &mut self.events);
    }

    /// Force a recapture of locator, progress and the saved position.
    pub fn update(&mut self) {
        self.capture_locator();
        self.progress.update(&self.state, &self.spine, &mut self.events);
        self.refresh_position_store();
    }

    /// Back to the initial state: chapter 0, page 0, no page count, no
    /// locator, progress 0 with the cached word total invalidated.
    pub fn reset(&mut self) {
        self.state.reset();
        self.progress.reset();
        self.events.clear();
    }

    // ---- internals ----

    fn page_forward(&mut self) {
        page::advance(&mut self.state, &mut self.surface);
        self.capture_locator();
        self.settle_after_relative_move(false);
    }

    fn page_backward(&mut self) {
        page::retreat(&mut self.state, &mut self.surface);
        self.capture_locator();
        self.settle_after_relative_move(true);
    }

    /// Shared tail of a same-chapter page turn: load nearby images, and if
    /// any actually loaded the layout may have shifted, so run the full
    /// reflow recovery instead of the cheap progress refresh.
    fn settle_after_relative_move(&mut self, reverse: bool) {
        let loaded = images::load_nearby(
            &mut self.state,
            &mut self.surface,
            &self.locators,
            &mut self.events,
            reverse,
            ReflowPolicy::None,
        );
        if !loaded.is_empty() {
            self.refresh_layout();
        } else {
            self.progress.update(&self.state, &self.spine, &mut self.events);
            self.refresh_position_store();
        }
    }

    fn after_chapter_attached(&mut self) {
        let index = self.state.chapter;
        self.set_chapter(index);
        self.recompute_page_count();
    }

    fn refresh_position_store(&mut self) {
        if let Some(book) = &self.book_key {
            self.positions.record(
                book,
                self.state.chapter,
                self.state.page,
                self.state.locator.clone(),
                self.progress.percent(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NavigationError;
    use crate::sim::{SimBook, SimulatedLoader, SimulatedLocators, SimulatedSurface};
    use crate::spine::ChapterRef;

    const STRIDE: f32 = 620.0;

    type SimNavigation = Navigation<SimulatedSurface, SimulatedLocators, SimulatedLoader>;

    /// Three chapters of 2, 3 and 1 pages respectively.
    fn book() -> SimNavigation {
        let (surface, locators, loader) = SimBook::new()
            .page_box(600.0, 20.0, 1)
            .chapter_with_extent(2.0 * STRIDE)
            .chapter_with_extent(3.0 * STRIDE)
            .element("section1", 2.0 * STRIDE + 10.0)
            .chapter_with_extent(STRIDE)
            .build();
        let spine = Spine::new(vec![
            ChapterRef::new("OEBPS/chapter1.xhtml", true, 100),
            ChapterRef::new("OEBPS/chapter2.xhtml", true, 100),
            ChapterRef::new("OEBPS/chapter3.xhtml", true, 100),
        ]);
        let mut nav = Navigation::new(spine, surface, locators, loader, Preferences::default());
        nav.recompute_page_count();
        nav
    }

    #[test]
    fn walks_the_whole_book_and_back() {
        let mut nav = book();
        let mut forward = Vec::new();

        loop {
            forward.push((nav.chapter(), nav.page()));
            match nav.next() {
                Ok(()) => {}
                Err(NavigationError::EndOfBook) => break,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(
            forward,
            vec![(0, 0), (0, 1), (1, 0), (1, 1), (1, 2), (2, 0)]
        );

        let mut backward = Vec::new();
        loop {
            backward.push((nav.chapter(), nav.page()));
            match nav.prev() {
                Ok(()) => {}
                Err(NavigationError::StartOfBook) => break,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(
            backward,
            vec![(2, 0), (1, 2), (1, 1), (1, 0), (0, 1), (0, 0)]
        );
    }

    #[test]
    fn end_of_book_leaves_state_at_last_valid_page() {
        let mut nav = book();
        while nav.next().is_ok() {}
        assert_eq!((nav.chapter(), nav.page()), (2, 0));
        assert_eq!(nav.next(), Err(NavigationError::EndOfBook));
        assert_eq!((nav.chapter(), nav.page()), (2, 0));
    }

    #[test]
    fn chapter_transition_emits_loading_event() {
        let mut nav = book();
        nav.next().unwrap(); // page 1, same chapter
        nav.drain_events();
        nav.next().unwrap(); // into chapter 1
        let events = nav.drain_events();
        assert!(events.contains(&ReaderEvent::ChapterLoading { chapter: 1 }));
        assert_eq!(nav.chapter_doc_name(), "chapter2.xhtml");
    }

    #[test]
    fn prev_into_previous_chapter_lands_on_last_page() {
        let mut nav = book();
        nav.next().unwrap();
        nav.next().unwrap(); // chapter 1, page 0
        assert_eq!((nav.chapter(), nav.page()), (1, 0));

        nav.prev().unwrap(); // back into chapter 0
        assert_eq!((nav.chapter(), nav.page()), (0, 1));
        assert_eq!(nav.page(), nav.page_count());
    }

    #[test]
    fn load_chapter_by_url_resolves_anchor() {
        let mut nav = book();
        nav.load_chapter("path/to/chapter2.xhtml#section1").unwrap();
        assert_eq!(nav.chapter(), 1);
        // section1 sits at 2 * stride + 10, i.e. page 2.
        assert_eq!(nav.page(), 2);
        assert_eq!(nav.chapter_doc_name(), "chapter2.xhtml");
    }

    #[test]
    fn load_chapter_with_unknown_url_mutates_nothing() {
        let mut nav = book();
        nav.next().unwrap();
        let before = (nav.chapter(), nav.page());

        let err = nav.load_chapter("missing.xhtml").unwrap_err();
        assert!(matches!(err, NavigationError::InvalidArgument { .. }));
        assert_eq!((nav.chapter(), nav.page()), before);
    }

    #[test]
    fn chapter_load_failure_propagates() {
        let (surface, locators, loader) = SimBook::new()
            .page_box(600.0, 20.0, 1)
            .chapter_with_extent(STRIDE)
            .chapter_with_extent(STRIDE)
            .fail_chapter(1)
            .build();
        let spine = Spine::new(vec![
            ChapterRef::new("a.xhtml", true, 10),
            ChapterRef::new("b.xhtml", true, 10),
        ]);
        let mut nav = Navigation::new(spine, surface, locators, loader, Preferences::default());
        nav.recompute_page_count();

        let err = nav.next().unwrap_err();
        assert!(matches!(err, NavigationError::ChapterLoad(_)));
    }

    #[test]
    fn reflow_recovery_restores_the_captured_position() {
        let mut nav = book();
        nav.next().unwrap();
        nav.next().unwrap();
        nav.next().unwrap(); // chapter 1, page 1
        assert_eq!((nav.chapter(), nav.page()), (1, 1));
        nav.update();

        // Halving the page width doubles the page count; the locator keeps
        // pointing at the same content.
        nav.surface_mut().reflow_to(290.0, 20.0, 1);
        nav.refresh_layout();
        assert_eq!(nav.page_count(), 5);
        assert_eq!(nav.page(), 2);
    }

    #[test]
    fn refresh_layout_without_locator_stays_at_page_zero() {
        let mut nav = book();
        nav.surface_mut().reflow_to(290.0, 20.0, 1);
        nav.refresh_layout();
        assert_eq!(nav.page(), 0);
        assert_eq!(nav.page_count(), 3);
    }

    #[test]
    fn image_load_during_page_turn_triggers_full_relayout() {
        let (surface, locators, loader) = SimBook::new()
            .page_box(600.0, 20.0, 1)
            .chapter_with_extent(3.0 * STRIDE)
            .image_with_growth(STRIDE + 5.0, 100.0, STRIDE)
            .build();
        let spine = Spine::new(vec![ChapterRef::new("c.xhtml", true, 100)]);
        let mut nav = Navigation::new(spine, surface, locators, loader, Preferences::default());
        nav.recompute_page_count();
        assert_eq!(nav.page_count(), 2);

        nav.next().unwrap();
        // The image on page 1 loaded and grew the chapter by one stride.
        assert_eq!(nav.page_count(), 3);
        let events = nav.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, ReaderEvent::ImageLoaded { .. })));
    }

    #[test]
    fn set_locator_defaults_to_current_position() {
        let mut nav = book();
        nav.next().unwrap();
        nav.set_locator(None);
        let captured = nav.locator().cloned().unwrap();

        nav.load_page(PageTarget::Absolute(0), true);
        assert_eq!(nav.page(), 0);

        nav.load_page(PageTarget::Locator(captured), false);
        assert_eq!(nav.page(), 1);
    }

    #[test]
    fn reset_returns_documented_initial_values() {
        let mut nav = book();
        nav.next().unwrap();
        nav.next().unwrap();
        nav.update();

        nav.reset();
        assert_eq!(nav.page(), 0);
        assert_eq!(nav.chapter(), 0);
        assert_eq!(nav.page_count(), 0);
        assert_eq!(nav.progress_percent(), 0);
        assert!(nav.locator().is_none());
        assert!(nav.drain_events().is_empty());
    }

    #[test]
    fn update_refreshes_attached_position_store() {
        let mut nav = book();
        nav.attach_position_store("book.epub", SavedPositions::ephemeral());
        nav.next().unwrap();
        nav.update();

        let saved = nav.saved_positions().get("book.epub").unwrap();
        assert_eq!(saved.chapter, 0);
        assert_eq!(saved.page, 1);
        assert!(saved.locator.is_some());
    }
}
