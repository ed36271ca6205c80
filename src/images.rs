use log::{debug, warn};

use crate::events::{EventQueue, ReaderEvent};
use crate::layout::{ElementHandle, LayoutSurface};
use crate::locator::LocatorService;
use crate::page::{self, PageTarget};
use crate::position::NavigationState;

/// Rendered width above this fraction of the column content width gets the
/// image centered.
const CENTER_WIDTH_RATIO: f32 = 0.75;

/// How close (in pages) an image must be to the current page for its load to
/// be initiated at all. Images outside the window are skipped, not queued;
/// the next navigation event reconsiders them.
const LOAD_WINDOW: usize = 2;

/// What to do after each image finishes: an image completing layout can change
/// the column count, so a page load in flight re-resolves its target.
#[derive(Clone, Copy)]
pub(crate) enum ReflowPolicy<'a> {
    None,
    Reresolve(&'a PageTarget),
}

/// Sequentially load the deferred images near the current page.
///
/// One fetch is in flight at a time: each image's page position is evaluated
/// against the page as it stands *after* the previous loads, which may have
/// moved it. `reverse` walks the images in reverse document order (used when
/// navigating backward so the images nearest the new page come first). Load
/// failures are swallowed: logged, excluded from the returned set, and the
/// rest of the queue keeps going.
pub(crate) fn load_nearby<S: LayoutSurface, L: LocatorService>(
    state: &mut NavigationState,
    surface: &mut S,
    locators: &L,
    events: &mut EventQueue,
    reverse: bool,
    policy: ReflowPolicy<'_>,
) -> Vec<ElementHandle> {
    let mut candidates = surface.deferred_images();
    if reverse {
        candidates.reverse();
    }

    let mut loaded = Vec::new();
    for image in candidates {
        let image_page = page::page_of_element(surface, image);
        if image_page.abs_diff(state.page) >= LOAD_WINDOW {
            continue;
        }

        match surface.load_image(image) {
            Ok(rendered_width) => {
                let centered =
                    rendered_width > CENTER_WIDTH_RATIO * surface.page_box().column_content_width();
                if centered {
                    surface.mark_centered(image);
                }
                events.push(ReaderEvent::ImageLoaded { image, centered });
                loaded.push(image);

                if let ReflowPolicy::Reresolve(target) = policy {
                    state.pages_in_chapter = page::total(surface);
                    page::move_to(state, surface, locators, target);
                }
            }
            Err(failure) => {
                warn!("image load failed, skipping: {}", failure.reason);
            }
        }
    }

    debug!(
        "image pass finished: {} loaded, page {} of {}",
        loaded.len(),
        state.page,
        state.pages_in_chapter
    );
    loaded
}
