use std::str::FromStr;

use log::debug;

use crate::layout::{ElementHandle, LayoutSurface};
use crate::locator::{Locator, LocatorService, Resolution};
use crate::position::NavigationState;

/// Where a page move should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    /// Page index within the current chapter.
    Absolute(usize),
    /// Last page of the current chapter.
    Last,
    /// Durable locator, re-resolved against the attached chapter.
    Locator(Locator),
    /// Element id within the attached chapter.
    Anchor(String),
}

impl FromStr for PageTarget {
    type Err = ();

    /// Never fails: anything that is not an index, the last-page keyword or a
    /// locator string is treated as an anchor id.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.eq_ignore_ascii_case("last") {
            return Ok(Self::Last);
        }
        if let Ok(index) = raw.parse::<usize>() {
            return Ok(Self::Absolute(index));
        }
        if Locator::looks_like_locator(raw) {
            return Ok(Self::Locator(Locator::new(raw)));
        }
        Ok(Self::Anchor(raw.to_string()))
    }
}

/// Index of the last page in the attached chapter.
///
/// One pixel is subtracted from the scroll extent before dividing so content
/// that exactly fills N columns counts N pages, not N+1.
pub(crate) fn total<S: LayoutSurface>(surface: &S) -> usize {
    let stride = surface.page_box().stride();
    if stride <= 0.0 {
        return 0;
    }
    let extent = surface.scroll_extent() - 1.0;
    if extent < 0.0 {
        return 0;
    }
    (extent / stride).floor() as usize
}

/// Page containing the element, from its content-relative offset.
pub(crate) fn page_of_element<S: LayoutSurface>(surface: &S, element: ElementHandle) -> usize {
    let stride = surface.page_box().stride();
    if stride <= 0.0 {
        return 0;
    }
    let left = surface.element_left(element);
    if left < 0.0 {
        return 0;
    }
    (left / stride).floor() as usize
}

/// Page containing the anchor element, or 0 when the id does not resolve.
/// Resolution descends into the element's first child when it has children,
/// so a chapter-wide wrapper does not pin the anchor to its own left edge.
fn anchor_page<S: LayoutSurface>(surface: &S, id: &str) -> usize {
    let Some(element) = surface.find_element(id) else {
        debug!("anchor '{id}' not found, falling back to page 0");
        return 0;
    };
    let element = surface.first_child(element).unwrap_or(element);
    page_of_element(surface, element)
}

fn resolve_target<S: LayoutSurface, L: LocatorService>(
    state: &NavigationState,
    surface: &S,
    locators: &L,
    target: &PageTarget,
) -> usize {
    match target {
        PageTarget::Absolute(index) => *index,
        PageTarget::Last => state.pages_in_chapter,
        PageTarget::Locator(locator) => match locators.resolve(locator) {
            Resolution::Page(page) => page,
            Resolution::Element(element) => page_of_element(surface, element),
            Resolution::NotFound => {
                debug!("locator {locator} did not resolve, falling back to page 0");
                0
            }
        },
        PageTarget::Anchor(id) => anchor_page(surface, id),
    }
}

/// Resolve `target` and command the surface to the matching absolute offset.
pub(crate) fn move_to<S: LayoutSurface, L: LocatorService>(
    state: &mut NavigationState,
    surface: &mut S,
    locators: &L,
    target: &PageTarget,
) {
    state.page = resolve_target(state, surface, locators, target);
    let stride = surface.page_box().stride();
    surface.set_reader_offset(-stride * state.page as f32, 0);
}

/// One page forward via a relative scroll command, skipping the layout
/// re-read an absolute recompute would cost.
pub(crate) fn advance<S: LayoutSurface>(state: &mut NavigationState, surface: &mut S) {
    state.page += 1;
    let stride = surface.page_box().stride();
    let offset = surface.reader_offset();
    surface.set_reader_offset(offset - stride, 0);
}

/// One page backward via a relative scroll command.
pub(crate) fn retreat<S: LayoutSurface>(state: &mut NavigationState, surface: &mut S) {
    state.page = state.page.saturating_sub(1);
    let stride = surface.page_box().stride();
    let offset = surface.reader_offset();
    surface.set_reader_offset(offset + stride, 0);
}
