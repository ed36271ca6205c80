//! Simulated collaborators for tests and the demo binary: a layout surface,
//! locator service and chapter loader that share one in-memory book model,
//! the way the real collaborators share the rendering surface.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::ChapterLoadError;
use crate::layout::{ElementHandle, ImageLoadFailed, LayoutSurface, PageBox};
use crate::loader::ChapterLoader;
use crate::locator::{Locator, LocatorService, Resolution};

#[derive(Debug, Clone)]
struct SimImage {
    rendered_width: f32,
    deferred: bool,
    fails: bool,
    centered: bool,
    /// Extent added to the chapter once the image finishes layout. Non-zero
    /// values simulate the reflow that mid-load recovery exists for.
    extent_growth: f32,
    src: Option<String>,
}

#[derive(Debug, Clone)]
struct SimElement {
    id: Option<String>,
    left: f32,
    first_child: Option<usize>,
    image: Option<SimImage>,
}

#[derive(Debug, Clone, Default)]
struct SimChapter {
    extent: f32,
    elements: Vec<SimElement>,
}

#[derive(Debug)]
struct SimBookState {
    chapters: Vec<SimChapter>,
    attached: usize,
    offset: f32,
    page_box: PageBox,
    last_scroll_duration: u64,
    failing_chapters: HashSet<usize>,
}

/// Builder for a simulated book. Chapters are described by their laid-out
/// extent plus the elements and deferred images they contain; `build` hands
/// out the three collaborators sharing the resulting model.
pub struct SimBook {
    state: SimBookState,
}

impl SimBook {
    pub fn new() -> Self {
        Self {
            state: SimBookState {
                chapters: Vec::new(),
                attached: 0,
                offset: 0.0,
                page_box: PageBox::new(600.0, 20.0, 1),
                last_scroll_duration: 0,
                failing_chapters: HashSet::new(),
            },
        }
    }

    pub fn page_box(mut self, width: f32, padding: f32, columns: u32) -> Self {
        self.state.page_box = PageBox::new(width, padding, columns);
        self
    }

    /// Start a new chapter with the given scroll extent. Subsequent element
    /// and image calls add to this chapter.
    pub fn chapter_with_extent(mut self, extent: f32) -> Self {
        self.state.chapters.push(SimChapter {
            extent,
            elements: Vec::new(),
        });
        self
    }

    fn current_chapter(&mut self) -> &mut SimChapter {
        self.state
            .chapters
            .last_mut()
            .expect("add a chapter before adding elements")
    }

    pub fn element(mut self, id: &str, left: f32) -> Self {
        self.current_chapter().elements.push(SimElement {
            id: Some(id.to_string()),
            left,
            first_child: None,
            image: None,
        });
        self
    }

    /// Add an element and register it as the first child of `parent_id`.
    pub fn child_element(mut self, parent_id: &str, id: &str, left: f32) -> Self {
        let chapter = self.current_chapter();
        let child_index = chapter.elements.len();
        chapter.elements.push(SimElement {
            id: Some(id.to_string()),
            left,
            first_child: None,
            image: None,
        });
        if let Some(parent) = chapter
            .elements
            .iter_mut()
            .find(|e| e.id.as_deref() == Some(parent_id))
        {
            parent.first_child = Some(child_index);
        }
        self
    }

    pub fn deferred_image(self, left: f32, rendered_width: f32) -> Self {
        self.image_with_growth(left, rendered_width, 0.0)
    }

    pub fn image_with_growth(mut self, left: f32, rendered_width: f32, growth: f32) -> Self {
        self.current_chapter().elements.push(SimElement {
            id: None,
            left,
            first_child: None,
            image: Some(SimImage {
                rendered_width,
                deferred: true,
                fails: false,
                centered: false,
                extent_growth: growth,
                src: None,
            }),
        });
        self
    }

    pub fn image_with_src(mut self, left: f32, rendered_width: f32, src: &str) -> Self {
        self.current_chapter().elements.push(SimElement {
            id: None,
            left,
            first_child: None,
            image: Some(SimImage {
                rendered_width,
                deferred: true,
                fails: false,
                centered: false,
                extent_growth: 0.0,
                src: Some(src.to_string()),
            }),
        });
        self
    }

    pub fn failing_image(mut self, left: f32) -> Self {
        self.current_chapter().elements.push(SimElement {
            id: None,
            left,
            first_child: None,
            image: Some(SimImage {
                rendered_width: 0.0,
                deferred: true,
                fails: true,
                centered: false,
                extent_growth: 0.0,
                src: None,
            }),
        });
        self
    }

    /// Make the loader fail for this chapter with a transport error.
    pub fn fail_chapter(mut self, chapter: usize) -> Self {
        self.state.failing_chapters.insert(chapter);
        self
    }

    pub fn build(self) -> (SimulatedSurface, SimulatedLocators, SimulatedLoader) {
        let shared = Rc::new(RefCell::new(self.state));
        (
            SimulatedSurface {
                state: Rc::clone(&shared),
            },
            SimulatedLocators {
                state: Rc::clone(&shared),
            },
            SimulatedLoader { state: shared },
        )
    }
}

/// In-memory rendering surface over the shared book model.
pub struct SimulatedSurface {
    state: Rc<RefCell<SimBookState>>,
}

impl SimulatedSurface {
    /// Chapter currently attached to the surface.
    pub fn attached_chapter(&self) -> usize {
        self.state.borrow().attached
    }

    /// Duration of the most recent scroll command, for asserting on
    /// animated rollbacks.
    pub fn last_scroll_duration(&self) -> u64 {
        self.state.borrow().last_scroll_duration
    }

    /// Resize the page box in place, simulating a formatting change.
    pub fn reflow_to(&mut self, width: f32, padding: f32, columns: u32) {
        self.state.borrow_mut().page_box = PageBox::new(width, padding, columns);
    }

    /// True once the image was tagged for centering.
    pub fn is_centered(&self, image: ElementHandle) -> bool {
        let state = self.state.borrow();
        let chapter = &state.chapters[state.attached];
        chapter.elements[image.0]
            .image
            .as_ref()
            .is_some_and(|i| i.centered)
    }

    /// Source recorded for an image element, used by the image-selected
    /// signal in gesture-driving hosts.
    pub fn image_src(&self, image: ElementHandle) -> Option<String> {
        let state = self.state.borrow();
        state.chapters[state.attached].elements[image.0]
            .image
            .as_ref()
            .and_then(|i| i.src.clone())
    }
}

impl LayoutSurface for SimulatedSurface {
    fn scroll_extent(&self) -> f32 {
        let state = self.state.borrow();
        state
            .chapters
            .get(state.attached)
            .map(|c| c.extent)
            .unwrap_or(0.0)
    }

    fn reader_offset(&self) -> f32 {
        self.state.borrow().offset
    }

    fn set_reader_offset(&mut self, offset: f32, duration_ms: u64) {
        let mut state = self.state.borrow_mut();
        state.offset = offset;
        state.last_scroll_duration = duration_ms;
    }

    fn page_box(&self) -> PageBox {
        self.state.borrow().page_box
    }

    fn find_element(&self, id: &str) -> Option<ElementHandle> {
        let state = self.state.borrow();
        let chapter = state.chapters.get(state.attached)?;
        chapter
            .elements
            .iter()
            .position(|e| e.id.as_deref() == Some(id))
            .map(ElementHandle)
    }

    fn first_child(&self, element: ElementHandle) -> Option<ElementHandle> {
        let state = self.state.borrow();
        let chapter = state.chapters.get(state.attached)?;
        chapter
            .elements
            .get(element.0)?
            .first_child
            .map(ElementHandle)
    }

    fn element_left(&self, element: ElementHandle) -> f32 {
        let state = self.state.borrow();
        state.chapters[state.attached].elements[element.0].left
    }

    fn deferred_images(&self) -> Vec<ElementHandle> {
        let state = self.state.borrow();
        let Some(chapter) = state.chapters.get(state.attached) else {
            return Vec::new();
        };
        chapter
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.image.as_ref().is_some_and(|i| i.deferred))
            .map(|(index, _)| ElementHandle(index))
            .collect()
    }

    fn load_image(&mut self, image: ElementHandle) -> Result<f32, ImageLoadFailed> {
        let mut state = self.state.borrow_mut();
        let attached = state.attached;
        let chapter = &mut state.chapters[attached];
        let slot = chapter.elements[image.0]
            .image
            .as_mut()
            .ok_or_else(|| ImageLoadFailed {
                reason: "element is not an image".to_string(),
            })?;
        if slot.fails {
            slot.deferred = false;
            return Err(ImageLoadFailed {
                reason: "simulated fetch failure".to_string(),
            });
        }
        slot.deferred = false;
        let width = slot.rendered_width;
        let growth = slot.extent_growth;
        chapter.extent += growth;
        Ok(width)
    }

    fn mark_centered(&mut self, image: ElementHandle) {
        let mut state = self.state.borrow_mut();
        let attached = state.attached;
        if let Some(slot) = state.chapters[attached].elements[image.0].image.as_mut() {
            slot.centered = true;
        }
    }
}

/// Locator service over the shared model. Captured locators record the
/// content-relative pixel offset of the page start, so resolving one after a
/// reflow lands on the page that now holds the same content.
pub struct SimulatedLocators {
    state: Rc<RefCell<SimBookState>>,
}

impl LocatorService for SimulatedLocators {
    fn capture(&self, chapter: usize, page: usize) -> Option<Locator> {
        let state = self.state.borrow();
        if state.chapters.is_empty() {
            return None;
        }
        let x = state.page_box.stride() * page as f32;
        Some(Locator::new(format!("epubcfi(/{chapter}!/{})", x as i64)))
    }

    fn resolve(&self, locator: &Locator) -> Resolution {
        let state = self.state.borrow();
        let Some((chapter, x)) = parse_sim_locator(locator.as_str()) else {
            return Resolution::NotFound;
        };
        if chapter != state.attached {
            return Resolution::NotFound;
        }
        let stride = state.page_box.stride();
        if stride <= 0.0 {
            return Resolution::NotFound;
        }
        Resolution::Page((x / stride).floor() as usize)
    }
}

fn parse_sim_locator(raw: &str) -> Option<(usize, f32)> {
    let body = raw.strip_prefix("epubcfi(/")?.strip_suffix(')')?;
    let (chapter, x) = body.split_once("!/")?;
    Some((chapter.parse().ok()?, x.parse().ok()?))
}

/// Chapter loader over the shared model: attaching a chapter replaces the
/// surface content and rewinds the reader offset.
pub struct SimulatedLoader {
    state: Rc<RefCell<SimBookState>>,
}

impl ChapterLoader for SimulatedLoader {
    fn fetch(&mut self, chapter: usize) -> Result<(), ChapterLoadError> {
        let mut state = self.state.borrow_mut();
        if state.failing_chapters.contains(&chapter) {
            return Err(ChapterLoadError::new(chapter, "simulated transport failure"));
        }
        if chapter >= state.chapters.len() {
            return Err(ChapterLoadError::new(chapter, "no such chapter"));
        }
        state.attached = chapter;
        state.offset = 0.0;
        Ok(())
    }
}
