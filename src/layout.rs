/// Page box geometry, read fresh from the surface before every offset
/// computation: formatting changes invalidate any stored copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub width: f32,
    pub padding: f32,
    pub columns: u32,
}

impl PageBox {
    pub fn new(width: f32, padding: f32, columns: u32) -> Self {
        Self {
            width,
            padding,
            columns,
        }
    }

    /// Horizontal distance between the left edges of two adjacent pages.
    /// Floored to whole pixels so page offsets stay on integer boundaries.
    pub fn stride(&self) -> f32 {
        (self.width + self.padding).floor()
    }

    /// Usable width of a single column once column padding is taken out.
    pub fn column_content_width(&self) -> f32 {
        self.width / self.columns as f32 - self.padding / 2.0
    }
}

/// Opaque reference to an element inside the currently attached chapter.
/// Valid only until the next chapter load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub usize);

/// Why a single deferred image failed to load. Never surfaced past the image
/// pass: failed images are skipped and excluded from the loaded set.
#[derive(Debug, Clone)]
pub struct ImageLoadFailed {
    pub reason: String,
}

/// The rendering surface the core navigates: one chapter of content laid out
/// in horizontal columns, scrolled by translating the reader container.
///
/// Offsets are in pixels. The reader offset is 0 at page 0 and decreases as
/// the reader moves forward (the content slides left). Element offsets are
/// content-relative, i.e. unaffected by the current reader offset.
pub trait LayoutSurface {
    /// Total laid-out width of the attached chapter.
    fn scroll_extent(&self) -> f32;

    fn reader_offset(&self) -> f32;

    /// Scroll command. `duration_ms` of 0 means jump without animation.
    fn set_reader_offset(&mut self, offset: f32, duration_ms: u64);

    fn page_box(&self) -> PageBox;

    fn find_element(&self, id: &str) -> Option<ElementHandle>;

    /// First child of the element, if any. Anchor resolution descends into it
    /// so that chapter-wide wrapper elements do not pin every anchor to page 0.
    fn first_child(&self, element: ElementHandle) -> Option<ElementHandle>;

    /// Content-relative left offset of the element.
    fn element_left(&self, element: ElementHandle) -> f32;

    /// Images in the attached chapter that still carry a deferred-source
    /// marker, in document order.
    fn deferred_images(&self) -> Vec<ElementHandle>;

    /// Initiate and complete the load of one deferred image. On success the
    /// surface swaps the real source in and returns the rendered width.
    fn load_image(&mut self, image: ElementHandle) -> Result<f32, ImageLoadFailed>;

    /// Tag an image as centered (applied to images wider than 3/4 of the
    /// column content width once loaded).
    fn mark_centered(&mut self, image: ElementHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_floors_to_whole_pixels() {
        let page_box = PageBox::new(600.5, 20.7, 1);
        assert_eq!(page_box.stride(), 621.0);
    }

    #[test]
    fn column_content_width_accounts_for_columns() {
        let page_box = PageBox::new(800.0, 40.0, 2);
        assert_eq!(page_box.column_content_width(), 380.0);
    }
}
