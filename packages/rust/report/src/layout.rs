//! Page model and the vertical layout cursor.
//!
//! All coordinates are millimetres from the top-left corner of the page.
//! Text `y` is the baseline; image `y` is the top edge.

use contenize_shared::{InlineImage, ReportConfig};

use crate::metrics::{Font, MM_PER_PT};

/// An RGB colour, 0-255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn gray(level: u8) -> Self {
        Self(level, level, level)
    }
}

/// One drawing primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        x: f32,
        y: f32,
        text: String,
        font: Font,
        size: f32,
        color: Rgb,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: InlineImage,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        width: f32,
        color: Rgb,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
}

impl Page {
    /// Text of every text element, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Header re-emitted at the top of a page when a section continues onto it.
#[derive(Debug, Clone)]
pub struct Continuation {
    pub text: String,
    pub font: Font,
    pub size: f32,
    pub color: Rgb,
    /// Vertical advance after the header.
    pub advance: f32,
}

/// Tracks the vertical position across pages.
#[derive(Debug)]
pub struct LayoutCursor {
    geometry: ReportConfig,
    pages: Vec<Page>,
    y: f32,
    continuation: Option<Continuation>,
}

impl LayoutCursor {
    pub fn new(geometry: ReportConfig) -> Self {
        let y = geometry.top;
        Self {
            geometry,
            pages: vec![Page::default()],
            y,
            continuation: None,
        }
    }

    pub fn geometry(&self) -> &ReportConfig {
        &self.geometry
    }

    /// Current baseline.
    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn advance(&mut self, dy: f32) {
        self.y += dy;
    }

    /// Line advance for text at `size` points.
    pub fn line_height(&self, size: f32) -> f32 {
        size * MM_PER_PT * self.geometry.line_spacing
    }

    /// Set (or clear) the header repeated after a page break.
    pub fn set_continuation(&mut self, continuation: Option<Continuation>) {
        self.continuation = continuation;
    }

    /// Height available on a fresh page, after any continuation header.
    pub fn page_capacity(&self) -> f32 {
        let header = self.continuation.as_ref().map_or(0.0, |c| c.advance);
        self.geometry.content_bottom - self.geometry.top - header
    }

    fn at_page_top(&self) -> bool {
        self.y <= self.geometry.top
    }

    /// Make room for a block of `height`; start a new page if it would
    /// overflow the content area. Returns whether a page break happened.
    ///
    /// A cursor already at the top of a page never breaks again.
    pub fn reserve(&mut self, height: f32) -> bool {
        if self.y + height <= self.geometry.content_bottom || self.at_page_top() {
            return false;
        }
        self.new_page();
        true
    }

    /// Start a new page, emitting the continuation header if one is set.
    pub fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = self.geometry.top;

        if let Some(header) = self.continuation.clone() {
            let x = self.geometry.margin;
            let y = self.y;
            self.push(Element::Text {
                x,
                y,
                text: header.text,
                font: header.font,
                size: header.size,
                color: header.color,
            });
            self.y += header.advance;
        }
    }

    /// Add an element to the current page.
    pub fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    pub fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(cursor: &LayoutCursor, s: &str) -> Element {
        Element::Text {
            x: 20.0,
            y: cursor.y(),
            text: s.into(),
            font: Font::Regular,
            size: 10.0,
            color: Rgb::gray(0),
        }
    }

    #[test]
    fn ten_point_lines_advance_five_mm() {
        let cursor = LayoutCursor::new(ReportConfig::default());
        assert!((cursor.line_height(10.0) - 5.0).abs() < 0.01);
    }

    #[test]
    fn reserve_breaks_only_on_overflow() {
        let mut cursor = LayoutCursor::new(ReportConfig::default());
        assert!(!cursor.reserve(250.0));
        cursor.advance(240.0);
        assert!(!cursor.reserve(10.0));
        assert!(cursor.reserve(10.1));
        assert_eq!(cursor.page_count(), 2);
        assert_eq!(cursor.y(), 25.0);
    }

    #[test]
    fn reserve_at_page_top_never_breaks() {
        let mut cursor = LayoutCursor::new(ReportConfig::default());
        assert!(!cursor.reserve(1000.0));
        assert_eq!(cursor.page_count(), 1);
    }

    #[test]
    fn continuation_header_follows_break() {
        let mut cursor = LayoutCursor::new(ReportConfig::default());
        let el = text(&cursor, "first");
        cursor.push(el);
        cursor.set_continuation(Some(Continuation {
            text: "(Cont.) 1. twitter - t1".into(),
            font: Font::Bold,
            size: 13.0,
            color: Rgb(234, 88, 12),
            advance: 12.0,
        }));
        assert!((cursor.page_capacity() - 238.0).abs() < 1e-4);

        cursor.advance(249.0);
        assert!(cursor.reserve(5.0));
        assert_eq!(cursor.y(), 37.0);

        let pages = cursor.into_pages();
        assert_eq!(pages[0].texts().collect::<Vec<_>>(), vec!["first"]);
        assert_eq!(pages[1].texts().collect::<Vec<_>>(), vec!["(Cont.) 1. twitter - t1"]);
    }
}
