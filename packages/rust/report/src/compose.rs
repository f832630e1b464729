//! Lays a [`ContentPlan`] out as a paginated strategy report.
//!
//! Composition is a pure function of the plan, the page geometry and the text
//! metrics. Content is emitted top to bottom through a [`LayoutCursor`]; a
//! second pass stamps `Page i of N` footers once the page count is known.

use tracing::debug;

use contenize_shared::{ContentPlan, ContentSlice, Orientation, ReportConfig};

use crate::export::file_name_for;
use crate::layout::{Continuation, Element, LayoutCursor, Page, Rgb};
use crate::metrics::{Font, TextMetrics, wrap};

const ORANGE: Rgb = Rgb(234, 88, 12);
const SLATE_500: Rgb = Rgb(100, 116, 139);
const SLATE_600: Rgb = Rgb(71, 85, 105);
const SLATE_800: Rgb = Rgb(30, 41, 59);
const SLATE_900: Rgb = Rgb(15, 23, 42);
const SEPARATOR: Rgb = Rgb(241, 245, 249);
const FOOTER_GRAY: Rgb = Rgb::gray(150);

const BODY_SIZE: f32 = 10.0;
const SLICE_TITLE_SIZE: f32 = 13.0;
const SLICE_TITLE_ADVANCE: f32 = 12.0;
/// Room a slice title needs below it to not be orphaned at a page bottom.
const SLICE_KEEP_TOGETHER: f32 = 60.0;
const LABEL_ADVANCE: f32 = 6.0;

/// Product line printed under the title and in every footer.
pub const KICKER: &str = "Contenize Strategy Engine";
/// Substituted for empty fields.
pub const PLACEHOLDER: &str = "N/A";

/// A laid-out report, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedReport {
    pub file_name: String,
    pub pages: Vec<Page>,
}

impl ComposedReport {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Compose the report for `plan`.
pub fn compose(plan: &ContentPlan, geometry: &ReportConfig, metrics: &dyn TextMetrics) -> ComposedReport {
    let mut composer = Composer {
        cursor: LayoutCursor::new(geometry.clone()),
        metrics,
        content_width: geometry.page_width - 2.0 * geometry.margin,
    };

    composer.header(plan);
    composer.brand_fields(plan);
    composer.summary(plan);
    composer.implementation_steps(plan);
    composer.pipeline(plan);

    let mut cursor = composer.cursor;
    stamp_footers(&mut cursor, metrics);

    let pages = cursor.into_pages();
    debug!(pages = pages.len(), slices = plan.slices.len(), "report composed");

    ComposedReport {
        file_name: file_name_for(&plan.strategy_name),
        pages,
    }
}

/// Second pass: `Page i of N` on every page.
fn stamp_footers(cursor: &mut LayoutCursor, metrics: &dyn TextMetrics) {
    let total = cursor.page_count();
    let center = cursor.geometry().page_width / 2.0;
    let baseline = cursor.geometry().footer_baseline;

    for (index, page) in cursor.pages_mut().iter_mut().enumerate() {
        let text = format!("{KICKER} \u{2022} Page {} of {total}", index + 1);
        let width = metrics.text_width(&text, Font::Regular, 9.0);
        page.elements.push(Element::Text {
            x: center - width / 2.0,
            y: baseline,
            text,
            font: Font::Regular,
            size: 9.0,
            color: FOOTER_GRAY,
        });
    }
}

fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() { PLACEHOLDER } else { value }
}

/// Title shown above each slice section.
pub fn slice_title(index: usize, slice: &ContentSlice) -> String {
    let name = slice
        .seo_title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&slice.id);
    format!("{}. {} - {}", index + 1, slice.channel, name)
}

/// Image box (width, height) for an orientation.
pub fn image_size(orientation: Orientation) -> (f32, f32) {
    match orientation {
        Orientation::Landscape => (100.0, 56.25),
        Orientation::Portrait => (45.0, 80.0),
    }
}

struct Composer<'m> {
    cursor: LayoutCursor,
    metrics: &'m dyn TextMetrics,
    content_width: f32,
}

impl Composer<'_> {
    fn margin(&self) -> f32 {
        self.cursor.geometry().margin
    }

    fn wrap(&self, text: &str, font: Font, size: f32, width: f32) -> Vec<String> {
        wrap(self.metrics, text, font, size, width)
    }

    fn text(&mut self, x: f32, text: impl Into<String>, font: Font, size: f32, color: Rgb) {
        let y = self.cursor.y();
        self.cursor.push(Element::Text {
            x,
            y,
            text: text.into(),
            font,
            size,
            color,
        });
    }

    /// Place wrapped lines starting at the cursor, one line height apart.
    ///
    /// The caller has already reserved room for the block when it fits on a
    /// page; a block taller than a page is split between lines here.
    fn lines(&mut self, x: f32, lines: &[String], font: Font, size: f32, color: Rgb) {
        let line_height = self.cursor.line_height(size);
        let bottom = self.cursor.geometry().content_bottom;
        let splits = self.cursor.y() + lines.len() as f32 * line_height > bottom;

        for line in lines {
            if splits {
                self.cursor.reserve(line_height);
            }
            self.text(x, line.clone(), font, size, color);
            self.cursor.advance(line_height);
        }
    }

    /// Reserve `lead` plus as much of `lines` as must stay together.
    fn reserve_block(&mut self, lead: f32, line_count: usize, size: f32) {
        let line_height = self.cursor.line_height(size);
        let block = lead + line_count as f32 * line_height;
        let height = if block <= self.cursor.page_capacity() {
            block
        } else {
            lead + line_height
        };
        self.cursor.reserve(height);
    }

    fn header(&mut self, plan: &ContentPlan) {
        let margin = self.margin();
        let title = self.wrap(or_placeholder(&plan.strategy_name), Font::Bold, 26.0, self.content_width);
        let title_height = self.cursor.line_height(26.0);

        for (i, line) in title.iter().enumerate() {
            if i > 0 {
                self.cursor.advance(title_height);
            }
            self.text(margin, line.clone(), Font::Bold, 26.0, ORANGE);
        }
        self.cursor.advance(12.0);

        self.text(margin, KICKER, Font::Bold, 16.0, SLATE_600);
        self.cursor.advance(18.0);
    }

    fn brand_fields(&mut self, plan: &ContentPlan) {
        let brand = &plan.brand_analysis;
        let seo = brand
            .seo_keywords
            .iter()
            .map(|k| format!("{} ({})", k.term, k.intent.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        let fields = [
            ("Tone:", brand.tone.clone()),
            ("Voice:", brand.voice.clone()),
            ("Personality:", brand.personality.clone()),
            ("SEO Keywords:", seo),
            ("Palette:", brand.suggested_colors.join(", ")),
            ("Brand Keywords:", brand.brand_keywords.join(", ")),
        ];

        let margin = self.margin();
        let value_x = self.cursor.geometry().value_x;
        let value_width = self.content_width - (value_x - margin);

        for (label, value) in fields {
            let lines = self.wrap(or_placeholder(&value), Font::Regular, BODY_SIZE, value_width);
            self.reserve_block(0.0, lines.len(), BODY_SIZE);

            self.text(margin, label, Font::Bold, BODY_SIZE, SLATE_500);
            self.lines(value_x, &lines, Font::Regular, BODY_SIZE, SLATE_800);
            self.cursor.advance(8.0);
        }
        self.cursor.advance(10.0);
    }

    fn summary(&mut self, plan: &ContentPlan) {
        let margin = self.margin();
        let lines = self.wrap(or_placeholder(&plan.executive_summary), Font::Regular, BODY_SIZE, self.content_width);

        self.reserve_block(8.0, lines.len(), BODY_SIZE);
        self.text(margin, "Executive Summary", Font::Bold, 14.0, SLATE_900);
        self.cursor.advance(8.0);
        self.lines(margin, &lines, Font::Regular, BODY_SIZE, SLATE_800);
        self.cursor.advance(if plan.implementation_steps.is_empty() { 20.0 } else { 12.0 });
    }

    fn implementation_steps(&mut self, plan: &ContentPlan) {
        if plan.implementation_steps.is_empty() {
            return;
        }
        let margin = self.margin();

        self.cursor.reserve(8.0 + self.cursor.line_height(BODY_SIZE));
        self.text(margin, "Implementation Steps", Font::Bold, 14.0, SLATE_900);
        self.cursor.advance(8.0);

        for (i, step) in plan.implementation_steps.iter().enumerate() {
            let numbered = format!("{}. {}", i + 1, or_placeholder(step));
            let lines = self.wrap(&numbered, Font::Regular, BODY_SIZE, self.content_width);
            self.reserve_block(0.0, lines.len(), BODY_SIZE);
            self.lines(margin, &lines, Font::Regular, BODY_SIZE, SLATE_800);
            self.cursor.advance(3.0);
        }
        self.cursor.advance(17.0);
    }

    fn pipeline(&mut self, plan: &ContentPlan) {
        let margin = self.margin();

        self.cursor.reserve(15.0 + SLICE_KEEP_TOGETHER);
        self.text(margin, "Optimized Content Pipeline", Font::Bold, 16.0, SLATE_900);
        self.cursor.advance(15.0);

        for (index, slice) in plan.slices.iter().enumerate() {
            self.slice_section(index, slice);
        }
        self.cursor.set_continuation(None);
    }

    fn slice_section(&mut self, index: usize, slice: &ContentSlice) {
        let margin = self.margin();
        let title = slice_title(index, slice);

        self.cursor.set_continuation(None);
        self.cursor.reserve(SLICE_KEEP_TOGETHER);
        let title_lines = self.wrap(&title, Font::Bold, SLICE_TITLE_SIZE, self.content_width);
        let title_height = self.cursor.line_height(SLICE_TITLE_SIZE);
        for (i, line) in title_lines.iter().enumerate() {
            if i > 0 {
                self.cursor.advance(title_height);
            }
            self.text(margin, line.clone(), Font::Bold, SLICE_TITLE_SIZE, ORANGE);
        }
        self.cursor.advance(SLICE_TITLE_ADVANCE);

        self.cursor.set_continuation(Some(Continuation {
            text: format!("(Cont.) {title}"),
            font: Font::Bold,
            size: SLICE_TITLE_SIZE,
            color: ORANGE,
            advance: SLICE_TITLE_ADVANCE,
        }));

        if let Some(image) = &slice.image {
            let (width, height) = image_size(slice.orientation());
            self.cursor.reserve(height);
            let y = self.cursor.y();
            self.cursor.push(Element::Image {
                x: margin,
                y,
                width,
                height,
                image: image.clone(),
            });
            self.cursor.advance(height + 12.0);
        }

        self.seo_focus(slice);
        self.labelled("HOOK:", &slice.hook, Font::Bold, SLATE_900, 10.0);
        self.labelled("BODY CONTENT:", &slice.body, Font::Regular, SLATE_800, 10.0);
        self.labelled("CALL TO ACTION:", &slice.call_to_action, Font::Bold, ORANGE, 10.0);
        self.labelled(
            "AEO SNIPPET:",
            slice.direct_answer_snippet.as_deref().unwrap_or_default(),
            Font::Oblique,
            SLATE_800,
            18.0,
        );

        let page_width = self.cursor.geometry().page_width;
        self.cursor.reserve(0.0);
        let y = self.cursor.y();
        self.cursor.push(Element::Rule {
            x1: margin,
            x2: page_width - margin,
            y,
            width: 0.2,
            color: SEPARATOR,
        });
        self.cursor.advance(15.0);
    }

    fn seo_focus(&mut self, slice: &ContentSlice) {
        let margin = self.margin();
        let value_x = self.cursor.geometry().value_x;
        let keyword = or_placeholder(slice.primary_keyword.as_deref().unwrap_or_default()).to_uppercase();
        let lines = self.wrap(&keyword, Font::Bold, BODY_SIZE, self.content_width - (value_x - margin));

        self.reserve_block(0.0, lines.len(), BODY_SIZE);
        self.text(margin, "SEO FOCUS:", Font::Bold, BODY_SIZE, SLATE_500);
        self.lines(value_x, &lines, Font::Bold, BODY_SIZE, ORANGE);
        self.cursor.advance(10.0 - self.cursor.line_height(BODY_SIZE));
    }

    fn labelled(&mut self, label: &str, value: &str, font: Font, color: Rgb, gap: f32) {
        let margin = self.margin();
        let lines = self.wrap(or_placeholder(value), font, BODY_SIZE, self.content_width);

        self.reserve_block(LABEL_ADVANCE, lines.len(), BODY_SIZE);
        self.text(margin, label, Font::Bold, BODY_SIZE, SLATE_500);
        self.cursor.advance(LABEL_ADVANCE);
        self.lines(margin, &lines, font, BODY_SIZE, color);
        self.cursor.advance(gap);
    }
}
