//! Strategy report generation for Contenize.
//!
//! [`compose`] lays a plan out into pages (pure and deterministic),
//! [`render_pdf`] turns the pages into PDF bytes, and [`export_pdf`] does both
//! and writes the result atomically.

pub mod compose;
pub mod export;
pub mod layout;
pub mod metrics;
pub mod pdf;

pub use compose::{ComposedReport, compose};
pub use export::{export_pdf, file_name_for};
pub use layout::{Element, LayoutCursor, Page};
pub use metrics::{Font, HelveticaMetrics, TextMetrics};
pub use pdf::render_pdf;
