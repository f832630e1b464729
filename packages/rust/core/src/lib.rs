//! Core domain logic for Contenize.
//!
//! This crate turns a brief into a content plan (`planner`), illustrates its
//! slices in the background (`illustrator`), applies AI-assisted edits
//! (`editor`), and keeps the current plan consistent under concurrent updates
//! (`store`). `session` ties them together into the studio workflow.

pub mod editor;
pub mod illustrator;
pub mod planner;
pub mod session;
pub mod store;

pub use editor::SliceEditor;
pub use illustrator::Illustrator;
pub use planner::PlanGenerator;
pub use session::{
    ContentStudio, IllustrationBatch, IllustrationOutcome, IllustrationSummary, SilentProgress,
    StudioProgress,
};
pub use store::{MergeRejection, PlanStore, PlanUpdate, SliceChange, merge};
