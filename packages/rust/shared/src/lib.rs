//! Shared types, error model, and configuration for Contenize.
//!
//! This crate is the foundation depended on by all other Contenize crates.
//! It provides:
//! - [`ContenizeError`]: the unified error type
//! - Domain types ([`ContentBrief`], [`ContentPlan`], [`ContentSlice`], [`PlanId`])
//! - Configuration ([`AppConfig`], [`GenAiSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, GeminiConfig, GenAiSettings, ReportConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{ContenizeError, ErrorDetail, GenerationErrorKind, Result};
pub use types::{
    Attachment, BrandAnalysis, Channel, ContentBrief, ContentPlan, ContentSlice, Effort,
    InlineImage, OptimizationScores, Orientation, PlanId, SearchIntent, SeoKeyword,
    SliceRevision,
};
