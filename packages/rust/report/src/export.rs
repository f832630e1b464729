//! Report file naming and atomic export.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, instrument};

use contenize_shared::{ContenizeError, ContentPlan, ReportConfig, Result};

use crate::compose::compose;
use crate::metrics::HelveticaMetrics;
use crate::pdf::render_pdf;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// `Contenize_Engine_Strategy_<name>.pdf`, whitespace runs collapsed to `_`.
pub fn file_name_for(strategy_name: &str) -> String {
    let trimmed = strategy_name.trim();
    let name = if trimmed.is_empty() { "Untitled" } else { trimmed };
    let name = WHITESPACE.replace_all(name, "_").replace(['/', '\\'], "-");
    format!("Contenize_Engine_Strategy_{name}.pdf")
}

/// Compose, render and write the report for `plan` into `out_dir`.
///
/// The file is written to a temporary name and renamed into place, so a
/// failed export never leaves a partial report behind.
#[instrument(skip_all, fields(plan_id = %plan.id, out_dir = %out_dir.display()))]
pub fn export_pdf(plan: &ContentPlan, geometry: &ReportConfig, out_dir: &Path) -> Result<PathBuf> {
    let report = compose(plan, geometry, &HelveticaMetrics);
    let bytes = render_pdf(&report, geometry)?;

    std::fs::create_dir_all(out_dir).map_err(|e| ContenizeError::io(out_dir, e))?;
    let target = out_dir.join(&report.file_name);
    let temp = out_dir.join(format!(".{}.tmp", report.file_name));

    if let Err(e) = std::fs::write(&temp, &bytes) {
        let _ = std::fs::remove_file(&temp);
        return Err(ContenizeError::io(&temp, e));
    }
    if let Err(e) = std::fs::rename(&temp, &target) {
        let _ = std::fs::remove_file(&temp);
        return Err(ContenizeError::io(&target, e));
    }

    info!(
        file = %target.display(),
        pages = report.page_count(),
        bytes = bytes.len(),
        "report exported"
    );
    Ok(target)
}
