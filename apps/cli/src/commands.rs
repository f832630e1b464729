//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use contenize_core::{ContentStudio, IllustrationOutcome, StudioProgress};
use contenize_genai::GeminiClient;
use contenize_shared::{
    AppConfig, Attachment, Channel, ContenizeError, ContentBrief, ContentPlan, GenAiSettings,
    init_config, load_config, validate_api_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Contenize: slice cornerstone content into a multi-channel strategy.
#[derive(Parser)]
#[command(
    name = "contenize",
    version,
    about = "Turn one piece of content into an illustrated, multi-channel content strategy.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a content plan from a brief and illustrate its slices.
    Generate {
        /// Brief file (TOML).
        #[arg(long)]
        brief: PathBuf,

        /// Output directory (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also export the PDF report.
        #[arg(long)]
        pdf: bool,

        /// Supporting file sent with the brief (repeatable).
        #[arg(long)]
        attach: Vec<PathBuf>,
    },

    /// Rewrite one slice of a saved plan from an instruction.
    Revise {
        /// Plan file written by `generate`.
        #[arg(long)]
        plan: PathBuf,

        /// Slice id.
        #[arg(long)]
        slice: String,

        /// What to change, in plain words.
        #[arg(long)]
        instruction: String,
    },

    /// Export a saved plan as a PDF report.
    Export {
        /// Plan file written by `generate`.
        #[arg(long)]
        plan: PathBuf,

        /// Output directory (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print a slice's ready-to-paste text.
    Copy {
        /// Plan file written by `generate`.
        #[arg(long)]
        plan: PathBuf,

        /// Slice id.
        #[arg(long)]
        slice: String,

        /// Append the AEO answer snippet.
        #[arg(long)]
        with_aeo: bool,
    },

    /// List supported channels.
    Channels,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "contenize=info",
        1 => "contenize=debug",
        _ => "contenize=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            brief,
            out,
            pdf,
            attach,
        } => cmd_generate(&brief, out.as_deref(), pdf, &attach).await,
        Command::Revise {
            plan,
            slice,
            instruction,
        } => cmd_revise(&plan, &slice, &instruction).await,
        Command::Export { plan, out } => cmd_export(&plan, out.as_deref()),
        Command::Copy {
            plan,
            slice,
            with_aeo,
        } => cmd_copy(&plan, &slice, with_aeo),
        Command::Channels => cmd_channels(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a studio backed by Gemini, failing early when no API key is set.
fn studio(config: &AppConfig) -> Result<ContentStudio> {
    validate_api_key(config)?;
    let settings = GenAiSettings::resolve(config)?;
    let client = GeminiClient::new(settings)?;
    Ok(ContentStudio::new(Arc::new(client)))
}

fn output_dir(config: &AppConfig, out: Option<&Path>) -> PathBuf {
    out.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir))
}

/// Read a brief, filling in default channels and attachments.
fn read_brief(path: &Path, config: &AppConfig, attach: &[PathBuf]) -> Result<ContentBrief> {
    let text = std::fs::read_to_string(path).map_err(|e| ContenizeError::io(path, e))?;
    let mut brief: ContentBrief =
        toml::from_str(&text).map_err(|e| eyre!("invalid brief '{}': {e}", path.display()))?;

    if brief.selected_channels.is_empty() {
        brief.selected_channels = config.defaults.channels.clone();
    }

    for file in attach {
        let bytes = std::fs::read(file).map_err(|e| ContenizeError::io(file, e))?;
        brief.attachments.push(Attachment {
            mime_type: mime_type_for(file).to_string(),
            data: BASE64.encode(bytes),
        });
    }

    Ok(brief)
}

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("md") => "text/markdown",
        Some("html" | "htm") => "text/html",
        _ => "text/plain",
    }
}

fn read_plan(path: &Path) -> Result<ContentPlan> {
    let text = std::fs::read_to_string(path).map_err(|e| ContenizeError::io(path, e))?;
    Ok(ContentPlan::from_json(&text)?)
}

/// Write a plan file via temp + rename.
fn write_plan(path: &Path, plan: &ContentPlan) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ContenizeError::io(dir, e))?;
    }
    let json = plan.to_json()?;
    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, json).map_err(|e| ContenizeError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| ContenizeError::io(path, e))?;
    Ok(())
}

/// Print user-facing guidance for an error, then hand it back for exit.
fn report_failure(err: ContenizeError) -> color_eyre::eyre::Report {
    let detail = err.guidance();
    eprintln!();
    eprintln!("  {}", detail.title);
    eprintln!("  {}", detail.message);
    if !detail.solutions.is_empty() {
        eprintln!();
        eprintln!("  Try:");
        for solution in &detail.solutions {
            eprintln!("    - {solution}");
        }
    }
    eprintln!();
    err.into()
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(brief_path: &Path, out: Option<&Path>, pdf: bool, attach: &[PathBuf]) -> Result<()> {
    let config = load_config()?;
    let brief = read_brief(brief_path, &config, attach)?;
    let studio = studio(&config)?;
    let out_dir = output_dir(&config, out);

    info!(
        company = %brief.company_name,
        channels = brief.selected_channels.len(),
        attachments = brief.attachments.len(),
        "generating content plan"
    );

    let progress = CliProgress::new();
    let (plan, batch) = match studio.generate(&brief, &progress).await {
        Ok(generated) => generated,
        Err(e) => {
            progress.finish();
            return Err(report_failure(e));
        }
    };
    let summary = batch.wait(&progress).await;
    progress.finish();

    let plan = studio.current_plan().unwrap_or(plan);
    let plan_path = out_dir.join(format!("{}.json", plan.id));
    write_plan(&plan_path, &plan)?;

    println!();
    println!("  Strategy generated!");
    println!("  Name:   {}", plan.strategy_name);
    println!("  ID:     {}", plan.id);
    println!("  Slices: {}", plan.slices.len());
    println!(
        "  Images: {} applied, {} failed, {} discarded",
        summary.applied, summary.failed, summary.stale
    );
    println!("  Plan:   {}", plan_path.display());

    if pdf {
        let path = contenize_report::export_pdf(&plan, &config.report, &out_dir)
            .map_err(report_failure)?;
        println!("  Report: {}", path.display());
    }

    println!();
    for slice in &plan.slices {
        println!("  {:<20} {}", slice.id, slice.channel);
    }
    println!();

    Ok(())
}

async fn cmd_revise(plan_path: &Path, slice_id: &str, instruction: &str) -> Result<()> {
    let config = load_config()?;
    let plan = read_plan(plan_path)?;
    let studio = studio(&config)?;

    studio.load(plan);
    let slice = studio
        .revise(slice_id, instruction)
        .await
        .map_err(report_failure)?;

    let plan = studio
        .current_plan()
        .ok_or_else(|| eyre!("no plan loaded after revision"))?;
    write_plan(plan_path, &plan)?;

    println!();
    println!("  Slice '{}' revised.", slice.id);
    println!();
    println!("{}", slice.clipboard_text(true));
    println!();

    Ok(())
}

fn cmd_export(plan_path: &Path, out: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let plan = read_plan(plan_path)?;
    let out_dir = output_dir(&config, out);

    let path = contenize_report::export_pdf(&plan, &config.report, &out_dir)
        .map_err(report_failure)?;
    println!("Report written to: {}", path.display());
    Ok(())
}

fn cmd_copy(plan_path: &Path, slice_id: &str, with_aeo: bool) -> Result<()> {
    let plan = read_plan(plan_path)?;
    let slice = plan
        .slice(slice_id)
        .ok_or_else(|| eyre!("plan has no slice '{slice_id}' (available: {})", plan.slice_ids().join(", ")))?;
    println!("{}", slice.clipboard_text(with_aeo));
    Ok(())
}

fn cmd_channels() -> Result<()> {
    for channel in Channel::ALL {
        println!(
            "  {:<18} {:<24} {}",
            channel.as_str(),
            channel.label(),
            channel.orientation().aspect_ratio()
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl StudioProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn illustration(&self, slice_id: &str, outcome: IllustrationOutcome, done: usize, total: usize) {
        let status = match outcome {
            IllustrationOutcome::Applied => "done",
            IllustrationOutcome::Stale => "discarded",
            IllustrationOutcome::Failed => "failed",
        };
        self.spinner
            .set_message(format!("Illustrating [{done}/{total}] {slice_id} {status}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types_from_extension() {
        assert_eq!(mime_type_for(Path::new("deck.PDF")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("a/b.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("notes")), "text/plain");
    }

    #[test]
    fn brief_gets_default_channels_and_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let brief_path = dir.path().join("brief.toml");
        std::fs::write(
            &brief_path,
            r#"
company_name = "Acme"
company_website = "https://acme.example"
industry = "Fintech"
objective = "Trials"
target_audience = "CTOs"
core_content = "Long text"
selected_channels = []
"#,
        )
        .unwrap();
        let attachment = dir.path().join("report.pdf");
        std::fs::write(&attachment, b"%PDF-1.4").unwrap();

        let config = AppConfig::default();
        let brief = read_brief(&brief_path, &config, &[attachment]).unwrap();

        assert_eq!(brief.selected_channels, config.defaults.channels);
        assert_eq!(brief.attachments.len(), 1);
        assert_eq!(brief.attachments[0].mime_type, "application/pdf");
        assert_eq!(brief.attachments[0].data, BASE64.encode(b"%PDF-1.4"));
    }

    #[test]
    fn brief_without_channel_key_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let brief_path = dir.path().join("brief.toml");
        std::fs::write(
            &brief_path,
            r#"
company_name = "Acme"
company_website = "https://acme.example"
industry = "Fintech"
objective = "Trials"
target_audience = "CTOs"
core_content = "Long text"
"#,
        )
        .unwrap();

        let config = AppConfig::default();
        let brief = read_brief(&brief_path, &config, &[]).unwrap();

        assert_eq!(brief.selected_channels, config.defaults.channels);
        assert!(brief.attachments.is_empty());
    }

    #[test]
    fn plan_file_roundtrip() {
        let fixture = std::fs::read_to_string(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../fixtures/json/plan.fixture.json"
        ))
        .unwrap();
        let plan = ContentPlan::from_json(&fixture).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("plan.json");
        write_plan(&path, &plan).unwrap();

        assert_eq!(read_plan(&path).unwrap(), plan);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn cli_parses_generate() {
        let cli = Cli::parse_from([
            "contenize", "-vv", "generate", "--brief", "b.toml", "--pdf", "--attach", "x.pdf",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Generate { brief, pdf, attach, out } => {
                assert_eq!(brief, PathBuf::from("b.toml"));
                assert!(pdf);
                assert_eq!(attach, vec![PathBuf::from("x.pdf")]);
                assert!(out.is_none());
            }
            _ => panic!("expected generate"),
        }
    }
}
