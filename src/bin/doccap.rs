//! CLI binary for edgequake-doccapture.
//!
//! A thin shim over the library crate: each `--doc LABEL=PATH` is one
//! select-and-capture through a file-backed camera, then a single generate
//! request renders the PDF and optionally uploads it.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doccapture::{
    clear_all, generate, CameraConstraints, CaptureConfig, CaptureSession, DirCacheStore,
    DriveCredentials, EnvTokenProvider, FileCamera, FileNaming, GenerationOutput,
    GoogleDriveClient, PageLayout, SelectionMode, SessionNotifier,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Terminal notifier using indicatif ────────────────────────────────────────

/// Prints notices above a spinner that tracks the current step.
struct CliNotifier {
    bar: ProgressBar,
    quiet: bool,
}

impl CliNotifier {
    fn new(quiet: bool) -> Arc<Self> {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        };
        Arc::new(Self { bar, quiet })
    }

    fn step(&self, prefix: &'static str, msg: impl Into<String>) {
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg.into());
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SessionNotifier for CliNotifier {
    fn alert(&self, message: &str) {
        // Failures still reach the terminal in quiet mode.
        let is_success = message.ends_with("successfully!") || message == "Cache cleared!";
        if self.quiet && is_success {
            return;
        }
        let line = if is_success {
            format!("{} {}", green("✔"), bold(message))
        } else {
            format!("{} {}", red("✘"), message)
        };
        if self.bar.is_hidden() {
            eprintln!("{line}");
        } else {
            self.bar.println(line);
        }
    }

    fn on_selection_changed(&self, label: Option<&str>) {
        if let Some(label) = label {
            self.step("Capturing", label.to_string());
        }
    }

    fn on_capture(&self, label: &str, width: u32, height: u32) {
        self.bar.println(format!(
            "  {} {:<12} {}",
            green("✓"),
            label,
            dim(&format!("{width}x{height}")),
        ));
    }

    fn on_pdf_rendered(&self, file_name: &str, size_bytes: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            cyan("◆"),
            file_name,
            dim(&format!("{size_bytes} bytes")),
        ));
        self.step("Uploading", file_name.to_string());
    }

    fn on_upload_complete(&self, file_name: &str, file_id: &str) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            file_name,
            dim(&format!("id {file_id}")),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Capture the five standard documents and save the PDF locally
  doccap --id "850101 5000 08 1" \
    --doc KB=kb.jpg --doc SSO=sso.jpg --doc "HAZARD ID=hazard.jpg" \
    --doc "ID FRONT=front.jpg" --doc "ID BACK=back.jpg" -o out/

  # Only two documents required, one continuous PDF, uploaded to Drive
  doccap --id 8501015000081 --required "ID FRONT,ID BACK" --layout continuous \
    --doc "ID FRONT=front.png" --doc "ID BACK=back.png" --upload

  # Wipe the offline cache and show what happened
  doccap --clear-cache ~/.cache/doccap --show-log

ENVIRONMENT VARIABLES:
  GOOGLE_DRIVE_ACCESS_TOKEN  Bearer token with the drive.file scope (for --upload)
  GOOGLE_API_KEY             Optional API key appended to Drive requests
  GOOGLE_CLIENT_ID           OAuth client the token was issued to
"#;

/// Capture document photos into a PDF and upload it to Google Drive.
#[derive(Parser, Debug)]
#[command(
    name = "doccap",
    version,
    about = "Capture document photos into a PDF and upload it to Google Drive",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// 13-digit ID number; spaces and other separators are ignored.
    #[arg(long, env = "DOCCAP_ID")]
    id: Option<String>,

    /// Captured document as LABEL=PATH. Repeat for each document; a repeated
    /// label replaces the earlier photo.
    #[arg(long = "doc", value_name = "LABEL=PATH", value_parser = parse_doc)]
    docs: Vec<(String, PathBuf)>,

    /// Comma-separated labels that must be captured before generating.
    #[arg(
        long,
        env = "DOCCAP_REQUIRED",
        value_delimiter = ',',
        default_value = "KB,SSO,HAZARD ID,ID FRONT,ID BACK"
    )]
    required: Vec<String>,

    /// Page layout: per-document or continuous.
    #[arg(long, env = "DOCCAP_LAYOUT", value_enum, default_value = "per-document")]
    layout: LayoutArg,

    /// File naming: dashed (ID_dd-mm-yyyy.pdf) or underscored (ID_d_m_yyyy.pdf).
    #[arg(long, env = "DOCCAP_NAMING", value_enum, default_value = "dashed")]
    naming: NamingArg,

    /// Directory for a local copy of the PDF. Defaults to the current
    /// directory when --upload is not given.
    #[arg(short = 'o', long, env = "DOCCAP_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Upload the PDF to Google Drive.
    #[arg(long, env = "DOCCAP_UPLOAD")]
    upload: bool,

    /// Drive folder to upload into (created when missing).
    #[arg(long, env = "DOCCAP_FOLDER", default_value = "Employee test packs")]
    folder: String,

    /// Upload timeout in seconds.
    #[arg(long, env = "DOCCAP_UPLOAD_TIMEOUT", default_value_t = 60)]
    upload_timeout: u64,

    /// JPEG quality for embedded photos (1–100).
    #[arg(long, env = "DOCCAP_JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Delete every cache bucket under DIR.
    #[arg(long, value_name = "DIR")]
    clear_cache: Option<PathBuf>,

    /// Print the activity log when done.
    #[arg(long)]
    show_log: bool,

    /// Output structured JSON (GenerationOutput) on stdout.
    #[arg(long, env = "DOCCAP_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCCAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCCAP_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    PerDocument,
    Continuous,
}

impl From<LayoutArg> for PageLayout {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::PerDocument => PageLayout::PerDocument,
            LayoutArg::Continuous => PageLayout::Continuous,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum NamingArg {
    Dashed,
    Underscored,
}

impl From<NamingArg> for FileNaming {
    fn from(v: NamingArg) -> Self {
        match v {
            NamingArg::Dashed => FileNaming::Dashed,
            NamingArg::Underscored => FileNaming::Underscored,
        }
    }
}

/// Parse `LABEL=PATH`.
fn parse_doc(s: &str) -> std::result::Result<(String, PathBuf), String> {
    let (label, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=PATH, got '{s}'"))?;
    let label = label.trim();
    if label.is_empty() {
        return Err(format!("missing label in '{s}'"));
    }
    if path.trim().is_empty() {
        return Err(format!("missing path for '{label}'"));
    }
    Ok((label.to_string(), PathBuf::from(path.trim())))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Notices cover normal runs; library INFO logs need --verbose or RUST_LOG.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let notifier = CliNotifier::new(cli.quiet || cli.json);
    let config = build_config(&cli, notifier.clone())?;
    let mut session = CaptureSession::new(&config);

    let result = run(&cli, &config, &mut session, &notifier).await;
    notifier.finish();

    if cli.show_log {
        eprintln!("{}", bold("Activity log"));
        eprintln!("{}", session.log().render());
    }
    result
}

async fn run(
    cli: &Cli,
    config: &CaptureConfig,
    session: &mut CaptureSession,
    notifier: &CliNotifier,
) -> Result<()> {
    // ── Cache maintenance ────────────────────────────────────────────────
    if let Some(ref dir) = cli.clear_cache {
        notifier.step("Cache", dir.display().to_string());
        let store = DirCacheStore::new(dir);
        let removed = clear_all(&store, session)
            .await
            .context("Failed to clear cache")?;
        if !cli.quiet && !cli.json {
            eprintln!("   {}", dim(&format!("{removed} buckets removed")));
        }
        if cli.id.is_none() && cli.docs.is_empty() {
            return Ok(());
        }
    }

    let id = cli
        .id
        .as_deref()
        .context("--id is required to generate a PDF")?;

    // ── Capture ──────────────────────────────────────────────────────────
    let mut camera = FileCamera::new();
    session
        .start_camera(&mut camera, &CameraConstraints::default())
        .await
        .context("Failed to start camera")?;
    for (label, path) in &cli.docs {
        session.select(label);
        camera.aim_at(path);
        session
            .capture_from(&mut camera, None)
            .await
            .with_context(|| format!("Failed to capture {label} from {}", path.display()))?;
    }
    camera.stop();

    // ── Generate ─────────────────────────────────────────────────────────
    notifier.step("Rendering", "assembling PDF…");
    let output = generate(session, id, config)
        .await
        .context("PDF generation failed")?;
    notifier.finish();

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output);
    }
    Ok(())
}

/// Map CLI args to `CaptureConfig`.
fn build_config(cli: &Cli, notifier: Arc<CliNotifier>) -> Result<CaptureConfig> {
    let required: Vec<String> = cli
        .required
        .iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    let mut builder = CaptureConfig::builder()
        .required_documents(required)
        .selection_mode(SelectionMode::Sticky)
        .layout(cli.layout.into())
        .file_naming(cli.naming.into())
        .folder_name(cli.folder.clone())
        .jpeg_quality(cli.jpeg_quality)
        .upload_timeout_secs(cli.upload_timeout)
        .notifier(notifier);

    match cli.output_dir {
        Some(ref dir) => builder = builder.output_dir(dir.clone()),
        None if !cli.upload => builder = builder.output_dir("."),
        None => {}
    }

    if cli.upload {
        let drive = GoogleDriveClient::new(
            Arc::new(EnvTokenProvider::default()),
            DriveCredentials::from_env(),
            cli.upload_timeout,
        )
        .context("Failed to create Drive client")?;
        builder = builder.storage(Arc::new(drive));
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &GenerationOutput) {
    eprintln!(
        "{}  {}  {} pages  {} bytes  {}ms",
        green("✔"),
        bold(&output.file_name),
        output.page_count,
        output.pdf_size_bytes,
        output.stats.total_duration_ms,
    );
    eprintln!(
        "   {} {}",
        dim("ID"),
        output.id_number,
    );
    eprintln!(
        "   {} {}",
        dim("documents"),
        output.documents.join(", "),
    );
    if let Some(ref path) = output.saved_to {
        eprintln!("   {} {}", dim("saved to"), path.display());
    }
    if let Some(ref upload) = output.upload {
        eprintln!(
            "   {} file {} in folder {}",
            dim("uploaded"),
            upload.file_id,
            upload.folder_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_doc_splits_on_first_equals() {
        let (label, path) = parse_doc("ID FRONT=scans/a=b.png").unwrap();
        assert_eq!(label, "ID FRONT");
        assert_eq!(path, PathBuf::from("scans/a=b.png"));
    }

    #[test]
    fn parse_doc_rejects_missing_parts() {
        assert!(parse_doc("front.png").is_err());
        assert!(parse_doc("=front.png").is_err());
        assert!(parse_doc("KB=").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["doccap", "--id", "8501015000081"]).unwrap();
        assert_eq!(cli.required.len(), 5);
        assert_eq!(cli.folder, "Employee test packs");
        assert!(!cli.upload);

        let config = build_config(&cli, CliNotifier::new(true)).unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from(".")));
        assert!(config.storage.is_none());
        assert_eq!(config.selection_mode, SelectionMode::Sticky);
    }

    #[test]
    fn repeated_docs_are_collected() {
        let cli = Cli::try_parse_from([
            "doccap",
            "--id",
            "1",
            "--doc",
            "KB=kb.png",
            "--doc",
            "KB=kb2.png",
            "--required",
            "KB",
        ])
        .unwrap();
        assert_eq!(cli.docs.len(), 2);
        assert_eq!(cli.required, ["KB"]);
    }
}
