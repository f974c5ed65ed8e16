//! CLI binary for pdf-data-extractor.
//!
//! A thin shim over the library crate: resolves the extraction service,
//! maps CLI flags to `ExtractionConfig`, prints each page's row as soon as
//! the page is extracted and writes the CSV export.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_data_extractor::{
    CancelFlag, ExtractionConfig, ExtractionProgressCallback, PipelineOrchestrator,
    ServiceSettings, EXPORT_FILENAME,
};
use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Prints each page's row to stdout as it completes, with a live progress
/// bar and one log line per page on stderr.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner only; the bar length is set in `on_run_start` once the
    /// document has been rendered. A hidden bar still prints rows.
    fn new(show_bar: bool) -> Arc<Self> {
        if !show_bar {
            return Arc::new(Self {
                bar: ProgressBar::hidden(),
                started: Mutex::new(HashMap::new()),
            });
        }

        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER);

        bar.set_style(spinner_style);
        bar.set_prefix("Rendering");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Extracting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting data from {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.started.lock() {
            started.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, content: &str) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>5} chars", content.len())),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.suspend(|| print_row(page_num, content));
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: String) {
        let secs = self.elapsed_secs(page_num);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_progress(&self, pages_done: usize, _total: usize) {
        self.bar.set_position(pages_done as u64);
    }

    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_pages.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} pages extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} failed)",
                if failed == total_pages { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every page, write extracted_data.csv
  pdf-extract invoice.pdf

  # Choose the export path
  pdf-extract report.pdf -o out/report.csv

  # Use a specific provider and model
  pdf-extract --provider openai --model gpt-4.1-mini scan.pdf

  # Local model, no API key needed
  pdf-extract --provider ollama --model llava scan.pdf

  # Full structured output (results, dataset, stats) as JSON
  pdf-extract --json invoice.pdf > invoice.json

SUPPORTED PROVIDERS (auto-detected in this order):
  Provider     Key variable         Default model
  ─────────    ─────────────────    ────────────────────────
  gemini       GEMINI_API_KEY       gemini-2.0-flash
               (or GOOGLE_API_KEY)
  openai       OPENAI_API_KEY       gpt-4.1-nano
  anthropic    ANTHROPIC_API_KEY    claude-sonnet-4-20250514
  mistral      MISTRAL_API_KEY      pixtral-12b-2409
  ollama       (none)               llava
  lmstudio     (none)               (set --model)

ENVIRONMENT VARIABLES:
  PDF_EXTRACT_PROVIDER    Override provider
  PDF_EXTRACT_MODEL       Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Override log filter

  Variables are also read from a .env file in the working directory.
"#;

/// Extract structured data from every page of a PDF using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-extract",
    version,
    about = "Extract structured data from every page of a PDF using Vision LLMs",
    long_about = "Render each page of a PDF, send it to a Vision Language Model with a \
fixed transcription instruction, and collect the per-page results into one CSV dataset. \
Pages that fail are reported and skipped; the remaining pages are kept.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write the CSV export to this path.
    #[arg(short, long, env = "PDF_EXTRACT_OUTPUT", default_value = EXPORT_FILENAME)]
    output: PathBuf,

    /// Extraction service provider: gemini, openai, anthropic, mistral, ollama, lmstudio.
    #[arg(long, env = "PDF_EXTRACT_PROVIDER")]
    provider: Option<String>,

    /// Model ID for the chosen provider.
    #[arg(long, env = "PDF_EXTRACT_MODEL")]
    model: Option<String>,

    /// Rendering DPI (36–400).
    #[arg(long, env = "PDF_EXTRACT_DPI", default_value_t = 72,
          value_parser = clap::value_parser!(u32).range(36..=400))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_EXTRACT_PASSWORD")]
    password: Option<String>,

    /// Path to a text file replacing the default extraction instruction.
    #[arg(long, env = "PDF_EXTRACT_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// Max output tokens per page.
    #[arg(long, env = "PDF_EXTRACT_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDF_EXTRACT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Per-page service call timeout in seconds.
    #[arg(long, env = "PDF_EXTRACT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Print the full output (results, dataset, stats) as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Resolve the extraction service before doing any work ─────────────
    let settings = ServiceSettings::from_env(cli.provider.as_deref(), cli.model.as_deref())
        .context("Cannot start without an extraction service")?;
    if !cli.quiet {
        eprintln!(
            "{} {} / {}",
            dim("service"),
            bold(&settings.provider),
            settings.model
        );
    }

    let config = build_config(&cli).await?;
    let mut orchestrator = PipelineOrchestrator::from_config(&config, &settings)
        .context("Failed to create the extraction service")?;
    if !cli.quiet && !cli.json {
        orchestrator = orchestrator.with_progress(CliProgressCallback::new(show_progress));
    }

    // ── Ctrl-C stops after the page in flight; a second one exits ────────
    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, &cancel).await {
            eprintln!("{}", red("Aborted."));
            std::process::exit(130);
        }
    });

    // ── Run extraction ───────────────────────────────────────────────────
    let document = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let output = orchestrator
        .extract(&document)
        .await
        .context("Extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    output
        .dataset
        .write_csv(&cli.output)
        .await
        .context("Failed to export CSV")?;

    if !cli.quiet && !cli.json {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} pages  {} rows  {}ms  →  {}",
            if stats.failed_pages == 0 { green("✔") } else { cyan("⚠") },
            stats.succeeded_pages,
            stats.total_pages,
            output.dataset.len(),
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.instruction {
        let instruction = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {}", path.display()))?;
        builder = builder.instruction(instruction);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }

    builder.build().context("Invalid configuration")
}

/// Wait for interrupts: the first sets `cancel`, the second returns `true`
/// so the caller can exit without waiting for the page in flight.
async fn watch_interrupts<F, Fut>(mut next_signal: F, cancel: &CancelFlag) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    eprintln!(
        "{}",
        cyan("Interrupted; finishing the current page… (Ctrl-C again to quit)")
    );
    cancel.cancel();
    next_signal().await.is_ok()
}

/// One block per row on stdout. A closed stdout is ignored so the run can
/// still finish and write the CSV.
fn print_row(page_num: usize, content: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "── Page {page_num} ──\n{content}\n");
}
