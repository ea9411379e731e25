//! CLI binary for edgequake-pdf2quiz.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `QuizConfig` / `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2quiz::{
    extract_text, generate_quiz, inspect, render_export, write_export, CancellationToken,
    Difficulty, GenerationConfig, LanguageMode, PageRange, ProgressCallback, QuestionType,
    QuizConfig, QuizProgressCallback, TextSource,
};
use edgequake_pdf2quiz::prompts::DEFAULT_MAX_PROMPT_CHARS;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a page bar during extraction, then a spinner
/// while the model writes the quiz.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

impl QuizProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reading");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, source: TextSource, chars: usize) {
        let tag = match source {
            TextSource::Native => dim("text"),
            TextSource::Recognized => cyan("ocr "),
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            green("✓"),
            page_num,
            total,
            tag,
            dim(&format!("{chars:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_page_degraded(&self, page_num: usize, total: usize, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            yellow("⚠"),
            page_num,
            total,
            yellow(&msg),
        ));
    }

    fn on_extraction_complete(&self, total_pages: usize, recognized: usize) {
        self.bar.println(format!(
            "{} {} pages read ({} via OCR)",
            cyan("◆"),
            bold(&total_pages.to_string()),
            recognized
        ));
    }

    fn on_generation_start(&self, model: &str, prompt_chars: usize) {
        self.bar.set_style(spinner_style());
        self.bar.set_prefix("Generating");
        self.bar
            .set_message(format!("{model}  {}", dim(&format!("{prompt_chars} prompt chars"))));
    }

    fn on_generation_complete(&self, questions: usize, skipped: usize) {
        self.bar.finish_and_clear();
        if skipped == 0 {
            eprintln!("{} {} questions generated", green("✔"), bold(&questions.to_string()));
        } else {
            eprintln!(
                "{} {} questions generated  ({} malformed dropped)",
                yellow("⚠"),
                bold(&questions.to_string()),
                skipped
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ten mixed questions from pages 12-18 (stdout)
  pdf2quiz biology.pdf --pages 12-18

  # Hard multiple-choice quiz in Hindi, written to a file
  pdf2quiz --pages 3-7 --difficulty hard --type multiple-choice --language hindi book.pdf -o quiz.txt

  # Bilingual quiz as JSON
  pdf2quiz --language bilingual --count 5 --json book.pdf > quiz.json

  # Only extract the page text (no API key needed)
  pdf2quiz --extract-only --pages 40-42 scanned.pdf

  # Inspect PDF metadata (no API key needed)
  pdf2quiz --inspect-only book.pdf

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY      Google Gemini API key (GOOGLE_API_KEY also accepted)
  GEMINI_MODEL        Model ID (default: gemini-2.0-flash)
  GEMINI_API_BASE     Override the API host
  PDFIUM_LIB_PATH     Path to libpdfium (file or directory)
  RUST_LOG            Log filter, e.g. edgequake_pdf2quiz=debug

SETUP:
  1. Install libpdfium and tesseract (with the eng and hin language data)
  2. Set API key:     export GEMINI_API_KEY=...
  3. Generate:        pdf2quiz book.pdf --pages 1-10
"#;

/// Generate study questions from PDF textbook pages.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2quiz",
    version,
    about = "Generate study questions from PDF textbook pages",
    long_about = "Read a page range of a PDF textbook (native text, with tesseract OCR for \
scanned pages) and generate multiple-choice or short-answer questions in English, Hindi or \
both with a language model.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the quiz (plain-text export) to this file instead of stdout.
    #[arg(short, long, env = "PDF2QUIZ_OUTPUT")]
    output: Option<PathBuf>,

    /// Page range: all, 5, or 3-15 (1-indexed, inclusive).
    #[arg(long, env = "PDF2QUIZ_PAGES", default_value = "all")]
    pages: String,

    /// Number of questions.
    #[arg(short = 'n', long, env = "PDF2QUIZ_COUNT", default_value_t = 10,
          value_parser = clap::value_parser!(u16).range(1..=100))]
    count: u16,

    /// Question difficulty.
    #[arg(short, long, env = "PDF2QUIZ_DIFFICULTY", value_enum, default_value = "medium")]
    difficulty: DifficultyArg,

    /// Question type.
    #[arg(short = 't', long = "type", env = "PDF2QUIZ_TYPE", value_enum, default_value = "mixed")]
    question_type: TypeArg,

    /// Output language.
    #[arg(short, long, env = "PDF2QUIZ_LANGUAGE", value_enum, default_value = "english")]
    language: LanguageArg,

    /// Gemini model ID (e.g. gemini-2.0-flash, gemini-2.5-pro).
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Use an edgequake-llm provider instead of Gemini (openai, anthropic, ollama, …).
    #[arg(long, env = "PDF2QUIZ_PROVIDER")]
    provider: Option<String>,

    /// Sampling temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "PDF2QUIZ_TEMPERATURE")]
    temperature: Option<f32>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2QUIZ_PASSWORD")]
    password: Option<String>,

    /// Never run OCR; scanned pages contribute no text.
    #[arg(long, env = "PDF2QUIZ_NO_OCR")]
    no_ocr: bool,

    /// Path to the tesseract binary.
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    tesseract: String,

    /// Pages read concurrently (output order is always by page).
    #[arg(long, env = "PDF2QUIZ_OCR_CONCURRENCY", default_value_t = 1)]
    ocr_concurrency: usize,

    /// Character budget for the page text in the prompt.
    #[arg(long, env = "PDF2QUIZ_MAX_CHARS", default_value_t = DEFAULT_MAX_PROMPT_CHARS)]
    max_chars: usize,

    /// Output structured JSON instead of the text export.
    #[arg(long, env = "PDF2QUIZ_JSON")]
    json: bool,

    /// Print the extracted page text only; no generation.
    #[arg(long)]
    extract_only: bool,

    /// Print PDF metadata only.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2QUIZ_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2QUIZ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2QUIZ_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2QUIZ_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Generation call timeout in seconds.
    #[arg(long, env = "PDF2QUIZ_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(v: DifficultyArg) -> Self {
        match v {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TypeArg {
    Mixed,
    MultipleChoice,
    ShortAnswer,
}

impl From<TypeArg> for QuestionType {
    fn from(v: TypeArg) -> Self {
        match v {
            TypeArg::Mixed => QuestionType::Mixed,
            TypeArg::MultipleChoice => QuestionType::MultipleChoice,
            TypeArg::ShortAnswer => QuestionType::ShortAnswer,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LanguageArg {
    English,
    Hindi,
    Bilingual,
}

impl From<LanguageArg> for LanguageMode {
    fn from(v: LanguageArg) -> Self {
        match v {
            LanguageArg::English => LanguageMode::English,
            LanguageArg::Hindi => LanguageMode::Hindi,
            LanguageArg::Bilingual => LanguageMode::Bilingual,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Ctrl-C → cancellation ────────────────────────────────────────────
    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
    }

    let range = parse_pages(&cli.pages)?;
    let cli_cb = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = cli_cb
        .clone()
        .map(|cb| cb as Arc<dyn QuizProgressCallback>);
    let config = build_config(&cli, progress_cb, token)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let combined = extract_text(&cli.input, range, cli.language.into(), &config)
            .await
            .context("Text extraction failed")?;
        if let Some(ref cb) = cli_cb {
            cb.bar.finish_and_clear();
        }

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&combined).context("Failed to serialise output")?
            );
        } else {
            write_stdout(&combined.text)?;
        }
        if !cli.quiet {
            eprintln!(
                "{} {}  {} chars  {} via OCR  {} page errors",
                dim("◆"),
                combined.range,
                combined.char_count(),
                combined.report.recognized_pages.len(),
                combined.report.page_errors.len(),
            );
        }
        return Ok(());
    }

    // ── Generate ─────────────────────────────────────────────────────────
    let quiz = QuizConfig::new(
        cli.difficulty.into(),
        cli.count as usize,
        cli.question_type.into(),
        cli.language.into(),
    )
    .context("Invalid quiz parameters")?;

    let output = generate_quiz(&cli.input, range, &quiz, &config)
        .await
        .context("Quiz generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(ref path) = cli.output {
        write_export(path, &output.questions)
            .await
            .context("Failed to write quiz")?;
    } else {
        write_stdout(&render_export(&output.questions))?;
    }

    if !cli.quiet && !cli.json {
        let stats = &output.stats;
        eprintln!(
            "   {}  {}  {}ms total{}",
            output.range,
            dim(&stats.model),
            stats.total_duration_ms,
            if stats.truncated {
                yellow("  (page text truncated for the prompt)")
            } else {
                String::new()
            },
        );
        if let Some(ref path) = cli.output {
            eprintln!("   →  {}", bold(&path.display().to_string()));
        }
    }

    Ok(())
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    token: CancellationToken,
) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .ocr_enabled(!cli.no_ocr)
        .tesseract_path(&cli.tesseract)
        .ocr_concurrency(cli.ocr_concurrency)
        .max_prompt_chars(cli.max_chars)
        .cancellation(token);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` into a `PageRange`. Ranges past the end are clamped later.
fn parse_pages(s: &str) -> Result<PageRange> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageRange::new(1, usize::MAX));
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 || end < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {}-{})", start, end);
        }
        return Ok(PageRange::new(start, end));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageRange::single(page))
}
