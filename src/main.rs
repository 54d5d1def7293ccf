mod crawler;
mod driver;
mod export;
mod extract;
mod loader;
mod settings;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, info};

use crawler::Crawler;
use driver::ChromeSession;
use extract::ResultSet;
use settings::{RunMode, Settings};

const PREVIEW_ROWS: usize = 10;

#[derive(Debug, Parser)]
#[command(name = "yt_comments", about = "YouTube comment crawler via WebDriver")]
struct Cli {
    /// Target YouTube video URL
    #[arg(long)]
    url: String,
    /// Use the full dataset or test mode (top N)
    #[arg(long = "use", value_enum, default_value_t = RunMode::Fulldata)]
    mode: RunMode,
    /// Top N comments when --use test
    #[arg(long)]
    n: Option<usize>,
    /// Run the browser without a window
    #[arg(long)]
    headless: bool,
    /// Max scroll attempts (omit for auto stop)
    #[arg(long)]
    max_scroll: Option<usize>,
    /// Consecutive unchanged page heights before scrolling stops (default: YT_MAX_IDLE or 2)
    #[arg(long)]
    max_idle: Option<usize>,
    /// Characters kept in comment text, as hex code point ranges (default: AC00-D7A3)
    #[arg(long = "script-range", value_name = "FROM-TO")]
    script_ranges: Vec<String>,
    /// CSV output path (if set, save crawled comments)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// WebDriver server URL (default: YT_WEBDRIVER_URL or http://localhost:9515)
    #[arg(long)]
    webdriver_url: Option<String>,
    /// Logging level; RUST_LOG takes precedence when set
    #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

fn init_tracing(level: LogLevel, log_file: Option<&Path>) -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let limit = settings::resolve_limit(cli.mode, cli.n)?;

    init_tracing(cli.log_level, cli.log_file.as_deref())?;
    debug!("Parsed arguments: {:?}", cli);

    let t0 = Instant::now();
    let settings = Settings::load()?;
    let options = settings.crawl_options(limit, cli.max_scroll, cli.max_idle, &cli.script_ranges)?;
    let webdriver_url = cli.webdriver_url.as_deref().unwrap_or(&settings.webdriver_url);

    let session = ChromeSession::connect(webdriver_url, cli.headless).await?;
    let result = Crawler::new(session, options).run(&cli.url).await?;

    print_summary(&result);

    if let Some(path) = &cli.output {
        export::write_csv(path, &result)?;
        info!("Saved CSV: {}", path.display());
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn print_summary(result: &ResultSet) {
    println!("\n==== Crawl Summary ====");
    println!("Total collected comments: {}", result.total_collected());
    if result.truncated() {
        println!(
            "Used comments: {} (top {})",
            result.used_count(),
            result.used_count()
        );
    } else {
        println!("Used comments: {}", result.used_count());
    }

    if result.rows().is_empty() {
        println!("No comments found.");
        return;
    }

    println!(
        "\n{:>3} | {:<20} | {:>6} | {:<14} | {:<40}",
        "#", "Username", "Likes", "Time", "Comment"
    );
    println!("{}", "-".repeat(95));
    for (i, r) in result.rows().iter().take(PREVIEW_ROWS).enumerate() {
        println!(
            "{:>3} | {:<20} | {:>6} | {:<14} | {:<40}",
            i + 1,
            truncate(&r.username, 20),
            r.like_count,
            truncate(&r.timestamp, 14),
            truncate(r.comment_text.trim(), 40)
        );
    }
    if result.used_count() > PREVIEW_ROWS {
        println!("... {} more", result.used_count() - PREVIEW_ROWS);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_test_mode_parses() {
        let cli = Cli::try_parse_from([
            "yt_comments",
            "--url",
            "https://www.youtube.com/watch?v=abc",
            "--use",
            "test",
            "--n",
            "10",
            "--script-range",
            "AC00-D7A3",
            "--script-range",
            "0030-0039",
            "--log-level",
            "DEBUG",
        ])
        .unwrap();
        assert_eq!(cli.mode, RunMode::Test);
        assert_eq!(settings::resolve_limit(cli.mode, cli.n).unwrap(), Some(10));
        assert_eq!(cli.script_ranges.len(), 2);
        assert!(!cli.headless);
    }

    #[test]
    fn cli_test_mode_without_n_fails_resolution() {
        let cli = Cli::try_parse_from([
            "yt_comments",
            "--url",
            "https://www.youtube.com/watch?v=abc",
            "--use",
            "test",
        ])
        .unwrap();
        assert!(settings::resolve_limit(cli.mode, cli.n).is_err());
    }

    #[test]
    fn cli_requires_url() {
        assert!(Cli::try_parse_from(["yt_comments", "--headless"]).is_err());
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("안녕하세요", 3), "안녕하...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn durations_format() {
        assert_eq!(format_duration(std::time::Duration::from_secs(75)), "1m 15s");
        assert_eq!(format_duration(std::time::Duration::from_secs(3725)), "1h 2m 5s");
    }
}
