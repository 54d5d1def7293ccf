use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{rng, Rng};
use serde_json::Value;
use tracing::{debug, info};

use crate::driver::{Keystroke, PageDriver, Selector};

pub const HEIGHT_SCRIPT: &str = "return document.documentElement.scrollHeight";
pub const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.documentElement.scrollHeight);";

const BODY: Selector = Selector::Tag("body");

/// Fixed waits around the initial page-down nudge.
#[derive(Debug, Clone, Copy)]
pub struct OpenTiming {
    pub settle: Duration,
    pub lazy_load: Duration,
}

/// Pauses between scroll attempts are drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseRange {
    min: Duration,
    max: Duration,
}

impl PauseRange {
    /// Returns `None` when `min > max`.
    pub fn new(min: Duration, max: Duration) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn sample(&self) -> Duration {
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        Duration::from_millis(rng().random_range(lo..=hi))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPolicy {
    /// Consecutive unchanged height readings that end the loop.
    pub max_idle: usize,
    /// Hard cap on scroll attempts; `None` scrolls until the height is stable.
    pub max_scroll: Option<usize>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrollStats {
    pub attempts: usize,
    pub idle: usize,
}

/// Open the video and nudge the page once so the comments section starts loading.
pub async fn open_video<D: PageDriver>(page: &D, url: &str, timing: OpenTiming) -> Result<()> {
    page.goto(url).await?;
    tokio::time::sleep(timing.settle).await;
    page.send_key(BODY, Keystroke::PageDown)
        .await
        .context("Failed to send page-down to <body>")?;
    tokio::time::sleep(timing.lazy_load).await;
    debug!("Opened URL and initiated comments section load");
    Ok(())
}

/// Scroll to the bottom until the document height stops growing for
/// `max_idle` consecutive attempts, or `max_scroll` attempts were made.
pub async fn scroll_all<D: PageDriver>(
    page: &D,
    policy: ScrollPolicy,
    pauses: PauseRange,
) -> Result<ScrollStats> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);

    let mut last_height = document_height(page).await?;
    let mut stats = ScrollStats::default();

    loop {
        if policy.max_scroll.is_some_and(|cap| stats.attempts >= cap) {
            debug!("Reached max_scroll={}", stats.attempts);
            break;
        }

        page.execute(SCROLL_SCRIPT)
            .await
            .context("Failed to scroll to the bottom of the page")?;
        stats.attempts += 1;
        tokio::time::sleep(pauses.sample()).await;

        let new_height = document_height(page).await?;
        if new_height == last_height {
            stats.idle += 1;
            if stats.idle >= policy.max_idle {
                debug!(
                    "Stopping scroll: idle_count={} max_idle={}",
                    stats.idle, policy.max_idle
                );
                break;
            }
        } else {
            stats.idle = 0;
            last_height = new_height;
        }

        spinner.set_message(format!(
            "scroll attempts: {} | height: {}px",
            stats.attempts, last_height
        ));
        spinner.tick();
    }

    spinner.finish_and_clear();
    info!(
        "Scrolling finished: attempts={} idle_count={}",
        stats.attempts, stats.idle
    );
    Ok(stats)
}

async fn document_height<D: PageDriver>(page: &D) -> Result<u64> {
    let value = page
        .execute(HEIGHT_SCRIPT)
        .await
        .context("Failed to measure document height")?;
    parse_height(&value)
}

fn parse_height(value: &Value) -> Result<u64> {
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|h| h.is_finite() && *h >= 0.0)
                .map(|h| h as u64)
        })
        .ok_or_else(|| anyhow!("Document height is not a number: {}", value))
}
