use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::driver::PageDriver;
use crate::extract::normalize::ScriptFilter;
use crate::extract::{self, ResultSet};
use crate::loader::{self, OpenTiming, PauseRange, ScrollPolicy};

/// Resolved per-run parameters.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub limit: Option<usize>,
    pub policy: ScrollPolicy,
    pub pauses: PauseRange,
    pub timing: OpenTiming,
    pub filter: ScriptFilter,
}

/// Owns one browser session for the length of one run.
pub struct Crawler<D: PageDriver> {
    page: D,
    options: CrawlOptions,
}

impl<D: PageDriver> Crawler<D> {
    pub fn new(page: D, options: CrawlOptions) -> Self {
        Self { page, options }
    }

    /// Open, scroll, extract. The session is quit exactly once afterwards,
    /// whether or not the crawl succeeded.
    pub async fn run(self, url: &str) -> Result<ResultSet> {
        let outcome = crawl(&self.page, url, &self.options).await;
        let quit = self.page.quit().await;

        match (outcome, quit) {
            (Ok(result), Ok(())) => Ok(result),
            (Ok(_), Err(e)) => Err(e.context("Failed to quit browser session")),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(quit_err)) => {
                warn!("Browser quit also failed: {:#}", quit_err);
                Err(e)
            }
        }
    }
}

async fn crawl<D: PageDriver>(page: &D, url: &str, options: &CrawlOptions) -> Result<ResultSet> {
    info!("Crawling comments: {}", url);
    loader::open_video(page, url, options.timing).await?;
    loader::scroll_all(page, options.policy, options.pauses).await?;
    let fields = extract::collect_fields(page)
        .await
        .context("Failed to read comment elements")?;
    Ok(extract::build_result(fields, &options.filter, options.limit))
}
