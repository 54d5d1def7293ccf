pub mod normalize;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::driver::{PageDriver, Selector};
use normalize::ScriptFilter;

pub const COMMENT_SEL: Selector = Selector::XPath(r#"//*[@id="content-text"]"#);
pub const USERNAME_SEL: Selector = Selector::XPath(r#"//*[@id="author-text"]"#);
pub const LIKE_SEL: Selector = Selector::XPath(r#"//*[contains(@id, "vote-count-middle")]"#);
pub const TIME_SEL: Selector = Selector::Css(
    "#published-time-text .yt-simple-endpoint.style-scope.ytd-comment-view-model",
);

/// One extracted comment. Field names double as the CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub username: String,
    pub like_count: String,
    pub timestamp: String,
    pub comment_text: String,
}

impl Row {
    pub const HEADER: [&'static str; 4] = ["username", "likeCount", "timestamp", "commentText"];
}

/// Rows in load order plus the counters describing any truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    rows: Vec<Row>,
    total_collected: usize,
    truncated: bool,
}

impl ResultSet {
    /// Keep the first `limit` rows; `truncated` is set only when rows were dropped.
    pub fn from_rows(mut rows: Vec<Row>, limit: Option<usize>) -> Self {
        let total_collected = rows.len();
        let truncated = match limit {
            Some(limit) if total_collected > limit => {
                rows.truncate(limit);
                true
            }
            _ => false,
        };
        Self {
            rows,
            total_collected,
            truncated,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn total_collected(&self) -> usize {
        self.total_collected
    }

    pub fn used_count(&self) -> usize {
        self.rows.len()
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

/// Raw element texts for the four comment fragments, each in document order.
#[derive(Debug, Default, Clone)]
pub struct RawFields {
    pub comments: Vec<String>,
    pub usernames: Vec<String>,
    pub likes: Vec<String>,
    pub times: Vec<String>,
}

pub async fn collect_fields<D: PageDriver>(page: &D) -> Result<RawFields> {
    let comments = page
        .find_texts(COMMENT_SEL)
        .await
        .context("Failed to collect comment bodies")?;
    let usernames = page
        .find_texts(USERNAME_SEL)
        .await
        .context("Failed to collect authors")?;
    let likes = page
        .find_texts(LIKE_SEL)
        .await
        .context("Failed to collect like counts")?;
    let times = page
        .find_texts(TIME_SEL)
        .await
        .context("Failed to collect timestamps")?;

    debug!(
        "Collected counts | comments={} usernames={} likes={} times={}",
        comments.len(),
        usernames.len(),
        likes.len(),
        times.len()
    );

    Ok(RawFields {
        comments,
        usernames,
        likes,
        times,
    })
}

/// Pair the four collections by index and normalize each field.
///
/// The collections are assumed to line up one-to-one. When they don't,
/// pairing stops at the shortest one.
pub fn build_result(fields: RawFields, filter: &ScriptFilter, limit: Option<usize>) -> ResultSet {
    let lens = [
        fields.comments.len(),
        fields.usernames.len(),
        fields.likes.len(),
        fields.times.len(),
    ];
    if lens.iter().any(|&n| n != lens[0]) {
        warn!(
            "Field counts differ (comments={} usernames={} likes={} times={}); pairing up to the shortest",
            lens[0], lens[1], lens[2], lens[3]
        );
    }

    let rows: Vec<Row> = fields
        .usernames
        .into_iter()
        .zip(fields.likes)
        .zip(fields.times)
        .zip(fields.comments)
        .map(|(((username, likes), time), comment)| Row {
            username,
            like_count: normalize::like_count(likes),
            timestamp: normalize::timestamp(&time),
            comment_text: filter.apply(&comment),
        })
        .collect();

    let result = ResultSet::from_rows(rows, limit);
    info!(
        "Result built: total={} used={} truncated={}",
        result.total_collected(),
        result.used_count(),
        result.truncated()
    );
    result
}
