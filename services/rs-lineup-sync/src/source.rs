//!
//! src/source.rs  Andrew Belles  Sept 15th, 2025
//!
//! Fetches a venue page and pulls performer names out of it. The rest of
//! the crate only sees the resulting ordered set of names
//!

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::errors::SyncError;
use crate::types::CandidateName;

/// Relay prefix is concatenated as is, the way cors relays expect the
/// target appended to their own url
pub fn request_url(cfg: &SourceConfig, url: &str) -> String {
    match cfg.relay.as_deref().map(str::trim) {
        Some(relay) if !relay.is_empty() => format!("{relay}{url}"),
        _ => url.to_string()
    }
}

pub async fn fetch_page(client: &Client, cfg: &SourceConfig, url: &str) ->
    Result<String, SyncError> {
    let target = request_url(cfg, url);
    debug!(url = %target, "source.fetch");

    let resp = client.get(&target)
        .send()
        .await
        .map_err(|e| SyncError::Source(format!("fetch {url}: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(SyncError::Source(format!("fetch {url}: status {status}")));
    }

    let body = resp.text()
        .await
        .map_err(|e| SyncError::Source(format!("read {url}: {e}")))?;
    info!(url, bytes = body.len(), "source.fetched");
    Ok(body)
}

/// Text of every element matching `selector`, trimmed, without empties or
/// duplicates, sorted
pub fn extract_names(html: &str, selector: &str) -> Result<Vec<CandidateName>, SyncError> {
    let sel = Selector::parse(selector)
        .map_err(|e| SyncError::Source(format!("invalid selector {selector:?}: {e:?}")))?;
    let doc = Html::parse_document(html);

    let texts: Vec<String> = doc.select(&sel)
        .map(|el| el.text().collect::<String>())
        .collect();

    let mut names = CandidateName::collect_unique(texts);
    names.sort();
    debug!(selector, found = names.len(), "source.extracted");
    Ok(names)
}
