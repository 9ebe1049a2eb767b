//! Author lookups against Semantic Scholar.

use crate::error::{IngestError, Result};
use crate::prestige::AuthorStats;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Semantic Scholar author search endpoint.
pub const SEMANTIC_SCHOLAR_URL: &str = "https://api.semanticscholar.org/graph/v1/author/search";

const AUTHOR_FIELDS: &str = "name,hIndex,citationCount,url";

/// Resolves an author name to bibliometrics.
///
/// Lookups never fail the batch: anything that goes wrong resolves to
/// `None`, which scores as `(0, 0)`.
pub trait ScholarLookup: Send + Sync {
    fn lookup<'a>(&'a self, author: &'a str) -> BoxFuture<'a, Option<AuthorStats>>;
}

impl<T: ScholarLookup + ?Sized> ScholarLookup for &T {
    fn lookup<'a>(&'a self, author: &'a str) -> BoxFuture<'a, Option<AuthorStats>> {
        (**self).lookup(author)
    }
}

#[derive(Debug, Deserialize)]
struct AuthorSearchResponse {
    #[serde(default)]
    data: Vec<AuthorRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    h_index: Option<u32>,
    #[serde(default)]
    citation_count: Option<u64>,
    #[serde(default)]
    url: Option<String>,
}

/// Parse an author search body, taking the first match.
///
/// Missing `hIndex` or `citationCount` fields count as zero.
pub fn parse_author_search(body: &str) -> Result<Option<AuthorStats>> {
    let response: AuthorSearchResponse = serde_json::from_str(body)?;
    Ok(response.data.into_iter().next().map(|record| {
        debug!(
            "Matched {} ({})",
            record.name.as_deref().unwrap_or("unnamed"),
            record.url.as_deref().unwrap_or("no url")
        );
        AuthorStats::new(
            record.h_index.unwrap_or(0),
            record.citation_count.unwrap_or(0),
        )
    }))
}

/// HTTP client for the Semantic Scholar author search.
pub struct SemanticScholarClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SemanticScholarClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("paperdigest-ingest/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IngestError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: SEMANTIC_SCHOLAR_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Search for `author` and return the first match's stats.
    pub async fn search(&self, author: &str) -> Result<Option<AuthorStats>> {
        let url = reqwest::Url::parse_with_params(
            &self.endpoint,
            &[("query", author), ("fields", AUTHOR_FIELDS)],
        )
        .map_err(|e| IngestError::Configuration(format!("bad scholar endpoint: {e}")))?;

        let start = Instant::now();
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(
            "Author search for {author}: HTTP {status} in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            return Err(IngestError::Source(format!(
                "author search HTTP {}: {text}",
                status.as_u16()
            )));
        }
        parse_author_search(&text)
    }
}

impl ScholarLookup for SemanticScholarClient {
    fn lookup<'a>(&'a self, author: &'a str) -> BoxFuture<'a, Option<AuthorStats>> {
        async move {
            match self.search(author).await {
                Ok(Some(stats)) => Some(stats),
                Ok(None) => {
                    warn!("No Semantic Scholar profile for {author}");
                    None
                }
                Err(e) => {
                    warn!("Author lookup for {author} failed: {e}");
                    None
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_the_first_match() {
        let body = r#"{
            "total": 2,
            "offset": 0,
            "data": [
                {"authorId": "1", "name": "Ada Lovelace", "hIndex": 31, "citationCount": 4200, "url": "https://example.org/a/1"},
                {"authorId": "2", "name": "Ada L.", "hIndex": 2, "citationCount": 10}
            ]
        }"#;
        assert_eq!(
            parse_author_search(body).unwrap(),
            Some(AuthorStats::new(31, 4200))
        );
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(parse_author_search(r#"{"total": 0, "data": []}"#).unwrap(), None);
        assert_eq!(parse_author_search(r#"{"total": 0}"#).unwrap(), None);
    }

    #[test]
    fn null_metrics_count_as_zero() {
        let body = r#"{"data": [{"name": "New Author", "hIndex": null}]}"#;
        assert_eq!(
            parse_author_search(body).unwrap(),
            Some(AuthorStats::default())
        );
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_author_search("<html>rate limited</html>"),
            Err(IngestError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_resolves_to_none() {
        let client = SemanticScholarClient::new()
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/graph/v1/author/search");
        assert_eq!(client.lookup("Ada Lovelace").await, None);
    }

    #[tokio::test]
    async fn invalid_endpoint_resolves_to_none() {
        let client = SemanticScholarClient::new()
            .unwrap()
            .with_endpoint("not a url");
        assert_eq!(client.lookup("Ada Lovelace").await, None);
    }
}
