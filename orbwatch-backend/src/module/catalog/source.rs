///! Network sources for element sets and auxiliary feeds
use async_trait::async_trait;
use orbwatch_common::tle::{is_line_one, is_line_two};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::validator::content_lines;
use crate::error::SourceError;

const USER_AGENT: &str = "orbwatch/0.1";

/// Something that can produce a raw payload for a fetch group.
///
/// Implementations perform exactly one attempt; retry policy belongs to
/// the caller.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, group: &str) -> Result<String, SourceError>;
}

/// HTTP source built from URL templates.
///
/// `{group}` and `{name}` are replaced by the URL-encoded key and
/// `{api_key}` by the configured key. A source either uses one template
/// for every key or looks the template up by key.
pub struct HttpFeedSource {
    client: Client,
    templates: HashMap<String, String>,
    shared_template: Option<String>,
    api_key: String,
}

fn build_client(timeout_seconds: u64) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))
}

impl HttpFeedSource {
    /// One template shared by every group.
    pub fn new(url_template: impl Into<String>, api_key: impl Into<String>, timeout_seconds: u64) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            templates: HashMap::new(),
            shared_template: Some(url_template.into()),
            api_key: api_key.into(),
        })
    }

    /// One template per feed name; unknown names fail with `UnknownFeed`.
    pub fn with_feeds<I, K, V>(feeds: I, api_key: impl Into<String>, timeout_seconds: u64) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            templates: feeds.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            shared_template: None,
            api_key: api_key.into(),
        })
    }

    pub fn url_for(&self, key: &str) -> Result<String, SourceError> {
        let template = self
            .templates
            .get(key)
            .or(self.shared_template.as_ref())
            .ok_or_else(|| SourceError::UnknownFeed(key.to_string()))?;
        let encoded = urlencoding::encode(key);
        Ok(template
            .replace("{group}", &encoded)
            .replace("{name}", &encoded)
            .replace("{api_key}", &urlencoding::encode(&self.api_key)))
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, group: &str) -> Result<String, SourceError> {
        let url = self.url_for(group)?;
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response.text().await.map_err(|e| SourceError::Transport {
            url,
            reason: format!("failed to read body: {}", e),
        })
    }
}

/// The `name` block of a three-line payload, matched case-insensitively.
fn select_named(text: &str, name: &str) -> Option<String> {
    let lines = content_lines(text);
    lines.windows(3).find_map(|w| {
        let matches = w[0].trim().eq_ignore_ascii_case(name) && is_line_one(w[1]) && is_line_two(w[2]);
        matches.then(|| format!("{}\n{}\n{}\n", w[0].trim(), w[1], w[2]))
    })
}

/// Resolves a fixed list of object names one request each and joins the
/// matches into a single three-line payload.
///
/// Names that fail or do not match are logged and skipped; the fetch only
/// fails when nothing resolved.
pub struct NamedObjectSource {
    inner: Arc<dyn FeedSource>,
    names: Vec<String>,
}

impl NamedObjectSource {
    pub fn new(inner: Arc<dyn FeedSource>, names: Vec<String>) -> Self {
        Self { inner, names }
    }
}

#[async_trait]
impl FeedSource for NamedObjectSource {
    async fn fetch(&self, group: &str) -> Result<String, SourceError> {
        let mut payload = String::new();
        let mut resolved = 0;
        let mut last_error = None;

        for name in &self.names {
            match self.inner.fetch(name).await {
                Ok(text) => match select_named(&text, name) {
                    Some(block) => {
                        payload.push_str(&block);
                        resolved += 1;
                    }
                    None => tracing::warn!("No element set named '{}' in response", name),
                },
                Err(e) => {
                    tracing::warn!("Failed to fetch '{}': {}", name, e);
                    last_error = Some(e);
                }
            }
        }

        if resolved == 0 {
            return Err(last_error.unwrap_or_else(|| SourceError::NotFound(format!("group '{}'", group))));
        }
        tracing::info!("Resolved {} of {} named objects", resolved, self.names.len());
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_BLOCK: &str = "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
";

    /// Answers by key from a fixed table
    struct KeyedSource(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl FeedSource for KeyedSource {
        async fn fetch(&self, group: &str) -> Result<String, SourceError> {
            self.0.get(group).map(|t| t.to_string()).ok_or_else(|| SourceError::Status {
                status: 404,
                url: format!("stub://{}", group),
            })
        }
    }

    #[test]
    fn test_url_template_substitution() {
        let source = HttpFeedSource::new(
            "https://celestrak.org/NORAD/elements/gp.php?GROUP={group}&FORMAT=tle",
            "",
            30,
        )
        .unwrap();
        assert_eq!(
            source.url_for("cosmos-2251-debris").unwrap(),
            "https://celestrak.org/NORAD/elements/gp.php?GROUP=cosmos-2251-debris&FORMAT=tle"
        );
        assert_eq!(
            source.url_for("a b&c").unwrap(),
            "https://celestrak.org/NORAD/elements/gp.php?GROUP=a%20b%26c&FORMAT=tle"
        );

        let by_name = HttpFeedSource::new("https://celestrak.org/NORAD/elements/gp.php?NAME={name}&FORMAT=tle", "", 30).unwrap();
        assert_eq!(
            by_name.url_for("ISS (ZARYA)").unwrap(),
            "https://celestrak.org/NORAD/elements/gp.php?NAME=ISS%20%28ZARYA%29&FORMAT=tle"
        );
    }

    #[test]
    fn test_feed_templates_resolve_by_name() {
        let feeds = HttpFeedSource::with_feeds(
            [
                ("notifications", "https://api.nasa.gov/DONKI/notifications?api_key={api_key}"),
                ("neo", "https://api.nasa.gov/neo/rest/v1/feed/today?detailed=false&api_key={api_key}"),
            ],
            "DEMO_KEY",
            30,
        )
        .unwrap();
        assert_eq!(
            feeds.url_for("notifications").unwrap(),
            "https://api.nasa.gov/DONKI/notifications?api_key=DEMO_KEY"
        );
        assert_eq!(
            feeds.url_for("neo").unwrap(),
            "https://api.nasa.gov/neo/rest/v1/feed/today?detailed=false&api_key=DEMO_KEY"
        );
        assert!(matches!(feeds.url_for("cme"), Err(SourceError::UnknownFeed(name)) if name == "cme"));
    }

    #[test]
    fn test_select_named() {
        let text = format!("{}HST\n1 20580U\n2 20580\n", ISS_BLOCK.replace("ISS (ZARYA)", "ISS DEB"));
        assert_eq!(select_named(&text, "iss deb").unwrap().lines().count(), 3);
        assert!(select_named(&text, "ISS (ZARYA)").is_none());
        assert!(select_named(&text, "HST").is_some());
    }

    #[tokio::test]
    async fn test_named_source_skips_missing_names() {
        let inner = Arc::new(KeyedSource(HashMap::from([("ISS (ZARYA)", ISS_BLOCK)])));
        let source = NamedObjectSource::new(inner.clone(), vec!["ISS (ZARYA)".to_string(), "NOT UP YET".to_string()]);
        let payload = source.fetch("famous").await.unwrap();
        assert_eq!(payload, ISS_BLOCK);

        let none = NamedObjectSource::new(inner, vec!["NOT UP YET".to_string()]);
        assert!(matches!(none.fetch("famous").await, Err(SourceError::Status { status: 404, .. })));
    }

    #[tokio::test]
    #[ignore] // Requires network connection
    async fn test_fetch_stations() {
        let source = HttpFeedSource::new(
            "https://celestrak.org/NORAD/elements/gp.php?GROUP={group}&FORMAT=tle",
            "",
            30,
        )
        .unwrap();
        let text = source.fetch("stations").await.unwrap();
        assert!(text.contains("ISS"));
    }
}
