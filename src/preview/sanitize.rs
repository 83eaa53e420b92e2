//! Script stripping and image inlining for markup previews.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::sync::LazyLock;
use tracing::warn;

use super::blob::{Blob, BlobRegistry, ObjectUrl};
use super::kind::mime_type;
use crate::error::{NetworkError, Result};

// An unterminated `<script>` swallows the rest of the document, as a browser would.
static SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>(?:.*?</script\s*>|.*\z)").expect("valid script pattern")
});

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid img pattern")
});

/// Remove every `<script>` element, case-insensitively and across lines.
///
/// Runs until no element is left, so a tag split around an inner one
/// (`<scr<script></script>ipt>`) cannot reassemble.
pub fn strip_scripts(markup: &str) -> String {
    let mut out = markup.to_string();
    while SCRIPT.is_match(&out) {
        out = SCRIPT.replace_all(&out, "").into_owned();
    }
    out
}

/// Source of the resources an HTML preview references.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, src: &str) -> Result<Blob>;
}

/// Fetches `<img>` sources over plain HTTP GET.
#[derive(Clone, Default)]
pub struct HttpResourceFetcher {
    client: Client,
}

impl HttpResourceFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceFetcher for HttpResourceFetcher {
    async fn fetch(&self, src: &str) -> Result<Blob> {
        let resp = self
            .client
            .get(src)
            .send()
            .await
            .map_err(NetworkError::from)?;
        if !resp.status().is_success() {
            return Err(NetworkError::Status {
                status: resp.status().as_u16(),
            }
            .into());
        }

        let mime = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| mime_type(src).to_string());
        let bytes = resp.bytes().await.map_err(NetworkError::from)?;

        Ok(Blob { bytes, mime })
    }
}

/// Point every `<img src>` of `html` at a local object URL.
///
/// Best effort: a source that fails to load is logged and left untouched.
/// `data:` and `blob:` sources are already local and are skipped. The
/// returned handles keep the rewritten images alive.
pub async fn inline_images(
    html: &str,
    fetcher: &dyn ResourceFetcher,
    blobs: &BlobRegistry,
) -> (String, Vec<ObjectUrl>) {
    // Collected up front so no regex state is held across the fetches.
    let sources: Vec<(usize, usize)> = IMG_SRC
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut out = String::with_capacity(html.len());
    let mut handles = Vec::new();
    let mut last = 0;

    for (start, end) in sources {
        let value = &html[start..end];
        if value.is_empty() || value.starts_with("data:") || value.starts_with("blob:") {
            continue;
        }

        match fetcher.fetch(value).await {
            Ok(blob) => {
                let url = blobs.create(blob.bytes, &blob.mime);
                out.push_str(&html[last..start]);
                out.push_str(url.as_str());
                last = end;
                handles.push(url);
            }
            Err(err) => warn!(src = value, error = %err, "failed to inline preview image"),
        }
    }

    out.push_str(&html[last..]);
    (out, handles)
}
