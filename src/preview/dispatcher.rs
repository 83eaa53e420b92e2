use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use super::blob::{BlobRegistry, ObjectUrl};
use super::kind::{ContentKind, extension, mime_type};
use super::sanitize::{HttpResourceFetcher, ResourceFetcher, inline_images, strip_scripts};
use crate::config::DEFAULT_PREVIEW_CEILING;
use crate::error::{Error, Result};

/// Displayable result of decoding one attachment.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewArtifact {
    /// Binary or markup payload exposed through an object URL
    Media {
        kind: ContentKind,
        url: ObjectUrl,
        mime: String,
        /// Object URLs the document refers to (inlined `<img>` sources)
        resources: Vec<ObjectUrl>,
    },
    Text {
        kind: ContentKind,
        text: String,
        /// Lowercased file extension, as a highlighting hint
        language: Option<String>,
    },
    /// Raw bytes for the external table parser
    Table { bytes: Bytes },
}

/// Outcome of the cheap checks that run before any byte is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Load(ContentKind),
    Unsupported,
    TooBig,
    Empty,
}

/// Classifies attachments and decodes fetched bytes into preview artifacts.
pub struct ContentTypeDispatcher {
    ceiling: u64,
    blobs: BlobRegistry,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl ContentTypeDispatcher {
    pub fn new(ceiling: u64, blobs: BlobRegistry, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            ceiling,
            blobs,
            fetcher,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_PREVIEW_CEILING,
            BlobRegistry::new(),
            Arc::new(HttpResourceFetcher::default()),
        )
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Decide whether `name` with `size` bytes is worth fetching at all.
    pub fn admit(&self, name: &str, size: u64) -> Admission {
        match ContentKind::classify(name) {
            ContentKind::Unsupported => Admission::Unsupported,
            _ if size > self.ceiling => Admission::TooBig,
            _ if size == 0 => Admission::Empty,
            kind => Admission::Load(kind),
        }
    }

    /// Turn fetched bytes into an artifact according to `name`'s kind.
    pub async fn decode(&self, name: &str, bytes: Bytes) -> Result<PreviewArtifact> {
        let kind = ContentKind::classify(name);
        debug!(name, ?kind, size = bytes.len(), "decoding preview");

        let artifact = match kind {
            ContentKind::Image | ContentKind::Audio | ContentKind::Video | ContentKind::Pdf => {
                self.media(kind, bytes, mime_type(name), Vec::new())
            }
            ContentKind::Svg => {
                let clean = strip_scripts(&String::from_utf8_lossy(&bytes));
                self.media(kind, Bytes::from(clean), mime_type(name), Vec::new())
            }
            ContentKind::Html => {
                let clean = strip_scripts(&String::from_utf8_lossy(&bytes));
                let (html, resources) =
                    inline_images(&clean, self.fetcher.as_ref(), &self.blobs).await;
                self.media(kind, Bytes::from(html), mime_type(name), resources)
            }
            ContentKind::Text | ContentKind::Code => {
                let language = extension(name);
                let raw = String::from_utf8_lossy(&bytes).into_owned();
                let text = if language.as_deref() == Some("json") {
                    pretty_json(raw)
                } else {
                    raw
                };
                PreviewArtifact::Text {
                    kind,
                    text,
                    language,
                }
            }
            ContentKind::Table => PreviewArtifact::Table { bytes },
            ContentKind::Unsupported => {
                return Err(Error::UnsupportedType {
                    name: name.to_string(),
                });
            }
        };

        Ok(artifact)
    }

    fn media(
        &self,
        kind: ContentKind,
        bytes: Bytes,
        mime: &str,
        resources: Vec<ObjectUrl>,
    ) -> PreviewArtifact {
        PreviewArtifact::Media {
            kind,
            url: self.blobs.create(bytes, mime),
            mime: mime.to_string(),
            resources,
        }
    }
}

/// Re-indent JSON with two spaces; text that does not parse is kept as is.
fn pretty_json(raw: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(raw),
        Err(err) => {
            debug!(error = %err, "json preview left unformatted");
            raw
        }
    }
}
