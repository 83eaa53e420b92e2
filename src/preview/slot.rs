use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::dispatcher::{Admission, ContentTypeDispatcher, PreviewArtifact};
use crate::error::Error;
use crate::provider::AttachmentsProvider;

/// What a preview view should currently display.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    Idle,
    Loading,
    Resolved(PreviewArtifact),
    Unsupported,
    TooBig,
    Empty,
    Error(String),
}

impl PreviewState {
    /// Map a per-request failure onto a distinguishable state.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::EmptyFile { .. } => PreviewState::Empty,
            Error::UnsupportedType { .. } => PreviewState::Unsupported,
            other => PreviewState::Error(other.to_string()),
        }
    }
}

/// Whether a finished [`PreviewSlot::load`] was allowed to update the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer request took the slot; this result was discarded.
    Superseded,
}

struct SlotInner {
    generation: u64,
    cancel: Option<CancellationToken>,
    state: PreviewState,
}

/// A single preview pane: at most one request in flight, and only the most
/// recent request may write the state.
///
/// Replacing or clearing the state drops the previous artifact, which
/// revokes its object URLs.
pub struct PreviewSlot {
    provider: Arc<dyn AttachmentsProvider>,
    dispatcher: Arc<ContentTypeDispatcher>,
    inner: Mutex<SlotInner>,
}

impl PreviewSlot {
    pub fn new(
        provider: Arc<dyn AttachmentsProvider>,
        dispatcher: Arc<ContentTypeDispatcher>,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            inner: Mutex::new(SlotInner {
                generation: 0,
                cancel: None,
                state: PreviewState::Idle,
            }),
        }
    }

    pub fn state(&self) -> PreviewState {
        self.inner.lock().state.clone()
    }

    /// Preview `path`, cancelling whatever this slot was loading before.
    pub async fn load(&self, path: &str) -> LoadOutcome {
        let cancel = CancellationToken::new();
        let generation = {
            let mut inner = self.inner.lock();
            if let Some(previous) = inner.cancel.replace(cancel.clone()) {
                previous.cancel();
            }
            inner.generation += 1;
            inner.generation
        };

        let Some(entry) = self.provider.entry(path) else {
            let err = Error::NotFound {
                path: path.to_string(),
            };
            return self.commit(generation, PreviewState::from_error(&err));
        };

        match self.dispatcher.admit(path, entry.size) {
            Admission::Load(_) => {}
            Admission::Unsupported => return self.commit(generation, PreviewState::Unsupported),
            Admission::TooBig => return self.commit(generation, PreviewState::TooBig),
            Admission::Empty => return self.commit(generation, PreviewState::Empty),
        }
        if self.commit(generation, PreviewState::Loading) == LoadOutcome::Superseded {
            return LoadOutcome::Superseded;
        }

        let work = async {
            let content = self.provider.attachment_content(path, &cancel).await?;
            self.dispatcher.decode(path, content.bytes).await
        };
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = work => result,
        };

        let state = match result {
            Ok(artifact) => PreviewState::Resolved(artifact),
            Err(Error::Cancelled) => {
                debug!(path, "preview cancelled");
                return LoadOutcome::Superseded;
            }
            Err(err) => PreviewState::from_error(&err),
        };
        self.commit(generation, state)
    }

    /// Cancel any in-flight request and return to `Idle`.
    pub fn clear(&self) {
        let previous = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            if let Some(cancel) = inner.cancel.take() {
                cancel.cancel();
            }
            std::mem::replace(&mut inner.state, PreviewState::Idle)
        };
        drop(previous);
    }

    fn commit(&self, generation: u64, state: PreviewState) -> LoadOutcome {
        let previous = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return LoadOutcome::Superseded;
            }
            if !matches!(state, PreviewState::Loading) {
                inner.cancel = None;
            }
            std::mem::replace(&mut inner.state, state)
        };
        // Old artifacts (and their object URLs) go away outside the lock.
        drop(previous);
        LoadOutcome::Applied
    }
}

impl Drop for PreviewSlot {
    fn drop(&mut self) {
        if let Some(cancel) = self.inner.get_mut().cancel.take() {
            cancel.cancel();
        }
    }
}
