//! Attachment previews.
//!
//! A preview request goes through three stages:
//!
//! 1. [`ContentTypeDispatcher::admit`] classifies the file by extension and
//!    applies the size ceiling, without touching the network.
//! 2. The provider fetches the bytes with a single range request.
//! 3. [`ContentTypeDispatcher::decode`] turns them into a [`PreviewArtifact`]:
//!    an object URL for media and markup, text for text and code, or raw
//!    bytes for the table parser.
//!
//! [`PreviewSlot`] drives the stages for one pane and keeps a late response
//! from overwriting a newer selection.

mod blob;
mod dispatcher;
mod kind;
mod sanitize;
mod slot;

pub use blob::{Blob, BlobRegistry, ObjectUrl};
pub use dispatcher::{Admission, ContentTypeDispatcher, PreviewArtifact};
pub use kind::{ContentKind, extension, mime_type};
pub use sanitize::{HttpResourceFetcher, ResourceFetcher, inline_images, strip_scripts};
pub use slot::{LoadOutcome, PreviewSlot, PreviewState};
