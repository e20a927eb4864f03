//! Structured-markup extraction capability.
//!
//! The microformats parsing grammar itself is not this crate's business: the
//! engine consumes a [`Mf2Tree`] through the [`MarkupParser`] capability
//! trait, and interpretation is pure functions over that tree. A conservative
//! built-in scanner lives in [`html`] so the binary runs without an external
//! parser; deployments with a real mf2 parser implement the trait instead.

use async_trait::async_trait;
use url::Url;

pub mod html;
pub mod node;

pub use html::ClassScanParser;
pub use node::{Mf2Tree, MicroformatNode, Value};

/// Turns raw HTML into a property tree.
///
/// Parsing is infallible by contract: a structurally malformed document
/// yields an empty tree, which the orchestrator reports as `NoMentionFound`
/// rather than a transport error.
#[async_trait]
pub trait MarkupParser: Send + Sync {
    async fn parse(&self, html: &str, base_url: &Url) -> Mf2Tree;
}
