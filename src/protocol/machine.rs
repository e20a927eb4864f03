//! The protocol state machine.
//!
//! Sequences resolve, fetch, verify, interpret, and reconcile for one claim
//! and always terminates in a [`ProtocolOutcome`] or an explicit
//! [`EngineFault`]; nothing below this layer propagates an unhandled error
//! past [`Engine::process`]. The machine keeps no state between claims:
//! everything is re-derived from the claim and the stores, so replaying a
//! delivery is safe.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::EngineConfig;
use crate::fetch::{FetchCache, FetchError, HttpTransport, SourceFetcher};
use crate::interpret::interpret;
use crate::mf2::MarkupParser;
use crate::notify::Notifier;
use crate::reconcile::reconcile;
use crate::resolver::TargetResolver;
use crate::store::{MentionStore, PostStore, StoreError};
use crate::types::{Claim, ReconcileResult, TargetKey, TargetResolution};
use crate::verify::{meta_status, verify_link_back};

use super::{ProtocolOutcome, RejectReason, WireOutcome};

/// A fault outside the protocol's rejection taxonomy.
///
/// Store failures are infrastructure problems, not statements about the
/// claim; they surface through the wire shape as a generic error without
/// crashing the worker.
#[derive(Debug, Error)]
pub enum EngineFault {
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

/// Converts a processing result into the wire contract.
pub fn wire(result: &Result<ProtocolOutcome, EngineFault>) -> WireOutcome {
    match result {
        Ok(outcome) => outcome.to_wire(),
        Err(EngineFault::Store(_)) => WireOutcome::internal("persistence failure"),
    }
}

/// The orchestrator, holding every capability the pipeline consumes.
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    posts: Arc<dyn PostStore>,
    mentions: Arc<dyn MentionStore>,
    transport: Arc<dyn HttpTransport>,
    parser: Arc<dyn MarkupParser>,
    notifier: Arc<dyn Notifier>,
    resolver: TargetResolver,
    fetcher: SourceFetcher,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        posts: Arc<dyn PostStore>,
        mentions: Arc<dyn MentionStore>,
        transport: Arc<dyn HttpTransport>,
        parser: Arc<dyn MarkupParser>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let resolver = TargetResolver::new(config.site.clone(), config.fetch.clone());
        let fetcher = SourceFetcher::new(config.fetch.clone());
        Engine {
            config,
            posts,
            mentions,
            transport,
            parser,
            notifier,
            resolver,
            fetcher,
        }
    }

    /// Resolves a claim's target. Read-only; used by the dispatcher before
    /// routing the claim to its per-target worker.
    pub async fn resolve(
        &self,
        cache: &mut FetchCache,
        claim: &Claim,
    ) -> Result<TargetResolution, EngineFault> {
        let resolution = self
            .resolver
            .resolve(
                self.transport.as_ref(),
                cache,
                self.posts.as_ref(),
                &claim.target,
            )
            .await?;
        debug!(target = %claim.target, ?resolution, "target resolved");
        Ok(resolution)
    }

    /// Runs the full pipeline for one claim.
    #[tracing::instrument(skip_all, fields(source = %claim.source, target = %claim.target))]
    pub async fn process(&self, claim: &Claim) -> Result<ProtocolOutcome, EngineFault> {
        let mut cache = FetchCache::new();
        let resolution = self.resolve(&mut cache, claim).await?;
        self.process_resolved(claim, &resolution, &mut cache).await
    }

    /// Runs the pipeline from the fetch stage onward, with resolution
    /// already done. This is the entry point workers use; `cache` is the
    /// per-claim cache the dispatcher's redirect probes already warmed.
    pub async fn process_resolved(
        &self,
        claim: &Claim,
        resolution: &TargetResolution,
        cache: &mut FetchCache,
    ) -> Result<ProtocolOutcome, EngineFault> {
        let (key, aliases) = match resolution {
            TargetResolution::KnownPost { post, aliases } => {
                (TargetKey::Post(*post), aliases.clone())
            }
            TargetResolution::DomainMention => {
                (TargetKey::Domain, vec![self.config.site.base_url.clone()])
            }
            TargetResolution::Unresolved { reason } => {
                info!(target = %claim.target, %reason, "target unresolved");
                return Ok(ProtocolOutcome::rejected(RejectReason::UnknownTarget));
            }
        };

        let doc = match self
            .fetcher
            .fetch(self.transport.as_ref(), cache, &claim.source)
            .await
        {
            Ok(doc) => doc,
            Err(err) => {
                info!(source = %claim.source, %err, "source fetch rejected");
                return Ok(ProtocolOutcome::rejected(reject_for_fetch(&err)));
            }
        };

        // Deletion is inferred from the current state of the source: a hard
        // 410, or a 2xx carrying an http-equiv status of 410. This path
        // bypasses verification and interpretation entirely.
        let reports_gone = doc.status == 410
            || (doc.is_success() && meta_status(&doc.body) == Some(410));
        if reports_gone {
            return self.mark_source_deleted(key, &claim.source).await;
        }

        if !doc.is_success() {
            info!(source = %claim.source, status = doc.status, "source not retrievable");
            return Ok(ProtocolOutcome::rejected(RejectReason::SourceUnreachable));
        }

        if !verify_link_back(&doc, &aliases) {
            info!(source = %claim.source, "no link back to target");
            return Ok(ProtocolOutcome::rejected(RejectReason::NoLinkBack));
        }

        let tree = self.parser.parse(&doc.body, &doc.final_url).await;
        let candidates = interpret(
            &tree,
            &claim.source,
            &aliases,
            Utc::now(),
            &self.config.interpret,
        );
        if candidates.is_empty() {
            info!(source = %claim.source, "linked but no interpretable entry");
            return Ok(ProtocolOutcome::rejected(RejectReason::NoMentionFound));
        }

        let existing = self.mentions.list_for_target(key).await?;
        let result = reconcile(candidates, &existing);
        self.apply(key, &result).await
    }

    /// Flags every stored mention from `source` as deleted.
    ///
    /// Zero affected mentions is still a success; the source's word on its
    /// own removal is accepted regardless of what was stored.
    async fn mark_source_deleted(
        &self,
        key: TargetKey,
        source: &Url,
    ) -> Result<ProtocolOutcome, EngineFault> {
        let stored = self.mentions.find_by_source(key, source).await?;
        let result = ReconcileResult {
            to_mark_deleted: stored
                .iter()
                .filter(|m| !m.deleted)
                .map(|m| m.id)
                .collect(),
            ..Default::default()
        };
        info!(%source, count = result.to_mark_deleted.len(), "source reports itself gone");
        self.apply(key, &result).await
    }

    async fn apply(
        &self,
        key: TargetKey,
        result: &ReconcileResult,
    ) -> Result<ProtocolOutcome, EngineFault> {
        let counts = self.mentions.apply(key, result).await?;
        if counts != Default::default() {
            self.notifier.mentions_changed(key, counts).await;
        }
        info!(
            target = %key,
            created = counts.created,
            updated = counts.updated,
            deleted = counts.deleted,
            "claim reconciled"
        );
        Ok(ProtocolOutcome::Success {
            created: counts.created,
            updated: counts.updated,
            deleted: counts.deleted,
        })
    }

    /// Delivers the wire outcome to an optional sender-supplied callback.
    ///
    /// Callback failures are logged and swallowed; the outcome stands.
    pub async fn deliver_callback(&self, callback: &Url, outcome: &WireOutcome) {
        let body = match serde_json::to_value(outcome) {
            Ok(body) => body,
            Err(err) => {
                warn!(%err, "outcome not serializable");
                return;
            }
        };
        match self
            .transport
            .post_json(callback, &body, &self.config.fetch.user_agent)
            .await
        {
            Ok(status) => debug!(%callback, status, "callback delivered"),
            Err(err) => warn!(%callback, %err, "callback delivery failed"),
        }
    }
}

fn reject_for_fetch(err: &FetchError) -> RejectReason {
    match err {
        FetchError::Network(_) => RejectReason::SourceUnreachable,
        FetchError::TooLarge { .. } => RejectReason::TooLarge,
        FetchError::WrongContentType { .. } => RejectReason::WrongContentType,
    }
}
