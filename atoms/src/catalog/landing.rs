//! Keeps at most one image flagged as the landing image.
//!
//! There is no multi-object transaction in the store, so promotion is a
//! best-effort sweep: every other flagged image is demoted before the
//! target is written. The sweep and the final write are not atomic. Two
//! promotions racing each other can both survive, leaving two flagged
//! images until the next promotion. Sequential promotions always converge
//! to exactly one.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::store::{ObjectStore, StoreError};

/// Outcome of a sweep. Failures are counted, never propagated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Objects other than the target whose metadata was checked.
    pub scanned: usize,
    pub demoted: usize,
    pub failed: usize,
    /// False when the listing itself failed and nothing was checked.
    pub listed: bool,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.listed && self.failed == 0
    }
}

/// Enforces landing-image exclusivity ahead of a promotion.
///
/// The sweep is the only implementation today. A pointer object holding the
/// current landing id, updated with a conditional put, could replace it and
/// remove the O(n) scan.
#[async_trait]
pub trait LandingGuard: Send + Sync {
    async fn demote_others(&self, store: &dyn ObjectStore, target: &str) -> SweepReport;
}

/// Scan-and-demote with bounded fan-out.
#[derive(Debug, Clone)]
pub struct SweepGuard {
    concurrency: usize,
}

impl SweepGuard {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }
}

impl Default for SweepGuard {
    fn default() -> Self {
        Self::new(16)
    }
}

enum Demotion {
    Untouched,
    Demoted,
    Failed,
}

#[async_trait]
impl LandingGuard for SweepGuard {
    async fn demote_others(&self, store: &dyn ObjectStore, target: &str) -> SweepReport {
        let objects = match store.list_objects().await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::warn!(target_id = %target, error = %e, "landing sweep could not list objects");
                return SweepReport::default();
            }
        };

        let siblings: Vec<String> = objects
            .into_iter()
            .map(|obj| obj.key)
            .filter(|key| key != target)
            .collect();

        let mut report = SweepReport {
            scanned: siblings.len(),
            listed: true,
            ..Default::default()
        };

        // buffer_unordered drives every demotion to completion; one failure
        // does not cancel the rest.
        let outcomes: Vec<Demotion> = stream::iter(siblings)
            .map(|key| demote_if_flagged(store, key))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Demotion::Untouched => {}
                Demotion::Demoted => report.demoted += 1,
                Demotion::Failed => report.failed += 1,
            }
        }

        tracing::info!(
            target_id = %target,
            scanned = report.scanned,
            demoted = report.demoted,
            failed = report.failed,
            "landing sweep finished"
        );
        report
    }
}

async fn demote_if_flagged(store: &dyn ObjectStore, key: String) -> Demotion {
    let head = match store.head_object(&key).await {
        Ok(head) => head,
        // Deleted between list and head; nothing left to demote.
        Err(StoreError::NotFound(_)) => return Demotion::Untouched,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "failed to read sibling during landing sweep");
            return Demotion::Failed;
        }
    };

    if !head.metadata.is_landing_image() {
        return Demotion::Untouched;
    }

    let mut metadata = head.metadata;
    metadata.is_landing_image = Some(false);

    match store
        .replace_metadata(&key, head.content_type.as_deref(), &metadata)
        .await
    {
        Ok(()) => {
            tracing::info!(key = %key, "demoted previous landing image");
            Demotion::Demoted
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "failed to demote previous landing image");
            Demotion::Failed
        }
    }
}
