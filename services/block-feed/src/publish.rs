//! Snapshot publishing
//!
//! The consumer registered with the ingestor. Feeds every sub-block to the
//! aggregator and, whenever a history changed, builds a fresh
//! [`FeedSnapshot`] and replaces the value on a `watch` channel. Readers
//! never touch the aggregator.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use types::block::SubBlockEvent;

use crate::aggregator::{BlockAggregator, IngestOutcome, SubBlockConsumer};
use crate::metrics::FeedMetrics;
use crate::snapshot::{FeedSnapshot, SnapshotBuilder};

/// Aggregator plus snapshot channel.
pub struct SnapshotPublisher {
    aggregator: BlockAggregator,
    builder: SnapshotBuilder,
    sender: watch::Sender<Arc<FeedSnapshot>>,
    metrics: Arc<FeedMetrics>,
}

impl SnapshotPublisher {
    pub fn new(aggregator: BlockAggregator, metrics: Arc<FeedMetrics>) -> Self {
        let (sender, _) = watch::channel(Arc::new(FeedSnapshot::default()));
        Self {
            aggregator,
            builder: SnapshotBuilder::new(),
            sender,
            metrics,
        }
    }

    /// Ingest one sub-block and publish if anything changed.
    pub fn publish(&mut self, event: SubBlockEvent) -> IngestOutcome {
        let outcome = self.aggregator.ingest(event);
        self.metrics.record_ingest(&outcome);

        if outcome.changed_histories() {
            let snapshot = self.builder.build(&self.aggregator);
            debug!(
                version = snapshot.version,
                sub_blocks = snapshot.sub_blocks.len(),
                blocks = snapshot.blocks.len(),
                "Publishing snapshot"
            );
            // send_replace stores the value even with no receivers
            self.sender.send_replace(Arc::new(snapshot));
        }

        outcome
    }

    /// New reader of the snapshot stream.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FeedSnapshot>> {
        self.sender.subscribe()
    }

    /// Most recently published snapshot.
    pub fn current(&self) -> Arc<FeedSnapshot> {
        self.sender.borrow().clone()
    }

    pub fn aggregator(&self) -> &BlockAggregator {
        &self.aggregator
    }
}

impl SubBlockConsumer for SnapshotPublisher {
    fn on_sub_block(&mut self, event: SubBlockEvent) {
        self.publish(event);
    }
}
