//! Observability counters for the Block Feed Service
//!
//! Tracks frame traffic, decode failures, aggregation outcomes and
//! connection lifecycle. Counters are shared between the ingestor task and
//! the HTTP endpoints through an `Arc`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::aggregator::IngestOutcome;

/// Core metrics for the Block Feed Service.
#[derive(Debug, Default)]
pub struct FeedMetrics {
    // Frames
    pub frames_received: AtomicU64,
    pub frames_decoded: AtomicU64,
    pub frames_dropped: AtomicU64,

    // Aggregation
    pub sub_blocks_recorded: AtomicU64,
    pub duplicates_dropped: AtomicU64,
    pub out_of_order: AtomicU64,
    pub blocks_completed: AtomicU64,
    pub empty_completions: AtomicU64,

    // Connection lifecycle
    pub sessions_opened: AtomicU64,
    pub connection_errors: AtomicU64,
    pub reconnect_attempts: AtomicU64,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame dropped because it could not be decoded.
    pub fn record_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record what the aggregator did with a sub-block.
    pub fn record_ingest(&self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Recorded | IngestOutcome::DuplicateCompletion(_) => {
                self.sub_blocks_recorded.fetch_add(1, Ordering::Relaxed);
            }
            IngestOutcome::RecordedOutOfOrder => {
                self.sub_blocks_recorded.fetch_add(1, Ordering::Relaxed);
                self.out_of_order.fetch_add(1, Ordering::Relaxed);
            }
            IngestOutcome::Completed(block) => {
                self.sub_blocks_recorded.fetch_add(1, Ordering::Relaxed);
                self.blocks_completed.fetch_add(1, Ordering::Relaxed);
                if block.transaction_count == 0 {
                    self.empty_completions.fetch_add(1, Ordering::Relaxed);
                }
            }
            IngestOutcome::Duplicate => {
                self.duplicates_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Export metrics as a BTreeMap for Prometheus-style exposition.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("frames_received".to_string(), self.frames_received.load(Ordering::Relaxed));
        m.insert("frames_decoded".to_string(), self.frames_decoded.load(Ordering::Relaxed));
        m.insert("frames_dropped".to_string(), self.frames_dropped.load(Ordering::Relaxed));
        m.insert("sub_blocks_recorded".to_string(), self.sub_blocks_recorded.load(Ordering::Relaxed));
        m.insert("duplicates_dropped".to_string(), self.duplicates_dropped.load(Ordering::Relaxed));
        m.insert("out_of_order".to_string(), self.out_of_order.load(Ordering::Relaxed));
        m.insert("blocks_completed".to_string(), self.blocks_completed.load(Ordering::Relaxed));
        m.insert("empty_completions".to_string(), self.empty_completions.load(Ordering::Relaxed));
        m.insert("sessions_opened".to_string(), self.sessions_opened.load(Ordering::Relaxed));
        m.insert("connection_errors".to_string(), self.connection_errors.load(Ordering::Relaxed));
        m.insert("reconnect_attempts".to_string(), self.reconnect_attempts.load(Ordering::Relaxed));
        m
    }
}
