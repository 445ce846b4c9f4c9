//! Display snapshots for the Block Feed Service
//!
//! Wraps the aggregator's histories into versioned snapshots for the
//! display layer. Every entry carries a freshness flag: true when its key
//! was absent from the previous snapshot, so a client can animate only the
//! entries that just arrived.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use types::block::{CompletedBlock, SubBlockEvent};

use crate::aggregator::BlockAggregator;

/// One displayable history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry<T> {
    /// Stable key (`{block}#{index}` for sub-blocks, `{block}` for blocks)
    pub key: String,
    /// Whether the key was absent from the previous snapshot
    pub is_fresh: bool,
    #[serde(flatten)]
    pub item: T,
}

/// A versioned view of both histories, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedSnapshot {
    /// Monotonic snapshot version (0 before the first build).
    pub version: u64,
    pub sub_blocks: Vec<DisplayEntry<SubBlockEvent>>,
    pub blocks: Vec<DisplayEntry<CompletedBlock>>,
}

impl FeedSnapshot {
    /// Sub-blocks without display metadata.
    pub fn sub_block_items(&self) -> Vec<SubBlockEvent> {
        self.sub_blocks.iter().map(|e| e.item).collect()
    }

    /// Completed blocks without display metadata.
    pub fn block_items(&self) -> Vec<CompletedBlock> {
        self.blocks.iter().map(|e| e.item).collect()
    }
}

/// Builds snapshots and remembers the keys of the previous one.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    version_counter: u64,
    previous_sub_block_keys: HashSet<String>,
    previous_block_keys: HashSet<String>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the next snapshot from the aggregator's current state.
    pub fn build(&mut self, aggregator: &BlockAggregator) -> FeedSnapshot {
        self.version_counter += 1;

        let sub_blocks = mark_fresh(
            aggregator.sub_blocks().iter().map(|e| (e.key(), *e)),
            &mut self.previous_sub_block_keys,
        );
        let blocks = mark_fresh(
            aggregator.blocks().iter().map(|b| (b.key(), *b)),
            &mut self.previous_block_keys,
        );

        FeedSnapshot {
            version: self.version_counter,
            sub_blocks,
            blocks,
        }
    }

    /// Current snapshot version.
    pub fn version(&self) -> u64 {
        self.version_counter
    }
}

/// Flag entries whose keys were not in `previous`, then replace `previous`
/// with the current keys.
fn mark_fresh<T>(
    entries: impl Iterator<Item = (String, T)>,
    previous: &mut HashSet<String>,
) -> Vec<DisplayEntry<T>> {
    let display: Vec<DisplayEntry<T>> = entries
        .map(|(key, item)| DisplayEntry {
            is_fresh: !previous.contains(&key),
            key,
            item,
        })
        .collect();

    *previous = display.iter().map(|e| e.key.clone()).collect();
    display
}
