//! Sub-block and full block types
//!
//! A full block is assembled from several sub-blocks (flashblocks) that
//! share its block number. The feed only ever announces sub-blocks; full
//! blocks are derived by the aggregator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Block height on the chain.
pub type BlockNumber = u64;

/// A single sub-block (flashblock) decoded from the feed.
///
/// `sequence_index == 0` marks the first sub-block of a new parent block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubBlockEvent {
    /// Position of this sub-block within its parent block
    pub sequence_index: u64,
    /// Number of the full block this sub-block belongs to
    pub parent_block_number: BlockNumber,
    /// Transactions carried by this sub-block's diff
    pub transaction_count: u64,
}

impl SubBlockEvent {
    pub fn new(sequence_index: u64, parent_block_number: BlockNumber, transaction_count: u64) -> Self {
        Self {
            sequence_index,
            parent_block_number,
            transaction_count,
        }
    }

    /// Whether this sub-block opens a new parent block.
    pub fn is_block_start(&self) -> bool {
        self.sequence_index == 0
    }

    /// The block closed out by this sub-block, if it opens a new one.
    ///
    /// Block 0 has no predecessor, so its first sub-block closes nothing.
    pub fn completes_block(&self) -> Option<BlockNumber> {
        if self.is_block_start() {
            self.parent_block_number.checked_sub(1)
        } else {
            None
        }
    }

    /// Display key, unique per sub-block: `{block}#{index}`.
    pub fn key(&self) -> String {
        format!("{}#{}", self.parent_block_number, self.sequence_index)
    }
}

impl fmt::Display for SubBlockEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{} ({} txs)",
            self.parent_block_number, self.sequence_index, self.transaction_count
        )
    }
}

/// A full block whose sub-blocks have all been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletedBlock {
    pub block_number: BlockNumber,
    /// Sum of the transaction counts of its retained sub-blocks
    pub transaction_count: u64,
}

impl CompletedBlock {
    pub fn new(block_number: BlockNumber, transaction_count: u64) -> Self {
        Self {
            block_number,
            transaction_count,
        }
    }

    /// Display key: the block number.
    pub fn key(&self) -> String {
        self.block_number.to_string()
    }
}

impl fmt::Display for CompletedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} txs)", self.block_number, self.transaction_count)
    }
}
