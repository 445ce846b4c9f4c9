//! Block aggregation
//!
//! Turns the ordered stream of sub-blocks into two display histories:
//! recent sub-blocks and recently completed full blocks.
//!
//! The feed has no explicit "block sealed" signal. A block is considered
//! complete when the first sub-block (`sequence_index == 0`) of the next
//! block arrives; its transaction count is the sum over the sub-blocks
//! still retained in the sub-block history at that moment.
//!
//! Redelivered sub-blocks (same parent block and index as a retained one)
//! are ignored, and a block already present in the block history is never
//! completed twice. Neither check looks at entries that have scrolled off.

use serde::Serialize;
use tracing::{debug, info};
use types::block::{BlockNumber, CompletedBlock, SubBlockEvent};

use crate::history::RollingHistory;

/// Number of entries kept in each history by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 16;

/// Receiver of decoded sub-blocks, registered with the ingestor.
pub trait SubBlockConsumer {
    fn on_sub_block(&mut self, event: SubBlockEvent);
}

/// Result of ingesting a single sub-block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Sub-block recorded; no block completed.
    Recorded,
    /// Sub-block recorded, but its index did not increase within its block
    /// or it belongs to a block older than the one being assembled.
    RecordedOutOfOrder,
    /// Sub-block recorded and the previous block completed.
    Completed(CompletedBlock),
    /// Same sub-block already retained; dropped.
    Duplicate,
    /// Sub-block recorded, but the block it closes was already completed.
    DuplicateCompletion(BlockNumber),
}

impl IngestOutcome {
    /// Whether either history changed.
    pub fn changed_histories(&self) -> bool {
        !matches!(self, IngestOutcome::Duplicate)
    }
}

/// The parent block currently being assembled; reset on every block start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AssemblyWindow {
    parent_block_number: BlockNumber,
    highest_index: u64,
}

impl AssemblyWindow {
    fn open(event: &SubBlockEvent) -> Self {
        Self {
            parent_block_number: event.parent_block_number,
            highest_index: event.sequence_index,
        }
    }
}

/// Immutable copy of both histories, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AggregatorSnapshot {
    pub sub_blocks: Vec<SubBlockEvent>,
    pub blocks: Vec<CompletedBlock>,
}

/// Owns both rolling histories and the assembly window.
#[derive(Debug, Clone)]
pub struct BlockAggregator {
    sub_blocks: RollingHistory<SubBlockEvent>,
    blocks: RollingHistory<CompletedBlock>,
    window: Option<AssemblyWindow>,
    sub_blocks_recorded: u64,
    duplicates_dropped: u64,
    blocks_completed: u64,
    empty_completions: u64,
    out_of_order: u64,
}

impl BlockAggregator {
    pub fn new(capacity: usize) -> Self {
        Self::with_capacities(capacity, capacity)
    }

    pub fn with_capacities(sub_block_capacity: usize, block_capacity: usize) -> Self {
        Self {
            sub_blocks: RollingHistory::new(sub_block_capacity),
            blocks: RollingHistory::new(block_capacity),
            window: None,
            sub_blocks_recorded: 0,
            duplicates_dropped: 0,
            blocks_completed: 0,
            empty_completions: 0,
            out_of_order: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }

    /// Ingest one sub-block in arrival order.
    pub fn ingest(&mut self, event: SubBlockEvent) -> IngestOutcome {
        if self.is_retained(&event) {
            self.duplicates_dropped += 1;
            debug!(
                block_number = event.parent_block_number,
                index = event.sequence_index,
                "Dropping redelivered sub-block"
            );
            return IngestOutcome::Duplicate;
        }

        let in_order = self.track_window(&event);
        self.sub_blocks.push(event);
        self.sub_blocks_recorded += 1;

        let Some(completed_number) = event.completes_block() else {
            return if in_order {
                IngestOutcome::Recorded
            } else {
                IngestOutcome::RecordedOutOfOrder
            };
        };

        if self.blocks.iter().any(|b| b.block_number == completed_number) {
            debug!(block_number = completed_number, "Block already completed");
            return IngestOutcome::DuplicateCompletion(completed_number);
        }

        let transaction_count = self.retained_transactions(completed_number);
        let block = CompletedBlock::new(completed_number, transaction_count);
        self.blocks.push(block);
        self.blocks_completed += 1;
        if transaction_count == 0 {
            self.empty_completions += 1;
        }

        info!(
            block_number = completed_number,
            transaction_count,
            "Block completed"
        );

        IngestOutcome::Completed(block)
    }

    /// Sum of transaction counts over retained sub-blocks of `block_number`.
    pub fn retained_transactions(&self, block_number: BlockNumber) -> u64 {
        self.sub_blocks
            .iter()
            .filter(|e| e.parent_block_number == block_number)
            .map(|e| e.transaction_count)
            .sum()
    }

    pub fn snapshot(&self) -> AggregatorSnapshot {
        AggregatorSnapshot {
            sub_blocks: self.sub_blocks.to_vec(),
            blocks: self.blocks.to_vec(),
        }
    }

    pub fn sub_blocks(&self) -> &RollingHistory<SubBlockEvent> {
        &self.sub_blocks
    }

    pub fn blocks(&self) -> &RollingHistory<CompletedBlock> {
        &self.blocks
    }

    /// Total sub-blocks recorded since creation.
    pub fn sub_blocks_recorded(&self) -> u64 {
        self.sub_blocks_recorded
    }

    /// Total redelivered sub-blocks dropped since creation.
    pub fn duplicates_dropped(&self) -> u64 {
        self.duplicates_dropped
    }

    /// Total blocks completed since creation.
    pub fn blocks_completed(&self) -> u64 {
        self.blocks_completed
    }

    /// Completions whose sub-blocks were all missing from history.
    pub fn empty_completions(&self) -> u64 {
        self.empty_completions
    }

    /// Sub-blocks that arrived with a non-increasing index or for a block
    /// other than the one being assembled.
    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    fn is_retained(&self, event: &SubBlockEvent) -> bool {
        self.sub_blocks.iter().any(|e| {
            e.parent_block_number == event.parent_block_number
                && e.sequence_index == event.sequence_index
        })
    }

    /// Returns false when the sub-block arrived out of order.
    fn track_window(&mut self, event: &SubBlockEvent) -> bool {
        if event.is_block_start() {
            self.window = Some(AssemblyWindow::open(event));
            return true;
        }

        match self.window.as_mut() {
            Some(window) if window.parent_block_number == event.parent_block_number => {
                let in_order = event.sequence_index > window.highest_index;
                if !in_order {
                    self.out_of_order += 1;
                    debug!(
                        block_number = event.parent_block_number,
                        index = event.sequence_index,
                        highest_index = window.highest_index,
                        "Sub-block index arrived out of order"
                    );
                }
                window.highest_index = window.highest_index.max(event.sequence_index);
                in_order
            }
            Some(window) if window.parent_block_number > event.parent_block_number => {
                // Late delivery for an earlier block; the open window stays.
                self.out_of_order += 1;
                debug!(
                    block_number = event.parent_block_number,
                    open_block = window.parent_block_number,
                    "Sub-block arrived for an earlier block"
                );
                false
            }
            _ => {
                // Block start was never observed (first event of the session,
                // or the start frame was lost).
                self.window = Some(AssemblyWindow::open(event));
                true
            }
        }
    }
}

impl Default for BlockAggregator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SubBlockConsumer for BlockAggregator {
    fn on_sub_block(&mut self, event: SubBlockEvent) {
        self.ingest(event);
    }
}
