//! Block Feed Service
//!
//! Consumes the flashblock WebSocket feed and produces:
//! - A bounded, newest-first history of sub-blocks (flashblocks)
//! - A bounded, newest-first history of completed full blocks
//! - Versioned display snapshots with per-entry freshness flags
//! - HTTP and WebSocket republishing of those snapshots
//!
//! # Architecture
//!
//! ```text
//!   flashblock feed (wss)
//!          │
//!    ┌─────▼──────┐
//!    │ Ingestor   │  ← connection lifecycle, frame decode
//!    └─────┬──────┘
//!          │ SubBlockEvent
//!    ┌─────▼──────┐
//!    │ Aggregator │  ← rolling histories, block completion
//!    └─────┬──────┘
//!          │
//!    ┌─────▼──────┐
//!    │ Publisher  │  ← snapshot builder + watch channel
//!    └─────┬──────┘
//!          │
//!   ┌──────▼────────────┐
//!   │ HTTP / WebSocket  │
//!   └───────────────────┘
//! ```
//!
//! The supervisor optionally wraps the ingestor with a reconnect loop.

pub mod aggregator;
pub mod config;
pub mod events;
pub mod history;
pub mod ingestion;
pub mod metrics;
pub mod publish;
pub mod server;
pub mod snapshot;
pub mod supervisor;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
