//! Types library for the flashblock speed challenge
//!
//! Shared type definitions used by the block feed service and the
//! challenge client, so both sides agree on the wire format of the
//! flashblock feed and of the ranking service.
//!
//! # Modules
//! - `block`: Sub-block (flashblock) events and completed full blocks
//! - `leaderboard`: Ranking service entries, orderings and request bodies
//! - `errors`: Error taxonomy

pub mod block;
pub mod errors;
pub mod leaderboard;

