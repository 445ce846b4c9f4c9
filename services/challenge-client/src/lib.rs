//! Challenge client
//!
//! Client side of the flashblock speed challenge:
//! - Builds the timestamped challenge message and has it signed
//! - Submits it to the ranking service and surfaces the ranked entry
//! - Loads the leaderboard in the service's own order
//! - Formats entries for display, with a bounded address → name cache

pub mod challenge;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod leaderboard;
pub mod models;
pub mod names;
pub mod signer;

pub use challenge::{Attempt, ChallengeSession};
pub use client::RankingClient;
pub use config::ClientConfig;
pub use error::{ClientError, SignError, SubmissionError};
