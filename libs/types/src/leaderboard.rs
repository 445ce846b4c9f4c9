//! Ranking service wire types
//!
//! The ranking service is opaque to this repository; these types only
//! mirror its JSON contract (camelCase fields on entries, snake_case
//! orderings in the query string).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::block::BlockNumber;
use crate::errors::TypeError;

/// Server-side sort order for the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardOrderBy {
    /// Closest ratio to 1 first
    #[default]
    Ratio,
    ReactionMillis,
    FlashBlockMillis,
    BlockMillis,
    /// Most recent submission first
    SubmitDate,
}

impl LeaderboardOrderBy {
    pub const ALL: [LeaderboardOrderBy; 5] = [
        LeaderboardOrderBy::Ratio,
        LeaderboardOrderBy::ReactionMillis,
        LeaderboardOrderBy::FlashBlockMillis,
        LeaderboardOrderBy::BlockMillis,
        LeaderboardOrderBy::SubmitDate,
    ];

    /// Query string value understood by the ranking service.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardOrderBy::Ratio => "ratio",
            LeaderboardOrderBy::ReactionMillis => "reaction_millis",
            LeaderboardOrderBy::FlashBlockMillis => "flash_block_millis",
            LeaderboardOrderBy::BlockMillis => "block_millis",
            LeaderboardOrderBy::SubmitDate => "submit_date",
        }
    }
}

impl fmt::Display for LeaderboardOrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaderboardOrderBy {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeaderboardOrderBy::ALL
            .into_iter()
            .find(|order_by| order_by.as_str() == s)
            .ok_or_else(|| TypeError::UnknownOrderBy(s.to_string()))
    }
}

/// One ranked attempt, as returned by the ranking service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub address: String,
    /// Moment the challenge message was built, as sent by the server
    pub request_date: String,
    /// Moment the server received the signed message
    pub submit_date: String,
    #[serde(deserialize_with = "millis_from_number_or_string")]
    pub flash_block_millis: i64,
    #[serde(deserialize_with = "millis_from_number_or_string")]
    pub block_millis: i64,
    #[serde(deserialize_with = "millis_from_number_or_string")]
    pub reaction_millis: i64,
    pub block_number: BlockNumber,
    pub transaction_hash: String,
    pub position: u64,
    /// Reaction time over flashblock inclusion time
    pub ratio: f64,
}

impl LeaderboardEntry {
    pub fn request_date_utc(&self) -> Result<DateTime<Utc>, TypeError> {
        parse_server_date(&self.request_date)
    }

    pub fn submit_date_utc(&self) -> Result<DateTime<Utc>, TypeError> {
        parse_server_date(&self.submit_date)
    }
}

/// Body of `POST /v1/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitMessageRequest {
    /// JSON-encoded challenge message
    pub message: String,
    pub signature: String,
}

/// Response of `POST /v1/submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitMessageResponse {
    pub entry: LeaderboardEntry,
}

/// Response of `GET /v1/leaderboard`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
}

/// Parse a server date that may or may not carry a UTC offset.
///
/// Naive timestamps are interpreted as UTC.
pub fn parse_server_date(value: &str) -> Result<DateTime<Utc>, TypeError> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| TypeError::InvalidTimestamp(value.to_string()))
}

fn millis_from_number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Number(i64),
        Text(String),
    }

    match Millis::deserialize(deserializer)? {
        Millis::Number(value) => Ok(value),
        Millis::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
