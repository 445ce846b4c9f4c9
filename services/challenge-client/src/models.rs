use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Text the ranking service expects to be signed, verbatim.
pub const CHALLENGE_TEXT: &str = "Base FlashBlocks are so damn fast!";

/// The message a user signs to start an attempt.
///
/// `request_time` is fixed when the message is built, before the signer is
/// invoked; the service measures reaction time from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeMessage {
    pub message: String,
    #[serde(with = "iso_millis")]
    pub request_time: DateTime<Utc>,
}

impl ChallengeMessage {
    /// Build the challenge message stamped with the current time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(request_time: DateTime<Utc>) -> Self {
        Self {
            message: CHALLENGE_TEXT.to_string(),
            request_time,
        }
    }

    /// JSON text that is signed and sent as `message`.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for ChallengeMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// ISO-8601 UTC with millisecond precision and a trailing `Z`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|time| time.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Request time as it appears on the wire.
pub fn format_request_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
