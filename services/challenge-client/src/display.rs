//! Display rules for ranked entries
//!
//! The service's numbers are shown unmodified; this module only picks
//! a tone for each column and formats the ratio to two decimals.

use std::fmt;

use types::leaderboard::LeaderboardEntry;

/// Reaction times above this are shown as errors.
pub const REACTION_ERROR_MILLIS: i64 = 2000;
/// Reaction times above this are shown as warnings.
pub const REACTION_WARNING_MILLIS: i64 = 1000;

/// Emphasis applied to a displayed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Default,
    Success,
    MutedSuccess,
    Warning,
    Error,
}

impl Tone {
    /// ANSI colour used by the terminal renderer.
    pub fn ansi_code(self) -> &'static str {
        match self {
            Tone::Default => "0",
            Tone::Success => "32",
            Tone::MutedSuccess => "2;32",
            Tone::Warning => "33",
            Tone::Error => "31",
        }
    }
}

/// Ratio with two decimals, e.g. `1.23`.
pub fn format_ratio(ratio: f64) -> String {
    format!("{ratio:.2}")
}

/// Favourable when the ratio is within 2 of the ideal 1.
pub fn ratio_tone(ratio: f64) -> Tone {
    if (ratio - 1.0).abs() < 2.0 {
        Tone::Success
    } else {
        Tone::Default
    }
}

pub fn reaction_tone(reaction_millis: i64) -> Tone {
    if reaction_millis > REACTION_ERROR_MILLIS {
        Tone::Error
    } else if reaction_millis > REACTION_WARNING_MILLIS {
        Tone::Warning
    } else {
        Tone::Success
    }
}

pub fn position_tone(position: u64) -> Tone {
    match position {
        0..10 => Tone::Success,
        10..100 => Tone::MutedSuccess,
        _ => Tone::Default,
    }
}

/// A value paired with its tone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub tone: Tone,
}

impl Cell {
    fn new(text: String, tone: Tone) -> Self {
        Self { text, tone }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One leaderboard row ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub position: Cell,
    pub name: String,
    pub reaction: Cell,
    pub flash_block: Cell,
    pub block: Cell,
    pub ratio: Cell,
}

impl EntryRow {
    pub fn new(entry: &LeaderboardEntry, name: String) -> Self {
        Self {
            position: Cell::new(format!("#{}", entry.position), position_tone(entry.position)),
            name,
            reaction: Cell::new(format!("{}ms", entry.reaction_millis), reaction_tone(entry.reaction_millis)),
            flash_block: Cell::new(format!("{}ms", entry.flash_block_millis), Tone::Success),
            block: Cell::new(format!("{}ms", entry.block_millis), Tone::Success),
            ratio: Cell::new(format_ratio(entry.ratio), ratio_tone(entry.ratio)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> LeaderboardEntry {
        LeaderboardEntry {
            address: "0x8f3b2c41d6c6e5a09f1b3bd1a3f5d2e4c7b9a011".to_string(),
            request_date: "2025-02-17T09:30:05.042".to_string(),
            submit_date: "2025-02-17T09:30:05.912".to_string(),
            flash_block_millis: 410,
            block_millis: 1830,
            reaction_millis: 870,
            block_number: 22_031_337,
            transaction_hash: "0xabc".to_string(),
            position: 7,
            ratio: 2.1219512195,
        }
    }

    #[test]
    fn test_ratio_two_decimals() {
        assert_eq!(format_ratio(2.1219512195), "2.12");
        assert_eq!(format_ratio(1.0), "1.00");
    }

    #[test]
    fn test_ratio_tone() {
        assert_eq!(ratio_tone(1.0), Tone::Success);
        assert_eq!(ratio_tone(2.99), Tone::Success);
        assert_eq!(ratio_tone(3.0), Tone::Default);
        assert_eq!(ratio_tone(-0.5), Tone::Success);
    }

    #[test]
    fn test_reaction_tone_thresholds() {
        assert_eq!(reaction_tone(1000), Tone::Success);
        assert_eq!(reaction_tone(1001), Tone::Warning);
        assert_eq!(reaction_tone(2000), Tone::Warning);
        assert_eq!(reaction_tone(2001), Tone::Error);
    }

    #[test]
    fn test_position_tone_thresholds() {
        assert_eq!(position_tone(1), Tone::Success);
        assert_eq!(position_tone(9), Tone::Success);
        assert_eq!(position_tone(10), Tone::MutedSuccess);
        assert_eq!(position_tone(99), Tone::MutedSuccess);
        assert_eq!(position_tone(100), Tone::Default);
    }

    #[test]
    fn test_row_keeps_service_values() {
        let row = EntryRow::new(&entry(), "alice.base.eth".to_string());
        assert_eq!(row.position.to_string(), "#7");
        assert_eq!(row.position.tone, Tone::Success);
        assert_eq!(row.reaction.text, "870ms");
        assert_eq!(row.flash_block.text, "410ms");
        assert_eq!(row.block.text, "1830ms");
        assert_eq!(row.ratio.text, "2.12");
        assert_eq!(row.ratio.tone, Tone::Success);
    }
}
