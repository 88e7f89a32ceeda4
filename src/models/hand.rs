use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single poker hand history as handed over by the data layer.
///
/// Every field other than `id` and `owner_id` is optional so that records
/// with gaps can still be loaded and then rejected by structural
/// validation with a precise list of problems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub hand_number: Option<String>,
    #[serde(default)]
    pub played_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub game_type: Option<String>,
    #[serde(default)]
    pub stakes: Option<String>,
    #[serde(default)]
    pub big_blind: Option<f64>,
    #[serde(default)]
    pub table_size: Option<u32>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub hole_cards: Option<String>,
    #[serde(default)]
    pub board_cards: Option<String>,
    #[serde(default)]
    pub preflop_actions: Option<String>,
    #[serde(default)]
    pub flop_actions: Option<String>,
    #[serde(default)]
    pub turn_actions: Option<String>,
    #[serde(default)]
    pub river_actions: Option<String>,
    #[serde(default)]
    pub pot_size: Option<f64>,
    #[serde(default)]
    pub stack_size: Option<f64>,
    /// Net amount won (positive) or lost (negative) by the hero.
    #[serde(default)]
    pub result: Option<f64>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandOutcome {
    Won,
    Lost,
    Split,
}

impl HandRecord {
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            ..Self::default()
        }
    }

    /// Outcome from the explicit field, falling back to the sign of `result`.
    pub fn outcome_kind(&self) -> Option<HandOutcome> {
        if let Some(outcome) = self.outcome.as_deref() {
            match outcome.trim().to_lowercase().as_str() {
                "won" | "win" | "winner" => return Some(HandOutcome::Won),
                "lost" | "loss" | "lose" | "folded" => return Some(HandOutcome::Lost),
                "split" | "chop" | "chopped" | "tie" => return Some(HandOutcome::Split),
                _ => {}
            }
        }

        match self.result {
            Some(r) if r > 0.0 => Some(HandOutcome::Won),
            Some(r) if r < 0.0 => Some(HandOutcome::Lost),
            Some(_) => Some(HandOutcome::Split),
            None => None,
        }
    }

    pub fn display_label(&self) -> String {
        match self.hand_number.as_deref() {
            Some(number) if !number.trim().is_empty() => format!("#{}", number.trim()),
            _ => self.id.clone(),
        }
    }
}

impl HandOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandOutcome::Won => "won",
            HandOutcome::Lost => "lost",
            HandOutcome::Split => "split",
        }
    }

    /// Words an analysis of a hand with this outcome would plausibly use.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            HandOutcome::Won => &["won", "win", "winning", "wins", "winner"],
            HandOutcome::Lost => &["lost", "lose", "losing", "loses", "loss"],
            HandOutcome::Split => &["split", "chop", "chopped", "tie"],
        }
    }
}
