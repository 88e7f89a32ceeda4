//! Checks on the way into and out of a provider call.
//!
//! Inbound: structural validation of a hand record and flattening into the
//! named fields the prompt templates consume. Outbound: a heuristic
//! plausibility check of generated text against the hand it describes.
//! The outbound check only annotates; it never rejects a response.

use crate::error::AnalysisError;
use crate::models::{DataValidation, ExperienceLevel, HandOutcome, HandRecord};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub const UNKNOWN: &str = "Unknown";
pub const NO_ACTION: &str = "None";

const MAX_HOLE_CARDS: usize = 4;
const MAX_BOARD_CARDS: usize = 5;
const MIN_TABLE_SIZE: u32 = 2;
const MAX_TABLE_SIZE: u32 = 10;

/// Parses a card list such as `"As Kd"`, `"Ah,Td,2c"` or `"10h 9h"` into
/// normalized two-character cards (`"As"`, `"Th"`).
pub fn parse_cards(raw: &str) -> Result<Vec<String>, String> {
    let mut cards = Vec::new();
    let mut seen = HashSet::new();

    for token in raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        let card = normalize_card(token).ok_or_else(|| format!("'{}' is not a card", token))?;
        if !seen.insert(card.clone()) {
            return Err(format!("duplicate card {}", card));
        }
        cards.push(card);
    }

    Ok(cards)
}

fn normalize_card(token: &str) -> Option<String> {
    let token = token.trim();
    let (rank, suit) = if let Some(suit) = token.strip_prefix("10") {
        ('T', suit)
    } else {
        let mut chars = token.chars();
        let rank = chars.next()?.to_ascii_uppercase();
        (rank, chars.as_str())
    };

    if !matches!(rank, '2'..='9' | 'T' | 'J' | 'Q' | 'K' | 'A') {
        return None;
    }

    let mut suit_chars = suit.chars();
    let suit = suit_chars.next()?.to_ascii_lowercase();
    if suit_chars.next().is_some() || !matches!(suit, 's' | 'h' | 'd' | 'c') {
        return None;
    }

    Some(format!("{}{}", rank, suit))
}

/// Rejects records that cannot be meaningfully analysed. The error lists
/// every violated field, not only the first.
pub fn validate_hand(hand: &HandRecord) -> Result<(), AnalysisError> {
    let mut violations = Vec::new();

    if hand.id.trim().is_empty() {
        violations.push("id: missing".to_string());
    }

    match hand.hand_number.as_deref() {
        Some(number) if !number.trim().is_empty() => {}
        _ => violations.push("hand_number: missing".to_string()),
    }

    let mut all_cards = Vec::new();
    check_cards(&mut violations, &mut all_cards, "hole_cards", hand.hole_cards.as_deref(), MAX_HOLE_CARDS);
    check_cards(&mut violations, &mut all_cards, "board_cards", hand.board_cards.as_deref(), MAX_BOARD_CARDS);

    let mut unique = HashSet::new();
    if let Some(card) = all_cards.iter().find(|card| !unique.insert(card.as_str())) {
        violations.push(format!("board_cards: {} also appears in hole_cards", card));
    }

    for (field, value) in [
        ("pot_size", hand.pot_size),
        ("stack_size", hand.stack_size),
        ("big_blind", hand.big_blind),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                violations.push(format!("{}: must be a non-negative number", field));
            }
        }
    }

    if let Some(v) = hand.result {
        if !v.is_finite() {
            violations.push("result: must be a finite number".to_string());
        }
    }

    if let Some(size) = hand.table_size {
        if !(MIN_TABLE_SIZE..=MAX_TABLE_SIZE).contains(&size) {
            violations.push(format!(
                "table_size: {} is outside {}..={}",
                size, MIN_TABLE_SIZE, MAX_TABLE_SIZE
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::Validation { fields: violations })
    }
}

fn check_cards(
    violations: &mut Vec<String>,
    collected: &mut Vec<String>,
    field: &str,
    raw: Option<&str>,
    max: usize,
) {
    let Some(raw) = raw else { return };
    match parse_cards(raw) {
        Ok(cards) if cards.len() > max => {
            violations.push(format!("{}: {} cards, at most {} allowed", field, cards.len(), max))
        }
        Ok(cards) => collected.extend(cards),
        Err(e) => violations.push(format!("{}: {}", field, e)),
    }
}

fn text_or(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

fn number_or_unknown(value: Option<f64>) -> String {
    value.map(format_amount).unwrap_or_else(|| UNKNOWN.to_string())
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Flattens a validated hand into template fields. Missing optional values
/// become `"Unknown"`; streets without recorded actions become `"None"`.
pub fn flatten_hand(hand: &HandRecord, level: ExperienceLevel) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    let cards = |raw: Option<&str>| match raw.map(parse_cards) {
        Some(Ok(cards)) if !cards.is_empty() => cards.join(" "),
        _ => UNKNOWN.to_string(),
    };

    fields.insert("hand_id".into(), hand.id.clone());
    fields.insert("hand_number".into(), text_or(hand.hand_number.as_deref(), UNKNOWN));
    fields.insert(
        "played_at".into(),
        hand.played_at
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
    );
    fields.insert("game_type".into(), text_or(hand.game_type.as_deref(), UNKNOWN));
    fields.insert("stakes".into(), text_or(hand.stakes.as_deref(), UNKNOWN));
    fields.insert("big_blind".into(), number_or_unknown(hand.big_blind));
    fields.insert(
        "table_size".into(),
        hand.table_size
            .map(|s| s.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
    );
    fields.insert("position".into(), text_or(hand.position.as_deref(), UNKNOWN));
    fields.insert("hole_cards".into(), cards(hand.hole_cards.as_deref()));
    fields.insert("board_cards".into(), cards(hand.board_cards.as_deref()));
    fields.insert("preflop_actions".into(), text_or(hand.preflop_actions.as_deref(), NO_ACTION));
    fields.insert("flop_actions".into(), text_or(hand.flop_actions.as_deref(), NO_ACTION));
    fields.insert("turn_actions".into(), text_or(hand.turn_actions.as_deref(), NO_ACTION));
    fields.insert("river_actions".into(), text_or(hand.river_actions.as_deref(), NO_ACTION));
    fields.insert("pot_size".into(), number_or_unknown(hand.pot_size));
    fields.insert("stack_size".into(), number_or_unknown(hand.stack_size));
    fields.insert("result".into(), number_or_unknown(hand.result));
    fields.insert(
        "outcome".into(),
        hand.outcome_kind()
            .map(|o| o.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
    );
    fields.insert("notes".into(), text_or(hand.notes.as_deref(), NO_ACTION));
    fields.insert("experience_level".into(), level.as_str().to_string());

    fields
}

/// Session-level fields over hands already ordered by `played_at`.
pub fn flatten_session(hands: &[HandRecord], level: ExperienceLevel) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    let count = |kind: HandOutcome| hands.iter().filter(|h| h.outcome_kind() == Some(kind)).count();
    let net: f64 = hands.iter().filter_map(|h| h.result).sum();
    let positions: BTreeSet<String> = hands
        .iter()
        .filter_map(|h| h.position.as_deref())
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
        .collect();

    let summary = hands
        .iter()
        .map(|h| {
            format!(
                "- Hand {}: {} with {}, board {}, {} ({})",
                h.display_label(),
                text_or(h.position.as_deref(), UNKNOWN),
                text_or(h.hole_cards.as_deref(), UNKNOWN),
                text_or(h.board_cards.as_deref(), NO_ACTION),
                h.outcome_kind().map(|o| o.as_str()).unwrap_or(UNKNOWN),
                number_or_unknown(h.result),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    fields.insert("hand_count".into(), hands.len().to_string());
    fields.insert("hands_won".into(), count(HandOutcome::Won).to_string());
    fields.insert("hands_lost".into(), count(HandOutcome::Lost).to_string());
    fields.insert("hands_split".into(), count(HandOutcome::Split).to_string());
    fields.insert("net_result".into(), format_amount(net));
    fields.insert(
        "positions_played".into(),
        if positions.is_empty() {
            UNKNOWN.to_string()
        } else {
            positions.into_iter().collect::<Vec<_>>().join(", ")
        },
    );
    fields.insert(
        "session_start".into(),
        hands
            .iter()
            .filter_map(|h| h.played_at)
            .min()
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
    );
    fields.insert("hand_summaries".into(), summary);
    fields.insert("experience_level".into(), level.as_str().to_string());

    fields
}

fn position_aliases(position: &str) -> Vec<String> {
    let short = position.trim().to_uppercase();
    let long: &[&str] = match short.as_str() {
        "BTN" | "BU" | "D" | "BUTTON" => &["button", "btn", "dealer"],
        "SB" => &["small blind", "sb"],
        "BB" => &["big blind", "bb"],
        "UTG" | "UTG+1" | "UTG+2" => &["under the gun", "utg", "early position"],
        "MP" | "MP1" | "MP2" | "LJ" => &["middle position", "mp", "lojack"],
        "HJ" => &["hijack", "hj"],
        "CO" => &["cutoff", "cut-off", "co"],
        _ => &[],
    };

    let mut aliases: Vec<String> = long.iter().map(|s| s.to_string()).collect();
    if !short.is_empty() {
        aliases.push(short.to_lowercase());
    }
    aliases
}

/// Tokens that a response about these hands would plausibly mention.
#[derive(Debug, Clone, Default)]
pub struct PlausibilityTokens {
    positions: Vec<String>,
    cards: Vec<String>,
    outcomes: Vec<String>,
}

impl PlausibilityTokens {
    pub fn from_hands(hands: &[HandRecord]) -> Self {
        let mut tokens = Self::default();

        for hand in hands {
            if let Some(position) = hand.position.as_deref() {
                tokens.positions.extend(position_aliases(position));
            }
            for raw in [hand.hole_cards.as_deref(), hand.board_cards.as_deref()]
                .into_iter()
                .flatten()
            {
                if let Ok(cards) = parse_cards(raw) {
                    tokens.cards.extend(cards);
                }
            }
            if let Some(outcome) = hand.outcome_kind() {
                tokens
                    .outcomes
                    .extend(outcome.keywords().iter().map(|k| k.to_string()));
            }
        }

        tokens.positions.sort();
        tokens.positions.dedup();
        tokens.cards.sort();
        tokens.cards.dedup();
        tokens.outcomes.sort();
        tokens.outcomes.dedup();
        tokens
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.cards.is_empty() && self.outcomes.is_empty()
    }
}

/// Scores generated text against the hand(s) it should describe.
///
/// `plausible` requires the minimum length and, when the record offers any
/// tokens at all, at least one match. `score` is the share of checks passed.
pub fn check_plausibility(
    content: &str,
    tokens: &PlausibilityTokens,
    min_length: usize,
) -> DataValidation {
    let mut issues = Vec::new();
    let mut matched = Vec::new();

    let length = content.trim().chars().count();
    let length_ok = length >= min_length;
    if !length_ok {
        issues.push(format!(
            "response has {} characters, expected at least {}",
            length, min_length
        ));
    }

    let lower = content.to_lowercase();
    let words: HashSet<&str> = content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let lower_words: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let contains_phrase = |phrase: &str| {
        if phrase.contains(' ') || phrase.contains('-') {
            lower.contains(phrase)
        } else {
            lower_words.contains(phrase)
        }
    };

    let mut categories = 0usize;
    let mut categories_hit = 0usize;

    if !tokens.positions.is_empty() {
        categories += 1;
        let hits: Vec<String> = tokens
            .positions
            .iter()
            .filter(|p| contains_phrase(p))
            .cloned()
            .collect();
        if !hits.is_empty() {
            categories_hit += 1;
        }
        matched.extend(hits);
    }

    if !tokens.cards.is_empty() {
        categories += 1;
        // Cards match case-sensitively as whole words ("Kd", not "kd").
        let hits: Vec<String> = tokens
            .cards
            .iter()
            .filter(|c| words.contains(c.as_str()))
            .cloned()
            .collect();
        if !hits.is_empty() {
            categories_hit += 1;
        }
        matched.extend(hits);
    }

    if !tokens.outcomes.is_empty() {
        categories += 1;
        let hits: Vec<String> = tokens
            .outcomes
            .iter()
            .filter(|o| lower_words.contains(o.as_str()))
            .cloned()
            .collect();
        if !hits.is_empty() {
            categories_hit += 1;
        }
        matched.extend(hits);
    }

    let tokens_ok = categories == 0 || categories_hit > 0;
    if !tokens_ok {
        issues.push("response mentions no position, card or outcome from the hand".to_string());
    }

    let checks = 1 + categories;
    let passed = usize::from(length_ok) + categories_hit;

    DataValidation {
        checked: true,
        plausible: length_ok && tokens_ok,
        score: passed as f32 / checks as f32,
        matched_tokens: matched,
        issues,
    }
}
