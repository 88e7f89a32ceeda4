use crate::models::{AnalysisType, ExperienceLevel, PromptCategory};
use serde_json::Value;
use std::collections::BTreeMap;

/// Rendered prompt ready for a `GenerationRequest`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedPrompt {
    pub system_text: String,
    pub user_text: String,
    pub metadata: BTreeMap<String, Value>,
}

/// Turns named fields into a system/user prompt pair.
/// `None` means no template exists for the combination.
pub trait PromptFormatter: Send + Sync {
    fn format(
        &self,
        category: PromptCategory,
        analysis_type: AnalysisType,
        fields: &BTreeMap<String, String>,
    ) -> Option<FormattedPrompt>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePromptFormatter;

impl TemplatePromptFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn template_name(category: PromptCategory, analysis_type: AnalysisType) -> String {
        format!("{}/{}", category.as_str(), analysis_type.as_str())
    }

    fn template(category: PromptCategory, analysis_type: AnalysisType) -> Option<&'static str> {
        if analysis_type.category() != category {
            return None;
        }

        Some(match analysis_type {
            AnalysisType::Basic => HAND_BASIC_TEMPLATE,
            AnalysisType::Detailed => HAND_DETAILED_TEMPLATE,
            AnalysisType::Quick => HAND_QUICK_TEMPLATE,
            AnalysisType::Session => SESSION_TEMPLATE,
        })
    }

    fn system_prompt(category: PromptCategory, level: ExperienceLevel) -> String {
        let role = match category {
            PromptCategory::Hand => {
                "You are an experienced poker coach reviewing a single hand played by your student."
            }
            PromptCategory::Session => {
                "You are an experienced poker coach reviewing a full session played by your student."
            }
        };

        format!(
            "{}\n\n{}\n\nRefer to the actual cards, positions and amounts from the hand history. \
             Never invent actions that are not in the record.",
            role,
            Self::level_guidance(level)
        )
    }

    fn level_guidance(level: ExperienceLevel) -> &'static str {
        match level {
            ExperienceLevel::Beginner => {
                r#"AUDIENCE: BEGINNER
- Explain poker terms the first time you use them (e.g. "c-bet", "pot odds")
- Focus on one or two big lessons rather than every small detail
- Prefer simple rules of thumb over solver terminology"#
            }
            ExperienceLevel::Intermediate => {
                r#"AUDIENCE: INTERMEDIATE
- Assume familiarity with positions, ranges and pot odds
- Discuss sizing choices and how the opponent's likely range changes by street
- Point out exploitative adjustments where they apply"#
            }
            ExperienceLevel::Advanced => {
                r#"AUDIENCE: ADVANCED
- Use precise range and frequency language
- Compare the line taken against balanced alternatives and note blocker effects
- Keep explanations of fundamentals to a minimum"#
            }
        }
    }

    fn experience_level(fields: &BTreeMap<String, String>) -> ExperienceLevel {
        fields
            .get("experience_level")
            .and_then(|l| ExperienceLevel::from_str(l).ok())
            .unwrap_or_default()
    }
}

impl PromptFormatter for TemplatePromptFormatter {
    fn format(
        &self,
        category: PromptCategory,
        analysis_type: AnalysisType,
        fields: &BTreeMap<String, String>,
    ) -> Option<FormattedPrompt> {
        let template = Self::template(category, analysis_type)?;
        let level = Self::experience_level(fields);
        let (user_text, unresolved) = render(template, fields);

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "template".to_string(),
            Value::from(Self::template_name(category, analysis_type)),
        );
        metadata.insert("experience_level".to_string(), Value::from(level.as_str()));
        metadata.insert("unresolved_placeholders".to_string(), Value::from(unresolved));

        Some(FormattedPrompt {
            system_text: Self::system_prompt(category, level),
            user_text,
            metadata,
        })
    }
}

/// Replaces `{name}` with the matching field. Unknown placeholders are left
/// in place and reported back.
pub fn render(template: &str, fields: &BTreeMap<String, String>) -> (String, Vec<String>) {
    let mut output = String::with_capacity(template.len());
    let mut unresolved = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) if is_placeholder(&after[..close]) => {
                let name = &after[..close];
                match fields.get(name) {
                    Some(value) => output.push_str(value),
                    None => {
                        output.push_str(&rest[open..open + close + 2]);
                        if !unresolved.iter().any(|u| u == name) {
                            unresolved.push(name.to_string());
                        }
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                output.push('{');
                rest = after;
            }
        }
    }
    output.push_str(rest);

    (output, unresolved)
}

fn is_placeholder(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// Shared by the basic and detailed hand templates.
macro_rules! hand_history_block {
    () => {
        r#"HAND HISTORY
Hand: {hand_number} ({game_type}, {stakes}, big blind {big_blind})
Played: {played_at}
Table size: {table_size}
Hero position: {position}
Hero stack: {stack_size}
Hole cards: {hole_cards}
Board: {board_cards}

ACTIONS
Preflop: {preflop_actions}
Flop: {flop_actions}
Turn: {turn_actions}
River: {river_actions}

RESULT
Final pot: {pot_size}
Hero result: {result} ({outcome})
Player notes: {notes}"#
    };
}

const HAND_BASIC_TEMPLATE: &str = concat!(
    r#"HAND REVIEW

"#,
    hand_history_block!(),
    r#"

INSTRUCTIONS:
Walk through the hero's key decisions in this hand.

OUTPUT FORMAT:

SUMMARY:
[Two or three sentences on how the hand played out]

KEY DECISIONS:
1. [Street] - [What the hero did] - [Was it good, and why]
2. [Street] - [Decision] - [Assessment]

TAKEAWAY:
[The single most useful lesson from this hand]"#
);

const HAND_DETAILED_TEMPLATE: &str = concat!(
    r#"DETAILED HAND REVIEW

"#,
    hand_history_block!(),
    r#"

INSTRUCTIONS:
Review the hand street by street. For every street with hero action:
1. **Range Reasoning**: What ranges do the hero and opponent plausibly hold here?
2. **Decision Quality**: Was the chosen action and sizing sound?
3. **Alternatives**: Which other line was reasonable, and how does it compare?

OUTPUT FORMAT:

PREFLOP:
[Analysis]

FLOP:
[Analysis, or "Not reached"]

TURN:
[Analysis, or "Not reached"]

RIVER:
[Analysis, or "Not reached"]

OVERALL ASSESSMENT:
[How well the hand was played overall, including any leaks it reveals]

STUDY SUGGESTIONS:
1. [Concept to study] - [How it applies to this hand]"#
);

const HAND_QUICK_TEMPLATE: &str = r#"QUICK HAND VERDICT

Hero in {position} with {hole_cards}, board {board_cards}.
Preflop: {preflop_actions} | Flop: {flop_actions} | Turn: {turn_actions} | River: {river_actions}
Result: {result} ({outcome}) in a pot of {pot_size}.

INSTRUCTIONS:
Give a one-paragraph verdict on the hero's play in this hand and name the one decision that mattered most."#;

const SESSION_TEMPLATE: &str = r#"SESSION REVIEW

SESSION OVERVIEW
Started: {session_start}
Hands reviewed: {hand_count}
Won / lost / split: {hands_won} / {hands_lost} / {hands_split}
Net result: {net_result}
Positions played: {positions_played}

HANDS
{hand_summaries}

INSTRUCTIONS:
Look across all hands for recurring patterns rather than grading each hand on its own.

OUTPUT FORMAT:

SESSION SUMMARY:
[How the session went overall]

STRENGTHS:
- [Pattern the player handled well, citing hands]

LEAKS:
- [Recurring mistake, citing hands] - [Suggested fix]

FOCUS FOR NEXT SESSION:
1. [Concrete, actionable goal]"#;
