use serde_json::Value;

use super::domain::SlotValue;
use super::slots::{SlotDefinition, SlotKind};

const AFFIRMATIVE: &[&str] = &["yes", "y", "true", "yeah", "yep"];
const NEGATIVE: &[&str] = &["no", "n", "false", "nope"];
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '₦', '¥', '₹'];
/// Shorter replies must name an option in full.
const MIN_PREFIX_LEN: usize = 3;

/// Why a raw answer could not fill a slot. Displayed verbatim when re-prompting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("I couldn't find an amount in \"{input}\". Reply with a number such as 50000 or 50k.")]
    NotANumber { input: String },
    #[error("{field} can't be negative.")]
    Negative { field: &'static str },
    #[error("{field} must be greater than zero.")]
    ZeroNotAllowed { field: &'static str },
    #[error("Please answer yes or no.")]
    NotABoolean { input: String },
    #[error("\"{input}\" isn't one of the options: {options}.")]
    UnknownOption { input: String, options: String },
}

/// Convert a free-text answer into a typed value for `slot`.
pub fn parse(raw: &str, slot: &SlotDefinition) -> Result<SlotValue, ParseFailure> {
    match slot.kind {
        SlotKind::Number => parse_number(raw, slot).map(SlotValue::Number),
        SlotKind::Boolean => parse_boolean(raw).map(SlotValue::Boolean),
        SlotKind::Enum => parse_choice(raw, slot).map(SlotValue::Choice),
    }
}

/// Validate a JSON value sent in a request payload against `slot`. Strings go through
/// the same text parser as dialogue answers.
pub fn coerce(value: &Value, slot: &SlotDefinition) -> Result<SlotValue, ParseFailure> {
    match (slot.kind, value) {
        (_, Value::String(raw)) => parse(raw, slot),
        (SlotKind::Number, Value::Number(number)) => {
            let amount = number.as_f64().ok_or_else(|| ParseFailure::NotANumber {
                input: number.to_string(),
            })?;
            validate_amount(amount, slot).map(SlotValue::Number)
        }
        (SlotKind::Boolean, Value::Bool(flag)) => Ok(SlotValue::Boolean(*flag)),
        (SlotKind::Number, other) => Err(ParseFailure::NotANumber {
            input: other.to_string(),
        }),
        (SlotKind::Boolean, other) => Err(ParseFailure::NotABoolean {
            input: other.to_string(),
        }),
        (SlotKind::Enum, other) => Err(ParseFailure::UnknownOption {
            input: other.to_string(),
            options: slot.options.join(", "),
        }),
    }
}

fn parse_number(raw: &str, slot: &SlotDefinition) -> Result<f64, ParseFailure> {
    let not_a_number = || ParseFailure::NotANumber {
        input: raw.trim().to_string(),
    };

    let chars: Vec<char> = raw.chars().collect();
    let start = chars
        .iter()
        .enumerate()
        .position(|(index, ch)| {
            ch.is_ascii_digit()
                || (*ch == '.' && chars.get(index + 1).is_some_and(char::is_ascii_digit))
        })
        .ok_or_else(not_a_number)?;

    let sign = chars[..start]
        .iter()
        .rev()
        .copied()
        .find(|ch| !ch.is_whitespace() && !CURRENCY_SYMBOLS.contains(ch));
    if matches!(sign, Some('-' | '\u{2212}')) {
        return Err(ParseFailure::Negative {
            field: slot.field_name,
        });
    }

    let mut end = start;
    let mut token = String::new();
    while let Some(ch) = chars.get(end) {
        match ch {
            '0'..='9' | '.' => token.push(*ch),
            ',' | '_' => {}
            _ => break,
        }
        end += 1;
    }

    let token = token.trim_end_matches('.');
    let mut amount: f64 = token.parse().map_err(|_| not_a_number())?;

    let suffix_at = chars[end..]
        .iter()
        .position(|ch| !ch.is_whitespace())
        .map(|offset| end + offset);
    if let Some(index) = suffix_at {
        let followed_by_letter = chars
            .get(index + 1)
            .is_some_and(|next| next.is_alphabetic());
        if !followed_by_letter {
            match chars[index].to_ascii_lowercase() {
                'k' => amount *= 1_000.0,
                'm' => amount *= 1_000_000.0,
                _ => {}
            }
        }
    }

    validate_amount(amount, slot)
}

fn validate_amount(amount: f64, slot: &SlotDefinition) -> Result<f64, ParseFailure> {
    if !amount.is_finite() {
        return Err(ParseFailure::NotANumber {
            input: amount.to_string(),
        });
    }
    if amount < 0.0 {
        return Err(ParseFailure::Negative {
            field: slot.field_name,
        });
    }
    if amount == 0.0 && !slot.zero_allowed {
        return Err(ParseFailure::ZeroNotAllowed {
            field: slot.field_name,
        });
    }
    Ok(amount)
}

fn parse_boolean(raw: &str) -> Result<bool, ParseFailure> {
    let normalized = raw
        .trim()
        .trim_end_matches(|ch: char| ch.is_ascii_punctuation())
        .to_lowercase();

    if AFFIRMATIVE.contains(&normalized.as_str()) {
        Ok(true)
    } else if NEGATIVE.contains(&normalized.as_str()) {
        Ok(false)
    } else {
        Err(ParseFailure::NotABoolean {
            input: raw.trim().to_string(),
        })
    }
}

fn parse_choice(raw: &str, slot: &SlotDefinition) -> Result<String, ParseFailure> {
    let normalized = raw.trim().to_lowercase();
    let unknown = || ParseFailure::UnknownOption {
        input: raw.trim().to_string(),
        options: slot.options.join(", "),
    };

    if normalized.is_empty() {
        return Err(unknown());
    }

    slot.options
        .iter()
        .find(|option| {
            let option = option.to_lowercase();
            normalized.contains(&option)
                || (normalized.chars().count() >= MIN_PREFIX_LEN && option.starts_with(&normalized))
        })
        .map(|option| option.to_string())
        .ok_or_else(unknown)
}
