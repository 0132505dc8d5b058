//! Currency normalization for extractor amount fields.
//!
//! Numbers pass through; strings lose every character that is not a digit,
//! `.` or `-` and are parsed as a decimal. Anything unreadable becomes zero.
//! Negative results clamp to zero.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};

use crate::models::{DataQualityWarning, WarningKind};

static NON_NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9.\-]").unwrap());

/// How a normalized amount was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountQuality {
    /// Already a number, or a string that was a bare number.
    Exact,
    /// Symbols or separators were stripped (`"$1,234.50"`).
    Coerced,
    /// Absent, null, blank or the `"-"` sentinel.
    Absent,
    /// Text with no parseable number; read as zero.
    Unparseable,
    /// Parsed below zero; clamped.
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedAmount {
    pub value: Decimal,
    pub quality: AmountQuality,
}

impl NormalizedAmount {
    fn zero(quality: AmountQuality) -> Self {
        Self {
            value: Decimal::ZERO,
            quality,
        }
    }

    /// A data-quality warning when the value was silently coerced to zero.
    pub fn warning(&self, field: &str) -> Option<DataQualityWarning> {
        match self.quality {
            AmountQuality::Unparseable => Some(DataQualityWarning::new(
                WarningKind::UnparseableAmount,
                field,
                format!("{field} could not be read as an amount; treated as 0"),
            )),
            AmountQuality::Negative => Some(DataQualityWarning::new(
                WarningKind::NegativeAmount,
                field,
                format!("{field} was negative; treated as 0"),
            )),
            _ => None,
        }
    }
}

/// Normalize any money-like value to a non-negative decimal. Never fails.
pub fn normalize_amount(value: Option<&Value>) -> Decimal {
    inspect_amount(value).value
}

/// Normalize and report how the value was obtained.
pub fn inspect_amount(value: Option<&Value>) -> NormalizedAmount {
    match value {
        None | Some(Value::Null) => NormalizedAmount::zero(AmountQuality::Absent),
        Some(Value::Number(n)) => inspect_number(n),
        Some(Value::String(s)) => inspect_amount_str(s),
        Some(_) => NormalizedAmount::zero(AmountQuality::Unparseable),
    }
}

/// Like [`inspect_amount`] but keeps absence distinct from zero.
pub fn optional_amount(value: Option<&Value>) -> Option<NormalizedAmount> {
    let amount = inspect_amount(value);
    (amount.quality != AmountQuality::Absent).then_some(amount)
}

/// Normalize a currency-formatted string.
pub fn inspect_amount_str(text: &str) -> NormalizedAmount {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return NormalizedAmount::zero(AmountQuality::Absent);
    }

    let stripped = NON_NUMERIC.replace_all(trimmed, "");
    let Ok(parsed) = Decimal::from_str(&stripped) else {
        return NormalizedAmount::zero(AmountQuality::Unparseable);
    };

    let quality = if stripped == trimmed {
        AmountQuality::Exact
    } else {
        AmountQuality::Coerced
    };
    clamp(parsed, quality)
}

fn inspect_number(n: &Number) -> NormalizedAmount {
    let text = n.to_string();
    let parsed = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| n.as_f64().and_then(Decimal::from_f64));

    match parsed {
        Some(value) => clamp(value, AmountQuality::Exact),
        None => NormalizedAmount::zero(AmountQuality::Unparseable),
    }
}

fn clamp(value: Decimal, quality: AmountQuality) -> NormalizedAmount {
    if value.is_sign_negative() && !value.is_zero() {
        NormalizedAmount::zero(AmountQuality::Negative)
    } else {
        NormalizedAmount { value, quality }
    }
}
