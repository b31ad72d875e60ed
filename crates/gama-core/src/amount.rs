//! amount codec
//!
//! exact decimal-string to minor-unit conversion. all arithmetic is on
//! digit strings and u128, no floating point anywhere in the path.

use serde::{Deserialize, Serialize};

/// token amount in minor units (u128 to cover high-decimal tokens)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(amount: u128) -> Self {
        Self(amount)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Self(v)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Self(v as u128)
    }
}

impl From<Amount> for u128 {
    fn from(v: Amount) -> Self {
        v.0
    }
}

/// normalize raw keyboard input into a canonical decimal string
///
/// commas count as decimal points. everything that is not a digit or the
/// first decimal point is dropped; digits after a second point fold into
/// the fraction ("1.2.3" becomes "1.23"). fractional digits past
/// `precision` are cut, never rounded. leading zeros are stripped except
/// the one before the point. empty input stays empty, a bare point
/// becomes "0.".
pub fn sanitize_amount(raw: &str, precision: u8) -> String {
    let replaced = raw.replace(',', ".");

    let mut int_part = String::new();
    let mut frac_part = String::new();
    let mut seen_dot = false;
    for c in replaced.chars() {
        match c {
            '0'..='9' => {
                if seen_dot {
                    frac_part.push(c);
                } else {
                    int_part.push(c);
                }
            }
            '.' => seen_dot = true,
            _ => {}
        }
    }

    if int_part.is_empty() && !seen_dot {
        return String::new();
    }

    let trimmed = int_part.trim_start_matches('0');
    let int_norm = if trimmed.is_empty() { "0" } else { trimmed };

    frac_part.truncate(precision as usize);

    if seen_dot {
        format!("{}.{}", int_norm, frac_part)
    } else {
        int_norm.to_string()
    }
}

/// convert a sanitized decimal string into minor units
///
/// the fraction is right-padded with zeros to `precision` digits and the
/// concatenation is parsed as one u128. returns None when the digits do
/// not fit a u128 or the input was never sanitized.
pub fn minor_units(display: &str, precision: u8) -> Option<Amount> {
    if display.is_empty() {
        return Some(Amount::ZERO);
    }

    let mut parts = display.splitn(2, '.');
    let int = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");

    let width = precision as usize;
    let frac: String = frac.chars().take(width).collect();
    let digits = format!("{}{:0<width$}", int, frac, width = width);

    if digits.is_empty() {
        return Some(Amount::ZERO);
    }
    digits.parse::<u128>().ok().map(Amount)
}

/// render minor units back to a decimal string with fixed precision
///
/// a precision whose scale does not fit a u128 renders the raw minor
/// units instead, the same bound at which `minor_units` rejects.
pub fn format_minor(amount: Amount, decimals: u8) -> String {
    if decimals == 0 {
        return amount.0.to_string();
    }
    let scale = match 10u128.checked_pow(decimals as u32) {
        Some(s) => s,
        None => return amount.0.to_string(),
    };
    let int_part = amount.0 / scale;
    let frac_part = amount.0 % scale;
    format!("{}.{:0width$}", int_part, frac_part, width = decimals as usize)
}

/// an editable amount input with its parsed value
///
/// `set` either accepts the new input (updating both the display text and
/// the parsed amount together) or rejects it and keeps the previous state
/// untouched. rejection is silent: over-cap and overflowing inputs simply
/// do not take.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AmountField {
    text: String,
    amount: Amount,
}

impl AmountField {
    pub fn new() -> Self {
        Self::default()
    }

    /// current display text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// current parsed value in minor units
    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// apply raw input, enforcing `cap` when given
    ///
    /// returns whether the input took effect. both fields update together
    /// or not at all, so text and amount never drift apart.
    pub fn set(&mut self, raw: &str, precision: u8, cap: Option<Amount>) -> bool {
        let display = sanitize_amount(raw, precision);
        let value = match minor_units(&display, precision) {
            Some(v) => v,
            None => return false,
        };
        if let Some(cap) = cap {
            if value > cap {
                return false;
            }
        }
        self.text = display;
        self.amount = value;
        true
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.amount = Amount::ZERO;
    }
}
