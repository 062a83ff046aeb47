//! Resource quantity parsing and arithmetic
//!
//! Quantities are stored as fixed-point milli-units so fractional amounts
//! like "1.5Gi" and "100m" compare exactly without floating point. Binary SI
//! suffixes (Ki, Mi, Gi, ...) are used for byte amounts, decimal suffixes
//! (m, k, M, G, ...) for counts and CPU.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milli-units per whole unit.
const MILLI: i64 = 1000;

/// Maximum accepted fractional digits when parsing.
const MAX_FRACTION_DIGITS: u32 = 9;

/// A fixed-point resource amount.
///
/// The empty string parses to zero, matching the convention that an
/// unspecified request is no request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    millis: i64,
}

impl Quantity {
    /// The zero quantity.
    pub fn zero() -> Self {
        Self { millis: 0 }
    }

    /// Build from whole units (bytes, inodes, cores).
    pub fn from_value(value: i64) -> Self {
        Self {
            millis: value.saturating_mul(MILLI),
        }
    }

    /// Build from a byte count as reported by the stats summary.
    pub fn from_bytes(bytes: u64) -> Self {
        let value = i64::try_from(bytes).unwrap_or(i64::MAX);
        Self::from_value(value)
    }

    /// Build from milli-units (e.g. millicores).
    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// The amount in milli-units.
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// The amount in whole units, rounded up.
    pub fn value(&self) -> i64 {
        if self.millis >= 0 {
            (self.millis + MILLI - 1) / MILLI
        } else {
            self.millis / MILLI
        }
    }

    pub fn is_zero(&self) -> bool {
        self.millis == 0
    }

    /// `max(0, self - other)`, clamping at zero rather than going negative.
    pub fn saturating_sub(&self, other: Quantity) -> Quantity {
        Quantity {
            millis: (self.millis - other.millis).max(0),
        }
    }

    /// Parse an amount like `"1Gi"`, `"500Mi"`, `"1.5Gi"`, `"100m"` or `""`.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Ok(Self::zero());
        }

        let split = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(s.len());
        let (number, suffix) = s.split_at(split);
        if number.is_empty() {
            bail!("invalid quantity {:?}: missing numeric part", input);
        }

        let (mantissa, fraction_digits) = parse_mantissa(number)
            .with_context(|| format!("invalid quantity {:?}", input))?;
        let millis_per_unit = suffix_millis(suffix)
            .with_context(|| format!("invalid quantity {:?}", input))?;

        // Scale in i128 so large binary suffixes cannot overflow mid-way.
        let scaled = mantissa as i128 * millis_per_unit as i128;
        let divisor = 10i128.pow(fraction_digits);
        let millis = (scaled + divisor / 2) / divisor;
        let millis = i64::try_from(millis)
            .map_err(|_| anyhow::anyhow!("quantity {:?} out of range", input))?;
        Ok(Self { millis })
    }
}

/// Parse the numeric part into an integer mantissa and its fractional width.
fn parse_mantissa(number: &str) -> Result<(i64, u32)> {
    let (whole, fraction) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        bail!("missing digits");
    }
    if fraction.contains('.') {
        bail!("more than one decimal point");
    }
    if fraction.len() as u32 > MAX_FRACTION_DIGITS {
        bail!("too many fractional digits");
    }

    let mut mantissa: i64 = 0;
    for c in whole.chars().chain(fraction.chars()) {
        let digit = c.to_digit(10).context("non-digit in numeric part")? as i64;
        mantissa = mantissa
            .checked_mul(10)
            .and_then(|m| m.checked_add(digit))
            .context("numeric part out of range")?;
    }
    Ok((mantissa, fraction.len() as u32))
}

/// Milli-units represented by one unit of the given suffix.
fn suffix_millis(suffix: &str) -> Result<i64> {
    let millis = match suffix {
        "m" => 1,
        "" => MILLI,
        "k" => MILLI * 1_000,
        "M" => MILLI * 1_000_000,
        "G" => MILLI * 1_000_000_000,
        "T" => MILLI * 1_000_000_000_000,
        "Ki" => MILLI << 10,
        "Mi" => MILLI << 20,
        "Gi" => MILLI << 30,
        "Ti" => MILLI << 40,
        "Pi" => MILLI << 50,
        other => bail!("unknown suffix {:?}", other),
    };
    Ok(millis)
}

impl FromStr for Quantity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Quantity {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Quantity> for String {
    fn from(q: Quantity) -> String {
        q.to_string()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis % MILLI != 0 {
            return write!(f, "{}m", self.millis);
        }
        let value = self.millis / MILLI;
        for (mult, suffix) in [(1i64 << 30, "Gi"), (1 << 20, "Mi"), (1 << 10, "Ki")] {
            if value != 0 && value % mult == 0 {
                return write!(f, "{}{}", value / mult, suffix);
            }
        }
        write!(f, "{}", value)
    }
}

impl std::ops::Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity {
            millis: self.millis.saturating_add(rhs.millis),
        }
    }
}

impl std::ops::AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        *self = *self + rhs;
    }
}
