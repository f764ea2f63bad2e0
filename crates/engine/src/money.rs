use std::{fmt, iter::Sum, str::FromStr};

use crate::{EngineError, ResultEngine};

/// Fixed-point amount with two decimal places, stored as integer cents.
///
/// Single amounts are limited to twelve digits ([`MoneyCents::MAX`], i.e.
/// `9999999999.99`). Totals saturate instead of overflowing, so summing any
/// number of stored amounts never panics.
///
/// ```rust
/// use engine::MoneyCents;
///
/// let rent: MoneyCents = "850,5".parse().unwrap();
/// assert_eq!(rent.cents(), 85_050);
/// assert_eq!(rent.to_string(), "850.50");
/// assert!("1.005".parse::<MoneyCents>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Largest amount a single transaction or budget may carry.
    pub const MAX: MoneyCents = MoneyCents(999_999_999_999);

    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Accept `self` as the amount of a record: strictly positive and at
    /// most [`MoneyCents::MAX`].
    pub fn positive_amount(self) -> ResultEngine<Self> {
        if !self.is_positive() {
            return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
        }
        if self > Self::MAX {
            return Err(EngineError::InvalidAmount(format!(
                "amount must be at most {}",
                Self::MAX
            )));
        }
        Ok(self)
    }

    #[must_use]
    pub const fn saturating_add(self, rhs: MoneyCents) -> MoneyCents {
        MoneyCents(self.0.saturating_add(rhs.0))
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: MoneyCents) -> MoneyCents {
        MoneyCents(self.0.saturating_sub(rhs.0))
    }

    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, MoneyCents::saturating_add)
    }
}

fn all_digits(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for MoneyCents {
    type Err = EngineError;

    /// Parse `[+|-]units[(.|,)d[d]]`, e.g. `12`, `12.5`, `-0,01`.
    ///
    /// The magnitude is capped at [`MoneyCents::MAX`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidAmount(format!("invalid amount: {}", s.trim()));
        let too_large =
            || EngineError::InvalidAmount(format!("amount must be at most {}", MoneyCents::MAX));

        let value = s.trim();
        let (negative, magnitude) = match value.as_bytes().first() {
            Some(b'-') => (true, &value[1..]),
            Some(b'+') => (false, &value[1..]),
            Some(_) => (false, value),
            None => return Err(EngineError::InvalidAmount("empty amount".to_string())),
        };

        let (units, fraction) = match magnitude.split_once(['.', ',']) {
            Some((units, fraction)) => (units, fraction),
            None => (magnitude, ""),
        };
        if units.is_empty() || !all_digits(units) || !all_digits(fraction) {
            return Err(invalid());
        }
        if fraction.len() > 2 {
            return Err(EngineError::InvalidAmount(
                "at most two decimal places are allowed".to_string(),
            ));
        }

        let units = units.trim_start_matches('0');
        // Twelve digits in total, two of them after the separator.
        if units.len() > 10 {
            return Err(too_large());
        }
        let units: i64 = if units.is_empty() {
            0
        } else {
            units.parse().map_err(|_| invalid())?
        };
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let magnitude = units * 100 + cents;
        Ok(MoneyCents(if negative { -magnitude } else { magnitude }))
    }
}
