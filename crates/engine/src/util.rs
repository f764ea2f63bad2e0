//! Internal helpers for input normalization and storage conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use chrono::{Datelike, Months, NaiveDate};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

const MAX_CATEGORY_NAME_LEN: usize = 100;
const MAX_BUDGET_NAME_LEN: usize = 255;

/// Trim and NFC-normalize a name so that visually identical names compare
/// equal in the unique index.
fn normalize_name(value: &str, label: &str, max_len: usize) -> ResultEngine<String> {
    let normalized: String = value.trim().nfc().collect();
    if normalized.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    if normalized.chars().count() > max_len {
        return Err(EngineError::InvalidName(format!(
            "{label} name must be at most {max_len} characters"
        )));
    }
    Ok(normalized)
}

pub(crate) fn normalize_category_name(value: &str) -> ResultEngine<String> {
    normalize_name(value, "category", MAX_CATEGORY_NAME_LEN)
}

pub(crate) fn normalize_budget_name(value: &str) -> ResultEngine<String> {
    normalize_name(value, "budget", MAX_BUDGET_NAME_LEN)
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Trim the address and lower-case its domain part.
///
/// The local part is kept as typed: some providers treat it as case
/// sensitive.
pub(crate) fn normalize_email(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    let Some((local, domain)) = trimmed.rsplit_once('@') else {
        return Err(EngineError::InvalidName(format!(
            "invalid email address: {trimmed}"
        )));
    };
    if local.is_empty() || domain.is_empty() || domain.contains(char::is_whitespace) {
        return Err(EngineError::InvalidName(format!(
            "invalid email address: {trimmed}"
        )));
    }
    Ok(format!("{local}@{}", domain.to_lowercase()))
}

/// Parse an ISO-4217 style code (three ASCII letters), upper-cased.
pub(crate) fn normalize_currency(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(EngineError::InvalidName(format!(
            "invalid currency code: {trimmed}"
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

pub(crate) fn validate_month(month: u32) -> ResultEngine<u32> {
    if !(1..=12).contains(&month) {
        return Err(EngineError::InvalidDate(format!(
            "month must be between 1 and 12, got {month}"
        )));
    }
    Ok(month)
}

/// First and last day of `year`, or of `month` of `year` when given.
pub(crate) fn period_bounds(year: i32, month: Option<u32>) -> ResultEngine<(NaiveDate, NaiveDate)> {
    let out_of_range = || EngineError::InvalidDate(format!("year {year} is out of range"));
    let (first, months) = match month {
        Some(month) => (
            NaiveDate::from_ymd_opt(year, validate_month(month)?, 1).ok_or_else(out_of_range)?,
            1,
        ),
        None => (
            NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(out_of_range)?,
            12,
        ),
    };
    let last = first
        .checked_add_months(Months::new(months))
        .and_then(|next| next.pred_opt())
        .ok_or_else(out_of_range)?;
    Ok((first, last))
}

/// `true` when `date` is in `month` (any year).
pub(crate) fn in_month(date: NaiveDate, month: Option<u32>) -> bool {
    month.is_none_or(|month| date.month() == month)
}

/// Parse a UUID coming from the outside and return a labeled error on
/// failure.
pub fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}
