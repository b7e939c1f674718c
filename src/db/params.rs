//! Query parameters and placeholder binding.
//!
//! Curated and generated SQL refer to dashboard filters by name, either as
//! `:start_date` or in the psycopg style `%(start_date)s`. Before execution the
//! names are rewritten to positional `$1`, `$2`, ... placeholders and the
//! matching values are collected in order.

use crate::config::FilterDefaults;
use crate::error::{FxLensError, Result};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;

/// Accepted range for the pip threshold filter.
pub const THRESHOLD_RANGE: RangeInclusive<i64> = 1..=500;

/// Accepted range for the minimum gap filter.
pub const MIN_GAP_RANGE: RangeInclusive<i64> = 1..=200;

/// Accepted range for the minimum daily range filter.
pub const MIN_DAILY_RANGE: RangeInclusive<i64> = 1..=2000;

/// A value bound to a positional placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Date(NaiveDate),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "'{s}'"),
        }
    }
}

/// The dashboard filters available to every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub threshold_pips: i64,
    pub min_gap_pips: i64,
    pub min_daily_pips: i64,
}

impl QueryParams {
    /// Names usable as placeholders, in display order.
    pub const NAMES: [&'static str; 5] = [
        "start_date",
        "end_date",
        "threshold_pips",
        "min_gap_pips",
        "min_daily_pips",
    ];

    /// Builds the default filters: the configured lookback window ending today (UTC).
    pub fn from_defaults(defaults: &FilterDefaults) -> Self {
        Self::from_defaults_at(defaults, Utc::now().date_naive())
    }

    /// Builds the default filters with the window ending on `today`.
    pub fn from_defaults_at(defaults: &FilterDefaults, today: NaiveDate) -> Self {
        Self {
            start_date: today - Duration::days(defaults.lookback_days.max(0)),
            end_date: today,
            threshold_pips: defaults.threshold_pips,
            min_gap_pips: defaults.min_gap_pips,
            min_daily_pips: defaults.min_daily_pips,
        }
    }

    /// Checks the date order and pip ranges.
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(FxLensError::config(format!(
                "Start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        check_range("threshold_pips", self.threshold_pips, &THRESHOLD_RANGE)?;
        check_range("min_gap_pips", self.min_gap_pips, &MIN_GAP_RANGE)?;
        check_range("min_daily_pips", self.min_daily_pips, &MIN_DAILY_RANGE)?;
        Ok(())
    }

    /// Returns the value for a placeholder name.
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        match name {
            "start_date" => Some(ParamValue::Date(self.start_date)),
            "end_date" => Some(ParamValue::Date(self.end_date)),
            "threshold_pips" => Some(ParamValue::Int(self.threshold_pips)),
            "min_gap_pips" => Some(ParamValue::Int(self.min_gap_pips)),
            "min_daily_pips" => Some(ParamValue::Int(self.min_daily_pips)),
            _ => None,
        }
    }

    /// One-line summary for headers and logs.
    pub fn summary(&self) -> String {
        format!(
            "{} → {} | threshold {} pips | gap {} pips | daily {} pips",
            self.start_date,
            self.end_date,
            self.threshold_pips,
            self.min_gap_pips,
            self.min_daily_pips
        )
    }
}

fn check_range(name: &str, value: i64, range: &RangeInclusive<i64>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(FxLensError::config(format!(
            "{name} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

/// SQL rewritten to positional placeholders plus the values to bind.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub values: Vec<ParamValue>,
}

impl BoundQuery {
    /// A query with no parameters.
    pub fn plain(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }
}

/// Rewrites named placeholders to `$n` and collects their values.
///
/// A name used more than once binds to the same position. `::type` casts,
/// quoted literals, quoted identifiers and comments are left untouched. An
/// unknown name is a query error.
pub fn bind_named(sql: &str, params: &QueryParams) -> Result<BoundQuery> {
    let mut out = String::with_capacity(sql.len());
    let mut binder = Binder {
        params,
        values: Vec::new(),
        positions: HashMap::new(),
    };

    let chars: Vec<char> = sql.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                let end = skip_quoted(&chars, i, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |offset| i + offset);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = find_block_comment_end(&chars, i + 2);
                out.extend(&chars[i..end]);
                i = end;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars
                .get(i + 1)
                .is_some_and(|ch| ch.is_ascii_alphabetic() || *ch == '_') =>
            {
                let end = identifier_end(&chars, i + 1);
                let name: String = chars[i + 1..end].iter().collect();
                out.push_str(&binder.bind(&name)?);
                i = end;
            }
            '%' if chars.get(i + 1) == Some(&'(') => match psycopg_name_end(&chars, i + 2) {
                Some(end) => {
                    let name: String = chars[i + 2..end].iter().collect();
                    out.push_str(&binder.bind(&name)?);
                    // Skip the closing `)s`.
                    i = end + 2;
                }
                None => {
                    out.push(c);
                    i += 1;
                }
            },
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(BoundQuery {
        sql: out,
        values: binder.values,
    })
}

/// Assigns positions to parameter names in order of first use.
struct Binder<'a> {
    params: &'a QueryParams,
    values: Vec<ParamValue>,
    positions: HashMap<String, usize>,
}

impl Binder<'_> {
    /// Returns the `$n` placeholder for `name`.
    fn bind(&mut self, name: &str) -> Result<String> {
        if let Some(&position) = self.positions.get(name) {
            return Ok(format!("${position}"));
        }
        let value = self
            .params
            .get(name)
            .ok_or_else(|| FxLensError::query(format!("Unknown query parameter ':{name}'")))?;
        self.values.push(value);
        self.positions.insert(name.to_string(), self.values.len());
        Ok(format!("${}", self.values.len()))
    }
}

/// Returns the index just past an identifier starting at `start`.
fn identifier_end(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    end
}

/// For `%(name)s` with `name` starting at `start`, returns the index of `)`.
fn psycopg_name_end(chars: &[char], start: usize) -> Option<usize> {
    let first = chars.get(start)?;
    if !(first.is_ascii_alphabetic() || *first == '_') {
        return None;
    }
    let end = identifier_end(chars, start);
    (chars.get(end) == Some(&')') && chars.get(end + 1) == Some(&'s')).then_some(end)
}

/// Returns the index just past the closing quote. Doubled quotes are escapes.
fn skip_quoted(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn find_block_comment_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

/// Caps a query at `limit` rows.
///
/// A trailing semicolon is dropped. Queries that already carry a `LIMIT` are
/// wrapped in a subquery so the cap still applies.
pub fn apply_limit(sql: &str, limit: Option<u32>) -> String {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    let Some(limit) = limit else {
        return trimmed.to_string();
    };

    let has_limit = crate::registry::normalize(trimmed)
        .iter()
        .any(|token| token == "limit");
    // On its own line so a trailing `--` comment cannot swallow it.
    if has_limit {
        format!("SELECT * FROM ({trimmed}\n) AS limited\nLIMIT {limit}")
    } else {
        format!("{trimmed}\nLIMIT {limit}")
    }
}
