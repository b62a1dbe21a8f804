//! Filter parsing and SQL predicate construction for sample queries.
//!
//! Each analytics endpoint accepts a subset of the same query parameters.
//! [SampleFilter::build] validates the raw parameters against the groups the
//! endpoint requires, and the resulting [SampleFilter] renders to a
//! parameterised SQL `WHERE` clause. Validation happens before any query
//! executes.

use rusqlite::types::Value;
use serde::Deserialize;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

use crate::error::AnalyticsError;

/// Date format used on the wire and in the store.
///
/// ISO 8601 dates in TEXT columns compare lexicographically in the same
/// order as chronologically, so range predicates work directly on the
/// stored strings.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Raw filter query parameters as they arrive on the wire.
///
/// All fields are optional at this level; [SampleFilter::build] enforces the
/// per-endpoint requirements. An empty string is treated the same as an
/// absent parameter.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct FilterParams {
    /// Inclusive lower test date bound, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Inclusive upper test date bound, `YYYY-MM-DD`
    pub end_date: Option<String>,
    /// Inclusive lower calendar year bound
    #[serde(rename = "startYear")]
    pub start_year: Option<String>,
    /// Inclusive upper calendar year bound
    #[serde(rename = "endYear")]
    pub end_year: Option<String>,
    /// Ship name
    pub ship: Option<String>,
    /// Alternate ship name parameter accepted for compatibility
    pub ship_name: Option<String>,
}

/// Parameter groups an endpoint requires.
///
/// A required group with a missing parameter fails validation with a 400
/// error naming the first missing field.
#[derive(Clone, Copy, Debug, Default)]
pub struct Required {
    /// Both `start_date` and `end_date` must be provided
    pub date_range: bool,
    /// Both `startYear` and `endYear` must be provided
    pub year_range: bool,
    /// A ship name must be provided
    pub ship: bool,
}

impl Required {
    /// No required parameters.
    pub fn none() -> Self {
        Self::default()
    }

    /// Require a full date range.
    pub fn date_range() -> Self {
        Required {
            date_range: true,
            ..Default::default()
        }
    }

    /// Require a ship name and a full year range.
    pub fn ship_and_year_range() -> Self {
        Required {
            year_range: true,
            ship: true,
            ..Default::default()
        }
    }
}

/// Predicate over a categorical column.
#[derive(Clone, Debug, PartialEq)]
pub enum CategoryPredicate {
    /// Exact match
    Equals(String),
    /// Prefix match, rendered as `LIKE 'prefix%'`
    Prefix(String),
    /// Membership in a fixed set, rendered as `IN (...)`
    OneOf(Vec<String>),
}

impl CategoryPredicate {
    /// Render the predicate as a SQL fragment for `column`, appending bind
    /// values to `params` and numbering placeholders to match.
    fn to_sql(&self, column: &str, params: &mut Vec<Value>) -> String {
        match self {
            Self::Equals(value) => {
                params.push(Value::Text(value.clone()));
                format!("{} = ?{}", column, params.len())
            }
            Self::Prefix(value) => {
                params.push(Value::Text(format!("{}%", value)));
                format!("{} LIKE ?{}", column, params.len())
            }
            Self::OneOf(values) => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|value| {
                        params.push(Value::Text(value.clone()));
                        format!("?{}", params.len())
                    })
                    .collect();
                format!("{} IN ({})", column, placeholders.join(", "))
            }
        }
    }
}

/// A validated set of predicates over sample records.
///
/// All predicates are optional and combine conjunctively. An inverted range
/// (start after end) is not an error; it selects no records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleFilter {
    /// Inclusive lower test date bound
    pub start_date: Option<Date>,
    /// Inclusive upper test date bound
    pub end_date: Option<Date>,
    /// Inclusive lower calendar year bound
    pub start_year: Option<i32>,
    /// Inclusive upper calendar year bound
    pub end_year: Option<i32>,
    /// Exact ship name
    pub ship: Option<String>,
    /// Sample type predicate, fixed per endpoint
    pub sample_type: Option<CategoryPredicate>,
    /// Sample point predicate, fixed per endpoint
    pub sample_point: Option<CategoryPredicate>,
}

impl SampleFilter {
    /// Validate raw query parameters into a `SampleFilter`.
    ///
    /// # Arguments
    ///
    /// * `params`: Raw query parameters
    /// * `required`: Parameter groups the endpoint requires
    pub fn build(params: &FilterParams, required: Required) -> Result<Self, AnalyticsError> {
        let start_date = parse_date(&params.start_date, "start_date", required.date_range)?;
        let end_date = parse_date(&params.end_date, "end_date", required.date_range)?;
        let start_year = parse_year(&params.start_year, "startYear", required.year_range)?;
        let end_year = parse_year(&params.end_year, "endYear", required.year_range)?;
        let ship = parse_ship(params, required.ship)?;
        Ok(SampleFilter {
            start_date,
            end_date,
            start_year,
            end_year,
            ship,
            ..Default::default()
        })
    }

    /// Attach a sample type predicate.
    pub fn with_sample_type(mut self, predicate: CategoryPredicate) -> Self {
        self.sample_type = Some(predicate);
        self
    }

    /// Attach a sample point predicate.
    pub fn with_sample_point(mut self, predicate: CategoryPredicate) -> Self {
        self.sample_point = Some(predicate);
        self
    }

    /// Render the filter as conjunctive SQL fragments plus bind values.
    ///
    /// Placeholders are numbered `?1`, `?2`, ... in step with the returned
    /// values, so fragments may be joined in any subset.
    pub fn where_parts(&self) -> Result<(Vec<String>, Vec<Value>), AnalyticsError> {
        let mut parts = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(predicate) = &self.sample_type {
            parts.push(predicate.to_sql("sample_type", &mut params));
        }
        if let Some(predicate) = &self.sample_point {
            parts.push(predicate.to_sql("sample_point", &mut params));
        }
        if let Some(ship) = &self.ship {
            params.push(Value::Text(ship.clone()));
            parts.push(format!("ship = ?{}", params.len()));
        }
        if let Some(start_date) = self.start_date {
            params.push(Value::Text(start_date.format(DATE_FORMAT)?));
            parts.push(format!("test_date >= ?{}", params.len()));
        }
        if let Some(end_date) = self.end_date {
            params.push(Value::Text(end_date.format(DATE_FORMAT)?));
            parts.push(format!("test_date <= ?{}", params.len()));
        }
        if let Some(start_year) = self.start_year {
            params.push(Value::Integer(start_year.into()));
            parts.push(format!(
                "CAST(strftime('%Y', test_date) AS INTEGER) >= ?{}",
                params.len()
            ));
        }
        if let Some(end_year) = self.end_year {
            params.push(Value::Integer(end_year.into()));
            parts.push(format!(
                "CAST(strftime('%Y', test_date) AS INTEGER) <= ?{}",
                params.len()
            ));
        }

        Ok((parts, params))
    }

    /// Render the filter as a complete `WHERE` clause, or an empty string
    /// when the filter has no predicates.
    pub fn to_sql(&self) -> Result<(String, Vec<Value>), AnalyticsError> {
        let (parts, params) = self.where_parts()?;
        let clause = if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        };
        Ok((clause, params))
    }
}

/// Return the parameter value, treating empty strings as absent.
fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|value| !value.is_empty())
}

fn parse_date(
    raw: &Option<String>,
    field: &'static str,
    required: bool,
) -> Result<Option<Date>, AnalyticsError> {
    match non_empty(raw) {
        Some(value) => {
            let date = Date::parse(value, DATE_FORMAT)
                .map_err(|source| AnalyticsError::InvalidDateFormat { field, source })?;
            Ok(Some(date))
        }
        None if required => Err(AnalyticsError::MissingParameter { field }),
        None => Ok(None),
    }
}

fn parse_year(
    raw: &Option<String>,
    field: &'static str,
    required: bool,
) -> Result<Option<i32>, AnalyticsError> {
    match non_empty(raw) {
        Some(value) => {
            let year = value
                .parse::<i32>()
                .map_err(|source| AnalyticsError::InvalidYearFormat { field, source })?;
            Ok(Some(year))
        }
        None if required => Err(AnalyticsError::MissingParameter { field }),
        None => Ok(None),
    }
}

/// Resolve the ship name from either accepted parameter.
///
/// `ship` takes precedence over `ship_name` when both are present. Where the
/// ship is optional, the sentinel value `all` (case-insensitive) means
/// unfiltered; where it is required the value is taken verbatim.
fn parse_ship(params: &FilterParams, required: bool) -> Result<Option<String>, AnalyticsError> {
    let raw = non_empty(&params.ship).or_else(|| non_empty(&params.ship_name));
    match raw {
        Some(value) => {
            if !required && value.eq_ignore_ascii_case("all") {
                Ok(None)
            } else {
                Ok(Some(value.to_string()))
            }
        }
        None if required => Err(AnalyticsError::MissingParameter { field: "ship" }),
        None => Ok(None),
    }
}
