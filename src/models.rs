//! Data types and associated functions and methods

use serde::{Deserialize, Serialize};
use time::Date;
use validator::Validate;

/// A single oil sample test record.
///
/// Particle counts are optional because not every laboratory test measures
/// every scale. An absent count means "not measured", which is distinct from
/// a measured count of zero: absent counts are excluded from averages but
/// rendered as `0.0` in raw listings.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleRecord {
    /// Name of the ship the sample was drawn on
    pub ship: String,
    /// Sample category, e.g. "HCU" or "Purifier"
    pub sample_type: String,
    /// Date the sample was tested
    pub test_date: Date,
    /// Location the sample was drawn from, e.g. "HCU#3" or "BEFORE FILTER"
    pub sample_point: Option<String>,
    /// Particle count at the 4 micron scale
    pub particle_count_4_micron: Option<f64>,
    /// Particle count at the 6 micron scale
    pub particle_count_6_micron: Option<f64>,
    /// Particle count at the 14 micron scale
    pub particle_count_14_micron: Option<f64>,
}

/// A registered user account as stored.
///
/// `password_hash` is an argon2id PHC string. The plaintext password is never
/// stored.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// Row ID of the account
    pub id: i64,
    /// Email address, unique across accounts
    pub email: String,
    /// PHC format password hash
    pub password_hash: String,
}

/// Request data for signup and login
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    /// Email address identifying the account
    #[validate(length(min = 1, message = "email must not be empty"))]
    pub email: String,
    /// Plaintext password
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// Response to a successful signup or login
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct AuthResponse {
    /// Row ID of the account
    pub id: i64,
    /// Email address of the account
    pub email: String,
    /// Session token to present on subsequent requests
    pub token: String,
}

/// A single record in a ship sample detail listing.
///
/// Field names serialise in the fixed spelling the API has always used.
/// Unmeasured particle counts render as `0.0`.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct SampleDetail {
    #[serde(rename = "Ship")]
    pub ship: String,
    #[serde(rename = "Sample_Point")]
    pub sample_point: String,
    /// Test date in `YYYY-MM-DD` format
    #[serde(rename = "Test_Date")]
    pub test_date: String,
    #[serde(rename = "Particle_Count_4_Micron")]
    pub particle_count_4_micron: f64,
    #[serde(rename = "Particle_Count_6_Micron")]
    pub particle_count_6_micron: f64,
    #[serde(rename = "Particle_Count_14_Micron")]
    pub particle_count_14_micron: f64,
}

/// Average particle counts for one sample point.
///
/// Averages are rounded to two decimal places; a group with no measured
/// counts renders as `0.0`.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct SamplePointAverages {
    #[serde(rename = "Sample_Point")]
    pub sample_point: String,
    #[serde(rename = "Average_Particle_Count_4_Micron")]
    pub average_particle_count_4_micron: f64,
    #[serde(rename = "Average_Particle_Count_6_Micron")]
    pub average_particle_count_6_micron: f64,
    #[serde(rename = "Average_Particle_Count_14_Micron")]
    pub average_particle_count_14_micron: f64,
}

/// Average particle counts for one ship on one side of the filter.
///
/// `sample_point` is "BEFORE FILTER" or "AFTER FILTER".
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct ShipFilterAverages {
    #[serde(rename = "Ship")]
    pub ship: String,
    #[serde(rename = "Sample_Point")]
    pub sample_point: String,
    #[serde(rename = "Average_Particle_Count_4_Micron")]
    pub average_particle_count_4_micron: f64,
    #[serde(rename = "Average_Particle_Count_6_Micron")]
    pub average_particle_count_6_micron: f64,
    #[serde(rename = "Average_Particle_Count_14_Micron")]
    pub average_particle_count_14_micron: f64,
}

/// Response to a global sample count query
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct SampleCount {
    /// Number of sample records matching the filter
    pub count: i64,
}
