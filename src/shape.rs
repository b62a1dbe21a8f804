//! Shaping of aggregation results into response bodies.
//!
//! The shaper owns the presentation rules: rounding to two decimal places,
//! rendering unmeasured values as `0.0`, sorted map iteration, and the fixed
//! response key spelling in [crate::models]. Nothing here touches the store.

use std::collections::BTreeMap;

use crate::aggregate::{GroupAverages, GroupCount};
use crate::error::AnalyticsError;
use crate::filter::DATE_FORMAT;
use crate::models::{SampleDetail, SamplePointAverages, SampleRecord, ShipFilterAverages};

/// Sample point name for samples drawn upstream of the filter.
pub const BEFORE_FILTER: &str = "BEFORE FILTER";
/// Sample point name for samples drawn downstream of the filter.
pub const AFTER_FILTER: &str = "AFTER FILTER";

/// Round an average to two decimal places for presentation.
///
/// An undefined average (no measured values in the group) renders as `0.0`.
pub fn round2(value: Option<f64>) -> f64 {
    match value {
        Some(value) => (value * 100.0).round() / 100.0,
        None => 0.0,
    }
}

/// Turn grouped counts into a category to count map.
///
/// Categories absent from the input stay absent; the map is never
/// zero-filled. Iteration order is sorted by category.
pub fn count_map(counts: Vec<GroupCount>) -> BTreeMap<String, i64> {
    counts
        .into_iter()
        .map(|group| (group.key, group.count))
        .collect()
}

/// Shape raw sample records into detail listing rows.
///
/// Unmeasured particle counts render as `0.0` here; this is presentation
/// only and unrelated to how averages treat them.
pub fn sample_details(records: Vec<SampleRecord>) -> Result<Vec<SampleDetail>, AnalyticsError> {
    records
        .into_iter()
        .map(|record| {
            Ok(SampleDetail {
                ship: record.ship,
                sample_point: record.sample_point.unwrap_or_default(),
                test_date: record.test_date.format(DATE_FORMAT)?,
                particle_count_4_micron: record.particle_count_4_micron.unwrap_or(0.0),
                particle_count_6_micron: record.particle_count_6_micron.unwrap_or(0.0),
                particle_count_14_micron: record.particle_count_14_micron.unwrap_or(0.0),
            })
        })
        .collect()
}

/// Shape per-sample-point averages, rounding each value.
pub fn sample_point_averages(groups: Vec<GroupAverages>) -> Vec<SamplePointAverages> {
    groups
        .into_iter()
        .map(|group| SamplePointAverages {
            sample_point: group.key,
            average_particle_count_4_micron: round2(group.avg_4_micron),
            average_particle_count_6_micron: round2(group.avg_6_micron),
            average_particle_count_14_micron: round2(group.avg_14_micron),
        })
        .collect()
}

/// Shape the before/after filter comparison.
///
/// The two sides are independent per-ship average runs; rows for the before
/// side come first, each row tagged with the sample point it was averaged
/// over.
pub fn ship_filter_averages(
    before: Vec<GroupAverages>,
    after: Vec<GroupAverages>,
) -> Vec<ShipFilterAverages> {
    let tag = |groups: Vec<GroupAverages>, sample_point: &str| {
        groups
            .into_iter()
            .map(|group| ShipFilterAverages {
                ship: group.key,
                sample_point: sample_point.to_string(),
                average_particle_count_4_micron: round2(group.avg_4_micron),
                average_particle_count_6_micron: round2(group.avg_6_micron),
                average_particle_count_14_micron: round2(group.avg_14_micron),
            })
            .collect::<Vec<_>>()
    };
    let mut rows = tag(before, BEFORE_FILTER);
    rows.extend(tag(after, AFTER_FILTER));
    rows
}
