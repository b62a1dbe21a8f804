//! Aggregation queries over sample records.
//!
//! All functions here are synchronous and operate on a borrowed connection;
//! they are designed to be passed to [crate::store::SampleStore::read].
//! Aggregation is pushed down to SQL: `COUNT` and `AVG` run in the store,
//! and `AVG` ignores unmeasured (NULL) counts in both the numerator and the
//! denominator. Results come back at full precision; rounding is the result
//! shaper's job.

use rusqlite::{params_from_iter, Connection};
use strum_macros::Display;
use time::Date;

use crate::error::AnalyticsError;
use crate::filter::{SampleFilter, DATE_FORMAT};
use crate::models::SampleRecord;

/// Column grouped aggregations key on.
///
/// Serialises to the column name.
#[derive(Clone, Copy, Debug, Display, PartialEq)]
pub enum GroupBy {
    /// Group by sample type
    #[strum(serialize = "sample_type")]
    SampleType,
    /// Group by ship
    #[strum(serialize = "ship")]
    Ship,
    /// Group by sample point
    #[strum(serialize = "sample_point")]
    SamplePoint,
}

/// A group key and the number of matching records.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

/// Full-precision average particle counts for one group.
///
/// `None` means no record in the group had a measured count at that scale.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupAverages {
    pub key: String,
    pub avg_4_micron: Option<f64>,
    pub avg_6_micron: Option<f64>,
    pub avg_14_micron: Option<f64>,
}

/// Count matching records per group.
///
/// Groups come back in sorted key order. Records with a NULL grouping value
/// belong to no category and are omitted.
pub fn grouped_count(
    conn: &Connection,
    filter: &SampleFilter,
    group_by: GroupBy,
) -> Result<Vec<GroupCount>, AnalyticsError> {
    let (where_clause, params) = filter.to_sql()?;
    let sql = format!(
        "SELECT {group_by}, COUNT(*) FROM samples{where_clause} \
         GROUP BY {group_by} ORDER BY {group_by}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), |row| {
        Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
    })?;
    let mut counts = Vec::new();
    for row in rows {
        let (key, count) = row?;
        if let Some(key) = key {
            counts.push(GroupCount { key, count });
        }
    }
    Ok(counts)
}

/// Count matching records without grouping.
pub fn total_count(conn: &Connection, filter: &SampleFilter) -> Result<i64, AnalyticsError> {
    let (where_clause, params) = filter.to_sql()?;
    let sql = format!("SELECT COUNT(*) FROM samples{where_clause}");
    let count = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
    Ok(count)
}

/// Average the three particle count columns per group.
///
/// Groups come back in sorted key order; NULL-keyed groups are omitted.
pub fn grouped_averages(
    conn: &Connection,
    filter: &SampleFilter,
    group_by: GroupBy,
) -> Result<Vec<GroupAverages>, AnalyticsError> {
    let (where_clause, params) = filter.to_sql()?;
    let sql = format!(
        "SELECT {group_by}, AVG(particle_count_4_micron), AVG(particle_count_6_micron), \
         AVG(particle_count_14_micron) FROM samples{where_clause} \
         GROUP BY {group_by} ORDER BY {group_by}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), |row| {
        Ok((
            row.get::<_, Option<String>>(0)?,
            row.get::<_, Option<f64>>(1)?,
            row.get::<_, Option<f64>>(2)?,
            row.get::<_, Option<f64>>(3)?,
        ))
    })?;
    let mut averages = Vec::new();
    for row in rows {
        let (key, avg_4_micron, avg_6_micron, avg_14_micron) = row?;
        if let Some(key) = key {
            averages.push(GroupAverages {
                key,
                avg_4_micron,
                avg_6_micron,
                avg_14_micron,
            });
        }
    }
    Ok(averages)
}

/// List matching records in ascending test date order.
///
/// Ties on date break by insertion order so the listing is deterministic.
pub fn detail_rows(
    conn: &Connection,
    filter: &SampleFilter,
) -> Result<Vec<SampleRecord>, AnalyticsError> {
    let (where_clause, params) = filter.to_sql()?;
    let sql = format!(
        "SELECT ship, sample_type, test_date, sample_point, particle_count_4_micron, \
         particle_count_6_micron, particle_count_14_micron FROM samples{where_clause} \
         ORDER BY test_date ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), row_to_sample)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// List the distinct non-empty ship names in sorted order.
pub fn distinct_ships(conn: &Connection) -> Result<Vec<String>, AnalyticsError> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT ship FROM samples WHERE ship <> '' ORDER BY ship")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    let mut ships = Vec::new();
    for row in rows {
        ships.push(row?);
    }
    Ok(ships)
}

fn row_to_sample(row: &rusqlite::Row<'_>) -> rusqlite::Result<SampleRecord> {
    let test_date: String = row.get(2)?;
    let test_date = Date::parse(&test_date, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(SampleRecord {
        ship: row.get(0)?,
        sample_type: row.get(1)?,
        test_date,
        sample_point: row.get(3)?,
        particle_count_4_micron: row.get(4)?,
        particle_count_6_micron: row.get(5)?,
        particle_count_14_micron: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CategoryPredicate, FilterParams, Required};
    use crate::test_utils;
    use time::macros::date;

    fn year_2023() -> SampleFilter {
        let params = FilterParams {
            start_date: Some("2023-01-01".to_string()),
            end_date: Some("2023-12-31".to_string()),
            ..Default::default()
        };
        SampleFilter::build(&params, Required::date_range()).unwrap()
    }

    #[test]
    fn test_grouped_count_by_sample_type() {
        let conn = test_utils::seeded_connection();
        let counts = grouped_count(&conn, &SampleFilter::default(), GroupBy::SampleType).unwrap();
        assert_eq!(
            counts,
            vec![
                GroupCount {
                    key: "HCU".to_string(),
                    count: 7
                },
                GroupCount {
                    key: "Hydraulic".to_string(),
                    count: 1
                },
                GroupCount {
                    key: "Purifier".to_string(),
                    count: 4
                },
            ]
        );
    }

    #[test]
    fn test_grouped_count_with_date_filter() {
        let conn = test_utils::seeded_connection();
        let counts = grouped_count(&conn, &year_2023(), GroupBy::SampleType).unwrap();
        let hcu = counts.iter().find(|c| c.key == "HCU").unwrap();
        assert_eq!(hcu.count, 5);
    }

    #[test]
    fn test_grouped_count_subset_law() {
        // Tightening the filter can never grow a group.
        let conn = test_utils::seeded_connection();
        let all = grouped_count(&conn, &SampleFilter::default(), GroupBy::SampleType).unwrap();
        let filtered = grouped_count(&conn, &year_2023(), GroupBy::SampleType).unwrap();
        for group in &filtered {
            let unfiltered = all.iter().find(|c| c.key == group.key).unwrap();
            assert!(group.count <= unfiltered.count);
        }
    }

    #[test]
    fn test_grouped_count_is_idempotent() {
        let conn = test_utils::seeded_connection();
        let first = grouped_count(&conn, &year_2023(), GroupBy::Ship).unwrap();
        let second = grouped_count(&conn, &year_2023(), GroupBy::Ship).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_grouped_count_omits_null_keys() {
        // The Corvus record has no sample point; it must not appear as a group.
        let conn = test_utils::seeded_connection();
        let counts = grouped_count(&conn, &SampleFilter::default(), GroupBy::SamplePoint).unwrap();
        let keys: Vec<&str> = counts.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["AFTER FILTER", "BEFORE FILTER", "HCU#1", "HCU#2", "HCU#3"]
        );
    }

    #[test]
    fn test_grouped_count_hcu_per_ship() {
        let conn = test_utils::seeded_connection();
        let filter = SampleFilter::default()
            .with_sample_type(CategoryPredicate::Equals("HCU".to_string()));
        let counts = grouped_count(&conn, &filter, GroupBy::Ship).unwrap();
        assert_eq!(
            counts,
            vec![
                GroupCount {
                    key: "Astrolabe".to_string(),
                    count: 5
                },
                GroupCount {
                    key: "Meridian".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn test_grouped_count_empty_result() {
        let conn = test_utils::seeded_connection();
        let filter = SampleFilter {
            start_date: Some(date!(2030 - 01 - 01)),
            ..Default::default()
        };
        let counts = grouped_count(&conn, &filter, GroupBy::SampleType).unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn test_total_count() {
        let conn = test_utils::seeded_connection();
        assert_eq!(total_count(&conn, &SampleFilter::default()).unwrap(), 12);
        assert_eq!(total_count(&conn, &year_2023()).unwrap(), 10);
    }

    #[test]
    fn test_total_count_inverted_range_is_empty() {
        let conn = test_utils::seeded_connection();
        let filter = SampleFilter {
            start_date: Some(date!(2023 - 12 - 31)),
            end_date: Some(date!(2023 - 01 - 01)),
            ..Default::default()
        };
        assert_eq!(total_count(&conn, &filter).unwrap(), 0);
    }

    #[test]
    fn test_grouped_averages_exclude_unmeasured() {
        // HCU#1 in 2023 has counts 50 and 5 at the 6 micron scale plus one
        // unmeasured record; the average must divide by two, not three.
        let conn = test_utils::seeded_connection();
        let filter = year_2023().with_sample_point(CategoryPredicate::OneOf(
            (1..=9).map(|i| format!("HCU#{}", i)).collect(),
        ));
        let averages = grouped_averages(&conn, &filter, GroupBy::SamplePoint).unwrap();
        let hcu1 = averages.iter().find(|a| a.key == "HCU#1").unwrap();
        assert_eq!(hcu1.avg_6_micron, Some(27.5));
        assert!((hcu1.avg_4_micron.unwrap() - 401.0 / 3.0).abs() < 1e-9);
        assert!((hcu1.avg_14_micron.unwrap() - 41.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_grouped_averages_all_unmeasured_group() {
        let conn = test_utils::seeded_connection();
        let filter = SampleFilter {
            ship: Some("Corvus".to_string()),
            ..Default::default()
        };
        let averages = grouped_averages(&conn, &filter, GroupBy::Ship).unwrap();
        assert_eq!(
            averages,
            vec![GroupAverages {
                key: "Corvus".to_string(),
                avg_4_micron: None,
                avg_6_micron: None,
                avg_14_micron: None,
            }]
        );
    }

    #[test]
    fn test_grouped_averages_empty_result() {
        let conn = test_utils::seeded_connection();
        let filter = SampleFilter {
            start_date: Some(date!(1999 - 01 - 01)),
            end_date: Some(date!(1999 - 12 - 31)),
            ..Default::default()
        };
        let averages = grouped_averages(&conn, &filter, GroupBy::Ship).unwrap();
        assert!(averages.is_empty());
    }

    #[test]
    fn test_detail_rows_ordered_by_date() {
        let conn = test_utils::seeded_connection();
        let params = FilterParams {
            ship: Some("Astrolabe".to_string()),
            start_year: Some("2023".to_string()),
            end_year: Some("2023".to_string()),
            ..Default::default()
        };
        let filter = SampleFilter::build(&params, Required::ship_and_year_range())
            .unwrap()
            .with_sample_point(CategoryPredicate::Prefix("HCU".to_string()));
        let rows = detail_rows(&conn, &filter).unwrap();
        let dates: Vec<Date> = rows.iter().map(|r| r.test_date).collect();
        assert_eq!(
            dates,
            vec![
                date!(2023 - 01 - 10),
                date!(2023 - 02 - 20),
                date!(2023 - 02 - 25),
                date!(2023 - 06 - 15),
            ]
        );
        assert!(rows.iter().all(|r| r.ship == "Astrolabe"));
    }

    #[test]
    fn test_detail_rows_year_bounds_are_calendar_years() {
        // The 2022 and 2024 records sit just outside the year range.
        let conn = test_utils::seeded_connection();
        let filter = SampleFilter {
            start_year: Some(2023),
            end_year: Some(2023),
            ..Default::default()
        }
        .with_sample_point(CategoryPredicate::Prefix("HCU".to_string()));
        let rows = detail_rows(&conn, &filter).unwrap();
        assert!(rows.iter().all(|r| r.test_date.year() == 2023));
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn test_distinct_ships_sorted() {
        let conn = test_utils::seeded_connection();
        let ships = distinct_ships(&conn).unwrap();
        assert_eq!(ships, vec!["Astrolabe", "Corvus", "Meridian"]);
    }
}
