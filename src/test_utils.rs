use crate::models::{Credentials, SampleRecord};
use crate::store::{self, SampleStore};

use rusqlite::Connection;
use time::macros::date;
use time::Date;

/// Create a Credentials object for a test account.
pub(crate) fn get_test_credentials() -> Credentials {
    Credentials {
        email: "alice@example.com".to_string(),
        password: "hunter2".to_string(),
    }
}

fn record(
    ship: &str,
    sample_type: &str,
    test_date: Date,
    sample_point: Option<&str>,
    counts: [Option<f64>; 3],
) -> SampleRecord {
    SampleRecord {
        ship: ship.to_string(),
        sample_type: sample_type.to_string(),
        test_date,
        sample_point: sample_point.map(str::to_string),
        particle_count_4_micron: counts[0],
        particle_count_6_micron: counts[1],
        particle_count_14_micron: counts[2],
    }
}

/// Create the fleet sample records used across tests.
///
/// The fixture covers three ships, three sample types, missing particle
/// counts, a record with no sample point, and test dates spanning 2022 to
/// 2024, so that filter and aggregation behaviour can be asserted against
/// hand computed values.
pub(crate) fn fleet_records() -> Vec<SampleRecord> {
    vec![
        record(
            "Astrolabe",
            "HCU",
            date!(2023 - 01 - 10),
            Some("HCU#1"),
            [Some(100.0), Some(50.0), Some(10.0)],
        ),
        record(
            "Astrolabe",
            "HCU",
            date!(2023 - 02 - 20),
            Some("HCU#1"),
            [Some(200.0), None, Some(30.0)],
        ),
        record(
            "Astrolabe",
            "HCU",
            date!(2023 - 06 - 15),
            Some("HCU#2"),
            [Some(300.0), Some(150.0), None],
        ),
        record(
            "Astrolabe",
            "Purifier",
            date!(2023 - 03 - 05),
            Some("BEFORE FILTER"),
            [Some(400.0), Some(200.0), Some(40.0)],
        ),
        record(
            "Astrolabe",
            "Purifier",
            date!(2023 - 03 - 06),
            Some("AFTER FILTER"),
            [Some(80.0), Some(40.0), Some(8.0)],
        ),
        record(
            "Meridian",
            "HCU",
            date!(2022 - 11 - 30),
            Some("HCU#3"),
            [Some(50.0), Some(25.0), Some(5.0)],
        ),
        record(
            "Meridian",
            "HCU",
            date!(2023 - 04 - 12),
            Some("HCU#3"),
            [Some(150.0), Some(75.0), Some(15.0)],
        ),
        record(
            "Meridian",
            "Purifier",
            date!(2023 - 04 - 01),
            Some("BEFORE FILTER"),
            [Some(600.0), Some(300.0), Some(60.0)],
        ),
        record(
            "Meridian",
            "Purifier",
            date!(2023 - 04 - 02),
            Some("AFTER FILTER"),
            [Some(120.0), Some(60.0), None],
        ),
        record(
            "Corvus",
            "Hydraulic",
            date!(2023 - 05 - 01),
            None,
            [None, None, None],
        ),
        record(
            "Astrolabe",
            "HCU",
            date!(2024 - 01 - 08),
            Some("HCU#1"),
            [Some(120.0), Some(60.0), Some(12.0)],
        ),
        record(
            "Astrolabe",
            "HCU",
            date!(2023 - 02 - 25),
            Some("HCU#1"),
            [Some(101.0), Some(5.0), Some(1.0)],
        ),
    ]
}

/// Create an in-memory connection seeded with the fleet records.
pub(crate) fn seeded_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    SampleStore::create_tables(&conn).unwrap();
    for record in fleet_records() {
        store::insert_sample_record(&conn, &record).unwrap();
    }
    conn
}

/// Create an in-memory sample store seeded with the fleet records.
pub(crate) async fn seeded_store() -> SampleStore {
    let store = SampleStore::in_memory().unwrap();
    store.insert_samples(fleet_records()).await.unwrap();
    store
}
