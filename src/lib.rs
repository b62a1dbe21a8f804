//! This crate provides a ship oil sample analytics server. It serves aggregate
//! statistics over laboratory particle count records held in an embedded
//! SQLite database, together with a minimal account signup and login flow.
//! Counting and averaging happen inside the database so only small, shaped
//! result sets cross the HTTP boundary.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team. Axum performs well in [various](https://github.com/programatik29/rust-web-benchmarks/blob/master/result/hello-world.md) [benchmarks](https://web-frameworks-benchmark.netlify.app/result?l=rust)
//!   and is built on top of various popular components, including the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response data.
//! * [Rusqlite](rusqlite) embeds the SQLite database that holds the sample records.
//! * [time] parses and formats the test dates that drive range filtering.
//! * [Argon2](argon2) hashes account passwords.

pub mod aggregate;
pub mod app;
pub mod app_state;
pub mod auth;
pub mod cli;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod server;
pub mod shape;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_json;
