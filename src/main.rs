//! This file defines the samplestat binary entry point.

use samplestat::app;
use samplestat::app_state::{AppState, SharedAppState};
use samplestat::cli;
use samplestat::metrics;
use samplestat::server;
use samplestat::tracing;

use std::process::exit;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    println!("{:?}", args);
    tracing::init_tracing();
    metrics::register_metrics();
    let state = match AppState::new(&args) {
        Ok(state) => SharedAppState::new(state),
        Err(error) => {
            println!("failed to open sample store at '{}': {}", args.db_path, error);
            exit(1)
        }
    };
    let service = app::service(state);
    server::serve(&args, service).await;
}
