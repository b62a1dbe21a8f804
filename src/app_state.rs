use crate::cli::CommandLineArgs;
use crate::error::AnalyticsError;
use crate::store::SampleStore;

use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Sample store.
    pub store: SampleStore,
}

impl AppState {
    /// Create and return an [AppState], opening the sample store named by the
    /// command line arguments.
    pub fn new(args: &CommandLineArgs) -> Result<Self, AnalyticsError> {
        let store = SampleStore::new(&args.db_path)?;
        Ok(Self { store })
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
