//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// Samplestat command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "SAMPLESTAT_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "SAMPLESTAT_PORT")]
    pub port: u16,
    /// Path to the SQLite database file holding sample records and accounts.
    /// The file is created if it does not exist.
    #[arg(long, default_value = "samplestat.db", env = "SAMPLESTAT_DB_PATH")]
    pub db_path: String,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "SAMPLESTAT_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/samplestat/certs/cert.pem",
        env = "SAMPLESTAT_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/samplestat/certs/key.pem",
        env = "SAMPLESTAT_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "SAMPLESTAT_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
