use clap::Parser;

/// Command-line surface for `strata-serverd`.
#[derive(Debug, Parser)]
#[command(name = "strata-serverd", about = "Time-series ingest server")]
pub struct Cli {
    /// Address to bind the ingest listener to.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port to bind the ingest listener to.
    #[arg(long, default_value_t = 12345)]
    pub port: u16,

    /// Increase log verbosity; repeatable (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The `tracing_subscriber` filter directive implied by `--verbose`'s
    /// repeat count: 0 is warnings and above, scaling up to trace at 3+.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Resolved server configuration, built from the parsed [`Cli`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl From<&Cli> for ServerConfig {
    fn from(cli: &Cli) -> Self {
        ServerConfig {
            host: cli.host.clone(),
            port: cli.port,
        }
    }
}
