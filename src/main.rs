use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
#[cfg(feature = "profiling")]
use profiling::puffin;
#[cfg(feature = "profiling")]
use puffin_http::Server;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod replay;

/// Command line arguments.
#[derive(Parser, Debug)]
#[clap(author, about, version, max_term_width = 80)]
struct Options {
    #[clap(subcommand)]
    pub subcommands: Subcommands,
}

#[derive(Subcommand, Debug)]
pub enum Subcommands {
    /// Run a scenario file through the stacking engine.
    Replay(ReplayOptions),
}

/// Scenario replay options.
#[derive(Args, Debug)]
pub struct ReplayOptions {
    /// Path to the JSON scenario.
    pub path: PathBuf,

    /// Restrict raise-or-lower to the window's output.
    #[clap(long)]
    pub separate_screen_focus: bool,

    /// Raise windows after hovering them.
    #[clap(long)]
    pub auto_raise: bool,

    /// Auto-raise delay in milliseconds.
    #[clap(long, value_name = "MILLIS")]
    pub auto_raise_interval: Option<u64>,
}

pub fn main() {
    #[cfg(feature = "profiling")]
    let _server = {
        puffin::set_scopes_on(true);
        Server::new(&format!("0.0.0.0:{}", puffin_http::DEFAULT_PORT)).expect("profiling server")
    };

    // Setup logging.
    let directives = env::var("RUST_LOG").unwrap_or("warn,strata=info".into());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    FmtSubscriber::builder().with_env_filter(env_filter).with_line_number(true).init();

    let result = match Options::parse().subcommands {
        Subcommands::Replay(options) => replay::run(options),
    };

    if let Err(err) = result {
        eprintln!("\x1b[31merror\x1b[0m: {err}");
        process::exit(1);
    }
}

/// Log an error, ignoring success.
pub fn trace_error<T, E: Display>(result: Result<T, E>) {
    if let Err(err) = &result {
        error!("{err}");
    }
}
