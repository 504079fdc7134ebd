//! # Geodash - Derived Geometry Suggestions
//!
//! The main binary for Geodash.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            apps/geodash (THE BINARY)         │
//! │                                              │
//! │  ┌─────────────┐        ┌────────────────┐   │
//! │  │   CLI       │        │  geodash.toml  │   │
//! │  │  (clap)     │        │    (toml)      │   │
//! │  └──────┬──────┘        └───────┬────────┘   │
//! │         └───────────┬───────────┘            │
//! │                     ▼                        │
//! │             ┌───────────────┐                │
//! │             │ geodash-core  │                │
//! │             │ (THE ENGINE)  │                │
//! │             └───────────────┘                │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! geodash init
//! geodash run -f map.json --view all-layers
//! geodash snap -f map.json -x 120 -y 64
//! geodash generators
//! ```

use clap::Parser;
use geodash::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // GEODASH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GEODASH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "geodash=debug"
    } else {
        "geodash=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Geodash startup banner.
fn print_banner() {
    println!(
        r#"
   ___  ___  ___  ___   _   ___ _  _
  / __|| __|/ _ \|   \ /_\ / __| || |
 | (_ || _|| (_) | |) / _ \\__ \ __ |
  \___||___|\___/|___/_/ \_\___/_||_|

  Derived Geometry Suggestions v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
