// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! VoterOS - realtime messaging sync for election campaign teams.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use voteros_config::VoterosConfig;

/// VoterOS - realtime messaging sync for election campaign teams.
#[derive(Parser, Debug)]
#[command(name = "voteros", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the message suggestion function.
    Serve,
    /// Keep the entity caches in sync with the backend and log changes.
    Watch {
        /// Load every cache once, print a summary, and exit.
        #[arg(long)]
        once: bool,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => voteros_config::load_and_validate_path(path),
        None => voteros_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            voteros_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => {
            init_tracing(&config.app.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Watch { once }) => {
            init_tracing(&config.app.log_level);
            watch::run_watch(config, once).await
        }
        Some(Commands::Config) => {
            return match render_config(&config) {
                Ok(text) => {
                    print!("{text}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    ExitCode::FAILURE
                }
            };
        }
        None => {
            println!("voteros: use --help for available commands");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("voteros={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Renders the configuration as TOML with the API key redacted.
fn render_config(config: &VoterosConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.backend.api_key.is_some() {
        shown.backend.api_key = Some("[redacted]".to_string());
    }
    toml::to_string_pretty(&shown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn watch_once_and_config_path_parse() {
        let cli = Cli::try_parse_from(["voteros", "watch", "--once", "--config", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Watch { once: true })));
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn rendered_config_hides_api_key() {
        let config = voteros_config::load_and_validate_str(
            r#"
[backend]
url = "https://abc.supabase.co"
api_key = "super-secret"
"#,
        )
        .unwrap();

        let text = render_config(&config).unwrap();
        assert!(text.contains("https://abc.supabase.co"));
        assert!(text.contains("[redacted]"));
        assert!(!text.contains("super-secret"));
    }

    #[test]
    fn rendered_defaults_parse_back() {
        let text = render_config(&VoterosConfig::default()).unwrap();
        let config = voteros_config::load_and_validate_str(&text).unwrap();
        assert_eq!(config.app.name, "voteros");
        assert_eq!(config.functions.port, 54321);
    }
}
