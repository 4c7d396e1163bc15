// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Linewise - real-time queue coordination.
//!
//! This is the binary entry point for the Linewise service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use linewise_config::{ConfigError, LinewiseConfig};

/// Linewise - real-time queue coordination.
#[derive(Parser, Debug)]
#[command(name = "linewise", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the queue service.
    Serve,
    /// Print the effective configuration as TOML.
    Config,
}

fn load(path: Option<&PathBuf>) -> Result<LinewiseConfig, Vec<ConfigError>> {
    match path {
        Some(path) => linewise_config::load_and_validate_path(path),
        None => linewise_config::load_and_validate(),
    }
}

/// Render the effective configuration.
fn render_config(config: &LinewiseConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            linewise_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("linewise: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match render_config(&config) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("linewise: failed to render config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("linewise: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

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
    fn rendered_config_loads_back() {
        let config = linewise_config::load_and_validate_str("").unwrap();
        let rendered = render_config(&config).unwrap();
        let reloaded = linewise_config::load_and_validate_str(&rendered).unwrap();
        assert_eq!(reloaded.server.port, config.server.port);
        assert_eq!(reloaded.hub.outbound_capacity, 10);
        assert_eq!(reloaded.queue.store_timeout_ms, 3000);
    }

    #[test]
    #[serial]
    fn explicit_path_still_honours_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linewise.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();

        let from_file = load(Some(&path)).unwrap();
        assert_eq!(from_file.server.port, 9100);

        // SAFETY: serialized with every other env-touching test.
        unsafe { std::env::set_var("LINEWISE_SERVER_PORT", "9200") };
        let overridden = load(Some(&path));
        unsafe { std::env::remove_var("LINEWISE_SERVER_PORT") };
        assert_eq!(overridden.unwrap().server.port, 9200);
    }
}
