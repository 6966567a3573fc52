//! 🚀 kvmigrate-cli: the front door, the bouncer, the maitre d' of kvmigrate.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config,
//! sets up logging, and then lets the real code do the heavy lifting.
//! Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🚚 Copy documents between search clusters and dump files.
#[derive(Debug, Parser)]
#[command(name = "kvmigrate", version, about)]
struct Cli {
    /// 🔧 TOML config file. Missing file means environment variables (KVM_*) only.
    #[arg(default_value = "kvmigrate.toml")]
    config: PathBuf,
}

/// 🚀 main(): where it all begins. The "I pressed F5 and held my breath" moment.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args
/// 3. Load config (the moment of truth)
/// 4. Run the thing (send it and pray 🙏)
/// 5. Handle errors (cry)
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // 🔒 Check the config file exists before we get too emotionally attached
    let config_file = cli.config.as_path();
    let config_file_if_it_exists = match config_file.try_exists().context(format!(
        "💀 Couldn't tell whether the configuration file exists. Maybe it's a permissions thing, \
         maybe it's a pwd/cwd thing. Use an absolute path to be absolutely certain. Was checking here: '{}'",
        config_file.display()
    ))? {
        true => Some(config_file),
        // 💤 Not there. Env vars it is.
        false => None,
    };

    // 🔧 Load the config: this is where we find out if someone put a tab where a space should be
    let app_config = kvmigrate::app_config::load_config(config_file_if_it_exists).context(
        "💀 In kvmigrate-cli, main, we couldn't load the configuration. Take a look at the file \
         and the KVM_* environment variables, make sure you didn't forget something obvious.",
    )?;

    // 🚀 SEND IT. No take-backs. This is not a drill.
    match kvmigrate::run(app_config).await {
        Ok(summary) => {
            println!("{}", summary);
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion of sadness, one tear-jerking layer at a time
            let mut the_vibes_are_giving_connection_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("error sending request")
                    || cause_str.contains("connection refused")
                    || cause_str.contains("Connection refused")
                    || cause_str.contains("tcp connect error")
                    || cause_str.contains("dns error")
                    || cause_str.contains("never made it to the cluster")
                {
                    the_vibes_are_giving_connection_issues = true;
                }
            }

            // -- 📡 if it smells like a connection problem, it's probably a connection problem
            if the_vibes_are_giving_connection_issues {
                error!(
                    "🔧 hint: looks like a cluster isn't reachable. \
                    Double-check the `url` in your source/sink config and that Elasticsearch \
                    is actually running. If you're using Docker, try `docker ps` to see what's up, \
                    or `docker compose up -d` to resurrect it. Even servers need a nudge sometimes. ☕"
                );
            }

            // 🗑️ Exit with prejudice. Process exitus maximus.
            std::process::exit(1);
        }
    }
}
