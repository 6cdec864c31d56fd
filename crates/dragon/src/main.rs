// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dragon Bridge - spaced-repetition review for Chinese and Vietnamese learners.
//!
//! This is the binary entry point. Every invocation loads configuration,
//! resolves a storage backend, hydrates the scheduling engine for the current
//! profile, runs one command and flushes pending writes before exiting.

mod app;
mod doctor;
mod output;
mod profile;
mod review;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dragon_config::DragonConfig;
use dragon_core::DragonError;

use crate::app::App;

/// Dragon Bridge - spaced-repetition review from the command line.
#[derive(Parser, Debug)]
#[command(name = "dragon", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Add an item to the review deck.
    Add {
        /// The word, phrase or character to learn.
        text: String,
        /// Item type: word, phrase or character.
        #[arg(long = "type", short = 't', default_value = "word")]
        item_type: String,
        /// Starting box (clamped to 1..=5).
        #[arg(long = "box")]
        initial_box: Option<i64>,
    },
    /// Grade a review attempt.
    Grade {
        /// Item key (`word:你好`) or bare text of a word.
        key: String,
        /// again, hard, good or easy.
        grade: String,
    },
    /// Remove an item and its history.
    Remove {
        /// Item key (`word:你好`) or bare text of a word.
        key: String,
    },
    /// Show items due for review now.
    Due {
        /// Show at most this many items.
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Show every item, oldest first.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show deck statistics.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Show or clear the activity log of the current profile.
    Events {
        /// Delete the activity log instead of printing it.
        #[arg(long)]
        clear: bool,
        #[arg(long)]
        json: bool,
    },
    /// Manage learner profiles.
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// Read or write a setting of the current profile.
    Setting {
        #[command(subcommand)]
        action: SettingCommands,
    },
    /// Run diagnostic checks on the environment.
    Doctor,
}

#[derive(Subcommand, Debug)]
enum ProfileCommands {
    /// List saved profiles.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Create a profile. It does not become current.
    Create {
        name: String,
        /// male, female or child.
        #[arg(long, default_value = "male")]
        avatar: String,
    },
    /// Make a profile current.
    Switch {
        /// Profile id or name.
        profile: String,
        /// PIN for a locked profile.
        #[arg(long)]
        pin: Option<String>,
    },
    /// Lock a profile behind a PIN.
    Pin { profile: String, pin: String },
    /// Remove a profile's PIN lock.
    Unpin {
        profile: String,
        /// Current PIN, required to unlock.
        #[arg(long)]
        pin: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SettingCommands {
    Get { key: String },
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            dragon_config::render_errors(&errors);
            std::process::exit(2);
        }
    };
    init_tracing(&config.app.log_level);

    let use_color = output::use_color(cli.plain);
    let mut stdout = std::io::stdout().lock();

    let result = match cli.command {
        Commands::Doctor => {
            doctor::run_doctor(&config, cli.config.as_deref(), use_color, &mut stdout).await
        }
        command => run_command(&config, command, use_color, &mut stdout).await,
    };

    if let Err(e) = result {
        let _ = stdout.flush();
        output::print_error(&e, use_color);
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<DragonConfig, Vec<dragon_config::ConfigError>> {
    match path {
        Some(path) => dragon_config::load_and_validate_path(path),
        None => dragon_config::load_and_validate(),
    }
}

/// Install the fmt subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dragon={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_command(
    config: &DragonConfig,
    command: Commands,
    use_color: bool,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    let app = App::open(config).await?;
    let result = dispatch(&app, command, use_color, out).await;
    app.shutdown().await?;
    result
}

async fn dispatch(
    app: &App,
    command: Commands,
    use_color: bool,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    match command {
        Commands::Add {
            text,
            item_type,
            initial_box,
        } => review::add(app, &text, &item_type, initial_box, out),
        Commands::Grade { key, grade } => review::grade(app, &key, &grade, use_color, out),
        Commands::Remove { key } => review::remove(app, &key, out),
        Commands::Due { limit, json } => review::due(app, limit, json, use_color, out),
        Commands::List { json } => review::list(app, json, out),
        Commands::Stats { json } => review::stats(app, json, out),
        Commands::Events { clear, json } => review::events(app, clear, json, out).await,
        Commands::Profile { action } => match action {
            ProfileCommands::List { json } => profile::list(app, json, use_color, out).await,
            ProfileCommands::Create { name, avatar } => {
                profile::create(app, &name, &avatar, out).await
            }
            ProfileCommands::Switch { profile, pin } => {
                profile::switch(app, &profile, pin.as_deref(), out).await
            }
            ProfileCommands::Pin { profile, pin } => profile::set_pin(app, &profile, &pin, out).await,
            ProfileCommands::Unpin { profile, pin } => {
                profile::clear_pin(app, &profile, pin.as_deref(), out).await
            }
        },
        Commands::Setting { action } => match action {
            SettingCommands::Get { key } => profile::setting_get(app, &key, out).await,
            SettingCommands::Set { key, value } => {
                profile::setting_set(app, &key, &value, out).await
            }
        },
        Commands::Doctor => Ok(()),
    }
}
