//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a [`Cli`] struct that represents the parsed command-line arguments,
//! and a [`Commands`] enum with one variant per dashboard area: asking for a
//! single reply, live chat, contacts, bot settings and the device connection.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use applemar_bot::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! if let Commands::Ask { utterance, .. } = cli.command {
//!     println!("asking: {utterance}");
//! }
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::state::SettingsUpdate;

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Path to the configuration file. Defaults to `<config_dir>/config.yaml`.
    #[arg(long, short = 'c', global = true, env = "APPLEMAR_CONFIG")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Write default configuration and state files to the config directory.
    Init,

    /// Generate one reply to a customer message.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The customer's message.
        utterance: String,

        /// Include the sample customer/assistant exchange as history.
        #[arg(long)]
        sample_history: bool,
    },

    /// Chat as a customer with the bot. Type `exit` to leave.
    #[clap(name = "chat", alias = "i")]
    Chat {
        /// Contact to open; matched like `contacts` and defaults to the first one.
        #[arg(long, short = 'n')]
        contact: Option<String>,
    },

    /// List contacts, optionally filtered by name or last message.
    Contacts {
        query: Option<String>,
    },

    /// Inspect or edit the bot persona.
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Pair the WhatsApp instance (simulated).
    Connect,

    /// Unpair the WhatsApp instance.
    Disconnect,

    /// Show connection state and active persona.
    Status,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the current persona.
    Show,

    /// Change persona fields.
    Set(SettingsArgs),

    /// Turn automatic replies on or off.
    ToggleAutoReply,
}

#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub personality: Option<String>,

    #[arg(long)]
    pub welcome_message: Option<String>,

    #[arg(long)]
    pub business_context: Option<String>,
}

impl From<SettingsArgs> for SettingsUpdate {
    fn from(args: SettingsArgs) -> Self {
        Self {
            name: args.name,
            personality: args.personality,
            welcome_message: args.welcome_message,
            business_context: args.business_context,
        }
    }
}
