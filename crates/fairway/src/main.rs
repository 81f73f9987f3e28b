// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fairway - automated tee-time booking.
//!
//! This is the binary entry point: `serve` runs the booking daemon,
//! `book` submits a request, and `list`/`show`/`cancel` inspect and
//! manage existing requests.

use clap::{Parser, Subcommand};

mod book;
mod serve;
mod shutdown;
mod status;

/// Fairway - automated tee-time booking.
#[derive(Parser, Debug)]
#[command(name = "fairway", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the booking daemon.
    Serve,
    /// Submit a new booking request.
    Book {
        /// Who the booking is for.
        #[arg(long)]
        requester: String,
        /// Target date, YYYY-MM-DD.
        #[arg(long)]
        date: String,
        /// Preferred time of day, HH:MM.
        #[arg(long)]
        time: String,
    },
    /// List all booking requests.
    List,
    /// Show one request with its full history.
    Show {
        /// Request id (as printed by `list`).
        id: i64,
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Cancel a request that has not finished.
    Cancel {
        /// Request id (as printed by `list`).
        id: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match fairway_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            fairway_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Book {
            requester,
            date,
            time,
        }) => book::run_book(&config, &requester, &date, &time).await,
        Some(Commands::List) => status::run_list(&config).await,
        Some(Commands::Show { id, json }) => status::run_show(&config, id, json).await,
        Some(Commands::Cancel { id }) => status::run_cancel(&config, id).await,
        None => {
            println!("fairway: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
