#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI printing mailbox query results as JSON envelopes

use clap::{Parser, Subcommand};
use imap_envelope::{AccountConfig, Envelope, MailResult, MailboxSession};
use serde::Serialize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailjson")]
#[command(about = "Query an IMAP mailbox and print {status, data} JSON envelopes")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Indent the JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and report the account address
    Connect,

    /// List folders with their status counters
    Folders,

    /// List message header overviews
    Messages {
        /// Folder to list from
        #[arg(long, default_value = "INBOX")]
        folder: String,

        /// First sequence number (1-based)
        #[arg(long, default_value = "1")]
        start: u32,

        /// Maximum number of overviews
        #[arg(long, default_value = "20")]
        max: u32,
    },

    /// Print the body of a message by UID
    Read {
        /// Message UID
        uid: u32,

        /// Folder containing the message
        #[arg(long, default_value = "INBOX")]
        folder: String,
    },

    /// Check that the server answers
    Ping,

    /// Show quota usage for a folder
    Quota {
        #[arg(long, default_value = "INBOX")]
        folder: String,
    },

    /// Show message and recent counts of a folder
    Check {
        #[arg(long, default_value = "INBOX")]
        folder: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let account = AccountConfig::from_env()?;
    let mut session = MailboxSession::new(&account.email, &account.password, account.options);

    let ok = match &args.command {
        Command::Connect => emit(&args, session.connect().await)?,
        Command::Folders => emit(&args, session.get_folders().await)?,
        Command::Messages { folder, start, max } => {
            emit(&args, session.get_messages(folder, *start, *max).await)?
        }
        Command::Read { uid, folder } => emit(&args, session.read_message(folder, *uid).await)?,
        Command::Ping => emit(&args, session.ping().await)?,
        Command::Quota { folder } => emit(&args, session.get_quota(folder).await)?,
        Command::Check { folder } => emit(&args, session.check(folder).await)?,
    };

    if session.is_connected() {
        session.disconnect().await.ok();
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Print the envelope for `result` and report whether it was OK.
fn emit<T: Serialize>(args: &Args, result: MailResult<T>) -> anyhow::Result<bool> {
    let envelope = Envelope::from(result);
    let json = if args.pretty {
        envelope.to_json_pretty()?
    } else {
        envelope.to_json()?
    };
    println!("{json}");
    Ok(envelope.is_ok())
}
