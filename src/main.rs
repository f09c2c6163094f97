//! Purpose: `noticeboard` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs one notification cycle, emits JSON on stdout.
//! Invariants: One invocation is one processing cycle; runtime messages do not outlive it.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use noticeboard::api::{Collection, Error, FsBlobStore, Kind, NotificationService, to_exit_code};
use noticeboard::store_paths::{default_store_dir, default_user};

#[derive(Parser)]
#[command(
    name = "noticeboard",
    version,
    about = "Flash and sticky operator notifications with per-user suppression"
)]
struct Cli {
    /// Data directory (default: ~/.noticeboard)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Acting user identity (default: $USER)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flash a one-shot message and render the resulting cycle
    Post {
        text: String,
        #[arg(long, value_enum, default_value = "notice")]
        kind: KindArg,
    },
    /// Manage the shared sticky collection
    Sticky {
        #[command(subcommand)]
        command: StickyCommand,
    },
    /// Render the message list for the acting user
    Show,
    /// Hide a message slot for the acting user
    Suppress(SuppressArgs),
    /// Reset the acting user's suppression record
    UnsuppressAll,
}

#[derive(Subcommand)]
enum StickyCommand {
    /// Add a persistent message (deduplicated by exact text)
    Add {
        text: String,
        #[arg(long, value_enum, default_value = "notice")]
        kind: KindArg,
    },
    /// Remove a persistent message by exact text
    Remove { text: String },
    /// Drop every sticky message and delete the persisted record
    Clear,
}

#[derive(Args)]
struct SuppressArgs {
    /// Slot id to suppress
    id: u64,
    /// Target a runtime slot instead of a sticky one
    #[arg(long)]
    runtime: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Notice,
    Error,
}

impl From<KindArg> for Kind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Notice => Kind::Notice,
            KindArg::Error => Kind::Error,
        }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    let dir = cli.dir.unwrap_or_else(default_store_dir);
    let user = cli.user.unwrap_or_else(default_user);

    let store = FsBlobStore::new(dir);
    let mut service = NotificationService::new(store, user);

    match cli.command {
        Command::Post { text, kind } => {
            service.flash(text, kind.into());
            emit(&json!({ "messages": service.render() }));
        }
        Command::Sticky { command } => match command {
            StickyCommand::Add { text, kind } => {
                let (slot, created) = service.sticky(text, kind.into())?;
                emit(&json!({ "slot": slot, "created": created }));
            }
            StickyCommand::Remove { text } => {
                let removed = service.clear_sticky_message(&text)?;
                emit(&json!({ "removed": removed }));
            }
            StickyCommand::Clear => {
                service.clear_sticky_messages()?;
                emit(&json!({ "cleared": true }));
            }
        },
        Command::Show => {
            emit(&json!({ "messages": service.render() }));
        }
        Command::Suppress(args) => {
            let collection = if args.runtime {
                Collection::Runtime
            } else {
                Collection::Sticky
            };
            let suppressed = service.suppress(collection, args.id)?;
            emit(&json!({ "suppressed": suppressed, "messages": service.render() }));
        }
        Command::UnsuppressAll => {
            service.clear_suppressed()?;
            emit(&json!({ "cleared": true }));
        }
    }

    Ok(())
}

fn emit(value: &serde_json::Value) {
    println!("{value}");
}

fn emit_error(err: &Error) {
    let mut error = serde_json::Map::new();
    error.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    error.insert("message".to_string(), json!(err.to_string()));
    if let Some(hint) = err.hint() {
        error.insert("hint".to_string(), json!(hint));
    }
    eprintln!("{}", json!({ "error": error }));
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
