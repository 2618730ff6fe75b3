//! CollabBoard relay server.
//!
//! Reads `.env`, then command-line flags with `COLLABBOARD_*` environment
//! fallbacks. Logging follows `RUST_LOG` (default `info`).

mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use collabboard_collab::{BoardServer, BoardStore, StoreConfig};
use collabboard_core::validate_room_id;
use log::info;

use config::{Cli, Command, ServeArgs, StoreArgs};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Rooms { store } => list_rooms(&store),
        Command::Dump { room, store } => dump_board(&store, &room),
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let server = BoardServer::new(args.server_config()).context("Failed to open board store")?;

    match server.store() {
        Some(store) => info!("Persisting boards in {}", store.path().display()),
        None => log::warn!("Persistence disabled, running as relay only"),
    }
    if server.config().allowed_origins.is_empty() {
        log::warn!("No allowed origins configured, accepting any browser origin");
    }

    tokio::select! {
        result = server.run() => result.context("Relay server stopped")?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    if let Some(store) = server.store() {
        store.sync().context("Failed to flush board store")?;
    }
    Ok(())
}

fn open_existing(args: &StoreArgs) -> Result<BoardStore> {
    if !args.data_dir.exists() {
        bail!("No board database at {}", args.data_dir.display());
    }
    BoardStore::open(StoreConfig::read_only_at(args.data_dir.clone()))
        .with_context(|| format!("Failed to open {}", args.data_dir.display()))
}

fn list_rooms(args: &StoreArgs) -> Result<()> {
    let store = open_existing(args)?;
    for room in store.list_boards()? {
        let meta = store.load_metadata(&room)?;
        println!("{room}\t{} actions\t{} clears", meta.action_count, meta.clear_count);
    }
    Ok(())
}

fn dump_board(args: &StoreArgs, room: &str) -> Result<()> {
    validate_room_id(room)?;
    let store = open_existing(args)?;
    let Some(board) = store.load_board(room)? else {
        bail!("No board for room {room}");
    };
    println!("{}", serde_json::to_string_pretty(&board)?);
    Ok(())
}
