//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use collabboard_collab::ServerConfig;

pub const DEFAULT_DATA_DIR: &str = "collabboard_data";

#[derive(Parser, Debug)]
#[command(
    name = "collabboard",
    version,
    about = "Real-time collaborative drawing board relay"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebSocket relay
    Serve(ServeArgs),

    /// List persisted rooms
    Rooms {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print a room's board as JSON
    Dump {
        /// Room id
        #[arg(long)]
        room: String,

        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Board database directory
    #[arg(
        long,
        env = "COLLABBOARD_DATA_DIR",
        default_value = DEFAULT_DATA_DIR,
        value_name = "DIR"
    )]
    pub data_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "COLLABBOARD_BIND", default_value = "0.0.0.0:5001", value_name = "ADDR")]
    pub bind: String,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Relay only, keep no history
    #[arg(long)]
    pub no_persist: bool,

    /// Browser origin allowed to connect (repeatable, "*" for any)
    #[arg(
        long = "allowed-origin",
        env = "COLLABBOARD_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000",
        value_name = "URL"
    )]
    pub allowed_origins: Vec<String>,

    /// Frames buffered per room before slow members lag
    #[arg(
        long,
        env = "COLLABBOARD_BROADCAST_CAPACITY",
        default_value_t = 256,
        value_parser = parse_capacity
    )]
    pub broadcast_capacity: usize,
}

impl ServeArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind.clone(),
            broadcast_capacity: self.broadcast_capacity,
            allowed_origins: self
                .allowed_origins
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            storage_path: (!self.no_persist).then(|| self.store.data_dir.clone()),
            ..ServerConfig::default()
        }
    }
}

fn parse_capacity(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("capacity must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
