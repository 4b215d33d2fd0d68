pub mod auth;
pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod explore;
pub mod filter;
pub mod openapi;
pub mod server;
pub mod stats;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    auth::LocalIdentityProvider,
    cli::{Cli, Commands},
    dataset::SalesTable,
    server::AppState,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_api", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => handle_serve(&args),
        Commands::Probe(args) => explore::probe(&args),
        Commands::Search(args) => explore::search(&args),
        Commands::Totals(args) => explore::totals(&args),
        Commands::HashPassword(args) => {
            println!("{}", auth::hash_password(&args.password));
            Ok(())
        }
    }
}

fn handle_serve(args: &cli::ServeArgs) -> Result<()> {
    let mut settings = args.data.settings()?;
    if let Some(bind) = &args.bind {
        settings.server.bind = bind.clone();
    }
    let identity = LocalIdentityProvider::from_settings(&settings.auth)
        .context("Configuring sign-in")?;
    if identity.user_count() == 0 {
        warn!("No users configured; every sign-in will be rejected");
    }
    let table = SalesTable::load(
        &settings.data.directory,
        &settings.data.pattern,
        settings.data.allow_empty,
    )
    .with_context(|| format!("Loading snapshots from {:?}", settings.data.directory))?;
    info!(
        "{} user(s) configured; token lifetime {}s",
        identity.user_count(),
        settings.auth.token_ttl_secs
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Starting async runtime")?;
    runtime.block_on(server::serve(
        AppState::new(table, identity),
        &settings.server.bind,
    ))
}
