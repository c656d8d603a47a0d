use std::sync::Arc;

use anyhow::Context;
use clap::{Arg, Command};
use dicearena_live_table::gateway::{router, AppState};
use dicearena_live_table::{dispatch_timers, ArenaRegistry, Config, TokioScheduler};
use tokio::runtime::Handle;
use tracing::info;

fn load_config(path: Option<&String>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read config file {path}"))?;
            Config::from_yaml(&contents).context("Could not parse config file")?
        }
        None => Config::default(),
    };
    config
        .apply_env()
        .context("Invalid environment override")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("dicearena-live-table")
        .about("Per-chat dice betting rounds over a WebSocket gateway")
        .arg(
            Arg::new("config")
                .long("config")
                .required(false)
                .help("Path to a YAML config file"),
        )
        .get_matches();

    let config = load_config(matches.get_one::<String>("config"))?
        .validate()
        .context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let (scheduler, fired) = TokioScheduler::new(Handle::current());
    let registry = Arc::new(ArenaRegistry::new(
        config.arena.clone(),
        config.allowed_chats.clone(),
        Arc::new(scheduler),
        config.event_buffer,
    ));
    tokio::spawn(dispatch_timers(fired, registry.clone(), config.die_timeout));

    let app = router(AppState { registry });

    let addr = config.listen_addr;
    info!(
        %addr,
        betting_ms = config.arena.betting_ms,
        roll_delay_ms = config.arena.roll_delay_ms,
        restricted = config.allowed_chats.is_some(),
        "dice arena listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Could not bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
