use anyhow::{Context, Result};
use clap::Parser;
use commission_common::config::VERSION;
use commission_daemon::{
    core::{config::Config, storage::SledStorage, Engine},
    rpc::RpcServer,
};
use log::info;
use std::{
    fs::File,
    io::Write,
    path::Path,
    sync::Arc,
};

#[tokio::main]
async fn main() -> Result<()> {
    let mut config: Config = Config::parse();
    if let Some(path) = config.config_file.as_ref() {
        if config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {}", path);
                return Ok(());
            }

            let mut file = File::create(path).context("Error while creating config file")?;
            let json = serde_json::to_string_pretty(&config)
                .context("Error while serializing config file")?;
            file.write_all(json.as_bytes())
                .context("Error while writing config file")?;
            println!("Config file template generated at {}", path);
            return Ok(());
        }

        let file = File::open(path).context("Error while opening config file")?;
        config = serde_json::from_reader(file).context("Error while reading config file")?;
    } else if config.generate_config_template {
        eprintln!(
            "Provided config file path is required to generate the template with --config-file"
        );
        return Ok(());
    }

    // RUST_LOG takes precedence over --log-level
    env_logger::Builder::new()
        .filter_level(config.log_level.into())
        .parse_default_env()
        .init();

    info!("Commission engine v{}", VERSION);
    if log::log_enabled!(log::Level::Info) {
        info!("Opening database at {}", config.db_path);
    }
    let storage = SledStorage::new(&config.db_path)
        .with_context(|| format!("Error while opening database at {}", config.db_path))?;
    let engine = Arc::new(Engine::new(storage, config.engine));

    let server = RpcServer::new(Arc::clone(&engine), config.rpc, config.prometheus).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Error while waiting for shutdown signal")?;
    info!("Shutdown signal received");

    server.stop().await;
    engine.stop().await.context("Error while stopping engine")?;
    Ok(())
}
