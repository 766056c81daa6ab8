mod action;
mod app;
mod app_state;
mod component;
mod components;
mod player;
mod recorder;
mod theme;
mod widgets;
mod workspace;

use podcraft_client::{platform, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("podcraft.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("podcraft log: {}", log_path.display());
    tracing::info!("podcraft starting…");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("config: falling back to defaults: {}", e);
            Config::default()
        }
    };
    tracing::info!("backend: {}", config.server.base_url);

    let app = app::App::new(config, log_path)?;
    app.run().await?;

    Ok(())
}
