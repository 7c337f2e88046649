mod app;
mod cli;
mod render;

use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        std::path::PathBuf::from(".env"),
        manifest_dir.join("..").join("..").join(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

fn main() -> ExitCode {
    // Environment is only written here, before any runtime threads exist.
    load_dotenv();

    let args = cli::parse();

    let loaded = dojo_config::load_config(args.config.as_deref().map(Path::new));

    let default_directive = loaded
        .as_ref()
        .map(|config| config.logging.directive())
        .unwrap_or_else(|_| "dojo=info".to_string());
    let log_directive = args.log_level.clone().unwrap_or(default_directive);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "dojo=info".parse().unwrap()),
            ),
        )
        .init();

    tracing::debug!("dojo v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        dojo_config::DojoConfig::default()
    });
    if let Some(url) = &args.api_url {
        config.api.base_url = url.trim_end_matches('/').to_string();
    }

    let (state, state_path) = match dojo_config::default_state_path() {
        Ok(path) => {
            let state = dojo_config::load_state_from_path(&path).unwrap_or_else(|e| {
                tracing::warn!("Client state unreadable, starting fresh: {e}");
                dojo_config::ClientState::default()
            });
            (state, Some(path))
        }
        Err(e) => {
            tracing::warn!("No location for client state: {e}");
            (dojo_config::ClientState::default(), None)
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut app = match app::App::new(config, state, state_path) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(app.run(args.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
