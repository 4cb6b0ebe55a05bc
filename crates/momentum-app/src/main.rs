use momentum_app::AppState;
use momentum_infrastructure::EngagementConfig;

/// `momentum` runs the engine with its daily sweep until Ctrl-C.
/// `momentum sweep` runs a single sweep and prints the snapshot.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = std::env::args().nth(1);
    let sweep_once = match mode.as_deref() {
        None | Some("serve") => false,
        Some("sweep") => true,
        Some(other) => anyhow::bail!("Unknown command '{}', expected 'serve' or 'sweep'", other),
    };

    let config = EngagementConfig::load()?;

    match momentum_infrastructure::logging::init_logger(config.log_dir.clone(), &config.log_level)
    {
        Ok(_) => {
            tracing::info!("🚀 Momentum starting...");
            tracing::info!("📝 File logging initialized at: {}", config.log_dir.display());
        }
        Err(e) => {
            eprintln!("⚠️  Failed to initialize file logging: {}", e);
            eprintln!("   Falling back to console logging only");

            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .try_init();
        }
    }

    let config = if sweep_once {
        config.with_sweep_enabled(false)
    } else {
        config
    };

    tracing::info!("🚀 Starting app state initialization...");
    let state = match AppState::new(config).await {
        Ok(state) => {
            tracing::info!("✅ App state initialized successfully");
            state
        }
        Err(e) => {
            tracing::error!("❌ Failed to initialize app state: {:#}", e);
            return Err(e);
        }
    };

    if sweep_once {
        let report = state.sweep.job().run_once().await;
        match &report.snapshot {
            Some(snapshot) => println!("{}", serde_json::to_string_pretty(snapshot)?),
            None => eprintln!("Sweep finished without a snapshot, see the log for details"),
        }
    } else {
        tracing::info!("Engine running, press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        tracing::info!("🛑 Shutdown requested");
    }

    state.shutdown().await;
    tracing::info!("👋 Momentum stopped");
    Ok(())
}
