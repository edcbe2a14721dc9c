use std::fs::OpenOptions;

use anyhow::{Context, Result};

use pmux::shared::Config;
use pmux::tui::{Multiplexer, TerminalSurface};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();
    init_logging(&config)?;

    // Setup terminal; restored when the multiplexer (and its surface) drops
    let surface = TerminalSurface::new().context("failed to initialise terminal")?;
    let spawner = config.backend.spawner(&config.shell);
    let mut mux = Multiplexer::new(surface, spawner, &config);

    for pane in &config.panes {
        mux.create_pane(pane.rect.rows, pane.rect.cols, pane.rect.start_row, pane.rect.start_col);
    }
    for (index, pane) in config.panes.iter().enumerate() {
        if let Some(command) = &pane.command {
            mux.switch_active_pane(index)?;
            mux.start_active_pane(command)
                .with_context(|| format!("failed to start `{}`", command))?;
        }
    }

    // Ctrl-C arrives as a key while raw; this covers SIGINT from outside
    let interrupt = mux.interrupt_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.raise();
        }
    });

    // Run app
    tokio::task::spawn_blocking(move || mux.run())
        .await
        .context("multiplexer thread panicked")??;

    log::info!("bye");
    Ok(())
}

/// Log to the configured file only; stderr belongs to the screen
fn init_logging(config: &Config) -> Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    log::info!("pmux starting with {:?} backend, {:?} layout", config.backend, config.layout);
    Ok(())
}
