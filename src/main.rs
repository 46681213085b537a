mod audio;
mod config;
mod controller;
mod logging;
mod model;
mod view;

use std::io;
use std::path::Path;
use std::sync::Arc;
use anyhow::Result;
use std::time::Duration;
use crossterm::{
    event::{self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use view::AppView;
use audio::{AudioResourceBinding, GestureBridge, PlaybackResourceBinder, StreamOutput};
use config::{Config, CONFIG_FILE};
use controller::{AppController, Backends};
use model::{AppModel, ServiceClient};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_warning) = Config::load_or_default(Path::new(CONFIG_FILE));

    if let Err(e) = logging::init_logging(&config.logging.directory) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== remaster-rs starting ===");
    if let Some(warning) = config_warning {
        tracing::warn!(file = CONFIG_FILE, reason = %warning, "Ignoring configuration file, using defaults");
    }
    tracing::info!(
        base_url = %config.server.base_url,
        channel_url = %config.server.channel_url(),
        "Configuration loaded"
    );

    let client = ServiceClient::new(&config.server)?;

    // Audio output: one handle, written only by the binder
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (output, control) = audio::split_handle(StreamOutput::new(
        client.http().clone(),
        client.base_url(),
        event_tx,
    ));
    let bridge = GestureBridge::mount(control);
    let binder = PlaybackResourceBinder::new(output);

    let (binding_tx, binding_rx) = watch::channel(AudioResourceBinding::default());
    let model = Arc::new(AppModel::new(config.enhancement.initial(), binding_rx));
    tokio::spawn(binder.run(model.subscribe_session(), event_rx, binding_tx));

    let controller = AppController::new(model.clone(), Backends::from_client(client), bridge.trigger(), &config);

    // Subscribe before the pull so a delta racing the bootstrap is not lost
    controller.start_channel_listener(config.server.channel_url());
    controller.start_player_event_listener();

    let controller_for_init = controller.clone();
    tokio::spawn(async move {
        controller_for_init.bootstrap_status().await;
        controller_for_init.load_next_library_page().await;
    });

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model.clone(), controller).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableFocusChange, DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    bridge.teardown();

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("remaster-rs shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<AppModel>,
    controller: AppController,
) -> io::Result<()> {
    loop {
        // Auto-clear old errors (after 5 seconds)
        model.auto_clear_old_errors().await;

        let playback = model.get_playback_info().await;
        let ui_state = model.get_ui_state().await;
        let content_state = model.get_content_state().await;
        let should_quit = model.should_quit().await;

        terminal.draw(|f| {
            AppView::render(f, &playback, &ui_state, &content_state);
        })?;

        // Handle input with shorter poll time for smoother UI updates
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => {
                    if let Err(e) = controller.handle_key_event(key).await {
                        tracing::error!(error = %e, "Key handling failed");
                    }
                }
                Event::Mouse(mouse) => controller.handle_mouse_event(mouse).await,
                Event::FocusGained => controller.handle_focus_gained(),
                _ => {}
            }
        }

        if should_quit {
            break;
        }
    }

    Ok(())
}
