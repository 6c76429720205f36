use clap::Parser;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use infradash::config::{Args, DashConfig};
use infradash::controller::Controller;
use infradash::domain::DashError;
use infradash::model::{Model, Status};
use infradash::ui;

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), DashError> {
    let cfg = DashConfig::from_args(args)?;
    init_logging(&cfg.log_file)?;
    info!("Starting infradash against {}", cfg.endpoint_url);

    let runtime = tokio::runtime::Runtime::new()?;
    let controller = Controller::new(&cfg, runtime.handle().clone());

    let mut terminal = ratatui::init();
    let result = event_loop(&cfg, &controller, &mut terminal);
    ratatui::restore();
    result
}

fn event_loop(
    cfg: &DashConfig,
    controller: &Controller,
    terminal: &mut DefaultTerminal,
) -> Result<(), DashError> {
    let size = terminal.size()?;
    let mut model = Model::init(cfg, size.width as usize, size.height as usize);

    while model.status != Status::Quitting {
        for effect in model.take_effects() {
            controller.dispatch(effect);
        }

        // Render the current view
        terminal.draw(|f| ui::draw(&model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        };
    }
    info!("Quitting infradash");
    Ok(())
}

// Logs go to a file, the terminal belongs to the ui.
fn init_logging(path: &Path) -> Result<(), DashError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| DashError::Logging(e.to_string()))
}
