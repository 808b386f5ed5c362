use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod domain;
mod inputter;
mod loader;
mod mail;
mod model;
mod table;
mod template;
mod ui;

use controller::Controller;
use domain::{AppConfig, AppError, Message};
use model::{Model, Status};
use ui::TableUI;

/// Mail merge for the terminal: personalise a template for every row of a table.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Table to load (CSV or XLSX)
    data: Option<String>,

    /// Template to load (MD or TXT)
    #[arg(short, long)]
    template: Option<String>,

    /// Subject of the mails, overrides a subject line in the template
    #[arg(short, long)]
    subject: Option<String>,

    /// Directory for exports and the outbox
    #[arg(short, long, default_value = ".")]
    out_dir: String,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Maximum rendered width of a table column
    #[arg(long, default_value_t = 30)]
    max_column_width: usize,

    /// Log file, the terminal belongs to the ui
    #[arg(long, default_value = "bulkmail.log")]
    log_file: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn expand(path: &str) -> Result<PathBuf, AppError> {
    let expanded = shellexpand::full(path).map_err(|e| AppError::LoadingFailed(e.to_string()))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

impl Args {
    fn to_config(&self) -> Result<AppConfig, AppError> {
        let mut config = AppConfig::default()
            .event_poll_time(self.poll_ms)
            .max_column_width(self.max_column_width)
            .out_dir(expand(&self.out_dir)?);
        if let Some(data) = &self.data {
            config = config.data_file(expand(data)?);
        }
        if let Some(template) = &self.template {
            config = config.template_file(expand(template)?);
        }
        if let Some(subject) = &self.subject {
            config = config.subject(subject.clone());
        }
        Ok(config)
    }
}

fn init_logging(args: &Args) -> Result<(), AppError> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(expand(&args.log_file)?)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match init_logging(&args).and_then(|_| run(&args)) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    let cfg = args.to_config()?;
    info!("Starting bulkmail with {:?}", cfg);

    // Files given on the command line are loaded before the terminal is taken over
    // so that errors end up on stderr.
    let mut model = Model::new(&cfg, 0, 0);
    if let Some(path) = &cfg.data_file {
        model.open(path.clone())?;
    }
    if let Some(path) = &cfg.template_file {
        model.open(path.clone())?;
    }
    if let Some(subject) = &cfg.subject {
        model.set_subject(subject);
    }

    let ui = TableUI::new();
    let controller = Controller::new(&cfg);
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &ui, &controller);
    ratatui::restore();
    result?;

    info!("Quitting bulkmail");
    Ok(())
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &TableUI,
    controller: &Controller,
) -> Result<(), AppError> {
    let size = terminal.size()?;
    model.update(Some(Message::Resize(size.width as usize, size.height as usize)));

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(model)? {
            model.update(Some(message));
        };
    }
    Ok(())
}
