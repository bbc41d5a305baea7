use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};

mod card;
mod controller;
mod dataset;
mod domain;
mod engine;
mod filter_panel;
mod inputter;
mod logging;
mod model;
mod ui;

use controller::Controller;
use dataset::Dataset;
use domain::{DirectoryConfig, DirectoryError};
use model::{Model, Status};
use ui::DirectoryUI;

/// Browse airline staff travel policies in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Dataset to load (json, csv, parquet or arrow)
    #[arg(default_value = "data/airlines.json")]
    path: String,

    /// How long to wait for terminal events, in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Column holding the airline name
    #[arg(long)]
    name_field: Option<String>,

    /// Column holding the reference link
    #[arg(long)]
    link_field: Option<String>,

    /// Write log records to this file
    #[arg(long)]
    log_file: Option<String>,

    /// Increase log verbosity, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn config(&self) -> DirectoryConfig {
        let mut cfg = DirectoryConfig::default().event_poll_time(self.poll_ms);
        if let Some(name_field) = &self.name_field {
            cfg = cfg.name_field(name_field);
        }
        if let Some(link_field) = &self.link_field {
            cfg = cfg.link_field(link_field);
        }
        cfg
    }
}

fn expand_path(path: &str) -> Result<PathBuf, DirectoryError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| DirectoryError::LoadingFailed(format!("cannot expand {path}: {e}")))
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            error!("{e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args) -> Result<(), DirectoryError> {
    let log_file = args.log_file.as_deref().map(expand_path).transpose()?;
    logging::init_logging(log_file.as_deref(), args.verbose)?;

    let cfg = args.config();
    info!("Starting with {:?}", cfg);

    // Load before taking over the terminal so errors are printed normally
    let dataset = Dataset::load(expand_path(&args.path)?, &cfg)?;

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &cfg, dataset);
    ratatui::restore();
    info!("Bye");
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    cfg: &DirectoryConfig,
    dataset: Dataset,
) -> Result<(), DirectoryError> {
    let size = terminal.size()?;
    let mut model = Model::init(cfg, dataset, size.width as usize, size.height as usize)?;
    let mut ui = DirectoryUI::new();
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_build_config() {
        let args = Args::parse_from([
            "stafftravel",
            "airlines.csv",
            "--poll-ms",
            "20",
            "--name-field",
            "carrier",
            "-vv",
        ]);
        assert_eq!(args.path, "airlines.csv");
        assert_eq!(args.verbose, 2);

        let cfg = args.config();
        assert_eq!(cfg.event_poll_time, 20);
        assert_eq!(cfg.name_field, "carrier");
        assert_eq!(cfg.link_field, "url");
    }

    #[test]
    fn default_dataset_path() {
        let args = Args::parse_from(["stafftravel"]);
        assert_eq!(args.path, "data/airlines.json");
        assert_eq!(args.poll_ms, 100);
    }

    #[test]
    fn bundled_dataset_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/airlines.json");
        let ds = Dataset::load(path, &DirectoryConfig::default()).unwrap();
        assert_eq!(ds.len(), 10);
        assert!(ds.fields().iter().any(|f| f == "baggage"));
        assert!(!ds.fields().iter().any(|f| f == "url" || f == "airline_name"));
    }

    #[test]
    fn plain_paths_are_unchanged() {
        assert_eq!(
            expand_path("data/airlines.json").unwrap(),
            PathBuf::from("data/airlines.json")
        );
    }
}
