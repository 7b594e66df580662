use clap::Parser;
use cli3_core::storage::config::Config;

mod cli;

use cli::dispatcher::Dispatcher;
use cli::main_types::Cli;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config_dir.as_deref().map(Config::config_file_in);

    let file_config = match Config::load(config_path.clone()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading config: {}", err);
            std::process::exit(1);
        }
    };

    let dispatcher = match Dispatcher::new(file_config, config_path, &cli) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            eprintln!("{}: {}", err.severity().label(), err.display_friendly());
            std::process::exit(1);
        }
    };

    if let Err(e) = dispatcher.dispatch(cli.command).await {
        eprintln!("{}: {}", e.severity().label(), e.display_friendly());
        if let Some(hint) = e.troubleshooting_hint() {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}
