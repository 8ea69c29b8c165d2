use clap::Parser;
use taskmd::cli::commands::Cli;
use taskmd::cli::handlers;
use taskmd::io::load_config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    taskmd::logging::init(&config.log_level);

    if let Err(e) = handlers::dispatch(cli, config).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
