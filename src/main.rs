use clap::Parser;

use tracelink::cli::{Cli, Commands};
use tracelink::config::{StaticConfig, init_config_with};
use tracelink::runtime::modes;
use tracelink::system::init_logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_with(StaticConfig::load_from(&cli.config));
    let config = tracelink::config::get_config();

    match cli.command {
        None | Some(Commands::Serve) => {
            let _guard = init_logging(&config.logging);
            if let Err(e) = modes::run_server().await {
                eprintln!("{:#}", e);
                std::process::exit(1);
            }
        }
        Some(cmd) => {
            // CLI 模式只输出警告以上的日志，避免干扰命令输出
            let mut logging = config.logging.clone();
            if std::env::var("RUST_LOG").is_err() {
                logging.level = "warn".to_string();
            }
            let _guard = init_logging(&logging);

            if let Err(e) = modes::run_cli(cmd).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
        }
    }
}
