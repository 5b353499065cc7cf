use dotenvy::dotenv;
use log::info;
use order_etl_service::{cli::handle_command_line_args, config::EtlConfig, service::run_service};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = EtlConfig::from_env_or_default();

    info!("🚀️ Starting order ETL service on {}", config.data_dir.display());
    match run_service(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
