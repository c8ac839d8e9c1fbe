use clap::Parser;
use log::{error, info};
use ssh_guard::configuration::{Args, Config};
use ssh_guard::controller::Controller;

#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    info!("ssh-guard v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Configuration loaded: interface {}, port {}, flush every {}s",
        config.interface_tracked, config.ssh_listen_port, config.interval_rate_seconds
    );

    let controller = Controller::new(config);
    if let Err(e) = controller.run().await {
        error!("Error occurred in the controller: {}, exiting...", e);
        std::process::exit(1);
    }

    info!("ssh-guard stopped");
}
