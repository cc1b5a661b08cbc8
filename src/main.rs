//! # LaTeX Compile Server - Entry Point
//! src/main.rs

use latex_server::config::Config;
use latex_server::logging;
use latex_server::server::Server;
use tracing::{error, info};

fn main() {
    let config = Config::new();
    logging::init(&config.log_level);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    }

    info!("LaTeX compile server v{}", env!("CARGO_PKG_VERSION"));
    config.print_summary();

    let mut server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Failed to start compile worker");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        error!(error = %e, "Fatal server error");
        std::process::exit(1);
    }
}
