use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zql_hub::config::Config;
use zql_hub::gateway::{Dispatcher, Gateway, ZqlCompiler};

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(name = "zql-hub", version, about = "ZQL conversion gateway")]
struct Args {
    /// The root directory of the website
    #[arg(short = 'd', long = "dir")]
    root_dir: Option<String>,

    /// Web port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Site IP address
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Path to config file
    #[arg(short = 'c', long, default_value = "zql-hub.toml")]
    config: PathBuf,
}

impl Args {
    /// Flags given on the command line win over the config file.
    fn apply(self, config: &mut Config) {
        if let Some(dir) = self.root_dir.filter(|d| !d.is_empty()) {
            config.server.static_root = PathBuf::from(dir);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(address) = self.address.filter(|a| !a.is_empty()) {
            config.server.address = address;
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "zql_hub=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    args.apply(&mut config);

    let dispatcher = Dispatcher::from_config(&config);
    tracing::info!(
        "Targets: {:?}, mongodb database: {:?}",
        dispatcher.targets(),
        config.mongodb.database
    );
    let gateway = Arc::new(Gateway::new(ZqlCompiler, dispatcher));

    if let Err(e) = zql_hub::server::serve(gateway, &config.server).await {
        tracing::error!("Failed to start http service: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from(["zql-hub", "-d", "/srv/www", "-p", "8080", "-a", "127.0.0.1"]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.server.static_root, PathBuf::from("/srv/www"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.address, "127.0.0.1");
    }

    #[test]
    fn test_empty_flags_keep_config() {
        let args = Args::parse_from(["zql-hub", "-d", "", "-a", ""]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.server.static_root, PathBuf::from("./"));
        assert_eq!(config.server.address, "0.0.0.0");
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["zql-hub"]);
        assert_eq!(args.config, PathBuf::from("zql-hub.toml"));
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
