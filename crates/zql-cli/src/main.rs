//! # zql — command-line client for the ZQL gateway
//!
//! - `zql convert -t mongodb "SELECT * FROM users WHERE age > 18"` — convert locally.
//! - `zql remote -t influxdb "SELECT * FROM cpu"` — ask a running `zql-hub`.
//! - `zql parse "a = 1 OR b = 2"` — print the compiled query.

use std::collections::HashMap;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use zql_hub::config::Config;
use zql_hub::gateway::{Dispatcher, Gateway, TargetType, ZqlCompiler};

#[derive(Parser)]
#[command(name = "zql", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a query in-process.
    Convert {
        #[command(flatten)]
        request: ConvertArgs,

        /// MongoDB database name.
        #[arg(long, default_value = "dbname")]
        database: String,

        /// MongoDB collection override.
        #[arg(long, default_value = "")]
        collection: String,

        /// InfluxDB measurement override.
        #[arg(long, default_value = "")]
        measurement: String,
    },

    /// Convert a query through a running gateway.
    Remote {
        #[command(flatten)]
        request: ConvertArgs,

        /// Gateway base URL (default: $ZQL_BASE_URL or http://127.0.0.1:80).
        #[arg(long)]
        url: Option<String>,
    },

    /// Compile a query and print its intermediate form as JSON.
    Parse {
        #[arg(short, long, default_value = "")]
        prefix: String,

        zql: String,
    },

    /// List the supported target types.
    Targets,
}

#[derive(Args)]
struct ConvertArgs {
    /// Target backend: mongodb, influxdb or elasticsearch.
    #[arg(short = 't', long = "type")]
    target: String,

    /// Table / collection name prefix.
    #[arg(short, long, default_value = "")]
    prefix: String,

    /// Print only the converted query instead of the whole envelope.
    #[arg(long)]
    raw: bool,

    zql: String,
}

impl ConvertArgs {
    fn params(&self) -> HashMap<String, String> {
        HashMap::from([
            ("type".to_string(), self.target.clone()),
            ("zql".to_string(), self.zql.clone()),
            ("prefix".to_string(), self.prefix.clone()),
        ])
    }
}

/// The envelope as it appears on the wire.
#[derive(Debug, Deserialize)]
struct WireEnvelope {
    state: String,
    msg: String,
    data: Option<serde_json::Value>,
}

impl WireEnvelope {
    fn succeeded(&self) -> bool {
        self.state == "0"
    }
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Convert {
            request,
            database,
            collection,
            measurement,
        } => {
            let mut config = Config::default();
            config.mongodb.database = database;
            config.mongodb.collection = collection;
            config.influxdb.measurement = measurement;
            let body = convert_local(&config, &request.params());
            report(&body, request.raw)
        }

        Commands::Remote { request, url } => {
            let base_url = url
                .or_else(|| std::env::var("ZQL_BASE_URL").ok())
                .unwrap_or_else(|| "http://127.0.0.1:80".to_string());

            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Failed to build tokio runtime: {}", e);
                    std::process::exit(1);
                }
            };

            match rt.block_on(convert_remote(&base_url, &request.params())) {
                Ok(body) => report(&body, request.raw),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }

        Commands::Parse { prefix, zql } => match zql_core::compile(&prefix, &zql) {
            Ok(compiled) => match serde_json::to_string_pretty(&compiled) {
                Ok(json) => {
                    println!("{}", json);
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            },
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },

        Commands::Targets => {
            for target in TargetType::ALL {
                println!("{}", target);
            }
            0
        }
    };

    std::process::exit(code);
}

fn convert_local(config: &Config, params: &HashMap<String, String>) -> Vec<u8> {
    let gateway = Gateway::new(ZqlCompiler, Dispatcher::from_config(config));
    gateway.respond(params)
}

async fn convert_remote(
    base_url: &str,
    params: &HashMap<String, String>,
) -> Result<Vec<u8>, reqwest::Error> {
    let url = format!("{}/convert", base_url.trim_end_matches('/'));
    let resp = reqwest::Client::new()
        .get(&url)
        .query(params)
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Print an envelope body and return the process exit code.
fn report(body: &[u8], raw: bool) -> i32 {
    let envelope: WireEnvelope = match serde_json::from_slice(body) {
        Ok(env) => env,
        Err(e) => {
            eprintln!("Malformed response ({}): {}", e, String::from_utf8_lossy(body));
            return 1;
        }
    };

    if raw {
        match (&envelope.data, envelope.succeeded()) {
            (Some(serde_json::Value::String(query)), true) => println!("{}", query),
            (Some(other), true) => println!("{}", other),
            _ => eprintln!("{}", envelope.msg),
        }
    } else {
        match serde_json::from_slice::<serde_json::Value>(body)
            .and_then(|v| serde_json::to_string_pretty(&v))
        {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", String::from_utf8_lossy(body)),
        }
    }

    if envelope.succeeded() {
        0
    } else {
        1
    }
}
