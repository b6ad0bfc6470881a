mod config;
mod detect;
mod farm_api;
mod render;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use serde_json::json;

use agrolens_gateway::{start_server, GatewayConfig};
use agrolens_logging::{init_logger, LogOptions};
use agrolens_understanding::parse_report;

use config::ClientConfig;
use detect::{Credentials, DetectionClient};
use farm_api::{FarmApi, POPULAR_CROPS};
use terminal_output::{note_error, note_info, note_success, Style};

#[derive(Parser)]
#[command(name = "agrolens")]
#[command(about = "AgroLens: crop disease detection and farm assistant")]
#[command(version)]
struct Cli {
    /// Farm assistant API base URL (chat, weather, market)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Crop-detect gateway base URL
    #[arg(long, global = true)]
    gateway_url: Option<String>,

    /// Session token sent to the gateway instead of the public key
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the crop-detect gateway server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    #[command(flatten)]
    Client(ClientCommand),
}

#[derive(Subcommand)]
enum ClientCommand {
    /// Upload a crop photo and show the disease analysis
    Detect {
        /// Path to the image file
        image: PathBuf,
        /// Print the raw result and parsed report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask the farming assistant a question
    Chat {
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Weather forecast and farming advice for a city
    Weather {
        #[arg(required = true)]
        city: Vec<String>,
    },
    /// Predicted market price for a crop
    Market {
        crop: Option<String>,
        /// List popular crops
        #[arg(long)]
        list: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(url) = cli.gateway_url {
        config.gateway_url = url;
    }
    if cli.token.is_some() {
        config.session_token = cli.token.filter(|t| !t.is_empty());
    }

    match cli.command {
        Commands::Serve { port } => {
            let from_env = GatewayConfig::from_env();
            let gateway = GatewayConfig {
                port: port.unwrap_or(from_env.port),
                ..from_env
            };
            init_logger(&LogOptions {
                level: gateway.log_level.clone(),
                json: config.log_json,
                log_dir: config.log_dir.clone(),
            });
            start_server(gateway).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Client(command) => {
            init_logger(&LogOptions {
                level: config.log_level.clone(),
                json: config.log_json,
                log_dir: config.log_dir.clone(),
            });
            run_client(command, &config).await
        }
    }
}

async fn run_client(command: ClientCommand, config: &ClientConfig) -> Result<ExitCode> {
    let api = FarmApi::new(config.api_url.clone());

    let outcome = match command {
        ClientCommand::Detect { image, json } => return run_detect(image, json, config).await,
        ClientCommand::Chat { message } => api.chat(&message.join(" ")).await,
        ClientCommand::Weather { city } => api.weather(&city.join(" ")).await.map(|w| {
            format!("{}\nWeather forecast and farming recommendations\n\n{}", w.city, w.advice)
        }),
        ClientCommand::Market { list: true, .. } => Ok(format!("Popular crops: {}", POPULAR_CROPS.join(", "))),
        ClientCommand::Market { crop, .. } => api
            .market_price(crop.as_deref().unwrap_or_default())
            .await
            .map(|q| format!("{} market price: {}", q.crop, q.price)),
    };

    match outcome {
        Ok(text) => {
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            note_error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_detect(image: PathBuf, as_json: bool, config: &ClientConfig) -> Result<ExitCode> {
    let request = agrolens_media::load_image(&image).await?;
    let client = DetectionClient::new(
        config.detect_endpoint(),
        Credentials::new(config.session_token.clone(), config.public_key.clone()),
    );

    if !as_json {
        note_info(&format!("Analyzing {}...", request.filename));
    }

    let result = match client.detect(&request).await {
        Ok(result) => result,
        Err(e) => {
            note_error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    if as_json {
        let report = parse_report(&result.prediction);
        let out = json!({
            "result": result,
            "report": report,
            "healthy": report.is_healthy(),
            "confidence_display": report.confidence_display(),
            "parsed": !report.is_unparsed(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        note_success("Analysis Complete");
        println!();
        print!(
            "{}",
            render::render_result(&result, Local::now().naive_local(), Style::detect())
        );
    }
    Ok(ExitCode::SUCCESS)
}
