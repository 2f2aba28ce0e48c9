use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod constants;
mod error;
mod input;
mod intune;
mod logging;
mod parser;
mod pipeline;
mod server;
mod types;
mod validator;

use crate::config::{credentials_from_env, Config};
use crate::input::read_input_file;
use crate::intune::HttpGraphTransport;
use crate::pipeline::ImportPipeline;
use crate::server::AppState;
use crate::types::BatchOutcome;

#[derive(Parser)]
#[command(name = "autopilot_importer")]
#[command(about = "Windows Autopilot hardware-hash batch importer for Intune")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and upload a hash file to Intune
    Upload {
        /// Path to a .txt or .csv file of hardware hashes
        #[arg(long)]
        input: String,
        /// Group tag (display name or backend tag) applied to the batch
        #[arg(long)]
        group_tag: String,
    },
    /// Validate a hash file locally without contacting Intune
    Validate {
        /// Path to a .txt or .csv file of hardware hashes
        #[arg(long)]
        input: String,
    },
    /// Run the HTTP import entry point
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Upload { input, group_tag } => {
            let Some(resolved_tag) = config.resolve_group_tag(&group_tag).map(str::to_string)
            else {
                error!("unknown group tag: {group_tag}");
                println!("❌ Unknown group tag \"{group_tag}\". Known tags:");
                for entry in &config.group_tags {
                    println!("   - {} ({})", entry.display_name, entry.tag);
                }
                std::process::exit(1);
            };

            let content = read_input_file(&input)?;
            let credentials = credentials_from_env();
            let transport = Box::new(HttpGraphTransport::new(config.intune.timeout_seconds));
            let pipeline = ImportPipeline::new(&config.intune, transport);

            info!("starting upload run for {input}");
            let report = pipeline.run(&content, &resolved_tag, &credentials).await;

            println!("\n📊 Import results:");
            println!("   Batch size: {}", report.batch_size);
            match &report.outcome {
                BatchOutcome::Submitted { outcome } => {
                    println!("   Processed: {}", outcome.processed_count);
                    println!("   Failed: {}", outcome.failed_count);
                    println!("   {}", outcome.message);
                }
                BatchOutcome::ValidationFailed { issues } => {
                    println!("   ⚠️  Issues:");
                    for issue in issues {
                        match issue.affected_count {
                            Some(count) => println!("   - {} ({} affected)", issue.message, count),
                            None => println!("   - {}", issue.message),
                        }
                    }
                }
            }

            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Validate { input } => {
            let content = read_input_file(&input)?;
            let identifiers = parser::parse(&content);
            let issues = validator::validate(
                &identifiers,
                config.intune.max_batch_size,
                config.intune.min_hash_length,
            );

            println!("🔍 Parsed {} hash(es) from {input}", identifiers.len());
            if issues.is_empty() {
                println!("✅ Validation passed");
            } else {
                println!("⚠️  Validation failed:");
                for issue in &issues {
                    match issue.affected_count {
                        Some(count) => println!("   - {} ({} affected)", issue.message, count),
                        None => println!("   - {}", issue.message),
                    }
                }
                std::process::exit(1);
            }
        }
        Commands::Serve { port } => {
            let credentials = credentials_from_env();
            let transport = Box::new(HttpGraphTransport::new(config.intune.timeout_seconds));
            let pipeline = ImportPipeline::new(&config.intune, transport);
            let state = Arc::new(AppState {
                pipeline,
                config,
                credentials,
            });
            server::start_server(state, port).await?;
        }
    }

    Ok(())
}
