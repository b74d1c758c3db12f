mod config;
mod datasource;
mod demo;
mod llm;
mod logging;
mod output;
mod parse;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use operrouter_sdk::TransportKind;

/// Exit status when the backend answered with `success == false`.
const EXIT_REFUSED: u8 = 3;

/// OperRouter client - talk to an OperRouter backend over HTTP, gRPC or FFI
#[derive(Parser)]
#[command(name = "operrouter")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Transport to use: http, grpc or ffi (overrides config)
    #[arg(short, long, global = true)]
    transport: Option<TransportKind>,

    /// JSON-RPC base URL (overrides config)
    #[arg(long, global = true)]
    url: Option<String>,

    /// gRPC server address (overrides config)
    #[arg(long, global = true)]
    address: Option<String>,

    /// Native library path (overrides config)
    #[arg(long, global = true)]
    ffi_path: Option<PathBuf>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

impl GlobalArgs {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            transport: self.transport,
            url: self.url.clone(),
            address: self.address.clone(),
            ffi_path: self.ffi_path.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable
    Ping,
    /// Show the backend's name and version
    Metadata,
    /// Ask the backend to validate a JSON or YAML configuration file
    ValidateConfig { file: PathBuf },
    /// Ask the backend to load a configuration file from its own filesystem
    LoadConfig { path: String },
    /// Print the effective client configuration and exit
    PrintConfig,
    /// Data-source operations
    Datasource(datasource::DatasourceArgs),
    /// LLM operations
    Llm(llm::LlmArgs),
    /// Run an end-to-end walkthrough
    Demo(demo::DemoArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    logging::init(cli.global.verbose, cli.global.log_json);

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (OPERROUTER__*) -> 4) CLI overrides
    let config = config::load(cli.global.config.as_deref(), &cli.global.overrides())?;

    if matches!(cli.command, Commands::PrintConfig) {
        println!("{}", output::render(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    let client = operrouter_sdk::connect(&config).await?;
    tracing::info!(transport = %config.transport, "client ready");

    let accepted = match cli.command {
        Commands::Ping => output::emit("ping", &client.ping().await?)?,
        Commands::Metadata => output::emit("get_metadata", &client.get_metadata().await?)?,
        Commands::ValidateConfig { file } => {
            let document = parse::read_document(&file)?;
            output::emit("validate_config", &client.validate_config(&document).await?)?
        }
        Commands::LoadConfig { path } => {
            output::emit("load_config", &client.load_config(&path).await?)?
        }
        Commands::PrintConfig => true,
        Commands::Datasource(args) => args.run(client.as_ref()).await?,
        Commands::Llm(args) => args.run(client.as_ref()).await?,
        Commands::Demo(args) => args.run(client.as_ref()).await?,
    };
    client.close();

    Ok(if accepted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_REFUSED)
    })
}
