//! The farm assistant on the command line: an HTTP server, a terminal chat
//! and a connectivity check.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::net::IpAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use farmhand::api::{ApiRequest, FarmApi};
use farmhand::config::Config;
use farmhand::core::conversation::{ChatInput, HistoryMessage};
use farmhand::{Session, SessionBuilder, server};
use farmhand_openai_model::OpenAIProvider;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::time::sleep;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const BAR_CHAR: &str = "▎";
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Farm management assistant for farmOS.
#[derive(Parser)]
#[command(name = "farmhand", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the chat API over HTTP
    Serve {
        /// Address to listen on (overrides HOST)
        #[arg(long)]
        host: Option<IpAddr>,
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Chat with the assistant in the terminal
    Chat,
    /// Check that the farm API is reachable
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farmhand=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = match Config::from_env() {
        Ok(config) => config,
        // The check only needs the farm API.
        Err(_) if matches!(cli.command, Command::Check) => {
            return check(&farm_api_url_from_env()).await;
        }
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Chat => chat(config).await,
        Command::Check => check(&config.farm_api_url).await,
    }
}

fn build_session(config: &Config) -> Option<Session> {
    let provider = OpenAIProvider::new(config.openai_config());
    let session = SessionBuilder::with_model_provider(provider)
        .with_farm_api(Arc::new(config.farm_api()))
        .with_agent_settings(config.agent)
        .build();
    match session {
        Ok(session) => Some(session),
        Err(err) => {
            error!("failed to register farm tools: {err}");
            None
        }
    }
}

async fn serve(
    mut config: Config,
    host: Option<IpAddr>,
    port: Option<u16>,
) -> ExitCode {
    config.host = host.unwrap_or(config.host);
    config.port = port.unwrap_or(config.port);
    info!(
        model = %config.openai_model,
        farm_api = %config.farm_api_url,
        "starting farm assistant"
    );

    let Some(session) = build_session(&config) else {
        return ExitCode::FAILURE;
    };
    let app = server::router(session, &config.cors_allowed_origins);
    match server::serve(app, config.listen_addr()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn chat(config: Config) -> ExitCode {
    let Some(session) = build_session(&config) else {
        return ExitCode::FAILURE;
    };

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut history = vec![];
    let mut stdin = BufReader::new(io::stdin());

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");

        let input = ChatInput::new(message).with_history(history.clone());
        let turn = session.chat(input);
        tokio::pin!(turn);
        let result = loop {
            select! {
                result = &mut turn => break result,
                _ = sleep(Duration::from_millis(100)) => progress_bar.inc(1),
            }
        };
        progress_bar.finish_and_clear();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                println!("{}❌ {}", BAR_CHAR.bright_red(), err);
                continue;
            }
        };

        for call in &outcome.tool_calls {
            let bar = BAR_CHAR.bright_yellow();
            match call.error() {
                Some(err) => {
                    println!("{bar}🔧 {} failed: {err}", call.name())
                }
                None => println!("{bar}🔧 {}", call.name().bright_white()),
            }
        }
        println!(
            "{}🤖 {}",
            BAR_CHAR.bright_cyan(),
            outcome.message.bright_white()
        );
        println!();

        history.push(HistoryMessage::user(message));
        history.push(HistoryMessage::assistant(outcome.message));
    }

    ExitCode::SUCCESS
}

async fn check(farm_api_url: &str) -> ExitCode {
    println!("Testing connection to {farm_api_url}...");
    let api = farmhand::api::HttpFarmApi::new(farm_api_url)
        .with_timeout(CHECK_TIMEOUT);
    let resp = api.call(ApiRequest::get("schema")).await;

    if !resp.success {
        let error = resp.error.unwrap_or_default();
        let title = "❌ Failed to connect to farm API:";
        println!("{} {error}", title.bright_red());
        if resp.status_code.is_none() {
            println!("Make sure the farm API is running at {farm_api_url}");
        }
        return ExitCode::FAILURE;
    }

    println!("{}", "✅ Successfully connected to farm API!".bright_green());
    if let Some(code) = resp.status_code {
        println!("Status code: {code}");
    }
    let schema = resp.data.unwrap_or_default();
    match schema.get("resources").and_then(|r| r.as_object()) {
        Some(resources) => {
            let names: Vec<_> = resources.keys().map(String::as_str).collect();
            println!("Available resources: {}", names.join(", "));
        }
        None => {
            let keys: Vec<_> = schema
                .as_object()
                .map(|doc| doc.keys().map(String::as_str).collect())
                .unwrap_or_default();
            println!("Response keys: {}", keys.join(", "));
        }
    }
    ExitCode::SUCCESS
}

fn farm_api_url_from_env() -> String {
    dotenvy::dotenv().ok();
    std::env::var("FARM_API_URL")
        .unwrap_or_else(|_| farmhand::DEFAULT_FARM_API_URL.to_owned())
}

/// Reads the next line from `reader`, which must outlive the whole session
/// since it buffers ahead.
async fn read_line<R>(reader: &mut R) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();

    match reader.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
