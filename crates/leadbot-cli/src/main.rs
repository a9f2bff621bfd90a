use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use leadbot::agent::{Agent, AgentConfig};
use leadbot::conversation::ConversationStore;
use leadbot::knowledge::{bundled_index, Chunking, KnowledgeConfig, DEFAULT_TOP_K};
use leadbot::leads::{JsonlSink, LeadSink, LogSink};
use leadbot::providers::factory::{get_provider, ProviderType};
use leadbot::tools::registry::DEFAULT_TOOL_TIMEOUT;
use leadbot::tools::sales_registry;

mod commands;
mod session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    options: AgentOptions,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct AgentOptions {
    /// Oracle provider (openai or gemini)
    #[arg(short, long, default_value = "gemini", global = true)]
    provider: ProviderType,

    /// API key (falls back to OPENAI_API_KEY or GOOGLE_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Model to use instead of the provider default
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Knowledge base file, a JSON object of section to content; the bundled AutoStream
    /// knowledge base is used when omitted
    #[arg(long, global = true)]
    knowledge: Option<PathBuf>,

    /// Index the knowledge base as one passage per section
    #[arg(long, global = true)]
    per_section: bool,

    /// Append captured leads to this JSONL file instead of logging them
    #[arg(long, global = true)]
    leads: Option<PathBuf>,

    /// Trust the oracle to collect every slot before capturing a lead
    #[arg(long, global = true)]
    no_slot_guard: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start or resume an interactive sales conversation
    Session {
        /// Thread to continue; a new one is created when omitted
        #[arg(short, long)]
        thread: Option<String>,
    },

    /// Replay the scripted seven turn demo conversation
    Demo {
        #[arg(short, long)]
        thread: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let agent = build_agent(&cli.options)?;

    match cli.command {
        Command::Session { thread } => commands::session::execute(agent, thread).await,
        Command::Demo { thread } => commands::demo::execute(agent, thread).await,
    }
}

fn build_agent(options: &AgentOptions) -> Result<Agent> {
    let key_env = options.provider.api_key_env();
    let api_key = options
        .api_key
        .clone()
        .or_else(|| env::var(key_env).ok())
        .with_context(|| {
            format!(
                "API key must be provided via --api-key or {} environment variable",
                key_env
            )
        })?;
    let provider = get_provider(
        options
            .provider
            .config(api_key, options.model.as_deref()),
    )?;

    let chunking = if options.per_section {
        Chunking::PerSection
    } else {
        Chunking::Single
    };
    let index = match &options.knowledge {
        Some(path) => KnowledgeConfig {
            chunking,
            ..KnowledgeConfig::new(path)
        }
        .load_index(),
        None => bundled_index(chunking),
    }
    .map(Arc::new);

    let sink: Arc<dyn LeadSink> = match &options.leads {
        Some(path) => Arc::new(JsonlSink::new(path)),
        None => Arc::new(LogSink),
    };
    let registry = sales_registry(index, DEFAULT_TOP_K, sink, DEFAULT_TOOL_TIMEOUT)?;

    let config = AgentConfig {
        slot_guard: !options.no_slot_guard,
        ..AgentConfig::default()
    };
    Agent::new(provider, registry, Arc::new(ConversationStore::new()), config)
}
