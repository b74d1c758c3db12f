use anyhow::Result;
use clap::{Args, Subcommand};
use operrouter_sdk::{ChatMessage, LlmConfig, LlmProvider, OperRouterClientV1};

use crate::output::emit;
use crate::parse::parse_key_value;

#[derive(Args)]
pub struct LlmArgs {
    #[command(subcommand)]
    command: LlmCommand,
}

#[derive(Subcommand)]
enum LlmCommand {
    /// Register a named LLM instance
    Create(CreateArgs),
    /// Single-prompt completion
    Generate { name: String, prompt: String },
    /// Multi-turn chat
    Chat(ChatArgs),
    /// Embedding vector for a text
    Embed { name: String, text: String },
    /// Health-check an LLM instance
    Ping { name: String },
    /// Close an LLM instance
    Close { name: String },
}

#[derive(Args)]
struct CreateArgs {
    name: String,

    /// openai, claude (or anthropic), ollama
    #[arg(long)]
    provider: LlmProvider,

    #[arg(long)]
    model: String,

    #[arg(long)]
    api_key: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    /// Provider-specific setting (repeatable)
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    options: Vec<(String, String)>,
}

impl CreateArgs {
    fn config(&self) -> LlmConfig {
        let mut config = LlmConfig::new(self.provider, &self.model);
        config.api_key.clone_from(&self.api_key);
        config.base_url.clone_from(&self.base_url);
        config.options.extend(self.options.iter().cloned());
        config
    }
}

/// System messages come first. User and assistant turns are then paired by
/// position: the n-th `--user` is followed by the n-th `--assistant`,
/// whatever order the flags appear in on the command line.
#[derive(Args)]
struct ChatArgs {
    name: String,

    #[arg(long)]
    system: Vec<String>,

    #[arg(long)]
    user: Vec<String>,

    #[arg(long)]
    assistant: Vec<String>,
}

impl ChatArgs {
    fn messages(&self) -> Vec<ChatMessage> {
        let mut messages: Vec<ChatMessage> =
            self.system.iter().map(ChatMessage::system).collect();

        let turns = self.user.len().max(self.assistant.len());
        for turn in 0..turns {
            messages.extend(self.user.get(turn).map(ChatMessage::user));
            messages.extend(self.assistant.get(turn).map(ChatMessage::assistant));
        }
        messages
    }
}

impl LlmArgs {
    pub async fn run(self, client: &dyn OperRouterClientV1) -> Result<bool> {
        match self.command {
            LlmCommand::Create(args) => {
                let config = args.config();
                tracing::info!(name = %args.name, provider = %config.provider, model = %config.model, "creating LLM instance");
                emit("llm.create", &client.create_llm(&args.name, &config).await?)
            }
            LlmCommand::Generate { name, prompt } => {
                emit("llm.generate", &client.generate_llm(&name, &prompt).await?)
            }
            LlmCommand::Chat(args) => {
                let messages = args.messages();
                emit("llm.chat", &client.chat_llm(&args.name, &messages).await?)
            }
            LlmCommand::Embed { name, text } => {
                emit("llm.embedding", &client.embedding_llm(&name, &text).await?)
            }
            LlmCommand::Ping { name } => emit("llm.ping", &client.ping_llm(&name).await?),
            LlmCommand::Close { name } => emit("llm.close", &client.close_llm(&name).await?),
        }
    }
}
