//! End-to-end walkthroughs against a running backend.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use operrouter_sdk::{
    ChatMessage, DataSourceConfig, Driver, LlmConfig, LlmProvider, OperRouterClientV1, Row,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::output::{Outcome, render};

const TEST_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS test_users (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100),
    email VARCHAR(100),
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

#[derive(Args)]
pub struct DemoArgs {
    #[command(subcommand)]
    flow: Flow,
}

#[derive(Subcommand)]
enum Flow {
    /// Create a data source, write to it, read it back, close it
    Datasource(DatasourceDemo),
    /// Create an LLM instance, generate, chat, embed, close it
    Llm(LlmDemo),
}

#[derive(Args)]
struct DatasourceDemo {
    #[arg(long, default_value = "my_postgres")]
    name: String,

    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long, default_value_t = 5432)]
    port: u16,

    #[arg(long, default_value = "testdb")]
    database: String,

    #[arg(long, default_value = "postgres")]
    username: String,

    #[arg(long, default_value = "postgres")]
    password: String,
}

#[derive(Args)]
struct LlmDemo {
    #[arg(long, default_value = "my_openai")]
    name: String,

    #[arg(long, default_value = "openai")]
    provider: LlmProvider,

    #[arg(long, default_value = "gpt-3.5-turbo")]
    model: String,

    /// Falls back to `OPENAI_API_KEY` for the openai provider
    #[arg(long)]
    api_key: Option<String>,

    #[arg(long)]
    base_url: Option<String>,
}

impl LlmDemo {
    fn config(&self) -> Result<LlmConfig> {
        let mut config = LlmConfig::new(self.provider, &self.model);
        config.base_url.clone_from(&self.base_url);
        config.api_key = match (&self.api_key, self.provider) {
            (Some(key), _) => Some(key.clone()),
            (None, LlmProvider::OpenAi) => match std::env::var("OPENAI_API_KEY") {
                Ok(key) if !key.is_empty() => Some(key),
                _ => bail!("OPENAI_API_KEY is not set; pass --api-key"),
            },
            (None, _) => None,
        };
        Ok(config)
    }
}

/// Collected step results, printed once the flow ends.
#[derive(Debug, Serialize)]
struct Report {
    flow: &'static str,
    steps: Vec<StepRecord>,
}

#[derive(Debug, Serialize)]
struct StepRecord {
    step: &'static str,
    success: bool,
    response: Value,
}

impl Report {
    fn new(flow: &'static str) -> Self {
        Self {
            flow,
            steps: Vec::new(),
        }
    }

    fn record<T>(&mut self, step: &'static str, response: &T) -> Result<bool>
    where
        T: Serialize + Outcome,
    {
        if response.succeeded() {
            tracing::info!(flow = self.flow, step, "step succeeded");
        } else {
            tracing::warn!(flow = self.flow, step, message = response.message(), "step refused");
        }
        self.steps.push(StepRecord {
            step,
            success: response.succeeded(),
            response: serde_json::to_value(response)?,
        });
        Ok(response.succeeded())
    }

    fn all_succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.success)
    }
}

impl DemoArgs {
    pub async fn run(self, client: &dyn OperRouterClientV1) -> Result<bool> {
        let report = match self.flow {
            Flow::Datasource(args) => datasource_flow(client, &args).await?,
            Flow::Llm(args) => llm_flow(client, &args.config()?, &args.name).await?,
        };
        println!("{}", render(&report)?);
        Ok(report.all_succeeded())
    }
}

/// ping, create, version query, DDL, insert, read back, health check, close.
/// Stops early when the server is unreachable or the data source cannot be
/// created.
async fn datasource_flow(client: &dyn OperRouterClientV1, args: &DatasourceDemo) -> Result<Report> {
    let mut report = Report::new("datasource");
    let name = args.name.as_str();

    if !report.record("ping", &client.ping().await?)? {
        return Ok(report);
    }

    let config = DataSourceConfig::new(Driver::Postgres, &args.host, args.port, &args.database)
        .with_credentials(&args.username, &args.password);
    if !report.record("create", &client.create_datasource(name, &config).await?)? {
        return Ok(report);
    }

    report.record(
        "query_version",
        &client.query_datasource(name, "SELECT version()").await?,
    )?;
    report.record(
        "create_table",
        &client.execute_datasource(name, TEST_TABLE_DDL).await?,
    )?;

    let row: Row = [
        ("name".to_owned(), json!("Test User")),
        ("email".to_owned(), json!("test@example.com")),
    ]
    .into_iter()
    .collect();
    report.record("insert", &client.insert_datasource(name, &row).await?)?;
    report.record(
        "query_rows",
        &client
            .query_datasource(name, "SELECT * FROM test_users LIMIT 10")
            .await?,
    )?;
    report.record("ping_datasource", &client.ping_datasource(name).await?)?;
    report.record("close", &client.close_datasource(name).await?)?;

    Ok(report)
}

/// ping, create, generate, chat, embed, health check, close.
async fn llm_flow(client: &dyn OperRouterClientV1, config: &LlmConfig, name: &str) -> Result<Report> {
    let mut report = Report::new("llm");

    if !report.record("ping", &client.ping().await?)? {
        return Ok(report);
    }
    if !report.record("create", &client.create_llm(name, config).await?)? {
        return Ok(report);
    }

    report.record(
        "generate",
        &client
            .generate_llm(name, "Explain quantum computing in one sentence.")
            .await?,
    )?;

    let messages = [
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user("What is the capital of France?"),
    ];
    report.record("chat", &client.chat_llm(name, &messages).await?)?;

    let embedding = client.embedding_llm(name, "Hello world").await?;
    tracing::info!(dimensions = embedding.embedding.len(), "embedding received");
    report.record("embedding", &embedding)?;

    report.record("ping_llm", &client.ping_llm(name).await?)?;
    report.record("close", &client.close_llm(name).await?)?;

    Ok(report)
}
