use anyhow::Result;
use clap::{Args, Subcommand};
use operrouter_sdk::{DataSourceConfig, Driver, OperRouterClientV1, Row};

use crate::output::emit;
use crate::parse::{parse_key_value, parse_row};

#[derive(Args)]
pub struct DatasourceArgs {
    #[command(subcommand)]
    command: DatasourceCommand,
}

#[derive(Subcommand)]
enum DatasourceCommand {
    /// Register a named data source
    Create(CreateArgs),
    /// Run a read query and print its rows
    Query { name: String, query: String },
    /// Run a write statement
    Execute { name: String, statement: String },
    /// Insert one row
    Insert {
        name: String,
        /// Row as a JSON object
        #[arg(long, value_parser = parse_row)]
        data: Row,
    },
    /// Health-check a data source
    Ping { name: String },
    /// Close a data source and release its connections
    Close { name: String },
}

#[derive(Args)]
struct CreateArgs {
    name: String,

    #[arg(long)]
    driver: Driver,

    #[arg(long, default_value = "localhost")]
    host: String,

    /// Defaults to the driver's standard port
    #[arg(long)]
    port: Option<u16>,

    #[arg(long, default_value = "")]
    database: String,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Driver-specific setting (repeatable)
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    options: Vec<(String, String)>,
}

impl CreateArgs {
    fn config(&self) -> DataSourceConfig {
        let port = self.port.unwrap_or_else(|| self.driver.default_port());
        let mut config = DataSourceConfig::new(self.driver, &self.host, port, &self.database);
        config.username.clone_from(&self.username);
        config.password.clone_from(&self.password);
        config.options.extend(self.options.iter().cloned());
        config
    }
}

impl DatasourceArgs {
    pub async fn run(self, client: &dyn OperRouterClientV1) -> Result<bool> {
        match self.command {
            DatasourceCommand::Create(args) => {
                let config = args.config();
                tracing::info!(name = %args.name, url = %config.connection_url(), "creating data source");
                emit(
                    "datasource.create",
                    &client.create_datasource(&args.name, &config).await?,
                )
            }
            DatasourceCommand::Query { name, query } => emit(
                "datasource.query",
                &client.query_datasource(&name, &query).await?,
            ),
            DatasourceCommand::Execute { name, statement } => emit(
                "datasource.execute",
                &client.execute_datasource(&name, &statement).await?,
            ),
            DatasourceCommand::Insert { name, data } => emit(
                "datasource.insert",
                &client.insert_datasource(&name, &data).await?,
            ),
            DatasourceCommand::Ping { name } => {
                emit("datasource.ping", &client.ping_datasource(&name).await?)
            }
            DatasourceCommand::Close { name } => {
                emit("datasource.close", &client.close_datasource(&name).await?)
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: DatasourceCommand,
    }

    fn create_args(argv: &[&str]) -> CreateArgs {
        let harness = Harness::try_parse_from(argv).unwrap();
        match harness.command {
            DatasourceCommand::Create(args) => args,
            _ => panic!("not a create command"),
        }
    }

    #[test]
    fn test_create_uses_driver_default_port() {
        let config = create_args(&["ds", "create", "cache", "--driver", "redis"]).config();

        assert_eq!(config.driver, Driver::Redis);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6379);
        assert!(config.username.is_none());
    }

    #[test]
    fn test_create_full() {
        let config = create_args(&[
            "ds", "create", "main", "--driver", "Postgres", "--host", "db", "--port", "6543",
            "--database", "test", "--username", "user", "--password", "pass", "--option",
            "sslmode=disable",
        ])
        .config();

        assert_eq!(
            config,
            DataSourceConfig::new(Driver::Postgres, "db", 6543, "test")
                .with_credentials("user", "pass")
                .with_option("sslmode", "disable")
        );
    }

    #[test]
    fn test_unknown_driver_rejected() {
        assert!(Harness::try_parse_from(["ds", "create", "x", "--driver", "oracle"]).is_err());
    }

    #[test]
    fn test_insert_requires_json_object() {
        assert!(Harness::try_parse_from(["ds", "insert", "main", "--data", "[1]"]).is_err());
        assert!(
            Harness::try_parse_from(["ds", "insert", "main", "--data", r#"{"id": 1}"#]).is_ok()
        );
    }
}
