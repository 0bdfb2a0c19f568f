use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dalgraph::{
    catalog::{load_catalog, CatalogFormat, CatalogSource, TypeDialect},
    config,
    graphql::CompiledSchema,
    server,
    warehouse::{ClickHouseWarehouse, IdentifierCase, WarehouseClient},
};

/// dalgraph - a GraphQL data access layer for warehouse tables
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the GraphQL API over HTTP
    Serve(ServeArgs),
    /// Print the generated schema without starting a server
    Introspect(IntrospectArgs),
}

#[derive(Args)]
struct CatalogArgs {
    /// YAML catalog file, or dbt project directory
    #[arg(long, env = "DALGRAPH_CATALOG", default_value = "catalog.yaml")]
    catalog: String,

    #[arg(long, value_enum, env = "DALGRAPH_CATALOG_FORMAT", default_value = "yaml")]
    catalog_format: CatalogFormat,

    /// Overrides the type dialect recorded in the catalog
    #[arg(long, value_enum, env = "DALGRAPH_TYPE_DIALECT")]
    type_dialect: Option<TypeDialect>,
}

#[derive(Args)]
struct ServeArgs {
    /// HTTP server host address
    #[arg(long, env = "DALGRAPH_HOST", default_value = "0.0.0.0")]
    http_host: String,

    /// HTTP server port
    #[arg(long, env = "DALGRAPH_PORT", default_value_t = 8080)]
    http_port: u16,

    #[command(flatten)]
    source: CatalogArgs,

    /// Case folding applied to identifiers in SQL and result rows
    #[arg(long, value_enum, env = "DALGRAPH_IDENTIFIER_CASE", default_value = "preserve")]
    identifier_case: IdentifierCase,

    /// Extra wait before relation batches run, on top of cooperative yields
    #[arg(long, env = "DALGRAPH_BATCH_DELAY_MS", default_value_t = 0)]
    batch_delay_ms: u64,

    #[arg(long, env = "DALGRAPH_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Do not serve the GraphiQL page on GET /graphql
    #[arg(long)]
    no_graphiql: bool,

    /// YAML server configuration file; when given it replaces the flags above
    #[arg(long, env = "DALGRAPH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct IntrospectArgs {
    #[command(flatten)]
    source: CatalogArgs,

    /// Print SDL instead of the introspection JSON
    #[arg(long)]
    sdl: bool,
}

impl From<ServeArgs> for config::CliConfig {
    fn from(args: ServeArgs) -> Self {
        config::CliConfig {
            http_host: args.http_host,
            http_port: args.http_port,
            catalog_path: args.source.catalog,
            catalog_format: args.source.catalog_format,
            type_dialect: args.source.type_dialect,
            identifier_case: args.identifier_case,
            batch_delay_ms: args.batch_delay_ms,
            request_timeout_secs: args.request_timeout_secs,
            graphiql: !args.no_graphiql,
        }
    }
}

fn serve_config(mut args: ServeArgs) -> Result<config::ServerConfig, config::ConfigError> {
    match args.config.take() {
        Some(path) => {
            log::info!("Reading server configuration from {}", path.display());
            config::ServerConfig::from_yaml_file(path)
        }
        None => config::ServerConfig::from_cli(args.into()),
    }
}

async fn introspect(args: IntrospectArgs) -> anyhow::Result<()> {
    let source = CatalogSource {
        path: args.source.catalog.into(),
        format: args.source.catalog_format,
        dialect: args.source.type_dialect,
    };
    // column discovery needs a connection; catalogs with declared columns do not
    let warehouse = ClickHouseWarehouse::from_env(IdentifierCase::Preserve);
    let model = load_catalog(
        &source,
        warehouse.as_ref().map(|w| w as &dyn WarehouseClient),
    )
    .await?;
    let schema = CompiledSchema::build(model)?;

    if args.sdl {
        println!("{}", schema.sdl());
    } else {
        println!("{}", serde_json::to_string_pretty(&schema.introspect().await)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    // defaults to INFO level, can be overridden with RUST_LOG
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve(args) => {
            println!("\ndalgraph v{}\n", env!("CARGO_PKG_VERSION"));
            let config = match serve_config(args) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            };
            server::run_with_config(config).await.map_err(anyhow::Error::from)
        }
        Command::Introspect(args) => introspect(args).await,
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
