#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::Path as UrlPath,
    http::{StatusCode, status::InvalidStatusCode},
    routing::{get, post},
};
use clap::Parser;
use problemkit::{
    ActionResult, ProblemDetailsConfig, ProblemDetailsOptions, ProblemDetailsRouterExt,
    ProblemError, ProblemResultAdapter, ValidationViolation,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// Demo order service returning problem details for failures
#[derive(Parser)]
#[command(name = "problemkit-demo")]
#[command(about = "Demo order service returning RFC 7807 problem details")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8087")]
    bind: SocketAddr,

    /// Print effective configuration (JSON) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, thiserror::Error)]
enum OrderError {
    #[error("order {0} does not exist")]
    NotFound(u64),

    #[error("order {0} is already shipped")]
    AlreadyShipped(u64),

    #[error("order {id} rejected by payment provider (code {code})")]
    PaymentRejected { id: u64, code: u16 },
}

#[derive(Debug, thiserror::Error)]
#[error("inventory service did not answer in time")]
struct InventoryTimeout;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn classify(options: ProblemDetailsOptions) -> ProblemDetailsOptions {
    options
        .map::<OrderError>(
            |_, e| matches!(e, OrderError::NotFound(_)),
            |_, _| Some(StatusCode::NOT_FOUND),
        )
        .map::<OrderError>(
            |_, e| matches!(e, OrderError::AlreadyShipped(_)),
            |_, _| Some(StatusCode::CONFLICT),
        )
        .try_map::<OrderError, InvalidStatusCode>(
            |_, e| matches!(e, OrderError::PaymentRejected { .. }),
            |_, e| match e {
                OrderError::PaymentRejected { code, .. } => StatusCode::from_u16(*code).map(Some),
                _ => Ok(None),
            },
        )
        .ignore::<InventoryTimeout>()
}

async fn get_order(UrlPath(id): UrlPath<u64>) -> Result<Json<Value>, ProblemError> {
    match id {
        1 => Ok(Json(json!({ "id": 1, "state": "open" }))),
        2 => Err(OrderError::AlreadyShipped(id).into()),
        3 => Err(OrderError::PaymentRejected { id, code: 402 }.into()),
        4 => Err(InventoryTimeout.into()),
        _ => Err(OrderError::NotFound(id).into()),
    }
}

async fn create_order(Json(body): Json<Value>) -> ActionResult {
    let quantity = body.get("quantity").and_then(Value::as_i64).unwrap_or(0);
    if quantity <= 0 {
        return ActionResult::Validation(vec![
            ValidationViolation::new("quantity", "must be greater than zero").with_code("range"),
        ]);
    }
    ActionResult::Json {
        status: StatusCode::CREATED,
        body: json!({ "id": 100, "quantity": quantity }),
    }
}

fn router(adapter: Arc<ProblemResultAdapter>) -> Router {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{id}", get(get_order))
        .with_problem_details(adapter)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.config.as_deref()
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    // defaults -> YAML (if provided) -> env (PROBLEMKIT__*)
    let config = ProblemDetailsConfig::load(cli.config.as_deref())?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    init_logging(cli.verbose);

    let policy = classify(ProblemDetailsOptions::from_config(&config)?).build();
    let adapter = Arc::new(ProblemResultAdapter::new(Arc::new(policy)));

    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    tracing::info!(
        addr = %cli.bind,
        environment = ?config.environment,
        "problemkit demo listening"
    );

    axum::serve(listener, router(adapter))
        .with_graceful_shutdown(async {
            _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
