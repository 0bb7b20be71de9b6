//! HTTP service exposing the PPP fetch-and-persist pipeline and the
//! income-conversion endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use pppcalc::{
    adjust_income, latest_per_country, PppRecord, PppStore, WorldBankClient,
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_INDICATOR_URL,
};
use serde::{Deserialize, Serialize};
use tokio_postgres::NoTls;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "pppcalc",
    about = "PPP-adjusted income conversion service backed by World Bank data"
)]
struct Cli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "PPP_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Postgres connection string (postgres://...).
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// World Bank indicator endpoint supplying PPP observations.
    #[arg(long, env = "WORLDBANK_API_URL", default_value = DEFAULT_INDICATOR_URL)]
    worldbank_url: Url,

    /// Seconds before the outbound fetch times out.
    #[arg(long, env = "PPP_FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    fetch_timeout_secs: u64,
}

#[derive(Clone)]
struct AppState {
    store: PppStore,
    worldbank: WorldBankClient,
}

/// Response envelope shared by every JSON endpoint. The `status` field
/// mirrors the HTTP status code; `success` is the string "True" or "False".
#[derive(Debug, Serialize)]
struct Envelope<T> {
    message: String,
    success: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    status: u16,
}

impl<T> Envelope<T> {
    fn ok(message: &str, data: T) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                message: message.to_string(),
                success: "True",
                data: Some(data),
                status: StatusCode::OK.as_u16(),
            }),
        )
    }

    fn failure(status: StatusCode, message: &str) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                message: message.to_string(),
                success: "False",
                data: None,
                status: status.as_u16(),
            }),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalculateRequest {
    income: f64,
    src_country: String,
    target_country: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("pppcalc=info".parse()?);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();

    let worldbank = WorldBankClient::new(
        cli.worldbank_url,
        Duration::from_secs(cli.fetch_timeout_secs.max(1)),
    )?;

    let (client, connection) = tokio_postgres::connect(&cli.database_url, NoTls)
        .await
        .context("failed to connect to Postgres")?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!("postgres connection error: {err}");
        }
    });

    let store = PppStore::new(Arc::new(client));
    store.ensure_table().await?;

    let state = AppState { store, worldbank };
    let app = Router::new()
        .route("/", get(home))
        .route("/fetchlivedata", get(fetch_live_data))
        .route("/calculate", post(calculate))
        .with_state(state);

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    info!("pppcalc listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server shutdown")?;
    Ok(())
}

async fn home() -> &'static str {
    "Welcome to PPP calculator"
}

async fn fetch_live_data(
    State(state): State<AppState>,
) -> (StatusCode, Json<Envelope<Vec<PppRecord>>>) {
    let raw = match state.worldbank.fetch_all().await {
        Ok(raw) => raw,
        Err(err) => {
            error!("PPP fetch failed: {err:#}");
            return Envelope::failure(StatusCode::BAD_GATEWAY, "Data retrieval failed");
        }
    };

    let records = match latest_per_country(&raw) {
        Ok(records) => records,
        Err(err) => {
            error!("PPP normalization failed: {err}");
            return Envelope::failure(StatusCode::BAD_GATEWAY, "Data retrieval failed");
        }
    };
    info!(
        observations = raw.len(),
        countries = records.len(),
        "normalized PPP snapshot"
    );

    match state.store.put_if_absent(&records).await {
        Ok(true) => Envelope::ok("PPP data fetched and persisted successfully", records),
        Ok(false) => {
            warn!("PPP snapshot failed post-write validation");
            Envelope::failure(StatusCode::NOT_FOUND, "Data retrieval failed")
        }
        Err(err) => {
            error!("PPP snapshot write failed: {err:#}");
            Envelope::failure(StatusCode::INTERNAL_SERVER_ERROR, "Data retrieval failed")
        }
    }
}

async fn calculate(
    State(state): State<AppState>,
    Json(request): Json<CalculateRequest>,
) -> (StatusCode, Json<Envelope<i64>>) {
    let src = match state.store.get(&request.src_country).await {
        Ok(src) => src,
        Err(err) => {
            error!("PPP lookup failed: {err:#}");
            return Envelope::failure(StatusCode::INTERNAL_SERVER_ERROR, "PPP lookup failed");
        }
    };
    let target = match state.store.get(&request.target_country).await {
        Ok(target) => target,
        Err(err) => {
            error!("PPP lookup failed: {err:#}");
            return Envelope::failure(StatusCode::INTERNAL_SERVER_ERROR, "PPP lookup failed");
        }
    };

    let (Some(src), Some(target)) = (src, target) else {
        return Envelope::failure(
            StatusCode::NOT_FOUND,
            "Error in PPP calculation, PPP data not found",
        );
    };

    match adjust_income(request.income, &src, &target) {
        Ok(adjusted) => Envelope::ok("PPP calculated", adjusted),
        Err(err) => {
            warn!("rejected calculation: {err}");
            Envelope::failure(
                StatusCode::BAD_REQUEST,
                "Error in PPP calculation, source PPP value is zero",
            )
        }
    }
}
