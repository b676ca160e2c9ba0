use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::{self, Json};
use rocket::{catch, catchers, get, options, post, routes, Build, Rocket, State};
use serde::Serialize;
use thiserror::Error;

use common::Config;

use crate::models::{LocationRequest, NewsResponse};
use crate::news::{NewsError, NewsService};

pub const API_VERSION: &str = "1.0.0";
const GENERIC_FAILURE: &str = "An unexpected error occurred. Please try again later.";

/// Application state stored inside Rocket managed state.
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub news: Arc<NewsService>,
}

impl AppState {
    pub fn new(news: Arc<NewsService>) -> Self {
        Self {
            started_at: Utc::now(),
            news,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Failures that reach the client. Validation problems are the client's fault; everything
/// else is reported as a service fault.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Error searching for news: {0}")]
    Search(String),
}

impl From<NewsError> for ApiError {
    fn from(err: NewsError) -> Self {
        match err {
            NewsError::Validation(e) => ApiError::Validation(e.to_string()),
            NewsError::Resolution(e) => ApiError::Search(format!("{:#}", e)),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = match self {
            ApiError::Validation(_) => Status::UnprocessableEntity,
            ApiError::Search(_) => Status::InternalServerError,
        };
        if status == Status::InternalServerError {
            tracing::error!("Error in search_local_news: {}", self);
        }
        (status, Json(ErrorBody { detail: self.to_string() })).respond_to(req)
    }
}

/// Response structure for `/health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    cached_places: usize,
    model: String,
}

#[post("/search-news", data = "<body>")]
async fn search_news(
    state: &State<AppState>,
    body: Result<Json<LocationRequest>, json::Error<'_>>,
) -> Result<Json<NewsResponse>, ApiError> {
    let request = body.map_err(|e| ApiError::Validation(format!("invalid request body: {}", e)))?;
    let response = state.news.search(&request).await?;
    tracing::info!("Successfully prepared response");
    Ok(Json(response))
}

#[get("/health")]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: API_VERSION,
    })
}

/// Status endpoint returning uptime and resolver/model details.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        cached_places: state.news.resolver().cached_places(),
        model: state.news.model().to_string(),
    })
}

/// CORS preflight for any path.
#[options("/<_..>")]
async fn preflight() -> Status {
    Status::NoContent
}

#[catch(500)]
fn internal_error(req: &Request<'_>) -> Json<ErrorBody> {
    tracing::error!("Global error handler caught a failure for {}", req.uri());
    Json(ErrorBody {
        detail: GENERIC_FAILURE.to_string(),
    })
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    let detail = if status.code >= 500 {
        GENERIC_FAILURE.to_string()
    } else {
        status.reason().unwrap_or("Request failed").to_string()
    };
    (status, Json(ErrorBody { detail }))
}

/// Permissive CORS headers on every response.
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _req: &'r Request<'_>, res: &mut Response<'r>) {
        res.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        res.set_header(Header::new("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
        res.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

/// Assemble the Rocket instance with routes, catchers and fairings. Split from
/// [`launch_rocket`] so tests can drive it with a local client.
pub fn build_rocket(state: AppState, figment: rocket::figment::Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .attach(Cors)
        .mount("/", routes![search_news, health, status, preflight])
        .register("/", catchers![internal_error, default_catcher])
}

/// Launch the HTTP server. Bind address and port come from the `[server]` config section
/// when present, otherwise from Rocket's own defaults and environment.
///
/// This function blocks until the Rocket server shuts down.
pub async fn launch_rocket(config: &Config, news: Arc<NewsService>) -> Result<()> {
    let mut fig = rocket::Config::figment();
    if let Some(bind) = &config.server.bind {
        fig = fig.merge(("address", bind.clone()));
    }
    if let Some(port) = config.server.port {
        fig = fig.merge(("port", port));
    }

    tracing::info!("Starting Rocket HTTP server");
    build_rocket(AppState::new(news), fig)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
