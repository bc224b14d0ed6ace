use crate::config::TimetableConfig;
use crate::data::{Assignment, PlacementRecord, Records, SolveStatus};
use crate::domain::build;
use crate::error::{ErrorKind, Result, TimetableError};
use crate::oracle::SolveBudget;
use crate::projector::{Audit, Views, audit, project};
use crate::search::NeighborhoodSearch;
use crate::solver::HighsOracle;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub records: Records,
    #[serde(default)]
    pub config: Option<TimetableConfig>,
    #[serde(default)]
    pub seed: u64,
    /// Extra improvement rounds after the first solve.
    #[serde(default)]
    pub iterations: usize,
    /// Placements held fixed per round; defaults to all of a supplied starting timetable.
    #[serde(default)]
    pub freeze_size: Option<usize>,
    #[serde(default)]
    pub initial_placements: Vec<PlacementRecord>,
    #[serde(default)]
    pub time_limit_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub objective: i64,
    pub status: SolveStatus,
    pub views: Views,
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Builds, solves, improves and projects one timetable.
pub fn solve_request(request: &SolveRequest) -> Result<SolveResponse> {
    let config = request.config.clone().unwrap_or_default();
    let timetable = build(&request.records, &config)?;
    let budget = SolveBudget {
        time_limit: request
            .time_limit_seconds
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f64),
    };
    let mut search = NeighborhoodSearch::new(&timetable, HighsOracle::new(budget), request.seed);

    let first: Assignment = if request.initial_placements.is_empty() {
        search.solve_initial()?
    } else {
        let prior = request
            .initial_placements
            .iter()
            .map(|p| timetable.resolve_placement(p))
            .collect::<Result<Vec<_>>>()?;
        let freeze_size = request.freeze_size.unwrap_or(prior.len());
        search.improve(&prior, freeze_size)?
    };
    info!("Starting timetable has {} points.", first.objective);

    let placed = first.placements.len();
    let freeze_size = request
        .freeze_size
        .unwrap_or(placed - placed / 4)
        .min(placed);
    let best = search.run(first, request.iterations, freeze_size)?;

    Ok(SolveResponse {
        objective: best.objective,
        status: best.status,
        views: project(&timetable, &best),
        audit: audit(&timetable, &best),
    })
}

fn error_response(e: TimetableError) -> (StatusCode, Json<ErrorBody>) {
    let status = match e.kind() {
        ErrorKind::DataIntegrity | ErrorKind::Configuration => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ModelInfeasible => StatusCode::CONFLICT,
        ErrorKind::Oracle => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!("Timetable run failed: {}", e);
    (
        status,
        Json(ErrorBody {
            kind: e.kind(),
            message: e.to_string(),
        }),
    )
}

async fn solve_handler(
    Json(request): Json<SolveRequest>,
) -> std::result::Result<Json<SolveResponse>, (StatusCode, Json<ErrorBody>)> {
    let outcome = tokio::task::spawn_blocking(move || solve_request(&request))
        .await
        .map_err(|e| error_response(TimetableError::Oracle(format!("solve task failed: {}", e))))?;
    match outcome {
        Ok(response) => Ok(Json(response)),
        Err(e) => Err(error_response(e)),
    }
}

pub fn router() -> Router {
    Router::new().route("/v1/timetable/solve", post(solve_handler))
}

pub async fn run_server(addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, router()).await
}
