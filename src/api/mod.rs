use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;

use crate::core::{
    AffordabilitySummary, CompensationScheduleEntry, MixScheduleEntry, ProjectionError,
    ProjectionInputs, Schedules, YearRecord, run_scenario,
};
use crate::schedule::{Row, compensation_schedule, load_rows, mix_schedule, parse_rows};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MAX_YEARS: u32 = 150;
const MAX_MORTGAGE_TERM: u32 = 50;

#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(long, default_value_t = 150_000.0, help = "Base annual salary")]
    pub salary: f64,
    #[arg(long, default_value_t = 20_000.0, help = "Annual cash bonus")]
    pub bonus: f64,
    #[arg(
        long,
        default_value_t = 10_000.0,
        help = "Annual deferred compensation counted toward gross income"
    )]
    pub deferred: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        allow_hyphen_values = true,
        help = "Annual compensation growth in percent, compounded on the total"
    )]
    pub income_growth: f64,
    #[arg(long, default_value_t = 30.0, help = "Flat effective tax rate in percent")]
    pub tax_rate: f64,
    #[arg(long, default_value_t = 80_000.0, help = "Constant annual spending")]
    pub annual_spend: f64,
    #[arg(
        long,
        default_value_t = 100_000.0,
        allow_hyphen_values = true,
        help = "Starting net worth"
    )]
    pub savings: f64,
    #[arg(long, default_value_t = 10, help = "Number of years to project")]
    pub years: u32,
    #[arg(long, default_value_t = 70.0, help = "Equity allocation in percent")]
    pub equity_mix: f64,
    #[arg(
        long,
        default_value_t = 30.0,
        help = "Bond allocation in percent; only checked against equity-mix"
    )]
    pub bond_mix: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        allow_hyphen_values = true,
        help = "Baseline annual portfolio return in percent"
    )]
    pub portfolio_return: f64,
    #[arg(
        long,
        default_value_t = -30.0,
        allow_hyphen_values = true,
        help = "One-time equity return shock in percent, scaled by the equity allocation"
    )]
    pub equity_shock: f64,
    #[arg(long, default_value_t = 3, help = "Year (1-indexed) the shock lands in; 0 disables it")]
    pub shock_year: u32,
    #[arg(long, default_value_t = 6.5, help = "Annual mortgage rate in percent")]
    pub mortgage_rate: f64,
    #[arg(long, default_value_t = 30, help = "Mortgage term in years")]
    pub mortgage_term: u32,
    #[arg(
        long,
        default_value_t = 36.0,
        help = "Maximum housing payment as percent of gross monthly income"
    )]
    pub dti_cap: f64,
    #[arg(long, default_value_t = 20.0, help = "Down payment as percent of home price")]
    pub down_payment_pct: f64,
    #[arg(
        long,
        default_value_t = 1.5,
        help = "Annual carrying-cost loading on the implied home price, in percent"
    )]
    pub pti_pct: f64,
    #[arg(long, default_value_t = 600_000.0, help = "Mortgage principal to evaluate")]
    pub candidate_mortgage: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[arg(long, help = "Per-year compensation schedule (.csv or .json)")]
    pub compensation_schedule: Option<PathBuf>,
    #[arg(long, help = "Asset-mix schedule (.csv or .json); only the equity row is used")]
    pub mix_schedule: Option<PathBuf>,
    #[arg(long, help = "Pretty-print the JSON output")]
    pub pretty: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleUpload {
    file_name: String,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScheduleInput {
    Rows(Vec<Row>),
    Upload(ScheduleUpload),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    salary: Option<f64>,
    bonus: Option<f64>,
    deferred: Option<f64>,
    income_growth: Option<f64>,
    tax_rate: Option<f64>,
    annual_spend: Option<f64>,
    savings: Option<f64>,
    years: Option<u32>,
    equity_mix: Option<f64>,
    bond_mix: Option<f64>,
    portfolio_return: Option<f64>,
    equity_shock: Option<f64>,
    shock_year: Option<u32>,
    mortgage_rate: Option<f64>,
    mortgage_term: Option<u32>,
    dti_cap: Option<f64>,
    down_payment_pct: Option<f64>,
    pti_pct: Option<f64>,
    candidate_mortgage: Option<f64>,

    compensation_schedule: Option<ScheduleInput>,
    mix_schedule: Option<ScheduleInput>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: ProjectionInputs,
    compensation: Option<Vec<CompensationScheduleEntry>>,
    mix: Option<Vec<MixScheduleEntry>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    inputs: ProjectionInputs,
    compensation_schedule_years: Option<usize>,
    mix_schedule_rows: Option<usize>,
    years: Vec<YearRecord>,
    summary: AffordabilitySummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_inputs(args: ScenarioArgs) -> Result<ProjectionInputs, String> {
    for (name, value) in [
        ("--salary", args.salary),
        ("--bonus", args.bonus),
        ("--deferred", args.deferred),
        ("--income-growth", args.income_growth),
        ("--tax-rate", args.tax_rate),
        ("--annual-spend", args.annual_spend),
        ("--savings", args.savings),
        ("--equity-mix", args.equity_mix),
        ("--bond-mix", args.bond_mix),
        ("--portfolio-return", args.portfolio_return),
        ("--equity-shock", args.equity_shock),
        ("--mortgage-rate", args.mortgage_rate),
        ("--dti-cap", args.dti_cap),
        ("--down-payment-pct", args.down_payment_pct),
        ("--pti-pct", args.pti_pct),
        ("--candidate-mortgage", args.candidate_mortgage),
    ] {
        if !value.is_finite() {
            return Err(format!("{name} must be a finite number"));
        }
    }

    if args.years > MAX_YEARS {
        return Err(format!("--years must be <= {MAX_YEARS}"));
    }

    if args.income_growth <= -100.0 {
        return Err("--income-growth must be > -100".to_string());
    }

    for (name, pct) in [
        ("--tax-rate", args.tax_rate),
        ("--equity-mix", args.equity_mix),
        ("--bond-mix", args.bond_mix),
        ("--dti-cap", args.dti_cap),
        ("--down-payment-pct", args.down_payment_pct),
        ("--pti-pct", args.pti_pct),
    ] {
        if !(0.0..=100.0).contains(&pct) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    if args.annual_spend < 0.0 {
        return Err("--annual-spend must be >= 0".to_string());
    }

    if args.mortgage_rate < 0.0 {
        return Err("--mortgage-rate must be >= 0".to_string());
    }

    if args.mortgage_term == 0 || args.mortgage_term > MAX_MORTGAGE_TERM {
        return Err(format!(
            "--mortgage-term must be between 1 and {MAX_MORTGAGE_TERM}"
        ));
    }

    if args.candidate_mortgage < 0.0 {
        return Err("--candidate-mortgage must be >= 0".to_string());
    }

    if (args.equity_mix + args.bond_mix - 100.0).abs() > 1e-9 {
        tracing::warn!(
            equity_mix = args.equity_mix,
            bond_mix = args.bond_mix,
            "investment mix does not sum to 100%; continuing anyway"
        );
    }

    Ok(ProjectionInputs {
        salary: args.salary,
        bonus: args.bonus,
        deferred: args.deferred,
        income_growth: args.income_growth,
        tax_rate: args.tax_rate,
        annual_spend: args.annual_spend,
        savings: args.savings,
        years: args.years,
        equity_mix: args.equity_mix,
        portfolio_return: args.portfolio_return,
        equity_shock: args.equity_shock,
        shock_year: args.shock_year,
        mortgage_rate: args.mortgage_rate,
        mortgage_term: args.mortgage_term,
        dti_cap: args.dti_cap,
        down_payment_pct: args.down_payment_pct,
        pti_pct: args.pti_pct,
        candidate_mortgage: args.candidate_mortgage,
    })
}

pub fn run_project_command(args: ProjectArgs) -> Result<String, String> {
    let inputs = build_inputs(args.scenario)?;
    let compensation = load_schedule_file(args.compensation_schedule.as_deref())?
        .map(|rows| compensation_schedule(&rows));
    let mix = load_schedule_file(args.mix_schedule.as_deref())?.map(|rows| mix_schedule(&rows));

    let request = ApiRequest {
        inputs,
        compensation,
        mix,
    };
    let response = build_project_response(request).map_err(|e| e.to_string())?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    json.map_err(|e| format!("failed to serialize projection: {e}"))
}

fn load_schedule_file(path: Option<&Path>) -> Result<Option<Vec<Row>>, String> {
    let Some(path) = path else {
        return Ok(None);
    };
    load_rows(path).map_err(|e| e.to_string())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "affordability HTTP API listening");
    tracing::info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    payload: Result<Query<ProjectPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => project_handler_impl(payload).await,
        Err(rejection) => rejected_payload(&rejection.body_text()),
    }
}

async fn project_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload).await,
        Err(rejection) => rejected_payload(&rejection.body_text()),
    }
}

fn rejected_payload(reason: &str) -> Response {
    tracing::warn!(reason, "malformed projection request");
    error_response(
        StatusCode::BAD_REQUEST,
        &format!("Invalid API payload: {reason}"),
    )
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match build_project_response(request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => {
            tracing::warn!(error = %err, "projection rejected");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string())
        }
    }
}

fn build_project_response(request: ApiRequest) -> Result<ProjectResponse, ProjectionError> {
    let schedules = Schedules {
        compensation: request.compensation.as_deref(),
        mix: request.mix.as_deref(),
    };
    let result = run_scenario(&request.inputs, schedules)?;

    Ok(ProjectResponse {
        compensation_schedule_years: request.compensation.as_ref().map(Vec::len),
        mix_schedule_rows: request.mix.as_ref().map(Vec::len),
        inputs: request.inputs,
        years: result.years,
        summary: result.summary,
    })
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, String> {
    let mut args = default_scenario_args();

    if let Some(v) = payload.salary {
        args.salary = v;
    }
    if let Some(v) = payload.bonus {
        args.bonus = v;
    }
    if let Some(v) = payload.deferred {
        args.deferred = v;
    }
    if let Some(v) = payload.income_growth {
        args.income_growth = v;
    }
    if let Some(v) = payload.tax_rate {
        args.tax_rate = v;
    }
    if let Some(v) = payload.annual_spend {
        args.annual_spend = v;
    }
    if let Some(v) = payload.savings {
        args.savings = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }

    if let Some(v) = payload.equity_mix {
        args.equity_mix = v;
    }
    if let Some(v) = payload.bond_mix {
        args.bond_mix = v;
    }
    if let Some(v) = payload.portfolio_return {
        args.portfolio_return = v;
    }
    if let Some(v) = payload.equity_shock {
        args.equity_shock = v;
    }
    if let Some(v) = payload.shock_year {
        args.shock_year = v;
    }

    if let Some(v) = payload.mortgage_rate {
        args.mortgage_rate = v;
    }
    if let Some(v) = payload.mortgage_term {
        args.mortgage_term = v;
    }
    if let Some(v) = payload.dti_cap {
        args.dti_cap = v;
    }
    if let Some(v) = payload.down_payment_pct {
        args.down_payment_pct = v;
    }
    if let Some(v) = payload.pti_pct {
        args.pti_pct = v;
    }
    if let Some(v) = payload.candidate_mortgage {
        args.candidate_mortgage = v;
    }

    let compensation = schedule_rows(payload.compensation_schedule, "compensationSchedule")?
        .map(|rows| compensation_schedule(&rows));
    let mix = schedule_rows(payload.mix_schedule, "mixSchedule")?.map(|rows| mix_schedule(&rows));

    Ok(ApiRequest {
        inputs: build_inputs(args)?,
        compensation,
        mix,
    })
}

fn schedule_rows(input: Option<ScheduleInput>, slot: &str) -> Result<Option<Vec<Row>>, String> {
    match input {
        None => Ok(None),
        Some(ScheduleInput::Rows(rows)) => Ok(Some(rows)),
        Some(ScheduleInput::Upload(upload)) => {
            parse_rows(&upload.file_name, &upload.content).map_err(|e| format!("{slot}: {e}"))
        }
    }
}

pub fn default_scenario_args() -> ScenarioArgs {
    ScenarioArgs {
        salary: 150_000.0,
        bonus: 20_000.0,
        deferred: 10_000.0,
        income_growth: 3.0,
        tax_rate: 30.0,
        annual_spend: 80_000.0,
        savings: 100_000.0,
        years: 10,
        equity_mix: 70.0,
        bond_mix: 30.0,
        portfolio_return: 6.0,
        equity_shock: -30.0,
        shock_year: 3,
        mortgage_rate: 6.5,
        mortgage_term: 30,
        dti_cap: 36.0,
        down_payment_pct: 20.0,
        pti_pct: 1.5,
        candidate_mortgage: 600_000.0,
    }
}
