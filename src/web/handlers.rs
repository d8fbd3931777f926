//! HTTP request handlers.

use super::AppState;
use crate::assistant::AssistantError;
use crate::probe::{check_port, measure_latency};
use crate::registry::{Classification, DeviceKind, RegistrySummary, Tone};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Templates (simple string replacement, rendered per request)
// ============================================================================

const LAYOUT_TEMPLATE: &str = include_str!("templates/layout.html");
const DASHBOARD_TEMPLATE: &str = include_str!("templates/dashboard.html");
const DEVICES_TEMPLATE: &str = include_str!("templates/devices.html");
const TROUBLESHOOT_TEMPLATE: &str = include_str!("templates/troubleshoot.html");

fn render_page(title: &str, content: &str) -> Html<String> {
    Html(
        LAYOUT_TEMPLATE
            .replace("{{title}}", title)
            .replace("{{content}}", content),
    )
}

// ============================================================================
// Pages
// ============================================================================

pub async fn handle_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let content =
        DASHBOARD_TEMPLATE.replace("{{interval}}", &state.scheduler.interval_secs().to_string());
    render_page("NetWatch Dashboard", &content)
}

pub async fn handle_devices_page() -> impl IntoResponse {
    render_page("NetWatch Devices", DEVICES_TEMPLATE)
}

pub async fn handle_troubleshoot_page() -> impl IntoResponse {
    render_page("NetWatch Troubleshooting", TROUBLESHOOT_TEMPLATE)
}

// ============================================================================
// Mutation envelope
// ============================================================================

/// Response for every mutation attempt: outcome plus the transient
/// notification the UI shows as a toast.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub ok: bool,
    pub message: String,
    pub tone: Tone,
}

impl MutationResponse {
    fn success(message: String) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                ok: true,
                message,
                tone: Tone::Success,
            }),
        )
    }

    fn error(status: StatusCode, message: String) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                ok: false,
                message,
                tone: Tone::Error,
            }),
        )
    }
}

// ============================================================================
// API: Targets
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListTargetsQuery {
    pub classification: Option<String>,
}

pub async fn handle_list_targets(
    State(state): State<AppState>,
    Query(query): Query<ListTargetsQuery>,
) -> impl IntoResponse {
    match parse_classification(query.classification.as_deref()) {
        Ok(classification) => Json(state.registry.list_targets(classification)).into_response(),
        Err(response) => response.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub address: String,
    pub classification: String,
    #[serde(default)]
    pub label: Option<String>,
}

pub async fn handle_add_target(
    State(state): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> impl IntoResponse {
    let Some(classification) = Classification::parse(&req.classification) else {
        return MutationResponse::error(
            StatusCode::BAD_REQUEST,
            format!("Unknown classification '{}'.", req.classification),
        );
    };

    match state
        .registry
        .add_target(&req.address, classification, req.label.as_deref())
    {
        Ok(_) => MutationResponse::success(format!(
            "{} target '{}' added successfully.",
            classification,
            req.address
        )),
        Err(e) => MutationResponse::error(StatusCode::BAD_REQUEST, format!("{}.", capitalize(e))),
    }
}

pub async fn handle_remove_target(
    State(state): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> impl IntoResponse {
    let Some(classification) = Classification::parse(&req.classification) else {
        return MutationResponse::error(
            StatusCode::BAD_REQUEST,
            format!("Unknown classification '{}'.", req.classification),
        );
    };

    match state.registry.remove_target(&req.address, classification) {
        Ok(()) => MutationResponse::success(format!(
            "{} target '{}' removed successfully.",
            classification,
            req.address
        )),
        Err(e) => MutationResponse::error(StatusCode::NOT_FOUND, format!("{}.", capitalize(e))),
    }
}

fn parse_classification(
    raw: Option<&str>,
) -> Result<Option<Classification>, (StatusCode, String)> {
    match raw {
        None => Ok(None),
        Some(s) => Classification::parse(s).map(Some).ok_or((
            StatusCode::BAD_REQUEST,
            format!("Unknown classification '{}'", s),
        )),
    }
}

fn capitalize(e: impl std::fmt::Display) -> String {
    let s = e.to_string();
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => s,
    }
}

// ============================================================================
// API: Devices
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListDevicesQuery {
    pub kind: Option<String>,
}

pub async fn handle_list_devices(
    State(state): State<AppState>,
    Query(query): Query<ListDevicesQuery>,
) -> impl IntoResponse {
    let kind = match query.kind.as_deref() {
        None => None,
        Some(s) => match DeviceKind::parse(s) {
            Some(k) => Some(k),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("Unknown device kind '{}'", s),
                )
                    .into_response()
            }
        },
    };
    Json(state.registry.list_devices(kind)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct DeviceRequest {
    pub address: String,
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub model: Option<String>,
}

pub async fn handle_add_device(
    State(state): State<AppState>,
    Json(req): Json<DeviceRequest>,
) -> impl IntoResponse {
    let Some(kind) = DeviceKind::parse(&req.kind) else {
        return MutationResponse::error(
            StatusCode::BAD_REQUEST,
            format!("Unknown device kind '{}'.", req.kind),
        );
    };

    match state
        .registry
        .add_device(&req.address, kind, &req.label, req.model.as_deref())
    {
        Ok(_) => MutationResponse::success(format!(
            "{} '{}' added successfully.",
            kind,
            req.label.trim()
        )),
        Err(e) => MutationResponse::error(StatusCode::BAD_REQUEST, format!("{}.", capitalize(e))),
    }
}

pub async fn handle_remove_device(
    State(state): State<AppState>,
    Json(req): Json<DeviceRequest>,
) -> impl IntoResponse {
    let Some(kind) = DeviceKind::parse(&req.kind) else {
        return MutationResponse::error(
            StatusCode::BAD_REQUEST,
            format!("Unknown device kind '{}'.", req.kind),
        );
    };

    match state.registry.remove_device(&req.address, kind) {
        Ok(()) => MutationResponse::success(format!(
            "{} '{}' removed successfully.",
            kind,
            req.address
        )),
        Err(e) => MutationResponse::error(StatusCode::NOT_FOUND, format!("{}.", capitalize(e))),
    }
}

// ============================================================================
// API: Summary and monitoring control
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: RegistrySummary,
    pub interval_secs: u64,
    pub armed: bool,
    pub uptime_secs: i64,
    pub assistant_configured: bool,
}

pub async fn handle_summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(SummaryResponse {
        summary: state.registry.summary(),
        interval_secs: state.scheduler.interval_secs(),
        armed: state.scheduler.is_armed().await,
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
        assistant_configured: state.assistant.is_configured(),
    })
}

#[derive(Debug, Deserialize)]
pub struct IntervalRequest {
    pub seconds: u64,
}

pub async fn handle_set_interval(
    State(state): State<AppState>,
    Json(req): Json<IntervalRequest>,
) -> impl IntoResponse {
    if req.seconds < 1 {
        return MutationResponse::error(
            StatusCode::BAD_REQUEST,
            "Monitoring interval must be at least 1 second.".to_string(),
        );
    }

    state.scheduler.reconfigure(req.seconds).await;
    MutationResponse::success(format!("Monitoring interval set to {}s.", req.seconds))
}

// ============================================================================
// API: Assistant
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TroubleshootRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct TroubleshootResponse {
    pub steps: String,
}

pub async fn handle_troubleshoot(
    State(state): State<AppState>,
    Json(req): Json<TroubleshootRequest>,
) -> impl IntoResponse {
    match state.assistant.troubleshooting_steps(&req.address).await {
        Ok(steps) => Json(TroubleshootResponse { steps }).into_response(),
        Err(e) => assistant_error(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeviceInfoQuery {
    pub address: String,
}

pub async fn handle_device_info(
    State(state): State<AppState>,
    Query(query): Query<DeviceInfoQuery>,
) -> impl IntoResponse {
    match state.assistant.device_info(&query.address).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => assistant_error(e).into_response(),
    }
}

#[derive(Debug, Serialize)]
struct AssistantErrorResponse {
    error: String,
}

/// Assistant failures become a displayable error string, never a fault.
fn assistant_error(e: AssistantError) -> (StatusCode, Json<AssistantErrorResponse>) {
    let status = match e {
        AssistantError::Unconfigured => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    tracing::warn!("assistant call failed: {}", e);
    (
        status,
        Json(AssistantErrorResponse {
            error: format!("Failed to get a response from the AI service: {}", e),
        }),
    )
}

// ============================================================================
// API: Troubleshooting tools
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PingToolRequest {
    pub address: String,
}

pub async fn handle_tool_ping(
    State(state): State<AppState>,
    Json(req): Json<PingToolRequest>,
) -> impl IntoResponse {
    let result = match measure_latency(state.prober.client(), &req.address).await {
        Some(report) => format!(
            "Reply from {}: time={:.2}ms\nProtocol: {}",
            req.address,
            report.elapsed_ms,
            report.scheme.to_uppercase()
        ),
        None => "Request timed out or host is unreachable.".to_string(),
    };
    Json(ToolResponse { result })
}

#[derive(Debug, Deserialize)]
pub struct PortCheckRequest {
    pub address: String,
    pub port: u32,
}

#[derive(Debug, Serialize)]
pub struct ToolResponse {
    pub result: String,
}

pub async fn handle_tool_port_check(
    State(state): State<AppState>,
    Json(req): Json<PortCheckRequest>,
) -> impl IntoResponse {
    match check_port(state.prober.client(), &req.address, req.port).await {
        Ok(report) if report.open => {
            let scheme = report.scheme.unwrap_or_default().to_uppercase();
            Json(ToolResponse {
                result: format!(
                    "Port {} appears to be OPEN on {} (Responded to {}).",
                    report.port, req.address, scheme
                ),
            })
            .into_response()
        }
        Ok(report) => Json(ToolResponse {
            result: format!(
                "Port {} appears to be CLOSED or filtered on {}.\n\nNote: only ports running \
                 an HTTP/S service are detectable with this tool.",
                report.port, req.address
            ),
        })
        .into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, format!("Error: {}.", e)).into_response(),
    }
}

// ============================================================================
// Static Assets
// ============================================================================

pub async fn handle_favicon() -> impl IntoResponse {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
        <circle cx="50" cy="50" r="45" fill="#0e7490"/>
        <circle cx="50" cy="50" r="12" fill="#22d3ee"/>
        <circle cx="50" cy="50" r="28" stroke="#22d3ee" stroke-width="4" fill="none"/>
    </svg>"##;

    ([(axum::http::header::CONTENT_TYPE, "image/svg+xml")], svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryError;

    #[test]
    fn capitalize_makes_errors_presentable() {
        let e = RegistryError::InvalidAddress("abc".to_string());
        assert_eq!(capitalize(e), "Invalid IP address format: abc");
    }

    #[test]
    fn classification_query_parsing() {
        assert_eq!(parse_classification(None).unwrap(), None);
        assert_eq!(
            parse_classification(Some("Internal")).unwrap(),
            Some(Classification::Internal)
        );
        assert!(parse_classification(Some("bogus")).is_err());
    }
}
