pub mod alerts;
pub mod metrics;
pub mod pagination;
pub mod rules;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use pulsemon_engine::EngineError;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// API 错误响应
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// 错误码
    pub err_code: i32,
    /// 错误信息
    pub err_msg: String,
    /// 链路追踪 ID（默认空字符串）
    pub trace_id: String,
}

/// API 统一响应包裹
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 错误码（成功时为 0）
    pub err_code: i32,
    /// 错误信息（成功时为 success）
    pub err_msg: String,
    /// 链路追踪 ID（默认空字符串）
    pub trace_id: String,
    /// 业务数据（有数据时返回）
    pub data: Option<T>,
}

/// 分页数据结构
#[derive(Serialize, ToSchema)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    /// 数据项列表
    pub items: Vec<T>,
    /// 总数
    pub total: u64,
    /// 每页数量
    pub limit: u64,
    /// 偏移量
    pub offset: u64,
}

/// ID 响应
#[derive(Serialize, ToSchema)]
pub struct IdResponse {
    /// 资源唯一标识
    pub id: String,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_id_response(status: StatusCode, trace_id: &str, id: String) -> Response {
    success_response(status, trace_id, IdResponse { id })
}

pub fn success_paginated_response<T>(
    status: StatusCode,
    trace_id: &str,
    items: Vec<T>,
    total: u64,
    limit: u64,
    offset: u64,
) -> Response
where
    T: Serialize,
{
    success_response(
        status,
        trace_id,
        PaginatedData {
            items,
            total,
            limit,
            offset,
        },
    )
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "unauthorized" => 1002,
        "forbidden" => 1003,
        "not_found" => 1004,
        "conflict" => 1005,
        "invalid_state" => 1006,
        "storage_error" => 1501,
        "internal_error" => 1500,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// Maps engine failures onto the API taxonomy. Evaluation-internal
/// variants never come through this path in normal operation; they fall
/// into the 500 bucket if they do.
pub fn engine_error_response(trace_id: &str, err: EngineError) -> Response {
    match &err {
        EngineError::NotFound { .. } => error_response(
            StatusCode::NOT_FOUND,
            trace_id,
            "not_found",
            &err.to_string(),
        ),
        EngineError::InvalidState { .. } => error_response(
            StatusCode::BAD_REQUEST,
            trace_id,
            "invalid_state",
            &err.to_string(),
        ),
        EngineError::InvalidRule(_) => error_response(
            StatusCode::BAD_REQUEST,
            trace_id,
            "bad_request",
            &err.to_string(),
        ),
        _ => {
            tracing::error!(error = %err, "Engine operation failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "internal_error",
                "Internal error",
            )
        }
    }
}

// ---- Health ----

/// 健康检查响应
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    uptime_secs: i64,
}

/// 服务健康检查。
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Health",
    responses((status = 200, description = "服务正常", body = HealthResponse))
)]
async fn healthz(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            status: "ok".to_string(),
            uptime_secs: (Utc::now() - state.start_time).num_seconds(),
        },
    )
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(healthz))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(rules::rule_routes())
        .merge(alerts::alert_routes())
        .merge(metrics::metric_routes())
}
