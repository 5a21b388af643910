use crate::api::{error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use pulsemon_common::types::{MetricComponents, MetricEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 单条指标事件
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct IngestEvent {
    /// 指标类型键（必填）
    metric_type: String,
    /// 事件值（可选，默认 1.0，计数型指标无需填写）
    #[serde(default = "default_value")]
    value: f64,
    /// 业务实体标识（可选）
    #[serde(default)]
    entity_id: Option<String>,
    /// 标签（可选）
    #[serde(default)]
    labels: HashMap<String, String>,
    /// 发生时间（可选，默认当前时间）
    #[serde(default)]
    occurred_at: Option<DateTime<Utc>>,
}

fn default_value() -> f64 {
    1.0
}

/// 指标事件批量上报请求
#[derive(Deserialize, ToSchema)]
struct IngestRequest {
    /// 事件列表（必填，不可为空）
    events: Vec<IngestEvent>,
}

/// 上报结果
#[derive(Serialize, ToSchema)]
struct IngestResponse {
    /// 写入条数
    accepted: u64,
}

/// 批量上报指标事件。
#[utoipa::path(
    post,
    path = "/v1/metrics",
    tag = "Metrics",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "事件已写入", body = IngestResponse),
        (status = 400, description = "请求非法", body = crate::api::ApiError),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn ingest_metrics(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> impl IntoResponse {
    if req.events.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "events must not be empty",
        );
    }
    if req.events.iter().any(|e| e.metric_type.trim().is_empty()) {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "metricType must not be empty",
        );
    }

    let now = Utc::now();
    let events: Vec<MetricEvent> = req
        .events
        .into_iter()
        .map(|e| MetricEvent {
            id: pulsemon_common::id::next_id(),
            metric_type: e.metric_type,
            value: e.value,
            entity_id: e.entity_id,
            labels: e.labels,
            occurred_at: e.occurred_at.unwrap_or(now),
            created_at: now,
        })
        .collect();

    match state.store.insert_metric_events(&events).await {
        Ok(accepted) => success_response(StatusCode::OK, &trace_id, IngestResponse { accepted }),
        Err(e) => {
            tracing::error!(error = %e, "Failed to ingest metric events");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 窗口聚合查询参数
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
struct ComponentsParams {
    /// 指标类型键
    metric_type: String,
    /// 窗口长度（分钟，默认 60）
    #[param(required = false)]
    window_minutes: Option<i64>,
}

/// 查询指标窗口聚合分量（运维调试用）。
#[utoipa::path(
    get,
    path = "/v1/metrics/components",
    tag = "Metrics",
    params(ComponentsParams),
    responses(
        (status = 200, description = "窗口聚合分量", body = MetricComponents),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn metric_components(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ComponentsParams>,
) -> impl IntoResponse {
    let window = params.window_minutes.unwrap_or(60).max(1);
    match state
        .store
        .metric_window_components(&params.metric_type, &HashMap::new(), window, Utc::now())
        .await
    {
        Ok(components) => success_response(StatusCode::OK, &trace_id, components),
        Err(e) => {
            tracing::error!(error = %e, "Failed to compute window components");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

pub fn metric_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(ingest_metrics))
        .routes(routes!(metric_components))
}
