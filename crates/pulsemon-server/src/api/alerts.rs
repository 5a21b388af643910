use crate::api::{
    engine_error_response, error_response, pagination, success_paginated_response,
    success_response,
};
use crate::identity::Identity;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use pulsemon_common::types::{Alert, AlertStatus, Severity};
use pulsemon_storage::AlertFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 告警事件详情
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    /// 告警唯一标识
    pub id: String,
    /// 触发规则 ID
    pub rule_id: String,
    /// 触发时的指标值（快照）
    pub metric_value: f64,
    /// 触发时的阈值（快照）
    pub threshold: f64,
    /// 告警状态
    pub status: AlertStatus,
    /// 触发时间
    pub triggered_at: DateTime<Utc>,
    /// 通知完成时间
    pub notified_at: Option<DateTime<Utc>>,
    /// 渠道投递状态
    pub notification_status: HashMap<String, String>,
    /// 确认人
    pub acknowledged_by_id: Option<String>,
    /// 确认时间
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// 处理说明
    pub resolution: Option<String>,
    /// 解决时间
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<Alert> for AlertResponse {
    fn from(a: Alert) -> Self {
        Self {
            id: a.id,
            rule_id: a.rule_id,
            metric_value: a.metric_value,
            threshold: a.threshold,
            status: a.status,
            triggered_at: a.triggered_at,
            notified_at: a.notified_at,
            notification_status: a.notification_status,
            acknowledged_by_id: a.acknowledged_by_id,
            acknowledged_at: a.acknowledged_at,
            resolution: a.resolution,
            resolved_at: a.resolved_at,
        }
    }
}

/// 告警事件列表查询参数
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
struct ListAlertsParams {
    /// 告警状态精确匹配（TRIGGERED / ACKNOWLEDGED / RESOLVED）
    #[param(required = false)]
    status: Option<AlertStatus>,
    /// 告警级别精确匹配（INFO / WARNING / CRITICAL）
    #[param(required = false)]
    severity: Option<Severity>,
    /// 规则 ID 精确匹配
    #[param(required = false)]
    rule_id: Option<String>,
    /// 触发时间下界
    #[param(required = false)]
    from: Option<DateTime<Utc>>,
    /// 触发时间上界
    #[param(required = false)]
    to: Option<DateTime<Utc>>,
    /// 每页条数（默认 20）
    #[param(required = false)]
    limit: Option<u64>,
    /// 偏移量（默认 0）
    #[param(required = false)]
    offset: Option<u64>,
}

/// 分页查询告警事件（按状态、级别、规则、时间范围过滤）。
/// 默认排序：`triggeredAt` 倒序。
#[utoipa::path(
    get,
    path = "/v1/alerts",
    tag = "Alerts",
    params(ListAlertsParams),
    responses(
        (status = 200, description = "告警事件分页列表", body = Vec<AlertResponse>),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn list_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ListAlertsParams>,
) -> impl IntoResponse {
    let limit = pagination::resolve_limit(params.limit);
    let offset = pagination::resolve_offset(params.offset);
    let filter = AlertFilter {
        status_eq: params.status,
        severity_eq: params.severity,
        rule_id_eq: params.rule_id,
        triggered_from: params.from,
        triggered_to: params.to,
    };

    let total = match state.store.count_alerts(&filter).await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count alerts");
            return storage_error(&trace_id);
        }
    };
    match state.store.list_alerts(&filter, limit, offset).await {
        Ok(alerts) => {
            let items: Vec<AlertResponse> = alerts.into_iter().map(AlertResponse::from).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list alerts");
            storage_error(&trace_id)
        }
    }
}

/// 告警统计摘要
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct AlertStatsResponse {
    /// 告警总数
    total_alerts: u64,
    /// 未处理告警数
    triggered_alerts: u64,
    /// 已确认告警数
    acknowledged_alerts: u64,
    /// 已解决告警数
    resolved_alerts: u64,
    /// 按级别分组的告警数
    alerts_by_severity: Vec<SeverityCountResponse>,
    /// 最近 24 小时触发的告警数
    alerts_last24_hours: u64,
}

/// 按级别分组的计数
#[derive(Serialize, ToSchema)]
struct SeverityCountResponse {
    /// 告警级别
    severity: String,
    /// 数量
    count: u64,
}

/// 告警统计摘要。
#[utoipa::path(
    get,
    path = "/v1/alerts/stats",
    tag = "Alerts",
    responses(
        (status = 200, description = "告警统计摘要", body = AlertStatsResponse),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn alert_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let result: Result<AlertStatsResponse, pulsemon_storage::StorageError> = async {
        let total_alerts = state.store.count_all_alerts().await?;
        let triggered_alerts = state
            .store
            .count_alerts_by_status(AlertStatus::Triggered)
            .await?;
        let acknowledged_alerts = state
            .store
            .count_alerts_by_status(AlertStatus::Acknowledged)
            .await?;
        let resolved_alerts = state
            .store
            .count_alerts_by_status(AlertStatus::Resolved)
            .await?;
        let alerts_by_severity = state
            .store
            .count_alerts_by_severity()
            .await?
            .into_iter()
            .map(|c| SeverityCountResponse {
                severity: c.severity,
                count: c.count.max(0) as u64,
            })
            .collect();
        let alerts_last24_hours = state
            .store
            .count_alerts_since(Utc::now() - Duration::hours(24))
            .await?;
        Ok(AlertStatsResponse {
            total_alerts,
            triggered_alerts,
            acknowledged_alerts,
            resolved_alerts,
            alerts_by_severity,
            alerts_last24_hours,
        })
    }
    .await;

    match result {
        Ok(stats) => success_response(StatusCode::OK, &trace_id, stats),
        Err(e) => {
            tracing::error!(error = %e, "Failed to compute alert stats");
            storage_error(&trace_id)
        }
    }
}

/// 获取单个告警事件详情。
#[utoipa::path(
    get,
    path = "/v1/alerts/{id}",
    tag = "Alerts",
    params(("id" = String, Path, description = "告警事件 ID")),
    responses(
        (status = 200, description = "告警事件详情", body = AlertResponse),
        (status = 401, description = "未认证", body = crate::api::ApiError),
        (status = 404, description = "告警不存在", body = crate::api::ApiError)
    )
)]
async fn get_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_alert(&id).await {
        Ok(Some(alert)) => success_response(StatusCode::OK, &trace_id, AlertResponse::from(alert)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Alert not found",
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get alert");
            storage_error(&trace_id)
        }
    }
}

/// 确认告警（仅限 TRIGGERED 状态）。
#[utoipa::path(
    post,
    path = "/v1/alerts/{id}/acknowledge",
    tag = "Alerts",
    params(("id" = String, Path, description = "告警事件 ID")),
    responses(
        (status = 200, description = "告警已确认", body = AlertResponse),
        (status = 400, description = "状态不允许确认", body = crate::api::ApiError),
        (status = 404, description = "告警不存在", body = crate::api::ApiError)
    )
)]
async fn acknowledge_alert(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state
        .lifecycle
        .acknowledge(&id, &identity.user_id, Utc::now())
        .await
    {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, AlertResponse::from(alert)),
        Err(e) => engine_error_response(&trace_id, e),
    }
}

#[derive(Deserialize, ToSchema)]
struct ResolveRequest {
    /// 处理说明（可选）
    #[serde(default)]
    resolution: Option<String>,
}

/// 解决告警（TRIGGERED 或 ACKNOWLEDGED 状态）。
#[utoipa::path(
    post,
    path = "/v1/alerts/{id}/resolve",
    tag = "Alerts",
    params(("id" = String, Path, description = "告警事件 ID")),
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "告警已解决", body = AlertResponse),
        (status = 400, description = "告警已是解决状态", body = crate::api::ApiError),
        (status = 404, description = "告警不存在", body = crate::api::ApiError)
    )
)]
async fn resolve_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> impl IntoResponse {
    match state
        .lifecycle
        .resolve(&id, req.resolution, Utc::now())
        .await
    {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, AlertResponse::from(alert)),
        Err(e) => engine_error_response(&trace_id, e),
    }
}

fn storage_error(trace_id: &str) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        trace_id,
        "storage_error",
        "Database error",
    )
}

pub fn alert_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_alerts))
        .routes(routes!(alert_stats))
        .routes(routes!(get_alert))
        .routes(routes!(acknowledge_alert))
        .routes(routes!(resolve_alert))
}
