use crate::api::{
    engine_error_response, error_response, pagination, success_id_response,
    success_paginated_response, success_response,
};
use crate::identity::Identity;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use pulsemon_common::types::{Aggregation, AlertCondition, AlertRule, Severity};
use pulsemon_engine::validate::validate_rule;
use pulsemon_storage::RuleFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 告警规则详情
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleResponse {
    /// 规则唯一标识
    pub id: String,
    /// 规则名称
    pub name: String,
    /// 描述信息
    pub description: Option<String>,
    /// 指标类型键
    pub metric_type: String,
    /// 指标过滤条件（透传给指标源）
    pub metric_query: HashMap<String, String>,
    /// 比较条件
    pub condition: AlertCondition,
    /// 阈值
    pub threshold: f64,
    /// 百分比条件的基准值
    pub compare_value: Option<f64>,
    /// 评估时间窗口（分钟）
    pub time_window: i64,
    /// 聚合方式
    pub aggregation: Aggregation,
    /// 告警级别
    pub severity: Severity,
    /// 通知渠道键列表
    pub channels: Vec<String>,
    /// 邮件收件人列表
    pub recipients: Vec<String>,
    /// Webhook 地址
    pub webhook_url: Option<String>,
    /// 是否启用
    pub is_active: bool,
    /// 是否静默
    pub is_muted: bool,
    /// 静默截止时间（null 表示无限期）
    pub muted_until: Option<DateTime<Utc>>,
    /// 最近评估时间
    pub last_checked_at: Option<DateTime<Utc>>,
    /// 最近触发时间
    pub last_triggered_at: Option<DateTime<Utc>>,
    /// 累计触发次数
    pub trigger_count: i64,
    /// 创建人
    pub created_by_id: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl From<AlertRule> for RuleResponse {
    fn from(r: AlertRule) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            metric_type: r.metric_type,
            metric_query: r.metric_query,
            condition: r.condition,
            threshold: r.threshold,
            compare_value: r.compare_value,
            time_window: r.time_window_minutes,
            aggregation: r.aggregation,
            severity: r.severity,
            channels: r.channels,
            recipients: r.recipients,
            webhook_url: r.webhook_url,
            is_active: r.is_active,
            is_muted: r.is_muted,
            muted_until: r.muted_until,
            last_checked_at: r.last_checked_at,
            last_triggered_at: r.last_triggered_at,
            trigger_count: r.trigger_count,
            created_by_id: r.created_by_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// 告警规则列表查询参数
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
struct ListRulesParams {
    /// 是否启用精确匹配
    #[param(required = false)]
    is_active: Option<bool>,
    /// 告警级别精确匹配（INFO / WARNING / CRITICAL）
    #[param(required = false)]
    severity: Option<Severity>,
    /// 每页条数（默认 20）
    #[param(required = false)]
    limit: Option<u64>,
    /// 偏移量（默认 0）
    #[param(required = false)]
    offset: Option<u64>,
}

/// 分页查询告警规则（非管理员仅见本人创建的规则）。
#[utoipa::path(
    get,
    path = "/v1/rules",
    tag = "Rules",
    params(ListRulesParams),
    responses(
        (status = 200, description = "告警规则分页列表", body = Vec<RuleResponse>),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn list_rules(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Query(params): Query<ListRulesParams>,
) -> impl IntoResponse {
    let limit = pagination::resolve_limit(params.limit);
    let offset = pagination::resolve_offset(params.offset);
    let filter = RuleFilter {
        created_by_eq: (!identity.is_admin).then(|| identity.user_id.clone()),
        is_active_eq: params.is_active,
        severity_eq: params.severity,
    };

    let total = match state.store.count_rules(&filter).await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count rules");
            return storage_error(&trace_id);
        }
    };
    match state.store.list_rules(&filter, limit, offset).await {
        Ok(rules) => {
            let items: Vec<RuleResponse> = rules.into_iter().map(RuleResponse::from).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list rules");
            storage_error(&trace_id)
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct CreateRuleRequest {
    /// 规则名称（必填）
    name: String,
    /// 描述信息（可选）
    #[serde(default)]
    description: Option<String>,
    /// 指标类型键（必填，需已在指标目录注册）
    metric_type: String,
    /// 指标过滤条件（可选）
    #[serde(default)]
    metric_query: HashMap<String, String>,
    /// 比较条件（必填）
    condition: AlertCondition,
    /// 阈值（必填）
    threshold: f64,
    /// 百分比条件的基准值（百分比条件下必填）
    #[serde(default)]
    compare_value: Option<f64>,
    /// 评估时间窗口（分钟，必填）
    time_window: i64,
    /// 聚合方式（必填）
    aggregation: Aggregation,
    /// 告警级别（可选，默认 INFO）
    #[serde(default = "default_severity")]
    severity: Severity,
    /// 通知渠道键列表（可选）
    #[serde(default)]
    channels: Vec<String>,
    /// 邮件收件人列表（可选）
    #[serde(default)]
    recipients: Vec<String>,
    /// Webhook 地址（可选）
    #[serde(default)]
    webhook_url: Option<String>,
    /// 是否启用（可选，默认 true）
    #[serde(default = "default_is_active")]
    is_active: bool,
}

fn default_severity() -> Severity {
    Severity::Info
}
fn default_is_active() -> bool {
    true
}

/// 创建告警规则。
#[utoipa::path(
    post,
    path = "/v1/rules",
    tag = "Rules",
    request_body = CreateRuleRequest,
    responses(
        (status = 201, description = "告警规则已创建", body = crate::api::IdResponse),
        (status = 400, description = "规则定义非法", body = crate::api::ApiError),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn create_rule(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(req): Json<CreateRuleRequest>,
) -> impl IntoResponse {
    let now = Utc::now();
    let rule = AlertRule {
        id: pulsemon_common::id::next_id(),
        name: req.name,
        description: req.description,
        metric_type: req.metric_type,
        metric_query: req.metric_query,
        condition: req.condition,
        threshold: req.threshold,
        compare_value: req.compare_value,
        time_window_minutes: req.time_window,
        aggregation: req.aggregation,
        severity: req.severity,
        channels: req.channels,
        recipients: req.recipients,
        webhook_url: req.webhook_url,
        is_active: req.is_active,
        is_muted: false,
        muted_until: None,
        last_checked_at: None,
        last_triggered_at: None,
        trigger_count: 0,
        created_by_id: identity.user_id.clone(),
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = validate_rule(&rule) {
        return engine_error_response(&trace_id, e);
    }
    if !state.evaluator.catalog().has_metric(&rule.metric_type) {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            &format!("Unknown metric type '{}'", rule.metric_type),
        );
    }

    match state.store.insert_rule(&rule).await {
        Ok(created) => success_id_response(StatusCode::CREATED, &trace_id, created.id),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create rule");
            storage_error(&trace_id)
        }
    }
}

/// 获取单条告警规则详情。
#[utoipa::path(
    get,
    path = "/v1/rules/{id}",
    tag = "Rules",
    params(("id" = String, Path, description = "告警规则 ID")),
    responses(
        (status = 200, description = "告警规则详情", body = RuleResponse),
        (status = 401, description = "未认证", body = crate::api::ApiError),
        (status = 404, description = "规则不存在", body = crate::api::ApiError)
    )
)]
async fn get_rule(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_rule(&id).await {
        // Non-owners get the same 404 as a missing rule.
        Ok(Some(rule)) if identity.may_manage(&rule.created_by_id) => {
            success_response(StatusCode::OK, &trace_id, RuleResponse::from(rule))
        }
        Ok(_) => rule_not_found(&trace_id),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get rule");
            storage_error(&trace_id)
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct UpdateRuleRequest {
    /// 规则名称（可选）
    #[serde(default)]
    name: Option<String>,
    /// 描述信息（可选；传 null 清除）
    #[serde(default)]
    description: Option<Option<String>>,
    /// 指标类型键（可选）
    #[serde(default)]
    metric_type: Option<String>,
    /// 指标过滤条件（可选，整体替换）
    #[serde(default)]
    metric_query: Option<HashMap<String, String>>,
    /// 比较条件（可选）
    #[serde(default)]
    condition: Option<AlertCondition>,
    /// 阈值（可选）
    #[serde(default)]
    threshold: Option<f64>,
    /// 百分比条件的基准值（可选；传 null 清除）
    #[serde(default)]
    compare_value: Option<Option<f64>>,
    /// 评估时间窗口（分钟，可选）
    #[serde(default)]
    time_window: Option<i64>,
    /// 聚合方式（可选）
    #[serde(default)]
    aggregation: Option<Aggregation>,
    /// 告警级别（可选）
    #[serde(default)]
    severity: Option<Severity>,
    /// 通知渠道键列表（可选，整体替换）
    #[serde(default)]
    channels: Option<Vec<String>>,
    /// 邮件收件人列表（可选，整体替换）
    #[serde(default)]
    recipients: Option<Vec<String>>,
    /// Webhook 地址（可选；传 null 清除）
    #[serde(default)]
    webhook_url: Option<Option<String>>,
    /// 是否启用（可选）
    #[serde(default)]
    is_active: Option<bool>,
}

/// 更新告警规则（仅创建人或管理员）。
#[utoipa::path(
    put,
    path = "/v1/rules/{id}",
    tag = "Rules",
    params(("id" = String, Path, description = "告警规则 ID")),
    request_body = UpdateRuleRequest,
    responses(
        (status = 200, description = "告警规则已更新", body = crate::api::IdResponse),
        (status = 400, description = "规则定义非法", body = crate::api::ApiError),
        (status = 403, description = "非规则创建人", body = crate::api::ApiError),
        (status = 404, description = "规则不存在", body = crate::api::ApiError)
    )
)]
async fn update_rule(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRuleRequest>,
) -> impl IntoResponse {
    let mut rule = match state.store.get_rule(&id).await {
        Ok(Some(rule)) => rule,
        Ok(None) => return rule_not_found(&trace_id),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load rule");
            return storage_error(&trace_id);
        }
    };
    if !identity.may_manage(&rule.created_by_id) {
        return not_rule_owner(&trace_id);
    }

    if let Some(name) = req.name {
        rule.name = name;
    }
    if let Some(description) = req.description {
        rule.description = description;
    }
    if let Some(metric_type) = req.metric_type {
        rule.metric_type = metric_type;
    }
    if let Some(metric_query) = req.metric_query {
        rule.metric_query = metric_query;
    }
    if let Some(condition) = req.condition {
        rule.condition = condition;
    }
    if let Some(threshold) = req.threshold {
        rule.threshold = threshold;
    }
    if let Some(compare_value) = req.compare_value {
        rule.compare_value = compare_value;
    }
    if let Some(time_window) = req.time_window {
        rule.time_window_minutes = time_window;
    }
    if let Some(aggregation) = req.aggregation {
        rule.aggregation = aggregation;
    }
    if let Some(severity) = req.severity {
        rule.severity = severity;
    }
    if let Some(channels) = req.channels {
        rule.channels = channels;
    }
    if let Some(recipients) = req.recipients {
        rule.recipients = recipients;
    }
    if let Some(webhook_url) = req.webhook_url {
        rule.webhook_url = webhook_url;
    }
    if let Some(is_active) = req.is_active {
        rule.is_active = is_active;
    }

    if let Err(e) = validate_rule(&rule) {
        return engine_error_response(&trace_id, e);
    }
    if !state.evaluator.catalog().has_metric(&rule.metric_type) {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            &format!("Unknown metric type '{}'", rule.metric_type),
        );
    }

    match state.store.update_rule(&rule).await {
        Ok(Some(updated)) => success_id_response(StatusCode::OK, &trace_id, updated.id),
        Ok(None) => rule_not_found(&trace_id),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update rule");
            storage_error(&trace_id)
        }
    }
}

/// 删除告警规则（级联删除其告警历史；仅创建人或管理员）。
#[utoipa::path(
    delete,
    path = "/v1/rules/{id}",
    tag = "Rules",
    params(("id" = String, Path, description = "告警规则 ID")),
    responses(
        (status = 200, description = "告警规则已删除", body = crate::api::IdResponse),
        (status = 403, description = "非规则创建人", body = crate::api::ApiError),
        (status = 404, description = "规则不存在", body = crate::api::ApiError)
    )
)]
async fn delete_rule(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_rule(&id).await {
        Ok(Some(rule)) if !identity.may_manage(&rule.created_by_id) => {
            return not_rule_owner(&trace_id)
        }
        Ok(Some(_)) => {}
        Ok(None) => return rule_not_found(&trace_id),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load rule");
            return storage_error(&trace_id);
        }
    }

    match state.store.delete_rule(&id).await {
        Ok(true) => success_id_response(StatusCode::OK, &trace_id, id),
        Ok(false) => rule_not_found(&trace_id),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete rule");
            storage_error(&trace_id)
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct MuteRequest {
    /// 静默时长（分钟，可选；缺省为无限期静默）
    #[serde(default)]
    duration_minutes: Option<i64>,
}

/// 静默告警规则（可选时长，缺省为无限期）。
#[utoipa::path(
    post,
    path = "/v1/rules/{id}/mute",
    tag = "Rules",
    params(("id" = String, Path, description = "告警规则 ID")),
    request_body = MuteRequest,
    responses(
        (status = 200, description = "规则已静默", body = crate::api::IdResponse),
        (status = 403, description = "非规则创建人", body = crate::api::ApiError),
        (status = 404, description = "规则不存在", body = crate::api::ApiError)
    )
)]
async fn mute_rule(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MuteRequest>,
) -> impl IntoResponse {
    if let Some(response) = check_rule_ownership(&state, &identity, &trace_id, &id).await {
        return response;
    }
    match state.mute.mute(&id, req.duration_minutes, Utc::now()).await {
        Ok(()) => success_id_response(StatusCode::OK, &trace_id, id),
        Err(e) => engine_error_response(&trace_id, e),
    }
}

/// 解除告警规则静默。
#[utoipa::path(
    post,
    path = "/v1/rules/{id}/unmute",
    tag = "Rules",
    params(("id" = String, Path, description = "告警规则 ID")),
    responses(
        (status = 200, description = "规则已解除静默", body = crate::api::IdResponse),
        (status = 403, description = "非规则创建人", body = crate::api::ApiError),
        (status = 404, description = "规则不存在", body = crate::api::ApiError)
    )
)]
async fn unmute_rule(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Some(response) = check_rule_ownership(&state, &identity, &trace_id, &id).await {
        return response;
    }
    match state.mute.unmute(&id).await {
        Ok(()) => success_id_response(StatusCode::OK, &trace_id, id),
        Err(e) => engine_error_response(&trace_id, e),
    }
}

/// Returns an error response when the caller may not manage the rule
/// (or it is missing / unreadable), `None` when the operation may go on.
async fn check_rule_ownership(
    state: &AppState,
    identity: &Identity,
    trace_id: &str,
    rule_id: &str,
) -> Option<Response> {
    match state.store.get_rule(rule_id).await {
        Ok(Some(rule)) if identity.may_manage(&rule.created_by_id) => None,
        Ok(Some(_)) => Some(not_rule_owner(trace_id)),
        Ok(None) => Some(rule_not_found(trace_id)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load rule");
            Some(storage_error(trace_id))
        }
    }
}

fn rule_not_found(trace_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        trace_id,
        "not_found",
        "Rule not found",
    )
}

fn not_rule_owner(trace_id: &str) -> Response {
    error_response(
        StatusCode::FORBIDDEN,
        trace_id,
        "forbidden",
        "Only the rule creator or an administrator may manage this rule",
    )
}

fn storage_error(trace_id: &str) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        trace_id,
        "storage_error",
        "Database error",
    )
}

pub fn rule_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_rules, create_rule))
        .routes(routes!(get_rule, update_rule, delete_rule))
        .routes(routes!(mute_rule))
        .routes(routes!(unmute_rule))
}
