use crate::api::error_response;
use crate::logging::TraceId;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

/// Caller identity as asserted by the authenticating gateway in front of
/// this service. The engine itself is ownership-agnostic; handlers use
/// this for the rule-ownership checks.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub is_admin: bool,
}

impl Identity {
    /// Owner-or-admin check used by the non-list rule operations.
    pub fn may_manage(&self, owner_id: &str) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

/// Requires the gateway-injected `x-user-id` header and exposes it (plus
/// the admin flag from `x-user-role`) as an [`Identity`] extension.
pub async fn require_identity(mut req: Request, next: Next) -> Response {
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    let user_id = req
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let Some(user_id) = user_id else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            &trace_id,
            "unauthorized",
            "Missing x-user-id header",
        );
    };

    let is_admin = req
        .headers()
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.eq_ignore_ascii_case("admin"));

    req.extensions_mut().insert(Identity {
        user_id: user_id.to_string(),
        is_admin,
    });
    next.run(req).await
}
