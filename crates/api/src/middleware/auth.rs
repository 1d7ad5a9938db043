use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::Response,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::AuthUser;
use crate::AppState;

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        use axum::response::IntoResponse;

        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ApiError::Unauthenticated.into_response()),
        };

        let row = sqlx::query_as::<_, (String, String, String, String)>(
            r#"SELECT u.id, u.name, u.role, s.expires_at
               FROM "session" s
               JOIN "user" u ON u.id = s.user_id
               WHERE s.token = ?"#,
        )
        .bind(token)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| ApiError::Store(e).into_response())?;

        let (id, name, role, expires_at) = match row {
            Some(r) => r,
            None => return Err(ApiError::Unauthenticated.into_response()),
        };

        let now = chrono::Utc::now().to_rfc3339();
        if expires_at < now {
            return Err(ApiError::Unauthenticated.into_response());
        }

        Ok(AuthUser { id, name, role })
    }
}
