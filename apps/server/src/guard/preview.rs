//! # デモ環境ガード
//!
//! `IS_DEMO_ENVIRONMENT=DemoEnvironment` のとき、参照系以外のリクエストを 403 で拒否する。
//! ログインなど `allow_in_demo` なルートは対象外。

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::is_safe_method;
use crate::{error::AppError, policy::route_policy, state::AppState};

pub async fn preview_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.config.is_demo_environment
        && !is_safe_method(request.method())
        && !route_policy(&request).allow_in_demo
    {
        return Err(AppError::DemoMode);
    }
    Ok(next.run(request).await)
}
