//! # ロールガード
//!
//! ルートに必要ロールが設定されていれば、いずれかを保持しているか判定する。
//! 超級管理者（`admin`）は常に通過する。

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use kanri_domain::user::LoginUser;

use crate::{error::AppError, policy::route_policy};

pub async fn role_guard(request: Request, next: Next) -> Result<Response, AppError> {
    let policy = route_policy(&request);
    if policy.public || policy.roles.is_empty() {
        return Ok(next.run(request).await);
    }

    let user = request
        .extensions()
        .get::<LoginUser>()
        .ok_or(AppError::Unauthorized)?;
    if !user.has_any_role(&policy.roles) {
        tracing::info!(
            user_id = user.user_id.value(),
            required = ?policy.roles,
            "必要なロールを保持していません"
        );
        return Err(AppError::forbidden());
    }

    Ok(next.run(request).await)
}
