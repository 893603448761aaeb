//! # 権限ガード
//!
//! ルートに必要権限が設定されていれば、保持権限のいずれかがそれを満たすか判定する。
//! 判定規則は [`kanri_domain::role::Permission::satisfies`] を参照。

use axum::{extract::Request, middleware::Next, response::Response};
use kanri_domain::{role::has_any_permission, user::LoginUser};

use crate::{error::AppError, policy::route_policy};

pub async fn permission_guard(request: Request, next: Next) -> Result<Response, AppError> {
    let policy = route_policy(&request);
    if policy.public || policy.permissions.is_empty() {
        return Ok(next.run(request).await);
    }

    let user = request
        .extensions()
        .get::<LoginUser>()
        .ok_or(AppError::Unauthorized)?;
    if !has_any_permission(&user.permissions, &policy.permissions) {
        tracing::info!(
            user_id = user.user_id.value(),
            required = ?policy.permissions,
            "必要な権限を保持していません"
        );
        return Err(AppError::forbidden());
    }

    Ok(next.run(request).await)
}
