//! # JWT 認証ガード
//!
//! `Authorization: Bearer <token>` を検証し、トークンストアからログインユーザーを取り出して
//! リクエスト拡張に格納する。
//!
//! - 公開ルートは検証しない
//! - トークン欠落・署名不正・ストア上の失効はすべて 401
//! - 残り有効期間が [`REFRESH_THRESHOLD`] を切っていれば TTL を延長する

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use kanri_domain::user::LoginUser;

use crate::{error::AppError, jwt::bearer_token, policy::route_policy, state::AppState};

/// この残り時間を切ったトークンは延長する
pub const REFRESH_THRESHOLD: chrono::Duration = chrono::Duration::minutes(20);

pub async fn jwt_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if route_policy(&request).public {
        return Ok(next.run(request).await);
    }

    let user = authenticate(&state, request.headers()).await?;
    tracing::Span::current().record("user_id", user.user_id.value());
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

async fn authenticate(state: &AppState, headers: &axum::http::HeaderMap) -> Result<LoginUser, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    let claims = state.jwt.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "JWT の検証に失敗しました");
        AppError::Unauthorized
    })?;

    let mut user = state
        .token_store
        .get(&claims.uuid)
        .await?
        .ok_or(AppError::Unauthorized)?;
    if user.user_id.value() != claims.user_id {
        tracing::warn!(
            claims.user_id = claims.user_id,
            stored.user_id = user.user_id.value(),
            "JWT とトークンストアのユーザーが一致しません"
        );
        return Err(AppError::Unauthorized);
    }

    let now = state.clock.now();
    if user.remaining(now) < REFRESH_THRESHOLD {
        let ttl = state.token_ttl();
        let chrono_ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::Internal(format!("トークン TTL が範囲外です: {e}")))?;
        user.refresh(now, chrono_ttl);
        state.token_store.save(&user, ttl).await?;
        tracing::debug!(user_id = user.user_id.value(), "トークンの有効期限を延長しました");
    }

    Ok(user)
}

/// JWT ガードが格納したログインユーザー
///
/// ガードを通っていない（公開ルートなど）場合は 401。
#[derive(Debug, Clone)]
pub struct CurrentUser(pub LoginUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<LoginUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}
