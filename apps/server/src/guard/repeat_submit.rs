//! # 重複送信防止ガード
//!
//! `repeat_submit(interval)` なルートへの書き込みリクエストについて、
//! 同じユーザーが同じ内容を `interval` 以内に再送した場合は 403 で拒否する。
//!
//! 内容の同一性は `sha256(ユーザー ID | メソッド | パス | クエリ | ボディ)` で判定し、
//! Redis の `SET NX PX` でロックを取る。ボディは読み取ったあとハンドラ用に戻す。

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use kanri_domain::user::LoginUser;
use sha2::{Digest, Sha256};

use super::is_safe_method;
use crate::{error::AppError, policy::route_policy, state::AppState};

/// バッファするボディの上限
pub const MAX_BUFFERED_BODY: usize = 10 * 1024 * 1024;

pub async fn repeat_submit_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(interval) = route_policy(&request).repeat_submit else {
        return Ok(next.run(request).await);
    };
    if is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BUFFERED_BODY)
        .await
        .map_err(|e| AppError::BadRequest(format!("リクエストボディを読み取れません: {e}")))?;

    let user_id = parts
        .extensions
        .get::<LoginUser>()
        .map(|u| u.user_id.to_string())
        .unwrap_or_else(|| "anonymous".to_string());
    let key = fingerprint(
        &user_id,
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query().unwrap_or_default(),
        &bytes,
    );

    if !state.submit_lock.try_acquire(&key, interval).await? {
        tracing::info!(user_id = %user_id, path = parts.uri.path(), "重複送信を拒否しました");
        return Err(AppError::RepeatSubmit);
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

/// リクエスト内容のフィンガープリント（16 進数の SHA-256）
pub fn fingerprint(user_id: &str, method: &str, path: &str, query: &str, body: &Bytes) -> String {
    let mut hasher = Sha256::new();
    for part in [user_id.as_bytes(), method.as_bytes(), path.as_bytes(), query.as_bytes()] {
        hasher.update(part);
        hasher.update(b"|");
    }
    hasher.update(body);
    hex::encode(hasher.finalize())
}
