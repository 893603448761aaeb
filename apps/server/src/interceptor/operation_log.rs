//! # 操作ログインターセプタ
//!
//! `operation_log(title, business_type)` なルートについて、リクエストパラメータ・レスポンス・
//! 処理時間を記録した [`OperationLog`] を非同期に保存する。
//!
//! - パラメータとレスポンスは最大 [`MAX_LOGGED_CHARS`] 文字
//! - JSON ボディ中のパスワード類はマスクする
//! - 保存の失敗はログに出すだけで、レスポンスには影響させない

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use kanri_domain::{
    operation_log::{MAX_LOGGED_CHARS, OperStatus, OperationLog, truncate_chars},
    user::LoginUser,
};
use tracing::Instrument as _;

use super::is_json;
use crate::{
    client_ip::client_ip,
    error::{AppError, ErrorDetail},
    guard::repeat_submit::MAX_BUFFERED_BODY,
    policy::route_policy,
    state::AppState,
};

/// 記録時にマスクする JSON キー
const SENSITIVE_KEYS: &[&str] = &["password", "oldPassword", "newPassword", "confirmPassword"];

const MASK: &str = "******";

pub async fn operation_log(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(meta) = route_policy(&request).operation_log.clone() else {
        return next.run(request).await;
    };

    let started = std::time::Instant::now();
    let oper_time = state.clock.now();
    let oper_ip = client_ip(&request, state.config.trust_proxy);
    let oper_name = request
        .extensions()
        .get::<LoginUser>()
        .map(|u| u.user_name.clone())
        .unwrap_or_default();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let (parts, body) = request.into_parts();
    let request_bytes = match axum::body::to_bytes(body, MAX_BUFFERED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::BadRequest(format!("リクエストボディを読み取れません: {e}")).into_response();
        }
    };
    let oper_param = if meta.save_request_data {
        request_params(parts.uri.query(), &request_bytes)
    } else {
        String::new()
    };
    let request_method = parts.method.to_string();
    let oper_url = parts.uri.path().to_string();

    let response = next.run(Request::from_parts(parts, Body::from(request_bytes))).await;

    let (parts, body) = response.into_parts();
    let response_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::Internal(format!("レスポンスボディを読み取れません: {e}")).into_response();
        }
    };

    let failed = parts.status.is_client_error() || parts.status.is_server_error();
    let error_msg = if failed {
        parts
            .extensions
            .get::<ErrorDetail>()
            .map(|d| d.internal.clone().unwrap_or_else(|| d.msg.clone()))
            .unwrap_or_else(|| parts.status.to_string())
    } else {
        String::new()
    };
    let json_result = if meta.save_response_data && is_json(&parts.headers) {
        truncate_chars(&String::from_utf8_lossy(&response_bytes), MAX_LOGGED_CHARS)
    } else {
        String::new()
    };

    let log = OperationLog {
        oper_id: None,
        title: meta.title.to_string(),
        business_type: meta.business_type,
        method: format!("{request_method} {route}"),
        request_method,
        oper_name,
        oper_url,
        oper_ip,
        oper_param,
        json_result,
        status: if failed { OperStatus::Failure } else { OperStatus::Success },
        error_msg: truncate_chars(&error_msg, MAX_LOGGED_CHARS),
        oper_time,
        cost_time: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
    };

    let repository = state.operation_log_repository.clone();
    tokio::spawn(
        async move {
            if let Err(e) = repository.insert(&log).await {
                tracing::error!(
                    error.category = "infrastructure",
                    error.kind = "operation_log",
                    title = %log.title,
                    "操作ログの保存に失敗しました: {}",
                    e
                );
            }
        }
        .instrument(tracing::Span::current()),
    );

    Response::from_parts(parts, Body::from(response_bytes))
}

/// クエリ文字列とボディを 1 つの記録用文字列にまとめる
fn request_params(query: Option<&str>, body: &[u8]) -> String {
    let mut params = Vec::new();
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        params.push(query.to_string());
    }
    if !body.is_empty() {
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(mut value) => {
                mask_sensitive(&mut value);
                params.push(value.to_string());
            }
            Err(_) => params.push(String::from_utf8_lossy(body).into_owned()),
        }
    }
    truncate_chars(&params.join(" "), MAX_LOGGED_CHARS)
}

fn mask_sensitive(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if SENSITIVE_KEYS.contains(&key.as_str()) {
                    *v = serde_json::Value::String(MASK.to_string());
                } else {
                    mask_sensitive(v);
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(mask_sensitive),
        _ => {}
    }
}
