//! # 全例外フィルタ
//!
//! エラーレスポンスを `{ code, msg, path, timestamp }` 形式にそろえるミドルウェア。
//!
//! 対象:
//! - [`ErrorDetail`] を持つレスポンス（`AppError` 由来）
//! - `ErrorDetail` を持たない JSON 以外の 4xx / 5xx
//!   （フォールバックの 404、405、エクストラクタの拒否、パニック由来の 500）
//!
//! 5xx は内部情報を出さず固定文言にし、`error` レベルで記録する。4xx は `warn`。

use axum::{
    Json,
    body::Body,
    extract::Request,
    http::{
        StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use kanri_shared::ErrorResponse;

use crate::{error::ErrorDetail, interceptor::is_json};

/// 4xx のボディをメッセージとして採用する上限
const MAX_REJECTION_BODY: usize = 64 * 1024;

pub async fn exception_filter(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let detail = response.extensions().get::<ErrorDetail>().cloned();
    if detail.is_none() && is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let msg = if status.is_server_error() {
        ErrorResponse::internal_error().msg
    } else if let Some(detail) = &detail {
        detail.msg.clone()
    } else {
        rejection_message(status, body).await
    };

    if status.is_server_error() {
        let internal = detail
            .as_ref()
            .and_then(|d| d.internal.clone())
            .unwrap_or_else(|| status.to_string());
        tracing::error!(
            http.method = %method,
            http.path = %path,
            http.status_code = status.as_u16(),
            error.message = %internal,
            "サーバーエラーが発生しました"
        );
    } else {
        tracing::warn!(
            http.method = %method,
            http.path = %path,
            http.status_code = status.as_u16(),
            error.message = %msg,
            "リクエストを拒否しました"
        );
    }

    let error = ErrorResponse::new(status.as_u16(), msg).at(path, chrono::Utc::now().to_rfc3339());
    let (new_parts, new_body) = Json(error).into_response().into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    parts.headers.remove(CONTENT_TYPE);
    parts.headers.extend(new_parts.headers);
    Response::from_parts(parts, new_body)
}

/// `ErrorDetail` のない 4xx のメッセージ
///
/// エクストラクタの拒否理由などボディにテキストがあればそれを使う。
async fn rejection_message(status: StatusCode, body: Body) -> String {
    let text = axum::body::to_bytes(body, MAX_REJECTION_BODY)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();
    if !text.is_empty() {
        return text;
    }
    match status {
        StatusCode::NOT_FOUND => "リソースが見つかりません".to_string(),
        StatusCode::METHOD_NOT_ALLOWED => "許可されていない HTTP メソッドです".to_string(),
        other => other
            .canonical_reason()
            .unwrap_or("リクエストが不正です")
            .to_string(),
    }
}
