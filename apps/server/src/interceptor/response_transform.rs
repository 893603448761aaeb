//! # レスポンス変換インターセプタ
//!
//! 成功レスポンスを `{ "code": 200, "msg": "操作成功", "data": ... }` に包む。
//!
//! | レスポンス | 変換 |
//! |-----------|------|
//! | 2xx + JSON | `data` に元の JSON |
//! | 2xx + 空ボディ | `data: null`（204 は 200 にする） |
//! | 2xx + JSON 以外 | そのまま |
//! | エラー / `raw_response` なルート | そのまま |

use axum::{
    Json,
    body::Body,
    extract::Request,
    http::{StatusCode, header::CONTENT_LENGTH},
    middleware::Next,
    response::{IntoResponse, Response},
};
use kanri_shared::ApiResponse;

use super::is_json;
use crate::{error::AppError, policy::route_policy};

pub async fn response_transform(request: Request, next: Next) -> Response {
    let raw = route_policy(&request).raw_response;
    let response = next.run(request).await;
    if raw || !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => return AppError::Internal(format!("レスポンスボディを読み取れません: {e}")).into_response(),
    };

    let envelope = if bytes.is_empty() {
        ApiResponse::<serde_json::Value>::empty()
    } else if is_json(&parts.headers) {
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(data) => ApiResponse::success(data),
            Err(e) => {
                tracing::warn!(error = %e, "JSON として解釈できないためレスポンスを変換しません");
                return Response::from_parts(parts, Body::from(bytes));
            }
        }
    } else {
        return Response::from_parts(parts, Body::from(bytes));
    };

    if parts.status == StatusCode::NO_CONTENT {
        parts.status = StatusCode::OK;
    }
    parts.headers.remove(CONTENT_LENGTH);

    let transformed = Json(envelope).into_response();
    let (new_parts, new_body) = transformed.into_parts();
    parts.headers.extend(new_parts.headers);
    Response::from_parts(parts, new_body)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::StatusCode,
        middleware::from_fn,
        routing::get,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        policy::RoutePolicy,
        test_support::{bearer_request, body_json, with_policy},
    };

    fn create_test_app(policy: RoutePolicy) -> Router {
        let router = Router::new()
            .route("/json", get(|| async { Json(json!({ "rows": [1, 2], "total": 2 })) }))
            .route("/empty", get(|| async {}))
            .route("/no-content", get(|| async { StatusCode::NO_CONTENT }))
            .route("/text", get(|| async { "plain" }))
            .route("/error", get(|| async { AppError::forbidden() }))
            .layer(from_fn(response_transform));
        with_policy(router, policy)
    }

    async fn call(policy: RoutePolicy, uri: &str) -> Response {
        create_test_app(policy)
            .oneshot(bearer_request("GET", uri, None, Body::empty()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_jsonレスポンスを統一形式に包む() {
        let response = call(RoutePolicy::authenticated(), "/json").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "code": 200, "msg": "操作成功", "data": { "rows": [1, 2], "total": 2 } })
        );
    }

    #[tokio::test]
    async fn test_空ボディはdataをnullにする() {
        for uri in ["/empty", "/no-content"] {
            let response = call(RoutePolicy::authenticated(), uri).await;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                body_json(response).await,
                json!({ "code": 200, "msg": "操作成功", "data": null })
            );
        }
    }

    #[tokio::test]
    async fn test_json以外はそのまま返す() {
        let response = call(RoutePolicy::authenticated(), "/text").await;

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"plain");
    }

    #[tokio::test]
    async fn test_エラーレスポンスは変換しない() {
        let response = call(RoutePolicy::authenticated(), "/error").await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["code"], 403);
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_raw_responseのルートは変換しない() {
        let response = call(RoutePolicy::public().raw_response(), "/json").await;

        assert_eq!(body_json(response).await, json!({ "rows": [1, 2], "total": 2 }));
    }
}
