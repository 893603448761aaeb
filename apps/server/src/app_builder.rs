//! # アプリケーション構築
//!
//! ルート定義（ポリシー付き）とミドルウェアの積み上げを担当する。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。
//!
//! ## ミドルウェアの順序（外側から）
//!
//! ```text
//! CORS → SetRequestId → Trace → PropagateRequestId → exception_filter → CatchPanic
//!   → [静的ファイル]
//!   → attach_policy → throttle → jwt → preview → role → permission → repeat_submit
//!   → operation_log → RequestLog → response_transform → data_scope → handler
//! ```
//!
//! `axum` の `.layer()` は後に呼んだものほど外側になるため、コード上は逆順に並ぶ。
//! 静的ファイルはガードより後に `nest_service` するので認証を通らない。

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderName, Method, header},
    middleware::{from_fn, from_fn_with_state},
};
use kanri_domain::operation_log::BusinessType;
use kanri_shared::{
    observability::{MakeRequestUuidV7, REQUEST_ID_HEADER, make_request_span},
    request_log::RequestLogLayer,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    filter::exception_filter,
    guard::{
        jwt_guard,
        permission_guard,
        preview_guard,
        repeat_submit_guard,
        role_guard,
        throttle_guard,
    },
    handler::{
        clean_operation_logs,
        get_info,
        health_check,
        list_operation_logs,
        list_users,
        login,
        logout,
        readiness_check,
    },
    interceptor::{data_scope, operation_log, response_transform},
    policy::{PolicyRouter, RoutePolicy, RouteTable, attach_policy},
    state::AppState,
};

/// 操作ログ削除の重複送信とみなす間隔
const CLEAN_REPEAT_INTERVAL: Duration = Duration::from_secs(5);

/// 全ルートとそのポリシー
///
/// `prefix` は業務 API に付与する。ヘルスチェックは常に接頭辞なし。
pub fn routes(prefix: &str) -> PolicyRouter {
    let health = PolicyRouter::new("")
        .get("/health", health_check, RoutePolicy::public().raw_response())
        .get("/health/ready", readiness_check, RoutePolicy::public().raw_response());

    PolicyRouter::new(prefix)
        // 認証
        .post(
            "/login",
            login,
            RoutePolicy::public().throttled().allow_in_demo(),
        )
        .post("/logout", logout, RoutePolicy::public().allow_in_demo())
        .get("/getInfo", get_info, RoutePolicy::authenticated())
        // 操作ログ
        .get(
            "/monitor/operlog/list",
            list_operation_logs,
            RoutePolicy::authenticated().permission("monitor:operlog:list"),
        )
        .delete(
            "/monitor/operlog/clean",
            clean_operation_logs,
            RoutePolicy::authenticated()
                .permission("monitor:operlog:remove")
                .repeat_submit(CLEAN_REPEAT_INTERVAL)
                .operation_log("操作ログ", BusinessType::Clean),
        )
        // ユーザー管理
        .get(
            "/system/user/list",
            list_users,
            RoutePolicy::authenticated()
                .roles(["admin", "common"])
                .permission("system:user:list")
                .data_scope("d", "u"),
        )
        .merge(health)
}

/// ルーターを組み立てる
pub fn build_app(state: AppState) -> Router {
    let (router, table) = routes(&state.config.server.prefix).into_parts();
    build_router(state, router, table)
}

/// 任意のルートに本番と同じミドルウェアを積む
///
/// 結合テストで追加のルートを差し込むために公開している。
pub fn build_router(state: AppState, router: Router<AppState>, table: RouteTable) -> Router {
    tracing::info!(routes = table.len(), "ルートを登録しました");
    let table = Arc::new(table);

    let app = router
        .fallback(|| async { AppError::NotFound("リソースが見つかりません".to_string()) })
        // インターセプタ（内側から）
        .layer(from_fn(data_scope))
        .layer(from_fn(response_transform))
        .layer(RequestLogLayer)
        .layer(from_fn_with_state(state.clone(), operation_log))
        // ガード（内側から）
        .layer(from_fn_with_state(state.clone(), repeat_submit_guard))
        .layer(from_fn(permission_guard))
        .layer(from_fn(role_guard))
        .layer(from_fn_with_state(state.clone(), preview_guard))
        .layer(from_fn_with_state(state.clone(), jwt_guard))
        .layer(from_fn_with_state(state.clone(), throttle_guard))
        .layer(from_fn_with_state(table, attach_policy));

    let config = &state.config;
    let app = match config.static_prefix.as_deref() {
        Some(prefix) if !prefix.is_empty() && !config.upload_path.is_empty() => {
            tracing::info!(prefix, path = %config.upload_path, "静的ファイルを配信します");
            app.nest_service(prefix, ServeDir::new(&config.upload_path))
        }
        _ => app,
    };

    app.layer(CatchPanicLayer::new())
        .layer(from_fn(exception_filter))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
