//! # インターセプタ
//!
//! ハンドラの実行を包むミドルウェア群。すべてガードの内側に配置する。
//!
//! ## 実行順序（外側から）
//!
//! ```text
//! operation_log → RequestLogLayer → response_transform → data_scope → handler
//! ```
//!
//! 操作ログは統一形式に変換済みのレスポンスを記録する。

pub mod data_scope;
pub mod operation_log;
pub mod response_transform;

pub use data_scope::data_scope;
pub use operation_log::operation_log;
pub use response_transform::response_transform;

use axum::http::{HeaderMap, header::CONTENT_TYPE};

/// `Content-Type` が JSON か
pub(crate) fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            let mime = v.split(';').next().unwrap_or_default().trim();
            mime == "application/json" || mime.ends_with("+json")
        })
}
