//! # ガード
//!
//! ハンドラに到達する前にリクエストを許可・拒否するミドルウェア群。
//! 各ガードは [`crate::policy::route_policy`] でルートのポリシーを参照する。
//!
//! ## 実行順序（外側から）
//!
//! ```text
//! throttle → jwt → preview → role → permission → repeat_submit → (インターセプタ) → handler
//! ```
//!
//! - `throttle`: IP 単位のレート制限（`throttled` なルートのみ）
//! - `jwt`: ログインユーザーの解決（公開ルートは素通り）
//! - `preview`: デモ環境での書き込み拒否
//! - `role` / `permission`: ロール・権限の any-of 判定
//! - `repeat_submit`: 同一内容の連続送信の拒否

pub mod jwt;
pub mod permission;
pub mod preview;
pub mod repeat_submit;
pub mod role;
pub mod throttle;

pub use jwt::{CurrentUser, jwt_guard};
pub use permission::permission_guard;
pub use preview::preview_guard;
pub use repeat_submit::repeat_submit_guard;
pub use role::role_guard;
pub use throttle::{Throttler, throttle_guard};

use axum::http::Method;

/// 状態を変更しないメソッドか
pub(crate) fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
