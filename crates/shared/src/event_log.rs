//! # ビジネスイベントログとエラーコンテキストのフィールド定数
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` が付与されるので、
//! JSON ログを `jq 'select(.["event.kind"] == "business_event")'` で絞り込める。
//!
//! ## エラーコンテキスト
//!
//! `tracing::error!` に `error.category` と `error.kind` を付ける。定数は [`error`] を使う。

/// ビジネスイベントを `info` レベルで出力する
///
/// 慣例として `event.category`・`event.action`・`event.result` を必ず付け、
/// 対象があれば `event.entity_type`・`event.entity_id` も付ける。
///
/// ```
/// use kanri_shared::{event_log::event, log_business_event};
///
/// log_business_event!(
///     event.category = event::category::AUTH,
///     event.action = event::action::LOGOUT,
///     event.result = event::result::SUCCESS,
///     "ログアウト"
/// );
/// ```
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの値
pub mod event {
    pub mod category {
        pub const AUTH: &str = "auth";
        pub const OPERATION_LOG: &str = "operation_log";
    }

    pub mod action {
        pub const LOGIN_SUCCESS: &str = "auth.login_success";
        pub const LOGIN_FAILURE: &str = "auth.login_failure";
        pub const LOGOUT: &str = "auth.logout";
        pub const OPERATION_LOG_CLEANED: &str = "operation_log.cleaned";
    }

    pub mod entity_type {
        pub const USER: &str = "user";
        pub const OPERATION_LOG: &str = "operation_log";
    }

    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの値
pub mod error {
    pub mod category {
        /// MySQL・Redis
        pub const INFRASTRUCTURE: &str = "infrastructure";
    }

    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const TOKEN_STORE: &str = "token_store";
        pub const OPERATION_LOG: &str = "operation_log";
        pub const PASSWORD_VERIFICATION: &str = "password_verification";
    }
}
