//! # サーバーエラーハンドリング
//!
//! ガード・ハンドラが返すエラー型と、axum レスポンスへの変換。
//!
//! `AppError` はステータスと `ErrorResponse` ボディを持つレスポンスに変換され、
//! 同時に [`ErrorDetail`] をレスポンス拡張に格納する。
//! 最終的なボディ（パス・タイムスタンプ付き）は全例外フィルタ（[`crate::filter`]）が組み立てる。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kanri_domain::DomainError;
use kanri_infra::InfraError;
use kanri_shared::ErrorResponse;
use thiserror::Error;

/// 認証失敗時のメッセージ
pub const UNAUTHORIZED_MSG: &str = "ログインの有効期限が切れました。再度ログインしてください";

/// 権限不足時のメッセージ
pub const FORBIDDEN_MSG: &str = "この操作を実行する権限がありません";

/// デモ環境での書き込み拒否メッセージ
pub const DEMO_MODE_MSG: &str = "デモ環境では操作できません";

/// 重複送信時のメッセージ
pub const REPEAT_SUBMIT_MSG: &str = "重複送信は許可されていません。しばらくしてから再試行してください";

/// レート制限超過時のメッセージ
pub const TOO_MANY_REQUESTS_MSG: &str = "リクエストが多すぎます。しばらくしてから再試行してください";

/// サーバーのエラー型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{UNAUTHORIZED_MSG}")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{REPEAT_SUBMIT_MSG}")]
    RepeatSubmit,

    #[error("{TOO_MANY_REQUESTS_MSG}")]
    TooManyRequests,

    #[error("{DEMO_MODE_MSG}")]
    DemoMode,

    #[error("{0}")]
    BadRequest(String),

    #[error("インフラエラー: {0}")]
    Infra(#[from] InfraError),

    #[error("内部エラー: {0}")]
    Internal(String),
}

impl AppError {
    /// 既定メッセージの 403
    pub fn forbidden() -> Self {
        Self::Forbidden(FORBIDDEN_MSG.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::RepeatSubmit | Self::DemoMode => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Infra(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// レスポンスに載せてよいメッセージ
    ///
    /// 5xx は固定文言にする。
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            ErrorResponse::internal_error().msg
        } else {
            self.to_string()
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::NotFound { .. } => Self::NotFound(err.to_string()),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

/// エラーレスポンスの拡張情報
///
/// 全例外フィルタと操作ログインターセプタが参照する。
/// `internal` はログ専用でレスポンスには出さない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub msg:      String,
    pub internal: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = self.public_message();
        let internal = status.is_server_error().then(|| self.to_string());

        let mut response = (status, Json(ErrorResponse::new(status.as_u16(), msg.clone()))).into_response();
        response.extensions_mut().insert(ErrorDetail { msg, internal });
        response
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(AppError::Unauthorized, StatusCode::UNAUTHORIZED, UNAUTHORIZED_MSG)]
    #[case(AppError::forbidden(), StatusCode::FORBIDDEN, FORBIDDEN_MSG)]
    #[case(AppError::DemoMode, StatusCode::FORBIDDEN, DEMO_MODE_MSG)]
    #[case(AppError::RepeatSubmit, StatusCode::FORBIDDEN, REPEAT_SUBMIT_MSG)]
    #[case(AppError::TooManyRequests, StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS_MSG)]
    #[case(AppError::Validation("username: 必須です".into()), StatusCode::BAD_REQUEST, "username: 必須です")]
    #[case(AppError::Internal("pool timed out".into()), StatusCode::INTERNAL_SERVER_ERROR, "内部エラーが発生しました")]
    fn test_ステータスと公開メッセージ(
        #[case] error: AppError,
        #[case] status: StatusCode,
        #[case] msg: &str,
    ) {
        assert_eq!(error.status(), status);
        assert_eq!(error.public_message(), msg);
    }

    #[test]
    fn test_レスポンスにerror_detailが格納される() {
        let response = AppError::Internal("pool timed out".into()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.msg, "内部エラーが発生しました");
        assert_eq!(detail.internal.as_deref(), Some("内部エラー: pool timed out"));
    }

    #[test]
    fn test_4xxは内部情報を持たない() {
        let response = AppError::forbidden().into_response();

        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.internal, None);
    }

    #[test]
    fn test_ドメインエラーの変換() {
        let forbidden: AppError = DomainError::Forbidden("アカウントは停止されています".into()).into();
        let not_found: AppError = DomainError::NotFound {
            entity_type: "User",
            id:          "9".into(),
        }
        .into();

        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.public_message(), "アカウントは停止されています");
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
    }
}
