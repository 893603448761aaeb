//! # エラーレスポンス
//!
//! 全例外フィルタが返す共通のエラーレスポンス構造体を提供する。
//!
//! ## 設計
//!
//! - `ErrorResponse` は純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - axum の `IntoResponse` 変換はサーバー側の責務（shared に axum 依存を入れない）
//! - `path` と `timestamp` は例外フィルタがリクエスト情報から埋める

use serde::{Deserialize, Serialize};

/// エラーレスポンス
///
/// `code` は HTTP ステータスと同じ値を持つ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
   pub code:      u16,
   pub msg:       String,
   #[serde(default)]
   pub path:      String,
   #[serde(default)]
   pub timestamp: String,
}

impl ErrorResponse {
   /// 汎用コンストラクタ
   pub fn new(code: u16, msg: impl Into<String>) -> Self {
      Self {
         code,
         msg: msg.into(),
         path: String::new(),
         timestamp: String::new(),
      }
   }

   /// リクエストパスとタイムスタンプを設定する
   pub fn at(mut self, path: impl Into<String>, timestamp: impl Into<String>) -> Self {
      self.path = path.into();
      self.timestamp = timestamp.into();
      self
   }

   /// 400 Bad Request
   pub fn bad_request(msg: impl Into<String>) -> Self {
      Self::new(400, msg)
   }

   /// 401 Unauthorized
   pub fn unauthorized(msg: impl Into<String>) -> Self {
      Self::new(401, msg)
   }

   /// 403 Forbidden
   pub fn forbidden(msg: impl Into<String>) -> Self {
      Self::new(403, msg)
   }

   /// 404 Not Found
   pub fn not_found(msg: impl Into<String>) -> Self {
      Self::new(404, msg)
   }

   /// 429 Too Many Requests
   pub fn too_many_requests(msg: impl Into<String>) -> Self {
      Self::new(429, msg)
   }

   /// 400 Validation Error
   pub fn validation_error(msg: impl Into<String>) -> Self {
      Self::new(400, msg)
   }

   /// 500 Internal Server Error
   ///
   /// msg は固定値（内部情報を漏らさないため）。
   pub fn internal_error() -> Self {
      Self::new(500, "内部エラーが発生しました")
   }

   /// 503 Service Unavailable
   pub fn service_unavailable(msg: impl Into<String>) -> Self {
      Self::new(503, msg)
   }
}
