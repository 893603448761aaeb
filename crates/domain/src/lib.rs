//! # Kanri ドメイン層
//!
//! 管理バックエンドの認証・認可・操作ログに関わるドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! server → infra → domain
//!    ↘
//!      shared
//! ```
//!
//! ドメイン層はインフラ層（DB、Redis）に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`user`] - ユーザー ID とログインユーザー（トークンに紐づくセッション）
//! - [`role`] - ロールと権限文字列のマッチング
//! - [`data_scope`] - ロールのデータ権限から SQL 条件を組み立てる
//! - [`operation_log`] - 操作ログ
//! - [`password`] - パスワード関連の値オブジェクト
//! - [`clock`] - 時刻プロバイダ

#[macro_use]
mod macros;

pub mod clock;
pub mod data_scope;
pub mod error;
pub mod operation_log;
pub mod password;
pub mod role;
pub mod user;

pub use error::DomainError;
