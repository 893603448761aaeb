//! # Kanri インフラ層
//!
//! MySQL・Redis との接続と、ドメインモデルの永続化を担当する。
//!
//! ## 責務
//!
//! - **データベース接続**: MySQL 接続プールとマイグレーション
//! - **キャッシュ接続**: キャッシュ用・ジョブキュー用 Redis の接続管理
//! - **ログイントークン**: `LoginUser` の保存と失効
//! - **重複送信防止**: 短時間ロック
//! - **リポジトリ実装**: ユーザー、操作ログ
//!
//! ## モジュール構成
//!
//! - [`db`] - MySQL 接続プール
//! - [`redis`] - Redis 接続マネージャ
//! - [`error`] - インフラ層エラー定義
//! - [`token_store`] - ログイントークンストア
//! - [`submit_lock`] - 重複送信防止ロック
//! - [`password`] - パスワード検証
//! - [`repository`] - リポジトリ実装

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod password;
pub mod redis;
pub mod repository;
pub mod submit_lock;
pub mod token_store;

pub use error::{InfraError, InfraErrorKind};
pub use password::{Argon2PasswordChecker, PasswordChecker};
pub use submit_lock::{RedisSubmitLock, SubmitLock};
pub use token_store::{RedisTokenStore, TokenStore};
