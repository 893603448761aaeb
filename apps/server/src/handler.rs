//! # HTTP リクエストハンドラ
//!
//! 各ハンドラはサブモジュールに配置し、親モジュールで re-export する。
//! 認証・認可・レスポンス形式はガードとインターセプタが担うため、ハンドラは素の JSON を返す。
//!
//! ## ハンドラ一覧
//!
//! - `health`: ヘルスチェック
//! - `auth`: ログイン、ログアウト、ログインユーザー情報
//! - `operlog`: 操作ログの検索と削除
//! - `user`: ユーザー一覧

pub mod auth;
pub mod health;
pub mod operlog;
pub mod user;

pub use auth::{get_info, login, logout};
pub use health::{MySqlProbe, ReadinessProbe, RedisProbe, health_check, readiness_check};
pub use operlog::{clean_operation_logs, list_operation_logs};
pub use user::list_users;
