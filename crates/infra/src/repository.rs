//! # リポジトリ実装
//!
//! MySQL に対する読み書きをトレイトで抽象化し、サーバー側からはトレイトオブジェクトとして扱う。

pub mod operation_log_repository;
pub mod user_repository;

pub use operation_log_repository::{MySqlOperationLogRepository, OperationLogRepository};
pub use user_repository::{MySqlUserRepository, UserListQuery, UserListRow, UserRepository};
