//! # Redis 接続管理
//!
//! キャッシュ用とジョブキュー用の 2 系統の Redis に接続する。
//! どちらも自動再接続する [`ConnectionManager`] を使い、Clone して各リポジトリで共有する。
//!
//! ## キー設計
//!
//! | キー | 値 | 用途 |
//! |-----|-----|-----|
//! | `login_tokens:{uuid}` | `LoginUser` (JSON) | ログイントークン |
//! | `repeat_submit:{fingerprint}` | `"1"` | 重複送信防止ロック |

use redis::{Client, aio::ConnectionManager};

/// Redis 接続マネージャを作成する
///
/// `redis_url` の形式は `redis://[:password@]host:port/db`。
pub async fn create_connection_manager(
   redis_url: &str,
) -> Result<ConnectionManager, redis::RedisError> {
   let client = Client::open(redis_url)?;
   ConnectionManager::new(client).await
}

/// `PING` を送り、疎通を確認する
pub async fn ping(conn: &ConnectionManager) -> Result<(), redis::RedisError> {
   let mut conn = conn.clone();
   let _: String = redis::cmd("PING").query_async(&mut conn).await?;
   Ok(())
}
