//! # 重複送信防止ロック
//!
//! リクエストの指紋をキーに `SET NX PX` で短時間のロックを取る。
//! ロックが既に存在すれば、同じ内容のリクエストが間隔内に再送信されたと判定する。

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::InfraError;

pub const REPEAT_SUBMIT_KEY_PREFIX: &str = "repeat_submit:";

#[async_trait]
pub trait SubmitLock: Send + Sync {
   /// ロックを取得する
   ///
   /// 取得できた場合は true、既にロックされていれば false。
   async fn try_acquire(&self, fingerprint: &str, interval: Duration) -> Result<bool, InfraError>;
}

pub struct RedisSubmitLock {
   conn: ConnectionManager,
}

impl RedisSubmitLock {
   pub fn new(conn: ConnectionManager) -> Self {
      Self { conn }
   }
}

#[async_trait]
impl SubmitLock for RedisSubmitLock {
   #[tracing::instrument(skip(self))]
   async fn try_acquire(&self, fingerprint: &str, interval: Duration) -> Result<bool, InfraError> {
      let mut conn = self.conn.clone();
      let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
      // NX で既存キーがあれば nil が返る
      let reply: Option<String> = redis::cmd("SET")
         .arg(format!("{REPEAT_SUBMIT_KEY_PREFIX}{fingerprint}"))
         .arg("1")
         .arg("NX")
         .arg("PX")
         .arg(millis)
         .query_async(&mut conn)
         .await?;
      Ok(reply.is_some())
   }
}
