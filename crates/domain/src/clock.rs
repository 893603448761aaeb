//! # 時刻プロバイダ
//!
//! トークンの失効判定や操作ログの記録時刻で使う現在時刻を抽象化する。
//! テストでは [`FixedClock`] を注入して時刻を固定する。

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
   fn now(&self) -> DateTime<Utc>;
}

/// システム時刻
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
   fn now(&self) -> DateTime<Utc> {
      Utc::now()
   }
}

/// 固定時刻（テスト用）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
   fn now(&self) -> DateTime<Utc> {
      self.0
   }
}
