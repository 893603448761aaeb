//! # ユーザー
//!
//! システムユーザーと、トークンに紐づくログインユーザーを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`User`] | ユーザー | `sys_user` に永続化された管理画面の利用者 |
//! | [`UserStatus`] | ユーザー状態 | `'0'` 正常 / `'1'` 停止 |
//! | [`LoginUser`] | ログインユーザー | ログイン成功時に Redis に保存されるセッション情報 |
//!
//! ## 使用例
//!
//! ```rust
//! use kanri_domain::user::{DeptId, UserId, UserStatus};
//!
//! let status: UserStatus = "1".parse().unwrap();
//! assert_eq!(status, UserStatus::Disabled);
//! assert_eq!(UserId::new(1).value(), 1);
//! assert_eq!(DeptId::new(103).to_string(), "103");
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
   DomainError,
   password::PasswordHash,
   role::{ALL_PERMISSION, Permission, RoleSummary},
};

define_numeric_id! {
   /// ユーザー ID
   pub struct UserId;
}

define_numeric_id! {
   /// 部門 ID
   pub struct DeptId;
}

/// ユーザー状態
///
/// DB には `CHAR(1)` の `'0'` / `'1'` で格納される。
#[derive(
   Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
pub enum UserStatus {
   /// 正常（ログイン可能）
   #[serde(rename = "0")]
   #[strum(serialize = "0")]
   Normal,
   /// 停止
   #[serde(rename = "1")]
   #[strum(serialize = "1")]
   Disabled,
}

impl std::str::FromStr for UserStatus {
   type Err = DomainError;

   fn from_str(s: &str) -> Result<Self, Self::Err> {
      match s {
         "0" => Ok(Self::Normal),
         "1" => Ok(Self::Disabled),
         _ => Err(DomainError::Validation(format!(
            "不正なユーザー状態: {s}"
         ))),
      }
   }
}

/// ユーザーエンティティ
///
/// # 不変条件
///
/// - `user_name` はシステム内で一意
/// - `status` が `Disabled` の場合、ログイン不可
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
   pub user_id:   UserId,
   pub dept_id:   Option<DeptId>,
   pub user_name: String,
   pub nick_name: String,
   pub password:  PasswordHash,
   pub status:    UserStatus,
}

impl User {
   /// ログイン可能かどうか
   pub fn is_active(&self) -> bool {
      self.status == UserStatus::Normal
   }

   /// ログイン可能でなければ `Forbidden` を返す
   pub fn ensure_can_login(&self) -> Result<(), DomainError> {
      if self.is_active() {
         Ok(())
      } else {
         Err(DomainError::Forbidden(format!(
            "ユーザー {} は停止されています",
            self.user_name
         )))
      }
   }
}

/// ログインユーザー
///
/// ログイン成功時に作成され、`login_tokens:{token}` キーで Redis に JSON として保存される。
/// 認証ガードはリクエストごとにこれを復元し、リクエスト拡張に挿入する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginUser {
   /// トークン識別子（JWT の `uuid` クレーム）
   pub token:       String,
   pub user_id:     UserId,
   pub dept_id:     Option<DeptId>,
   pub user_name:   String,
   pub nick_name:   String,
   pub roles:       Vec<RoleSummary>,
   pub permissions: Vec<Permission>,
   pub login_time:  DateTime<Utc>,
   pub expire_time: DateTime<Utc>,
   pub ipaddr:      String,
}

impl LoginUser {
   /// ユーザーとロール・権限からログインユーザーを組み立てる
   ///
   /// 超級管理者の権限は `*:*:*` のみに置き換える。
   pub fn new(
      token: impl Into<String>,
      user: &User,
      roles: Vec<RoleSummary>,
      permissions: Vec<Permission>,
      ipaddr: impl Into<String>,
      now: DateTime<Utc>,
      ttl: Duration,
   ) -> Self {
      let is_admin = roles.iter().any(RoleSummary::is_admin);
      let permissions = if is_admin {
         vec![Permission::new(ALL_PERMISSION)]
      } else {
         permissions
      };

      Self {
         token: token.into(),
         user_id: user.user_id,
         dept_id: user.dept_id,
         user_name: user.user_name.clone(),
         nick_name: user.nick_name.clone(),
         roles,
         permissions,
         login_time: now,
         expire_time: now + ttl,
         ipaddr: ipaddr.into(),
      }
   }

   /// 超級管理者ロールを保持しているか
   pub fn is_admin(&self) -> bool {
      self.roles.iter().any(RoleSummary::is_admin)
   }

   /// ロールキーの一覧
   pub fn role_keys(&self) -> Vec<&str> {
      self.roles.iter().map(|r| r.role_key.as_str()).collect()
   }

   /// 指定ロールのいずれかを保持しているか
   ///
   /// 超級管理者は常に true。
   pub fn has_any_role(&self, required: &[String]) -> bool {
      if required.is_empty() || self.is_admin() {
         return true;
      }
      self
         .roles
         .iter()
         .any(|r| required.iter().any(|k| *k == r.role_key))
   }

   /// 失効までの残り時間（失効済みなら 0）
   pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
      (self.expire_time - now).max(Duration::zero())
   }

   /// 失効時刻を `now + ttl` に延長する
   pub fn refresh(&mut self, now: DateTime<Utc>, ttl: Duration) {
      self.expire_time = now + ttl;
   }
}
