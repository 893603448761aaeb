//! # ログイントークンストア
//!
//! JWT の `uuid` クレームをキーに [`LoginUser`] を Redis へ保存する。
//! JWT 自体は署名検証のみに使い、失効やログアウトはこのストアで管理する。
//!
//! | キー | 値 | TTL |
//! |-----|-----|-----|
//! | `login_tokens:{uuid}` | `LoginUser` (JSON) | `JWT_EXPIRES_IN` 秒 |

use std::time::Duration;

use async_trait::async_trait;
use kanri_domain::user::LoginUser;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::InfraError;

pub const LOGIN_TOKEN_KEY_PREFIX: &str = "login_tokens:";

/// ログイントークンの保存・取得・削除
#[async_trait]
pub trait TokenStore: Send + Sync {
   /// ログインユーザーを保存する（既存のキーは上書きし、TTL を再設定する）
   async fn save(&self, user: &LoginUser, ttl: Duration) -> Result<(), InfraError>;

   /// トークンに対応するログインユーザーを取得する
   async fn get(&self, token: &str) -> Result<Option<LoginUser>, InfraError>;

   /// トークンを削除する。存在しなくても成功とする
   async fn delete(&self, token: &str) -> Result<(), InfraError>;
}

pub struct RedisTokenStore {
   conn: ConnectionManager,
}

impl RedisTokenStore {
   pub fn new(conn: ConnectionManager) -> Self {
      Self { conn }
   }

   fn key(token: &str) -> String {
      format!("{LOGIN_TOKEN_KEY_PREFIX}{token}")
   }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
   #[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
   async fn save(&self, user: &LoginUser, ttl: Duration) -> Result<(), InfraError> {
      let json = serde_json::to_string(user)?;
      let mut conn = self.conn.clone();
      let _: () = conn
         .set_ex(Self::key(&user.token), json, ttl.as_secs().max(1))
         .await?;
      Ok(())
   }

   #[tracing::instrument(skip_all)]
   async fn get(&self, token: &str) -> Result<Option<LoginUser>, InfraError> {
      let mut conn = self.conn.clone();
      let json: Option<String> = conn.get(Self::key(token)).await?;
      json.map(|j| serde_json::from_str(&j))
         .transpose()
         .map_err(InfraError::from)
   }

   #[tracing::instrument(skip_all)]
   async fn delete(&self, token: &str) -> Result<(), InfraError> {
      let mut conn = self.conn.clone();
      let _: () = conn.del(Self::key(token)).await?;
      Ok(())
   }
}
