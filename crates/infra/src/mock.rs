//! # テスト用インメモリ実装
//!
//! サーバーのガード・インターセプタ・ハンドラのテストで、Redis や MySQL の代わりに使う。
//! `test-utils` feature を有効にすると他クレートからも利用できる。
//!
//! ```toml
//! [dev-dependencies]
//! kanri-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
   collections::HashMap,
   sync::{Arc, Mutex},
   time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanri_domain::{
   data_scope::DataScopeFilter,
   operation_log::{OperId, OperationLog, OperationLogQuery},
   password::{PasswordHash, PasswordVerifyResult, PlainPassword},
   role::{Permission, RoleSummary},
   user::{LoginUser, User, UserId},
};

use crate::{
   InfraError,
   password::PasswordChecker,
   repository::{OperationLogRepository, UserListQuery, UserListRow, UserRepository},
   submit_lock::SubmitLock,
   token_store::TokenStore,
};

// ===== MockTokenStore =====

#[derive(Clone, Default)]
pub struct MockTokenStore {
   tokens: Arc<Mutex<HashMap<String, (LoginUser, Duration)>>>,
}

impl MockTokenStore {
   pub fn new() -> Self {
      Self::default()
   }

   /// 保存されているトークンと最後に設定された TTL
   pub fn entry(&self, token: &str) -> Option<(LoginUser, Duration)> {
      self.tokens.lock().unwrap().get(token).cloned()
   }

   pub fn len(&self) -> usize {
      self.tokens.lock().unwrap().len()
   }

   pub fn is_empty(&self) -> bool {
      self.len() == 0
   }
}

#[async_trait]
impl TokenStore for MockTokenStore {
   async fn save(&self, user: &LoginUser, ttl: Duration) -> Result<(), InfraError> {
      self
         .tokens
         .lock()
         .unwrap()
         .insert(user.token.clone(), (user.clone(), ttl));
      Ok(())
   }

   async fn get(&self, token: &str) -> Result<Option<LoginUser>, InfraError> {
      Ok(self.tokens.lock().unwrap().get(token).map(|(u, _)| u.clone()))
   }

   async fn delete(&self, token: &str) -> Result<(), InfraError> {
      self.tokens.lock().unwrap().remove(token);
      Ok(())
   }
}

// ===== MockSubmitLock =====

/// 実時間で失効するインメモリロック
#[derive(Clone, Default)]
pub struct MockSubmitLock {
   locks: Arc<Mutex<HashMap<String, Instant>>>,
}

impl MockSubmitLock {
   pub fn new() -> Self {
      Self::default()
   }
}

#[async_trait]
impl SubmitLock for MockSubmitLock {
   async fn try_acquire(&self, fingerprint: &str, interval: Duration) -> Result<bool, InfraError> {
      let mut locks = self.locks.lock().unwrap();
      let now = Instant::now();
      match locks.get(fingerprint) {
         Some(expires_at) if *expires_at > now => Ok(false),
         _ => {
            locks.insert(fingerprint.to_string(), now + interval);
            Ok(true)
         }
      }
   }
}

// ===== MockUserRepository =====

#[derive(Clone, Default)]
pub struct MockUserRepository {
   users:       Arc<Mutex<Vec<(User, Vec<RoleSummary>, Vec<Permission>)>>>,
   rows:        Arc<Mutex<Vec<UserListRow>>>,
   last_scope:  Arc<Mutex<Option<Option<String>>>>,
   last_logins: Arc<Mutex<Vec<(UserId, String)>>>,
}

impl MockUserRepository {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn add_user(&self, user: User, roles: Vec<RoleSummary>, permissions: Vec<Permission>) {
      self.users.lock().unwrap().push((user, roles, permissions));
   }

   pub fn add_row(&self, row: UserListRow) {
      self.rows.lock().unwrap().push(row);
   }

   /// 直近の `list` 呼び出しで渡されたデータ権限の SQL 断片
   ///
   /// 未呼び出しなら `None`、フィルタなしで呼ばれたら `Some(None)`。
   pub fn last_scope_sql(&self) -> Option<Option<String>> {
      self.last_scope.lock().unwrap().clone()
   }

   pub fn last_logins(&self) -> Vec<(UserId, String)> {
      self.last_logins.lock().unwrap().clone()
   }
}

#[async_trait]
impl UserRepository for MockUserRepository {
   async fn find_by_user_name(&self, user_name: &str) -> Result<Option<User>, InfraError> {
      Ok(self
         .users
         .lock()
         .unwrap()
         .iter()
         .find(|(u, _, _)| u.user_name == user_name)
         .map(|(u, _, _)| u.clone()))
   }

   async fn find_roles(&self, user_id: UserId) -> Result<Vec<RoleSummary>, InfraError> {
      Ok(self
         .users
         .lock()
         .unwrap()
         .iter()
         .find(|(u, _, _)| u.user_id == user_id)
         .map(|(_, r, _)| r.clone())
         .unwrap_or_default())
   }

   async fn find_permissions(&self, user_id: UserId) -> Result<Vec<Permission>, InfraError> {
      Ok(self
         .users
         .lock()
         .unwrap()
         .iter()
         .find(|(u, _, _)| u.user_id == user_id)
         .map(|(_, _, p)| p.clone())
         .unwrap_or_default())
   }

   async fn update_login_info(
      &self,
      user_id: UserId,
      login_ip: &str,
      _login_date: DateTime<Utc>,
   ) -> Result<(), InfraError> {
      self
         .last_logins
         .lock()
         .unwrap()
         .push((user_id, login_ip.to_string()));
      Ok(())
   }

   async fn list(
      &self,
      query: &UserListQuery,
      scope: Option<&DataScopeFilter>,
   ) -> Result<(Vec<UserListRow>, u64), InfraError> {
      *self.last_scope.lock().unwrap() = Some(scope.map(DataScopeFilter::to_sql));
      let rows = self.rows.lock().unwrap();
      let total = rows.len() as u64;
      let (limit, offset) = query.limit_offset();
      let page = rows
         .iter()
         .skip(to_usize(offset))
         .take(to_usize(limit))
         .cloned()
         .collect();
      Ok((page, total))
   }
}

fn to_usize(value: u64) -> usize {
   usize::try_from(value).unwrap_or(usize::MAX)
}

// ===== MockOperationLogRepository =====

#[derive(Clone, Default)]
pub struct MockOperationLogRepository {
   logs: Arc<Mutex<Vec<OperationLog>>>,
}

impl MockOperationLogRepository {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn logs(&self) -> Vec<OperationLog> {
      self.logs.lock().unwrap().clone()
   }

   /// 非同期保存が `count` 件に達するまで最大 1 秒待つ
   pub async fn wait_for(&self, count: usize) -> Vec<OperationLog> {
      for _ in 0..100 {
         if self.logs.lock().unwrap().len() >= count {
            break;
         }
         tokio::time::sleep(Duration::from_millis(10)).await;
      }
      self.logs()
   }
}

#[async_trait]
impl OperationLogRepository for MockOperationLogRepository {
   async fn insert(&self, log: &OperationLog) -> Result<OperId, InfraError> {
      let mut logs = self.logs.lock().unwrap();
      let id = OperId::new(logs.len() as i64 + 1);
      let mut stored = log.clone();
      stored.oper_id = Some(id);
      logs.push(stored);
      Ok(id)
   }

   async fn list(
      &self,
      query: &OperationLogQuery,
   ) -> Result<(Vec<OperationLog>, u64), InfraError> {
      let logs = self.logs.lock().unwrap();
      let total = logs.len() as u64;
      let (limit, offset) = query.limit_offset();
      let page = logs
         .iter()
         .rev()
         .skip(to_usize(offset))
         .take(to_usize(limit))
         .cloned()
         .collect();
      Ok((page, total))
   }

   async fn clean(&self) -> Result<(), InfraError> {
      self.logs.lock().unwrap().clear();
      Ok(())
   }
}

// ===== MockPasswordChecker =====

/// ハッシュ文字列が `plain:{password}` の形式なら一致とみなす
#[derive(Clone, Copy, Default)]
pub struct MockPasswordChecker;

impl MockPasswordChecker {
   pub fn hash_of(password: &str) -> PasswordHash {
      PasswordHash::new(format!("plain:{password}"))
   }
}

impl PasswordChecker for MockPasswordChecker {
   fn verify(
      &self,
      password: &PlainPassword,
      hash: &PasswordHash,
   ) -> Result<PasswordVerifyResult, InfraError> {
      Ok(PasswordVerifyResult::from(
         hash.as_str() == format!("plain:{}", password.as_str()),
      ))
   }
}
