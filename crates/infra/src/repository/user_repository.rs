//! # UserRepository
//!
//! `sys_user` とロール・メニュー関連テーブルの読み書き。
//!
//! - ログイン時: ユーザー名で検索し、ロール（データ範囲付き）と権限文字列を取得する
//! - 一覧取得時: 呼び出し元から渡された [`DataScopeFilter`] を `WHERE` 句に連結する

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanri_domain::{
   data_scope::{DataScope, DataScopeFilter},
   password::PasswordHash,
   role::{Permission, RoleId, RoleSummary},
   user::{DeptId, User, UserId, UserStatus},
};
use serde::Serialize;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};

use crate::error::InfraError;

/// ユーザー一覧の検索条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListQuery {
   /// 部分一致
   pub user_name:   Option<String>,
   /// 部分一致
   pub phonenumber: Option<String>,
   pub status:      Option<UserStatus>,
   /// 指定部門と配下の部門
   pub dept_id:     Option<DeptId>,
   pub page_num:    u64,
   pub page_size:   u64,
}

impl UserListQuery {
   /// `LIMIT` / `OFFSET` に使う値を返す
   ///
   /// `page_size` の 0 は 1、`page_num` の 0 は 1 として扱う。オフセットは `u64::MAX` で頭打ち。
   pub fn limit_offset(&self) -> (u64, u64) {
      let limit = self.page_size.max(1);
      (limit, (self.page_num.max(1) - 1).saturating_mul(limit))
   }
}

/// ユーザー一覧の 1 行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserListRow {
   pub user_id:     i64,
   pub dept_id:     Option<i64>,
   pub user_name:   String,
   pub nick_name:   String,
   pub email:       String,
   pub phonenumber: String,
   pub status:      String,
   pub create_time: Option<DateTime<Utc>>,
   pub dept_name:   Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
   /// ユーザー名で検索する（論理削除済みは除く）
   async fn find_by_user_name(&self, user_name: &str) -> Result<Option<User>, InfraError>;

   /// 有効なロールをデータ範囲付きで取得する
   async fn find_roles(&self, user_id: UserId) -> Result<Vec<RoleSummary>, InfraError>;

   /// 有効なロールに紐づくメニューの権限文字列を取得する
   async fn find_permissions(&self, user_id: UserId) -> Result<Vec<Permission>, InfraError>;

   /// 最終ログイン IP と日時を更新する
   async fn update_login_info(
      &self,
      user_id: UserId,
      login_ip: &str,
      login_date: DateTime<Utc>,
   ) -> Result<(), InfraError>;

   /// データ権限を適用したユーザー一覧と総件数を取得する
   async fn list(
      &self,
      query: &UserListQuery,
      scope: Option<&DataScopeFilter>,
   ) -> Result<(Vec<UserListRow>, u64), InfraError>;
}

#[derive(FromRow)]
struct UserRow {
   user_id:   i64,
   dept_id:   Option<i64>,
   user_name: String,
   nick_name: String,
   password:  String,
   status:    String,
}

impl TryFrom<UserRow> for User {
   type Error = InfraError;

   fn try_from(row: UserRow) -> Result<Self, Self::Error> {
      Ok(User {
         user_id:   UserId::new(row.user_id),
         dept_id:   row.dept_id.map(DeptId::new),
         user_name: row.user_name,
         nick_name: row.nick_name,
         password:  PasswordHash::new(row.password),
         status:    row.status.parse()?,
      })
   }
}

#[derive(FromRow)]
struct RoleRow {
   role_id:    i64,
   role_key:   String,
   data_scope: String,
}

impl TryFrom<RoleRow> for RoleSummary {
   type Error = InfraError;

   fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
      let data_scope = DataScope::from_code(&row.data_scope).ok_or_else(|| {
         InfraError::invalid_data(format!(
            "ロール {} のデータ範囲が不正です: {}",
            row.role_key, row.data_scope
         ))
      })?;
      Ok(RoleSummary::new(RoleId::new(row.role_id), row.role_key, data_scope))
   }
}

/// MySQL 実装の UserRepository
#[derive(Debug, Clone)]
pub struct MySqlUserRepository {
   pool: MySqlPool,
}

impl MySqlUserRepository {
   pub fn new(pool: MySqlPool) -> Self {
      Self { pool }
   }
}

/// 一覧と件数で共通の `FROM` / `WHERE` 句を組み立てる
fn push_list_conditions<'a>(
   builder: &mut QueryBuilder<'a, MySql>,
   query: &'a UserListQuery,
   scope: Option<&DataScopeFilter>,
) {
   builder.push(" FROM sys_user u LEFT JOIN sys_dept d ON u.dept_id = d.dept_id WHERE u.del_flag = '0'");

   if let Some(user_name) = &query.user_name {
      builder
         .push(" AND u.user_name LIKE ")
         .push_bind(format!("%{user_name}%"));
   }
   if let Some(phonenumber) = &query.phonenumber {
      builder
         .push(" AND u.phonenumber LIKE ")
         .push_bind(format!("%{phonenumber}%"));
   }
   if let Some(status) = query.status {
      let status: &'static str = status.into();
      builder.push(" AND u.status = ").push_bind(status);
   }
   if let Some(dept_id) = query.dept_id {
      builder
         .push(" AND (u.dept_id = ")
         .push_bind(dept_id.value())
         .push(" OR u.dept_id IN (SELECT t.dept_id FROM sys_dept t WHERE find_in_set(")
         .push_bind(dept_id.value())
         .push(", t.ancestors)))");
   }
   if let Some(scope) = scope {
      builder.push(scope.to_sql());
   }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
   #[tracing::instrument(skip(self), level = "debug")]
   async fn find_by_user_name(&self, user_name: &str) -> Result<Option<User>, InfraError> {
      let row = sqlx::query_as::<_, UserRow>(
         r#"
            SELECT user_id, dept_id, user_name, nick_name, password, status
            FROM sys_user
            WHERE user_name = ? AND del_flag = '0'
         "#,
      )
      .bind(user_name)
      .fetch_optional(&self.pool)
      .await?;

      row.map(User::try_from).transpose()
   }

   #[tracing::instrument(skip(self), level = "debug")]
   async fn find_roles(&self, user_id: UserId) -> Result<Vec<RoleSummary>, InfraError> {
      let rows = sqlx::query_as::<_, RoleRow>(
         r#"
            SELECT r.role_id, r.role_key, r.data_scope
            FROM sys_role r
            INNER JOIN sys_user_role ur ON ur.role_id = r.role_id
            WHERE ur.user_id = ? AND r.status = '0' AND r.del_flag = '0'
            ORDER BY r.role_sort
         "#,
      )
      .bind(user_id.value())
      .fetch_all(&self.pool)
      .await?;

      rows.into_iter().map(RoleSummary::try_from).collect()
   }

   #[tracing::instrument(skip(self), level = "debug")]
   async fn find_permissions(&self, user_id: UserId) -> Result<Vec<Permission>, InfraError> {
      let perms: Vec<(String,)> = sqlx::query_as(
         r#"
            SELECT DISTINCT m.perms
            FROM sys_menu m
            INNER JOIN sys_role_menu rm ON rm.menu_id = m.menu_id
            INNER JOIN sys_user_role ur ON ur.role_id = rm.role_id
            INNER JOIN sys_role r ON r.role_id = ur.role_id
            WHERE ur.user_id = ?
              AND m.status = '0'
              AND r.status = '0'
              AND r.del_flag = '0'
              AND m.perms IS NOT NULL
              AND m.perms <> ''
         "#,
      )
      .bind(user_id.value())
      .fetch_all(&self.pool)
      .await?;

      // 1 メニューに複数の権限がカンマ区切りで入っている場合がある
      Ok(perms
         .into_iter()
         .flat_map(|(p,)| {
            p.split(',')
               .map(str::trim)
               .filter(|s| !s.is_empty())
               .map(Permission::new)
               .collect::<Vec<_>>()
         })
         .collect())
   }

   #[tracing::instrument(skip(self), level = "debug")]
   async fn update_login_info(
      &self,
      user_id: UserId,
      login_ip: &str,
      login_date: DateTime<Utc>,
   ) -> Result<(), InfraError> {
      sqlx::query("UPDATE sys_user SET login_ip = ?, login_date = ? WHERE user_id = ?")
         .bind(login_ip)
         .bind(login_date)
         .bind(user_id.value())
         .execute(&self.pool)
         .await?;
      Ok(())
   }

   #[tracing::instrument(skip_all, level = "debug")]
   async fn list(
      &self,
      query: &UserListQuery,
      scope: Option<&DataScopeFilter>,
   ) -> Result<(Vec<UserListRow>, u64), InfraError> {
      let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*)");
      push_list_conditions(&mut count, query, scope);
      let (total,) = count
         .build_query_as::<(i64,)>()
         .fetch_one(&self.pool)
         .await?;

      let mut select = QueryBuilder::<MySql>::new(
         "SELECT u.user_id, u.dept_id, u.user_name, u.nick_name, u.email, u.phonenumber, \
          u.status, u.create_time, d.dept_name",
      );
      push_list_conditions(&mut select, query, scope);
      let (limit, offset) = query.limit_offset();
      select
         .push(" ORDER BY u.user_id LIMIT ")
         .push_bind(limit)
         .push(" OFFSET ")
         .push_bind(offset);

      let rows = select
         .build_query_as::<UserListRow>()
         .fetch_all(&self.pool)
         .await?;

      Ok((rows, u64::try_from(total).unwrap_or_default()))
   }
}
