//! # データ権限
//!
//! ロールに設定されたデータ範囲から、一覧取得 SQL に付与する絞り込み条件を組み立てる。
//!
//! ## データ範囲
//!
//! | 値 | バリアント | 条件 |
//! |----|-----------|------|
//! | `1` | [`DataScope::All`] | 絞り込みなし |
//! | `2` | [`DataScope::Custom`] | `sys_role_dept` に登録された部門 |
//! | `3` | [`DataScope::DeptOnly`] | 自部門のみ |
//! | `4` | [`DataScope::DeptAndChildren`] | 自部門と配下の部門 |
//! | `5` | [`DataScope::SelfOnly`] | 本人のデータのみ |
//!
//! 複数ロールを持つ場合は各ロールの条件を `OR` で結合する。
//! いずれかのロールが `All` なら絞り込みは行わない。
//!
//! ## 使用例
//!
//! ```rust
//! use kanri_domain::data_scope::{DataScopeCondition, DataScopeFilter, DataScopeMeta};
//! use kanri_domain::user::DeptId;
//!
//! let filter = DataScopeFilter::new(
//!     DataScopeMeta::new("d", "u"),
//!     vec![DataScopeCondition::Dept(DeptId::new(103))],
//! );
//! assert_eq!(filter.to_sql(), " AND (d.dept_id = 103)");
//! ```

use serde::{Deserialize, Serialize};

use crate::{
   role::RoleId,
   user::{DeptId, LoginUser, UserId},
};

/// ロールのデータ範囲
///
/// DB には `CHAR(1)` の `'1'` 〜 `'5'` で格納される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataScope {
   #[serde(rename = "1")]
   All,
   #[serde(rename = "2")]
   Custom,
   #[serde(rename = "3")]
   DeptOnly,
   #[serde(rename = "4")]
   DeptAndChildren,
   #[serde(rename = "5")]
   SelfOnly,
}

impl DataScope {
   /// DB の文字表現から変換する
   pub fn from_code(code: &str) -> Option<Self> {
      match code.trim() {
         "1" => Some(Self::All),
         "2" => Some(Self::Custom),
         "3" => Some(Self::DeptOnly),
         "4" => Some(Self::DeptAndChildren),
         "5" => Some(Self::SelfOnly),
         _ => None,
      }
   }
}

/// データ権限を適用するルートのメタデータ
///
/// `dept_alias` / `user_alias` は SQL 内の `sys_dept` / `sys_user` のテーブル別名。
/// 別名はルート定義時に固定されるため、利用者の入力は含まれない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataScopeMeta {
   pub dept_alias: &'static str,
   pub user_alias: &'static str,
}

impl DataScopeMeta {
   pub const fn new(dept_alias: &'static str, user_alias: &'static str) -> Self {
      Self {
         dept_alias,
         user_alias,
      }
   }
}

/// 1 ロール分の絞り込み条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataScopeCondition {
   /// ロールに紐づく部門（`sys_role_dept`）
   CustomRole(RoleId),
   /// 指定部門のみ
   Dept(DeptId),
   /// 指定部門と配下の部門（`ancestors` に含まれる部門）
   DeptAndChildren(DeptId),
   /// 指定ユーザー本人
   SelfUser(UserId),
   /// 一致する行なし
   Nothing,
}

impl DataScopeCondition {
   fn render(&self, meta: &DataScopeMeta) -> String {
      let d = meta.dept_alias;
      match self {
         Self::CustomRole(role_id) => format!(
            "{d}.dept_id IN (SELECT dept_id FROM sys_role_dept WHERE role_id = {role_id})"
         ),
         Self::Dept(dept_id) => format!("{d}.dept_id = {dept_id}"),
         Self::DeptAndChildren(dept_id) => format!(
            "{d}.dept_id IN (SELECT dept_id FROM sys_dept WHERE dept_id = {dept_id} OR \
             find_in_set({dept_id}, ancestors))"
         ),
         Self::SelfUser(user_id) => format!("{}.user_id = {user_id}", meta.user_alias),
         Self::Nothing => format!("{d}.dept_id = 0"),
      }
   }
}

/// 一覧取得に適用するデータ権限フィルタ
///
/// データ権限インターセプタがリクエスト拡張に挿入し、ハンドラが SQL に連結する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataScopeFilter {
   meta:       DataScopeMeta,
   conditions: Vec<DataScopeCondition>,
}

impl DataScopeFilter {
   pub fn new(meta: DataScopeMeta, conditions: Vec<DataScopeCondition>) -> Self {
      Self { meta, conditions }
   }

   /// ログインユーザーのロールからフィルタを組み立てる
   ///
   /// 超級管理者、または `All` のロールを持つ場合は `None`（絞り込みなし）。
   /// 同じ範囲の条件は 1 度だけ追加する（`Custom` はロールごとに追加）。
   pub fn build(user: &LoginUser, meta: DataScopeMeta) -> Option<Self> {
      if user.is_admin() || user.roles.iter().any(|r| r.data_scope == DataScope::All) {
         return None;
      }

      let mut conditions: Vec<DataScopeCondition> = Vec::new();
      let mut push = |condition: DataScopeCondition| {
         if !conditions.contains(&condition) {
            conditions.push(condition);
         }
      };

      for role in &user.roles {
         match role.data_scope {
            DataScope::All => {}
            DataScope::Custom => push(DataScopeCondition::CustomRole(role.role_id)),
            DataScope::DeptOnly => push(
               user
                  .dept_id
                  .map_or(DataScopeCondition::Nothing, DataScopeCondition::Dept),
            ),
            DataScope::DeptAndChildren => push(
               user
                  .dept_id
                  .map_or(DataScopeCondition::Nothing, DataScopeCondition::DeptAndChildren),
            ),
            DataScope::SelfOnly => {
               if meta.user_alias.is_empty() {
                  push(DataScopeCondition::Nothing);
               } else {
                  push(DataScopeCondition::SelfUser(user.user_id));
               }
            }
         }
      }

      Some(Self::new(meta, conditions))
   }

   pub fn conditions(&self) -> &[DataScopeCondition] {
      &self.conditions
   }

   /// `WHERE` 句の末尾に連結する SQL 断片を返す
   ///
   /// 条件が 1 つもない場合は一致する行なしとして扱う。
   pub fn to_sql(&self) -> String {
      let parts: Vec<String> = if self.conditions.is_empty() {
         vec![DataScopeCondition::Nothing.render(&self.meta)]
      } else {
         self
            .conditions
            .iter()
            .map(|c| c.render(&self.meta))
            .collect()
      };
      format!(" AND ({})", parts.join(" OR "))
   }
}
