//! # ロール（権限管理）
//!
//! ログインユーザーが保持するロールと権限文字列を扱う。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`RoleSummary`] | ロール | ユーザーに割り当てられた役割とデータ権限 |
//! | [`Permission`] | 権限 | メニューに紐づく操作許可（`system:user:list` など） |
//!
//! ## 使用例
//!
//! ```rust
//! use kanri_domain::role::Permission;
//!
//! let held = Permission::new("system:user:*");
//! assert!(held.satisfies(&Permission::new("system:user:list")));
//! assert!(!held.satisfies(&Permission::new("system:role:list")));
//! ```

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::data_scope::DataScope;

/// 超級管理者のロールキー
///
/// このロールを持つユーザーはロール・権限・データ権限のチェックをすべて通過する。
pub const ADMIN_ROLE_KEY: &str = "admin";

/// 全権限を表す権限文字列
pub const ALL_PERMISSION: &str = "*:*:*";

define_numeric_id! {
   /// ロール ID
   pub struct RoleId;
}

/// 権限（値オブジェクト）
///
/// `:` で区切られたセグメント列（例: `system:user:list`）。
///
/// ## 権限の形式
///
/// - `system:user:list` - 特定の操作
/// - `system:user:*` - `system:user:` 配下のすべての操作
/// - `*:*:*` - すべての操作（超級管理者用）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct Permission(String);

impl Permission {
   /// 権限を作成する
   pub fn new(value: impl Into<String>) -> Self {
      Self(value.into())
   }

   /// 文字列参照を取得する
   pub fn as_str(&self) -> &str {
      &self.0
   }

   /// この権限が、要求された権限を満たすか判定する
   ///
   /// ## マッチングルール
   ///
   /// | 保持権限 | 要求権限 | 結果 |
   /// |---------|---------|------|
   /// | `*:*:*` | 任意 | true（全権限） |
   /// | `system:user:*` | `system:user:list` | true（セグメント単位のワイルドカード） |
   /// | `system:*` | `system:user:list` | true（末尾の `*` は残り全体にマッチ） |
   /// | `system:user:list` | `system:user:list` | true（完全一致） |
   /// | `system:user:list` | `system:user:add` | false |
   /// | `system:user:list` | `system:user` | false（セグメント数不足） |
   pub fn satisfies(&self, required: &Permission) -> bool {
      let held = self.as_str();
      let req = required.as_str();

      if held == ALL_PERMISSION || held == req {
         return true;
      }

      let held_segments: Vec<&str> = held.split(':').collect();
      let req_segments: Vec<&str> = req.split(':').collect();

      for (i, held_segment) in held_segments.iter().enumerate() {
         let is_last = i == held_segments.len() - 1;
         match req_segments.get(i) {
            Some(_) if *held_segment == "*" && is_last => return true,
            Some(req_segment) if *held_segment == "*" || held_segment == req_segment => {}
            _ => return false,
         }
      }

      held_segments.len() == req_segments.len()
   }
}

/// 保持権限の一覧が、要求権限のいずれかを満たすか判定する
///
/// 要求が空なら常に true。
pub fn has_any_permission(held: &[Permission], required: &[Permission]) -> bool {
   if required.is_empty() {
      return true;
   }
   required
      .iter()
      .any(|req| held.iter().any(|p| p.satisfies(req)))
}

/// ロール（ログインユーザーに紐づく要約）
///
/// ロール管理画面で扱う完全なロールではなく、認可とデータ権限の判定に
/// 必要なフィールドだけを持つ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
   pub role_id:    RoleId,
   pub role_key:   String,
   pub data_scope: DataScope,
}

impl RoleSummary {
   pub fn new(role_id: RoleId, role_key: impl Into<String>, data_scope: DataScope) -> Self {
      Self {
         role_id,
         role_key: role_key.into(),
         data_scope,
      }
   }

   /// 超級管理者ロールかどうか
   pub fn is_admin(&self) -> bool {
      self.role_key == ADMIN_ROLE_KEY
   }
}

#[cfg(test)]
mod tests {
   use rstest::rstest;

   use super::*;

   #[rstest]
   #[case("*:*:*", "system:user:list", true)]
   #[case("system:user:list", "system:user:list", true)]
   #[case("system:user:*", "system:user:list", true)]
   #[case("system:*", "system:user:list", true)]
   #[case("system:*:list", "system:user:list", true)]
   #[case("system:*:list", "system:user:add", false)]
   #[case("system:user:list", "system:user:add", false)]
   #[case("system:user:*", "system:role:list", false)]
   #[case("system:user:list", "system:user", false)]
   #[case("system:user", "system:user:list", false)]
   #[case("monitor:*", "system:user:list", false)]
   fn test_satisfiesのマッチングルール(
      #[case] held: &str,
      #[case] required: &str,
      #[case] expected: bool,
   ) {
      assert_eq!(
         Permission::new(held).satisfies(&Permission::new(required)),
         expected,
         "held={held}, required={required}"
      );
   }

   #[test]
   fn test_has_any_permission_要求が空なら通過する() {
      assert!(has_any_permission(&[], &[]));
   }

   #[test]
   fn test_has_any_permission_いずれかを満たせば通過する() {
      let held = vec![Permission::new("monitor:operlog:list")];
      let required = vec![
         Permission::new("system:user:list"),
         Permission::new("monitor:operlog:list"),
      ];

      assert!(has_any_permission(&held, &required));
   }

   #[test]
   fn test_has_any_permission_保持権限が空なら拒否する() {
      let required = vec![Permission::new("system:user:list")];

      assert!(!has_any_permission(&[], &required));
   }

   #[test]
   fn test_permissionはjson文字列としてシリアライズされる() {
      let json = serde_json::to_value(Permission::new("system:user:list")).unwrap();

      assert_eq!(json, serde_json::json!("system:user:list"));
   }

   #[test]
   fn test_is_admin() {
      assert!(RoleSummary::new(RoleId::new(1), "admin", DataScope::All).is_admin());
      assert!(!RoleSummary::new(RoleId::new(2), "common", DataScope::SelfOnly).is_admin());
   }
}
