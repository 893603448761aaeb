//! # 操作ログ
//!
//! 管理画面で行われた更新系操作の記録。
//!
//! ## 設計方針
//!
//! - **不変性**: 操作ログは一度作成されたら変更されない（一括削除のみ可能）
//! - **上限**: リクエストパラメータとレスポンスはそれぞれ 2000 文字で切り詰める
//! - **非同期保存**: 保存の失敗は呼び出し元のレスポンスに影響させない
//!
//! ## 業務種別
//!
//! | バリアント | 値 |
//! |-----------|----|
//! | `Other` | 0 |
//! | `Insert` | 1 |
//! | `Update` | 2 |
//! | `Delete` | 3 |
//! | `Grant` | 4 |
//! | `Export` | 5 |
//! | `Import` | 6 |
//! | `Force` | 7 |
//! | `Clean` | 8 |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// パラメータ・レスポンスの最大文字数
pub const MAX_LOGGED_CHARS: usize = 2000;

define_numeric_id! {
   /// 操作ログ ID
   pub struct OperId;
}

/// 業務種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum BusinessType {
   Other,
   Insert,
   Update,
   Delete,
   Grant,
   Export,
   Import,
   Force,
   Clean,
}

impl BusinessType {
   pub const fn code(self) -> i32 {
      match self {
         Self::Other => 0,
         Self::Insert => 1,
         Self::Update => 2,
         Self::Delete => 3,
         Self::Grant => 4,
         Self::Export => 5,
         Self::Import => 6,
         Self::Force => 7,
         Self::Clean => 8,
      }
   }
}

impl TryFrom<i32> for BusinessType {
   type Error = DomainError;

   fn try_from(code: i32) -> Result<Self, Self::Error> {
      Ok(match code {
         0 => Self::Other,
         1 => Self::Insert,
         2 => Self::Update,
         3 => Self::Delete,
         4 => Self::Grant,
         5 => Self::Export,
         6 => Self::Import,
         7 => Self::Force,
         8 => Self::Clean,
         _ => {
            return Err(DomainError::Validation(format!(
               "不明な業務種別: {code}"
            )));
         }
      })
   }
}

impl From<BusinessType> for i32 {
   fn from(value: BusinessType) -> Self {
      value.code()
   }
}

impl fmt::Display for BusinessType {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let s = match self {
         Self::Other => "other",
         Self::Insert => "insert",
         Self::Update => "update",
         Self::Delete => "delete",
         Self::Grant => "grant",
         Self::Export => "export",
         Self::Import => "import",
         Self::Force => "force",
         Self::Clean => "clean",
      };
      write!(f, "{s}")
   }
}

/// 操作結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum OperStatus {
   /// 正常終了（0）
   Success,
   /// 異常終了（1）
   Failure,
}

impl OperStatus {
   pub const fn code(self) -> i32 {
      match self {
         Self::Success => 0,
         Self::Failure => 1,
      }
   }
}

impl TryFrom<i32> for OperStatus {
   type Error = DomainError;

   fn try_from(code: i32) -> Result<Self, Self::Error> {
      match code {
         0 => Ok(Self::Success),
         1 => Ok(Self::Failure),
         _ => Err(DomainError::Validation(format!("不明な操作結果: {code}"))),
      }
   }
}

impl From<OperStatus> for i32 {
   fn from(value: OperStatus) -> Self {
      value.code()
   }
}

/// 操作ログエンティティ
///
/// 保存前は `oper_id` が `None`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLog {
   pub oper_id:        Option<OperId>,
   pub title:          String,
   pub business_type:  BusinessType,
   /// 処理したハンドラ（`GET /system/user/list` の形式）
   pub method:         String,
   pub request_method: String,
   pub oper_name:      String,
   pub oper_url:       String,
   pub oper_ip:        String,
   pub oper_param:     String,
   pub json_result:    String,
   pub status:         OperStatus,
   pub error_msg:      String,
   pub oper_time:      DateTime<Utc>,
   /// 処理時間（ミリ秒）
   pub cost_time:      i64,
}

/// 操作ログ一覧の検索条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationLogQuery {
   pub title:         Option<String>,
   pub oper_name:     Option<String>,
   pub business_type: Option<BusinessType>,
   pub status:        Option<OperStatus>,
   pub page_num:      u64,
   pub page_size:     u64,
}

impl OperationLogQuery {
   /// `LIMIT` / `OFFSET` に使う値を返す
   ///
   /// `page_num` は 1 始まり。0 は 1 として扱う。
   /// オフセットが `u64` を超える場合は `u64::MAX` に丸める（結果は空ページになる）。
   pub fn limit_offset(&self) -> (u64, u64) {
      let page_num = self.page_num.max(1);
      (self.page_size, (page_num - 1).saturating_mul(self.page_size))
   }
}

/// 文字列を最大 `max` 文字（バイトではない）に切り詰める
pub fn truncate_chars(value: &str, max: usize) -> String {
   match value.char_indices().nth(max) {
      Some((idx, _)) => value[..idx].to_string(),
      None => value.to_string(),
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;
   use rstest::rstest;

   use super::*;

   #[rstest]
   #[case(BusinessType::Other, 0)]
   #[case(BusinessType::Delete, 3)]
   #[case(BusinessType::Clean, 8)]
   fn test_業務種別のコード(#[case] business_type: BusinessType, #[case] code: i32) {
      assert_eq!(business_type.code(), code);
      assert_eq!(BusinessType::try_from(code).unwrap(), business_type);
   }

   #[test]
   fn test_不明な業務種別はエラー() {
      assert!(BusinessType::try_from(42).is_err());
   }

   #[test]
   fn test_業務種別はjsonで数値になる() {
      assert_eq!(
         serde_json::to_value(BusinessType::Clean).unwrap(),
         serde_json::json!(8)
      );
      let parsed: BusinessType = serde_json::from_value(serde_json::json!(2)).unwrap();
      assert_eq!(parsed, BusinessType::Update);
   }

   #[test]
   fn test_操作結果のコード() {
      assert_eq!(OperStatus::Success.code(), 0);
      assert_eq!(OperStatus::try_from(1).unwrap(), OperStatus::Failure);
      assert!(OperStatus::try_from(2).is_err());
   }

   #[rstest]
   #[case("abc", 5, "abc")]
   #[case("abcdef", 3, "abc")]
   #[case("操作ログです", 2, "操作")]
   #[case("", 0, "")]
   fn test_truncate_chars(#[case] input: &str, #[case] max: usize, #[case] expected: &str) {
      assert_eq!(truncate_chars(input, max), expected);
   }

   #[test]
   fn test_上限ちょうどは切り詰めない() {
      let value = "あ".repeat(MAX_LOGGED_CHARS);

      assert_eq!(truncate_chars(&value, MAX_LOGGED_CHARS).chars().count(), MAX_LOGGED_CHARS);
   }

   #[rstest]
   #[case(1, 10, (10, 0))]
   #[case(3, 20, (20, 40))]
   #[case(0, 10, (10, 0))]
   #[case(u64::MAX, 10, (10, u64::MAX))]
   #[case(u64::MAX / 2, 3, (3, u64::MAX))]
   fn test_limit_offset(#[case] page_num: u64, #[case] page_size: u64, #[case] expected: (u64, u64)) {
      let query = OperationLogQuery {
         page_num,
         page_size,
         ..Default::default()
      };

      assert_eq!(query.limit_offset(), expected);
   }
}
