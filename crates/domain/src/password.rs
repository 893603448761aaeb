//! # パスワード
//!
//! ログイン入力値と保存済みハッシュの値オブジェクト。
//! ハッシュの生成と検証は infra 層の `PasswordChecker` が行う。

use crate::DomainError;

/// ログイン時に受け付けるパスワード長（文字数）
pub const PASSWORD_LENGTH: std::ops::RangeInclusive<usize> = 5..=20;

/// 平文パスワード
///
/// Debug 出力では値をマスクする。
#[derive(Clone)]
pub struct PlainPassword(String);

impl std::fmt::Debug for PlainPassword {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.write_str("PlainPassword(***)")
   }
}

impl PlainPassword {
   pub fn new(value: impl Into<String>) -> Self {
      Self(value.into())
   }

   /// 長さが範囲外なら `Validation` を返す
   pub fn ensure_length(&self) -> Result<(), DomainError> {
      let len = self.0.chars().count();
      if PASSWORD_LENGTH.contains(&len) {
         Ok(())
      } else {
         Err(DomainError::Validation(format!(
            "パスワードは{}〜{}文字で入力してください",
            PASSWORD_LENGTH.start(),
            PASSWORD_LENGTH.end()
         )))
      }
   }

   pub fn as_str(&self) -> &str {
      &self.0
   }
}

/// 保存済みパスワードハッシュ（PHC 文字列形式）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
   pub fn new(hash: impl Into<String>) -> Self {
      Self(hash.into())
   }

   pub fn as_str(&self) -> &str {
      &self.0
   }
}

/// パスワード検証結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerifyResult {
   Match,
   Mismatch,
}

impl PasswordVerifyResult {
   pub fn is_match(&self) -> bool {
      matches!(self, Self::Match)
   }
}

impl From<bool> for PasswordVerifyResult {
   fn from(matched: bool) -> Self {
      if matched { Self::Match } else { Self::Mismatch }
   }
}
