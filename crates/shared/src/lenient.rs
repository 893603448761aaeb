//! # 暗黙の型変換付きデシリアライザ
//!
//! クエリ文字列やフロントエンドから `"123"` のような文字列で届いた値を
//! 数値として受け付ける serde ヘルパー。
//!
//! ## 使い方
//!
//! ```
//! use kanri_shared::lenient;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Query {
//!     #[serde(default, deserialize_with = "lenient::option_number")]
//!     page_num: Option<u32>,
//! }
//!
//! let q: Query = serde_json::from_str(r#"{"page_num": "3"}"#).unwrap();
//! assert_eq!(q.page_num, Some(3));
//! ```

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, de::Error as _};

/// 数値または文字列として届く値
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
   Number(T),
   String(String),
}

/// 省略可能な数値を受け付ける
///
/// `null` と空文字列は `None` として扱う。
pub fn option_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
   D: Deserializer<'de>,
   T: Deserialize<'de> + FromStr,
   <T as FromStr>::Err: Display,
{
   match Option::<NumberOrString<T>>::deserialize(deserializer)? {
      None => Ok(None),
      Some(NumberOrString::Number(n)) => Ok(Some(n)),
      Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
      Some(NumberOrString::String(s)) => s.trim().parse::<T>().map(Some).map_err(D::Error::custom),
   }
}

/// 空文字列を `None` として扱う文字列
pub fn option_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
   D: Deserializer<'de>,
{
   let value = Option::<String>::deserialize(deserializer)?;
   Ok(value.filter(|s| !s.trim().is_empty()))
}
