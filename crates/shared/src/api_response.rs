//! # API レスポンスエンベロープ
//!
//! 公開 API の統一レスポンス形式 `{ "code": 200, "msg": "操作成功", "data": T }` を提供する。
//!
//! ハンドラは素の JSON を返し、レスポンス変換インターセプタがこの形式に包む。

use serde::{Deserialize, Serialize};

/// 成功時の業務コード
pub const SUCCESS_CODE: u16 = 200;

/// 成功時のメッセージ
pub const SUCCESS_MSG: &str = "操作成功";

/// 公開 API の統一レスポンス型
///
/// ## 使用例
///
/// ```
/// use kanri_shared::ApiResponse;
///
/// let response = ApiResponse::success("hello");
/// assert_eq!(response.code, 200);
/// assert_eq!(response.data, Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
   pub code: u16,
   pub msg:  String,
   pub data: Option<T>,
}

impl<T> ApiResponse<T> {
   /// 成功レスポンスを作成する
   pub fn success(data: T) -> Self {
      Self {
         code: SUCCESS_CODE,
         msg:  SUCCESS_MSG.to_string(),
         data: Some(data),
      }
   }

   /// データなしの成功レスポンスを作成する
   pub fn empty() -> Self {
      Self {
         code: SUCCESS_CODE,
         msg:  SUCCESS_MSG.to_string(),
         data: None,
      }
   }
}
