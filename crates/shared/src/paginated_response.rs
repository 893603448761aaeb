//! # ページネーション付きレスポンス
//!
//! ページ番号ベースの一覧 API レスポンス型。

use serde::{Deserialize, Serialize};

/// ページネーション付きレスポンス
///
/// ## JSON 形式
///
/// ```json
/// {
///   "rows": [...],
///   "total": 42
/// }
/// ```
///
/// `total` はフィルタ適用後の全件数（ページ外を含む）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
   pub rows:  Vec<T>,
   pub total: u64,
}

impl<T> PaginatedResponse<T> {
   pub fn new(rows: Vec<T>, total: u64) -> Self {
      Self { rows, total }
   }
}
