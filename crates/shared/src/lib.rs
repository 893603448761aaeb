//! # Kanri 共有ユーティリティ
//!
//! このクレートは、Kanri 管理バックエンド全体で使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - 他のすべてのクレート（domain, infra, server）から依存される
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - 外部クレートへの依存は最小限に抑える（observability 系は feature で分離）

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod lenient;
pub mod observability;
pub mod paginated_response;
#[cfg(feature = "observability")]
pub mod request_log;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
pub use paginated_response::PaginatedResponse;
