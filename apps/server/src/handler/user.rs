//! # ユーザー管理ハンドラ
//!
//! - `GET /system/user/list` - データ権限を適用したユーザー一覧（`system:user:list`）
//!
//! データ権限インターセプタが格納した [`DataScopeFilter`] をそのままリポジトリに渡す。
//! フィルタがない（全データ閲覧可）場合は条件を付けない。

use axum::{Extension, Json, extract::State};
use kanri_domain::{
    data_scope::DataScopeFilter,
    user::{DeptId, UserStatus},
};
use kanri_infra::repository::{UserListQuery, UserListRow};
use kanri_shared::{PaginatedResponse, lenient};
use serde::Deserialize;
use validator::Validate;

use super::operlog::DEFAULT_PAGE_SIZE;
use crate::{error::AppError, state::AppState, validation::ValidatedQuery};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserListParams {
    #[serde(default, alias = "pageNum", deserialize_with = "lenient::option_number")]
    #[validate(range(min = 1, message = "1 以上を指定してください"))]
    pub page_num:    Option<u64>,
    #[serde(default, alias = "pageSize", deserialize_with = "lenient::option_number")]
    #[validate(range(min = 1, max = 100, message = "1 以上 100 以下を指定してください"))]
    pub page_size:   Option<u64>,
    #[serde(default, alias = "userName", deserialize_with = "lenient::option_string")]
    pub user_name:   Option<String>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub phonenumber: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub status:      Option<String>,
    #[serde(default, alias = "deptId", deserialize_with = "lenient::option_number")]
    pub dept_id:     Option<i64>,
}

impl TryFrom<UserListParams> for UserListQuery {
    type Error = AppError;

    fn try_from(params: UserListParams) -> Result<Self, Self::Error> {
        Ok(Self {
            user_name:   params.user_name,
            phonenumber: params.phonenumber,
            status:      params.status.map(|s| s.parse::<UserStatus>()).transpose()?,
            dept_id:     params.dept_id.map(DeptId::new),
            page_num:    params.page_num.unwrap_or(1),
            page_size:   params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        })
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    scope: Option<Extension<DataScopeFilter>>,
    ValidatedQuery(params): ValidatedQuery<UserListParams>,
) -> Result<Json<PaginatedResponse<UserListRow>>, AppError> {
    let query = UserListQuery::try_from(params)?;
    let scope = scope.map(|Extension(filter)| filter);
    let (rows, total) = state.user_repository.list(&query, scope.as_ref()).await?;
    Ok(Json(PaginatedResponse::new(rows, total)))
}
