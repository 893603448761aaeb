//! # 操作ログハンドラ
//!
//! - `GET /monitor/operlog/list` - 検索（`monitor:operlog:list`）
//! - `DELETE /monitor/operlog/clean` - 全件削除（`monitor:operlog:remove`、操作ログ対象）
//!
//! クエリパラメータは文字列で届くため、数値項目は `lenient` で変換する。

use axum::{Json, extract::State};
use kanri_domain::operation_log::{BusinessType, OperStatus, OperationLog, OperationLogQuery};
use kanri_shared::{
    PaginatedResponse,
    event_log::event,
    lenient,
    log_business_event,
};
use serde::Deserialize;
use validator::Validate;

use crate::{error::AppError, guard::CurrentUser, state::AppState, validation::ValidatedQuery};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct OperationLogListParams {
    #[serde(default, alias = "pageNum", deserialize_with = "lenient::option_number")]
    #[validate(range(min = 1, message = "1 以上を指定してください"))]
    pub page_num:      Option<u64>,
    #[serde(default, alias = "pageSize", deserialize_with = "lenient::option_number")]
    #[validate(range(min = 1, max = 100, message = "1 以上 100 以下を指定してください"))]
    pub page_size:     Option<u64>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub title:         Option<String>,
    #[serde(default, alias = "operName", deserialize_with = "lenient::option_string")]
    pub oper_name:     Option<String>,
    #[serde(default, alias = "businessType", deserialize_with = "lenient::option_number")]
    pub business_type: Option<i32>,
    #[serde(default, deserialize_with = "lenient::option_number")]
    pub status:        Option<i32>,
}

impl TryFrom<OperationLogListParams> for OperationLogQuery {
    type Error = AppError;

    fn try_from(params: OperationLogListParams) -> Result<Self, Self::Error> {
        Ok(Self {
            title:         params.title,
            oper_name:     params.oper_name,
            business_type: params.business_type.map(BusinessType::try_from).transpose()?,
            status:        params.status.map(OperStatus::try_from).transpose()?,
            page_num:      params.page_num.unwrap_or(1),
            page_size:     params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        })
    }
}

pub async fn list_operation_logs(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<OperationLogListParams>,
) -> Result<Json<PaginatedResponse<OperationLog>>, AppError> {
    let query = OperationLogQuery::try_from(params)?;
    let (rows, total) = state.operation_log_repository.list(&query).await?;
    Ok(Json(PaginatedResponse::new(rows, total)))
}

pub async fn clean_operation_logs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<(), AppError> {
    state.operation_log_repository.clean().await?;
    log_business_event!(
        event.category = event::category::OPERATION_LOG,
        event.action = event::action::OPERATION_LOG_CLEANED,
        event.entity_type = event::entity_type::OPERATION_LOG,
        event.actor_id = user.user_id.value(),
        event.result = event::result::SUCCESS,
        "操作ログを全件削除しました"
    );
    Ok(())
}
