//! # OperationLogRepository
//!
//! `sys_oper_log` への操作ログの保存・検索・一括削除。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanri_domain::operation_log::{
   BusinessType,
   OperId,
   OperStatus,
   OperationLog,
   OperationLogQuery,
};
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};

use crate::error::InfraError;

#[async_trait]
pub trait OperationLogRepository: Send + Sync {
   /// 操作ログを保存し、採番された ID を返す
   async fn insert(&self, log: &OperationLog) -> Result<OperId, InfraError>;

   /// 新しい順に検索し、ページと総件数を返す
   async fn list(
      &self,
      query: &OperationLogQuery,
   ) -> Result<(Vec<OperationLog>, u64), InfraError>;

   /// 全件削除する
   async fn clean(&self) -> Result<(), InfraError>;
}

#[derive(FromRow)]
struct OperationLogRow {
   oper_id:        i64,
   title:          String,
   business_type:  i32,
   method:         String,
   request_method: String,
   oper_name:      String,
   oper_url:       String,
   oper_ip:        String,
   oper_param:     String,
   json_result:    String,
   status:         i32,
   error_msg:      String,
   oper_time:      DateTime<Utc>,
   cost_time:      i64,
}

impl TryFrom<OperationLogRow> for OperationLog {
   type Error = InfraError;

   fn try_from(row: OperationLogRow) -> Result<Self, Self::Error> {
      Ok(OperationLog {
         oper_id:        Some(OperId::new(row.oper_id)),
         title:          row.title,
         business_type:  BusinessType::try_from(row.business_type)?,
         method:         row.method,
         request_method: row.request_method,
         oper_name:      row.oper_name,
         oper_url:       row.oper_url,
         oper_ip:        row.oper_ip,
         oper_param:     row.oper_param,
         json_result:    row.json_result,
         status:         OperStatus::try_from(row.status)?,
         error_msg:      row.error_msg,
         oper_time:      row.oper_time,
         cost_time:      row.cost_time,
      })
   }
}

#[derive(Debug, Clone)]
pub struct MySqlOperationLogRepository {
   pool: MySqlPool,
}

impl MySqlOperationLogRepository {
   pub fn new(pool: MySqlPool) -> Self {
      Self { pool }
   }
}

fn push_list_conditions(builder: &mut QueryBuilder<'_, MySql>, query: &OperationLogQuery) {
   builder.push(" FROM sys_oper_log WHERE 1 = 1");

   if let Some(title) = &query.title {
      builder
         .push(" AND title LIKE ")
         .push_bind(format!("%{title}%"));
   }
   if let Some(oper_name) = &query.oper_name {
      builder
         .push(" AND oper_name LIKE ")
         .push_bind(format!("%{oper_name}%"));
   }
   if let Some(business_type) = query.business_type {
      builder
         .push(" AND business_type = ")
         .push_bind(business_type.code());
   }
   if let Some(status) = query.status {
      builder.push(" AND status = ").push_bind(status.code());
   }
}

#[async_trait]
impl OperationLogRepository for MySqlOperationLogRepository {
   #[tracing::instrument(skip_all, fields(title = %log.title), level = "debug")]
   async fn insert(&self, log: &OperationLog) -> Result<OperId, InfraError> {
      let result = sqlx::query(
         r#"
            INSERT INTO sys_oper_log (
               title, business_type, method, request_method, oper_name, oper_url,
               oper_ip, oper_param, json_result, status, error_msg, oper_time, cost_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         "#,
      )
      .bind(&log.title)
      .bind(log.business_type.code())
      .bind(&log.method)
      .bind(&log.request_method)
      .bind(&log.oper_name)
      .bind(&log.oper_url)
      .bind(&log.oper_ip)
      .bind(&log.oper_param)
      .bind(&log.json_result)
      .bind(log.status.code())
      .bind(&log.error_msg)
      .bind(log.oper_time)
      .bind(log.cost_time)
      .execute(&self.pool)
      .await?;

      let id = i64::try_from(result.last_insert_id())
         .map_err(|e| InfraError::unexpected(format!("操作ログ ID が範囲外です: {e}")))?;
      Ok(OperId::new(id))
   }

   #[tracing::instrument(skip_all, level = "debug")]
   async fn list(
      &self,
      query: &OperationLogQuery,
   ) -> Result<(Vec<OperationLog>, u64), InfraError> {
      let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*)");
      push_list_conditions(&mut count, query);
      let (total,) = count
         .build_query_as::<(i64,)>()
         .fetch_one(&self.pool)
         .await?;

      let (limit, offset) = query.limit_offset();
      let mut select = QueryBuilder::<MySql>::new(
         "SELECT oper_id, title, business_type, method, request_method, oper_name, oper_url, \
          oper_ip, oper_param, json_result, status, error_msg, oper_time, cost_time",
      );
      push_list_conditions(&mut select, query);
      select
         .push(" ORDER BY oper_id DESC LIMIT ")
         .push_bind(limit)
         .push(" OFFSET ")
         .push_bind(offset);

      let rows = select
         .build_query_as::<OperationLogRow>()
         .fetch_all(&self.pool)
         .await?;
      let logs = rows
         .into_iter()
         .map(OperationLog::try_from)
         .collect::<Result<Vec<_>, _>>()?;

      Ok((logs, u64::try_from(total).unwrap_or_default()))
   }

   #[tracing::instrument(skip_all, level = "debug")]
   async fn clean(&self) -> Result<(), InfraError> {
      sqlx::query("TRUNCATE TABLE sys_oper_log")
         .execute(&self.pool)
         .await?;
      Ok(())
   }
}
