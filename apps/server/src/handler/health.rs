//! # ヘルスチェックハンドラ
//!
//! - `/health`: Liveness Check（常に `"healthy"` を返す）
//! - `/health/ready`: Readiness Check（MySQL / Redis の接続状態を確認）
//!
//! どちらも統一レスポンス形式には包まない（`raw_response`）。

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use kanri_shared::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
use redis::aio::ConnectionManager;
use sqlx::MySqlPool;
use tokio::task::JoinSet;

use crate::state::AppState;

/// 1 つの依存サービスあたりのタイムアウト
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness Check で確認する依存サービス
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// `checks` のキー
    fn name(&self) -> &'static str;

    async fn ping(&self) -> Result<(), String>;
}

pub struct MySqlProbe(pub MySqlPool);

#[async_trait]
impl ReadinessProbe for MySqlProbe {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn ping(&self) -> Result<(), String> {
        kanri_infra::db::ping(&self.0).await.map_err(|e| e.to_string())
    }
}

pub struct RedisProbe {
    pub name: &'static str,
    pub conn: ConnectionManager,
}

#[async_trait]
impl ReadinessProbe for RedisProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn ping(&self) -> Result<(), String> {
        kanri_infra::redis::ping(&self.conn).await.map_err(|e| e.to_string())
    }
}

/// 依存サービスを並行チェックする
///
/// 全チェック OK → 200、1 つでも失敗 → 503。
#[tracing::instrument(skip_all)]
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut probes = JoinSet::new();
    for probe in state.readiness_probes.iter().cloned() {
        probes.spawn(async move { (probe.name(), check(probe).await) });
    }

    let mut checks = HashMap::new();
    while let Some(joined) = probes.join_next().await {
        match joined {
            Ok((name, status)) => {
                checks.insert(name.to_string(), status);
            }
            Err(e) => tracing::error!(error = %e, "readiness check: probe task failed"),
        }
    }

    let all_ok = checks.len() == state.readiness_probes.len()
        && checks.values().all(|s| matches!(s, CheckStatus::Ok));
    let (status, http_status) = if all_ok {
        (ReadinessStatus::Ready, StatusCode::OK)
    } else {
        (ReadinessStatus::NotReady, StatusCode::SERVICE_UNAVAILABLE)
    };

    (http_status, Json(ReadinessResponse { status, checks }))
}

async fn check(probe: Arc<dyn ReadinessProbe>) -> CheckStatus {
    match tokio::time::timeout(PROBE_TIMEOUT, probe.ping()).await {
        Ok(Ok(())) => CheckStatus::Ok,
        Ok(Err(e)) => {
            tracing::warn!(probe = probe.name(), error = %e, "readiness check: ping failed");
            CheckStatus::Error
        }
        Err(_) => {
            tracing::warn!(probe = probe.name(), "readiness check: timed out");
            CheckStatus::Error
        }
    }
}
