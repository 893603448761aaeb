//! # アプリケーション状態
//!
//! 全ガード・インターセプタ・ハンドラが共有する依存関係。
//! 具象型は `main` で組み立て、テストではインメモリ実装を注入する。

use std::sync::Arc;

use kanri_domain::clock::Clock;
use kanri_infra::{
    PasswordChecker,
    SubmitLock,
    TokenStore,
    repository::{OperationLogRepository, UserRepository},
};

use crate::{config::AppConfig, guard::throttle::Throttler, handler::health::ReadinessProbe, jwt::JwtService};

#[derive(Clone)]
pub struct AppState {
    pub config:                   Arc<AppConfig>,
    pub jwt:                      JwtService,
    pub token_store:              Arc<dyn TokenStore>,
    pub submit_lock:              Arc<dyn SubmitLock>,
    pub user_repository:          Arc<dyn UserRepository>,
    pub operation_log_repository: Arc<dyn OperationLogRepository>,
    pub password_checker:         Arc<dyn PasswordChecker>,
    pub clock:                    Arc<dyn Clock>,
    pub throttler:                Arc<Throttler>,
    /// `/health/ready` で確認する依存サービス
    pub readiness_probes:         Arc<Vec<Arc<dyn ReadinessProbe>>>,
}

impl AppState {
    /// トークンストアに保存するトークンの TTL
    pub fn token_ttl(&self) -> std::time::Duration {
        self.config.jwt.expires_in
    }
}
