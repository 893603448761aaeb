//! ユニットテスト用のヘルパー
//!
//! インメモリ実装を注入した `AppState` と、ログイン済みユーザーの組み立て。

use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension,
    Router,
    body::Body,
    http::{Request, Response},
};
use chrono::{DateTime, TimeZone, Utc};
use kanri_domain::{
    clock::FixedClock,
    data_scope::DataScope,
    role::{Permission, RoleId, RoleSummary},
    user::{DeptId, LoginUser, UserId},
};
use kanri_infra::mock::{
    MockOperationLogRepository,
    MockPasswordChecker,
    MockSubmitLock,
    MockTokenStore,
    MockUserRepository,
};

use crate::{
    config::AppConfig,
    guard::Throttler,
    jwt::JwtService,
    policy::RoutePolicy,
    state::AppState,
};

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()
}

pub(crate) fn test_config(vars: HashMap<&'static str, &'static str>) -> AppConfig {
    AppConfig::from_source(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

pub(crate) struct TestContext {
    pub state:    AppState,
    pub tokens:   MockTokenStore,
    pub users:    MockUserRepository,
    pub oper_log: MockOperationLogRepository,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config(HashMap::new()))
    }

    /// リバースプロキシの背後（転送ヘッダーを信頼する）
    pub fn behind_proxy() -> Self {
        Self::with_config(test_config(HashMap::from([("TRUST_PROXY", "true")])))
    }

    pub fn with_config(config: AppConfig) -> Self {
        let tokens = MockTokenStore::new();
        let users = MockUserRepository::new();
        let oper_log = MockOperationLogRepository::new();
        let state = AppState {
            jwt: JwtService::new(&config.jwt.secret),
            throttler: Arc::new(Throttler::new(&config.throttle)),
            config: Arc::new(config),
            token_store: Arc::new(tokens.clone()),
            submit_lock: Arc::new(MockSubmitLock::new()),
            user_repository: Arc::new(users.clone()),
            operation_log_repository: Arc::new(oper_log.clone()),
            password_checker: Arc::new(MockPasswordChecker),
            clock: Arc::new(FixedClock(fixed_now())),
            readiness_probes: Arc::new(Vec::new()),
        };
        Self {
            state,
            tokens,
            users,
            oper_log,
        }
    }

    /// トークンストアに保存し、署名済み JWT を返す
    pub async fn login(&self, user: &LoginUser) -> String {
        use kanri_infra::TokenStore as _;

        self.tokens
            .save(user, self.state.token_ttl())
            .await
            .unwrap();
        self.state
            .jwt
            .sign(&user.token, user.user_id, fixed_now())
            .unwrap()
    }
}

/// ロールと権限を指定してログインユーザーを作る（残り有効期間は 1 時間）
pub(crate) fn login_user(roles: &[(&str, DataScope)], permissions: &[&str]) -> LoginUser {
    let now = fixed_now();
    LoginUser {
        token:       uuid::Uuid::new_v4().to_string(),
        user_id:     UserId::new(2),
        dept_id:     Some(DeptId::new(105)),
        user_name:   "staff".to_string(),
        nick_name:   "一般職員".to_string(),
        roles:       roles
            .iter()
            .enumerate()
            .map(|(i, (key, scope))| RoleSummary::new(RoleId::new(i as i64 + 1), *key, *scope))
            .collect(),
        permissions: permissions.iter().map(|p| Permission::new(*p)).collect(),
        login_time:  now,
        expire_time: now + chrono::Duration::hours(1),
        ipaddr:      "127.0.0.1".to_string(),
    }
}

/// ポリシーを直接リクエスト拡張に入れる
pub(crate) fn with_policy(router: Router, policy: RoutePolicy) -> Router {
    router.layer(Extension(Arc::new(policy)))
}

pub(crate) fn bearer_request(method: &str, uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(body).unwrap()
}

pub(crate) async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
