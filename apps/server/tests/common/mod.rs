//! 結合テスト共通のハーネス
//!
//! 本番と同じミドルウェア構成のルーターに、インメモリのリポジトリ・トークンストアを注入する。

#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use kanri_domain::{
    clock::SystemClock,
    data_scope::DataScope,
    role::{Permission, RoleId, RoleSummary},
    user::{DeptId, User, UserId, UserStatus},
};
use kanri_infra::{
    mock::{
        MockOperationLogRepository,
        MockPasswordChecker,
        MockSubmitLock,
        MockTokenStore,
        MockUserRepository,
    },
    repository::UserListRow,
};
use kanri_server::{
    app_builder::build_app,
    config::AppConfig,
    guard::Throttler,
    jwt::JwtService,
    state::AppState,
};
use tower::ServiceExt;

pub const ADMIN_PASSWORD: &str = "admin123";
pub const STAFF_PASSWORD: &str = "staff123";

pub struct TestApp {
    pub app:      Router,
    pub state:    AppState,
    pub tokens:   MockTokenStore,
    pub users:    MockUserRepository,
    pub oper_log: MockOperationLogRepository,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// 環境変数を上書きして起動する
    pub fn with_env(vars: &[(&'static str, &'static str)]) -> Self {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        let config = AppConfig::from_source(|key| vars.get(key).map(|v| v.to_string()))
            .expect("テスト用設定が読み込めること");

        let tokens = MockTokenStore::new();
        let users = MockUserRepository::new();
        let oper_log = MockOperationLogRepository::new();
        seed_users(&users);

        let state = AppState {
            jwt: JwtService::new(&config.jwt.secret),
            throttler: Arc::new(Throttler::new(&config.throttle)),
            config: Arc::new(config),
            token_store: Arc::new(tokens.clone()),
            submit_lock: Arc::new(MockSubmitLock::new()),
            user_repository: Arc::new(users.clone()),
            operation_log_repository: Arc::new(oper_log.clone()),
            password_checker: Arc::new(MockPasswordChecker),
            clock: Arc::new(SystemClock),
            readiness_probes: Arc::new(Vec::new()),
        };

        Self {
            app: build_app(state.clone()),
            state,
            tokens,
            users,
            oper_log,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// ログインして JWT を返す
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .send(json_request("POST", "/login", None, serde_json::json!({
                "username": username,
                "password": password,
            })))
            .await;
        assert_eq!(response.status(), 200, "{username} でログインできること");
        let body = body_json(response).await;
        body["data"]["token"]
            .as_str()
            .expect("data.token を含むこと")
            .to_string()
    }
}

/// 超級管理者 `admin`、部門 105 の一般職員 `staff`、停止中の `retired`
fn seed_users(users: &MockUserRepository) {
    users.add_row(list_row(1, 103, "admin"));
    users.add_row(list_row(2, 105, "staff"));
    users.add_user(
        user(1, 103, "admin", "管理者", ADMIN_PASSWORD, UserStatus::Normal),
        vec![RoleSummary::new(RoleId::new(1), "admin", DataScope::All)],
        Vec::new(),
    );
    users.add_user(
        user(2, 105, "staff", "一般職員", STAFF_PASSWORD, UserStatus::Normal),
        vec![RoleSummary::new(RoleId::new(2), "common", DataScope::DeptOnly)],
        vec![
            Permission::new("monitor:operlog:list"),
            Permission::new("system:user:list"),
        ],
    );
    users.add_user(
        user(3, 105, "retired", "退職者", STAFF_PASSWORD, UserStatus::Disabled),
        vec![RoleSummary::new(RoleId::new(2), "common", DataScope::DeptOnly)],
        Vec::new(),
    );
}

fn user(id: i64, dept: i64, name: &str, nick: &str, password: &str, status: UserStatus) -> User {
    User {
        user_id: UserId::new(id),
        dept_id: Some(DeptId::new(dept)),
        user_name: name.to_string(),
        nick_name: nick.to_string(),
        password: MockPasswordChecker::hash_of(password),
        status,
    }
}

fn list_row(id: i64, dept: i64, name: &str) -> UserListRow {
    UserListRow {
        user_id:     id,
        dept_id:     Some(dept),
        user_name:   name.to_string(),
        nick_name:   name.to_string(),
        email:       String::new(),
        phonenumber: String::new(),
        status:      "0".to_string(),
        create_time: None,
        dept_name:   None,
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// `X-Forwarded-For` を付けたログインリクエスト
pub fn login_request_from(forwarded_for: &str, username: &str, password: &str) -> Request<Body> {
    let mut request = json_request("POST", "/login", None, serde_json::json!({
        "username": username,
        "password": password,
    }));
    request
        .headers_mut()
        .insert("x-forwarded-for", forwarded_for.parse().unwrap());
    request
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
