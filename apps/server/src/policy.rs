//! # ルートポリシー
//!
//! 各ルートに付与するメタデータ（公開・必要ロール・必要権限・重複送信間隔など）と、
//! ルート登録時にポリシーを同時に記録する [`PolicyRouter`]。
//!
//! ## 仕組み
//!
//! ```text
//! PolicyRouter::get("/system/user/list", handler, policy)
//!     ├─ Router<AppState> にルートを追加
//!     └─ RouteTable に (GET, "/system/user/list") → policy を記録
//!
//! リクエスト時:
//!     attach_policy が MatchedPath からポリシーを引き、リクエスト拡張に格納
//!     → 各ガード・インターセプタは route_policy() で参照する
//! ```
//!
//! 登録されていないメソッド・パスの組み合わせは既定ポリシー（要認証）になる。
//! どのルートにもマッチしないリクエスト（フォールバック）は公開扱いにし、404 をそのまま返す。

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    handler::Handler,
    http::Method,
    middleware::Next,
    response::Response,
    routing::MethodRouter,
};
use kanri_domain::{data_scope::DataScopeMeta, operation_log::BusinessType, role::Permission};

use crate::state::AppState;

/// 操作ログの記録設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationLogMeta {
    pub title:              &'static str,
    pub business_type:      BusinessType,
    pub save_request_data:  bool,
    pub save_response_data: bool,
}

/// ルートごとのガード・インターセプタ設定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    /// JWT 認証を省略する
    pub public:        bool,
    /// いずれかを保持していればよいロールキー
    pub roles:         Vec<String>,
    /// いずれかを満たしていればよい権限
    pub permissions:   Vec<Permission>,
    /// デモ環境でも書き込みを許可する
    pub allow_in_demo: bool,
    /// 重複送信とみなす間隔
    pub repeat_submit: Option<Duration>,
    /// IP 単位のレート制限を適用する
    pub throttled:     bool,
    pub operation_log: Option<OperationLogMeta>,
    pub data_scope:    Option<DataScopeMeta>,
    /// レスポンスを統一形式に包まない
    pub raw_response:  bool,
}

impl RoutePolicy {
    /// 認証必須・追加要件なし
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// 認証不要
    pub fn public() -> Self {
        Self {
            public: true,
            ..Self::default()
        }
    }

    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn permission(mut self, permission: &str) -> Self {
        self.permissions.push(Permission::new(permission));
        self
    }

    pub fn allow_in_demo(mut self) -> Self {
        self.allow_in_demo = true;
        self
    }

    pub fn repeat_submit(mut self, interval: Duration) -> Self {
        self.repeat_submit = Some(interval);
        self
    }

    pub fn throttled(mut self) -> Self {
        self.throttled = true;
        self
    }

    pub fn operation_log(mut self, title: &'static str, business_type: BusinessType) -> Self {
        self.operation_log = Some(OperationLogMeta {
            title,
            business_type,
            save_request_data: true,
            save_response_data: true,
        });
        self
    }

    pub fn data_scope(mut self, dept_alias: &'static str, user_alias: &'static str) -> Self {
        self.data_scope = Some(DataScopeMeta::new(dept_alias, user_alias));
        self
    }

    pub fn raw_response(mut self) -> Self {
        self.raw_response = true;
        self
    }
}

/// (メソッド, ルートパターン) → ポリシー
#[derive(Debug, Clone)]
pub struct RouteTable {
    policies:  HashMap<(Method, String), Arc<RoutePolicy>>,
    fallback:  Arc<RoutePolicy>,
    unmatched: Arc<RoutePolicy>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            policies:  HashMap::new(),
            fallback:  Arc::new(RoutePolicy::authenticated()),
            unmatched: Arc::new(RoutePolicy::public()),
        }
    }
}

impl RouteTable {
    pub fn insert(&mut self, method: Method, path: impl Into<String>, policy: RoutePolicy) {
        self.policies.insert((method, path.into()), Arc::new(policy));
    }

    /// マッチしたルートのポリシー（未登録なら既定ポリシー）
    pub fn lookup(&self, method: &Method, matched_path: &str) -> Arc<RoutePolicy> {
        self.policies
            .get(&(method.clone(), matched_path.to_string()))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// どのルートにもマッチしなかったリクエストのポリシー
    pub fn unmatched(&self) -> Arc<RoutePolicy> {
        self.unmatched.clone()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// ルートとポリシーを同時に登録するルーター
pub struct PolicyRouter {
    prefix: String,
    router: Router<AppState>,
    table:  RouteTable,
}

impl PolicyRouter {
    /// `prefix` は全ルートの先頭に付与される（空文字列なら接頭辞なし）
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            router: Router::new(),
            table:  RouteTable::default(),
        }
    }

    pub fn get<H, T>(self, path: &str, handler: H, policy: RoutePolicy) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.on(Method::GET, path, axum::routing::get(handler), policy)
    }

    pub fn post<H, T>(self, path: &str, handler: H, policy: RoutePolicy) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.on(Method::POST, path, axum::routing::post(handler), policy)
    }

    pub fn delete<H, T>(self, path: &str, handler: H, policy: RoutePolicy) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.on(Method::DELETE, path, axum::routing::delete(handler), policy)
    }

    fn on(
        mut self,
        method: Method,
        path: &str,
        method_router: MethodRouter<AppState>,
        policy: RoutePolicy,
    ) -> Self {
        let full_path = format!("{}{}", self.prefix, path);
        self.table.insert(method, full_path.clone(), policy);
        self.router = self.router.route(&full_path, method_router);
        self
    }

    /// 接頭辞の異なる `PolicyRouter` のルートとポリシーを取り込む
    pub fn merge(mut self, other: PolicyRouter) -> Self {
        self.router = self.router.merge(other.router);
        self.table.policies.extend(other.table.policies);
        self
    }

    pub fn into_parts(self) -> (Router<AppState>, RouteTable) {
        (self.router, self.table)
    }
}

/// マッチしたルートのポリシーをリクエスト拡張に格納するミドルウェア
///
/// 全ガードより外側に配置する。
pub async fn attach_policy(
    State(table): State<Arc<RouteTable>>,
    mut request: Request,
    next: Next,
) -> Response {
    let policy = match request.extensions().get::<MatchedPath>() {
        Some(matched) => table.lookup(request.method(), matched.as_str()),
        None => table.unmatched(),
    };
    request.extensions_mut().insert(policy);
    next.run(request).await
}

/// リクエストに付与されたポリシー
///
/// `attach_policy` を通っていない場合は既定ポリシー（要認証）を返す。
pub fn route_policy<B>(request: &axum::http::Request<B>) -> Arc<RoutePolicy> {
    request
        .extensions()
        .get::<Arc<RoutePolicy>>()
        .cloned()
        .unwrap_or_else(|| Arc::new(RoutePolicy::authenticated()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_ビルダーで各設定を組み立てられる() {
        let policy = RoutePolicy::authenticated()
            .roles(["common"])
            .permission("monitor:operlog:remove")
            .repeat_submit(Duration::from_secs(5))
            .operation_log("操作ログ", BusinessType::Clean)
            .data_scope("d", "u");

        assert!(!policy.public);
        assert_eq!(policy.roles, vec!["common".to_string()]);
        assert_eq!(policy.permissions, vec![Permission::new("monitor:operlog:remove")]);
        assert_eq!(policy.repeat_submit, Some(Duration::from_secs(5)));
        assert_eq!(
            policy.operation_log.map(|m| (m.title, m.business_type)),
            Some(("操作ログ", BusinessType::Clean))
        );
        assert_eq!(policy.data_scope, Some(DataScopeMeta::new("d", "u")));
    }

    #[test]
    fn test_未登録のルートは既定ポリシーになる() {
        let mut table = RouteTable::default();
        table.insert(Method::POST, "/login", RoutePolicy::public().throttled());

        let login = table.lookup(&Method::POST, "/login");
        let other_method = table.lookup(&Method::GET, "/login");

        assert!(login.public);
        assert!(login.throttled);
        assert_eq!(*other_method, RoutePolicy::authenticated());
        assert!(table.unmatched().public);
    }

    #[test]
    fn test_接頭辞付きのパスで登録される() {
        async fn handler() {}

        let (_, table) = PolicyRouter::new("/api")
            .get("/getInfo", handler, RoutePolicy::authenticated())
            .post("/logout", handler, RoutePolicy::public())
            .into_parts();

        assert_eq!(table.len(), 2);
        assert!(table.lookup(&Method::POST, "/api/logout").public);
        assert!(!table.lookup(&Method::GET, "/api/getInfo").public);
    }

    #[test]
    fn test_接頭辞の異なるルーターを統合できる() {
        async fn handler() {}

        let health = PolicyRouter::new("").get("/health", handler, RoutePolicy::public().raw_response());
        let (_, table) = PolicyRouter::new("/api")
            .get("/getInfo", handler, RoutePolicy::authenticated())
            .merge(health)
            .into_parts();

        assert_eq!(table.len(), 2);
        assert!(table.lookup(&Method::GET, "/health").raw_response);
    }

    #[test]
    fn test_拡張がなければ既定ポリシー() {
        let request = axum::http::Request::new(());

        assert_eq!(*route_policy(&request), RoutePolicy::authenticated());
    }
}
