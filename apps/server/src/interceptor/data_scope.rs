//! # データ権限インターセプタ
//!
//! `data_scope(dept_alias, user_alias)` なルートで、ログインユーザーのロールから
//! [`DataScopeFilter`] を組み立ててリクエスト拡張に格納する。
//! ハンドラは `Option<Extension<DataScopeFilter>>` で受け取り、リポジトリに渡す。
//!
//! 超級管理者、またはデータ範囲「全データ」のロールを持つユーザーにはフィルタを付けない。

use axum::{extract::Request, middleware::Next, response::Response};
use kanri_domain::{data_scope::DataScopeFilter, user::LoginUser};

use crate::policy::route_policy;

pub async fn data_scope(mut request: Request, next: Next) -> Response {
    if let Some(meta) = route_policy(&request).data_scope {
        let filter = request
            .extensions()
            .get::<LoginUser>()
            .and_then(|user| DataScopeFilter::build(user, meta));
        if let Some(filter) = filter {
            tracing::debug!(sql = %filter.to_sql(), "データ権限を適用します");
            request.extensions_mut().insert(filter);
        }
    }
    next.run(request).await
}
