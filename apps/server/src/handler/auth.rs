//! # 認証ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /login` - ログイン（公開・流量制限あり・デモ環境でも可）
//! - `POST /logout` - ログアウト（公開）
//! - `GET /getInfo` - ログインユーザーのロールと権限
//!
//! ログインに成功すると `LoginUser` をトークンストアに保存し、
//! その識別子を `uuid` クレームに入れた JWT を返す。

use axum::{Json, extract::State, http::HeaderMap};
use kanri_domain::{password::PlainPassword, user::LoginUser};
use kanri_shared::{
    event_log::{error, event},
    log_business_event,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    client_ip::ClientIp,
    error::AppError,
    guard::CurrentUser,
    jwt::bearer_token,
    state::AppState,
    validation::ValidatedJson,
};

/// ユーザー不存在とパスワード不一致で同じ文言を返す
const LOGIN_FAILED_MSG: &str = "ユーザー名またはパスワードが正しくありません";

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 2, max = 20, message = "ユーザー名は 2 文字以上 20 文字以下で入力してください"))]
    pub username: String,
    #[validate(length(min = 5, max = 20, message = "パスワードは 5 文字以上 20 文字以下で入力してください"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[tracing::instrument(skip_all, fields(username = %req.username))]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let Some(user) = state.user_repository.find_by_user_name(&req.username).await? else {
        log_business_event!(
            event.category = event::category::AUTH,
            event.action = event::action::LOGIN_FAILURE,
            event.entity_type = event::entity_type::USER,
            event.result = event::result::FAILURE,
            event.reason = "user_not_found",
            "ログイン失敗: ユーザー不存在"
        );
        return Err(AppError::BadRequest(LOGIN_FAILED_MSG.to_string()));
    };

    let verified = state
        .password_checker
        .verify(&PlainPassword::new(req.password), &user.password)
        .map_err(|e| {
            tracing::error!(
                error.category = error::category::INFRASTRUCTURE,
                error.kind = error::kind::PASSWORD_VERIFICATION,
                "パスワード検証で内部エラー: {}",
                e
            );
            AppError::Infra(e)
        })?;
    if !verified.is_match() {
        log_business_event!(
            event.category = event::category::AUTH,
            event.action = event::action::LOGIN_FAILURE,
            event.entity_type = event::entity_type::USER,
            event.entity_id = user.user_id.value(),
            event.result = event::result::FAILURE,
            event.reason = "password_mismatch",
            "ログイン失敗: パスワード不一致"
        );
        return Err(AppError::BadRequest(LOGIN_FAILED_MSG.to_string()));
    }

    user.ensure_can_login()?;

    let roles = state.user_repository.find_roles(user.user_id).await?;
    let permissions = state.user_repository.find_permissions(user.user_id).await?;

    let now = state.clock.now();
    let ttl = state.token_ttl();
    let chrono_ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| AppError::Internal(format!("トークン TTL が範囲外です: {e}")))?;
    let login_user = LoginUser::new(
        Uuid::new_v4().to_string(),
        &user,
        roles,
        permissions,
        ip.clone(),
        now,
        chrono_ttl,
    );

    state.token_store.save(&login_user, ttl).await?;
    state
        .user_repository
        .update_login_info(user.user_id, &ip, now)
        .await?;
    let token = state
        .jwt
        .sign(&login_user.token, login_user.user_id, now)
        .map_err(|e| AppError::Internal(format!("JWT の署名に失敗しました: {e}")))?;

    log_business_event!(
        event.category = event::category::AUTH,
        event.action = event::action::LOGIN_SUCCESS,
        event.entity_type = event::entity_type::USER,
        event.entity_id = user.user_id.value(),
        event.result = event::result::SUCCESS,
        "ログイン成功"
    );

    Ok(Json(LoginResponse { token }))
}

/// トークンが有効ならストアから削除する
///
/// トークンがない・不正な場合もエラーにしない。
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<(), AppError> {
    let Some(claims) = bearer_token(&headers).and_then(|t| state.jwt.verify(t).ok()) else {
        return Ok(());
    };

    if let Err(e) = state.token_store.delete(&claims.uuid).await {
        tracing::error!(
            error.category = error::category::INFRASTRUCTURE,
            error.kind = error::kind::TOKEN_STORE,
            "ログアウト時のトークン削除に失敗: {}",
            e
        );
        return Ok(());
    }

    log_business_event!(
        event.category = event::category::AUTH,
        event.action = event::action::LOGOUT,
        event.entity_type = event::entity_type::USER,
        event.entity_id = claims.user_id,
        event.result = event::result::SUCCESS,
        "ログアウト"
    );
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id:   i64,
    pub dept_id:   Option<i64>,
    pub user_name: String,
    pub nick_name: String,
    pub login_ip:  String,
}

#[derive(Debug, Serialize)]
pub struct GetInfoResponse {
    pub user:        UserInfo,
    pub roles:       Vec<String>,
    pub permissions: Vec<String>,
}

pub async fn get_info(CurrentUser(user): CurrentUser) -> Json<GetInfoResponse> {
    let roles = user.role_keys().into_iter().map(str::to_string).collect();
    let permissions = user.permissions.iter().map(|p| p.as_str().to_string()).collect();
    Json(GetInfoResponse {
        user: UserInfo {
            user_id:   user.user_id.value(),
            dept_id:   user.dept_id.map(|d| d.value()),
            user_name: user.user_name,
            nick_name: user.nick_name,
            login_ip:  user.ipaddr,
        },
        roles,
        permissions,
    })
}
