//! # JWT
//!
//! ログイントークンの署名と検証（HS256）。
//!
//! JWT はトークンストアのキー（`uuid`）を運ぶだけで、有効期限はトークンストアの TTL が持つ。
//! そのため `exp` は検証しない。

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use kanri_domain::user::UserId;
use serde::{Deserialize, Serialize};

/// JWT クレーム
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// トークンストアのキー
    pub uuid:    String,
    pub user_id: i64,
    pub iat:     i64,
}

/// 署名鍵を保持する JWT サービス
#[derive(Clone)]
pub struct JwtService {
    encoding:   EncodingKey,
    decoding:   DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn sign(
        &self,
        uuid: &str,
        user_id: UserId,
        issued_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            uuid:    uuid.to_string(),
            user_id: user_id.value(),
            iat:     issued_at.timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}

/// `Authorization: Bearer <token>` からトークンを取り出す
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
