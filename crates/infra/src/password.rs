//! # パスワード検証
//!
//! Argon2id による保存済みハッシュとの照合。ハッシュの生成はユーザー管理側の責務。

use argon2::{
    Argon2,
    Params,
    PasswordVerifier as _,
    password_hash::PasswordHash as Argon2PasswordHash,
};
use kanri_domain::password::{PasswordHash, PasswordVerifyResult, PlainPassword};

use crate::InfraError;

pub trait PasswordChecker: Send + Sync {
    /// 平文パスワードと保存済みハッシュを照合する
    ///
    /// # Errors
    ///
    /// ハッシュが PHC 文字列として解釈できない場合
    fn verify(
        &self,
        password: &PlainPassword,
        hash: &PasswordHash,
    ) -> Result<PasswordVerifyResult, InfraError>;
}

/// Argon2id（m=64MB, t=1, p=1）による実装
pub struct Argon2PasswordChecker {
    argon2: Argon2<'static>,
}

impl Argon2PasswordChecker {
    pub fn new() -> Result<Self, InfraError> {
        let params = Params::new(65536, 1, 1, None)
            .map_err(|e| InfraError::unexpected(format!("Argon2 パラメータが不正です: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        })
    }
}

impl PasswordChecker for Argon2PasswordChecker {
    fn verify(
        &self,
        password: &PlainPassword,
        hash: &PasswordHash,
    ) -> Result<PasswordVerifyResult, InfraError> {
        let parsed = Argon2PasswordHash::new(hash.as_str())
            .map_err(|e| InfraError::invalid_data(format!("不正なハッシュ形式: {e}")))?;

        let matched = self
            .argon2
            .verify_password(password.as_str().as_bytes(), &parsed)
            .is_ok();

        Ok(PasswordVerifyResult::from(matched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // マイグレーションのシード管理者と同じハッシュ（password123）
    const SEED_ADMIN_HASH: &str = "$argon2id$v=19$m=65536,t=1,p=1$olntqw+EoVpwH4B1vUAI0A$5yCA1izLODgz8nQOInDGwbuQB/AS0sIQDwpmIilve5M";

    fn checker() -> Argon2PasswordChecker {
        Argon2PasswordChecker::new().unwrap()
    }

    #[test]
    fn test_シード管理者のハッシュを検証できる() {
        let result = checker()
            .verify(&PlainPassword::new("password123"), &PasswordHash::new(SEED_ADMIN_HASH))
            .unwrap();

        assert!(result.is_match());
    }

    #[test]
    fn test_シード管理者のハッシュに別のパスワードは一致しない() {
        let result = checker()
            .verify(&PlainPassword::new("password124"), &PasswordHash::new(SEED_ADMIN_HASH))
            .unwrap();

        assert_eq!(result, PasswordVerifyResult::Mismatch);
    }

    #[test]
    fn test_不正なハッシュ形式はエラー() {
        let result = checker().verify(
            &PlainPassword::new("admin123"),
            &PasswordHash::new("not-a-valid-hash"),
        );

        assert!(result.is_err());
    }
}
