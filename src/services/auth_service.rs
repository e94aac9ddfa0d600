// src/services/auth_service.rs

use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::{
    common::error::AppError,
    models::auth::{AdminUser, Claims, LoginResponse},
};

// TTL da sessão do painel: 8 horas.
const SESSION_TTL_HOURS: i64 = 8;

// O painel tem um único operador, configurado por ambiente (usuário + hash
// bcrypt da senha). Não há tabela de usuários neste sistema.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    admin_username: Option<String>,
    admin_password_hash: Option<String>,
}

impl AuthService {
    pub fn new(
        jwt_secret: String,
        admin_username: Option<String>,
        admin_password_hash: Option<String>,
    ) -> Self {
        Self {
            jwt_secret,
            admin_username,
            admin_password_hash,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError> {
        let (expected_user, expected_hash) = match (&self.admin_username, &self.admin_password_hash)
        {
            (Some(user), Some(hash)) if !user.is_empty() && !hash.is_empty() => {
                (user.clone(), hash.clone())
            }
            _ => return Err(AppError::MissingConfig("ADMIN_USERNAME/ADMIN_PASSWORD_HASH")),
        };

        if username != expected_user {
            return Err(AppError::InvalidCredentials);
        }

        // bcrypt é caro de propósito; roda fora do executor async.
        let password = password.to_owned();
        let is_valid = tokio::task::spawn_blocking(move || verify(&password, &expected_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(username)
    }

    fn create_token(&self, username: &str) -> Result<LoginResponse, AppError> {
        let expires_at = Utc::now() + Duration::hours(SESSION_TTL_HOURS);
        let claims = Claims {
            sub: username.to_owned(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(LoginResponse { token, expires_at })
    }

    pub fn validate_token(&self, token: &str) -> Result<AdminUser, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(AdminUser {
            username: token_data.claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        // Custo mínimo só para o teste não demorar.
        let hash = bcrypt::hash("s3nha", 4).unwrap();
        AuthService::new(
            "segredo-de-teste".to_owned(),
            Some("admin".to_owned()),
            Some(hash),
        )
    }

    #[tokio::test]
    async fn login_issues_token_that_validates() {
        let svc = service();
        let response = svc.login("admin", "s3nha").await.unwrap();

        let admin = svc.validate_token(&response.token).unwrap();
        assert_eq!(admin.username, "admin");
        assert!(response.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn login_rejects_wrong_username_and_password() {
        let svc = service();
        assert!(matches!(
            svc.login("root", "s3nha").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.login("admin", "errada").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn login_without_env_config_fails_loudly() {
        let svc = AuthService::new("segredo".to_owned(), None, None);
        assert!(matches!(
            svc.login("admin", "x").await,
            Err(AppError::MissingConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_garbage_token() {
        let svc = service();
        assert!(svc.validate_token("nem-de-longe-um-jwt").is_err());
    }
}
