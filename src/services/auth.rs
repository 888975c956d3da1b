// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::{
        auth::{Claims, User},
        jobs::JobKind,
    },
    services::job_service::JobService,
};

const TOKEN_TTL_DAYS: i64 = 7;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Só o hash do token de recuperação vai para o banco.
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    job_service: JobService,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, job_service: JobService, jwt_secret: String, pool: PgPool) -> Self {
        Self { user_repo, job_service, jwt_secret, pool }
    }

    pub async fn register_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        // Hashing fora da transação, em thread bloqueante
        let hashed_password = Self::hash_password(password).await?;

        let new_user = self
            .user_repo
            .create_user(&self.pool, email.trim(), &hashed_password)
            .await?;

        tracing::info!("👤 Usuário {} registrado", new_user.id);
        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_token(token)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// Sempre "funciona" para quem chama: e-mail desconhecido só gera log.
    /// Quando existe, grava o hash do token e enfileira a notificação.
    pub async fn request_password_recovery(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.user_repo.find_by_email(email.trim()).await? else {
            tracing::info!("Recuperação de senha para e-mail não cadastrado");
            return Ok(());
        };

        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        let mut tx = self.pool.begin().await?;

        self.user_repo
            .create_reset_token(&mut *tx, user.id, &hash_reset_token(&token), expires_at)
            .await?;

        let payload = json!({
            "type": "password_reset",
            "userId": user.id,
            "email": user.email,
            "token": token,
            "expiresAt": expires_at,
        });
        self.job_service
            .enqueue(&mut *tx, None, JobKind::Notification, &payload, None)
            .await?;

        tx.commit().await?;

        tracing::info!("🔑 Token de recuperação gerado para o usuário {}", user.id);
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let hashed_password = Self::hash_password(new_password).await?;

        let mut tx = self.pool.begin().await?;

        let reset = self
            .user_repo
            .find_reset_token_for_update(&mut *tx, &hash_reset_token(token.trim()))
            .await?
            .ok_or(AppError::InvalidResetToken)?;

        if reset.used_at.is_some() || reset.expires_at <= Utc::now() {
            return Err(AppError::InvalidResetToken);
        }

        self.user_repo.update_password(&mut *tx, reset.user_id, &hashed_password).await?;
        self.user_repo.mark_reset_token_used(&mut *tx, reset.id).await?;

        tx.commit().await?;

        tracing::info!("🔑 Senha redefinida para o usuário {}", reset.user_id);
        Ok(())
    }

    async fn hash_password(password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::JobRepository;
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str) -> AuthService {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/barbearia_test").unwrap();
        AuthService::new(
            UserRepository::new(pool.clone()),
            JobService::new(JobRepository::new()),
            secret.to_string(),
            pool,
        )
    }

    #[tokio::test]
    async fn issued_token_carries_the_user_id() {
        let auth = service("segredo");
        let user_id = Uuid::new_v4();

        let token = auth.create_token(user_id).unwrap();
        let claims = auth.decode_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, (TOKEN_TTL_DAYS * 24 * 3600) as usize);
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let token = service("outro").create_token(Uuid::new_v4()).unwrap();
        assert!(matches!(service("segredo").decode_token(&token), Err(AppError::InvalidToken)));
        assert!(matches!(service("segredo").decode_token("lixo"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn reset_token_hash_is_stable_hex() {
        let hashed = hash_reset_token("abc");
        assert_eq!(hashed, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_ne!(hash_reset_token("abd"), hashed);
    }
}
