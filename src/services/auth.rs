// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AdminRepository,
    models::auth::{AdminRole, AdminUser, AuthResponse, Claims, CreateAdminPayload, UpdateAdminPayload},
};

const TOKEN_TTL_DAYS: i64 = 7;

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("password hashing task failed: {e}"))??;
    Ok(hashed)
}

/// Deleted and disabled accounts lose their sessions immediately.
fn token_holder(claims: &Claims, admin: Option<AdminUser>) -> Result<AdminUser, AppError> {
    let admin = admin.ok_or(AppError::InvalidToken)?;
    if !admin.active {
        tracing::warn!(admin_id = %admin.id, "token presented for a disabled account");
        return Err(AppError::InvalidToken);
    }
    if admin.role != claims.role {
        tracing::debug!(admin_id = %admin.id, token_role = claims.role.as_str(), role = admin.role.as_str(), "role changed since sign-in");
    }
    Ok(admin)
}

#[derive(Clone)]
pub struct AuthService {
    admin_repo: AdminRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(admin_repo: AdminRepository, jwt_secret: String) -> Self {
        Self { admin_repo, jwt_secret }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let admin = self
            .admin_repo
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !admin.active {
            tracing::warn!(admin_id = %admin.id, "login attempt on a disabled account");
            return Err(AppError::InvalidCredentials);
        }

        let password = password.to_owned();
        let password_hash = admin.password_hash.clone();
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("password check task failed: {e}"))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(&admin)?;
        tracing::info!(admin_id = %admin.id, role = admin.role.as_str(), "admin logged in");
        Ok(AuthResponse { token, admin })
    }

    /// Checks the signature and expiry only.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims)
    }

    /// Resolves a bearer token to the stored admin. Name and role come from
    /// the database, not from the token.
    pub async fn validate_token(&self, token: &str) -> Result<AdminUser, AppError> {
        let claims = self.decode_claims(token)?;
        let admin = self.admin_repo.find_by_id(claims.sub).await?;
        token_holder(&claims, admin)
    }

    pub fn create_token(&self, admin: &AdminUser) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: admin.id,
            name: admin.name.clone(),
            role: admin.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    /// Creates the first Owner when the admin table is empty.
    pub async fn bootstrap_owner(&self, email: &str, password: &str) -> Result<Option<AdminUser>, AppError> {
        if self.admin_repo.count(self.admin_repo.pool()).await? > 0 {
            return Ok(None);
        }

        let password_hash = hash_password(password).await?;
        let owner = self
            .admin_repo
            .create(self.admin_repo.pool(), "Owner", email, &password_hash, AdminRole::Owner)
            .await?;

        tracing::info!(admin_id = %owner.id, "bootstrap owner created");
        Ok(Some(owner))
    }

    pub async fn get_admin(&self, id: Uuid) -> Result<AdminUser, AppError> {
        self.admin_repo.find_by_id(id).await?.ok_or(AppError::NotFound("Admin"))
    }

    pub async fn list_admins(&self) -> Result<Vec<AdminUser>, AppError> {
        self.admin_repo.list(self.admin_repo.pool()).await
    }

    pub async fn create_admin(&self, input: &CreateAdminPayload) -> Result<AdminUser, AppError> {
        let password_hash = hash_password(&input.password).await?;
        let admin = self
            .admin_repo
            .create(self.admin_repo.pool(), &input.name, &input.email, &password_hash, input.role)
            .await?;

        tracing::info!(admin_id = %admin.id, role = admin.role.as_str(), "admin created");
        Ok(admin)
    }

    pub async fn update_admin(&self, id: Uuid, input: &UpdateAdminPayload) -> Result<AdminUser, AppError> {
        let password_hash = match input.password.as_deref() {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        self.admin_repo
            .update(
                self.admin_repo.pool(),
                id,
                &input.name,
                input.role,
                input.active,
                password_hash.as_deref(),
            )
            .await?
            .ok_or(AppError::NotFound("Admin"))
    }

    /// Owners cannot delete their own account.
    pub async fn delete_admin(&self, id: Uuid, acting_admin: Uuid) -> Result<(), AppError> {
        if id == acting_admin {
            return Err(AppError::InvalidInput("You cannot delete your own account.".into()));
        }
        if !self.admin_repo.delete(self.admin_repo.pool(), id).await? {
            return Err(AppError::NotFound("Admin"));
        }
        tracing::info!(admin_id = %id, "admin deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service() -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool");
        AuthService::new(AdminRepository::new(pool), "test-secret".to_string())
    }

    fn admin(role: AdminRole) -> AdminUser {
        AdminUser {
            id: Uuid::from_u128(7),
            name: "Aisha Khan".to_string(),
            email: "aisha@example.org".to_string(),
            password_hash: String::new(),
            role,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn token_round_trips_claims() {
        let svc = service();
        let token = svc.create_token(&admin(AdminRole::Finance)).unwrap();

        let claims = svc.decode_claims(&token).unwrap();
        assert_eq!(claims.sub, Uuid::from_u128(7));
        assert_eq!(claims.name, "Aisha Khan");
        assert_eq!(claims.role, AdminRole::Finance);
    }

    #[tokio::test]
    async fn foreign_tokens_are_rejected() {
        let token = service().create_token(&admin(AdminRole::Owner)).unwrap();
        let other = AuthService::new(
            AdminRepository::new(
                PgPoolOptions::new()
                    .connect_lazy("postgres://localhost/unused")
                    .expect("lazy pool"),
            ),
            "another-secret".to_string(),
        );

        assert!(matches!(other.decode_claims(&token), Err(AppError::InvalidToken)));
        assert!(matches!(other.decode_claims("not-a-token"), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn stored_role_overrides_the_token_role() {
        let svc = service();
        let token = svc.create_token(&admin(AdminRole::Owner)).unwrap();
        let claims = svc.decode_claims(&token).unwrap();

        let demoted = token_holder(&claims, Some(admin(AdminRole::Viewer))).unwrap();
        assert_eq!(demoted.role, AdminRole::Viewer);
    }

    #[tokio::test]
    async fn deleted_or_disabled_admins_lose_their_session() {
        let svc = service();
        let claims = svc.decode_claims(&svc.create_token(&admin(AdminRole::Owner)).unwrap()).unwrap();

        assert!(matches!(token_holder(&claims, None), Err(AppError::InvalidToken)));

        let mut disabled = admin(AdminRole::Owner);
        disabled.active = false;
        assert!(matches!(token_holder(&claims, Some(disabled)), Err(AppError::InvalidToken)));
    }
}
