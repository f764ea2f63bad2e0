//! Token issuing and the `/auth/*` endpoints.
//!
//! Access and refresh tokens are HS256 JWTs carrying the user id (`sub`), a
//! unique id (`jti`) and their [`TokenType`]. Logging out blacklists the
//! refresh token's `jti` until it expires.

use api_types::{
    Message,
    auth::{
        AccessToken, LoggedIn, Login, PasswordResetConfirm, PasswordResetRequest, RefreshToken,
        Register, Registered, Tokens,
    },
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{AuthConfig, ServerState},
};
use engine::NewUserCmd;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TokenType {
    Access,
    Refresh,
}

/// The contents of a JSON Web Token.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// Id of the user the token was issued to.
    pub sub: Uuid,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issue time, seconds since the epoch.
    pub iat: i64,
    pub jti: String,
    pub token_type: TokenType,
}

impl Claims {
    fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl AuthConfig {
    pub(crate) fn issue(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<String, ServerError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
            token_type,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| ServerError::Internal(format!("token creation failed: {err}")))
    }

    pub(crate) fn tokens(&self, user_id: Uuid) -> Result<Tokens, ServerError> {
        let now = Utc::now();
        Ok(Tokens {
            access: self.issue(user_id, TokenType::Access, now)?,
            refresh: self.issue(user_id, TokenType::Refresh, now)?,
        })
    }

    /// Verify signature and expiry of `token` and check it is of the
    /// `expected` type.
    pub(crate) fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, ServerError> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|err| ServerError::Unauthorized(format!("invalid token: {err}")))?
            .claims;
        if claims.token_type != expected {
            return Err(ServerError::Unauthorized(
                "invalid token: wrong token type".to_string(),
            ));
        }
        Ok(claims)
    }
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<Register>,
) -> Result<(StatusCode, Json<Registered>), ServerError> {
    let user = state
        .engine
        .register(NewUserCmd {
            email: payload.email,
            full_name: payload.full_name,
            password: payload.password,
        })
        .await?;
    let tokens = state.auth.tokens(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(Registered {
            msg: "User registered successfully".to_string(),
            tokens,
        }),
    ))
}

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<Login>,
) -> Result<Json<LoggedIn>, ServerError> {
    let user = state
        .engine
        .authenticate(&payload.email, &payload.password)
        .await?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(LoggedIn {
        tokens: state.auth.tokens(user.id)?,
    }))
}

pub async fn refresh(
    State(state): State<ServerState>,
    Json(payload): Json<RefreshToken>,
) -> Result<Json<AccessToken>, ServerError> {
    let claims = state.auth.decode(&payload.refresh, TokenType::Refresh)?;
    if state.engine.is_token_revoked(&claims.jti).await? {
        return Err(ServerError::Unauthorized(
            "token has been revoked".to_string(),
        ));
    }

    let user = state.active_user(claims.sub).await?;

    Ok(Json(AccessToken {
        access: state.auth.issue(user.id, TokenType::Access, Utc::now())?,
    }))
}

/// Blacklist the refresh token of the caller. Responds `205 Reset Content`.
pub async fn logout(
    Extension(user): Extension<engine::User>,
    State(state): State<ServerState>,
    Json(payload): Json<RefreshToken>,
) -> Result<StatusCode, ServerError> {
    let claims = state.auth.decode(&payload.refresh, TokenType::Refresh)?;
    if claims.sub != user.id {
        return Err(ServerError::Unauthorized(
            "token was issued to another user".to_string(),
        ));
    }

    state
        .engine
        .revoke_token(user.id, &claims.jti, claims.expires_at(), Utc::now())
        .await?;
    tracing::info!(user_id = %user.id, "refresh token revoked");
    Ok(StatusCode::RESET_CONTENT)
}

/// Issue a password-reset code. The code is delivered through the log.
pub async fn request_reset(
    State(state): State<ServerState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<Message>, ServerError> {
    let reset = state
        .engine
        .request_password_reset(&payload.email, Utc::now())
        .await?;
    tracing::info!(email = %reset.email, otp = %reset.otp, "password reset code issued");
    Ok(Json(Message {
        msg: "OTP sent to email".to_string(),
    }))
}

pub async fn confirm_reset(
    State(state): State<ServerState>,
    Json(payload): Json<PasswordResetConfirm>,
) -> Result<Json<Message>, ServerError> {
    state
        .engine
        .confirm_password_reset(
            &payload.email,
            &payload.otp,
            &payload.new_password,
            Utc::now(),
        )
        .await?;
    Ok(Json(Message {
        msg: "Password reset successful".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("test-secret", Duration::minutes(15), Duration::days(1))
    }

    #[test]
    fn issued_token_decodes_to_its_user() {
        let config = config();
        let user_id = Uuid::new_v4();
        let token = config
            .issue(user_id, TokenType::Access, Utc::now())
            .unwrap();
        let claims = config.decode(&token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let config = config();
        let tokens = config.tokens(Uuid::new_v4()).unwrap();
        assert!(config.decode(&tokens.refresh, TokenType::Access).is_err());
        assert!(config.decode(&tokens.access, TokenType::Refresh).is_err());
        assert!(config.decode(&tokens.refresh, TokenType::Refresh).is_ok());
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let config = config();
        let issued = Utc::now() - Duration::hours(1);
        let token = config
            .issue(Uuid::new_v4(), TokenType::Access, issued)
            .unwrap();
        assert!(config.decode(&token, TokenType::Access).is_err());

        let other = AuthConfig::new("other-secret", Duration::minutes(15), Duration::days(1));
        let token = other
            .issue(Uuid::new_v4(), TokenType::Access, Utc::now())
            .unwrap();
        assert!(config.decode(&token, TokenType::Access).is_err());
    }
}
