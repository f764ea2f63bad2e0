use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, NewUserCmd, ProfileUpdateCmd, ResultEngine, User, revoked_tokens, users,
    util::{normalize_currency, normalize_email},
};

use super::{Engine, with_tx};

const DEFAULT_CURRENCY: &str = "USD";
const OTP_TTL_MINUTES: i64 = 10;
const MIN_PASSWORD_LEN: usize = 8;

/// A freshly issued password-reset code.
///
/// Delivering the code (email, SMS, ...) is up to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordReset {
    pub email: String,
    pub otp: String,
}

fn validate_password(password: &str) -> ResultEngine<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(EngineError::InvalidName(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Six decimal digits taken from a v4 UUID's random bits.
fn generate_otp() -> String {
    let value = Uuid::new_v4().as_u128() % 900_000 + 100_000;
    format!("{value:06}")
}

impl Engine {
    async fn find_user_by_email<C>(&self, db: &C, email: &str) -> ResultEngine<Option<users::Model>>
    where
        C: sea_orm::ConnectionTrait,
    {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Create a user. The email must not be registered yet.
    pub async fn register(&self, cmd: NewUserCmd) -> ResultEngine<User> {
        let email = normalize_email(&cmd.email)?;
        validate_password(&cmd.password)?;
        let password_hash = bcrypt::hash(&cmd.password, self.bcrypt_cost)?;

        with_tx!(self, |db_tx| {
            if self.find_user_by_email(&db_tx, &email).await?.is_some() {
                return Err(EngineError::ExistingKey(email));
            }

            let now = Utc::now();
            let model = users::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                email: ActiveValue::Set(email.clone()),
                full_name: ActiveValue::Set(cmd.full_name.trim().to_string()),
                currency: ActiveValue::Set(DEFAULT_CURRENCY.to_string()),
                notify_on_budget_exceed: ActiveValue::Set(true),
                password_hash: ActiveValue::Set(password_hash),
                otp: ActiveValue::Set(None),
                otp_created_at: ActiveValue::Set(None),
                is_active: ActiveValue::Set(true),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(user_id = %model.id, "user registered");
            Ok(User::from(model))
        })
    }

    /// Check an email/password pair.
    ///
    /// Unknown emails and wrong passwords both yield
    /// [`EngineError::InvalidCredentials`]; disabled accounts yield
    /// [`EngineError::Forbidden`].
    pub async fn authenticate(&self, email: &str, password: &str) -> ResultEngine<User> {
        let email = normalize_email(email).map_err(|_| EngineError::InvalidCredentials)?;
        let model = self
            .find_user_by_email(&self.database, &email)
            .await?
            .ok_or(EngineError::InvalidCredentials)?;

        if !bcrypt::verify(password, &model.password_hash)? {
            return Err(EngineError::InvalidCredentials);
        }
        if !model.is_active {
            return Err(EngineError::Forbidden("user account is disabled".to_string()));
        }
        Ok(User::from(model))
    }

    /// Return a user by id.
    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        self.require_user(&self.database, user_id)
            .await
            .map(User::from)
    }

    /// Partially update the profile of `user_id`.
    pub async fn update_profile(&self, user_id: Uuid, cmd: ProfileUpdateCmd) -> ResultEngine<User> {
        let currency = cmd.currency.as_deref().map(normalize_currency).transpose()?;

        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            let mut active: users::ActiveModel = model.into();
            if let Some(full_name) = cmd.full_name {
                active.full_name = ActiveValue::Set(full_name.trim().to_string());
            }
            if let Some(currency) = currency {
                active.currency = ActiveValue::Set(currency);
            }
            if let Some(notify) = cmd.notify_on_budget_exceed {
                active.notify_on_budget_exceed = ActiveValue::Set(notify);
            }
            active.updated_at = ActiveValue::Set(Utc::now());
            let model = active.update(&db_tx).await?;
            Ok(User::from(model))
        })
    }

    /// Issue a one-time code for resetting the password of `email`.
    ///
    /// A new request replaces any previous code.
    pub async fn request_password_reset(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<PasswordReset> {
        let email = normalize_email(email)?;
        with_tx!(self, |db_tx| {
            let model = self
                .find_user_by_email(&db_tx, &email)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("user with this email does not exist".to_string())
                })?;

            let otp = generate_otp();
            let mut active: users::ActiveModel = model.into();
            active.otp = ActiveValue::Set(Some(otp.clone()));
            active.otp_created_at = ActiveValue::Set(Some(now));
            active.update(&db_tx).await?;

            Ok(PasswordReset {
                email: email.clone(),
                otp,
            })
        })
    }

    /// Replace the password of `email` if `otp` matches a code issued less
    /// than ten minutes before `now`. The code is consumed on success.
    pub async fn confirm_password_reset(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let invalid = || EngineError::InvalidOtp("invalid email or OTP".to_string());
        let email = normalize_email(email).map_err(|_| invalid())?;
        validate_password(new_password)?;

        with_tx!(self, |db_tx| {
            let model = self
                .find_user_by_email(&db_tx, &email)
                .await?
                .ok_or_else(invalid)?;

            let (Some(stored), Some(issued_at)) = (model.otp.as_deref(), model.otp_created_at)
            else {
                return Err(invalid());
            };
            if stored != otp.trim() {
                return Err(invalid());
            }
            if now - issued_at > Duration::minutes(OTP_TTL_MINUTES) {
                return Err(EngineError::InvalidOtp("OTP has expired".to_string()));
            }

            let password_hash = bcrypt::hash(new_password, self.bcrypt_cost)?;
            let mut active: users::ActiveModel = model.into();
            active.password_hash = ActiveValue::Set(password_hash);
            active.otp = ActiveValue::Set(None);
            active.otp_created_at = ActiveValue::Set(None);
            active.updated_at = ActiveValue::Set(now);
            let model = active.update(&db_tx).await?;
            tracing::info!(user_id = %model.id, "password reset");
            Ok(())
        })
    }

    /// Blacklist a refresh token until it expires.
    ///
    /// Revoking an already revoked token is a no-op. Entries whose expiry is
    /// past are purged on the way.
    pub async fn revoke_token(
        &self,
        user_id: Uuid,
        jti: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            revoked_tokens::Entity::delete_many()
                .filter(revoked_tokens::Column::ExpiresAt.lt(now))
                .exec(&db_tx)
                .await?;

            let existing = revoked_tokens::Entity::find_by_id(jti.to_string())
                .one(&db_tx)
                .await?;
            if existing.is_none() {
                revoked_tokens::ActiveModel {
                    jti: ActiveValue::Set(jti.to_string()),
                    user_id: ActiveValue::Set(user_id),
                    expires_at: ActiveValue::Set(expires_at),
                    revoked_at: ActiveValue::Set(now),
                }
                .insert(&db_tx)
                .await?;
            }
            Ok(())
        })
    }

    pub async fn is_token_revoked(&self, jti: &str) -> ResultEngine<bool> {
        let row = revoked_tokens::Entity::find_by_id(jti.to_string())
            .one(&self.database)
            .await?;
        Ok(row.is_some())
    }
}
