use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Duration;
use jsonwebtoken::{DecodingKey, EncodingKey};

use std::{net::SocketAddr, sync::Arc};

use crate::{
    ServerError,
    auth::{self, TokenType},
    budgets, categories, transactions, users,
};
use engine::{Engine, EngineError, User};
use uuid::Uuid;

/// Signing keys and lifetimes of the issued tokens.
#[derive(Clone)]
pub struct AuthConfig {
    pub(crate) encoding: EncodingKey,
    pub(crate) decoding: DecodingKey,
    pub(crate) access_ttl: Duration,
    pub(crate) refresh_ttl: Duration,
}

impl AuthConfig {
    /// HS256 keys derived from `secret`.
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub auth: Arc<AuthConfig>,
}

impl ServerState {
    /// Load the user a token was issued to.
    ///
    /// A user that no longer exists makes the token invalid (401); a disabled
    /// account is rejected with 403.
    pub(crate) async fn active_user(&self, user_id: Uuid) -> Result<User, ServerError> {
        let user = self.engine.user(user_id).await.map_err(|err| match err {
            EngineError::KeyNotFound(_) => ServerError::Unauthorized("user not found".to_string()),
            other => other.into(),
        })?;
        if !user.is_active {
            return Err(EngineError::Forbidden("user account is disabled".to_string()).into());
        }
        Ok(user)
    }
}

/// Resolve the bearer access token into the [`engine::User`] it was issued
/// to and hand it to the handler as an extension.
async fn require_user(
    State(state): State<ServerState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(ServerError::Unauthorized(
            "authentication credentials were not provided".to_string(),
        ));
    };

    let claims = state.auth.decode(bearer.token(), TokenType::Access)?;
    let user = state.active_user(claims.sub).await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/request-reset", post(auth::request_reset))
        .route("/auth/confirm-reset", post(auth::confirm_reset));

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/profile", get(users::profile).put(users::update_profile))
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{id}",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/transactions/balance", get(transactions::balance))
        .route(
            "/transactions/{kind}",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/{kind}/{id}",
            get(transactions::get)
                .put(transactions::update)
                .delete(transactions::delete),
        )
        .route("/budgets", get(budgets::list).post(budgets::create))
        .route("/budgets/warnings", get(budgets::warnings))
        .route(
            "/budgets/{id}",
            get(budgets::get).put(budgets::update).delete(budgets::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    public.merge(protected).with_state(state)
}

pub async fn run(engine: Engine, auth: AuthConfig, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, auth, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    auth: AuthConfig,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        auth: Arc::new(auth),
    };

    axum::serve(listener, router(state)).await
}
