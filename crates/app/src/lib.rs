//! Duet application composition root
//!
//! Builds the stores, wires the domain services together and composes the
//! domain routers into a single application.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{extract::State, http::HeaderValue, routing::get, Json, Router};
use duet_accounts::{AccountsState, InMemoryUserStore, PgUserStore, RefreshCookie, UserStore};
use duet_auth::{AuthConfig, PasswordHasher, TokenService};
use duet_common::Config;
use duet_conversations::{
    ConversationDirectory, ConversationStore, ConversationsState, InMemoryConversationStore,
    MembershipStore, MessageLedger, MessageStore, PgConversationStore, PgMessageStore,
};
use duet_rooms::{RoomRouter, RoomsState};
use serde_json::{json, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Store handles shared by every domain
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub membership: Arc<dyn MembershipStore>,
    pub messages: Arc<dyn MessageStore>,
}

impl Stores {
    /// Process-local stores; contents are lost on restart
    pub fn in_memory() -> Self {
        let conversations = Arc::new(InMemoryConversationStore::new());
        Self {
            users: Arc::new(InMemoryUserStore::new()),
            conversations: conversations.clone(),
            membership: conversations.clone(),
            messages: conversations,
        }
    }

    /// PostgreSQL-backed stores; every call is bounded by `timeout`
    pub fn postgres(pool: PgPool, timeout: Duration) -> Self {
        let conversations = Arc::new(PgConversationStore::new(pool.clone(), timeout));
        Self {
            users: Arc::new(PgUserStore::new(pool.clone(), timeout)),
            conversations: conversations.clone(),
            membership: conversations,
            messages: Arc::new(PgMessageStore::new(pool, timeout)),
        }
    }

    /// Connect to `DATABASE_URL` and run migrations, or fall back to
    /// in-memory stores when it is unset.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let Some(database_url) = config.database_url.as_deref() else {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            return Ok(Self::in_memory());
        };

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(config.store_timeout())
            .connect(database_url)
            .await
            .context("Database connection failed")?;
        tracing::info!("Database connection established");

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .context("Database migration failed")?;
        tracing::info!("Database migrations applied");

        Ok(Self::postgres(pool, config.store_timeout()))
    }
}

/// The composed router plus the live room registry, which the binary also
/// hands to the heartbeat sweeper.
pub struct Application {
    pub router: Router,
    pub rooms: Arc<RoomRouter>,
}

/// Create the main application router with all routes and middleware
pub fn create_app(config: &Config, stores: Stores) -> anyhow::Result<Application> {
    let auth_config = AuthConfig::from(config);
    let hasher = PasswordHasher::from_config(&auth_config)?;
    let tokens = TokenService::new(auth_config);

    let rooms = Arc::new(RoomRouter::new(stores.membership.clone()));

    let accounts_state = AccountsState {
        users: stores.users.clone(),
        tokens: tokens.clone(),
        hasher,
        cookie: RefreshCookie::new(config.cookie_secure),
    };

    let conversations_state = ConversationsState {
        directory: ConversationDirectory::new(
            stores.conversations,
            stores.membership.clone(),
            stores.messages.clone(),
            stores.users,
        ),
        ledger: MessageLedger::new(stores.membership, stores.messages, rooms.clone()),
        tokens: tokens.clone(),
    };

    let rooms_state = RoomsState {
        router: rooms.clone(),
        tokens,
        handshake_timeout: config.handshake_timeout(),
        ping_interval: config.heartbeat_interval(),
    };

    let router = Router::new()
        .route("/health", get(health_check).with_state(rooms.clone()))
        .merge(duet_accounts::routes().with_state(accounts_state))
        .merge(duet_conversations::routes().with_state(conversations_state))
        .merge(duet_rooms::routes().with_state(rooms_state))
        .layer(body_limit_layer());

    Ok(Application { router, rooms })
}

/// CORS for the configured frontend origin, with credentials so the refresh
/// cookie is sent. Without an origin any origin is allowed, uncredentialed.
pub fn build_cors_layer(frontend_url: Option<&str>) -> anyhow::Result<CorsLayer> {
    use axum::http::{header, Method};

    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let layer = match frontend_url {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin.trim_end_matches('/'))
                .with_context(|| format!("Invalid FRONTEND_URL: {}", origin))?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(methods)
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .allow_credentials(true)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
    };
    Ok(layer)
}

pub fn body_limit_layer() -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(MAX_BODY_BYTES)
}

/// Health check endpoint with live channel counts
async fn health_check(State(rooms): State<Arc<RoomRouter>>) -> Json<Value> {
    let stats = rooms.stats().await;
    Json(json!({
        "status": "ok",
        "connections": stats.connections,
        "rooms": stats.rooms,
    }))
}
