//! In-memory stand-in for the rental management backend.
//!
//! Serves the `/api/v1` routes the client consumes, wraps every answer in
//! the `{code, message, data}` envelope and requires a bearer token on all
//! non-auth routes. Two `/__admin` routes let tests expire access tokens and
//! count refresh calls.

mod addresses;
mod auth;
mod reply;
mod rooms;
mod users;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub use addresses::Address;
pub use auth::AuthUser;
pub use reply::{Envelope, Reply};
pub use rooms::Room;
pub use users::{Document, User};

pub const ADMIN_EMAIL: &str = "admin@rental.local";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const SEED_BUILDING_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0001);
pub const SEED_BUILDING_NAME: &str = "Riverside Residence";

pub(crate) struct UserRecord {
    pub user: User,
    pub password: String,
}

pub struct Store {
    pub(crate) users: RwLock<HashMap<Uuid, UserRecord>>,
    pub(crate) access_tokens: RwLock<HashMap<String, Uuid>>,
    pub(crate) refresh_tokens: RwLock<HashMap<String, Uuid>>,
    pub(crate) buildings: HashMap<Uuid, String>,
    pub(crate) rooms: RwLock<HashMap<Uuid, Room>>,
    pub(crate) addresses: RwLock<HashMap<Uuid, Address>>,
    pub(crate) documents: RwLock<Vec<Document>>,
    pub(crate) refresh_calls: AtomicU64,
}

impl Store {
    /// One admin account and one building to hang rooms on.
    pub fn seeded() -> Self {
        let admin = User {
            id: Uuid::new_v4(),
            email: ADMIN_EMAIL.to_string(),
            first_name: Some("Site".to_string()),
            last_name: Some("Admin".to_string()),
            phone: None,
            role: "ADMIN".to_string(),
            status: "ACTIVE".to_string(),
        };
        let users = HashMap::from([(
            admin.id,
            UserRecord {
                user: admin,
                password: ADMIN_PASSWORD.to_string(),
            },
        )]);
        Self {
            users: RwLock::new(users),
            access_tokens: RwLock::default(),
            refresh_tokens: RwLock::default(),
            buildings: HashMap::from([(SEED_BUILDING_ID, SEED_BUILDING_NAME.to_string())]),
            rooms: RwLock::default(),
            addresses: RwLock::default(),
            documents: RwLock::default(),
            refresh_calls: AtomicU64::new(0),
        }
    }
}

pub type Db = Arc<Store>;

pub fn app() -> Router {
    let db: Db = Arc::new(Store::seeded());
    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/auth/create-tenant", post(auth::create_tenant))
        .route("/users", get(users::list_users))
        .route("/users/stats", get(users::user_stats))
        .route("/users/{id}", put(users::update_user).delete(users::delete_user))
        .route("/users/{id}/documents", post(users::upload_document))
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route(
            "/rooms/{id}",
            get(rooms::get_room).put(rooms::update_room).delete(rooms::delete_room),
        )
        .route("/addresses", get(addresses::list_addresses).post(addresses::create_address))
        .route(
            "/addresses/{id}",
            get(addresses::get_address)
                .put(addresses::update_address)
                .delete(addresses::delete_address),
        );

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health))
        .route("/__admin/expire-tokens", post(expire_tokens))
        .route("/__admin/stats", get(admin_stats))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "healthy"}))
}

/// Drop every access token; refresh tokens stay valid.
async fn expire_tokens(State(db): State<Db>) -> Json<serde_json::Value> {
    let mut tokens = db.access_tokens.write().await;
    let expired = tokens.len();
    tokens.clear();
    tracing::debug!(expired, "expired access tokens");
    Json(json!({"expired": expired}))
}

async fn admin_stats(State(db): State<Db>) -> Json<serde_json::Value> {
    Json(json!({"refresh_calls": db.refresh_calls.load(Ordering::SeqCst)}))
}
