//! Async host for the rental API.
//!
//! Executes the plain-data requests built by `rental_core` over `reqwest`,
//! with the session kept in token storage. A bearer interceptor runs on
//! every request, and a per-client [`RefreshCoordinator`] makes sure that
//! concurrent 401s share a single `/auth/refresh` call.
//!
//! ```no_run
//! # async fn demo() -> rental_client::Result<()> {
//! use rental_client::{ApiClient, RoomQuery};
//!
//! let api = ApiClient::from_env()?;
//! api.login("admin@rental.local", "admin123").await?;
//! let rooms = api.list_rooms(&RoomQuery::default()).await?;
//! println!("{} rooms", rooms.total);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod refresh;
pub mod transport;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use refresh::{RefreshCoordinator, RefreshLeader, RefreshOutcome, RefreshTicket, RefreshWaiter};
pub use transport::{ReqwestTransport, Transport};

pub use rental_core::{
    Address, AddressCreate, AddressPage, AddressQuery, AddressUpdate, ApiError, AuthSession, Document,
    DocumentUpload, FileStorage, MemoryStorage, RegisterRequest, RoomCreate, RoomDetail, RoomPage, RoomQuery,
    RoomStatus, RoomUpdate, StoredToken, TenantCreate, TokenStorage, User, UserPage, UserQuery, UserStats,
    UserUpdate,
};
