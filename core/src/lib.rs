//! Synchronous API client core for the rental management service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The host executes the
//! actual HTTP round-trip, so everything here is deterministic and testable.
//!
//! # Design
//! - `RentalClient` is stateless: it holds only the versioned base URL.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - `BearerInterceptor` reads the token from `TokenStorage` each time a
//!   request is dispatched and sets the `Authorization` header.
//! - `StoredToken::parse` is the single place that understands the shapes a
//!   stored credential can take.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod storage;
pub mod token;
pub mod types;

pub use client::{effective_status, RentalClient, API_PREFIX};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use interceptor::BearerInterceptor;
pub use storage::{FileStorage, MemoryStorage, StorageError, TokenStorage, ACCESS_TOKEN_KEY};
pub use token::{BearerToken, StoredToken};
pub use types::*;
