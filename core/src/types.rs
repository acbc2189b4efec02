//! Domain DTOs for the rental management API.
//!
//! # Design
//! These types mirror the backend's schemas but are defined independently
//! of the mock server; the integration tests catch schema drift. Every
//! backend response is wrapped in an [`Envelope`]. Partial-update payloads
//! skip `None` fields so the server leaves those columns untouched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::{BearerToken, StoredToken};

/// `{code, message, data}` wrapper around every backend response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Money columns are `Decimal` on the backend, which may arrive as a JSON
/// number or a decimal string.
mod money {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    fn convert<E: serde::de::Error>(raw: Raw) -> Result<f64, E> {
        match raw {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s.trim().parse().map_err(E::custom),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        convert(Raw::deserialize(d)?)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
            Option::<Raw>::deserialize(d)?.map(convert).transpose()
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by login and register.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl AuthSession {
    pub fn stored_token(&self) -> Option<StoredToken> {
        BearerToken::new(&self.access_token)
            .map(|access| StoredToken::new(access, self.refresh_token.clone()))
    }
}

/// Returned by `/auth/refresh`. The refresh token is only present when the
/// backend rotates it.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantCreate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub role_id: Option<String>,
    pub status: Option<String>,
}

impl UserQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "page", self.page);
        push(&mut pairs, "pageSize", self.page_size);
        push(&mut pairs, "search", self.search.as_deref().filter(|s| !s.is_empty()));
        push(&mut pairs, "role_id", self.role_id.as_deref());
        push(&mut pairs, "status", self.status.as_deref());
        pairs
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPage {
    pub items: Vec<User>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}

/// A file attached to a tenant (ID card scan, signed contract, ...).
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub document_type: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_type: String,
    pub file_name: String,
    pub file_url: String,
    #[serde(default)]
    pub size: u64,
    pub created_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    #[default]
    Available,
    Occupied,
    Maintenance,
    Reserved,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "AVAILABLE",
            RoomStatus::Occupied => "OCCUPIED",
            RoomStatus::Maintenance => "MAINTENANCE",
            RoomStatus::Reserved => "RESERVED",
        }
    }
}

/// Row of the room list, with the building name and occupancy joined in.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RoomListItem {
    pub id: Uuid,
    pub room_number: String,
    pub building_name: String,
    pub area: Option<f64>,
    pub capacity: u32,
    #[serde(default)]
    pub current_occupants: u32,
    pub status: RoomStatus,
    #[serde(deserialize_with = "money::deserialize")]
    pub base_price: f64,
    pub representative: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RoomDetail {
    pub id: Uuid,
    pub building_id: Uuid,
    pub room_number: String,
    pub room_name: Option<String>,
    pub area: Option<f64>,
    pub capacity: u32,
    #[serde(deserialize_with = "money::deserialize")]
    pub base_price: f64,
    #[serde(default, deserialize_with = "money::option::deserialize")]
    pub electricity_price: Option<f64>,
    #[serde(default, deserialize_with = "money::option::deserialize")]
    pub water_price_per_person: Option<f64>,
    #[serde(default, deserialize_with = "money::option::deserialize")]
    pub deposit_amount: Option<f64>,
    pub status: RoomStatus,
    pub description: Option<String>,
    #[serde(default)]
    pub utilities: Vec<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCreate {
    pub building_id: Uuid,
    pub room_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    pub capacity: u32,
    pub base_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electricity_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_price_per_person: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<f64>,
    #[serde(default)]
    pub status: RoomStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub utilities: Vec<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

/// Partial room update. `utilities` and `photo_urls` replace the whole list
/// when present; `Some(vec![])` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electricity_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_price_per_person: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RoomStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct RoomQuery {
    pub building_id: Option<Uuid>,
    pub status: Option<RoomStatus>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl RoomQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "building_id", self.building_id);
        push(&mut pairs, "status", self.status.map(|s| s.as_str()));
        push(&mut pairs, "offset", self.offset);
        push(&mut pairs, "limit", self.limit);
        pairs
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomPage {
    pub items: Vec<RoomListItem>,
    pub total: u64,
    pub offset: u32,
    pub limit: u32,
}

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub id: Uuid,
    pub address_line: String,
    pub ward: String,
    pub city: String,
    pub country: String,
    pub full_address: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressCreate {
    pub address_line: String,
    pub ward: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AddressQuery {
    pub city: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl AddressQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "city", self.city.as_deref().filter(|c| !c.is_empty()));
        push(&mut pairs, "page", self.page);
        push(&mut pairs, "pageSize", self.page_size);
        pairs
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressPage {
    pub items: Vec<Address>,
    pub pagination: Pagination,
}

/// Page-number pagination used by the address and user lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_items: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

fn push<T: ToString>(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<T>) {
    if let Some(value) = value {
        pairs.push((key, value.to_string()));
    }
}
