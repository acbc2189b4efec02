use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::reply::{created, fail, ok, Pagination, Reply};
use crate::Db;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub id: Uuid,
    pub address_line: String,
    pub ward: String,
    pub city: String,
    pub country: String,
    pub full_address: Option<String>,
}

#[derive(Deserialize)]
pub struct AddressInput {
    pub address_line: String,
    pub ward: String,
    pub city: String,
    pub country: Option<String>,
    pub full_address: Option<String>,
}

#[derive(Deserialize)]
pub struct AddressPatch {
    pub address_line: Option<String>,
    pub ward: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub full_address: Option<String>,
}

#[derive(Deserialize)]
pub struct AddressParams {
    pub city: Option<String>,
    pub page: Option<usize>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<usize>,
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub async fn list_addresses(
    State(db): State<Db>,
    _caller: AuthUser,
    Query(params): Query<AddressParams>,
) -> Reply {
    let city = params.city.as_deref().map(str::to_lowercase).filter(|c| !c.is_empty());
    let addresses = db.addresses.read().await;
    let mut matching: Vec<&Address> = addresses
        .values()
        .filter(|a| city.as_deref().map_or(true, |c| a.city.to_lowercase().contains(c)))
        .collect();
    matching.sort_by(|a, b| (&a.city, &a.address_line).cmp(&(&b.city, &b.address_line)));

    let (pagination, offset) = Pagination::clamp(matching.len(), params.page, params.page_size);
    let items: Vec<&Address> = matching.into_iter().skip(offset).take(pagination.page_size).collect();
    ok("ok", json!({"items": items, "pagination": pagination}))
}

pub async fn create_address(
    State(db): State<Db>,
    _caller: AuthUser,
    Json(input): Json<AddressInput>,
) -> Reply {
    if blank(&input.address_line) || blank(&input.ward) || blank(&input.city) {
        return fail(StatusCode::BAD_REQUEST, "address_line, ward and city are required");
    }
    let address = Address {
        id: Uuid::new_v4(),
        address_line: input.address_line,
        ward: input.ward,
        city: input.city,
        country: input.country.unwrap_or_else(|| "Vietnam".to_string()),
        full_address: input.full_address,
    };
    db.addresses.write().await.insert(address.id, address.clone());
    created("Address created", address)
}

pub async fn get_address(State(db): State<Db>, _caller: AuthUser, Path(id): Path<Uuid>) -> Reply {
    match db.addresses.read().await.get(&id) {
        Some(address) => ok("ok", address),
        None => fail(StatusCode::NOT_FOUND, "Address not found"),
    }
}

pub async fn update_address(
    State(db): State<Db>,
    _caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<AddressPatch>,
) -> Reply {
    let provided = [&patch.address_line, &patch.ward, &patch.city];
    if provided.iter().any(|field| field.as_deref().is_some_and(blank)) {
        return fail(StatusCode::BAD_REQUEST, "Fields must not be blank");
    }

    let mut addresses = db.addresses.write().await;
    let Some(address) = addresses.get_mut(&id) else {
        return fail(StatusCode::NOT_FOUND, "Address not found");
    };
    if let Some(address_line) = patch.address_line {
        address.address_line = address_line;
    }
    if let Some(ward) = patch.ward {
        address.ward = ward;
    }
    if let Some(city) = patch.city {
        address.city = city;
    }
    if let Some(country) = patch.country {
        address.country = country;
    }
    if let Some(full_address) = patch.full_address {
        address.full_address = Some(full_address);
    }
    ok("Address updated", &*address)
}

pub async fn delete_address(State(db): State<Db>, _caller: AuthUser, Path(id): Path<Uuid>) -> Reply {
    match db.addresses.write().await.remove(&id) {
        Some(_) => ok("Address deleted", json!({})),
        None => fail(StatusCode::NOT_FOUND, "Address not found"),
    }
}
