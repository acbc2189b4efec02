use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::reply::{created, fail, ok, Reply};
use crate::Db;

const STATUSES: [&str; 4] = ["AVAILABLE", "OCCUPIED", "MAINTENANCE", "RESERVED"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub building_id: Uuid,
    pub room_number: String,
    pub room_name: Option<String>,
    pub area: Option<f64>,
    pub capacity: u32,
    pub base_price: f64,
    pub electricity_price: Option<f64>,
    pub water_price_per_person: Option<f64>,
    pub deposit_amount: Option<f64>,
    pub status: String,
    pub description: Option<String>,
    pub utilities: Vec<String>,
    pub photo_urls: Vec<String>,
}

#[derive(Serialize)]
struct RoomListItem {
    id: Uuid,
    room_number: String,
    building_name: String,
    area: Option<f64>,
    capacity: u32,
    current_occupants: u32,
    status: String,
    base_price: f64,
    representative: Option<String>,
}

fn default_capacity() -> u32 {
    1
}

fn default_status() -> String {
    "AVAILABLE".to_string()
}

#[derive(Deserialize)]
pub struct RoomInput {
    pub building_id: Uuid,
    pub room_number: String,
    pub room_name: Option<String>,
    pub area: Option<f64>,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    pub base_price: f64,
    pub electricity_price: Option<f64>,
    pub water_price_per_person: Option<f64>,
    pub deposit_amount: Option<f64>,
    #[serde(default = "default_status")]
    pub status: String,
    pub description: Option<String>,
    #[serde(default)]
    pub utilities: Vec<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

#[derive(Deserialize)]
pub struct RoomPatch {
    pub building_id: Option<Uuid>,
    pub room_number: Option<String>,
    pub room_name: Option<String>,
    pub area: Option<f64>,
    pub capacity: Option<u32>,
    pub base_price: Option<f64>,
    pub electricity_price: Option<f64>,
    pub water_price_per_person: Option<f64>,
    pub deposit_amount: Option<f64>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub utilities: Option<Vec<String>>,
    pub photo_urls: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct RoomParams {
    pub building_id: Option<Uuid>,
    pub status: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// Trim entries and drop the blank ones.
fn clean(list: Vec<String>) -> Vec<String> {
    list.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn check_status(status: &str) -> Result<(), Reply> {
    if STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(fail(
            StatusCode::BAD_REQUEST,
            format!("Invalid status, expected one of {}", STATUSES.join(", ")),
        ))
    }
}

fn check_prices(prices: &[Option<f64>]) -> Result<(), Reply> {
    if prices.iter().flatten().any(|p| *p < 0.0) {
        return Err(fail(StatusCode::BAD_REQUEST, "Prices must not be negative"));
    }
    Ok(())
}

pub async fn list_rooms(
    State(db): State<Db>,
    _caller: AuthUser,
    Query(params): Query<RoomParams>,
) -> Result<Reply, Reply> {
    if let Some(status) = params.status.as_deref() {
        check_status(status)?;
    }
    let limit = match params.limit.unwrap_or(20) {
        0 => 20,
        n => n.min(100),
    };
    let offset = params.offset.unwrap_or(0);

    let rooms = db.rooms.read().await;
    let mut matching: Vec<&Room> = rooms
        .values()
        .filter(|r| params.building_id.map_or(true, |b| r.building_id == b))
        .filter(|r| params.status.as_deref().map_or(true, |s| r.status == s))
        .collect();
    matching.sort_by(|a, b| (a.building_id, &a.room_number).cmp(&(b.building_id, &b.room_number)));

    let total = matching.len();
    let items: Vec<RoomListItem> = matching
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|room| RoomListItem {
            id: room.id,
            room_number: room.room_number.clone(),
            building_name: db.buildings.get(&room.building_id).cloned().unwrap_or_default(),
            area: room.area,
            capacity: room.capacity,
            current_occupants: 0,
            status: room.status.clone(),
            base_price: room.base_price,
            representative: None,
        })
        .collect();
    Ok(ok(
        "Rooms listed",
        json!({"items": items, "total": total, "offset": offset, "limit": limit}),
    ))
}

pub async fn create_room(
    State(db): State<Db>,
    _caller: AuthUser,
    Json(input): Json<RoomInput>,
) -> Result<Reply, Reply> {
    if input.room_number.trim().is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "room_number is required"));
    }
    check_status(&input.status)?;
    check_prices(&[
        Some(input.base_price),
        input.electricity_price,
        input.water_price_per_person,
        input.deposit_amount,
    ])?;
    if !db.buildings.contains_key(&input.building_id) {
        return Err(fail(StatusCode::BAD_REQUEST, "Building not found"));
    }

    let mut rooms = db.rooms.write().await;
    let room_number = input.room_number.trim().to_string();
    if rooms
        .values()
        .any(|r| r.building_id == input.building_id && r.room_number == room_number)
    {
        return Err(fail(StatusCode::CONFLICT, "Room number already exists in this building"));
    }
    let room = Room {
        id: Uuid::new_v4(),
        building_id: input.building_id,
        room_number,
        room_name: input.room_name,
        area: input.area,
        capacity: input.capacity.max(1),
        base_price: input.base_price,
        electricity_price: input.electricity_price,
        water_price_per_person: input.water_price_per_person,
        deposit_amount: input.deposit_amount,
        status: input.status,
        description: input.description,
        utilities: clean(input.utilities),
        photo_urls: clean(input.photo_urls),
    };
    rooms.insert(room.id, room.clone());
    Ok(created("Room created", room))
}

pub async fn get_room(State(db): State<Db>, _caller: AuthUser, Path(id): Path<Uuid>) -> Reply {
    match db.rooms.read().await.get(&id) {
        Some(room) => ok("ok", room),
        None => fail(StatusCode::NOT_FOUND, "Room not found"),
    }
}

pub async fn update_room(
    State(db): State<Db>,
    _caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<RoomPatch>,
) -> Result<Reply, Reply> {
    if let Some(status) = patch.status.as_deref() {
        check_status(status)?;
    }
    check_prices(&[
        patch.base_price,
        patch.electricity_price,
        patch.water_price_per_person,
        patch.deposit_amount,
    ])?;
    if let Some(building_id) = patch.building_id {
        if !db.buildings.contains_key(&building_id) {
            return Err(fail(StatusCode::BAD_REQUEST, "Building not found"));
        }
    }

    let mut rooms = db.rooms.write().await;
    let Some(current) = rooms.get(&id).cloned() else {
        return Err(fail(StatusCode::NOT_FOUND, "Room not found"));
    };
    let building_id = patch.building_id.unwrap_or(current.building_id);
    let room_number = patch
        .room_number
        .map(|n| n.trim().to_string())
        .unwrap_or(current.room_number.clone());
    if rooms
        .values()
        .any(|r| r.id != id && r.building_id == building_id && r.room_number == room_number)
    {
        return Err(fail(StatusCode::BAD_REQUEST, "Room number already exists in this building"));
    }

    let updated = Room {
        id,
        building_id,
        room_number,
        room_name: patch.room_name.or(current.room_name),
        area: patch.area.or(current.area),
        capacity: patch.capacity.map(|c| c.max(1)).unwrap_or(current.capacity),
        base_price: patch.base_price.unwrap_or(current.base_price),
        electricity_price: patch.electricity_price.or(current.electricity_price),
        water_price_per_person: patch.water_price_per_person.or(current.water_price_per_person),
        deposit_amount: patch.deposit_amount.or(current.deposit_amount),
        status: patch.status.unwrap_or(current.status),
        description: patch.description.or(current.description),
        utilities: patch.utilities.map(clean).unwrap_or(current.utilities),
        photo_urls: patch.photo_urls.map(clean).unwrap_or(current.photo_urls),
    };
    rooms.insert(id, updated.clone());
    Ok(ok("Room updated", updated))
}

pub async fn delete_room(State(db): State<Db>, _caller: AuthUser, Path(id): Path<Uuid>) -> Reply {
    match db.rooms.write().await.remove(&id) {
        Some(_) => ok("Room deleted", json!({})),
        None => fail(StatusCode::NOT_FOUND, "Room not found"),
    }
}
