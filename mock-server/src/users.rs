use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::reply::{created, fail, ok, Pagination, Reply};
use crate::Db;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub status: String,
}

impl User {
    fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [Some(&self.email), self.first_name.as_ref(), self.last_name.as_ref(), self.phone.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_type: String,
    pub file_name: String,
    pub file_url: String,
    pub size: u64,
}

#[derive(Deserialize)]
pub struct UserParams {
    pub page: Option<usize>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<usize>,
    pub search: Option<String>,
    pub role_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct StatsParams {
    pub role_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
}

pub async fn list_users(
    State(db): State<Db>,
    _caller: AuthUser,
    Query(params): Query<UserParams>,
) -> Reply {
    let users = db.users.read().await;
    let mut matching: Vec<User> = users
        .values()
        .map(|record| &record.user)
        .filter(|u| params.role_id.as_deref().map_or(true, |r| u.role.eq_ignore_ascii_case(r)))
        .filter(|u| params.status.as_deref().map_or(true, |s| u.status.eq_ignore_ascii_case(s)))
        .filter(|u| params.search.as_deref().map_or(true, |s| u.matches(s)))
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.email.cmp(&b.email));

    let (pagination, offset) = Pagination::clamp(matching.len(), params.page, params.page_size);
    let items: Vec<User> = matching.into_iter().skip(offset).take(pagination.page_size).collect();
    ok("ok", json!({"items": items, "pagination": pagination}))
}

pub async fn user_stats(
    State(db): State<Db>,
    _caller: AuthUser,
    Query(params): Query<StatsParams>,
) -> Reply {
    let users = db.users.read().await;
    let scoped: Vec<&User> = users
        .values()
        .map(|record| &record.user)
        .filter(|u| params.role_id.as_deref().map_or(true, |r| u.role.eq_ignore_ascii_case(r)))
        .collect();
    let active = scoped.iter().filter(|u| u.status == "ACTIVE").count();
    ok(
        "ok",
        json!({"total": scoped.len(), "active": active, "inactive": scoped.len() - active}),
    )
}

pub async fn update_user(
    State(db): State<Db>,
    _caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UserPatch>,
) -> Reply {
    let mut users = db.users.write().await;
    let Some(record) = users.get_mut(&id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    let user = &mut record.user;
    if let Some(first_name) = patch.first_name {
        user.first_name = Some(first_name);
    }
    if let Some(last_name) = patch.last_name {
        user.last_name = Some(last_name);
    }
    if let Some(phone) = patch.phone {
        user.phone = Some(phone);
    }
    if let Some(status) = patch.status {
        user.status = status;
    }
    ok("User updated", &*user)
}

pub async fn delete_user(State(db): State<Db>, _caller: AuthUser, Path(id): Path<Uuid>) -> Reply {
    if db.users.write().await.remove(&id).is_none() {
        return fail(StatusCode::NOT_FOUND, "User not found");
    }
    db.access_tokens.write().await.retain(|_, owner| *owner != id);
    db.refresh_tokens.write().await.retain(|_, owner| *owner != id);
    ok("User deleted", json!({}))
}

pub async fn upload_document(
    State(db): State<Db>,
    _caller: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Reply {
    if !db.users.read().await.contains_key(&id) {
        return fail(StatusCode::NOT_FOUND, "User not found");
    }

    let mut document_type = None;
    let mut file = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return fail(StatusCode::BAD_REQUEST, e.to_string()),
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("document_type") => match field.text().await {
                Ok(text) => document_type = Some(text),
                Err(e) => return fail(StatusCode::BAD_REQUEST, e.to_string()),
            },
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => file = Some((file_name, bytes.len() as u64)),
                    Err(e) => return fail(StatusCode::BAD_REQUEST, e.to_string()),
                }
            }
            _ => {}
        }
    }

    let (Some(document_type), Some((file_name, size))) = (document_type, file) else {
        return fail(StatusCode::BAD_REQUEST, "document_type and file are required");
    };
    let doc_id = Uuid::new_v4();
    let document = Document {
        id: doc_id,
        user_id: id,
        document_type,
        file_url: format!("/files/{doc_id}/{file_name}"),
        file_name,
        size,
    };
    db.documents.write().await.push(document.clone());
    created("Document uploaded", document)
}
