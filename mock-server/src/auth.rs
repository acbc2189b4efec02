use std::sync::atomic::Ordering;

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::reply::{created, fail, ok, Reply};
use crate::users::User;
use crate::{Db, Store, UserRecord};

/// Id of the user owning the request's bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

impl FromRequestParts<Db> for AuthUser {
    type Rejection = Reply;

    async fn from_request_parts(parts: &mut Parts, db: &Db) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authenticated"))?;
        db.access_tokens
            .read()
            .await
            .get(token)
            .copied()
            .map(AuthUser)
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Token expired or invalid"))
    }
}

#[derive(Deserialize)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[allow(dead_code)]
    pub role_id: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshInput {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct TenantInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
struct Session {
    user: User,
    access_token: String,
    refresh_token: String,
}

async fn issue_tokens(db: &Store, user_id: Uuid) -> (String, String) {
    let access = format!("at-{}", Uuid::new_v4().simple());
    let refresh = format!("rt-{}", Uuid::new_v4().simple());
    db.access_tokens.write().await.insert(access.clone(), user_id);
    db.refresh_tokens.write().await.insert(refresh.clone(), user_id);
    (access, refresh)
}

async fn email_taken(db: &Store, email: &str) -> bool {
    db.users
        .read()
        .await
        .values()
        .any(|record| record.user.email.eq_ignore_ascii_case(email))
}

pub async fn register(State(db): State<Db>, Json(input): Json<RegisterInput>) -> Reply {
    if input.email.trim().is_empty() || !input.email.contains('@') {
        return fail(StatusCode::BAD_REQUEST, "A valid email is required");
    }
    if input.password.len() < 6 {
        return fail(StatusCode::BAD_REQUEST, "Password must be at least 6 characters");
    }
    if input.password != input.confirm_password {
        return fail(StatusCode::BAD_REQUEST, "Passwords do not match");
    }
    if email_taken(&db, &input.email).await {
        return fail(StatusCode::BAD_REQUEST, "Email already exists");
    }

    let user = User {
        id: Uuid::new_v4(),
        email: input.email.trim().to_string(),
        first_name: Some(input.first_name),
        last_name: Some(input.last_name),
        phone: None,
        role: "CUSTOMER".to_string(),
        status: "ACTIVE".to_string(),
    };
    db.users.write().await.insert(
        user.id,
        UserRecord {
            user: user.clone(),
            password: input.password,
        },
    );
    let (access_token, refresh_token) = issue_tokens(&db, user.id).await;
    created(
        "created",
        Session {
            user,
            access_token,
            refresh_token,
        },
    )
}

pub async fn login(State(db): State<Db>, Json(input): Json<LoginInput>) -> Reply {
    if input.email.is_empty() || input.password.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "email and password required");
    }
    let user = {
        let users = db.users.read().await;
        users
            .values()
            .find(|record| record.user.email.eq_ignore_ascii_case(&input.email) && record.password == input.password)
            .map(|record| record.user.clone())
    };
    let Some(user) = user else {
        debug!(email = %input.email, "login rejected");
        return fail(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };
    let (access_token, refresh_token) = issue_tokens(&db, user.id).await;
    ok(
        "ok",
        Session {
            user,
            access_token,
            refresh_token,
        },
    )
}

pub async fn refresh(State(db): State<Db>, Json(input): Json<RefreshInput>) -> Reply {
    db.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if input.refresh_token.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "refresh_token is required");
    }
    let Some(user_id) = db.refresh_tokens.read().await.get(&input.refresh_token).copied() else {
        debug!("unknown refresh token");
        return fail(StatusCode::UNAUTHORIZED, "Invalid refresh token");
    };
    debug!(%user_id, "access token refreshed");
    let access_token = format!("at-{}", Uuid::new_v4().simple());
    db.access_tokens.write().await.insert(access_token.clone(), user_id);
    ok("ok", serde_json::json!({ "access_token": access_token }))
}

pub async fn me(State(db): State<Db>, AuthUser(user_id): AuthUser) -> Reply {
    match db.users.read().await.get(&user_id) {
        Some(record) => ok("ok", &record.user),
        None => fail(StatusCode::NOT_FOUND, "User not found"),
    }
}

pub async fn create_tenant(
    State(db): State<Db>,
    _caller: AuthUser,
    Json(input): Json<TenantInput>,
) -> Reply {
    if input.email.trim().is_empty() || !input.email.contains('@') {
        return fail(StatusCode::BAD_REQUEST, "A valid email is required");
    }
    if email_taken(&db, &input.email).await {
        return fail(StatusCode::CONFLICT, "Email already exists");
    }
    let user = User {
        id: Uuid::new_v4(),
        email: input.email.trim().to_string(),
        first_name: Some(input.first_name),
        last_name: Some(input.last_name),
        phone: input.phone,
        role: "TENANT".to_string(),
        status: "ACTIVE".to_string(),
    };
    db.users.write().await.insert(
        user.id,
        UserRecord {
            user: user.clone(),
            password: input.password.unwrap_or_else(|| "tenant123".to_string()),
        },
    );
    created("Tenant created", user)
}
