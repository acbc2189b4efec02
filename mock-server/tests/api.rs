use axum::http::{self, Request, StatusCode};
use axum::routing::RouterIntoService;
use http_body_util::BodyExt;
use mock_server::{app, ADMIN_EMAIL, ADMIN_PASSWORD, SEED_BUILDING_ID};
use serde_json::Value;
use tower::{Service, ServiceExt};

type App = RouterIntoService<String>;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &mut App, request: Request<String>) -> axum::response::Response {
    ServiceExt::ready(app).await.unwrap().call(request).await.unwrap()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if body.is_some() {
        builder = builder.header(http::header::CONTENT_TYPE, "application/json");
    }
    builder.body(body.unwrap_or_default().to_string()).unwrap()
}

/// Log in as the seeded admin and return (access, refresh).
async fn login(app: &mut App) -> (String, String) {
    let body = format!(r#"{{"email":"{ADMIN_EMAIL}","password":"{ADMIN_PASSWORD}"}}"#);
    let resp = send(app, request("POST", "/api/v1/auth/login", None, Some(&body))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    (
        json["data"]["access_token"].as_str().unwrap().to_string(),
        json["data"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

// --- auth ---

#[tokio::test]
async fn health_is_public() {
    let resp = app()
        .oneshot(Request::builder().uri("/health").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "healthy");
}

#[tokio::test]
async fn login_with_wrong_password_is_401_envelope() {
    let body = format!(r#"{{"email":"{ADMIN_EMAIL}","password":"nope"}}"#);
    let resp = app()
        .oneshot(request("POST", "/api/v1/auth/login", None, Some(&body)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["code"], 401);
    assert_eq!(json["message"], "Invalid credentials");
}

#[tokio::test]
async fn protected_route_requires_bearer_token() {
    let resp = app()
        .oneshot(request("GET", "/api/v1/rooms", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app()
        .oneshot(request("GET", "/api/v1/rooms", Some("at-bogus"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["message"], "Token expired or invalid");
}

#[tokio::test]
async fn register_then_me() {
    let mut app = app().into_service::<String>();
    let body = r#"{"first_name":"Lan","last_name":"Tran","email":"lan@example.com",
        "password":"secret1","confirm_password":"secret1"}"#;
    let resp = send(&mut app, request("POST", "/api/v1/auth/register", None, Some(body))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    let token = json["data"]["access_token"].as_str().unwrap().to_string();

    let resp = send(&mut app, request("GET", "/api/v1/auth/me", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = body_json(resp).await;
    assert_eq!(me["data"]["email"], "lan@example.com");
    assert_eq!(me["data"]["role"], "CUSTOMER");

    // same email again
    let resp = send(&mut app, request("POST", "/api/v1/auth/register", None, Some(body))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rejects_mismatched_passwords() {
    let body = r#"{"first_name":"A","last_name":"B","email":"ab@example.com",
        "password":"secret1","confirm_password":"secret2"}"#;
    let resp = app()
        .oneshot(request("POST", "/api/v1/auth/register", None, Some(body)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "Passwords do not match");
}

#[tokio::test]
async fn refresh_after_expiry_restores_access() {
    let mut app = app().into_service::<String>();
    let (access, refresh) = login(&mut app).await;

    let resp = send(&mut app, request("POST", "/__admin/expire-tokens", None, None)).await;
    assert_eq!(body_json(resp).await["expired"], 1);

    let resp = send(&mut app, request("GET", "/api/v1/auth/me", Some(&access), None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body = format!(r#"{{"refresh_token":"{refresh}"}}"#);
    let resp = send(&mut app, request("POST", "/api/v1/auth/refresh", None, Some(&body))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fresh = body_json(resp).await["data"]["access_token"].as_str().unwrap().to_string();
    assert_ne!(fresh, access);

    let resp = send(&mut app, request("GET", "/api/v1/auth/me", Some(&fresh), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&mut app, request("GET", "/__admin/stats", None, None)).await;
    assert_eq!(body_json(resp).await["refresh_calls"], 1);
}

#[tokio::test]
async fn refresh_with_unknown_token_is_401() {
    let resp = app()
        .oneshot(request("POST", "/api/v1/auth/refresh", None, Some(r#"{"refresh_token":"rt-nope"}"#)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- rooms ---

#[tokio::test]
async fn create_room_malformed_json_returns_422() {
    let mut app = app().into_service::<String>();
    let (token, _) = login(&mut app).await;
    let resp = send(&mut app, request("POST", "/api/v1/rooms", Some(&token), Some(r#"{"room_number":"1"}"#))).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_room_bad_uuid_returns_400() {
    let mut app = app().into_service::<String>();
    let (token, _) = login(&mut app).await;
    let resp = send(&mut app, request("GET", "/api/v1/rooms/not-a-uuid", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_rooms_rejects_unknown_status() {
    let mut app = app().into_service::<String>();
    let (token, _) = login(&mut app).await;
    let resp = send(&mut app, request("GET", "/api/v1/rooms?status=FLOODED", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn room_crud_lifecycle() {
    let mut app = app().into_service::<String>();
    let (token, _) = login(&mut app).await;

    // create
    let body = format!(
        r#"{{"building_id":"{SEED_BUILDING_ID}","room_number":" 101 ","capacity":2,
            "base_price":5000000,"utilities":["Kitchen"," ","Bed"]}}"#
    );
    let resp = send(&mut app, request("POST", "/api/v1/rooms", Some(&token), Some(&body))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["code"], 201);
    assert_eq!(created["data"]["room_number"], "101");
    assert_eq!(created["data"]["status"], "AVAILABLE");
    assert_eq!(created["data"]["utilities"], serde_json::json!(["Kitchen", "Bed"]));
    let id = created["data"]["id"].as_str().unwrap().to_string();

    // duplicate room number in the same building
    let resp = send(&mut app, request("POST", "/api/v1/rooms", Some(&token), Some(&body))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // list
    let resp = send(&mut app, request("GET", "/api/v1/rooms?status=AVAILABLE", Some(&token), None)).await;
    let list = body_json(resp).await;
    assert_eq!(list["data"]["total"], 1);
    assert_eq!(list["data"]["limit"], 20);
    assert_eq!(list["data"]["items"][0]["building_name"], "Riverside Residence");

    // update: partial, clear utilities
    let resp = send(
        &mut app,
        request("PUT", &format!("/api/v1/rooms/{id}"), Some(&token), Some(r#"{"status":"OCCUPIED","utilities":[]}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["data"]["status"], "OCCUPIED");
    assert_eq!(updated["data"]["base_price"], 5000000.0);
    assert_eq!(updated["data"]["utilities"], serde_json::json!([]));

    // delete
    let resp = send(&mut app, request("DELETE", &format!("/api/v1/rooms/{id}"), Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // get after delete
    let resp = send(&mut app, request("GET", &format!("/api/v1/rooms/{id}"), Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["message"], "Room not found");
}

// --- addresses ---

#[tokio::test]
async fn address_list_is_paginated() {
    let mut app = app().into_service::<String>();
    let (token, _) = login(&mut app).await;
    for (line, city) in [("1 Le Loi", "Hue"), ("2 Tran Phu", "Da Nang"), ("3 Bach Dang", "Da Nang")] {
        let body = format!(r#"{{"address_line":"{line}","ward":"Ward 1","city":"{city}"}}"#);
        let resp = send(&mut app, request("POST", "/api/v1/addresses", Some(&token), Some(&body))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = send(&mut app, request("GET", "/api/v1/addresses?city=da%20nang&pageSize=1&page=2", Some(&token), None)).await;
    let json = body_json(resp).await;
    assert_eq!(json["data"]["pagination"]["totalItems"], 2);
    assert_eq!(json["data"]["pagination"]["totalPages"], 2);
    assert_eq!(json["data"]["items"][0]["address_line"], "3 Bach Dang");
    assert_eq!(json["data"]["items"][0]["country"], "Vietnam");
}

// --- users ---

#[tokio::test]
async fn huge_page_number_returns_an_empty_page() {
    let mut app = app().into_service::<String>();
    let (token, _) = login(&mut app).await;
    let uri = format!("/api/v1/users?page={}", usize::MAX);
    let resp = send(&mut app, request("GET", &uri, Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["items"], serde_json::json!([]));
    assert_eq!(json["data"]["pagination"]["totalItems"], 1);
}

#[tokio::test]
async fn tenant_document_upload() {
    let mut app = app().into_service::<String>();
    let (token, _) = login(&mut app).await;

    let body = r#"{"first_name":"Minh","last_name":"Le","email":"minh@example.com"}"#;
    let resp = send(&mut app, request("POST", "/api/v1/auth/create-tenant", Some(&token), Some(body))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let tenant_id = body_json(resp).await["data"]["id"].as_str().unwrap().to_string();

    let boundary = "XBOUNDARY";
    let multipart = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"document_type\"\r\n\r\nID_CARD\r\n\
         --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"id.txt\"\r\n\
         Content-Type: text/plain\r\n\r\nhello\r\n--{boundary}--\r\n"
    );
    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/users/{tenant_id}/documents"))
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .header(http::header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(multipart)
        .unwrap();
    let resp = send(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let doc = body_json(resp).await;
    assert_eq!(doc["data"]["document_type"], "ID_CARD");
    assert_eq!(doc["data"]["file_name"], "id.txt");
    assert_eq!(doc["data"]["size"], 5);

    let resp = send(&mut app, request("GET", "/api/v1/users/stats?role_id=TENANT", Some(&token), None)).await;
    let stats = body_json(resp).await;
    assert_eq!(stats["data"]["total"], 1);
    assert_eq!(stats["data"]["active"], 1);
}
