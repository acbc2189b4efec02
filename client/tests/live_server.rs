//! End-to-end tests against the mock server over real HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use mock_server::{ADMIN_EMAIL, ADMIN_PASSWORD, SEED_BUILDING_ID, SEED_BUILDING_NAME};
use rental_client::*;
use tokio::net::TcpListener;

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    addr
}

fn api(addr: SocketAddr) -> ApiClient {
    ApiClient::from_config(&ClientConfig::new(format!("http://{addr}"))).unwrap()
}

async fn admin(addr: SocketAddr, path: &str, post: bool) -> serde_json::Value {
    let http = reqwest::Client::new();
    let url = format!("http://{addr}{path}");
    let request = if post { http.post(url) } else { http.get(url) };
    let body = request.send().await.unwrap().text().await.unwrap();
    serde_json::from_str(&body).unwrap()
}

fn room(number: &str) -> RoomCreate {
    RoomCreate {
        building_id: SEED_BUILDING_ID,
        room_number: number.to_string(),
        room_name: None,
        area: Some(25.5),
        capacity: 2,
        base_price: 3_500_000.0,
        electricity_price: Some(3_500.0),
        water_price_per_person: None,
        deposit_amount: None,
        status: RoomStatus::Available,
        description: Some("Corner room".to_string()),
        utilities: vec!["Air conditioner".to_string()],
        photo_urls: vec![],
    }
}

#[tokio::test]
async fn requests_without_login_are_unauthorized() {
    let addr = start_server().await;
    let err = api(addr).list_rooms(&RoomQuery::default()).await.unwrap_err();
    assert!(err.is_unauthorized(), "{err}");
}

#[tokio::test]
async fn wrong_password_is_unauthorized_and_stores_nothing() {
    let addr = start_server().await;
    let api = api(addr);
    let err = api.login(ADMIN_EMAIL, "wrong").await.unwrap_err();
    assert!(matches!(err, ClientError::Api(ApiError::Unauthorized(ref m)) if m == "Invalid credentials"));
    assert!(api.session().is_none());
}

#[tokio::test]
async fn register_persists_the_new_session() {
    let addr = start_server().await;
    let api = api(addr);

    let session = api
        .register(&RegisterRequest {
            first_name: "Thu".to_string(),
            last_name: "Nguyen".to_string(),
            email: "thu@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            role_id: None,
        })
        .await
        .unwrap();
    let stored = api.session().unwrap();
    assert_eq!(stored.access.as_str(), session.access_token);
    assert_eq!(stored.refresh, session.refresh_token);

    let me = api.current_user().await.unwrap();
    assert_eq!(me.id, session.user.id);
    assert_eq!(me.email, "thu@example.com");
    assert_eq!(me.role.as_deref(), Some("CUSTOMER"));

    // A second registration with the same email fails and keeps the session.
    let err = api
        .register(&RegisterRequest {
            first_name: "Thu".to_string(),
            last_name: "Nguyen".to_string(),
            email: "thu@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            role_id: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(api.session().unwrap(), stored);
}

#[tokio::test]
async fn room_lifecycle_with_stored_session() {
    let addr = start_server().await;
    let api = api(addr);

    let session = api.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
    assert_eq!(session.user.role.as_deref(), Some("ADMIN"));
    assert_eq!(api.session().unwrap().access.as_str(), session.access_token);

    let created = api.create_room(&room("A101")).await.unwrap();
    assert_eq!(created.room_number, "A101");
    assert_eq!(created.status, RoomStatus::Available);
    assert_eq!(created.base_price, 3_500_000.0);

    let err = api.create_room(&room("A101")).await.unwrap_err();
    assert_eq!(err.status(), Some(409));

    let page = api.list_rooms(&RoomQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].building_name, SEED_BUILDING_NAME);

    let updated = api
        .update_room(
            created.id,
            &RoomUpdate {
                status: Some(RoomStatus::Maintenance),
                ..RoomUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, RoomStatus::Maintenance);
    assert_eq!(updated.capacity, 2);

    let maintenance = api
        .list_rooms(&RoomQuery {
            status: Some(RoomStatus::Maintenance),
            ..RoomQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(maintenance.items.len(), 1);

    api.delete_room(created.id).await.unwrap();
    let err = api.get_room(created.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Api(ApiError::NotFound(_))), "{err}");

    api.logout().unwrap();
    let err = api.list_rooms(&RoomQuery::default()).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn addresses_and_pagination() {
    let addr = start_server().await;
    let api = api(addr);
    api.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    for (line, city) in [("12 Nguyen Hue", "Ho Chi Minh"), ("4 Hang Bai", "Ha Noi"), ("9 Le Duan", "Ho Chi Minh")] {
        api.create_address(&AddressCreate {
            address_line: line.to_string(),
            ward: "Ward 1".to_string(),
            city: city.to_string(),
            country: None,
            full_address: None,
        })
        .await
        .unwrap();
    }

    let page = api
        .list_addresses(&AddressQuery {
            city: Some("ho chi".to_string()),
            page: Some(1),
            page_size: Some(1),
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 2);
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].country, "Vietnam");

    let id = page.items[0].id;
    let renamed = api
        .update_address(
            id,
            &AddressUpdate {
                ward: Some("Ward 3".to_string()),
                ..AddressUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.ward, "Ward 3");
    assert_eq!(api.get_address(id).await.unwrap(), renamed);

    api.delete_address(id).await.unwrap();
    assert_eq!(api.get_address(id).await.unwrap_err().status(), Some(404));
}

#[tokio::test]
async fn tenants_documents_and_stats() {
    let addr = start_server().await;
    let api = api(addr);
    api.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let tenant = api
        .create_tenant(&TenantCreate {
            first_name: "Hoa".to_string(),
            last_name: "Pham".to_string(),
            email: "hoa@example.com".to_string(),
            phone: Some("0901234567".to_string()),
            password: None,
        })
        .await
        .unwrap();
    assert_eq!(tenant.role.as_deref(), Some("TENANT"));

    let document = api
        .upload_document(
            tenant.id,
            &DocumentUpload {
                document_type: "ID_CARD".to_string(),
                file_name: "front.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            },
        )
        .await
        .unwrap();
    assert_eq!(document.user_id, tenant.id);
    assert_eq!(document.size, 4);

    let updated = api
        .update_user(
            tenant.id,
            &UserUpdate {
                status: Some("INACTIVE".to_string()),
                ..UserUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status.as_deref(), Some("INACTIVE"));

    let stats = api.user_stats("TENANT").await.unwrap();
    assert_eq!(stats, UserStats { total: 1, active: 0, inactive: 1 });

    let tenants = api
        .list_users(&UserQuery {
            role_id: Some("TENANT".to_string()),
            ..UserQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(tenants.items.len(), 1);

    api.delete_user(tenant.id).await.unwrap();
    assert_eq!(api.user_stats("TENANT").await.unwrap().total, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn expired_tokens_are_refreshed_once_for_concurrent_requests() {
    let addr = start_server().await;
    let api = Arc::new(api(addr));
    api.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
    let before = api.session().unwrap();

    assert_eq!(admin(addr, "/__admin/expire-tokens", true).await["expired"], 1);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let api = Arc::clone(&api);
            tokio::spawn(async move { api.list_rooms(&RoomQuery::default()).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(admin(addr, "/__admin/stats", false).await["refresh_calls"], 1);
    let after = api.session().unwrap();
    assert_ne!(after.access, before.access);
    assert_eq!(after.refresh, before.refresh);
}

#[tokio::test]
async fn session_survives_in_a_token_file() {
    let addr = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        token_file: Some(dir.path().join("session.json")),
        ..ClientConfig::new(format!("http://{addr}"))
    };

    ApiClient::from_config(&config)
        .unwrap()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    // A second client on the same file picks the session up.
    let second = ApiClient::from_config(&config).unwrap();
    let me = second.current_user().await.unwrap();
    assert_eq!(me.email, ADMIN_EMAIL);
}
