//! Stateless HTTP request builder and response parser for the rental API.
//!
//! # Design
//! `RentalClient` holds only the versioned base URL and carries no mutable
//! state between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Credentials are not its concern: the host runs a
//! `BearerInterceptor` over every built request before executing it.
//!
//! The backend sometimes reports failure only inside the envelope (HTTP 200
//! carrying `"code": 404`), so parsing checks the status line and the
//! envelope `code`, and both must be 2xx.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;
use uuid::Uuid;

use crate::error::{error_message, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::*;

/// Path prefix of the versioned REST API.
pub const API_PREFIX: &str = "/api/v1";

const CONTENT_TYPE: &str = "content-type";
const ACCEPT: &str = "accept";
const JSON: &str = "application/json";

/// Synchronous, stateless client for the rental API.
#[derive(Debug, Clone)]
pub struct RentalClient {
    base_url: String,
}

impl RentalClient {
    /// `base_url` is the full API root, e.g. `http://localhost:8000/api/v1`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Join an origin and a path prefix, e.g. (`http://host:8000/`, `api/v1`).
    pub fn with_prefix(origin: &str, prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        let origin = origin.trim_end_matches('/');
        if prefix.is_empty() {
            Self::new(origin)
        } else {
            Self::new(&format!("{origin}/{prefix}"))
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        let mut req = HttpRequest::new(method, format!("{}{path}", self.base_url));
        req.headers.push((ACCEPT.to_string(), JSON.to_string()));
        req
    }

    fn query_request(&self, path: &str, pairs: Vec<(&'static str, String)>) -> HttpRequest {
        if pairs.is_empty() {
            return self.request(HttpMethod::Get, path);
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.request(HttpMethod::Get, &format!("{path}?{query}"))
    }

    fn json_request<T: Serialize>(&self, method: HttpMethod, path: &str, input: &T) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = self.request(method, path);
        req.headers.push((CONTENT_TYPE.to_string(), JSON.to_string()));
        req.body = Some(body);
        Ok(req)
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/login", input)
    }

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/register", input)
    }

    pub fn build_refresh(&self, input: &RefreshRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/refresh", input)
    }

    pub fn build_current_user(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/auth/me")
    }

    pub fn build_create_tenant(&self, input: &TenantCreate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/create-tenant", input)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<AuthSession, ApiError> {
        parse_data(&response)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<AuthSession, ApiError> {
        parse_data(&response)
    }

    pub fn parse_refresh(&self, response: HttpResponse) -> Result<RefreshedToken, ApiError> {
        parse_data(&response)
    }

    pub fn parse_current_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        parse_data(&response)
    }

    pub fn parse_create_tenant(&self, response: HttpResponse) -> Result<User, ApiError> {
        parse_data(&response)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub fn build_list_users(&self, query: &UserQuery) -> HttpRequest {
        self.query_request("/users", query.query_pairs())
    }

    pub fn build_user_stats(&self, role_id: &str) -> HttpRequest {
        self.query_request("/users/stats", vec![("role_id", role_id.to_string())])
    }

    pub fn build_update_user(&self, id: Uuid, input: &UserUpdate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/users/{id}"), input)
    }

    pub fn build_delete_user(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/users/{id}"))
    }

    /// Multipart upload with a `document_type` text part and a `file` part.
    pub fn build_upload_document(&self, user_id: Uuid, upload: &DocumentUpload) -> HttpRequest {
        let boundary = format!("rental-{}", Uuid::new_v4().simple());
        let mut body = Vec::with_capacity(upload.bytes.len() + 512);
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"document_type\"\r\n\r\n{}\r\n",
                upload.document_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                upload.file_name.replace('"', "%22").replace(['\r', '\n'], ""),
                upload.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(&upload.bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let mut req = self.request(HttpMethod::Post, &format!("/users/{user_id}/documents"));
        req.headers.push((
            CONTENT_TYPE.to_string(),
            format!("multipart/form-data; boundary={boundary}"),
        ));
        req.body = Some(body);
        req
    }

    pub fn parse_list_users(&self, response: HttpResponse) -> Result<UserPage, ApiError> {
        parse_data(&response)
    }

    pub fn parse_user_stats(&self, response: HttpResponse) -> Result<UserStats, ApiError> {
        parse_data(&response)
    }

    pub fn parse_update_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        parse_data(&response)
    }

    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(&response)
    }

    pub fn parse_upload_document(&self, response: HttpResponse) -> Result<Document, ApiError> {
        parse_data(&response)
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    pub fn build_list_rooms(&self, query: &RoomQuery) -> HttpRequest {
        self.query_request("/rooms", query.query_pairs())
    }

    pub fn build_get_room(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/rooms/{id}"))
    }

    pub fn build_create_room(&self, input: &RoomCreate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/rooms", input)
    }

    pub fn build_update_room(&self, id: Uuid, input: &RoomUpdate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/rooms/{id}"), input)
    }

    pub fn build_delete_room(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/rooms/{id}"))
    }

    pub fn parse_list_rooms(&self, response: HttpResponse) -> Result<RoomPage, ApiError> {
        parse_data(&response)
    }

    pub fn parse_get_room(&self, response: HttpResponse) -> Result<RoomDetail, ApiError> {
        parse_data(&response)
    }

    pub fn parse_create_room(&self, response: HttpResponse) -> Result<RoomDetail, ApiError> {
        parse_data(&response)
    }

    pub fn parse_update_room(&self, response: HttpResponse) -> Result<RoomDetail, ApiError> {
        parse_data(&response)
    }

    pub fn parse_delete_room(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(&response)
    }

    // -----------------------------------------------------------------------
    // Addresses
    // -----------------------------------------------------------------------

    pub fn build_list_addresses(&self, query: &AddressQuery) -> HttpRequest {
        self.query_request("/addresses", query.query_pairs())
    }

    pub fn build_get_address(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/addresses/{id}"))
    }

    pub fn build_create_address(&self, input: &AddressCreate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/addresses", input)
    }

    pub fn build_update_address(&self, id: Uuid, input: &AddressUpdate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/addresses/{id}"), input)
    }

    pub fn build_delete_address(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/addresses/{id}"))
    }

    pub fn parse_list_addresses(&self, response: HttpResponse) -> Result<AddressPage, ApiError> {
        parse_data(&response)
    }

    pub fn parse_get_address(&self, response: HttpResponse) -> Result<Address, ApiError> {
        parse_data(&response)
    }

    pub fn parse_create_address(&self, response: HttpResponse) -> Result<Address, ApiError> {
        parse_data(&response)
    }

    pub fn parse_update_address(&self, response: HttpResponse) -> Result<Address, ApiError> {
        parse_data(&response)
    }

    pub fn parse_delete_address(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(&response)
    }
}

/// The status a response really carries: the HTTP status when it is a
/// failure, otherwise the envelope `code` when the body has one.
pub fn effective_status(response: &HttpResponse) -> u16 {
    if !response.is_success() {
        return response.status;
    }
    serde_json::from_str::<Envelope<Value>>(&response.body)
        .map(|envelope| envelope.code)
        .unwrap_or(response.status)
}

/// Check both status layers and return the envelope's `data`.
fn open_envelope(response: &HttpResponse) -> Result<Option<Value>, ApiError> {
    if !response.is_success() {
        return Err(ApiError::from_response(response.status, &response.body));
    }
    let envelope: Envelope<Value> =
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    if !(200..300).contains(&envelope.code) {
        let message = if envelope.message.is_empty() {
            error_message(&response.body)
        } else {
            envelope.message
        };
        return Err(ApiError::from_status(envelope.code, message));
    }
    Ok(envelope.data.filter(|data| !data.is_null()))
}

fn parse_data<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    let data = open_envelope(response)?
        .ok_or_else(|| ApiError::Deserialization("response envelope has no data".to_string()))?;
    serde_json::from_value(data).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Deletes answer with an envelope around `{}`, or with a bare 204.
fn parse_empty(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() && response.body.trim().is_empty() {
        return Ok(());
    }
    open_envelope(response).map(|_| ())
}
