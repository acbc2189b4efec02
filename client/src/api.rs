use std::sync::Arc;

use rental_core::interceptor::AUTHORIZATION;
use rental_core::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::transport::{ReqwestTransport, Transport};

/// The configured request object the application shares.
///
/// Every request goes through the bearer interceptor; a 401 answer can
/// trigger one single-flight refresh and one retry.
pub struct ApiClient<T: Transport = ReqwestTransport> {
    requests: RentalClient,
    transport: T,
    storage: Arc<dyn TokenStorage>,
    interceptor: BearerInterceptor,
    coordinator: RefreshCoordinator,
    refresh_on_unauthorized: bool,
}

impl ApiClient<ReqwestTransport> {
    /// File-backed storage when `token_file` is set, in-memory otherwise.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let storage: Arc<dyn TokenStorage> = match &config.token_file {
            Some(path) => Arc::new(FileStorage::new(path.clone())),
            None => Arc::new(MemoryStorage::new()),
        };
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::new(config, transport, storage))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(&ClientConfig::from_env()?)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(config: &ClientConfig, transport: T, storage: Arc<dyn TokenStorage>) -> Self {
        info!(
            base_url = %config.requests().base_url(),
            refresh_on_unauthorized = config.refresh_on_unauthorized,
            "api client configured"
        );
        Self {
            requests: config.requests(),
            interceptor: BearerInterceptor::with_key(Arc::clone(&storage), config.token_key.clone()),
            transport,
            storage,
            coordinator: RefreshCoordinator::new(),
            refresh_on_unauthorized: config.refresh_on_unauthorized,
        }
    }

    /// The underlying request builder.
    pub fn requests(&self) -> &RentalClient {
        &self.requests
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// The session currently in storage, if it holds a usable token.
    pub fn session(&self) -> Option<StoredToken> {
        self.interceptor.current()
    }

    pub fn store_session(&self, token: &StoredToken) -> Result<()> {
        self.storage.set(self.interceptor.key(), &token.to_storage_value())?;
        Ok(())
    }

    /// Forget the stored session.
    pub fn logout(&self) -> Result<()> {
        self.storage.remove(self.interceptor.key())?;
        info!("session cleared");
        Ok(())
    }

    /// Attach the bearer token and execute. Returns the response and the
    /// access token that was sent.
    async fn dispatch(&self, mut request: HttpRequest) -> Result<(HttpResponse, Option<String>)> {
        self.interceptor.intercept(&mut request);
        let sent = request
            .header(AUTHORIZATION)
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);
        debug!(
            method = %request.method,
            url = %request.url,
            authorized = sent.is_some(),
            "dispatching request"
        );
        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "response received");
        Ok((response, sent))
    }

    /// Execute `request` with the stored bearer token.
    ///
    /// On an effective 401 with refresh enabled: if the stored token changed
    /// while the request was in flight, retry with it; otherwise refresh
    /// through the coordinator and retry once. When no refresh token is
    /// stored or the refresh fails, the original 401 response is returned.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let (response, sent) = self.dispatch(request.clone()).await?;
        if !self.refresh_on_unauthorized || effective_status(&response) != 401 {
            return Ok(response);
        }

        let Some(current) = self.session() else {
            debug!("401 with no stored session");
            return Ok(response);
        };
        if sent.as_deref() != Some(current.access.as_str()) {
            debug!("stored token changed while request was in flight, retrying");
            return Ok(self.dispatch(request).await?.0);
        }
        let Some(refresh_token) = current.refresh else {
            debug!("401 and no refresh token stored");
            return Ok(response);
        };
        let stale = current.access.as_str().to_string();

        match self.coordinator.run(|| self.refresh_outcome(stale, refresh_token)).await {
            Ok(_) => Ok(self.dispatch(request).await?.0),
            Err(message) => {
                warn!(error = %message, "token refresh failed, returning original response");
                Ok(response)
            }
        }
    }

    /// Refresh the access token now, sharing any refresh already running.
    pub async fn refresh(&self) -> Result<()> {
        let (stale, refresh_token) = self
            .session()
            .and_then(|session| Some((session.access.as_str().to_string(), session.refresh?)))
            .ok_or_else(|| ClientError::Refresh("no refresh token stored".to_string()))?;
        self.coordinator
            .run(|| self.refresh_outcome(stale, refresh_token))
            .await
            .map(|_| ())
            .map_err(ClientError::Refresh)
    }

    /// Leader side of a refresh. Skips the network when storage already
    /// holds a token other than `stale`.
    async fn refresh_outcome(&self, stale: String, refresh_token: String) -> RefreshOutcome {
        if let Some(current) = self.session() {
            if current.access.as_str() != stale {
                debug!("access token already replaced, skipping refresh");
                return Ok(current.access.as_str().to_string());
            }
        }
        info!("refreshing access token");
        self.exchange_refresh_token(refresh_token)
            .await
            .map_err(|e| e.to_string())
    }

    /// POST the refresh token and persist the new session. Goes straight to
    /// the transport, so it never triggers a refresh of its own.
    async fn exchange_refresh_token(&self, refresh_token: String) -> Result<String> {
        let request = self.requests.build_refresh(&RefreshRequest {
            refresh_token: refresh_token.clone(),
        })?;
        let response = self.transport.execute(request).await?;
        let refreshed = self.requests.parse_refresh(response)?;
        let access = BearerToken::new(&refreshed.access_token)
            .ok_or_else(|| ClientError::Refresh("server returned an unusable access token".to_string()))?;
        let session = StoredToken::new(access, Some(refreshed.refresh_token.unwrap_or(refresh_token)));
        self.store_session(&session)?;
        info!("access token refreshed");
        Ok(session.access.as_str().to_string())
    }

    fn persist(&self, session: &AuthSession) -> Result<()> {
        let token = session.stored_token().ok_or_else(|| {
            ApiError::Deserialization("session carries no usable access token".to_string())
        })?;
        self.store_session(&token)
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    /// Log in and persist the returned session.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let request = self.requests.build_login(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let response = self.transport.execute(request).await?;
        let session = self.requests.parse_login(response)?;
        self.persist(&session)?;
        info!(user_id = %session.user.id, "logged in");
        Ok(session)
    }

    /// Register and persist the returned session.
    pub async fn register(&self, input: &RegisterRequest) -> Result<AuthSession> {
        let request = self.requests.build_register(input)?;
        let response = self.transport.execute(request).await?;
        let session = self.requests.parse_register(response)?;
        self.persist(&session)?;
        info!(user_id = %session.user.id, "registered");
        Ok(session)
    }

    pub async fn current_user(&self) -> Result<User> {
        let response = self.send(self.requests.build_current_user()).await?;
        Ok(self.requests.parse_current_user(response)?)
    }

    pub async fn create_tenant(&self, input: &TenantCreate) -> Result<User> {
        let response = self.send(self.requests.build_create_tenant(input)?).await?;
        Ok(self.requests.parse_create_tenant(response)?)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub async fn list_users(&self, query: &UserQuery) -> Result<UserPage> {
        let response = self.send(self.requests.build_list_users(query)).await?;
        Ok(self.requests.parse_list_users(response)?)
    }

    pub async fn user_stats(&self, role_id: &str) -> Result<UserStats> {
        let response = self.send(self.requests.build_user_stats(role_id)).await?;
        Ok(self.requests.parse_user_stats(response)?)
    }

    pub async fn update_user(&self, id: Uuid, input: &UserUpdate) -> Result<User> {
        let response = self.send(self.requests.build_update_user(id, input)?).await?;
        Ok(self.requests.parse_update_user(response)?)
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<()> {
        let response = self.send(self.requests.build_delete_user(id)).await?;
        Ok(self.requests.parse_delete_user(response)?)
    }

    pub async fn upload_document(&self, user_id: Uuid, upload: &DocumentUpload) -> Result<Document> {
        let response = self.send(self.requests.build_upload_document(user_id, upload)).await?;
        Ok(self.requests.parse_upload_document(response)?)
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    pub async fn list_rooms(&self, query: &RoomQuery) -> Result<RoomPage> {
        let response = self.send(self.requests.build_list_rooms(query)).await?;
        Ok(self.requests.parse_list_rooms(response)?)
    }

    pub async fn get_room(&self, id: Uuid) -> Result<RoomDetail> {
        let response = self.send(self.requests.build_get_room(id)).await?;
        Ok(self.requests.parse_get_room(response)?)
    }

    pub async fn create_room(&self, input: &RoomCreate) -> Result<RoomDetail> {
        let response = self.send(self.requests.build_create_room(input)?).await?;
        Ok(self.requests.parse_create_room(response)?)
    }

    pub async fn update_room(&self, id: Uuid, input: &RoomUpdate) -> Result<RoomDetail> {
        let response = self.send(self.requests.build_update_room(id, input)?).await?;
        Ok(self.requests.parse_update_room(response)?)
    }

    pub async fn delete_room(&self, id: Uuid) -> Result<()> {
        let response = self.send(self.requests.build_delete_room(id)).await?;
        Ok(self.requests.parse_delete_room(response)?)
    }

    // -----------------------------------------------------------------------
    // Addresses
    // -----------------------------------------------------------------------

    pub async fn list_addresses(&self, query: &AddressQuery) -> Result<AddressPage> {
        let response = self.send(self.requests.build_list_addresses(query)).await?;
        Ok(self.requests.parse_list_addresses(response)?)
    }

    pub async fn get_address(&self, id: Uuid) -> Result<Address> {
        let response = self.send(self.requests.build_get_address(id)).await?;
        Ok(self.requests.parse_get_address(response)?)
    }

    pub async fn create_address(&self, input: &AddressCreate) -> Result<Address> {
        let response = self.send(self.requests.build_create_address(input)?).await?;
        Ok(self.requests.parse_create_address(response)?)
    }

    pub async fn update_address(&self, id: Uuid, input: &AddressUpdate) -> Result<Address> {
        let response = self.send(self.requests.build_update_address(id, input)?).await?;
        Ok(self.requests.parse_update_address(response)?)
    }

    pub async fn delete_address(&self, id: Uuid) -> Result<()> {
        let response = self.send(self.requests.build_delete_address(id)).await?;
        Ok(self.requests.parse_delete_address(response)?)
    }
}
