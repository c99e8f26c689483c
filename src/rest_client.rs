//! REST API client for the interactive (order) service
//!
//! Provides session management plus the account, order and exchange
//! endpoints. The session obtained from [`login`](InteractiveRestClient::login)
//! is also what authenticates the push channel: feed
//! [`session_credentials`](InteractiveRestClient::session_credentials) into
//! `EventChannel::open`.

use crate::data::ClientConfig;
use crate::error::SdkError;
use crate::trading::*;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use std::sync::{RwLock, RwLockReadGuard};

const SESSION: &str = "/user/session";
const PROFILE: &str = "/user/profile";
const BALANCE: &str = "/user/balance";
const HOLDINGS: &str = "/portfolio/holdings";
const POSITIONS: &str = "/portfolio/positions";
const CONVERT: &str = "/portfolio/positions/convert";
const ORDERS: &str = "/orders";
const COVER: &str = "/orders/cover";
const TRADES: &str = "/orders/trades";
const BRACKET: &str = "/orders/bracket";
const ENUMS: &str = "/enums";
const EXCHANGE_MESSAGE: &str = "/messages/exchange";
const EXCHANGE_STATUS: &str = "/status/exchange";

#[derive(Debug, Clone, Default)]
struct Session {
    token: String,
    user_id: String,
    client_codes: Vec<String>,
    is_investor_client: bool,
}

/// REST client for the interactive API
pub struct InteractiveRestClient {
    base_url: String,
    http_client: reqwest::Client,
    session: RwLock<Option<Session>>,
}

impl InteractiveRestClient {
    /// Create a client rooted at `<config.url>/interactive`
    pub fn new(config: &ClientConfig) -> Result<Self, SdkError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url: format!("{}/interactive", config.url.trim_end_matches('/')),
            http_client,
            session: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().is_some()
    }

    /// `(userID, token)` of the current session
    pub fn session_credentials(&self) -> Option<(String, String)> {
        self.session()
            .as_ref()
            .map(|s| (s.user_id.clone(), s.token.clone()))
    }

    pub fn client_codes(&self) -> Vec<String> {
        self.session()
            .as_ref()
            .map(|s| s.client_codes.clone())
            .unwrap_or_default()
    }

    // ========== Session Endpoints ==========

    /// Log in and keep the returned session for subsequent calls
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResult, SdkError> {
        let url = format!("{}{}", self.base_url, SESSION);
        let builder = with_body(self.http_client.post(&url), request)?;
        let response = self.execute("login", builder).await?;

        let result: LoginResult = serde_json::from_value(response.result)
            .map_err(|e| SdkError::decode(format!("Invalid login result: {}", e)))?;

        *self.session_mut() = Some(Session {
            token: result.token.clone(),
            user_id: result.user_id.clone(),
            client_codes: result.client_codes.clone(),
            is_investor_client: result.is_investor_client,
        });
        tracing::info!("Logged in as {}", result.user_id);

        Ok(result)
    }

    /// End the session on the server and forget it locally
    pub async fn logout(&self) -> Result<ApiResponse, SdkError> {
        let builder = self.authorized(Method::DELETE, SESSION)?;
        let response = self.execute("logout", builder).await?;

        *self.session_mut() = None;
        tracing::info!("Logged out");
        Ok(response)
    }

    // ========== Account Endpoints ==========

    pub async fn get_profile(&self, client_id: Option<&str>) -> Result<ApiResponse, SdkError> {
        let builder = self.authorized(Method::GET, PROFILE)?;
        self.execute("get_profile", with_client_id(builder, client_id)).await
    }

    pub async fn get_balance(&self, client_id: Option<&str>) -> Result<ApiResponse, SdkError> {
        let builder = self.authorized(Method::GET, BALANCE)?;
        self.execute("get_balance", with_client_id(builder, client_id)).await
    }

    pub async fn get_holdings(&self, client_id: Option<&str>) -> Result<ApiResponse, SdkError> {
        let builder = self.authorized(Method::GET, HOLDINGS)?;
        self.execute("get_holdings", with_client_id(builder, client_id)).await
    }

    /// Day-wise or net-wise positions. Dealers must name the client.
    pub async fn get_positions(
        &self,
        day_or_net: DayOrNet,
        client_id: Option<&str>,
    ) -> Result<ApiResponse, SdkError> {
        let builder = self.authorized(Method::GET, POSITIONS)?;
        self.check_client_code(client_id)?;

        let builder = builder.query(&[("dayOrNet", day_or_net.to_string())]);
        self.execute("get_positions", with_client_id(builder, client_id)).await
    }

    pub async fn convert_position(
        &self,
        request: &PositionConversionRequest,
    ) -> Result<ApiResponse, SdkError> {
        let builder = with_body(self.authorized(Method::PUT, CONVERT)?, request)?;
        self.execute("convert_position", builder).await
    }

    // ========== Order Endpoints ==========

    pub async fn place_order(&self, request: &PlaceOrderRequest) -> Result<ApiResponse, SdkError> {
        let builder = with_body(self.authorized(Method::POST, ORDERS)?, request)?;
        self.execute("place_order", builder).await
    }

    pub async fn modify_order(&self, request: &ModifyOrderRequest) -> Result<ApiResponse, SdkError> {
        let builder = with_body(self.authorized(Method::PUT, ORDERS)?, request)?;
        self.execute("modify_order", builder).await
    }

    pub async fn cancel_order(&self, request: &CancelOrderRequest) -> Result<ApiResponse, SdkError> {
        let builder = self.authorized(Method::DELETE, ORDERS)?;
        self.check_client_code(request.client_id.as_deref())?;

        tracing::debug!("Cancel query: {:?}", request);
        self.execute("cancel_order", builder.query(request)).await
    }

    pub async fn place_cover_order(&self, request: &CoverOrderRequest) -> Result<ApiResponse, SdkError> {
        let builder = with_body(self.authorized(Method::POST, COVER)?, request)?;
        self.execute("place_cover_order", builder).await
    }

    pub async fn exit_cover_order(
        &self,
        request: &ExitCoverOrderRequest,
    ) -> Result<ApiResponse, SdkError> {
        let builder = with_body(self.authorized(Method::PUT, COVER)?, request)?;
        self.execute("exit_cover_order", builder).await
    }

    pub async fn get_order_book(&self, client_id: Option<&str>) -> Result<ApiResponse, SdkError> {
        let builder = self.authorized(Method::GET, ORDERS)?;
        self.execute("get_order_book", with_client_id(builder, client_id)).await
    }

    pub async fn get_trade_book(&self, client_id: Option<&str>) -> Result<ApiResponse, SdkError> {
        let builder = self.authorized(Method::GET, TRADES)?;
        self.execute("get_trade_book", with_client_id(builder, client_id)).await
    }

    pub async fn get_order_history(&self, app_order_id: u64) -> Result<ApiResponse, SdkError> {
        let builder = self
            .authorized(Method::GET, ORDERS)?
            .query(&[("appOrderID", app_order_id)]);
        self.execute("get_order_history", builder).await
    }

    pub async fn get_enums(&self) -> Result<ApiResponse, SdkError> {
        let builder = self.authorized(Method::GET, ENUMS)?;
        let builder = builder.query(&[("userID", self.user_id())]);
        self.execute("get_enums", builder).await
    }

    // ========== Bracket Orders ==========

    pub async fn place_bracket_order(
        &self,
        request: &BracketOrderRequest,
    ) -> Result<ApiResponse, SdkError> {
        let builder = with_body(self.authorized(Method::POST, BRACKET)?, request)?;
        self.execute("place_bracket_order", builder).await
    }

    pub async fn modify_bracket_order(
        &self,
        request: &ModifyBracketOrderRequest,
    ) -> Result<ApiResponse, SdkError> {
        let builder = with_body(self.authorized(Method::PUT, BRACKET)?, request)?;
        self.execute("modify_bracket_order", builder).await
    }

    pub async fn cancel_bracket_order(&self, entry_order_id: u64) -> Result<ApiResponse, SdkError> {
        let builder = self
            .authorized(Method::DELETE, BRACKET)?
            .query(&[("boEntryOrderId", entry_order_id)]);
        self.execute("cancel_bracket_order", builder).await
    }

    // ========== Exchange Endpoints ==========

    pub async fn get_exchange_message(&self, exchange_segment: &str) -> Result<ApiResponse, SdkError> {
        let builder = self
            .authorized(Method::GET, EXCHANGE_MESSAGE)?
            .query(&[("exchangeSegment", exchange_segment)]);
        self.execute("get_exchange_message", builder).await
    }

    pub async fn get_exchange_status(&self) -> Result<ApiResponse, SdkError> {
        let builder = self.authorized(Method::GET, EXCHANGE_STATUS)?;
        let builder = builder.query(&[("userID", self.user_id())]);
        self.execute("get_exchange_status", builder).await
    }

    // ========== Internal Methods ==========

    fn session(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.session.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn session_mut(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.session.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn user_id(&self) -> String {
        self.session()
            .as_ref()
            .map(|s| s.user_id.clone())
            .unwrap_or_default()
    }

    /// Start a request carrying the session token, or fail with
    /// `LoginRequired` before anything is sent
    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, SdkError> {
        let token = match self.session().as_ref() {
            Some(session) => session.token.clone(),
            None => return Err(SdkError::login_required()),
        };

        let url = format!("{}{}", self.base_url, path);
        Ok(self
            .http_client
            .request(method, &url)
            .header("authorization", token))
    }

    fn check_client_code(&self, client_id: Option<&str>) -> Result<(), SdkError> {
        let investor = self
            .session()
            .as_ref()
            .map(|s| s.is_investor_client)
            .unwrap_or(false);

        match client_id {
            _ if investor => Ok(()),
            Some(id) if !id.is_empty() => Ok(()),
            _ => Err(SdkError::client_code_required()),
        }
    }

    async fn execute(&self, operation: &str, builder: RequestBuilder) -> Result<ApiResponse, SdkError> {
        let request = builder.build()?;
        tracing::debug!("Request [{}]: {} {}", operation, request.method(), request.url());

        let response = self.http_client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!("Response [{}] {}: {}", operation, status, body);

        if !status.is_success() {
            let description = serde_json::from_str::<ApiResponse>(&body)
                .map(|r| r.description)
                .unwrap_or(body);
            return Err(
                SdkError::transport(format!("HTTP {}: {}", status, description))
                    .with_status(status.as_u16()),
            );
        }

        serde_json::from_str(&body).map_err(|e| {
            SdkError::decode(format!("Invalid {} response: {}", operation, e)).with_status(status.as_u16())
        })
    }
}

impl std::fmt::Debug for InteractiveRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveRestClient")
            .field("base_url", &self.base_url)
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}

fn with_body<T: Serialize>(builder: RequestBuilder, body: &T) -> Result<RequestBuilder, SdkError> {
    tracing::debug!("Request body: {}", serde_json::to_string(body)?);
    Ok(builder.json(body))
}

fn with_client_id(builder: RequestBuilder, client_id: Option<&str>) -> RequestBuilder {
    match client_id {
        Some(id) => builder.query(&[("clientID", id)]),
        None => builder,
    }
}
