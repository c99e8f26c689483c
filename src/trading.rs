//! Request bodies and enumerations for the interactive REST API
//!
//! Field names follow the venue's JSON (camelCase). Values are passed
//! through untouched; the venue performs all order validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Body of `POST /user/session`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub secret_key: String,
    pub app_key: String,
    pub source: String,
}

impl LoginRequest {
    pub fn new(secret_key: &str, app_key: &str, source: &str) -> Self {
        Self {
            secret_key: secret_key.to_string(),
            app_key: app_key.to_string(),
            source: source.to_string(),
        }
    }
}

/// Day-wise or net-wise position view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayOrNet {
    DayWise,
    NetWise,
}

impl fmt::Display for DayOrNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayOrNet::DayWise => write!(f, "DayWise"),
            DayOrNet::NetWise => write!(f, "NetWise"),
        }
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub exchange_segment: String,
    #[serde(rename = "exchangeInstrumentID")]
    pub exchange_instrument_id: u64,
    pub product_type: String,
    pub order_type: String,
    pub order_side: OrderSide,
    pub time_in_force: String,
    pub disclosed_quantity: u64,
    pub order_quantity: u64,
    pub limit_price: f64,
    pub stop_price: f64,
    pub order_unique_identifier: String,
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyOrderRequest {
    #[serde(rename = "appOrderID")]
    pub app_order_id: u64,
    pub modified_product_type: String,
    pub modified_order_type: String,
    pub modified_order_quantity: u64,
    pub modified_disclosed_quantity: u64,
    pub modified_limit_price: f64,
    pub modified_stop_price: f64,
    pub modified_time_in_force: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_order_expiry_date: Option<String>,
    pub order_unique_identifier: String,
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Sent as the query string of `DELETE /orders`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    #[serde(rename = "appOrderID")]
    pub app_order_id: u64,
    pub order_unique_identifier: String,
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverOrderRequest {
    pub exchange_segment: String,
    #[serde(rename = "exchangeInstrumentID")]
    pub exchange_instrument_id: u64,
    pub order_side: OrderSide,
    pub order_quantity: u64,
    pub disclosed_quantity: u64,
    pub limit_price: f64,
    pub stop_price: f64,
    pub order_unique_identifier: String,
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitCoverOrderRequest {
    #[serde(rename = "appOrderID")]
    pub app_order_id: String,
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionConversionRequest {
    #[serde(rename = "appOrderID")]
    pub app_order_id: u64,
    #[serde(rename = "executionID")]
    pub execution_id: String,
    pub old_product_type: String,
    pub new_product_type: String,
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketOrderRequest {
    pub exchange_segment: String,
    #[serde(rename = "exchangeInstrumentID")]
    pub exchange_instrument_id: u64,
    pub order_type: String,
    pub order_side: OrderSide,
    pub disclosed_quantity: u64,
    pub order_quantity: u64,
    pub limit_price: f64,
    pub square_off: f64,
    pub stop_loss_price: f64,
    pub trailing_stoploss: f64,
    pub is_pro_order: bool,
    pub order_unique_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyBracketOrderRequest {
    #[serde(rename = "appOrderID")]
    pub app_order_id: u64,
    pub order_quantity: u64,
    pub limit_price: f64,
    pub stop_price: f64,
}

/// Envelope of every REST response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "type", default)]
    pub response_type: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub result: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.response_type == "success"
    }
}

/// Session data returned by a successful login
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginResult {
    pub token: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub client_codes: Vec<String>,
    pub exchange_segment_array: Vec<String>,
    pub is_investor_client: bool,
    pub is_one_touch_user: bool,
    pub enums: Value,
}
