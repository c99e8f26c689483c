//! # Interactive WS SDK
//!
//! Client for a brokerage's interactive (order management) API: a REST
//! facade for sessions, orders and portfolio queries, and a self-healing
//! push channel that streams order, trade and position updates.
//!
//! The push channel reconnects on a fixed interval after any unexpected
//! drop and keeps every registered handler across reconnects.
//!
//! ## Quick Start
//! ```rust,ignore
//! use interactive_ws_sdk::prelude::*;
//!
//! let rest = InteractiveRestClient::new(&config)?;
//! rest.login(&LoginRequest::new(secret, app_key, "WEBAPI")).await?;
//! let (user_id, token) = rest.session_credentials().unwrap();
//!
//! let channel = EventChannel::new(config)?;
//! channel.on_order(|order| println!("order {}", order["appOrderID"]));
//! channel.open(&user_id, &token)?;
//! ```

pub mod client;
pub mod connection;
pub mod credentials;
pub mod data;
pub mod error;
pub mod events;
pub mod logging;
pub mod parser;
pub mod rest_client;
pub mod retry;
pub mod trading;

pub use client::{ClientConfigBuilder, EventChannel};
pub use connection::{Transport, TransportEvent, TransportSink, WsTransport};
pub use credentials::{Credentials, CredentialsHolder};
pub use data::*;
pub use error::*;
pub use events::*;
pub use rest_client::InteractiveRestClient;

/// Prelude - the types most applications need
///
/// Import with: `use interactive_ws_sdk::prelude::*;`
pub mod prelude {
    /// Push channel
    pub use crate::client::{ClientConfigBuilder, EventChannel};
    pub use crate::data::{ClientConfig, ConnectionState, EventKind};
    pub use crate::events::SubscriptionId;

    /// REST facade
    pub use crate::rest_client::InteractiveRestClient;
    pub use crate::trading::{ApiResponse, DayOrNet, LoginRequest, OrderSide};

    /// Errors
    pub use crate::error::{ErrorKind, SdkError};
}

/// Initialize console logging for the SDK
pub fn init_logging() {
    tracing_subscriber::fmt::init();
}
