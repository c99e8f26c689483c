use anyhow::Context;
use interactive_ws_sdk::prelude::*;
use interactive_ws_sdk::{init_logging, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;

    if config.log_enabled {
        let path = logging::init_file_logging(&config.log_dir)?;
        println!("Logging to {}", path.display());
    } else {
        init_logging();
    }

    let secret_key = std::env::var("INTERACTIVE_SECRET_KEY").context("INTERACTIVE_SECRET_KEY not set")?;
    let app_key = std::env::var("INTERACTIVE_APP_KEY").context("INTERACTIVE_APP_KEY not set")?;
    let source = std::env::var("INTERACTIVE_SOURCE").unwrap_or_else(|_| "WEBAPI".to_string());

    let rest = InteractiveRestClient::new(&config)?;
    let session = rest.login(&LoginRequest::new(&secret_key, &app_key, &source)).await?;
    println!("Logged in as {} ({} client codes)", session.user_id, session.client_codes.len());

    let channel = EventChannel::new(config)?;
    for kind in EventKind::ALL {
        channel.subscribe(kind, move |payload| println!("[{}] {}", kind, payload));
    }

    let (user_id, token) = rest
        .session_credentials()
        .context("login returned no session")?;
    channel.open(&user_id, &token)?;

    tokio::signal::ctrl_c().await?;
    println!("Shutting down");

    channel.close();
    if let Err(e) = rest.logout().await {
        tracing::warn!("Logout failed: {}", e);
    }
    Ok(())
}
