//! CLI for submux
//!
//! Subcommands:
//! - `gateway`: run the WebSocket gateway
//! - `client`: connect to a gateway, subscribe to a topic and publish to it

use clap::Parser;
use submux::config::{Settings, load_config};
use submux::transport::{GatewayContext, start_websocket_server};
use submux::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "submux")]
enum Command {
    /// Start the WebSocket gateway
    Gateway,
    /// Run a smoke-test client (subscribe, publish, print replies)
    Client {
        /// Gateway URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Topic to subscribe and publish to
        #[arg(long, default_value = "events:global")]
        topic: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cmd = Command::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    logging::init(&settings.logging.level);

    let result = match cmd {
        Command::Gateway => run_gateway(settings).await,
        Command::Client { url, topic } => run_client(&url, &topic).await,
    };
    if let Err(e) = &result {
        error!("submux failed: {}", e);
    }
    result
}

async fn run_gateway(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let ctx = GatewayContext::from_settings(&settings);

    tokio::select! {
        result = start_websocket_server(&addr, ctx.clone()) => {
            result?;
            error!("WebSocket gateway exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Closing shared channels.");
        }
    }

    ctx.multiplexer.shutdown().await?;
    info!("All shared channels closed.");
    Ok(())
}

async fn run_client(url: &str, topic: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use std::time::Duration;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    let subscribe = json!({ "type": "subscribe", "topic": topic });
    ws_stream.send(WsMessage::text(subscribe.to_string())).await?;

    let publish = json!({ "type": "publish", "topic": topic, "payload": "Hello from submux" });
    ws_stream.send(WsMessage::text(publish.to_string())).await?;

    // subscribed, published and the event itself
    for _ in 0..3 {
        match tokio::time::timeout(Duration::from_secs(5), ws_stream.next()).await {
            Ok(Some(Ok(WsMessage::Text(msg)))) => println!("{msg}"),
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(None) | Err(_) => break,
        }
    }

    ws_stream.close(None).await?;
    Ok(())
}
