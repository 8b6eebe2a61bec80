use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::{Semaphore, mpsc};
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::Client;
use crate::config::Settings;
use crate::hub::{ChannelHandle, Hub, HubChannelFactory, Message};
use crate::multiplexer::SubscriptionMultiplexer;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::GatewayError;

/// Everything a gateway connection needs, shared by all connections.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub multiplexer: SubscriptionMultiplexer<ChannelHandle>,
    pub hub: Hub,
    pub factory: HubChannelFactory,
    pub max_connections: usize,
}

impl GatewayContext {
    pub fn new(
        multiplexer: SubscriptionMultiplexer<ChannelHandle>,
        hub: Hub,
        max_connections: usize,
    ) -> Self {
        Self {
            factory: HubChannelFactory::new(hub.clone()),
            multiplexer,
            hub,
            max_connections,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            SubscriptionMultiplexer::from_settings(&settings.multiplexer),
            Hub::from_settings(&settings.hub),
            settings.server.max_connections,
        )
    }
}

/// Binds `addr` and serves gateway connections until the listener fails.
pub async fn start_websocket_server(addr: &str, ctx: GatewayContext) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| GatewayError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    info!("WebSocket gateway listening on ws://{}", addr);
    serve(listener, ctx).await
}

/// Accepts connections on an already bound listener.
///
/// Connections beyond `max_connections` are closed right away.
pub async fn serve(listener: TcpListener, ctx: GatewayContext) -> Result<(), GatewayError> {
    let limit = connection_limit(ctx.max_connections);
    if limit == 0 {
        warn!("max_connections is 0; every connection will be rejected");
    }
    let slots = Arc::new(Semaphore::new(limit));

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let Ok(slot) = Arc::clone(&slots).try_acquire_owned() else {
            warn!(%peer, "connection limit reached; rejecting");
            continue;
        };

        let ctx = ctx.clone();
        spawn(async move {
            if let Err(e) = handle_connection(stream, ctx).await {
                warn!(%peer, error = %e, "connection ended with error");
            }
            drop(slot);
        });
    }
}

/// Caps the configured limit at what a semaphore can hold.
pub(crate) fn connection_limit(max_connections: usize) -> usize {
    max_connections.min(Semaphore::MAX_PERMITS)
}

async fn handle_connection(stream: TcpStream, ctx: GatewayContext) -> Result<(), GatewayError> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Create channel for this client
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let mut client = Client::new(tx);
    let client_id = client.id.clone();
    info!(client = %client_id, "client connected");

    // Forward queued messages to the socket
    let send_id = client_id.clone();
    let send_loop = spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                warn!(client = %send_id, error = %e, "failed to send message");
                break;
            }
        }
        debug!(client = %send_id, "send loop closed");
    });

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!(client = %client_id, error = %e, "read failed");
                break;
            }
        };
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }

        let reply = match msg.to_text() {
            Ok(text) => handle_client_message(&ctx, &mut client, text).await,
            Err(e) => ServerMessage::error(format!("invalid text frame: {e}")),
        };
        client.send(&reply)?;
    }

    let released = client.detach_all().await;
    info!(client = %client_id, released, "client disconnected");
    drop(client);
    send_loop.abort();
    Ok(())
}

/// Applies one client message and returns the reply for it.
pub(crate) async fn handle_client_message(
    ctx: &GatewayContext,
    client: &mut Client,
    text: &str,
) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { topic }) => {
            if client.is_subscribed(&topic) {
                return ServerMessage::error(format!("already subscribed to {topic}"));
            }
            match ctx.multiplexer.subscribe(&topic, ctx.factory.clone()).await {
                Ok(subscription) => {
                    client.attach(subscription);
                    debug!(client = %client.id, topic = %topic, "subscribed");
                    ServerMessage::Subscribed { topic }
                }
                Err(e) => {
                    warn!(client = %client.id, topic = %topic, error = %e, "subscribe failed");
                    ServerMessage::error(e.to_string())
                }
            }
        }

        Ok(ClientMessage::Unsubscribe { topic }) => match client.detach(&topic).await {
            Some(Ok(())) => ServerMessage::Unsubscribed { topic },
            Some(Err(e)) => {
                // The reference is gone either way; only the close failed.
                warn!(client = %client.id, topic = %topic, error = %e, "teardown failed");
                ServerMessage::Unsubscribed { topic }
            }
            None => ServerMessage::error(format!("not subscribed to {topic}")),
        },

        Ok(ClientMessage::Publish { topic, payload }) => {
            let delivered = ctx.hub.publish(Message::new(topic.clone(), payload));
            debug!(client = %client.id, topic = %topic, delivered, "published");
            ServerMessage::Published { topic, delivered }
        }

        Err(err) => {
            warn!(client = %client.id, error = %err, "invalid client message");
            ServerMessage::error(format!("invalid client message: {err}"))
        }
    }
}
