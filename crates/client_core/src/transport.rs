//! Websocket adapter: turns pushed frames into dispatched events.

use futures::{SinkExt, StreamExt};
use shared::{
    domain::{RetroId, WebsocketSession},
    protocol::{RetroEvent, SubscribeFrame},
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::EventEmitter;

#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported server url scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("failed to encode subscribe frame: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to connect websocket at {url}: {source}")]
    Connect {
        url: String,
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("failed to send subscribe frame: {0}")]
    Subscribe(tokio_tungstenite::tungstenite::Error),
}

/// Opens the retro's push channel and spawns the frame pump. A fresh
/// `request_uuid` identifies this subscription; it is recorded in the store
/// (via an emitted session event) and sent to the server so pushes caused by
/// this client's own actions can be recognized as echoes.
///
/// Frames that are not valid JSON are logged and skipped; event names the
/// client does not know decode to `Unknown` and fall through the dispatcher
/// unchanged. A transport failure surfaces as `api_server_not_found` and
/// ends the pump; the channel adapter owns any reconnect policy.
pub async fn subscribe(
    server_url: &str,
    retro_id: RetroId,
    emitter: EventEmitter,
) -> Result<JoinHandle<()>, SubscribeError> {
    let url = events_url(server_url, retro_id)?;
    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .map_err(|source| SubscribeError::Connect {
            url: url.to_string(),
            source,
        })?;
    let (mut ws_writer, mut ws_reader) = ws_stream.split();

    let request_uuid = Uuid::new_v4().to_string();
    let frame = serde_json::to_string(&SubscribeFrame {
        retro_id,
        request_uuid: request_uuid.clone(),
    })?;
    ws_writer
        .send(Message::Text(frame))
        .await
        .map_err(SubscribeError::Subscribe)?;

    emitter.emit(RetroEvent::WebsocketSessionDataReceived {
        payload: Some(WebsocketSession { request_uuid }),
    });

    Ok(tokio::spawn(async move {
        while let Some(message) = ws_reader.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<RetroEvent>(&text) {
                    Ok(event) => emitter.emit(event),
                    Err(err) => warn!(retro_id = retro_id.0, "ws: skipping malformed frame: {err}"),
                },
                Ok(Message::Close(_)) => {
                    info!(retro_id = retro_id.0, "ws: server closed the retro channel");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(retro_id = retro_id.0, "ws: receive failed: {err}");
                    emitter.emit(RetroEvent::ApiServerNotFound);
                    break;
                }
            }
        }
    }))
}

fn events_url(server_url: &str, retro_id: RetroId) -> Result<Url, SubscribeError> {
    let mut url = Url::parse(server_url)?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" => "ws",
        "wss" => "wss",
        other => return Err(SubscribeError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|()| SubscribeError::UnsupportedScheme(url.scheme().to_string()))?;
    url.set_path(&format!("/retros/{}/events", retro_id.0));
    Ok(url)
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
