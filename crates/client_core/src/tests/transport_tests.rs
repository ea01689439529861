use super::*;
use crate::{Analytics, Dispatcher, Navigator, TokenStore};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde_json::json;
use shared::domain::{ArchiveId, Category, Retro};
use std::sync::{Arc, Mutex};
use tokio::{net::TcpListener, sync::oneshot};

struct NullNavigator;

impl Navigator for NullNavigator {
    fn home(&self) {}
    fn show_retro(&self, _retro: &Retro) {}
    fn show_retro_for_id(&self, _retro_id: RetroId) {}
    fn retro_login(&self, _retro_id: RetroId) {}
    fn retro_relogin(&self, _retro: &Retro) {}
    fn new_retro(&self) {}
    fn retro_archives(&self, _retro_id: RetroId) {}
    fn retro_archive(&self, _retro_id: RetroId, _archive_id: ArchiveId) {}
    fn retro_settings(&self, _retro_id: RetroId) {}
    fn retro_password_settings(&self, _retro_id: RetroId) {}
    fn registration(&self, _access_token: &str, _email: &str, _name: &str) {}
}

struct NullAnalytics;

impl Analytics for NullAnalytics {
    fn archived_retro(&self, _retro_id: RetroId) {}
    fn created_retro(&self, _retro_id: RetroId) {}
    fn created_retro_item(&self, _retro_id: RetroId, _category: Category) {}
    fn visited_retro(&self, _retro_id: RetroId) {}
    fn done_action_item(&self, _retro_id: RetroId) {}
    fn undone_action_item(&self, _retro_id: RetroId) {}
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(
        Arc::new(NullNavigator),
        Arc::new(NullAnalytics),
        Arc::new(crate::MemoryTokenStore::default()) as Arc<dyn TokenStore>,
    )
}

#[derive(Clone)]
struct WsServerState {
    frames: Vec<String>,
    subscribe_tx: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

async fn handle_ws(ws: WebSocketUpgrade, State(state): State<WsServerState>) -> Response {
    ws.on_upgrade(move |mut socket| async move {
        if let Some(Ok(WsMessage::Text(text))) = socket.recv().await {
            if let Some(tx) = state.subscribe_tx.lock().expect("subscribe").take() {
                let _ = tx.send(text);
            }
        }
        for frame in state.frames {
            let _ = socket.send(WsMessage::Text(frame)).await;
        }
        let _ = socket.send(WsMessage::Close(None)).await;
    })
}

async fn spawn_ws_server(
    frames: Vec<String>,
) -> (String, oneshot::Receiver<String>) {
    let (tx, rx) = oneshot::channel();
    let app = Router::new()
        .route("/retros/:retro_id/events", get(handle_ws))
        .with_state(WsServerState {
            frames,
            subscribe_tx: Arc::new(Mutex::new(Some(tx))),
        });
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), rx)
}

#[tokio::test]
async fn subscribe_records_the_session_and_pumps_pushed_events() {
    let push = json!({
        "type": "websocket_retro_data_received",
        "data": {"retro": {"id": 7, "slug": "pushed", "name": "pushed board", "items": [], "action_items": []}}
    })
    .to_string();
    let (base, subscribe_rx) = spawn_ws_server(vec![push]).await;

    let mut dispatcher = dispatcher();
    let pump = subscribe(&base, RetroId(7), dispatcher.emitter())
        .await
        .expect("subscribe");

    // Session first, then the pushed board data.
    assert!(dispatcher.step().await);
    let session_uuid = dispatcher
        .store()
        .websocket_session()
        .map(|session| session.request_uuid.clone())
        .expect("session recorded");

    assert!(dispatcher.step().await);
    assert_eq!(dispatcher.store().current_retro().name, "pushed board");

    let frame: SubscribeFrame =
        serde_json::from_str(&subscribe_rx.await.expect("subscribe frame")).expect("frame");
    assert_eq!(frame.retro_id, RetroId(7));
    assert_eq!(frame.request_uuid, session_uuid);

    pump.await.expect("pump exits after close");
}

#[tokio::test]
async fn malformed_frames_are_skipped_and_later_frames_still_arrive() {
    let valid = json!({
        "type": "show_dialog",
        "data": {"title": "Pushed", "message": "from the server"}
    })
    .to_string();
    let (base, _subscribe_rx) =
        spawn_ws_server(vec!["{not json".to_string(), valid]).await;

    let mut dispatcher = dispatcher();
    let pump = subscribe(&base, RetroId(1), dispatcher.emitter())
        .await
        .expect("subscribe");

    assert!(dispatcher.step().await); // session
    assert!(dispatcher.step().await); // dialog, garbage skipped
    assert_eq!(
        dispatcher.store().dialog().map(|dialog| dialog.title.as_str()),
        Some("Pushed")
    );

    pump.await.expect("pump exits after close");
}

#[tokio::test]
async fn unknown_event_names_fall_through_as_silent_no_ops() {
    let unknown = json!({"type": "board_repainted", "data": {"color": "mauve"}}).to_string();
    let (base, _subscribe_rx) = spawn_ws_server(vec![unknown]).await;

    let mut dispatcher = dispatcher();
    let pump = subscribe(&base, RetroId(1), dispatcher.emitter())
        .await
        .expect("subscribe");

    assert!(dispatcher.step().await); // session
    assert!(dispatcher.step().await); // Unknown, routed to the default arm
    assert_eq!(dispatcher.store().current_retro(), &Retro::default());

    pump.await.expect("pump exits after close");
}

#[tokio::test]
async fn rejects_unsupported_url_schemes() {
    let dispatcher = dispatcher();
    let err = subscribe("ftp://example.com", RetroId(1), dispatcher.emitter())
        .await
        .err()
        .expect("scheme rejected");
    assert!(matches!(err, SubscribeError::UnsupportedScheme(_)));
}

#[tokio::test]
async fn connect_failure_surfaces_as_a_subscribe_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let dispatcher = dispatcher();
    let err = subscribe(
        &format!("http://{addr}"),
        RetroId(1),
        dispatcher.emitter(),
    )
    .await
    .err()
    .expect("connect rejected");
    assert!(matches!(err, SubscribeError::Connect { .. }));
}
