//! Event-routing and state-reconciliation core for the collaborative retro
//! client. Everything that happens to the board — terminal results of the
//! client's own REST actions, server pushes, UI intents, timer ticks —
//! arrives as a [`RetroEvent`] and is routed by one [`Dispatcher`] over a
//! single queue, one event at a time.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{ArchiveId, Category, Retro, RetroId},
    protocol::{ForceReloginPayload, PushCommand, RetroEvent},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

pub mod api;
pub mod store;
pub mod token_store;
pub mod transport;

pub use store::{Alert, Dialog, NotFoundFlag, NotFoundFlags, RetroStore};
pub use token_store::{DurableTokenStore, MemoryTokenStore, TokenStore, AUTH_TOKEN_KEY_PREFIX};

/// How long a shown alert stays up before the scheduled clear fires.
const ALERT_DISMISS_DELAY: Duration = Duration::from_millis(4000);

/// Navigation sink. One function per destination, taking the minimal
/// identifying argument needed to build it. Fire-and-forget.
pub trait Navigator: Send + Sync {
    fn home(&self);
    fn show_retro(&self, retro: &Retro);
    fn show_retro_for_id(&self, retro_id: RetroId);
    fn retro_login(&self, retro_id: RetroId);
    fn retro_relogin(&self, retro: &Retro);
    fn new_retro(&self);
    fn retro_archives(&self, retro_id: RetroId);
    fn retro_archive(&self, retro_id: RetroId, archive_id: ArchiveId);
    fn retro_settings(&self, retro_id: RetroId);
    fn retro_password_settings(&self, retro_id: RetroId);
    fn registration(&self, access_token: &str, email: &str, name: &str);
}

/// Analytics sink, keyed by business event. Fire-and-forget.
pub trait Analytics: Send + Sync {
    fn archived_retro(&self, retro_id: RetroId);
    fn created_retro(&self, retro_id: RetroId);
    fn created_retro_item(&self, retro_id: RetroId, category: Category);
    fn visited_retro(&self, retro_id: RetroId);
    fn done_action_item(&self, retro_id: RetroId);
    fn undone_action_item(&self, retro_id: RetroId);
}

/// Handle for posting events into the dispatch queue. Adapters hold clones;
/// handlers use the dispatcher's own copy to emit follow-on events, which
/// re-enter the queue instead of being applied recursively.
#[derive(Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<RetroEvent>,
}

impl EventEmitter {
    pub fn emit(&self, event: RetroEvent) {
        if self.tx.send(event).is_err() {
            warn!("dispatch: event dropped, dispatcher is gone");
        }
    }
}

/// Scheduled clear for the alert slot: IDLE when `pending` is none, ARMED
/// otherwise. Arming always discards the previous countdown. The generation
/// ties each expiry to the show that armed it, so an expiry that was already
/// queued when a newer alert replaced it is discarded instead of clearing
/// the wrong message.
struct AlertTimer {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl AlertTimer {
    fn new() -> Self {
        Self {
            generation: 0,
            pending: None,
        }
    }

    fn arm(&mut self, emitter: EventEmitter) {
        self.cancel();
        let generation = self.generation;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(ALERT_DISMISS_DELAY).await;
            emitter.emit(RetroEvent::AlertExpired { generation });
        }));
    }

    /// Aborting a finished or never-armed countdown is a no-op; bumping the
    /// generation invalidates an expiry that already reached the queue.
    fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    fn acknowledge_expiry(&mut self) {
        self.pending = None;
    }
}

/// The central router. Owns the state store (single writer), the capability
/// sinks, and the receiving end of the event queue.
pub struct Dispatcher {
    store: RetroStore,
    navigator: Arc<dyn Navigator>,
    analytics: Arc<dyn Analytics>,
    tokens: Arc<dyn TokenStore>,
    events: mpsc::UnboundedReceiver<RetroEvent>,
    emitter: EventEmitter,
    alert_timer: AlertTimer,
}

impl Dispatcher {
    pub fn new(
        navigator: Arc<dyn Navigator>,
        analytics: Arc<dyn Analytics>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store: RetroStore::new(),
            navigator,
            analytics,
            tokens,
            events: rx,
            emitter: EventEmitter { tx },
            alert_timer: AlertTimer::new(),
        }
    }

    pub fn emitter(&self) -> EventEmitter {
        self.emitter.clone()
    }

    pub fn store(&self) -> &RetroStore {
        &self.store
    }

    /// Drains the queue for the lifetime of the client session.
    pub async fn run(mut self) {
        while self.step().await {}
    }

    /// Waits for the next queued event and handles it to completion.
    pub async fn step(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => {
                self.handle(event).await;
                true
            }
            None => false,
        }
    }

    /// Routes one event. Runs to completion before the caller can hand over
    /// the next one, so no interleaved partial mutation of the store is
    /// observable. Handlers never perform network I/O; anything that needs
    /// the network re-enters the queue through the emitter. The only await
    /// is the local durable token store.
    pub async fn handle(&mut self, event: RetroEvent) {
        match event {
            RetroEvent::RetroSuccessfullyCreated { retro } => {
                self.store.clear_errors();
                self.analytics.created_retro(retro.id);
                self.navigator.show_retro(&retro);
            }
            RetroEvent::RetroUnsuccessfullyCreated { errors }
            | RetroEvent::RetroSettingsUnsuccessfullyUpdated { errors }
            | RetroEvent::RetroPasswordUnsuccessfullyUpdated { errors } => {
                self.store.set_errors(errors);
            }
            RetroEvent::RetroSuccessfullyFetched { retro } => {
                self.analytics.visited_retro(retro.id);
                self.store.replace_current_retro(retro);
            }
            RetroEvent::GetRetroSettingsSuccessfullyReceived { retro }
            | RetroEvent::GetRetroLoginSuccessfullyReceived { retro }
            | RetroEvent::RetroItemSuccessfullyHighlighted { retro }
            | RetroEvent::ExtendTimerSuccessfullyDone { retro } => {
                self.store.replace_current_retro(retro);
            }
            RetroEvent::RetroSettingsSuccessfullyUpdated { retro } => {
                self.store.clear_errors();
                self.navigator.show_retro(&retro);
                self.store.replace_current_retro(retro);
            }
            RetroEvent::RequireRetroLogin { retro_id } => {
                self.navigator.retro_login(retro_id);
            }
            RetroEvent::RequireRetroRelogin { retro } => {
                self.navigator.retro_relogin(&retro);
            }
            RetroEvent::RedirectToRetroCreatePage => self.navigator.new_retro(),
            RetroEvent::RedirectToHome => self.navigator.home(),
            RetroEvent::RetroSuccessfullyLoggedIn { retro_id } => {
                self.navigator.show_retro_for_id(retro_id);
            }
            RetroEvent::RetroItemSuccessfullyCreated { retro_id, item } => {
                self.analytics.created_retro_item(retro_id, item.category);
                self.store.upsert_item(item);
            }
            RetroEvent::RetroItemSuccessfullyDeleted { item } => {
                self.store.delete_item(&item);
            }
            RetroEvent::RetroItemSuccessfullyVoted { item } => {
                self.store.upsert_item(item);
            }
            RetroEvent::RetroItemSuccessfullyDone { item_id } => {
                self.store.set_item_done(item_id, true);
            }
            RetroEvent::RetroItemSuccessfullyUndone { item } => {
                self.store.set_item_done(item.id, false);
            }
            RetroEvent::RetroItemSuccessfullyUnhighlighted => self.store.clear_highlight(),
            RetroEvent::ToggleSendArchiveEmail {
                current_send_archive_email,
            } => {
                self.store
                    .set_send_archive_email(!current_send_archive_email);
            }
            RetroEvent::ArchiveRetroSuccessfullyDone { retro } => {
                self.analytics.archived_retro(retro.id);
                self.store.replace_current_retro(retro);
                self.emitter.emit(RetroEvent::ShowAlert {
                    message: "Archived!".to_string(),
                });
            }
            RetroEvent::WebsocketRetroDataReceived {
                retro,
                command,
                payload,
            } => self.handle_board_push(retro, command, payload),
            RetroEvent::WebsocketSessionDataReceived { payload } => {
                if let Some(session) = payload {
                    self.store.set_websocket_session(session);
                }
            }
            RetroEvent::DoneRetroActionItemSuccessfullyToggled {
                retro_id,
                action_item,
            } => {
                // The returned state is authoritative: the analytic follows
                // the payload's done flag, not the request's intent.
                if let Some(retro_id) = retro_id {
                    if action_item.done {
                        self.analytics.done_action_item(retro_id);
                    } else {
                        self.analytics.undone_action_item(retro_id);
                    }
                }
                self.store.upsert_action_item(action_item);
            }
            RetroEvent::RetroActionItemSuccessfullyDeleted { action_item } => {
                self.store.delete_action_item(&action_item);
            }
            RetroEvent::RetroActionItemSuccessfullyEdited { action_item } => {
                self.store.upsert_action_item(action_item);
            }
            RetroEvent::RetroArchiveSuccessfullyFetched { retro } => {
                self.store.set_archived_retro(retro);
            }
            RetroEvent::RetroArchivesSuccessfullyFetched { archives } => {
                self.store.set_retro_archives(archives);
            }
            RetroEvent::RouteToRetroArchives { retro_id } => {
                self.navigator.retro_archives(retro_id);
            }
            RetroEvent::RouteToRetroArchive {
                retro_id,
                archive_id,
            } => {
                self.navigator.retro_archive(retro_id, archive_id);
            }
            RetroEvent::BackPressedFromArchives { retro_id } => {
                self.navigator.show_retro_for_id(retro_id);
            }
            RetroEvent::BackPressedFromPasswordSettings { retro_id } => {
                self.navigator.retro_settings(retro_id);
            }
            RetroEvent::ShowAlert { message } => {
                self.store.show_alert(message);
                self.alert_timer.arm(self.emitter.clone());
            }
            RetroEvent::AlertExpired { generation } => {
                if self.alert_timer.is_current(generation) {
                    self.store.clear_alert();
                    self.alert_timer.acknowledge_expiry();
                } else {
                    debug!("dispatch: discarding stale alert expiry");
                }
            }
            RetroEvent::HideAlert => {
                self.alert_timer.cancel();
                self.store.clear_alert();
            }
            RetroEvent::ShowDialog { title, message } => {
                self.store.show_dialog(title, message);
            }
            RetroEvent::HideDialog => self.store.clear_dialog(),
            RetroEvent::RetroNotFound => {
                self.store.set_not_found_flag(NotFoundFlag::RetroNotFound, true);
            }
            RetroEvent::ResetRetroNotFound => {
                self.store
                    .set_not_found_flag(NotFoundFlag::RetroNotFound, false);
            }
            RetroEvent::NotFound => {
                self.store.set_not_found_flag(NotFoundFlag::NotFound, true);
            }
            RetroEvent::ResetNotFound => {
                self.store.set_not_found_flag(NotFoundFlag::NotFound, false);
            }
            RetroEvent::ApiServerNotFound => {
                self.store
                    .set_not_found_flag(NotFoundFlag::ApiServerNotFound, true);
            }
            RetroEvent::ResetApiServerNotFound => {
                self.store
                    .set_not_found_flag(NotFoundFlag::ApiServerNotFound, false);
            }
            RetroEvent::SignOut => {
                if let Err(err) = self.tokens.clear_all().await {
                    warn!("dispatch: failed to clear persisted auth tokens on sign-out: {err:#}");
                }
                self.navigator.home();
            }
            RetroEvent::RouteToRetroPasswordSettings { retro_id } => {
                self.navigator.retro_password_settings(retro_id);
            }
            RetroEvent::RetroPasswordSuccessfullyUpdated { retro_id, token } => {
                if let Err(err) = self.tokens.set_token(retro_id, &token).await {
                    warn!(
                        retro_id = retro_id.0,
                        "dispatch: failed to persist rotated auth token: {err:#}"
                    );
                }
                self.store.clear_errors();
            }
            RetroEvent::ClearErrors => self.store.clear_errors(),
            RetroEvent::RedirectToRegistration {
                access_token,
                email,
                name,
            } => {
                self.navigator.registration(&access_token, &email, &name);
            }
            RetroEvent::SetConfig(flags) => self.store.set_feature_flags(flags),
            RetroEvent::Unknown => debug!("dispatch: ignoring unrecognized event"),
        }
    }

    /// A pushed board-data frame either carries the whole retro or a
    /// command. `force_relogin` goes through the self-origination check so a
    /// client never re-prompts in response to the echo of its own action.
    fn handle_board_push(
        &mut self,
        retro: Option<Retro>,
        command: Option<PushCommand>,
        payload: Option<ForceReloginPayload>,
    ) {
        match command {
            Some(PushCommand::ForceRelogin) => {
                let payload = payload.unwrap_or_default();
                if self.originated_locally(payload.originator_id.as_deref()) {
                    debug!("dispatch: ignoring force_relogin echo of our own action");
                    return;
                }
                match payload.retro {
                    Some(retro) => self.navigator.retro_relogin(&retro),
                    None => warn!("dispatch: force_relogin push carried no retro, dropping"),
                }
            }
            Some(PushCommand::Unknown) => {
                debug!("dispatch: ignoring unrecognized push command");
            }
            None => {
                if let Some(retro) = retro {
                    self.store.replace_current_retro(retro);
                }
            }
        }
    }

    /// True only when the push's originator matches the recorded session.
    /// No recorded session, or no originator on the push, counts as foreign.
    fn originated_locally(&self, originator_id: Option<&str>) -> bool {
        match (self.store.websocket_session(), originator_id) {
            (Some(session), Some(originator)) => session.request_uuid == originator,
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
