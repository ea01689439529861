//! Canonical client-side view of the current retro plus transient UI state.
//! The named update operations below are the only mutation surface; the
//! dispatch loop is the single writer.

use std::collections::HashMap;

use shared::domain::{ActionItem, ArchiveSummary, Item, ItemId, Retro, WebsocketSession};

/// Independent not-found conditions. There is no combined state machine;
/// each flag is set and cleared on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundFlag {
    RetroNotFound,
    NotFound,
    ApiServerNotFound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotFoundFlags {
    pub retro_not_found: bool,
    pub not_found: bool,
    pub api_server_not_found: bool,
}

/// Singleton alert slot. Showing always replaces prior content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
}

/// Singleton dialog slot. Explicitly shown and cleared, no timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct RetroStore {
    current_retro: Retro,
    archived_retro: Option<Retro>,
    retro_archives: Vec<ArchiveSummary>,
    websocket_session: Option<WebsocketSession>,
    errors: Vec<String>,
    alert: Option<Alert>,
    dialog: Option<Dialog>,
    not_found: NotFoundFlags,
    feature_flags: HashMap<String, bool>,
}

impl RetroStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_retro(&self) -> &Retro {
        &self.current_retro
    }

    pub fn archived_retro(&self) -> Option<&Retro> {
        self.archived_retro.as_ref()
    }

    pub fn retro_archives(&self) -> &[ArchiveSummary] {
        &self.retro_archives
    }

    pub fn websocket_session(&self) -> Option<&WebsocketSession> {
        self.websocket_session.as_ref()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn not_found(&self) -> NotFoundFlags {
        self.not_found
    }

    pub fn feature_flags(&self) -> &HashMap<String, bool> {
        &self.feature_flags
    }

    pub fn replace_current_retro(&mut self, retro: Retro) {
        self.current_retro = retro;
    }

    /// Replaces in place, preserving arrival order, when the id already
    /// exists; appends otherwise. Never creates a duplicate id.
    pub fn upsert_item(&mut self, item: Item) {
        match self
            .current_retro
            .items
            .iter_mut()
            .find(|existing| existing.id == item.id)
        {
            Some(slot) => *slot = item,
            None => self.current_retro.items.push(item),
        }
    }

    pub fn delete_item(&mut self, item: &Item) {
        self.current_retro
            .items
            .retain(|existing| existing.id != item.id);
    }

    /// Narrow done flip without a full item payload. Unknown ids are a no-op.
    pub fn set_item_done(&mut self, item_id: ItemId, done: bool) {
        if let Some(item) = self
            .current_retro
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
        {
            item.done = done;
        }
    }

    pub fn upsert_action_item(&mut self, action_item: ActionItem) {
        match self
            .current_retro
            .action_items
            .iter_mut()
            .find(|existing| existing.id == action_item.id)
        {
            Some(slot) => *slot = action_item,
            None => self.current_retro.action_items.push(action_item),
        }
    }

    pub fn delete_action_item(&mut self, action_item: &ActionItem) {
        self.current_retro
            .action_items
            .retain(|existing| existing.id != action_item.id);
    }

    pub fn clear_highlight(&mut self) {
        self.current_retro.highlighted_item_id = None;
    }

    pub fn set_send_archive_email(&mut self, value: bool) {
        self.current_retro.send_archive_email = value;
    }

    pub fn set_errors(&mut self, errors: Vec<String>) {
        self.errors = errors;
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn set_not_found_flag(&mut self, flag: NotFoundFlag, value: bool) {
        match flag {
            NotFoundFlag::RetroNotFound => self.not_found.retro_not_found = value,
            NotFoundFlag::NotFound => self.not_found.not_found = value,
            NotFoundFlag::ApiServerNotFound => self.not_found.api_server_not_found = value,
        }
    }

    /// Wholesale replace on receipt of configuration.
    pub fn set_feature_flags(&mut self, flags: HashMap<String, bool>) {
        self.feature_flags = flags;
    }

    pub fn set_websocket_session(&mut self, session: WebsocketSession) {
        self.websocket_session = Some(session);
    }

    pub fn show_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(Alert {
            message: message.into(),
        });
    }

    pub fn clear_alert(&mut self) {
        self.alert = None;
    }

    pub fn show_dialog(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.dialog = Some(Dialog {
            title: title.into(),
            message: message.into(),
        });
    }

    pub fn clear_dialog(&mut self) {
        self.dialog = None;
    }

    pub fn set_archived_retro(&mut self, retro: Retro) {
        self.archived_retro = Some(retro);
    }

    pub fn set_retro_archives(&mut self, archives: Vec<ArchiveSummary>) {
        self.retro_archives = archives;
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
