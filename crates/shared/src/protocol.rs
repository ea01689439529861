use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    ActionItem, ArchiveId, ArchiveSummary, Item, ItemId, Retro, RetroId, WebsocketSession,
};

/// Command attached to a pushed board-data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushCommand {
    ForceRelogin,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceReloginPayload {
    #[serde(default)]
    pub originator_id: Option<String>,
    #[serde(default)]
    pub retro: Option<Retro>,
}

/// First frame sent on a freshly opened retro channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeFrame {
    pub retro_id: RetroId,
    pub request_uuid: String,
}

/// Every inbound event the dispatcher routes: terminal results of the
/// client's own REST actions, server pushes, UI intents, and the internal
/// alert-expiry tick. Wire frames use the `{"type": ..., "data": {...}}`
/// envelope; names the client does not know collapse into [`Unknown`]
/// so newer server payloads stay a silent no-op.
///
/// [`Unknown`]: RetroEvent::Unknown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RetroEvent {
    RetroSuccessfullyCreated {
        retro: Retro,
    },
    RetroUnsuccessfullyCreated {
        #[serde(default)]
        errors: Vec<String>,
    },
    RetroSuccessfullyFetched {
        retro: Retro,
    },
    GetRetroSettingsSuccessfullyReceived {
        retro: Retro,
    },
    GetRetroLoginSuccessfullyReceived {
        retro: Retro,
    },
    RetroSettingsSuccessfullyUpdated {
        retro: Retro,
    },
    RetroSettingsUnsuccessfullyUpdated {
        #[serde(default)]
        errors: Vec<String>,
    },
    RequireRetroLogin {
        retro_id: RetroId,
    },
    RequireRetroRelogin {
        retro: Retro,
    },
    RedirectToRetroCreatePage,
    RedirectToHome,
    RetroSuccessfullyLoggedIn {
        retro_id: RetroId,
    },
    RetroItemSuccessfullyCreated {
        retro_id: RetroId,
        item: Item,
    },
    RetroItemSuccessfullyDeleted {
        item: Item,
    },
    RetroItemSuccessfullyVoted {
        item: Item,
    },
    RetroItemSuccessfullyDone {
        item_id: ItemId,
    },
    RetroItemSuccessfullyUndone {
        item: Item,
    },
    RetroItemSuccessfullyHighlighted {
        retro: Retro,
    },
    RetroItemSuccessfullyUnhighlighted,
    ToggleSendArchiveEmail {
        current_send_archive_email: bool,
    },
    ExtendTimerSuccessfullyDone {
        retro: Retro,
    },
    ArchiveRetroSuccessfullyDone {
        retro: Retro,
    },
    WebsocketRetroDataReceived {
        #[serde(default)]
        retro: Option<Retro>,
        #[serde(default)]
        command: Option<PushCommand>,
        #[serde(default)]
        payload: Option<ForceReloginPayload>,
    },
    WebsocketSessionDataReceived {
        #[serde(default)]
        payload: Option<WebsocketSession>,
    },
    DoneRetroActionItemSuccessfullyToggled {
        #[serde(default)]
        retro_id: Option<RetroId>,
        action_item: ActionItem,
    },
    RetroActionItemSuccessfullyDeleted {
        action_item: ActionItem,
    },
    RetroActionItemSuccessfullyEdited {
        action_item: ActionItem,
    },
    RetroArchiveSuccessfullyFetched {
        retro: Retro,
    },
    RetroArchivesSuccessfullyFetched {
        #[serde(default)]
        archives: Vec<ArchiveSummary>,
    },
    RouteToRetroArchives {
        retro_id: RetroId,
    },
    RouteToRetroArchive {
        retro_id: RetroId,
        archive_id: ArchiveId,
    },
    BackPressedFromArchives {
        retro_id: RetroId,
    },
    BackPressedFromPasswordSettings {
        retro_id: RetroId,
    },
    ShowAlert {
        message: String,
    },
    /// Internal tick posted by the alert timer. Carries the arming
    /// generation so a clear that was already queued when a newer alert
    /// replaced it cannot fire against the wrong message.
    AlertExpired {
        generation: u64,
    },
    HideAlert,
    ShowDialog {
        #[serde(default)]
        title: String,
        #[serde(default)]
        message: String,
    },
    HideDialog,
    RetroNotFound,
    ResetRetroNotFound,
    NotFound,
    ResetNotFound,
    ApiServerNotFound,
    ResetApiServerNotFound,
    SignOut,
    RouteToRetroPasswordSettings {
        retro_id: RetroId,
    },
    RetroPasswordSuccessfullyUpdated {
        retro_id: RetroId,
        token: String,
    },
    RetroPasswordUnsuccessfullyUpdated {
        #[serde(default)]
        errors: Vec<String>,
    },
    ClearErrors,
    RedirectToRegistration {
        access_token: String,
        email: String,
        name: String,
    },
    SetConfig(HashMap<String, bool>),
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
