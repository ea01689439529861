use super::*;
use crate::domain::Category;

#[test]
fn decodes_enveloped_event_with_payload() {
    let frame = r#"{
        "type": "retro_item_successfully_created",
        "data": {
            "retro_id": 1,
            "item": {"id": 10, "description": "speak up more", "category": "happy"}
        }
    }"#;

    let event: RetroEvent = serde_json::from_str(frame).expect("decode");
    match event {
        RetroEvent::RetroItemSuccessfullyCreated { retro_id, item } => {
            assert_eq!(retro_id, RetroId(1));
            assert_eq!(item.id, ItemId(10));
            assert_eq!(item.category, Category::Happy);
            assert_eq!(item.vote_count, 0);
            assert!(!item.done);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn decodes_parameterless_event_without_data() {
    let event: RetroEvent = serde_json::from_str(r#"{"type": "hide_alert"}"#).expect("decode");
    assert_eq!(event, RetroEvent::HideAlert);
}

#[test]
fn unrecognized_event_name_collapses_to_unknown() {
    let frame = r#"{"type": "retro_telepathically_updated", "data": {"anything": true}}"#;
    let event: RetroEvent = serde_json::from_str(frame).expect("decode");
    assert_eq!(event, RetroEvent::Unknown);
}

#[test]
fn partial_retro_payload_is_tolerated() {
    let frame = r#"{
        "type": "get_retro_login_successfully_received",
        "data": {"retro": {"name": "The Retro Name"}}
    }"#;

    let event: RetroEvent = serde_json::from_str(frame).expect("decode");
    match event {
        RetroEvent::GetRetroLoginSuccessfullyReceived { retro } => {
            assert_eq!(retro.name, "The Retro Name");
            assert_eq!(retro.id, RetroId(0));
            assert!(retro.items.is_empty());
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn decodes_force_relogin_push() {
    let frame = r#"{
        "type": "websocket_retro_data_received",
        "data": {
            "command": "force_relogin",
            "payload": {
                "originator_id": "fake-request-uuid-2",
                "retro": {"slug": "retro-slug-1"}
            }
        }
    }"#;

    let event: RetroEvent = serde_json::from_str(frame).expect("decode");
    match event {
        RetroEvent::WebsocketRetroDataReceived {
            retro,
            command,
            payload,
        } => {
            assert!(retro.is_none());
            assert_eq!(command, Some(PushCommand::ForceRelogin));
            let payload = payload.expect("payload");
            assert_eq!(payload.originator_id.as_deref(), Some("fake-request-uuid-2"));
            assert_eq!(payload.retro.expect("retro").slug, "retro-slug-1");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn unrecognized_push_command_is_preserved_as_unknown() {
    let frame = r#"{
        "type": "websocket_retro_data_received",
        "data": {"command": "rotate_board", "payload": {}}
    }"#;

    let event: RetroEvent = serde_json::from_str(frame).expect("decode");
    match event {
        RetroEvent::WebsocketRetroDataReceived { command, .. } => {
            assert_eq!(command, Some(PushCommand::Unknown));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn set_config_carries_the_flat_flag_map() {
    let frame = r#"{"type": "set_config", "data": {"archive_emails": true}}"#;
    let event: RetroEvent = serde_json::from_str(frame).expect("decode");
    match event {
        RetroEvent::SetConfig(flags) => {
            assert_eq!(flags.get("archive_emails"), Some(&true));
            assert_eq!(flags.len(), 1);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn events_round_trip_through_the_envelope() {
    let event = RetroEvent::ShowAlert {
        message: "Archived!".into(),
    };
    let frame = serde_json::to_string(&event).expect("encode");
    assert!(frame.contains(r#""type":"show_alert""#));
    let decoded: RetroEvent = serde_json::from_str(&frame).expect("decode");
    assert_eq!(decoded, event);
}
