//! Chat-Handler – Senden, Editieren, Loeschen, Liken, Tippen
//!
//! Validiert Chat-Events gegen den RoomStore und verteilt sie an die
//! Raum-Mitglieder. Der Ausloeser bekommt die gespeicherte Nachricht als
//! direkte Antwort, der Rest des Raums den Broadcast.

use stammtisch_core::{ConnectionId, RoomCode};
use stammtisch_protocol::control::{
    AttachmentInfo, AudioInfo, ChatDeletedEvent, ChatDeleteRequest, ChatEditedEvent,
    ChatEditRequest, ChatLikedEvent, ChatLikeRequest, ChatMessageEvent, ChatSendRequest,
    ChatSendResponse, ControlMessage, ControlPayload, MessageInfo, TypingEvent, TypingRequest,
};
use stammtisch_rooms::{Anhang, AudioClip, NeueNachricht, RaumNachricht};
use std::sync::Arc;

use crate::handlers::fehler_antwort;
use crate::server_state::RelayState;

/// Verarbeitet eine Chat-Nachricht
pub fn handle_chat_send(
    request: ChatSendRequest,
    request_id: u32,
    verbindung: ConnectionId,
    name: &str,
    state: &Arc<RelayState>,
) -> ControlMessage {
    let code = RoomCode::new(&request.room_code);

    let eingang = NeueNachricht {
        absender: name.to_string(),
        text: request.text,
        anhang: request.attachment.map(anhang_aus_info),
        audio: request.audio.map(audio_aus_info),
    };

    let nachricht = match state.raeume.nachricht_anhaengen(&code, eingang) {
        Ok(nachricht) => nachricht,
        Err(fehler) => {
            tracing::debug!(code = %code, name, fehler = %fehler, "Chat-Nachricht abgewiesen");
            return fehler_antwort(request_id, &fehler);
        }
    };

    let info = nachricht_zu_info(&nachricht);
    broadcast_ausser(
        &code,
        &verbindung,
        ControlPayload::ChatMessage(ChatMessageEvent {
            room_code: code.to_string(),
            message: info.clone(),
        }),
        state,
    );

    tracing::debug!(
        code = %code,
        nachricht_id = nachricht.id,
        absender = name,
        "Chat-Nachricht gesendet"
    );

    ControlMessage::new(
        request_id,
        ControlPayload::ChatSendResponse(ChatSendResponse {
            room_code: code.to_string(),
            message: info,
        }),
    )
}

/// Verarbeitet Nachricht editieren
pub fn handle_chat_edit(
    request: &ChatEditRequest,
    request_id: u32,
    verbindung: ConnectionId,
    state: &Arc<RelayState>,
) -> ControlMessage {
    let code = RoomCode::new(&request.room_code);

    match state
        .raeume
        .nachricht_editieren(&code, request.message_id, &request.text)
    {
        Ok(nachricht) => {
            let event = ChatEditedEvent {
                room_code: code.to_string(),
                message: nachricht_zu_info(&nachricht),
            };
            broadcast_ausser(
                &code,
                &verbindung,
                ControlPayload::ChatEdited(event.clone()),
                state,
            );
            ControlMessage::new(request_id, ControlPayload::ChatEdited(event))
        }
        Err(fehler) => fehler_antwort(request_id, &fehler),
    }
}

/// Verarbeitet Nachricht loeschen
pub fn handle_chat_delete(
    request: &ChatDeleteRequest,
    request_id: u32,
    verbindung: ConnectionId,
    state: &Arc<RelayState>,
) -> ControlMessage {
    let code = RoomCode::new(&request.room_code);

    match state.raeume.nachricht_loeschen(&code, request.message_id) {
        Ok(notiz) => {
            let event = ChatDeletedEvent {
                room_code: code.to_string(),
                message_id: notiz.nachricht_id,
                sender: notiz.absender,
            };
            broadcast_ausser(
                &code,
                &verbindung,
                ControlPayload::ChatDeleted(event.clone()),
                state,
            );
            ControlMessage::new(request_id, ControlPayload::ChatDeleted(event))
        }
        Err(fehler) => fehler_antwort(request_id, &fehler),
    }
}

/// Verarbeitet Like umschalten
pub fn handle_chat_like(
    request: &ChatLikeRequest,
    request_id: u32,
    verbindung: ConnectionId,
    name: &str,
    state: &Arc<RelayState>,
) -> ControlMessage {
    let code = RoomCode::new(&request.room_code);

    match state.raeume.like_umschalten(&code, request.message_id, name) {
        Ok(likes) => {
            let event = ChatLikedEvent {
                room_code: code.to_string(),
                message_id: request.message_id,
                likes,
            };
            broadcast_ausser(
                &code,
                &verbindung,
                ControlPayload::ChatLiked(event.clone()),
                state,
            );
            ControlMessage::new(request_id, ControlPayload::ChatLiked(event))
        }
        Err(fehler) => fehler_antwort(request_id, &fehler),
    }
}

/// Verarbeitet Tipp-Indikator (fluechtig, keine direkte Antwort)
pub fn handle_typing(
    request: &TypingRequest,
    verbindung: ConnectionId,
    name: &str,
    state: &Arc<RelayState>,
) {
    let code = RoomCode::new(&request.room_code);
    broadcast_ausser(
        &code,
        &verbindung,
        ControlPayload::TypingNotice(TypingEvent {
            room_code: code.to_string(),
            display_name: name.to_string(),
            is_typing: request.is_typing,
        }),
        state,
    );
}

// ---------------------------------------------------------------------------
// Konvertierung Wire <-> Domaene
// ---------------------------------------------------------------------------

/// Konvertiert eine gespeicherte Nachricht in den Wire-Typ
pub(crate) fn nachricht_zu_info(nachricht: &RaumNachricht) -> MessageInfo {
    MessageInfo {
        message_id: nachricht.id,
        sender: nachricht.absender.clone(),
        text: nachricht.text.clone(),
        attachment: nachricht.anhang.as_ref().map(|a| AttachmentInfo {
            file_name: a.dateiname.clone(),
            mime_type: a.mime_typ.clone(),
            data: a.daten.clone(),
        }),
        audio: nachricht.audio.as_ref().map(|a| AudioInfo {
            data: a.daten.clone(),
            duration_ms: a.dauer_ms,
        }),
        likes: nachricht.likes.clone(),
        edited: nachricht.bearbeitet,
        edited_at: nachricht.bearbeitet_am.map(|t| t.to_rfc3339()),
        created_at: nachricht.erstellt_am.to_rfc3339(),
    }
}

fn anhang_aus_info(info: AttachmentInfo) -> Anhang {
    Anhang {
        dateiname: info.file_name,
        mime_typ: info.mime_type,
        daten: info.data,
    }
}

fn audio_aus_info(info: AudioInfo) -> AudioClip {
    AudioClip {
        daten: info.data,
        dauer_ms: info.duration_ms,
    }
}

/// Broadcast an alle Raum-Mitglieder ausser dem Ausloeser
fn broadcast_ausser(
    code: &RoomCode,
    ausgeschlossen: &ConnectionId,
    payload: ControlPayload,
    state: &Arc<RelayState>,
) {
    if let Ok(mitglieder) = state.raeume.mitglieder(code) {
        state.broadcaster.an_mitglieder_ausser_senden(
            &mitglieder,
            ausgeschlossen,
            ControlMessage::broadcast(payload),
        );
    }
}
