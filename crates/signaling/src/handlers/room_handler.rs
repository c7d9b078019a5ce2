//! Raum-Handler – Erstellen, Beitreten, Verlassen, Hintergrund
//!
//! Direkte Antworten gehen nur an den Aufrufer (mit seiner request_id);
//! alles was den Raum betrifft laeuft als Broadcast mit request_id 0.
//! Der Hintergrund ist die eine Mutation die an den ganzen Raum
//! inklusive Absender geht.

use stammtisch_core::{ConnectionId, RoomCode};
use stammtisch_protocol::control::{
    BackgroundChangedEvent, BackgroundSetRequest, ControlMessage, ControlPayload, MemberInfo,
    RoomCreateResponse, RoomJoinRequest, RoomJoinResponse, RoomLeaveResponse, RoomUsersEvent,
    SystemNoticeEvent,
};
use stammtisch_rooms::Mitglied;
use std::sync::Arc;

use crate::handlers::{call_handler, chat_handler, fehler_antwort};
use crate::server_state::RelayState;

/// Verarbeitet Raum-Erstellung
///
/// Haengt die Verbindung an einem vorherigen Raum, verlaesst sie ihn
/// zuerst (eine Verbindung hat hoechstens eine Raum-Mitgliedschaft).
pub fn handle_room_create(
    request_id: u32,
    verbindung: ConnectionId,
    name: &str,
    state: &Arc<RelayState>,
) -> ControlMessage {
    raum_verlassen_verarbeiten(verbindung, state);

    let code = state.raeume.raum_erstellen(verbindung, name);

    // System-Beitrittsnachricht an den neuen Raum (Publikum: nur der Ersteller)
    match state.raeume.mitglieder(&code) {
        Ok(mitglieder) => {
            beitritts_broadcasts(&code, name, &mitglieder, state);
        }
        Err(fehler) => {
            tracing::error!(code = %code, fehler = %fehler, "Frisch erstellter Raum nicht auffindbar");
        }
    }

    ControlMessage::new(
        request_id,
        ControlPayload::RoomCreateResponse(RoomCreateResponse {
            room_code: code.to_string(),
        }),
    )
}

/// Verarbeitet Raum-Beitritt
///
/// Der Beitretende erhaelt Verlauf + Hintergrund als direkte Antwort;
/// der ganze Raum (inklusive Beitretendem) erhaelt Mitgliederliste und
/// System-Beitrittsnachricht als Broadcast.
pub fn handle_room_join(
    request: &RoomJoinRequest,
    request_id: u32,
    verbindung: ConnectionId,
    name: &str,
    state: &Arc<RelayState>,
) -> ControlMessage {
    let code = RoomCode::new(&request.room_code);

    // Erst den alten Raum verlassen – aber nur wenn der neue existiert,
    // sonst wuerde ein Tippfehler im Code den Nutzer aus seinem Raum werfen
    if !state.raeume.existiert(&code) {
        return ControlMessage::error(
            request_id,
            stammtisch_protocol::control::ErrorCode::RoomNotFound,
            format!("Kein Raum unter dem Code {}", code),
        );
    }
    if state.raeume.raum_von(&verbindung).as_ref() != Some(&code) {
        raum_verlassen_verarbeiten(verbindung, state);
    }

    let info = match state.raeume.raum_beitreten(&code, verbindung, name) {
        Ok(info) => info,
        Err(fehler) => {
            tracing::debug!(code = %code, name, fehler = %fehler, "Raum-Beitritt fehlgeschlagen");
            return fehler_antwort(request_id, &fehler);
        }
    };

    beitritts_broadcasts(&code, name, &info.mitglieder, state);

    ControlMessage::new(
        request_id,
        ControlPayload::RoomJoinResponse(RoomJoinResponse {
            room_code: code.to_string(),
            members: mitglieder_zu_infos(&info.mitglieder),
            messages: info
                .nachrichten
                .iter()
                .map(chat_handler::nachricht_zu_info)
                .collect(),
            background: info.hintergrund,
        }),
    )
}

/// Verarbeitet explizites Verlassen
pub fn handle_room_leave(
    request_id: u32,
    verbindung: ConnectionId,
    state: &Arc<RelayState>,
) -> ControlMessage {
    let war_in_raum = raum_verlassen_verarbeiten(verbindung, state);
    ControlMessage::new(
        request_id,
        ControlPayload::RoomLeaveResponse(RoomLeaveResponse {
            success: war_in_raum,
        }),
    )
}

/// Verarbeitet Hintergrund-Aenderung
///
/// Broadcast geht an den ganzen Raum inklusive Absender; eine separate
/// direkte Antwort gibt es deshalb nur im Fehlerfall.
pub fn handle_background_set(
    request: &BackgroundSetRequest,
    request_id: u32,
    state: &Arc<RelayState>,
) -> Option<ControlMessage> {
    let code = RoomCode::new(&request.room_code);

    if let Err(fehler) = state.raeume.hintergrund_setzen(&code, &request.background) {
        return Some(fehler_antwort(request_id, &fehler));
    }

    if let Ok(mitglieder) = state.raeume.mitglieder(&code) {
        state.broadcaster.an_mitglieder_senden(
            &mitglieder,
            ControlMessage::broadcast(ControlPayload::BackgroundChanged(BackgroundChangedEvent {
                room_code: code.to_string(),
                background: request.background.clone(),
            })),
        );
    }

    None
}

/// Verlaesst den aktuellen Raum der Verbindung und sendet alle Broadcasts
///
/// Gemeinsamer Pfad fuer explizites Verlassen, Raumwechsel und
/// Disconnect-Cleanup. Gibt `true` zurueck wenn die Verbindung in einem
/// Raum war.
pub fn raum_verlassen_verarbeiten(verbindung: ConnectionId, state: &Arc<RelayState>) -> bool {
    let Some(info) = state.raeume.raum_verlassen(&verbindung) else {
        return false;
    };

    if info.raum_geloescht {
        // Niemand mehr da, den es zu informieren gaebe
        return true;
    }

    let code = info.code.to_string();
    state.broadcaster.an_mitglieder_senden(
        &info.mitglieder,
        ControlMessage::broadcast(ControlPayload::RoomUsers(RoomUsersEvent {
            room_code: code.clone(),
            members: mitglieder_zu_infos(&info.mitglieder),
        })),
    );
    state.broadcaster.an_mitglieder_senden(
        &info.mitglieder,
        ControlMessage::broadcast(ControlPayload::SystemNotice(SystemNoticeEvent {
            room_code: code,
            text: format!("{} hat den Raum verlassen", info.name),
        })),
    );

    // Nahm der Gegangene an einem Anruf teil, erfahren die Verbliebenen
    // den neuen Anruf-Zustand
    if let Some(anruf) = info.anruf {
        call_handler::anruf_aenderung_broadcast(&info.code, &info.name, &anruf, &info.mitglieder, state);
    }

    true
}

/// Broadcasts nach einem Beitritt (Mitgliederliste + Systemnachricht)
fn beitritts_broadcasts(
    code: &RoomCode,
    name: &str,
    mitglieder: &[Mitglied],
    state: &Arc<RelayState>,
) {
    state.broadcaster.an_mitglieder_senden(
        mitglieder,
        ControlMessage::broadcast(ControlPayload::RoomUsers(RoomUsersEvent {
            room_code: code.to_string(),
            members: mitglieder_zu_infos(mitglieder),
        })),
    );
    state.broadcaster.an_mitglieder_senden(
        mitglieder,
        ControlMessage::broadcast(ControlPayload::SystemNotice(SystemNoticeEvent {
            room_code: code.to_string(),
            text: format!("{} ist dem Raum beigetreten", name),
        })),
    );
}

/// Konvertiert Store-Mitglieder in den Wire-Typ
pub(crate) fn mitglieder_zu_infos(mitglieder: &[Mitglied]) -> Vec<MemberInfo> {
    mitglieder
        .iter()
        .map(|m| MemberInfo {
            connection_id: m.verbindung,
            display_name: m.name.clone(),
        })
        .collect()
}
