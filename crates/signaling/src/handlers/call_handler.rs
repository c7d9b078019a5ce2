//! Anruf-Handler – Request, Accept, Reject, End, Join, Leave
//!
//! Treibt die Anruf-Zustandsmaschine des Raums und verteilt die
//! Zustandsuebergaenge. Die Anfrage geht an alle Mitglieder ausser dem
//! Initiator; Annahme, Ablehnung, Ende und Teilnehmer-Aenderungen gehen
//! an den ganzen Raum.

use stammtisch_calls::CallPhase;
use stammtisch_core::{ConnectionId, RoomCode};
use stammtisch_protocol::control::{
    CallAcceptedEvent, CallAcceptRequest, CallEndedEvent, CallEndRequest, CallIncomingEvent,
    CallJoinRequest, CallLeaveRequest, CallParticipantsEvent, CallPhaseInfo, CallRejectedEvent,
    CallRejectRequest, CallSetupRequest, ControlMessage, ControlPayload,
};
use stammtisch_rooms::{AnrufSchnappschuss, Mitglied};
use std::sync::Arc;

use crate::handlers::fehler_antwort;
use crate::server_state::RelayState;

/// Verarbeitet eine Anruf-Anfrage (`Leerlauf -> Klingelt`)
///
/// Der Initiator bekommt den Teilnehmer-Stand als direkte Antwort, alle
/// anderen Mitglieder den eingehenden Anruf als Broadcast.
pub fn handle_call_request(
    request: &CallSetupRequest,
    request_id: u32,
    verbindung: ConnectionId,
    name: &str,
    state: &Arc<RelayState>,
) -> ControlMessage {
    let code = RoomCode::new(&request.room_code);

    let schnappschuss = match state
        .raeume
        .anruf_anfragen(&code, name, request.participants.clone())
    {
        Ok(schnappschuss) => schnappschuss,
        Err(fehler) => {
            tracing::debug!(code = %code, name, fehler = %fehler, "Anruf-Anfrage abgewiesen");
            return fehler_antwort(request_id, &fehler);
        }
    };

    if let Ok(mitglieder) = state.raeume.mitglieder(&code) {
        state.broadcaster.an_mitglieder_ausser_senden(
            &mitglieder,
            &verbindung,
            ControlMessage::broadcast(ControlPayload::CallIncoming(CallIncomingEvent {
                room_code: code.to_string(),
                initiator: name.to_string(),
                participants: schnappschuss.teilnehmer.clone(),
            })),
        );
    }

    tracing::info!(code = %code, initiator = name, "Anruf angefragt");

    ControlMessage::new(
        request_id,
        ControlPayload::CallParticipants(CallParticipantsEvent {
            room_code: code.to_string(),
            phase: phase_zu_info(schnappschuss.phase),
            participants: schnappschuss.teilnehmer,
        }),
    )
}

/// Verarbeitet Anruf-Annahme (`Klingelt -> Verbunden` ab zwei Teilnehmern)
pub fn handle_call_accept(
    request: &CallAcceptRequest,
    request_id: u32,
    name: &str,
    state: &Arc<RelayState>,
) -> Option<ControlMessage> {
    let code = RoomCode::new(&request.room_code);

    match state.raeume.anruf_annehmen(&code, name) {
        Ok(schnappschuss) => {
            broadcast_an_raum(
                &code,
                ControlPayload::CallAccepted(CallAcceptedEvent {
                    room_code: code.to_string(),
                    accepter: name.to_string(),
                    phase: phase_zu_info(schnappschuss.phase),
                    participants: schnappschuss.teilnehmer,
                }),
                state,
            );
            None
        }
        Err(fehler) => Some(fehler_antwort(request_id, &fehler)),
    }
}

/// Verarbeitet Anruf-Ablehnung (in jeder Phase erlaubt)
pub fn handle_call_reject(
    request: &CallRejectRequest,
    request_id: u32,
    name: &str,
    state: &Arc<RelayState>,
) -> Option<ControlMessage> {
    let code = RoomCode::new(&request.room_code);

    match state.raeume.anruf_ablehnen(&code, name) {
        Ok(schnappschuss) => {
            broadcast_an_raum(
                &code,
                ControlPayload::CallRejected(CallRejectedEvent {
                    room_code: code.to_string(),
                    rejecter: name.to_string(),
                    phase: phase_zu_info(schnappschuss.phase),
                    participants: schnappschuss.teilnehmer,
                }),
                state,
            );
            None
        }
        Err(fehler) => Some(fehler_antwort(request_id, &fehler)),
    }
}

/// Verarbeitet Anruf-Ende (bedingungsloser Reset)
pub fn handle_call_end(
    request: &CallEndRequest,
    request_id: u32,
    name: &str,
    state: &Arc<RelayState>,
) -> Option<ControlMessage> {
    let code = RoomCode::new(&request.room_code);

    match state.raeume.anruf_beenden(&code) {
        Ok(()) => {
            broadcast_an_raum(
                &code,
                ControlPayload::CallEnded(CallEndedEvent {
                    room_code: code.to_string(),
                    ended_by: name.to_string(),
                }),
                state,
            );
            tracing::info!(code = %code, beendet_von = name, "Anruf beendet");
            None
        }
        Err(fehler) => Some(fehler_antwort(request_id, &fehler)),
    }
}

/// Verarbeitet Beitritt zu einem laufenden Anruf
pub fn handle_call_join(
    request: &CallJoinRequest,
    request_id: u32,
    name: &str,
    state: &Arc<RelayState>,
) -> Option<ControlMessage> {
    let code = RoomCode::new(&request.room_code);

    match state.raeume.anruf_beitreten(&code, name) {
        Ok(schnappschuss) => {
            teilnehmer_broadcast(&code, &schnappschuss, state);
            None
        }
        Err(fehler) => Some(fehler_antwort(request_id, &fehler)),
    }
}

/// Verarbeitet Verlassen eines laufenden Anrufs
pub fn handle_call_leave(
    request: &CallLeaveRequest,
    request_id: u32,
    name: &str,
    state: &Arc<RelayState>,
) -> Option<ControlMessage> {
    let code = RoomCode::new(&request.room_code);

    match state.raeume.anruf_verlassen(&code, name) {
        Ok(schnappschuss) => {
            if schnappschuss.phase == CallPhase::Leerlauf {
                // Letzter Teilnehmer weg – der Raum erfaehrt das Ende
                broadcast_an_raum(
                    &code,
                    ControlPayload::CallEnded(CallEndedEvent {
                        room_code: code.to_string(),
                        ended_by: name.to_string(),
                    }),
                    state,
                );
            } else {
                teilnehmer_broadcast(&code, &schnappschuss, state);
            }
            None
        }
        Err(fehler) => Some(fehler_antwort(request_id, &fehler)),
    }
}

/// Broadcast nach einer Anruf-Aenderung durch Raum-Verlassen/Disconnect
///
/// Wird vom Raum-Handler gerufen, der die Mitgliederliste bereits als
/// Schnappschuss hat (der Raum koennte inzwischen zerstoert sein).
pub(crate) fn anruf_aenderung_broadcast(
    code: &RoomCode,
    name: &str,
    schnappschuss: &AnrufSchnappschuss,
    mitglieder: &[Mitglied],
    state: &Arc<RelayState>,
) {
    let payload = if schnappschuss.phase == CallPhase::Leerlauf {
        ControlPayload::CallEnded(CallEndedEvent {
            room_code: code.to_string(),
            ended_by: name.to_string(),
        })
    } else {
        ControlPayload::CallParticipants(CallParticipantsEvent {
            room_code: code.to_string(),
            phase: phase_zu_info(schnappschuss.phase),
            participants: schnappschuss.teilnehmer.clone(),
        })
    };
    state
        .broadcaster
        .an_mitglieder_senden(mitglieder, ControlMessage::broadcast(payload));
}

// ---------------------------------------------------------------------------
// Interne Hilfsfunktionen
// ---------------------------------------------------------------------------

fn teilnehmer_broadcast(code: &RoomCode, schnappschuss: &AnrufSchnappschuss, state: &Arc<RelayState>) {
    broadcast_an_raum(
        code,
        ControlPayload::CallParticipants(CallParticipantsEvent {
            room_code: code.to_string(),
            phase: phase_zu_info(schnappschuss.phase),
            participants: schnappschuss.teilnehmer.clone(),
        }),
        state,
    );
}

fn broadcast_an_raum(code: &RoomCode, payload: ControlPayload, state: &Arc<RelayState>) {
    if let Ok(mitglieder) = state.raeume.mitglieder(code) {
        state
            .broadcaster
            .an_mitglieder_senden(&mitglieder, ControlMessage::broadcast(payload));
    }
}

/// Konvertiert die Domaenen-Phase in den Wire-Typ
pub(crate) fn phase_zu_info(phase: CallPhase) -> CallPhaseInfo {
    match phase {
        CallPhase::Leerlauf => CallPhaseInfo::Idle,
        CallPhase::Klingelt => CallPhaseInfo::Ringing,
        CallPhase::Verbunden => CallPhaseInfo::Connected,
    }
}
