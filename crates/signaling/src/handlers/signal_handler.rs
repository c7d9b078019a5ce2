//! Signal-Handler – Punkt-zu-Punkt-Weiterleitung von Offer/Answer/Candidate
//!
//! Zustandslose Weiterleitung an genau eine Ziel-Verbindung, am
//! Raum-Broadcast vorbei. Das Ziel wird direkt ueber die Verbindungs-ID
//! adressiert oder ueber den Anzeigenamen per Registry aufgeloest.
//! Unzustellbare Payloads werden stillschweigend verworfen – sie sind nur
//! fuer einen lebenden, gerade verhandelnden Peer von Wert; kein Retry,
//! keine Queue, keine Fehler-Antwort.

use stammtisch_core::ConnectionId;
use stammtisch_protocol::control::{
    ControlMessage, ControlPayload, SignalDeliveryEvent, SignalRequest,
};
use std::sync::Arc;

use crate::server_state::RelayState;

/// Leitet einen Verbindungsaufbau-Payload an das Ziel weiter
pub fn handle_signal(
    request: SignalRequest,
    verbindung: ConnectionId,
    name: &str,
    state: &Arc<RelayState>,
) {
    let ziel = match ziel_aufloesen(&request, state) {
        Some(ziel) => ziel,
        None => {
            tracing::debug!(
                von = %verbindung,
                kind = ?request.kind,
                "Signal-Ziel nicht aufloesbar – verworfen"
            );
            return;
        }
    };

    let zugestellt = state.broadcaster.an_verbindung_senden(
        &ziel,
        ControlMessage::broadcast(ControlPayload::SignalDelivery(SignalDeliveryEvent {
            sender_connection_id: verbindung,
            sender_name: name.to_string(),
            kind: request.kind,
            payload: request.payload,
        })),
    );

    if !zugestellt {
        tracing::debug!(
            von = %verbindung,
            ziel = %ziel,
            kind = ?request.kind,
            "Signal-Ziel nicht verbunden – verworfen"
        );
    }
}

/// Loest das Ziel auf: explizite Verbindungs-ID vor Namens-Aufloesung
fn ziel_aufloesen(request: &SignalRequest, state: &Arc<RelayState>) -> Option<ConnectionId> {
    if let Some(ziel) = request.target_connection_id {
        return Some(ziel);
    }
    let name = request.target_name.as_deref()?;
    state.registry.aufloesen(name)
}
