//! Message-Dispatcher – Routet ControlMessages an die richtigen Handler
//!
//! Der Dispatcher empfaengt ControlMessages von einer ClientConnection,
//! bestimmt den richtigen Handler und gibt die direkte Antwort zurueck.
//! Raum-Broadcasts verschicken die Handler selbst ueber den Broadcaster –
//! die beiden Zustellwege bleiben getrennt.
//!
//! ## Zustandspruefung
//! - `Register`, `Ping`/`Pong` sind immer erlaubt
//! - `RoomCreate`/`RoomJoin` tragen den Anzeigenamen im Payload und
//!   registrieren ihn mit (idempotent)
//! - Alles andere verlangt einen bereits registrierten Anzeigenamen
//!
//! Alle Handler sind reine In-Memory-Mutationen ohne I/O; der Dispatch
//! ist deshalb synchron und jedes Ereignis wirkt atomar auf seinen Raum.

use stammtisch_core::{ConnectionId, Result, StammtischError};
use stammtisch_protocol::control::{
    ControlMessage, ControlPayload, ErrorCode, RegisterResponse,
};
use std::sync::Arc;

use crate::handlers::{
    call_handler, chat_handler, fehler_antwort, room_handler, signal_handler,
};
use crate::server_state::RelayState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    /// Verbindungs-ID (bei Transport-Anbindung vergeben)
    pub verbindung: ConnectionId,
    /// Registrierter Anzeigename (None solange nicht registriert)
    pub name: Option<String>,
}

impl DispatcherContext {
    /// Erstellt einen frischen Kontext fuer eine neue Verbindung
    pub fn neu(verbindung: ConnectionId) -> Self {
        Self {
            verbindung,
            name: None,
        }
    }
}

/// Zentraler Message-Dispatcher
///
/// Routet eingehende ControlMessages an die entsprechenden Handler und
/// gibt die direkte Antwort-ControlMessage zurueck.
pub struct MessageDispatcher {
    state: Arc<RelayState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<RelayState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende ControlMessage und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine direkte Antwort gesendet werden soll
    /// (z.B. bei Typing-Events oder Signal-Weiterleitungen).
    pub fn dispatch(
        &self,
        message: ControlMessage,
        ctx: &mut DispatcherContext,
    ) -> Option<ControlMessage> {
        let request_id = message.request_id;

        match message.payload {
            // -------------------------------------------------------------------
            // Registrierung (immer erlaubt, idempotent)
            // -------------------------------------------------------------------
            ControlPayload::Register(req) => {
                match self.namen_registrieren(ctx, &req.display_name) {
                    Ok(name) => Some(ControlMessage::new(
                        request_id,
                        ControlPayload::RegisterResponse(RegisterResponse {
                            connection_id: ctx.verbindung,
                            display_name: name,
                        }),
                    )),
                    Err(fehler) => Some(fehler_antwort(request_id, &fehler)),
                }
            }

            // -------------------------------------------------------------------
            // Keepalive
            // -------------------------------------------------------------------
            ControlPayload::Ping(ping) => {
                let server_ts = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64;
                Some(ControlMessage::pong(request_id, ping.timestamp_ms, server_ts))
            }

            ControlPayload::Pong(_) => {
                // Pong-Antworten vom Client werden nur geloggt (RTT-Messung)
                tracing::trace!("Pong empfangen (RTT-Messung)");
                None
            }

            // -------------------------------------------------------------------
            // Raum erstellen/beitreten – tragen den Anzeigenamen im Payload
            // -------------------------------------------------------------------
            ControlPayload::RoomCreate(req) => {
                match self.namen_registrieren(ctx, &req.display_name) {
                    Ok(name) => Some(room_handler::handle_room_create(
                        request_id,
                        ctx.verbindung,
                        &name,
                        &self.state,
                    )),
                    Err(fehler) => Some(fehler_antwort(request_id, &fehler)),
                }
            }

            ControlPayload::RoomJoin(req) => {
                match self.namen_registrieren(ctx, &req.display_name) {
                    Ok(name) => Some(room_handler::handle_room_join(
                        &req,
                        request_id,
                        ctx.verbindung,
                        &name,
                        &self.state,
                    )),
                    Err(fehler) => Some(fehler_antwort(request_id, &fehler)),
                }
            }

            // -------------------------------------------------------------------
            // Registrierung erfordernde Nachrichten
            // -------------------------------------------------------------------
            payload => {
                let name = match &ctx.name {
                    Some(name) => name.clone(),
                    None => {
                        return Some(ControlMessage::error(
                            request_id,
                            ErrorCode::NotRegistered,
                            "Nicht registriert – zuerst einen Anzeigenamen setzen",
                        ));
                    }
                };

                self.dispatch_registriert(payload, request_id, ctx.verbindung, &name)
            }
        }
    }

    /// Routet Nachrichten die einen registrierten Anzeigenamen erfordern
    fn dispatch_registriert(
        &self,
        payload: ControlPayload,
        request_id: u32,
        verbindung: ConnectionId,
        name: &str,
    ) -> Option<ControlMessage> {
        match payload {
            // -------------------------------------------------------------------
            // Raum
            // -------------------------------------------------------------------
            ControlPayload::RoomLeave(_) => Some(room_handler::handle_room_leave(
                request_id,
                verbindung,
                &self.state,
            )),

            ControlPayload::BackgroundSet(req) => {
                room_handler::handle_background_set(&req, request_id, &self.state)
            }

            // -------------------------------------------------------------------
            // Chat
            // -------------------------------------------------------------------
            ControlPayload::ChatSend(req) => Some(chat_handler::handle_chat_send(
                req,
                request_id,
                verbindung,
                name,
                &self.state,
            )),

            ControlPayload::ChatEdit(req) => Some(chat_handler::handle_chat_edit(
                &req,
                request_id,
                verbindung,
                &self.state,
            )),

            ControlPayload::ChatDelete(req) => Some(chat_handler::handle_chat_delete(
                &req,
                request_id,
                verbindung,
                &self.state,
            )),

            ControlPayload::ChatLike(req) => Some(chat_handler::handle_chat_like(
                &req,
                request_id,
                verbindung,
                name,
                &self.state,
            )),

            ControlPayload::Typing(req) => {
                chat_handler::handle_typing(&req, verbindung, name, &self.state);
                None
            }

            // -------------------------------------------------------------------
            // Anruf
            // -------------------------------------------------------------------
            ControlPayload::CallRequest(req) => Some(call_handler::handle_call_request(
                &req,
                request_id,
                verbindung,
                name,
                &self.state,
            )),

            ControlPayload::CallAccept(req) => {
                call_handler::handle_call_accept(&req, request_id, name, &self.state)
            }

            ControlPayload::CallReject(req) => {
                call_handler::handle_call_reject(&req, request_id, name, &self.state)
            }

            ControlPayload::CallEnd(req) => {
                call_handler::handle_call_end(&req, request_id, name, &self.state)
            }

            ControlPayload::CallJoin(req) => {
                call_handler::handle_call_join(&req, request_id, name, &self.state)
            }

            ControlPayload::CallLeave(req) => {
                call_handler::handle_call_leave(&req, request_id, name, &self.state)
            }

            // -------------------------------------------------------------------
            // Signal-Weiterleitung (stiller Drop bei unbekanntem Ziel)
            // -------------------------------------------------------------------
            ControlPayload::Signal(req) => {
                signal_handler::handle_signal(req, verbindung, name, &self.state);
                None
            }

            // -------------------------------------------------------------------
            // Unbekannte / unerwartete Nachrichten
            // -------------------------------------------------------------------
            ControlPayload::RegisterResponse(_)
            | ControlPayload::RoomCreateResponse(_)
            | ControlPayload::RoomJoinResponse(_)
            | ControlPayload::RoomLeaveResponse(_)
            | ControlPayload::ChatSendResponse(_)
            | ControlPayload::RoomUsers(_)
            | ControlPayload::SystemNotice(_)
            | ControlPayload::ChatMessage(_)
            | ControlPayload::ChatEdited(_)
            | ControlPayload::ChatDeleted(_)
            | ControlPayload::ChatLiked(_)
            | ControlPayload::TypingNotice(_)
            | ControlPayload::BackgroundChanged(_)
            | ControlPayload::CallIncoming(_)
            | ControlPayload::CallAccepted(_)
            | ControlPayload::CallRejected(_)
            | ControlPayload::CallEnded(_)
            | ControlPayload::CallParticipants(_)
            | ControlPayload::SignalDelivery(_)
            | ControlPayload::Error(_) => {
                tracing::warn!(
                    request_id,
                    "Unerwartete Server->Client Nachricht vom Client empfangen"
                );
                Some(ControlMessage::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "Unerwartete Nachricht",
                ))
            }

            // Register/RoomCreate/RoomJoin/Ping/Pong werden oben bereits behandelt
            ControlPayload::Register(_)
            | ControlPayload::RoomCreate(_)
            | ControlPayload::RoomJoin(_)
            | ControlPayload::Ping(_)
            | ControlPayload::Pong(_) => None,
        }
    }

    /// Bereinigt alle Ressourcen einer Verbindung beim Trennen
    ///
    /// Reihenfolge: erst Raum verlassen (Broadcast an Verbliebene, ggf.
    /// Raum-Zerstoerung und Anruf-Austritt), dann Broadcaster- und
    /// Registry-Eintraege entfernen. Laeuft synchron bevor die
    /// Verbindungs-ID wiederverwendet werden koennte.
    pub fn verbindung_bereinigen(&self, ctx: &DispatcherContext) {
        room_handler::raum_verlassen_verarbeiten(ctx.verbindung, &self.state);
        self.state.broadcaster.verbindung_entfernen(&ctx.verbindung);
        self.state.registry.abmelden(&ctx.verbindung);

        tracing::debug!(verbindung = %ctx.verbindung, "Verbindungs-Ressourcen bereinigt");
    }

    /// Validiert und registriert einen Anzeigenamen fuer die Verbindung
    fn namen_registrieren(&self, ctx: &mut DispatcherContext, roh: &str) -> Result<String> {
        let name = roh.trim();
        if name.is_empty() {
            return Err(StammtischError::validierung(
                "Anzeigename darf nicht leer sein",
            ));
        }

        self.state.registry.registrieren(ctx.verbindung, name);
        ctx.name = Some(name.to_string());
        Ok(name.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use stammtisch_protocol::control::{
        CallAcceptRequest, CallSetupRequest, ChatSendRequest, RegisterRequest, RoomCreateRequest,
        RoomJoinRequest, SignalKind, SignalRequest, TypingRequest,
    };
    use tokio::sync::mpsc;

    /// Testclient: Kontext + Empfangs-Queue wie bei einer echten Verbindung
    struct TestClient {
        ctx: DispatcherContext,
        rx: mpsc::Receiver<ControlMessage>,
    }

    fn test_umgebung() -> (Arc<RelayState>, MessageDispatcher) {
        let state = crate::server_state::RelayState::neu(Default::default());
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));
        (state, dispatcher)
    }

    fn test_client(state: &Arc<RelayState>) -> TestClient {
        let verbindung = ConnectionId::new();
        let rx = state.broadcaster.verbindung_registrieren(verbindung);
        TestClient {
            ctx: DispatcherContext::neu(verbindung),
            rx,
        }
    }

    /// Leert die Empfangs-Queue und gibt alle Payloads zurueck
    fn empfangene(client: &mut TestClient) -> Vec<ControlPayload> {
        let mut payloads = Vec::new();
        while let Ok(msg) = client.rx.try_recv() {
            payloads.push(msg.payload);
        }
        payloads
    }

    fn raum_erstellen(
        dispatcher: &MessageDispatcher,
        client: &mut TestClient,
        name: &str,
    ) -> String {
        let antwort = dispatcher
            .dispatch(
                ControlMessage::new(
                    1,
                    ControlPayload::RoomCreate(RoomCreateRequest {
                        display_name: name.to_string(),
                    }),
                ),
                &mut client.ctx,
            )
            .expect("RoomCreate braucht eine direkte Antwort");
        match antwort.payload {
            ControlPayload::RoomCreateResponse(resp) => resp.room_code,
            andere => panic!("Erwartet RoomCreateResponse, bekam {:?}", andere),
        }
    }

    fn raum_beitreten(
        dispatcher: &MessageDispatcher,
        client: &mut TestClient,
        code: &str,
        name: &str,
    ) -> ControlMessage {
        dispatcher
            .dispatch(
                ControlMessage::new(
                    2,
                    ControlPayload::RoomJoin(RoomJoinRequest {
                        room_code: code.to_string(),
                        display_name: name.to_string(),
                    }),
                ),
                &mut client.ctx,
            )
            .expect("RoomJoin braucht eine direkte Antwort")
    }

    #[tokio::test]
    async fn szenario_erstellen_beitreten_senden_trennen() {
        let (state, dispatcher) = test_umgebung();
        let mut anna = test_client(&state);
        let mut ben = test_client(&state);

        // Anna erstellt einen Raum und erhaelt den Code als direkte Antwort
        let code = raum_erstellen(&dispatcher, &mut anna, "anna");
        assert_eq!(code.len(), 6);

        // Ben tritt bei – beide bekommen die Mitgliederliste mit beiden Namen
        let antwort = raum_beitreten(&dispatcher, &mut ben, &code, "ben");
        match antwort.payload {
            ControlPayload::RoomJoinResponse(resp) => {
                let namen: Vec<&str> =
                    resp.members.iter().map(|m| m.display_name.as_str()).collect();
                assert_eq!(namen, vec!["anna", "ben"]);
                assert!(resp.messages.is_empty());
            }
            andere => panic!("Erwartet RoomJoinResponse, bekam {:?}", andere),
        }

        let bei_anna = empfangene(&mut anna);
        assert!(bei_anna.iter().any(|p| matches!(
            p,
            ControlPayload::RoomUsers(ev) if ev.members.len() == 2
        )));
        let bei_ben = empfangene(&mut ben);
        assert!(bei_ben.iter().any(|p| matches!(
            p,
            ControlPayload::RoomUsers(ev) if ev.members.len() == 2
        )));

        // Anna sendet "hello" – Ben empfaengt Text + Absendername,
        // Anna selbst bekommt keinen Broadcast (nur die direkte Antwort)
        let antwort = dispatcher
            .dispatch(
                ControlMessage::new(
                    3,
                    ControlPayload::ChatSend(ChatSendRequest {
                        room_code: code.clone(),
                        text: Some("hello".into()),
                        attachment: None,
                        audio: None,
                    }),
                ),
                &mut anna.ctx,
            )
            .unwrap();
        assert_eq!(antwort.request_id, 3);
        assert!(matches!(
            antwort.payload,
            ControlPayload::ChatSendResponse(_)
        ));

        let bei_ben = empfangene(&mut ben);
        assert!(bei_ben.iter().any(|p| matches!(
            p,
            ControlPayload::ChatMessage(ev)
                if ev.message.text.as_deref() == Some("hello") && ev.message.sender == "anna"
        )));
        let bei_anna = empfangene(&mut anna);
        assert!(
            !bei_anna
                .iter()
                .any(|p| matches!(p, ControlPayload::ChatMessage(_))),
            "Absenderin darf ihren eigenen Broadcast nicht bekommen"
        );

        // Ben trennt – Anna sieht die geschrumpfte Mitgliederliste,
        // der Raum lebt weiter
        dispatcher.verbindung_bereinigen(&ben.ctx);
        let bei_anna = empfangene(&mut anna);
        assert!(bei_anna.iter().any(|p| matches!(
            p,
            ControlPayload::RoomUsers(ev)
                if ev.members.len() == 1 && ev.members[0].display_name == "anna"
        )));
        assert!(state.raeume.existiert(&stammtisch_core::RoomCode::new(&code)));
    }

    #[tokio::test]
    async fn ersteller_trennt_sofort_raum_wird_ungueltig() {
        let (state, dispatcher) = test_umgebung();
        let mut anna = test_client(&state);
        let code = raum_erstellen(&dispatcher, &mut anna, "anna");

        dispatcher.verbindung_bereinigen(&anna.ctx);

        // Der Code ist ab jetzt fuer jeden Beitritt ungueltig
        let mut ben = test_client(&state);
        let antwort = raum_beitreten(&dispatcher, &mut ben, &code, "ben");
        match antwort.payload {
            ControlPayload::Error(e) => assert_eq!(e.code, ErrorCode::RoomNotFound),
            andere => panic!("Erwartet RoomNotFound, bekam {:?}", andere),
        }
    }

    #[tokio::test]
    async fn ohne_registrierung_wird_abgewiesen() {
        let (state, dispatcher) = test_umgebung();
        let mut anna = test_client(&state);

        let antwort = dispatcher
            .dispatch(
                ControlMessage::new(
                    9,
                    ControlPayload::ChatSend(ChatSendRequest {
                        room_code: "AB12CD".into(),
                        text: Some("hallo".into()),
                        attachment: None,
                        audio: None,
                    }),
                ),
                &mut anna.ctx,
            )
            .unwrap();
        match antwort.payload {
            ControlPayload::Error(e) => assert_eq!(e.code, ErrorCode::NotRegistered),
            andere => panic!("Erwartet NotRegistered, bekam {:?}", andere),
        }
    }

    #[tokio::test]
    async fn leerer_anzeigename_wird_abgewiesen() {
        let (state, dispatcher) = test_umgebung();
        let mut anna = test_client(&state);

        let antwort = dispatcher
            .dispatch(
                ControlMessage::new(
                    1,
                    ControlPayload::Register(RegisterRequest {
                        display_name: "   ".into(),
                    }),
                ),
                &mut anna.ctx,
            )
            .unwrap();
        match antwort.payload {
            ControlPayload::Error(e) => assert_eq!(e.code, ErrorCode::ValidationFailed),
            andere => panic!("Erwartet ValidationFailed, bekam {:?}", andere),
        }
        assert!(anna.ctx.name.is_none());
    }

    #[tokio::test]
    async fn typing_geht_an_alle_ausser_den_tipper() {
        let (state, dispatcher) = test_umgebung();
        let mut anna = test_client(&state);
        let mut ben = test_client(&state);

        let code = raum_erstellen(&dispatcher, &mut anna, "anna");
        raum_beitreten(&dispatcher, &mut ben, &code, "ben");
        empfangene(&mut anna);
        empfangene(&mut ben);

        let antwort = dispatcher.dispatch(
            ControlMessage::new(
                4,
                ControlPayload::Typing(TypingRequest {
                    room_code: code,
                    is_typing: true,
                }),
            ),
            &mut anna.ctx,
        );
        assert!(antwort.is_none(), "Typing hat keine direkte Antwort");

        assert!(empfangene(&mut ben).iter().any(|p| matches!(
            p,
            ControlPayload::TypingNotice(ev) if ev.display_name == "anna" && ev.is_typing
        )));
        assert!(empfangene(&mut anna).is_empty());
    }

    #[tokio::test]
    async fn signal_weiterleitung_und_stiller_drop() {
        let (state, dispatcher) = test_umgebung();
        let mut anna = test_client(&state);
        let mut ben = test_client(&state);

        let code = raum_erstellen(&dispatcher, &mut anna, "anna");
        raum_beitreten(&dispatcher, &mut ben, &code, "ben");
        empfangene(&mut anna);
        empfangene(&mut ben);

        // Adressierung ueber die Verbindungs-ID
        let antwort = dispatcher.dispatch(
            ControlMessage::new(
                5,
                ControlPayload::Signal(SignalRequest {
                    target_connection_id: Some(ben.ctx.verbindung),
                    target_name: None,
                    kind: SignalKind::Offer,
                    payload: serde_json::json!({ "sdp": "v=0" }),
                }),
            ),
            &mut anna.ctx,
        );
        assert!(antwort.is_none());

        let bei_ben = empfangene(&mut ben);
        assert!(bei_ben.iter().any(|p| matches!(
            p,
            ControlPayload::SignalDelivery(ev)
                if ev.sender_name == "anna" && ev.kind == SignalKind::Offer
        )));

        // Adressierung ueber den Anzeigenamen (Registry-Aufloesung)
        dispatcher.dispatch(
            ControlMessage::new(
                6,
                ControlPayload::Signal(SignalRequest {
                    target_connection_id: None,
                    target_name: Some("anna".into()),
                    kind: SignalKind::Answer,
                    payload: serde_json::json!({ "sdp": "v=0" }),
                }),
            ),
            &mut ben.ctx,
        );
        assert!(empfangene(&mut anna).iter().any(|p| matches!(
            p,
            ControlPayload::SignalDelivery(ev) if ev.kind == SignalKind::Answer
        )));

        // Unbekanntes Ziel: stiller Drop, keine Fehler-Antwort, nichts kommt an
        let antwort = dispatcher.dispatch(
            ControlMessage::new(
                7,
                ControlPayload::Signal(SignalRequest {
                    target_connection_id: None,
                    target_name: Some("niemand".into()),
                    kind: SignalKind::IceCandidate,
                    payload: serde_json::json!({}),
                }),
            ),
            &mut anna.ctx,
        );
        assert!(antwort.is_none());
        assert!(empfangene(&mut ben).is_empty());
    }

    #[tokio::test]
    async fn anruf_lebenszyklus_ueber_den_dispatcher() {
        let (state, dispatcher) = test_umgebung();
        let mut anna = test_client(&state);
        let mut ben = test_client(&state);

        let code = raum_erstellen(&dispatcher, &mut anna, "anna");
        raum_beitreten(&dispatcher, &mut ben, &code, "ben");
        empfangene(&mut anna);
        empfangene(&mut ben);

        // Anna ruft an: Ben bekommt den eingehenden Anruf, Anna nur den Ack
        let antwort = dispatcher
            .dispatch(
                ControlMessage::new(
                    10,
                    ControlPayload::CallRequest(CallSetupRequest {
                        room_code: code.clone(),
                        participants: vec![],
                    }),
                ),
                &mut anna.ctx,
            )
            .unwrap();
        assert!(matches!(
            antwort.payload,
            ControlPayload::CallParticipants(_)
        ));

        let bei_ben = empfangene(&mut ben);
        assert!(bei_ben.iter().any(|p| matches!(
            p,
            ControlPayload::CallIncoming(ev) if ev.initiator == "anna"
        )));
        assert!(
            !empfangene(&mut anna)
                .iter()
                .any(|p| matches!(p, ControlPayload::CallIncoming(_))),
            "Initiatorin bekommt keinen eingehenden Anruf"
        );

        // Ben nimmt an: der ganze Raum (beide) erfaehrt die Annahme
        let antwort = dispatcher.dispatch(
            ControlMessage::new(
                11,
                ControlPayload::CallAccept(CallAcceptRequest {
                    room_code: code.clone(),
                }),
            ),
            &mut ben.ctx,
        );
        assert!(antwort.is_none());

        for client in [&mut anna, &mut ben] {
            let payloads = empfangene(client);
            assert!(payloads.iter().any(|p| matches!(
                p,
                ControlPayload::CallAccepted(ev)
                    if ev.accepter == "ben"
                        && ev.participants == vec!["anna".to_string(), "ben".to_string()]
            )));
        }

        // Ben trennt mitten im Anruf: Anna ist letzte Teilnehmerin,
        // der Anruf faellt in den Leerlauf und sie erfaehrt das Ende
        dispatcher.verbindung_bereinigen(&ben.ctx);
        let bei_anna = empfangene(&mut anna);
        assert!(bei_anna.iter().any(|p| matches!(
            p,
            ControlPayload::CallParticipants(ev) if ev.participants == vec!["anna".to_string()]
        )));
    }

    #[tokio::test]
    async fn raumwechsel_verlaesst_den_alten_raum() {
        let (state, dispatcher) = test_umgebung();
        let mut anna = test_client(&state);
        let mut ben = test_client(&state);
        let mut carla = test_client(&state);

        let erster = raum_erstellen(&dispatcher, &mut anna, "anna");
        raum_beitreten(&dispatcher, &mut ben, &erster, "ben");
        let zweiter = raum_erstellen(&dispatcher, &mut carla, "carla");
        empfangene(&mut anna);
        empfangene(&mut ben);

        // Ben wechselt in Carlas Raum – Anna sieht ihn gehen
        raum_beitreten(&dispatcher, &mut ben, &zweiter, "ben");

        let bei_anna = empfangene(&mut anna);
        assert!(bei_anna.iter().any(|p| matches!(
            p,
            ControlPayload::RoomUsers(ev) if ev.members.len() == 1
        )));
        assert_eq!(
            state
                .raeume
                .raum_von(&ben.ctx.verbindung)
                .map(|c| c.to_string()),
            Some(zweiter)
        );
    }

    #[tokio::test]
    async fn register_ueberschreibt_alten_namen() {
        let (state, dispatcher) = test_umgebung();
        let mut anna = test_client(&state);

        for name in ["anna", "anna_neu"] {
            dispatcher.dispatch(
                ControlMessage::new(
                    1,
                    ControlPayload::Register(RegisterRequest {
                        display_name: name.into(),
                    }),
                ),
                &mut anna.ctx,
            );
        }

        assert_eq!(anna.ctx.name.as_deref(), Some("anna_neu"));
        assert_eq!(
            state.registry.aufloesen("anna_neu"),
            Some(anna.ctx.verbindung)
        );
        assert_eq!(state.registry.aufloesen("anna"), None);
    }
}
