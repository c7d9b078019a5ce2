//! Control-Protokoll (TCP)
//!
//! Definiert alle Steuerungsnachrichten die ueber die TCP-Verbindung
//! zwischen Client und Relay ausgetauscht werden.
//!
//! ## Design
//! - Request/Response Pattern: jede Nachricht hat eine `request_id: u32`
//! - Raum-Broadcasts tragen immer `request_id = 0`, damit Clients direkte
//!   Antworten und Broadcasts auseinanderhalten koennen
//! - JSON-Serialisierung via serde (TCP, nicht zeitkritisch)
//! - Tagged Enums fuer typsichere Nachrichtentypen

use serde::{Deserialize, Serialize};
use stammtisch_core::types::ConnectionId;

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Allgemein
    InternalError,
    InvalidRequest,
    // Registrierung
    NotRegistered,
    // Raum
    RoomNotFound,
    MessageNotFound,
    ValidationFailed,
    // Anruf
    CallBusy,
    // Server
    ServerFull,
}

// ---------------------------------------------------------------------------
// Registrierung
// ---------------------------------------------------------------------------

/// Anzeigenamen registrieren (idempotent, ueberschreibt den alten Namen)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Vom Client gewaehlter Anzeigename (nicht authentifiziert)
    pub display_name: String,
}

/// Bestaetigung der Registrierung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Vom Relay vergebene Verbindungs-ID (Ziel fuer Signal-Nachrichten)
    pub connection_id: ConnectionId,
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// Raum-Nachrichten
// ---------------------------------------------------------------------------

/// Mitglieds-Eintrag in einem Raum (Beitrittsreihenfolge bleibt erhalten)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub connection_id: ConnectionId,
    pub display_name: String,
}

/// Raum erstellen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCreateRequest {
    /// Anzeigename des Erstellers (registriert den Namen mit)
    pub display_name: String,
}

/// Antwort auf Raum-Erstellung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCreateResponse {
    /// Generierter Raum-Code, unter dem andere beitreten koennen
    pub room_code: String,
}

/// Raum beitreten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomJoinRequest {
    pub room_code: String,
    /// Anzeigename des Beitretenden (registriert den Namen mit)
    pub display_name: String,
}

/// Bestaetigung des Raum-Beitritts
///
/// Geht nur an den Beitretenden selbst. Die uebrigen Mitglieder erhalten
/// stattdessen `RoomUsers` und eine `SystemNotice`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomJoinResponse {
    pub room_code: String,
    /// Mitglieder in Beitrittsreihenfolge (inklusive des Beitretenden)
    pub members: Vec<MemberInfo>,
    /// Bisheriger Nachrichtenverlauf des Raums
    pub messages: Vec<MessageInfo>,
    /// Geteilter Raum-Hintergrund, falls gesetzt
    pub background: Option<String>,
}

/// Raum verlassen (explizit; Disconnect loest dasselbe aus)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomLeaveRequest {}

/// Bestaetigung des Verlassens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomLeaveResponse {
    pub success: bool,
}

/// Geteilten Raum-Hintergrund setzen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundSetRequest {
    pub room_code: String,
    /// Referenz auf den Hintergrund (URL oder vom Upload-Dienst vergebene ID)
    pub background: String,
}

// ---------------------------------------------------------------------------
// Chat-Nachrichten
// ---------------------------------------------------------------------------

/// Datei-Anhang einer Nachricht
///
/// `data` ist eine bereits aufgeloeste In-Memory-Referenz (Data-URL oder
/// Upload-ID) – der eigentliche Upload laeuft ausserhalb des Relays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub data: String,
}

/// Audio-Aufnahme einer Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioInfo {
    pub data: String,
    pub duration_ms: Option<u64>,
}

/// Vollstaendige Nachricht wie sie im Raum gespeichert ist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageInfo {
    /// Eindeutig innerhalb des Raums
    pub message_id: u64,
    pub sender: String,
    pub text: Option<String>,
    pub attachment: Option<AttachmentInfo>,
    pub audio: Option<AudioInfo>,
    /// Anzeigenamen die diese Nachricht geliket haben (Reihenfolge stabil)
    pub likes: Vec<String>,
    pub edited: bool,
    /// RFC-3339-Zeitstempel der letzten Bearbeitung
    pub edited_at: Option<String>,
    /// RFC-3339-Zeitstempel der Erstellung
    pub created_at: String,
}

/// Nachricht senden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSendRequest {
    pub room_code: String,
    pub text: Option<String>,
    pub attachment: Option<AttachmentInfo>,
    pub audio: Option<AudioInfo>,
}

/// Direkte Antwort auf das Senden (die gespeicherte Nachricht mit ID)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSendResponse {
    pub room_code: String,
    pub message: MessageInfo,
}

/// Nachricht editieren
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEditRequest {
    pub room_code: String,
    pub message_id: u64,
    pub text: String,
}

/// Nachricht loeschen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDeleteRequest {
    pub room_code: String,
    pub message_id: u64,
}

/// Like einer Nachricht umschalten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLikeRequest {
    pub room_code: String,
    pub message_id: u64,
}

/// Tipp-Indikator (fluechtig, wird nie gespeichert)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingRequest {
    pub room_code: String,
    pub is_typing: bool,
}

// ---------------------------------------------------------------------------
// Raum-Broadcasts (Server -> Clients, request_id = 0)
// ---------------------------------------------------------------------------

/// Aktualisierte Mitgliederliste eines Raums
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUsersEvent {
    pub room_code: String,
    pub members: Vec<MemberInfo>,
}

/// Systemnachricht (Beitritt/Verlassen) – wird nicht in der History abgelegt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemNoticeEvent {
    pub room_code: String,
    pub text: String,
}

/// Neue Chat-Nachricht im Raum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageEvent {
    pub room_code: String,
    pub message: MessageInfo,
}

/// Nachricht wurde editiert (vollstaendige aktualisierte Nachricht)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEditedEvent {
    pub room_code: String,
    pub message: MessageInfo,
}

/// Nachricht wurde geloescht
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDeletedEvent {
    pub room_code: String,
    pub message_id: u64,
    /// Urspruenglicher Absender der geloeschten Nachricht
    pub sender: String,
}

/// Like-Liste einer Nachricht hat sich geaendert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLikedEvent {
    pub room_code: String,
    pub message_id: u64,
    pub likes: Vec<String>,
}

/// Jemand tippt (geht an alle ausser den Tipper)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingEvent {
    pub room_code: String,
    pub display_name: String,
    pub is_typing: bool,
}

/// Raum-Hintergrund wurde geaendert (geht an alle inklusive Absender)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundChangedEvent {
    pub room_code: String,
    pub background: String,
}

// ---------------------------------------------------------------------------
// Anruf-Nachrichten
// ---------------------------------------------------------------------------

/// Lebensphase eines Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhaseInfo {
    Idle,
    Ringing,
    Connected,
}

/// Anruf starten (nur moeglich wenn kein Anruf aktiv ist)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSetupRequest {
    pub room_code: String,
    /// Eingeladene Anzeigenamen (der Initiator wird automatisch ergaenzt)
    pub participants: Vec<String>,
}

/// Anruf annehmen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAcceptRequest {
    pub room_code: String,
}

/// Anruf ablehnen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRejectRequest {
    pub room_code: String,
}

/// Anruf beenden (setzt den Anruf-Zustand bedingungslos zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEndRequest {
    pub room_code: String,
}

/// Laufendem Anruf beitreten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallJoinRequest {
    pub room_code: String,
}

/// Laufenden Anruf verlassen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLeaveRequest {
    pub room_code: String,
}

/// Eingehender Anruf (geht an alle Mitglieder ausser den Initiator)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallIncomingEvent {
    pub room_code: String,
    pub initiator: String,
    pub participants: Vec<String>,
}

/// Anruf wurde angenommen (geht an den ganzen Raum)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAcceptedEvent {
    pub room_code: String,
    pub accepter: String,
    pub phase: CallPhaseInfo,
    pub participants: Vec<String>,
}

/// Anruf wurde abgelehnt (geht an den ganzen Raum)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRejectedEvent {
    pub room_code: String,
    pub rejecter: String,
    pub phase: CallPhaseInfo,
    pub participants: Vec<String>,
}

/// Anruf wurde beendet (geht an den ganzen Raum)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEndedEvent {
    pub room_code: String,
    pub ended_by: String,
}

/// Teilnehmerliste eines Anrufs hat sich geaendert (Join/Leave/Disconnect)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallParticipantsEvent {
    pub room_code: String,
    pub phase: CallPhaseInfo,
    pub participants: Vec<String>,
}

// ---------------------------------------------------------------------------
// Signal-Weiterleitung (Punkt-zu-Punkt, kein Raum-Broadcast)
// ---------------------------------------------------------------------------

/// Art des Verbindungsaufbau-Payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// Verbindungsaufbau-Payload an eine bestimmte Verbindung weiterleiten
///
/// Das Ziel wird entweder direkt ueber die Verbindungs-ID adressiert oder
/// ueber den Anzeigenamen (aufgeloest durch die Verbindungs-Registry).
/// Der Payload ist fuer das Relay opak. Ist das Ziel nicht verbunden,
/// wird die Nachricht stillschweigend verworfen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRequest {
    pub target_connection_id: Option<ConnectionId>,
    pub target_name: Option<String>,
    pub kind: SignalKind,
    pub payload: serde_json::Value,
}

/// Zugestellter Verbindungsaufbau-Payload (mit Absenderkennung)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalDeliveryEvent {
    pub sender_connection_id: ConnectionId,
    pub sender_name: String,
    pub kind: SignalKind,
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Ping (Client -> Server oder Server -> Client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingMessage {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

/// Pong-Antwort (spiegelt Timestamp zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongMessage {
    /// Originaler Timestamp aus dem Ping
    pub echo_timestamp_ms: u64,
    /// Server-eigener Timestamp
    pub server_timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: ControlPayload
// ---------------------------------------------------------------------------

/// Alle moeglichen Control-Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPayload {
    // Registrierung
    Register(RegisterRequest),
    RegisterResponse(RegisterResponse),

    // Raum
    RoomCreate(RoomCreateRequest),
    RoomCreateResponse(RoomCreateResponse),
    RoomJoin(RoomJoinRequest),
    RoomJoinResponse(RoomJoinResponse),
    RoomLeave(RoomLeaveRequest),
    RoomLeaveResponse(RoomLeaveResponse),
    BackgroundSet(BackgroundSetRequest),

    // Chat
    ChatSend(ChatSendRequest),
    ChatSendResponse(ChatSendResponse),
    ChatEdit(ChatEditRequest),
    ChatDelete(ChatDeleteRequest),
    ChatLike(ChatLikeRequest),
    Typing(TypingRequest),

    // Raum-Broadcasts
    RoomUsers(RoomUsersEvent),
    SystemNotice(SystemNoticeEvent),
    ChatMessage(ChatMessageEvent),
    ChatEdited(ChatEditedEvent),
    ChatDeleted(ChatDeletedEvent),
    ChatLiked(ChatLikedEvent),
    TypingNotice(TypingEvent),
    BackgroundChanged(BackgroundChangedEvent),

    // Anruf
    CallRequest(CallSetupRequest),
    CallAccept(CallAcceptRequest),
    CallReject(CallRejectRequest),
    CallEnd(CallEndRequest),
    CallJoin(CallJoinRequest),
    CallLeave(CallLeaveRequest),
    CallIncoming(CallIncomingEvent),
    CallAccepted(CallAcceptedEvent),
    CallRejected(CallRejectedEvent),
    CallEnded(CallEndedEvent),
    CallParticipants(CallParticipantsEvent),

    // Signal-Weiterleitung
    Signal(SignalRequest),
    SignalDelivery(SignalDeliveryEvent),

    // Keepalive
    Ping(PingMessage),
    Pong(PongMessage),

    // Error
    Error(ErrorResponse),
}

/// Standardisierte Fehler-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Control-Frame (Umschlag fuer alle Nachrichten)
// ---------------------------------------------------------------------------

/// Control-Protokoll-Nachricht mit Request/Response-Zuordnung
///
/// Jede Anfrage traegt eine `request_id` die der Client vergibt. Das Relay
/// kopiert die ID in die direkte Antwort; Raum-Broadcasts tragen die ID 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Eindeutige Nachrichten-ID fuer Request/Response-Zuordnung
    pub request_id: u32,
    /// Inhalt der Nachricht
    pub payload: ControlPayload,
}

/// Request-ID fuer alle Raum-Broadcasts
pub const BROADCAST_REQUEST_ID: u32 = 0;

impl ControlMessage {
    /// Erstellt eine neue Control-Nachricht
    pub fn new(request_id: u32, payload: ControlPayload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    /// Erstellt einen Raum-Broadcast (request_id = 0)
    pub fn broadcast(payload: ControlPayload) -> Self {
        Self::new(BROADCAST_REQUEST_ID, payload)
    }

    /// Erstellt eine Ping-Nachricht
    pub fn ping(request_id: u32, timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Ping(PingMessage { timestamp_ms }),
        )
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(request_id: u32, echo_timestamp_ms: u64, server_timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Pong(PongMessage {
                echo_timestamp_ms,
                server_timestamp_ms,
            }),
        )
    }

    /// Erstellt eine Fehler-Antwort
    pub fn error(request_id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            request_id,
            ControlPayload::Error(ErrorResponse {
                code,
                message: message.into(),
            }),
        )
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
