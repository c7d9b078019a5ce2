//! Handler-Module fuer die einzelnen Nachrichtengruppen

pub mod call_handler;
pub mod chat_handler;
pub mod room_handler;
pub mod signal_handler;

use stammtisch_core::StammtischError;
use stammtisch_protocol::control::{ControlMessage, ErrorCode};

/// Uebersetzt einen Domaenen-Fehler in den Wire-Fehlercode
pub(crate) fn fehler_zu_code(fehler: &StammtischError) -> ErrorCode {
    match fehler {
        StammtischError::RaumNichtGefunden(_) => ErrorCode::RoomNotFound,
        StammtischError::NachrichtNichtGefunden(_) => ErrorCode::MessageNotFound,
        StammtischError::Validierung(_) => ErrorCode::ValidationFailed,
        StammtischError::NichtRegistriert => ErrorCode::NotRegistered,
        StammtischError::AnrufBelegt(_) => ErrorCode::CallBusy,
        StammtischError::ServerVoll => ErrorCode::ServerFull,
        StammtischError::UngueltigeNachricht(_) => ErrorCode::InvalidRequest,
        StammtischError::Intern(_) | StammtischError::Anyhow(_) => ErrorCode::InternalError,
    }
}

/// Baut die Fehler-Antwort an den Aufrufer (nie ein Broadcast)
pub(crate) fn fehler_antwort(request_id: u32, fehler: &StammtischError) -> ControlMessage {
    ControlMessage::error(request_id, fehler_zu_code(fehler), fehler.to_string())
}
