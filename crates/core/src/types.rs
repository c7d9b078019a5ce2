//! Gemeinsame Identifikationstypen fuer Stammtisch
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Verbindungs-ID
///
/// Wird pro Transport-Verbindung vergeben und lebt nur so lange wie die
/// Verbindung selbst. Kein persistentes Benutzerkonto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "verbindung:{}", self.0)
    }
}

/// Kurzer alphanumerischer Raum-Code
///
/// Der Code wird bei der Erstellung normalisiert (Grossbuchstaben), damit
/// Clients ihn unabhaengig von der Schreibweise eingeben koennen.
/// Eindeutigkeit unter den gerade lebenden Raeumen stellt der RoomStore
/// sicher, nicht dieser Typ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomCode(String);

impl RoomCode {
    /// Erstellt einen RoomCode aus einer rohen Eingabe (normalisiert)
    pub fn new(roh: impl AsRef<str>) -> Self {
        Self(roh.as_ref().trim().to_ascii_uppercase())
    }

    /// Gibt den Code als &str zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Laenge des Codes in Zeichen
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Prueft ob der Code leer ist
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(roh: &str) -> Self {
        Self::new(roh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_eindeutig() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b, "Zwei neue ConnectionIds muessen verschieden sein");
    }

    #[test]
    fn connection_id_display() {
        let id = ConnectionId(Uuid::nil());
        assert!(id.to_string().starts_with("verbindung:"));
    }

    #[test]
    fn room_code_normalisierung() {
        let code = RoomCode::new("  ab12cd ");
        assert_eq!(code.as_str(), "AB12CD");
        assert_eq!(code, RoomCode::new("AB12CD"));
    }

    #[test]
    fn room_code_display_ohne_praefix() {
        let code = RoomCode::new("XY34ZW");
        assert_eq!(code.to_string(), "XY34ZW");
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let cid = ConnectionId::new();
        let json = serde_json::to_string(&cid).unwrap();
        let cid2: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(cid, cid2);

        let code = RoomCode::new("AB12CD");
        let json = serde_json::to_string(&code).unwrap();
        let code2: RoomCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, code2);
    }
}
