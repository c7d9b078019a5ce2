//! Fehlertypen fuer Stammtisch
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Kein Fehler ist fatal fuer den Prozess; jeder ist auf die ausloesende
//! Operation beschraenkt.

use thiserror::Error;

/// Globaler Result-Alias fuer Stammtisch
pub type Result<T> = std::result::Result<T, StammtischError>;

/// Alle moeglichen Fehler im Stammtisch-System
#[derive(Debug, Error)]
pub enum StammtischError {
    // --- Raum ---
    #[error("Raum nicht gefunden: {0}")]
    RaumNichtGefunden(String),

    #[error("Nachricht nicht gefunden: {0}")]
    NachrichtNichtGefunden(u64),

    // --- Validierung ---
    #[error("Validierung fehlgeschlagen: {0}")]
    Validierung(String),

    #[error("Nicht registriert – zuerst einen Anzeigenamen setzen")]
    NichtRegistriert,

    // --- Anruf ---
    #[error("Anruf bereits aktiv (Initiator: {0})")]
    AnrufBelegt(String),

    // --- Kapazitaet ---
    #[error("Server voll: maximale Clientanzahl erreicht")]
    ServerVoll,

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl StammtischError {
    /// Erstellt einen Validierungsfehler aus einer beliebigen Nachricht
    pub fn validierung(msg: impl Into<String>) -> Self {
        Self::Validierung(msg.into())
    }

    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler nur den Aufrufer betrifft
    /// und nie an den Raum gesendet werden darf
    pub fn ist_nur_fuer_absender(&self) -> bool {
        matches!(
            self,
            Self::RaumNichtGefunden(_)
                | Self::NachrichtNichtGefunden(_)
                | Self::Validierung(_)
                | Self::NichtRegistriert
                | Self::AnrufBelegt(_)
        )
    }
}
