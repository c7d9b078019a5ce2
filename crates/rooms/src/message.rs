//! Nachrichten-Typen fuer den Raum-Verlauf
//!
//! Eine Nachricht traegt mindestens eins von: Text, Anhang, Audio.
//! Leere Nachrichten werden am Eingang abgewiesen und nie gespeichert.
//! Uebergrosse Inline-Payloads werden gekuerzt statt abgelehnt –
//! Teilzustellung geht vor hartem Fehlschlag.

use chrono::{DateTime, Utc};
use stammtisch_core::{Result, StammtischError};

// ---------------------------------------------------------------------------
// Payload-Typen
// ---------------------------------------------------------------------------

/// Datei-Anhang (Daten sind eine bereits aufgeloeste In-Memory-Referenz)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anhang {
    pub dateiname: String,
    pub mime_typ: Option<String>,
    pub daten: String,
}

/// Audio-Aufnahme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub daten: String,
    pub dauer_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// NeueNachricht (Eingang)
// ---------------------------------------------------------------------------

/// Eingehende Nachricht vor der Aufnahme in den Verlauf
#[derive(Debug, Clone)]
pub struct NeueNachricht {
    pub absender: String,
    pub text: Option<String>,
    pub anhang: Option<Anhang>,
    pub audio: Option<AudioClip>,
}

impl NeueNachricht {
    /// Prueft ob die Nachricht keinerlei Inhalt traegt
    ///
    /// Text der nur aus Whitespace besteht zaehlt als leer.
    pub fn ist_leer(&self) -> bool {
        let text_leer = self
            .text
            .as_deref()
            .map(|t| t.trim().is_empty())
            .unwrap_or(true);
        text_leer && self.anhang.is_none() && self.audio.is_none()
    }

    /// Kuerzt Inline-Payloads auf `max_bytes`
    ///
    /// Gibt `true` zurueck wenn mindestens ein Payload gekuerzt wurde.
    pub fn kuerzen(&mut self, max_bytes: usize) -> bool {
        let mut gekuerzt = false;
        if let Some(anhang) = &mut self.anhang {
            gekuerzt |= an_zeichengrenze_kuerzen(&mut anhang.daten, max_bytes);
        }
        if let Some(audio) = &mut self.audio {
            gekuerzt |= an_zeichengrenze_kuerzen(&mut audio.daten, max_bytes);
        }
        gekuerzt
    }
}

/// Kuerzt einen String auf hoechstens `max` Bytes, ohne UTF-8 zu zerbrechen
fn an_zeichengrenze_kuerzen(s: &mut String, max: usize) -> bool {
    if s.len() <= max {
        return false;
    }
    let mut grenze = max;
    while !s.is_char_boundary(grenze) {
        grenze -= 1;
    }
    s.truncate(grenze);
    true
}

// ---------------------------------------------------------------------------
// RaumNachricht (gespeichert)
// ---------------------------------------------------------------------------

/// Gespeicherte Nachricht im Raum-Verlauf
#[derive(Debug, Clone)]
pub struct RaumNachricht {
    /// Eindeutig innerhalb des Raums (monotoner Zaehler)
    pub id: u64,
    pub absender: String,
    pub text: Option<String>,
    pub anhang: Option<Anhang>,
    pub audio: Option<AudioClip>,
    /// Anzeigenamen die geliket haben, in Reihenfolge des ersten Likes
    pub likes: Vec<String>,
    pub bearbeitet: bool,
    pub bearbeitet_am: Option<DateTime<Utc>>,
    pub erstellt_am: DateTime<Utc>,
}

impl RaumNachricht {
    /// Erstellt eine gespeicherte Nachricht aus einem validierten Eingang
    pub fn aus_eingang(id: u64, eingang: NeueNachricht) -> Self {
        Self {
            id,
            absender: eingang.absender,
            text: eingang.text,
            anhang: eingang.anhang,
            audio: eingang.audio,
            likes: Vec::new(),
            bearbeitet: false,
            bearbeitet_am: None,
            erstellt_am: Utc::now(),
        }
    }

    /// Ersetzt den Text und markiert die Nachricht als bearbeitet
    ///
    /// Identitaet (ID, Absender) und Erstellungszeitpunkt bleiben erhalten.
    pub fn editieren(&mut self, neuer_text: impl Into<String>) -> Result<()> {
        let neuer_text = neuer_text.into();
        if neuer_text.trim().is_empty() {
            return Err(StammtischError::validierung(
                "Bearbeiteter Text darf nicht leer sein",
            ));
        }
        self.text = Some(neuer_text);
        self.bearbeitet = true;
        self.bearbeitet_am = Some(Utc::now());
        Ok(())
    }

    /// Schaltet den Like eines Anzeigenamens um (vorhanden -> entfernen)
    ///
    /// Gibt die aktualisierte Like-Liste zurueck.
    pub fn like_umschalten(&mut self, name: &str) -> Vec<String> {
        if self.likes.iter().any(|l| l == name) {
            self.likes.retain(|l| l != name);
        } else {
            self.likes.push(name.to_string());
        }
        self.likes.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
