//! Raum – Mitglieder, Nachrichtenverlauf, geteilte Attribute
//!
//! Ein Raum lebt nur solange er Mitglieder hat. Der RoomStore zerstoert
//! ihn in dem Moment, in dem das letzte Mitglied geht – es gibt keinen
//! Idle-Timeout und keine Persistenz.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use stammtisch_calls::CallState;
use stammtisch_core::{ConnectionId, RoomCode};

use crate::message::RaumNachricht;

/// Mitglied eines Raums (Verbindungs-ID + Anzeigename)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mitglied {
    pub verbindung: ConnectionId,
    pub name: String,
}

/// Ein lebender Raum mit vollstaendigem In-Memory-Zustand
#[derive(Debug)]
pub struct Raum {
    pub code: RoomCode,
    /// Anzeigename des Erstellers
    pub ersteller: String,
    /// Mitglieder in Beitrittsreihenfolge
    pub mitglieder: Vec<Mitglied>,
    /// Nachrichtenverlauf, aeltester Eintrag vorn
    pub nachrichten: VecDeque<RaumNachricht>,
    /// Geteilter Hintergrund (URL oder Upload-Referenz)
    pub hintergrund: Option<String>,
    /// Anruf-Zustand (Leerlauf = kein Anruf)
    pub anruf: CallState,
    pub erstellt_am: DateTime<Utc>,
    /// Monotoner Zaehler fuer Nachrichten-IDs
    naechste_nachricht_id: u64,
}

impl Raum {
    /// Erstellt einen neuen Raum mit dem Ersteller als einzigem Mitglied
    pub fn neu(code: RoomCode, ersteller_verbindung: ConnectionId, ersteller_name: &str) -> Self {
        Self {
            code,
            ersteller: ersteller_name.to_string(),
            mitglieder: vec![Mitglied {
                verbindung: ersteller_verbindung,
                name: ersteller_name.to_string(),
            }],
            nachrichten: VecDeque::new(),
            hintergrund: None,
            anruf: CallState::neu(),
            erstellt_am: Utc::now(),
            naechste_nachricht_id: 1,
        }
    }

    /// Fuegt ein Mitglied am Ende der Liste hinzu
    ///
    /// Ist dieselbe Verbindung bereits Mitglied, wird nur der Name
    /// aktualisiert (Beitrittsposition bleibt erhalten).
    pub fn mitglied_hinzufuegen(&mut self, verbindung: ConnectionId, name: &str) {
        if let Some(vorhanden) = self
            .mitglieder
            .iter_mut()
            .find(|m| m.verbindung == verbindung)
        {
            vorhanden.name = name.to_string();
            return;
        }
        self.mitglieder.push(Mitglied {
            verbindung,
            name: name.to_string(),
        });
    }

    /// Entfernt ein Mitglied und gibt es zurueck
    pub fn mitglied_entfernen(&mut self, verbindung: &ConnectionId) -> Option<Mitglied> {
        let pos = self
            .mitglieder
            .iter()
            .position(|m| &m.verbindung == verbindung)?;
        Some(self.mitglieder.remove(pos))
    }

    /// Prueft ob der Raum keine Mitglieder mehr hat
    pub fn ist_leer(&self) -> bool {
        self.mitglieder.is_empty()
    }

    /// Vergibt die naechste Nachrichten-ID
    pub fn naechste_id(&mut self) -> u64 {
        let id = self.naechste_nachricht_id;
        self.naechste_nachricht_id += 1;
        id
    }

    /// Sucht eine Nachricht anhand ihrer ID
    pub fn nachricht_mut(&mut self, id: u64) -> Option<&mut RaumNachricht> {
        self.nachrichten.iter_mut().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ersteller_ist_einziges_mitglied() {
        let verbindung = ConnectionId::new();
        let raum = Raum::neu(RoomCode::new("AB12CD"), verbindung, "anna");

        assert_eq!(raum.mitglieder.len(), 1);
        assert_eq!(raum.mitglieder[0].name, "anna");
        assert_eq!(raum.ersteller, "anna");
        assert!(!raum.ist_leer());
    }

    #[test]
    fn mitglieder_behalten_beitrittsreihenfolge() {
        let mut raum = Raum::neu(RoomCode::new("AB12CD"), ConnectionId::new(), "anna");
        raum.mitglied_hinzufuegen(ConnectionId::new(), "ben");
        raum.mitglied_hinzufuegen(ConnectionId::new(), "carla");

        let namen: Vec<&str> = raum.mitglieder.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(namen, vec!["anna", "ben", "carla"]);
    }

    #[test]
    fn doppelter_beitritt_aktualisiert_nur_den_namen() {
        let verbindung = ConnectionId::new();
        let mut raum = Raum::neu(RoomCode::new("AB12CD"), verbindung, "anna");
        raum.mitglied_hinzufuegen(verbindung, "anna2");

        assert_eq!(raum.mitglieder.len(), 1);
        assert_eq!(raum.mitglieder[0].name, "anna2");
    }

    #[test]
    fn mitglied_entfernen_bis_leer() {
        let verbindung = ConnectionId::new();
        let mut raum = Raum::neu(RoomCode::new("AB12CD"), verbindung, "anna");

        let entfernt = raum.mitglied_entfernen(&verbindung).unwrap();
        assert_eq!(entfernt.name, "anna");
        assert!(raum.ist_leer());

        // Unbekannte Verbindung ist ein No-Op
        assert!(raum.mitglied_entfernen(&ConnectionId::new()).is_none());
    }

    #[test]
    fn nachrichten_ids_sind_monoton() {
        let mut raum = Raum::neu(RoomCode::new("AB12CD"), ConnectionId::new(), "anna");
        let a = raum.naechste_id();
        let b = raum.naechste_id();
        assert!(b > a);
    }
}
