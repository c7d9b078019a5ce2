//! Anruf-Zustandsmaschine – pro Raum ein Anruf
//!
//! ```text
//! Leerlauf --anfragen--> Klingelt --annehmen (>1 Teilnehmer)--> Verbunden
//!     ^                      |                                      |
//!     +---- beenden / letzter Teilnehmer weg ----------------------+
//! ```
//!
//! Invariante: eine leere Teilnehmerliste impliziert `Leerlauf` und keinen
//! Initiator – egal welches Ereignis die Liste geleert hat. Jede Mutation
//! stellt das am Ende selbst sicher.
//!
//! Der Zustand ist reine In-Memory-Daten und vollstaendig aus dem
//! Ereignisstrom ableitbar; nach einem Neustart handeln Clients neu aus.

use stammtisch_core::{Result, StammtischError};

// ---------------------------------------------------------------------------
// CallPhase
// ---------------------------------------------------------------------------

/// Lebensphase eines Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallPhase {
    /// Kein Anruf aktiv
    #[default]
    Leerlauf,
    /// Anruf angefragt, wartet auf erste Annahme
    Klingelt,
    /// Mindestens zwei Teilnehmer verbunden
    Verbunden,
}

// ---------------------------------------------------------------------------
// CallState
// ---------------------------------------------------------------------------

/// Anruf-Zustand eines Raums
///
/// `Leerlauf` mit leerer Teilnehmerliste ist der Ruhezustand; ein Raum
/// traegt immer einen `CallState`, "kein Anruf" ist kein Sonderfall.
#[derive(Debug, Clone, Default)]
pub struct CallState {
    /// Aktuelle Phase
    pub phase: CallPhase,
    /// Anzeigename des Initiators (nur gesetzt wenn ein Anruf laeuft)
    pub initiator: Option<String>,
    /// Aktuelle Teilnehmer in Beitrittsreihenfolge
    pub teilnehmer: Vec<String>,
}

impl CallState {
    /// Erstellt einen neuen Anruf-Zustand im Leerlauf
    pub fn neu() -> Self {
        Self::default()
    }

    /// Prueft ob gerade ein Anruf laeuft
    pub fn ist_aktiv(&self) -> bool {
        self.phase != CallPhase::Leerlauf
    }

    /// Startet einen Anruf (`Leerlauf -> Klingelt`)
    ///
    /// Der Initiator wird automatisch in die Teilnehmerliste aufgenommen.
    /// Laeuft bereits ein Anruf, schlaegt die Anfrage mit `AnrufBelegt`
    /// fehl statt die bestehende Teilnehmerliste zu ueberschreiben.
    pub fn anfragen(&mut self, initiator: &str, eingeladene: Vec<String>) -> Result<()> {
        if self.ist_aktiv() {
            let belegt_von = self
                .initiator
                .clone()
                .unwrap_or_else(|| "unbekannt".to_string());
            return Err(StammtischError::AnrufBelegt(belegt_von));
        }

        self.phase = CallPhase::Klingelt;
        self.initiator = Some(initiator.to_string());
        self.teilnehmer.clear();
        self.teilnehmer.push(initiator.to_string());
        for name in eingeladene {
            self.teilnehmer_aufnehmen(&name);
        }

        tracing::debug!(initiator, "Anruf angefragt");
        Ok(())
    }

    /// Nimmt den Anruf an (`Klingelt -> Verbunden` sobald > 1 Teilnehmer)
    pub fn annehmen(&mut self, name: &str) -> Result<CallPhase> {
        if !self.ist_aktiv() {
            return Err(StammtischError::validierung("Kein aktiver Anruf"));
        }

        self.teilnehmer_aufnehmen(name);
        if self.teilnehmer.len() > 1 {
            self.phase = CallPhase::Verbunden;
        }

        tracing::debug!(name, teilnehmer = self.teilnehmer.len(), "Anruf angenommen");
        Ok(self.phase)
    }

    /// Lehnt den Anruf ab (in jeder Phase erlaubt)
    ///
    /// Entfernt den Ablehnenden aus der Teilnehmerliste; wird sie dadurch
    /// leer, faellt der Anruf in den Leerlauf zurueck.
    pub fn ablehnen(&mut self, name: &str) -> CallPhase {
        self.teilnehmer.retain(|t| t != name);
        self.leere_pruefen();
        tracing::debug!(name, phase = ?self.phase, "Anruf abgelehnt");
        self.phase
    }

    /// Beendet den Anruf bedingungslos (in jeder Phase erlaubt)
    pub fn beenden(&mut self) {
        self.zuruecksetzen();
        tracing::debug!("Anruf beendet");
    }

    /// Tritt einem laufenden Anruf bei (Phase bleibt unveraendert)
    pub fn beitreten(&mut self, name: &str) -> Result<CallPhase> {
        if !self.ist_aktiv() {
            return Err(StammtischError::validierung("Kein aktiver Anruf"));
        }

        self.teilnehmer_aufnehmen(name);
        Ok(self.phase)
    }

    /// Verlaesst einen laufenden Anruf
    ///
    /// Die Phase bleibt erhalten, ausser die Teilnehmerliste wird leer –
    /// dann erzwingt die Invariante den Leerlauf.
    pub fn verlassen(&mut self, name: &str) -> CallPhase {
        self.teilnehmer.retain(|t| t != name);
        self.leere_pruefen();
        self.phase
    }

    /// Prueft ob ein Name gerade am Anruf teilnimmt
    pub fn ist_teilnehmer(&self, name: &str) -> bool {
        self.teilnehmer.iter().any(|t| t == name)
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Fuegt einen Teilnehmer hinzu falls noch nicht vorhanden
    fn teilnehmer_aufnehmen(&mut self, name: &str) {
        if !self.ist_teilnehmer(name) {
            self.teilnehmer.push(name.to_string());
        }
    }

    /// Leere Teilnehmerliste erzwingt Leerlauf (Invariante)
    fn leere_pruefen(&mut self) {
        if self.teilnehmer.is_empty() {
            self.zuruecksetzen();
        }
    }

    fn zuruecksetzen(&mut self) {
        self.phase = CallPhase::Leerlauf;
        self.initiator = None;
        self.teilnehmer.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn klingelnder_anruf() -> CallState {
        let mut call = CallState::neu();
        call.anfragen("anna", vec!["ben".into(), "carla".into()])
            .unwrap();
        call
    }

    #[test]
    fn anfragen_setzt_initiator_und_teilnehmer() {
        let call = klingelnder_anruf();
        assert_eq!(call.phase, CallPhase::Klingelt);
        assert_eq!(call.initiator.as_deref(), Some("anna"));
        assert_eq!(call.teilnehmer, vec!["anna", "ben", "carla"]);
    }

    #[test]
    fn anfragen_bei_aktivem_anruf_schlaegt_fehl() {
        let mut call = klingelnder_anruf();
        let fehler = call.anfragen("ben", vec![]).unwrap_err();
        assert!(matches!(fehler, StammtischError::AnrufBelegt(wer) if wer == "anna"));
        // Bestehender Anruf bleibt unangetastet
        assert_eq!(call.initiator.as_deref(), Some("anna"));
    }

    #[test]
    fn annehmen_verbindet_ab_zwei_teilnehmern() {
        let mut call = CallState::neu();
        call.anfragen("anna", vec![]).unwrap();
        assert_eq!(call.phase, CallPhase::Klingelt);

        let phase = call.annehmen("ben").unwrap();
        assert_eq!(phase, CallPhase::Verbunden);
        assert_eq!(call.teilnehmer, vec!["anna", "ben"]);
    }

    #[test]
    fn annehmen_ist_idempotent() {
        let mut call = klingelnder_anruf();
        call.annehmen("ben").unwrap();
        call.annehmen("ben").unwrap();
        assert_eq!(
            call.teilnehmer.iter().filter(|t| *t == "ben").count(),
            1,
            "Doppelte Annahme darf keinen doppelten Eintrag erzeugen"
        );
    }

    #[test]
    fn annehmen_ohne_anruf_schlaegt_fehl() {
        let mut call = CallState::neu();
        assert!(call.annehmen("ben").is_err());
    }

    #[test]
    fn ablehnen_des_letzten_teilnehmers_erzwingt_leerlauf() {
        let mut call = CallState::neu();
        call.anfragen("anna", vec![]).unwrap();

        let phase = call.ablehnen("anna");
        assert_eq!(phase, CallPhase::Leerlauf);
        assert!(call.initiator.is_none());
        assert!(call.teilnehmer.is_empty());
    }

    #[test]
    fn beenden_setzt_bedingungslos_zurueck() {
        let mut call = klingelnder_anruf();
        call.annehmen("ben").unwrap();
        assert_eq!(call.phase, CallPhase::Verbunden);

        call.beenden();
        assert_eq!(call.phase, CallPhase::Leerlauf);
        assert!(call.initiator.is_none());
        assert!(call.teilnehmer.is_empty());
    }

    #[test]
    fn verlassen_behaelt_phase_solange_teilnehmer_bleiben() {
        let mut call = klingelnder_anruf();
        call.annehmen("ben").unwrap();

        let phase = call.verlassen("carla");
        assert_eq!(phase, CallPhase::Verbunden);
        assert_eq!(call.teilnehmer, vec!["anna", "ben"]);
    }

    #[test]
    fn invariante_leer_impliziert_leerlauf() {
        // Beliebige Ereignisfolgen: sobald die Liste leer ist, muss der
        // Zustand vollstaendig zurueckgesetzt sein – dauerhaft.
        let mut call = CallState::neu();
        call.anfragen("anna", vec!["ben".into()]).unwrap();
        call.annehmen("ben").unwrap();
        call.verlassen("anna");
        call.ablehnen("ben");

        assert_eq!(call.phase, CallPhase::Leerlauf);
        assert!(call.initiator.is_none());
        assert!(call.teilnehmer.is_empty());

        // Auch nach weiteren Ereignissen stabil
        call.verlassen("anna");
        assert_eq!(call.phase, CallPhase::Leerlauf);
        assert!(call.initiator.is_none());
    }

    #[test]
    fn beitreten_mitten_im_anruf_aendert_phase_nicht() {
        let mut call = klingelnder_anruf();
        let phase = call.beitreten("dora").unwrap();
        assert_eq!(phase, CallPhase::Klingelt);
        assert!(call.ist_teilnehmer("dora"));
    }

    #[test]
    fn neuer_anruf_nach_beenden_moeglich() {
        let mut call = klingelnder_anruf();
        call.beenden();
        call.anfragen("ben", vec![]).unwrap();
        assert_eq!(call.initiator.as_deref(), Some("ben"));
        assert_eq!(call.teilnehmer, vec!["ben"]);
    }
}
