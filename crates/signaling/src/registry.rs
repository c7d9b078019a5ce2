//! Verbindungs-Registry – Anzeigename <-> Verbindungs-ID
//!
//! Haelt beide Richtungen als eigene Maps, damit die Signal-Weiterleitung
//! Ziele in O(1) aufloesen kann, ohne einen Raum-Kontext zu brauchen.
//! Anzeigenamen sind nicht authentifiziert: registriert eine zweite
//! Verbindung denselben Namen, zeigt der Name danach auf sie
//! (Last-Write-Wins).

use dashmap::DashMap;
use stammtisch_core::ConnectionId;
use std::sync::Arc;

/// Globale Zuordnung zwischen Anzeigenamen und Verbindungs-IDs
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<ConnectionRegistryInner>,
}

struct ConnectionRegistryInner {
    /// Verbindung -> aktueller Anzeigename
    namen: DashMap<ConnectionId, String>,
    /// Anzeigename -> Verbindung (fuer Signal-Ziel-Aufloesung)
    index: DashMap<String, ConnectionId>,
}

impl ConnectionRegistry {
    /// Erstellt eine neue leere Registry
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(ConnectionRegistryInner {
                namen: DashMap::new(),
                index: DashMap::new(),
            }),
        }
    }

    /// Registriert einen Anzeigenamen fuer eine Verbindung
    ///
    /// Idempotent; ein frueherer Name derselben Verbindung wird ersetzt
    /// und sein Index-Eintrag entfernt.
    pub fn registrieren(&self, verbindung: ConnectionId, name: &str) {
        if let Some(alter_name) = self.inner.namen.insert(verbindung, name.to_string()) {
            if alter_name != name {
                // Alten Index-Eintrag nur entfernen wenn er noch uns gehoert
                self.inner
                    .index
                    .remove_if(&alter_name, |_, id| *id == verbindung);
            }
        }
        self.inner.index.insert(name.to_string(), verbindung);
        tracing::debug!(verbindung = %verbindung, name, "Anzeigename registriert");
    }

    /// Loest einen Anzeigenamen zur Verbindungs-ID auf
    ///
    /// `None` ist ein gueltiges negatives Ergebnis, kein Fehler.
    pub fn aufloesen(&self, name: &str) -> Option<ConnectionId> {
        self.inner.index.get(name).map(|eintrag| *eintrag)
    }

    /// Gibt den Anzeigenamen einer Verbindung zurueck
    pub fn name_von(&self, verbindung: &ConnectionId) -> Option<String> {
        self.inner.namen.get(verbindung).map(|eintrag| eintrag.clone())
    }

    /// Entfernt eine Verbindung aus beiden Richtungen
    ///
    /// Der Index-Eintrag wird nur entfernt wenn er noch auf diese
    /// Verbindung zeigt (eine andere kann den Namen uebernommen haben).
    pub fn abmelden(&self, verbindung: &ConnectionId) {
        if let Some((_, name)) = self.inner.namen.remove(verbindung) {
            self.inner.index.remove_if(&name, |_, id| id == verbindung);
            tracing::debug!(verbindung = %verbindung, name = %name, "Anzeigename abgemeldet");
        }
    }

    /// Gibt die Anzahl registrierter Verbindungen zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.namen.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrieren_und_aufloesen() {
        let registry = ConnectionRegistry::neu();
        let verbindung = ConnectionId::new();

        registry.registrieren(verbindung, "anna");
        assert_eq!(registry.aufloesen("anna"), Some(verbindung));
        assert_eq!(registry.name_von(&verbindung).as_deref(), Some("anna"));
    }

    #[test]
    fn unbekannter_name_ist_kein_fehler() {
        let registry = ConnectionRegistry::neu();
        assert_eq!(registry.aufloesen("niemand"), None);
    }

    #[test]
    fn neuregistrierung_ersetzt_alten_namen() {
        let registry = ConnectionRegistry::neu();
        let verbindung = ConnectionId::new();

        registry.registrieren(verbindung, "anna");
        registry.registrieren(verbindung, "anna2");

        assert_eq!(registry.name_von(&verbindung).as_deref(), Some("anna2"));
        assert_eq!(registry.aufloesen("anna2"), Some(verbindung));
        assert_eq!(registry.aufloesen("anna"), None, "Alter Name muss frei sein");
    }

    #[test]
    fn namenskollision_last_write_wins() {
        let registry = ConnectionRegistry::neu();
        let erste = ConnectionId::new();
        let zweite = ConnectionId::new();

        registry.registrieren(erste, "anna");
        registry.registrieren(zweite, "anna");

        assert_eq!(registry.aufloesen("anna"), Some(zweite));

        // Die verdraengte Verbindung darf beim Abmelden den Index der
        // neuen Inhaberin nicht mitreissen
        registry.abmelden(&erste);
        assert_eq!(registry.aufloesen("anna"), Some(zweite));
    }

    #[test]
    fn abmelden_entfernt_beide_richtungen() {
        let registry = ConnectionRegistry::neu();
        let verbindung = ConnectionId::new();

        registry.registrieren(verbindung, "anna");
        registry.abmelden(&verbindung);

        assert_eq!(registry.aufloesen("anna"), None);
        assert!(registry.name_von(&verbindung).is_none());
        assert_eq!(registry.anzahl(), 0);
    }

    #[test]
    fn clone_teilt_inneren_state() {
        let registry1 = ConnectionRegistry::neu();
        let registry2 = registry1.clone();
        let verbindung = ConnectionId::new();

        registry1.registrieren(verbindung, "geteilt");
        assert_eq!(registry2.aufloesen("geteilt"), Some(verbindung));
    }
}
