//! Event-Broadcaster – Sendet Events an alle relevanten Verbindungen
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller verbundenen
//! Clients. Zustellung ist fire-and-forget: keine Bestaetigung, kein
//! Backpressure – eine langsame oder getrennte Verbindung verpasst den
//! Broadcast ersatzlos.
//!
//! Die Mitgliederlisten kommen als Schnappschuss aus dem RoomStore;
//! der Broadcaster haelt selbst keine Raum-Zugehoerigkeit, damit es nur
//! eine Quelle der Wahrheit fuer Mitgliedschaft gibt.

use dashmap::DashMap;
use stammtisch_core::ConnectionId;
use stammtisch_protocol::control::ControlMessage;
use stammtisch_rooms::Mitglied;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Verbindung
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer verbundenen Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub verbindung: ConnectionId,
    pub tx: mpsc::Sender<ControlMessage>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an die Verbindung
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ControlMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(verbindung = %self.verbindung, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.verbindung, "Send-Queue geschlossen (Verbindung getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Event-Broadcaster fuer alle verbundenen Clients
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Client-Sender, indiziert nach Verbindungs-ID
    verbindungen: DashMap<ConnectionId, ClientSender>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                verbindungen: DashMap::new(),
            }),
        }
    }

    /// Registriert eine neue Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und sendet via TCP.
    pub fn verbindung_registrieren(
        &self,
        verbindung: ConnectionId,
    ) -> mpsc::Receiver<ControlMessage> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        let sender = ClientSender { verbindung, tx };
        self.inner.verbindungen.insert(verbindung, sender);
        tracing::debug!(verbindung = %verbindung, "Verbindung im Broadcaster registriert");
        rx
    }

    /// Entfernt eine Verbindung aus dem Broadcaster
    pub fn verbindung_entfernen(&self, verbindung: &ConnectionId) {
        self.inner.verbindungen.remove(verbindung);
        tracing::debug!(verbindung = %verbindung, "Verbindung aus Broadcaster entfernt");
    }

    /// Sendet eine Nachricht an eine einzelne Verbindung
    ///
    /// Gibt `true` zurueck wenn die Verbindung gefunden und die Nachricht
    /// eingereiht wurde.
    pub fn an_verbindung_senden(
        &self,
        verbindung: &ConnectionId,
        nachricht: ControlMessage,
    ) -> bool {
        match self.inner.verbindungen.get(verbindung) {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::debug!(verbindung = %verbindung, "Senden an unbekannte Verbindung");
                false
            }
        }
    }

    /// Sendet eine Nachricht an alle Mitglieder eines Raums
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_mitglieder_senden(&self, mitglieder: &[Mitglied], nachricht: ControlMessage) -> usize {
        let mut gesendet = 0;
        for mitglied in mitglieder {
            if let Some(sender) = self.inner.verbindungen.get(&mitglied.verbindung) {
                if sender.senden(nachricht.clone()) {
                    gesendet += 1;
                }
            }
        }
        gesendet
    }

    /// Sendet eine Nachricht an alle Mitglieder ausser einem
    ///
    /// Nuetzlich fuer Chat- und Typing-Events, bei denen der Ausloeser
    /// seine eigene Aktion nicht gespiegelt bekommt.
    pub fn an_mitglieder_ausser_senden(
        &self,
        mitglieder: &[Mitglied],
        ausgeschlossen: &ConnectionId,
        nachricht: ControlMessage,
    ) -> usize {
        let mut gesendet = 0;
        for mitglied in mitglieder {
            if &mitglied.verbindung == ausgeschlossen {
                continue;
            }
            if let Some(sender) = self.inner.verbindungen.get(&mitglied.verbindung) {
                if sender.senden(nachricht.clone()) {
                    gesendet += 1;
                }
            }
        }
        gesendet
    }

    /// Gibt die Anzahl der registrierten Verbindungen zurueck
    pub fn verbindung_anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, verbindung: &ConnectionId) -> bool {
        self.inner.verbindungen.contains_key(verbindung)
    }
}

impl Default for EventBroadcaster {
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

    fn test_nachricht(id: u32) -> ControlMessage {
        ControlMessage::ping(id, 12345)
    }

    fn mitglied(verbindung: ConnectionId, name: &str) -> Mitglied {
        Mitglied {
            verbindung,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn verbindung_registrieren_und_senden() {
        let broadcaster = EventBroadcaster::neu();
        let verbindung = ConnectionId::new();

        let mut rx = broadcaster.verbindung_registrieren(verbindung);
        assert!(broadcaster.ist_registriert(&verbindung));

        let gesendet = broadcaster.an_verbindung_senden(&verbindung, test_nachricht(1));
        assert!(gesendet);

        let empfangen = rx.try_recv().expect("Nachricht muss vorhanden sein");
        assert_eq!(empfangen.request_id, 1);
    }

    #[tokio::test]
    async fn an_mitglieder_senden() {
        let broadcaster = EventBroadcaster::neu();

        let anna = ConnectionId::new();
        let ben = ConnectionId::new();
        let carla = ConnectionId::new(); // nicht im Raum

        let mut rx_anna = broadcaster.verbindung_registrieren(anna);
        let mut rx_ben = broadcaster.verbindung_registrieren(ben);
        let mut rx_carla = broadcaster.verbindung_registrieren(carla);

        let raum = vec![mitglied(anna, "anna"), mitglied(ben, "ben")];
        let gesendet = broadcaster.an_mitglieder_senden(&raum, test_nachricht(10));
        assert_eq!(gesendet, 2);

        assert!(rx_anna.try_recv().is_ok());
        assert!(rx_ben.try_recv().is_ok());
        assert!(rx_carla.try_recv().is_err(), "carla darf nichts empfangen");
    }

    #[tokio::test]
    async fn an_mitglieder_ausser_senden() {
        let broadcaster = EventBroadcaster::neu();

        let anna = ConnectionId::new();
        let ben = ConnectionId::new();

        let mut rx_anna = broadcaster.verbindung_registrieren(anna);
        let mut rx_ben = broadcaster.verbindung_registrieren(ben);

        let raum = vec![mitglied(anna, "anna"), mitglied(ben, "ben")];

        // anna ist die Ausloeserin und bekommt keine Nachricht
        broadcaster.an_mitglieder_ausser_senden(&raum, &anna, test_nachricht(20));

        assert!(rx_anna.try_recv().is_err(), "Ausloeserin darf nichts empfangen");
        assert!(rx_ben.try_recv().is_ok());
    }

    #[tokio::test]
    async fn getrennte_verbindung_wird_uebersprungen() {
        let broadcaster = EventBroadcaster::neu();

        let anna = ConnectionId::new();
        let ben = ConnectionId::new();

        let mut rx_anna = broadcaster.verbindung_registrieren(anna);
        let rx_ben = broadcaster.verbindung_registrieren(ben);
        drop(rx_ben); // ben ist weg, Queue geschlossen

        let raum = vec![mitglied(anna, "anna"), mitglied(ben, "ben")];
        let gesendet = broadcaster.an_mitglieder_senden(&raum, test_nachricht(30));

        assert_eq!(gesendet, 1, "Nur anna ist erreichbar");
        assert!(rx_anna.try_recv().is_ok());
    }

    #[test]
    fn senden_an_unbekannte_verbindung() {
        let broadcaster = EventBroadcaster::neu();
        let gesendet = broadcaster.an_verbindung_senden(&ConnectionId::new(), test_nachricht(1));
        assert!(!gesendet);
    }

    #[tokio::test]
    async fn volle_queue_verwirft_nachricht() {
        let broadcaster = EventBroadcaster::neu();
        let verbindung = ConnectionId::new();
        let _rx = broadcaster.verbindung_registrieren(verbindung);

        // Queue bis zum Rand fuellen
        for i in 0..SEND_QUEUE_GROESSE {
            assert!(broadcaster.an_verbindung_senden(&verbindung, test_nachricht(i as u32)));
        }

        // Naechste Nachricht passt nicht mehr und wird verworfen
        assert!(!broadcaster.an_verbindung_senden(&verbindung, test_nachricht(999)));
    }
}
