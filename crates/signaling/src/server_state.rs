//! Gemeinsamer Server-Zustand fuer den Relay-Service
//!
//! Haelt alle geteilten Zustands-Manager als Arc-Referenzen, die sicher
//! zwischen tokio-Tasks geteilt werden koennen. Der gesamte Zustand ist
//! memory-resident; nach einem Prozess-Neustart ist er weg (gewollt).

use stammtisch_rooms::{RaumGrenzen, RoomStore};
use std::sync::Arc;
use std::time::Instant;

use crate::broadcast::EventBroadcaster;
use crate::registry::ConnectionRegistry;

/// Konfiguration fuer den Relay-Service
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitige Verbindungen
    pub max_clients: u32,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Obergrenzen fuer Raum-Inhalte
    pub grenzen: RaumGrenzen,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server_name: "Stammtisch Server".to_string(),
            max_clients: 512,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            grenzen: RaumGrenzen::default(),
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
///
/// Alle Manager sind Clone-Handles auf denselben inneren Zustand.
/// Wird als explizites Store-Objekt in jeden Handler gereicht statt als
/// Modul-globaler Zustand zu existieren – sauberer Lebenszyklus und
/// testbar ohne Prozess-Neustart.
pub struct RelayState {
    /// Server-Konfiguration
    pub config: Arc<RelayConfig>,
    /// Raum-Store (Raeume, Mitgliedschaft, Verlauf, Anruf-Zustand)
    pub raeume: RoomStore,
    /// Verbindungs-Registry (Anzeigename <-> Verbindung)
    pub registry: ConnectionRegistry,
    /// Event-Broadcaster (Nachrichten an Clients senden)
    pub broadcaster: EventBroadcaster,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_zeit: Instant,
}

impl RelayState {
    /// Erstellt einen neuen RelayState
    pub fn neu(config: RelayConfig) -> Arc<Self> {
        let grenzen = config.grenzen.clone();
        Arc::new(Self {
            config: Arc::new(config),
            raeume: RoomStore::neu(grenzen),
            registry: ConnectionRegistry::neu(),
            broadcaster: EventBroadcaster::neu(),
            start_zeit: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_zeit.elapsed().as_secs()
    }
}
