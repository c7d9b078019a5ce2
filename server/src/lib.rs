//! stammtisch-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use stammtisch_signaling::{RelayServer, RelayState};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Relay und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. RelayState aufbauen (Raeume, Registry, Broadcaster)
    /// 2. TCP-Listener starten (Control-Protokoll)
    /// 3. Auf Ctrl-C warten und den Shutdown an alle Tasks propagieren
    pub async fn starten(self) -> Result<()> {
        let bind_addr: std::net::SocketAddr = self.config.tcp_bind_adresse().parse()?;

        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %bind_addr,
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        let state = RelayState::neu(self.config.relay_config());
        let relay = RelayServer::neu(state, bind_addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        // Ctrl-C in das Shutdown-Signal uebersetzen
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            }
        });

        relay.starten(shutdown_rx).await?;

        Ok(())
    }
}
