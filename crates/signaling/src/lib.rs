//! stammtisch-signaling – TCP Relay Layer
//!
//! Dieses Crate implementiert den Relay- und Session-Service fuer
//! Stammtisch. Es verwaltet TCP-Verbindungen, die Namens-Registry,
//! Raum-Ereignisse und die Punkt-zu-Punkt-Signal-Weiterleitung fuer den
//! Verbindungsaufbau von Anrufen.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (RelayServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |
//!     v
//! MessageDispatcher (Registrierung, Keepalive, Gating)
//!     |
//!     +-- RoomHandler   (Create, Join, Leave, Background)
//!     +-- ChatHandler   (Send, Edit, Delete, Like, Typing)
//!     +-- CallHandler   (Request, Accept, Reject, End, Join, Leave)
//!     +-- SignalHandler (Offer/Answer/Candidate Punkt-zu-Punkt)
//!
//! ConnectionRegistry – Anzeigename <-> Verbindungs-ID
//! EventBroadcaster   – Events an alle relevanten Verbindungen senden
//! RoomStore          – Raeume, Mitgliedschaft, Verlauf, Anruf-Zustand
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use registry::ConnectionRegistry;
pub use server_state::{RelayConfig, RelayState};
pub use tcp::RelayServer;
