//! stammtisch-calls – Anruf-Koordination pro Raum
//!
//! Reine Zustandsmaschine fuer den Anruf-Lebenszyklus eines Raums
//! (`Leerlauf -> Klingelt -> Verbunden`). Die Nebenlaeufigkeit liefert
//! der RoomStore (Per-Raum-Sperre); dieses Crate haelt keine eigenen
//! Locks und keinen globalen Zustand.

pub mod state;

pub use state::{CallPhase, CallState};
