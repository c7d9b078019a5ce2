//! stammtisch-rooms – Raum-Lebenszyklus und Nachrichtenverlauf
//!
//! Der RoomStore besitzt alle lebenden Raeume: Mitgliedschaft,
//! Nachrichtenverlauf (begrenzt, aeltere Eintraege werden verdraengt),
//! geteilten Hintergrund und den Anruf-Zustand. Raeume sind fluechtig:
//! erstellt unter einem generierten Code, zerstoert sobald das letzte
//! Mitglied geht.

pub mod code;
pub mod message;
pub mod room;
pub mod store;

pub use code::{raum_code_generieren, STANDARD_CODE_LAENGE};
pub use message::{Anhang, AudioClip, NeueNachricht, RaumNachricht};
pub use room::{Mitglied, Raum};
pub use store::{
    AnrufSchnappschuss, BeitrittsInfo, LoeschNotiz, RaumGrenzen, RoomStore, VerlassenInfo,
};
