//! stammtisch-protocol – Nachrichtentypen und Wire-Format
//!
//! Alle Steuerungsnachrichten zwischen Client und Relay plus das
//! frame-basierte Wire-Format (Laengenpraefix + JSON) fuer TCP.

pub mod control;
pub mod wire;

pub use control::{ControlMessage, ControlPayload, ErrorCode};
pub use wire::FrameCodec;
