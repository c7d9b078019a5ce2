//! RoomStore – besitzt alle lebenden Raeume
//!
//! Thread-safe via Arc + DashMap. Jede Operation auf einem Raum laeuft
//! unter der Per-Eintrag-Sperre der DashMap und ist damit atomar gegen
//! andere Ereignisse desselben Raums; Operationen auf verschiedenen
//! Raeumen laufen nebeneinander, es gibt keine globale Sperre.
//!
//! Ein Raum wird in dem Moment zerstoert, in dem sein letztes Mitglied
//! geht – der einzige Zerstoerungspfad. Verlauf, Hintergrund und
//! Anruf-Zustand fallen mit ihm.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use stammtisch_calls::{CallPhase, CallState};
use stammtisch_core::{ConnectionId, Result, RoomCode, StammtischError};

use crate::code::{raum_code_generieren, STANDARD_CODE_LAENGE};
use crate::message::{NeueNachricht, RaumNachricht};
use crate::room::{Mitglied, Raum};

// ---------------------------------------------------------------------------
// Grenzen
// ---------------------------------------------------------------------------

/// Obergrenzen fuer Raum-Inhalte
#[derive(Debug, Clone)]
pub struct RaumGrenzen {
    /// Maximale Nachrichten pro Raum (aeltere werden verdraengt)
    pub max_nachrichten: usize,
    /// Maximale Bytes pro Inline-Payload (groessere werden gekuerzt)
    pub max_payload_bytes: usize,
    /// Laenge generierter Raum-Codes
    pub code_laenge: usize,
}

impl Default for RaumGrenzen {
    fn default() -> Self {
        Self {
            max_nachrichten: 500,
            max_payload_bytes: 10 * 1024 * 1024,
            code_laenge: STANDARD_CODE_LAENGE,
        }
    }
}

// ---------------------------------------------------------------------------
// Ergebnis-Typen
// ---------------------------------------------------------------------------

/// Zustand den ein Beitretender als direkte Antwort erhaelt
#[derive(Debug, Clone)]
pub struct BeitrittsInfo {
    /// Mitglieder inklusive des Beitretenden, in Beitrittsreihenfolge
    pub mitglieder: Vec<Mitglied>,
    /// Bisheriger Verlauf (nur an den Beitretenden, kein Broadcast)
    pub nachrichten: Vec<RaumNachricht>,
    pub hintergrund: Option<String>,
}

/// Anruf-Zustand nach einer Mutation (fuer Broadcasts)
#[derive(Debug, Clone)]
pub struct AnrufSchnappschuss {
    pub phase: CallPhase,
    pub teilnehmer: Vec<String>,
}

/// Ergebnis des Verlassens eines Raums
#[derive(Debug, Clone)]
pub struct VerlassenInfo {
    pub code: RoomCode,
    /// Anzeigename des Gegangenen
    pub name: String,
    /// Verbleibende Mitglieder (leer wenn der Raum zerstoert wurde)
    pub mitglieder: Vec<Mitglied>,
    pub raum_geloescht: bool,
    /// Gesetzt wenn der Gegangene an einem Anruf teilnahm
    pub anruf: Option<AnrufSchnappschuss>,
}

/// Loeschnotiz fuer den Raum-Broadcast
#[derive(Debug, Clone)]
pub struct LoeschNotiz {
    pub nachricht_id: u64,
    /// Urspruenglicher Absender der geloeschten Nachricht
    pub absender: String,
}

// ---------------------------------------------------------------------------
// RoomStore
// ---------------------------------------------------------------------------

/// Besitzt alle lebenden Raeume und den Verbindungs-zu-Raum-Index
///
/// Clone teilt den inneren Zustand (Arc).
#[derive(Clone)]
pub struct RoomStore {
    inner: Arc<RoomStoreInner>,
}

struct RoomStoreInner {
    /// Lebende Raeume, indiziert nach Code
    raeume: DashMap<RoomCode, Raum>,
    /// Verbindung -> aktueller Raum (fuer Disconnect-Cleanup)
    mitglied_index: DashMap<ConnectionId, RoomCode>,
    grenzen: RaumGrenzen,
}

impl RoomStore {
    /// Erstellt einen neuen leeren RoomStore
    pub fn neu(grenzen: RaumGrenzen) -> Self {
        Self {
            inner: Arc::new(RoomStoreInner {
                raeume: DashMap::new(),
                mitglied_index: DashMap::new(),
                grenzen,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Raum-Lebenszyklus
    // -----------------------------------------------------------------------

    /// Erstellt einen Raum mit dem Ersteller als einzigem Mitglied
    ///
    /// Generiert Codes bis einer keinen lebenden Raum trifft. Das
    /// Entry-API haelt Pruefung und Einfuegen atomar zusammen.
    pub fn raum_erstellen(&self, verbindung: ConnectionId, name: &str) -> RoomCode {
        let mut laenge = self.inner.grenzen.code_laenge;
        let mut versuche: u32 = 0;
        loop {
            let code = raum_code_generieren(laenge);
            match self.inner.raeume.entry(code.clone()) {
                Entry::Occupied(_) => {
                    versuche += 1;
                    // Verhindert Livelock falls der Coderaum nahezu voll ist
                    if versuche % 16 == 0 {
                        laenge += 1;
                    }
                }
                Entry::Vacant(eintrag) => {
                    eintrag.insert(Raum::neu(code.clone(), verbindung, name));
                    self.inner.mitglied_index.insert(verbindung, code.clone());
                    tracing::info!(code = %code, ersteller = name, "Raum erstellt");
                    return code;
                }
            }
        }
    }

    /// Tritt einem Raum bei
    ///
    /// Gibt den Zustand zurueck den nur der Beitretende erhaelt (Verlauf +
    /// Hintergrund); die Broadcasts an den Raum uebernimmt der Aufrufer.
    pub fn raum_beitreten(
        &self,
        code: &RoomCode,
        verbindung: ConnectionId,
        name: &str,
    ) -> Result<BeitrittsInfo> {
        let info = self.mit_raum(code, |raum| {
            raum.mitglied_hinzufuegen(verbindung, name);
            Ok(BeitrittsInfo {
                mitglieder: raum.mitglieder.clone(),
                nachrichten: raum.nachrichten.iter().cloned().collect(),
                hintergrund: raum.hintergrund.clone(),
            })
        })?;

        self.inner.mitglied_index.insert(verbindung, code.clone());
        tracing::info!(code = %code, name, "Raum beigetreten");
        Ok(info)
    }

    /// Verlaesst den aktuellen Raum der Verbindung (No-Op ohne Raum)
    ///
    /// War der Gegangene Anruf-Teilnehmer, wird er auch dort entfernt.
    /// Wird der Raum dadurch leer, wird er zerstoert.
    pub fn raum_verlassen(&self, verbindung: &ConnectionId) -> Option<VerlassenInfo> {
        let (_, code) = self.inner.mitglied_index.remove(verbindung)?;

        let info = {
            let mut raum = self.inner.raeume.get_mut(&code)?;
            let mitglied = raum.mitglied_entfernen(verbindung)?;

            let anruf = if raum.anruf.ist_teilnehmer(&mitglied.name) {
                let phase = raum.anruf.verlassen(&mitglied.name);
                Some(AnrufSchnappschuss {
                    phase,
                    teilnehmer: raum.anruf.teilnehmer.clone(),
                })
            } else {
                None
            };

            VerlassenInfo {
                code: code.clone(),
                name: mitglied.name,
                mitglieder: raum.mitglieder.clone(),
                raum_geloescht: raum.ist_leer(),
                anruf,
            }
        };

        if info.raum_geloescht {
            // remove_if haelt Pruefen und Entfernen atomar zusammen, falls
            // zwischenzeitlich jemand demselben Code beigetreten ist
            self.inner.raeume.remove_if(&code, |_, raum| raum.ist_leer());
            tracing::info!(code = %code, "Raum zerstoert (letztes Mitglied gegangen)");
        } else {
            tracing::debug!(code = %code, name = %info.name, "Raum verlassen");
        }

        Some(info)
    }

    // -----------------------------------------------------------------------
    // Nachrichten
    // -----------------------------------------------------------------------

    /// Haengt eine Nachricht an den Verlauf an
    ///
    /// Leere Nachrichten werden abgewiesen; uebergrosse Inline-Payloads
    /// gekuerzt. Ueberschreitet der Verlauf die Obergrenze, verdraengt die
    /// neue Nachricht die aelteste.
    pub fn nachricht_anhaengen(
        &self,
        code: &RoomCode,
        mut eingang: NeueNachricht,
    ) -> Result<RaumNachricht> {
        if eingang.ist_leer() {
            return Err(StammtischError::validierung(
                "Nachricht ohne Text, Anhang und Audio",
            ));
        }

        if eingang.kuerzen(self.inner.grenzen.max_payload_bytes) {
            tracing::warn!(
                code = %code,
                absender = %eingang.absender,
                max_bytes = self.inner.grenzen.max_payload_bytes,
                "Uebergrosser Inline-Payload gekuerzt"
            );
        }

        let max_nachrichten = self.inner.grenzen.max_nachrichten;
        self.mit_raum(code, move |raum| {
            let id = raum.naechste_id();
            let nachricht = RaumNachricht::aus_eingang(id, eingang);
            raum.nachrichten.push_back(nachricht.clone());
            while raum.nachrichten.len() > max_nachrichten {
                raum.nachrichten.pop_front();
            }
            Ok(nachricht)
        })
    }

    /// Editiert den Text einer Nachricht (Identitaet bleibt erhalten)
    pub fn nachricht_editieren(
        &self,
        code: &RoomCode,
        nachricht_id: u64,
        neuer_text: &str,
    ) -> Result<RaumNachricht> {
        self.mit_raum(code, |raum| {
            let nachricht = raum
                .nachricht_mut(nachricht_id)
                .ok_or(StammtischError::NachrichtNichtGefunden(nachricht_id))?;
            nachricht.editieren(neuer_text)?;
            Ok(nachricht.clone())
        })
    }

    /// Loescht eine Nachricht aus dem Verlauf
    pub fn nachricht_loeschen(&self, code: &RoomCode, nachricht_id: u64) -> Result<LoeschNotiz> {
        self.mit_raum(code, |raum| {
            let pos = raum
                .nachrichten
                .iter()
                .position(|n| n.id == nachricht_id)
                .ok_or(StammtischError::NachrichtNichtGefunden(nachricht_id))?;
            match raum.nachrichten.remove(pos) {
                Some(entfernt) => Ok(LoeschNotiz {
                    nachricht_id: entfernt.id,
                    absender: entfernt.absender,
                }),
                None => Err(StammtischError::NachrichtNichtGefunden(nachricht_id)),
            }
        })
    }

    /// Schaltet den Like eines Namens um und gibt die neue Like-Liste zurueck
    pub fn like_umschalten(
        &self,
        code: &RoomCode,
        nachricht_id: u64,
        name: &str,
    ) -> Result<Vec<String>> {
        self.mit_raum(code, |raum| {
            let nachricht = raum
                .nachricht_mut(nachricht_id)
                .ok_or(StammtischError::NachrichtNichtGefunden(nachricht_id))?;
            Ok(nachricht.like_umschalten(name))
        })
    }

    /// Gibt den aktuellen Verlauf eines Raums zurueck
    pub fn verlauf(&self, code: &RoomCode) -> Result<Vec<RaumNachricht>> {
        self.mit_raum(code, |raum| Ok(raum.nachrichten.iter().cloned().collect()))
    }

    // -----------------------------------------------------------------------
    // Geteilte Attribute
    // -----------------------------------------------------------------------

    /// Setzt den geteilten Hintergrund des Raums
    pub fn hintergrund_setzen(&self, code: &RoomCode, hintergrund: &str) -> Result<()> {
        self.mit_raum(code, |raum| {
            raum.hintergrund = Some(hintergrund.to_string());
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Anruf-Koordination (delegiert an die Zustandsmaschine, atomar pro Raum)
    // -----------------------------------------------------------------------

    /// Startet einen Anruf im Raum
    pub fn anruf_anfragen(
        &self,
        code: &RoomCode,
        initiator: &str,
        eingeladene: Vec<String>,
    ) -> Result<AnrufSchnappschuss> {
        self.mit_raum(code, |raum| {
            raum.anruf.anfragen(initiator, eingeladene)?;
            Ok(Self::schnappschuss(&raum.anruf))
        })
    }

    /// Nimmt den laufenden Anruf an
    pub fn anruf_annehmen(&self, code: &RoomCode, name: &str) -> Result<AnrufSchnappschuss> {
        self.mit_raum(code, |raum| {
            raum.anruf.annehmen(name)?;
            Ok(Self::schnappschuss(&raum.anruf))
        })
    }

    /// Lehnt den Anruf ab
    pub fn anruf_ablehnen(&self, code: &RoomCode, name: &str) -> Result<AnrufSchnappschuss> {
        self.mit_raum(code, |raum| {
            raum.anruf.ablehnen(name);
            Ok(Self::schnappschuss(&raum.anruf))
        })
    }

    /// Beendet den Anruf bedingungslos
    pub fn anruf_beenden(&self, code: &RoomCode) -> Result<()> {
        self.mit_raum(code, |raum| {
            raum.anruf.beenden();
            Ok(())
        })
    }

    /// Tritt dem laufenden Anruf bei
    pub fn anruf_beitreten(&self, code: &RoomCode, name: &str) -> Result<AnrufSchnappschuss> {
        self.mit_raum(code, |raum| {
            raum.anruf.beitreten(name)?;
            Ok(Self::schnappschuss(&raum.anruf))
        })
    }

    /// Verlaesst den laufenden Anruf
    pub fn anruf_verlassen(&self, code: &RoomCode, name: &str) -> Result<AnrufSchnappschuss> {
        self.mit_raum(code, |raum| {
            raum.anruf.verlassen(name);
            Ok(Self::schnappschuss(&raum.anruf))
        })
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Gibt die Mitglieder eines Raums zurueck
    pub fn mitglieder(&self, code: &RoomCode) -> Result<Vec<Mitglied>> {
        self.mit_raum(code, |raum| Ok(raum.mitglieder.clone()))
    }

    /// Gibt den aktuellen Raum einer Verbindung zurueck
    pub fn raum_von(&self, verbindung: &ConnectionId) -> Option<RoomCode> {
        self.inner
            .mitglied_index
            .get(verbindung)
            .map(|eintrag| eintrag.clone())
    }

    /// Prueft ob unter dem Code ein Raum lebt
    pub fn existiert(&self, code: &RoomCode) -> bool {
        self.inner.raeume.contains_key(code)
    }

    /// Gibt die Anzahl der lebenden Raeume zurueck
    pub fn raum_anzahl(&self) -> usize {
        self.inner.raeume.len()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Fuehrt eine Mutation unter der Per-Raum-Sperre aus
    fn mit_raum<T>(
        &self,
        code: &RoomCode,
        f: impl FnOnce(&mut Raum) -> Result<T>,
    ) -> Result<T> {
        match self.inner.raeume.get_mut(code) {
            Some(mut raum) => f(&mut raum),
            None => Err(StammtischError::RaumNichtGefunden(code.to_string())),
        }
    }

    fn schnappschuss(anruf: &CallState) -> AnrufSchnappschuss {
        AnrufSchnappschuss {
            phase: anruf.phase,
            teilnehmer: anruf.teilnehmer.clone(),
        }
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::neu(RaumGrenzen::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
