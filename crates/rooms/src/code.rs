//! Raum-Code-Generierung
//!
//! Codes bestehen aus einem verwechslungsfreien Alphabet (ohne I, O, 0, 1).
//! Bei 6 Zeichen ergibt das einen Coderaum von 32^6 (> 1 Milliarde) –
//! Kollisionen sind praktisch ausgeschlossen, werden aber trotzdem vom
//! RoomStore geprueft und durch Neugenerierung aufgeloest.

use rand::RngCore;
use stammtisch_core::RoomCode;

/// Verwechslungsfreies Alphabet fuer Raum-Codes
pub const CODE_ZEICHEN: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Standard-Laenge eines Raum-Codes
pub const STANDARD_CODE_LAENGE: usize = 6;

/// Generiert einen zufaelligen Raum-Code der gegebenen Laenge
pub fn raum_code_generieren(laenge: usize) -> RoomCode {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; laenge];
    rng.fill_bytes(&mut bytes);
    let code: String = bytes
        .iter()
        .map(|b| CODE_ZEICHEN[(*b as usize) % CODE_ZEICHEN.len()] as char)
        .collect();
    RoomCode::new(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_hat_gewuenschte_laenge() {
        assert_eq!(raum_code_generieren(6).len(), 6);
        assert_eq!(raum_code_generieren(8).len(), 8);
    }

    #[test]
    fn code_verwendet_nur_erlaubte_zeichen() {
        let code = raum_code_generieren(64);
        for zeichen in code.as_str().bytes() {
            assert!(
                CODE_ZEICHEN.contains(&zeichen),
                "Unerlaubtes Zeichen: {}",
                zeichen as char
            );
        }
    }

    #[test]
    fn codes_sind_praktisch_eindeutig() {
        let mut gesehen = std::collections::HashSet::new();
        for _ in 0..1000 {
            gesehen.insert(raum_code_generieren(STANDARD_CODE_LAENGE));
        }
        // Bei 32^6 Moeglichkeiten sind 1000 Kollisionen astronomisch
        // unwahrscheinlich; ein paar wenige tolerieren wir nicht.
        assert_eq!(gesehen.len(), 1000);
    }
}
