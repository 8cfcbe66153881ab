//! Fehlertypen fuer Hush
//!
//! Die Taxonomie folgt den Wegen, auf denen eine Sitzung enden kann:
//! Ablehnung durch den Server, Transportfehler, Protokollfehler,
//! fehlende Lebenszeichen und (nicht fatale) Voice-Fehler.

use std::io;

use thiserror::Error;

use crate::types::RejectReason;

/// Globaler Result-Alias fuer Hush
pub type Result<T> = std::result::Result<T, HushError>;

/// Alle Fehler, die beim Betrieb einer Client-Sitzung auftreten koennen
#[derive(Debug, Error)]
pub enum HushError {
    // --- Ablehnung beim Handshake ---
    #[error("Verbindung abgelehnt: {0}")]
    Abgelehnt(RejectReason),

    // --- Transport ---
    #[error("Transportfehler beim {vorgang}: {quelle}")]
    Transport {
        vorgang: &'static str,
        #[source]
        quelle: io::Error,
    },

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Protokoll ---
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    #[error("Schluesselaustausch fehlgeschlagen: {0}")]
    Schluessel(String),

    // --- Lebenszeichen ---
    #[error("Server antwortet nicht (seit {sekunden} s kein Frame empfangen)")]
    Lebenszeichen { sekunden: u64 },

    // --- Voice (nicht fatal) ---
    #[error("Voice-Fehler: {0}")]
    Voice(String),

    // --- Lokale Pruefungen ---
    #[error("Nachricht zu lang: {laenge} Bytes (Maximum: {maximum} Bytes)")]
    NachrichtZuLang { laenge: usize, maximum: usize },

    #[error("Nicht mit einem Server verbunden")]
    NichtVerbunden,

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

impl HushError {
    /// Erstellt einen Transportfehler fuer den angegebenen Vorgang
    pub fn transport(vorgang: &'static str, quelle: io::Error) -> Self {
        Self::Transport { vorgang, quelle }
    }

    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler die laufende Sitzung beendet
    ///
    /// Voice-Fehler und lokal abgewiesene Eingaben lassen die Sitzung
    /// bestehen, alles andere fuehrt zum Abbau.
    pub fn beendet_sitzung(&self) -> bool {
        !matches!(
            self,
            Self::Voice(_)
                | Self::NachrichtZuLang { .. }
                | Self::NichtVerbunden
                | Self::UngueltigeEingabe(_)
                | Self::Konfiguration(_)
        )
    }

    /// OS-Fehlercode des zugrundeliegenden Socket-Fehlers (falls vorhanden)
    pub fn fehlercode(&self) -> Option<i32> {
        match self {
            Self::Transport { quelle, .. } => quelle.raw_os_error(),
            _ => None,
        }
    }

    /// Menschenlesbarer Hinweis zur Ursache eines Transportfehlers
    pub fn hinweis(&self) -> Option<&'static str> {
        match self {
            Self::Zeitlimit(_) => Some("Zeitlimit – der Server ist nicht erreichbar"),
            Self::Transport { quelle, .. } => match quelle.kind() {
                io::ErrorKind::TimedOut => Some("Zeitlimit – der Server ist nicht erreichbar"),
                io::ErrorKind::NetworkUnreachable | io::ErrorKind::HostUnreachable => {
                    Some("Keine Route zum Server – besteht eine Internetverbindung?")
                }
                io::ErrorKind::ConnectionRefused => {
                    Some("Der Server hat die Verbindung abgelehnt – laeuft er?")
                }
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                    Some("Die Verbindung wurde vom Server zurueckgesetzt")
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Ist dies ein vom Server zurueckgesetzter Socket?
    pub fn ist_verbindung_zurueckgesetzt(&self) -> bool {
        match self {
            Self::Transport { quelle, .. } => matches!(
                quelle.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = HushError::Abgelehnt(RejectReason::NameVergeben);
        assert_eq!(
            e.to_string(),
            "Verbindung abgelehnt: Der Benutzername ist bereits vergeben"
        );
    }

    #[test]
    fn voice_fehler_beendet_sitzung_nicht() {
        assert!(!HushError::Voice("zu gross".into()).beendet_sitzung());
        assert!(!HushError::NachrichtZuLang { laenge: 2000, maximum: 1000 }.beendet_sitzung());
        assert!(HushError::Lebenszeichen { sekunden: 135 }.beendet_sitzung());
        assert!(HushError::protokoll("kaputt").beendet_sitzung());
    }

    #[test]
    fn transport_hinweise() {
        let zeit = HushError::transport("Verbinden", io::Error::from(io::ErrorKind::TimedOut));
        assert!(zeit.hinweis().unwrap().contains("Zeitlimit"));

        let route = HushError::transport(
            "Verbinden",
            io::Error::from(io::ErrorKind::NetworkUnreachable),
        );
        assert!(route.hinweis().unwrap().contains("Internetverbindung"));

        let sonst = HushError::transport("Senden", io::Error::from(io::ErrorKind::Other));
        assert!(sonst.hinweis().is_none());
    }

    #[test]
    fn fehlercode_aus_os_fehler() {
        let e = HushError::transport("Senden", io::Error::from_raw_os_error(104));
        assert_eq!(e.fehlercode(), Some(104));
        assert_eq!(HushError::NichtVerbunden.fehlercode(), None);
    }

    #[test]
    fn zurueckgesetzte_verbindung_erkennen() {
        let e = HushError::transport("Senden", io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(e.ist_verbindung_zurueckgesetzt());
        assert!(!HushError::Zeitlimit("x".into()).ist_verbindung_zurueckgesetzt());
    }
}
