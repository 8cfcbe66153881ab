//! Gemeinsame Typen fuer Hush
//!
//! Sitzungsphasen, Ablehnungs- und Trenngruende sowie die Ereignisarten,
//! die an die Audio- und UI-Collaborators gemeldet werden.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sitzungsphase
// ---------------------------------------------------------------------------

/// Zustand der Sitzungssteuerung
///
/// ```text
/// Idle -> Connecting -> AwaitingServerInfo -> ExchangingKeys
///      -> SyncingPresence -> Active -> Disconnecting -> Idle
///
/// jede Phase vor Active --> Aborted(grund) --> Idle
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Keine Verbindung
    Idle,
    /// TCP-Verbindungsaufbau laeuft
    Connecting,
    /// Handshake gesendet, Antwortbyte steht aus
    AwaitingServerInfo,
    /// Server-Info erhalten, Diffie-Hellman laeuft
    ExchangingKeys,
    /// Schluessel steht, Raum-Snapshot wird uebernommen
    SyncingPresence,
    /// Verbunden, Empfangsschleifen laufen
    Active,
    /// Abbau laeuft (egal auf welchem Weg)
    Disconnecting,
    /// Verbindungsversuch vor Active abgebrochen
    Aborted(String),
}

impl SessionPhase {
    /// Gibt true zurueck wenn die Sitzung vollstaendig verbunden ist
    pub fn ist_aktiv(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Gibt true zurueck fuer Phasen des Verbindungsaufbaus
    pub fn im_aufbau(&self) -> bool {
        matches!(
            self,
            Self::Connecting
                | Self::AwaitingServerInfo
                | Self::ExchangingKeys
                | Self::SyncingPresence
        )
    }
}

// ---------------------------------------------------------------------------
// Ablehnung & Trennung
// ---------------------------------------------------------------------------

/// Grund, aus dem der Server den Handshake abgelehnt hat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Der Benutzername ist bereits vergeben
    NameVergeben,
    /// Der Server hat keine freien Plaetze
    ServerVoll,
    /// Client- und Server-Version passen nicht zusammen
    FalscheVersion { client: String, server: String },
    /// Passwort fehlt oder ist falsch
    PasswortErforderlich,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameVergeben => write!(f, "Der Benutzername ist bereits vergeben"),
            Self::ServerVoll => write!(f, "Der Server ist voll"),
            Self::FalscheVersion { client, server } => write!(
                f,
                "Versionskonflikt: Client-Version {client}, Server-Version {server}"
            ),
            Self::PasswortErforderlich => {
                write!(f, "Das Server-Passwort fehlt oder ist falsch")
            }
        }
    }
}

/// Warum ein anderer Benutzer den Server verlassen hat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DisconnectReason {
    /// Normal abgemeldet
    Getrennt = 0,
    /// Verbindung verloren
    Verloren = 1,
    /// Vom Server gekickt
    Gekickt = 2,
}

impl DisconnectReason {
    /// Konvertiert einen Wire-Wert
    pub fn from_u8(wert: u8) -> Option<Self> {
        match wert {
            0 => Some(Self::Getrennt),
            1 => Some(Self::Verloren),
            2 => Some(Self::Gekickt),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Audio- und UI-Hilfstypen
// ---------------------------------------------------------------------------

/// Hinweistoene, die der Audio-Collaborator abspielt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundEvent {
    /// Jemand betritt den eigenen Raum
    BenutzerKommt,
    /// Jemand verlaesst den eigenen Raum
    BenutzerGeht,
    /// Neue Chat-Nachricht
    NeueNachricht,
    /// Nachricht des Servers an alle
    ServerNachricht,
    /// Verbindung zum Server verloren
    VerbindungVerloren,
}

/// Welche Bedienelemente die UI freigeben soll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlsState {
    /// Verbindungsaufbau laeuft, alles gesperrt
    Beschaeftigt,
    /// Verbunden: Chat-Eingabe frei, Knopf zeigt "Trennen"
    Verbunden,
    /// Getrennt: Verbindungsdaten frei, Knopf zeigt "Verbinden"
    Getrennt,
}

/// Aktuelles Benutzerprofil aus den Einstellungen
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub host: String,
    pub port: u16,
    pub passwort: Option<String>,
    /// Verbindungs-/Trennhinweise anderer Benutzer anzeigen
    pub verbindungs_hinweise: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trenngrund_wire_werte() {
        assert_eq!(DisconnectReason::from_u8(0), Some(DisconnectReason::Getrennt));
        assert_eq!(DisconnectReason::from_u8(2), Some(DisconnectReason::Gekickt));
        assert_eq!(DisconnectReason::from_u8(7), None);
    }

    #[test]
    fn phasen_klassifikation() {
        assert!(SessionPhase::Active.ist_aktiv());
        assert!(SessionPhase::ExchangingKeys.im_aufbau());
        assert!(!SessionPhase::Idle.im_aufbau());
        assert!(!SessionPhase::Aborted("x".into()).ist_aktiv());
    }

    #[test]
    fn versionskonflikt_nennt_beide_versionen() {
        let grund = RejectReason::FalscheVersion {
            client: "1.2.0".into(),
            server: "1.3.0".into(),
        };
        let text = grund.to_string();
        assert!(text.contains("1.2.0"));
        assert!(text.contains("1.3.0"));
    }
}
