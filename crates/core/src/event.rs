//! Ereignis-Definitionen
//!
//! `UiEvent` beschreibt, *was* passiert ist – wie es dargestellt wird,
//! entscheidet allein der UI-Collaborator. `SessionSignal` ist der interne
//! Kanal, ueber den Empfangsschleifen und Lebenszeichen-Monitor die
//! Sitzungssteuerung benachrichtigen.

use serde::{Deserialize, Serialize};

use crate::types::{ControlsState, DisconnectReason};

/// Alle Ereignisse, die an den UI-Collaborator gemeldet werden
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiEvent {
    // --- Ausgaben ---
    /// Zeile im Ausgabebereich
    Ausgabe { text: String, fehler: bool },
    /// Modaler Hinweis
    Hinweisfenster { warnung: bool, text: String },
    /// Chat-Nachricht (Kopf "HH:MM. Name: " und entschluesselter Text)
    ChatNachricht { kopf: String, text: String },
    /// Nachricht des Servers an alle
    ServerNachricht { text: String },
    /// Raum verlangt ein Passwort
    PasswortAbfrage { raum: String },

    // --- Raeume ---
    RaumHinzugefuegt {
        name: String,
        max_benutzer: u32,
        willkommen: bool,
    },
    RaumGeloescht { name: String },
    RaumGeaendert {
        alter_name: String,
        neuer_name: String,
        max_benutzer: u32,
    },
    RaumVerschoben { name: String, nach_oben: bool },

    // --- Benutzer ---
    BenutzerHinzugefuegt { name: String, raum: Option<String> },
    BenutzerEntfernt { name: String },
    BenutzerVerschoben { name: String, raum: String },
    VerbindungsHinweis { name: String },
    TrennHinweis { name: String, grund: DisconnectReason },
    PingAktualisiert {
        name: String,
        ping_ms: u16,
        spricht: bool,
    },
    OnlineAnzahl(u32),
    BenutzerlisteGeleert,

    // --- Bedienelemente ---
    Bedienelemente(ControlsState),
}

/// Signale an die Sitzungssteuerung
///
/// Die Empfangsschleifen entscheiden nicht selbst ueber den Abbau, sie
/// melden nur, was sie beobachtet haben.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// Der Server erlaubt den Start des Voice-Kanals
    VoiceFreigegeben,
    /// Null-Byte-Read auf dem Steuerkanal (FIN vom Server)
    ServerGeschlossen,
    /// Harter Fehler im Steuerkanal
    SteuerkanalFehler(String),
    /// Harter Fehler im Medienkanal
    MedienkanalFehler(String),
    /// Lebenszeichen-Frist abgelaufen
    LebenszeichenAbgelaufen { sekunden: u64 },
}
