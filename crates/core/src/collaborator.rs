//! Schnittstellen zu den externen Collaborators
//!
//! Darstellung, Audio-Hardware und Einstellungs-Persistenz liegen
//! ausserhalb des Netzwerk-Kerns. Der Kern ruft diese Traits nur mit
//! bereits geparsten und entschluesselten Daten auf.

use std::sync::Arc;

use crate::event::UiEvent;
use crate::types::{Profile, SoundEvent};

/// Empfaenger fuer UI-Ereignisse
pub trait UiSink: Send + Sync + 'static {
    /// Meldet ein Ereignis; darf nicht blockieren
    fn anzeigen(&self, event: UiEvent);
}

/// Audio-Collaborator: Wiedergabe, Hinweistoene, Stream-Verwaltung
pub trait AudioSink: Send + Sync + 'static {
    /// Startet Aufnahme/Wiedergabe; false wenn kein Geraet verfuegbar ist
    fn start(&self) -> bool;

    /// Stoppt Aufnahme/Wiedergabe
    fn stop(&self);

    /// Legt den Wiedergabe-Stream fuer einen Benutzer an
    fn setup_user_audio(&self, user: &str);

    /// Entfernt den Wiedergabe-Stream eines Benutzers
    fn delete_user_audio(&self, user: &str);

    /// Spielt einen dekodierten Voice-Frame ab
    ///
    /// `samples == None` zusammen mit `ist_letzter` beendet den Stream
    /// des Absenders.
    fn play_voice(&self, user: &str, samples: Option<Vec<i16>>, ist_letzter: bool);

    /// Spielt einen Hinweiston
    fn play_sound(&self, sound: SoundEvent);

    /// Anzahl Samples pro Voice-Frame
    fn samples_pro_frame(&self) -> usize;
}

/// Zugriff auf die Benutzereinstellungen
pub trait SettingsStore: Send + Sync + 'static {
    /// Aktuelles Profil
    fn current_profile(&self) -> Profile;

    /// Speichert die Daten einer erfolgreichen Verbindung
    fn save_profile(&self, profile: Profile);
}

/// Buendel aller Collaborators einer Sitzung
#[derive(Clone)]
pub struct Collaborators {
    pub ui: Arc<dyn UiSink>,
    pub audio: Arc<dyn AudioSink>,
    pub settings: Arc<dyn SettingsStore>,
}

impl Collaborators {
    /// Kurzform fuer eine Textzeile im Ausgabebereich
    pub fn ausgabe(&self, text: impl Into<String>, fehler: bool) {
        self.ui.anzeigen(UiEvent::Ausgabe {
            text: text.into(),
            fehler,
        });
    }

    /// Kurzform fuer ein Hinweisfenster
    pub fn hinweis(&self, warnung: bool, text: impl Into<String>) {
        self.ui.anzeigen(UiEvent::Hinweisfenster {
            warnung,
            text: text.into(),
        });
    }
}
