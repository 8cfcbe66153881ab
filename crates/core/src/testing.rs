//! Aufzeichnende Collaborator-Attrappen fuer Tests
//!
//! Werden von den Tests aller Hush-Crates genutzt (Feature `testing`).

use std::sync::{Arc, Mutex};

use crate::collaborator::{AudioSink, Collaborators, SettingsStore, UiSink};
use crate::event::UiEvent;
use crate::types::{Profile, SoundEvent};

/// Zeichnet alle UI-Ereignisse auf
#[derive(Default)]
pub struct UiProtokoll {
    events: Mutex<Vec<UiEvent>>,
}

impl UiProtokoll {
    /// Kopie aller bisher gemeldeten Ereignisse
    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Zaehlt Ereignisse, auf die das Praedikat passt
    pub fn anzahl(&self, praedikat: impl Fn(&UiEvent) -> bool) -> usize {
        self.events().iter().filter(|e| praedikat(e)).count()
    }
}

impl UiSink for UiProtokoll {
    fn anzeigen(&self, event: UiEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Ein Aufruf an den Audio-Collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioAufruf {
    Start,
    Stop,
    Einrichten(String),
    Entfernen(String),
    Voice {
        user: String,
        samples: Option<Vec<i16>>,
        ist_letzter: bool,
    },
    Ton(SoundEvent),
}

/// Zeichnet alle Audio-Aufrufe auf
pub struct AudioProtokoll {
    aufrufe: Mutex<Vec<AudioAufruf>>,
    startet: bool,
    samples_pro_frame: usize,
}

impl AudioProtokoll {
    pub fn neu(startet: bool, samples_pro_frame: usize) -> Self {
        Self {
            aufrufe: Mutex::new(Vec::new()),
            startet,
            samples_pro_frame,
        }
    }

    pub fn aufrufe(&self) -> Vec<AudioAufruf> {
        self.aufrufe.lock().map(|a| a.clone()).unwrap_or_default()
    }

    fn merken(&self, aufruf: AudioAufruf) {
        if let Ok(mut aufrufe) = self.aufrufe.lock() {
            aufrufe.push(aufruf);
        }
    }
}

impl Default for AudioProtokoll {
    fn default() -> Self {
        Self::neu(true, 4)
    }
}

impl AudioSink for AudioProtokoll {
    fn start(&self) -> bool {
        self.merken(AudioAufruf::Start);
        self.startet
    }

    fn stop(&self) {
        self.merken(AudioAufruf::Stop);
    }

    fn setup_user_audio(&self, user: &str) {
        self.merken(AudioAufruf::Einrichten(user.to_string()));
    }

    fn delete_user_audio(&self, user: &str) {
        self.merken(AudioAufruf::Entfernen(user.to_string()));
    }

    fn play_voice(&self, user: &str, samples: Option<Vec<i16>>, ist_letzter: bool) {
        self.merken(AudioAufruf::Voice {
            user: user.to_string(),
            samples,
            ist_letzter,
        });
    }

    fn play_sound(&self, sound: SoundEvent) {
        self.merken(AudioAufruf::Ton(sound));
    }

    fn samples_pro_frame(&self) -> usize {
        self.samples_pro_frame
    }
}

/// Einstellungen im Speicher
#[derive(Default)]
pub struct SpeicherEinstellungen {
    profil: Mutex<Profile>,
    gespeichert: Mutex<Vec<Profile>>,
}

impl SpeicherEinstellungen {
    pub fn neu(profil: Profile) -> Self {
        Self {
            profil: Mutex::new(profil),
            gespeichert: Mutex::new(Vec::new()),
        }
    }

    pub fn gespeichert(&self) -> Vec<Profile> {
        self.gespeichert.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl SettingsStore for SpeicherEinstellungen {
    fn current_profile(&self) -> Profile {
        self.profil.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn save_profile(&self, profile: Profile) {
        if let Ok(mut gespeichert) = self.gespeichert.lock() {
            gespeichert.push(profile.clone());
        }
        if let Ok(mut profil) = self.profil.lock() {
            *profil = profile;
        }
    }
}

/// Alle drei Attrappen zusammen, mit Zugriff auf die Protokolle
pub struct Attrappen {
    pub ui: Arc<UiProtokoll>,
    pub audio: Arc<AudioProtokoll>,
    pub settings: Arc<SpeicherEinstellungen>,
}

impl Attrappen {
    pub fn neu() -> Self {
        Self::mit_profil(Profile {
            verbindungs_hinweise: true,
            ..Profile::default()
        })
    }

    pub fn mit_profil(profil: Profile) -> Self {
        Self {
            ui: Arc::new(UiProtokoll::default()),
            audio: Arc::new(AudioProtokoll::default()),
            settings: Arc::new(SpeicherEinstellungen::neu(profil)),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            ui: self.ui.clone(),
            audio: self.audio.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl Default for Attrappen {
    fn default() -> Self {
        Self::neu()
    }
}
