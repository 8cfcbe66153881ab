//! Einstellungen aus der Konfigurationsdatei
//!
//! Das Profil wird aus `ClientConfig` vorbelegt. Nach einer erfolgreichen
//! Verbindung speichert die Sitzung die verwendeten Daten hier ab; ein
//! naechster Verbindungsversuch im selben Prozess startet damit.

use parking_lot::Mutex;

use hush_core::{Profile, SettingsStore};

use crate::config::ClientConfig;

/// `SettingsStore` auf Basis der geladenen Konfiguration
pub struct ConfigSettings {
    profil: Mutex<Profile>,
}

impl ConfigSettings {
    pub fn aus_config(config: &ClientConfig) -> Self {
        let v = &config.verbindung;
        Self {
            profil: Mutex::new(Profile {
                username: v.username.clone(),
                host: v.host.clone(),
                port: v.port,
                passwort: v.passwort.clone().filter(|p| !p.is_empty()),
                verbindungs_hinweise: config.anzeige.verbindungs_hinweise,
            }),
        }
    }
}

impl SettingsStore for ConfigSettings {
    fn current_profile(&self) -> Profile {
        self.profil.lock().clone()
    }

    fn save_profile(&self, profile: Profile) {
        tracing::debug!(
            username = %profile.username,
            host = %profile.host,
            port = profile.port,
            "Profil gespeichert"
        );
        *self.profil.lock() = profile;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profil_aus_config() {
        let mut cfg = ClientConfig::default();
        cfg.verbindung.username = "bob".into();
        cfg.verbindung.passwort = Some(String::new());
        cfg.anzeige.verbindungs_hinweise = false;

        let profil = ConfigSettings::aus_config(&cfg).current_profile();
        assert_eq!(profil.username, "bob");
        assert_eq!(profil.port, 51337);
        assert!(profil.passwort.is_none());
        assert!(!profil.verbindungs_hinweise);
    }

    #[test]
    fn speichern_ueberschreibt_profil() {
        let settings = ConfigSettings::aus_config(&ClientConfig::default());
        settings.save_profile(Profile {
            username: "eve".into(),
            host: "10.0.0.1".into(),
            port: 4000,
            passwort: None,
            verbindungs_hinweise: true,
        });
        assert_eq!(settings.current_profile().username, "eve");
        assert_eq!(settings.current_profile().port, 4000);
    }
}
