//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, sodass der Client auch ohne Konfigurationsdatei startet.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server und Anmeldedaten
    pub verbindung: VerbindungsEinstellungen,
    /// Keepalive, Lebenszeichen und Trennen
    pub zeitsteuerung: ZeitEinstellungen,
    /// Voice-Kanal
    pub voice: VoiceEinstellungen,
    /// Darstellung
    pub anzeige: AnzeigeEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Server und Anmeldedaten
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbindungsEinstellungen {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Server-Passwort (leer = keins)
    pub passwort: Option<String>,
    /// Versionsstring fuer den Handshake
    pub client_version: String,
    pub connect_timeout_ms: u64,
}

impl Default for VerbindungsEinstellungen {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 51337,
            username: String::new(),
            passwort: None,
            client_version: env!("CARGO_PKG_VERSION").into(),
            connect_timeout_ms: 10_000,
        }
    }
}

/// Keepalive, Lebenszeichen und Trennen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeitEinstellungen {
    /// Erwarteter Abstand der Keepalives des Servers
    pub keepalive_intervall_ms: u64,
    /// Wie oft der Lebenszeichen-Monitor prueft
    pub pruef_intervall_ms: u64,
    /// Leseversuche beim geordneten Trennen
    pub trenn_versuche: u32,
    pub trenn_intervall_ms: u64,
}

impl Default for ZeitEinstellungen {
    fn default() -> Self {
        Self {
            keepalive_intervall_ms: 45_000,
            pruef_intervall_ms: 2_000,
            trenn_versuche: 5,
            trenn_intervall_ms: 250,
        }
    }
}

/// Voice-Kanal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceEinstellungen {
    /// Kapazitaet der Wiedergabe-Queue in Frames
    pub warteschlange: usize,
}

impl Default for VoiceEinstellungen {
    fn default() -> Self {
        Self { warteschlange: 64 }
    }
}

/// Darstellung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnzeigeEinstellungen {
    /// Hinweise bei Verbinden/Trennen anderer Benutzer
    pub verbindungs_hinweise: bool,
}

impl Default for AnzeigeEinstellungen {
    fn default() -> Self {
        Self {
            verbindungs_hinweise: true,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Zeitwerte der Sitzung als `Duration`
    pub fn zeiten(&self) -> SitzungsZeiten {
        let z = &self.zeitsteuerung;
        SitzungsZeiten {
            connect_timeout: Duration::from_millis(self.verbindung.connect_timeout_ms),
            keepalive_intervall: Duration::from_millis(z.keepalive_intervall_ms),
            pruef_intervall: Duration::from_millis(z.pruef_intervall_ms),
            trenn_versuche: z.trenn_versuche,
            trenn_intervall: Duration::from_millis(z.trenn_intervall_ms),
            warteschlange: self.voice.warteschlange,
        }
    }
}

/// Zeitwerte und Groessen, die die Sitzungssteuerung braucht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SitzungsZeiten {
    pub connect_timeout: Duration,
    pub keepalive_intervall: Duration,
    pub pruef_intervall: Duration,
    pub trenn_versuche: u32,
    pub trenn_intervall: Duration,
    pub warteschlange: usize,
}

impl SitzungsZeiten {
    /// Frist ohne empfangenen Frame, nach der die Verbindung als verloren gilt
    pub fn lebenszeichen_frist(&self) -> Duration {
        self.keepalive_intervall * 3
    }
}

impl Default for SitzungsZeiten {
    fn default() -> Self {
        ClientConfig::default().zeiten()
    }
}
