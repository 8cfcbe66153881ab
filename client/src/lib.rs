//! hush-client – Sitzungssteuerung, Konfiguration und Konsolen-Frontend
//!
//! `Session` verbindet die Bausteine der anderen Crates: Handshake und
//! Steuerkanal aus `hush-signaling`, den Medienkanal aus `hush-voice` und
//! den Lebenszeichen-Monitor aus diesem Crate.

pub mod config;
pub mod konsole;
pub mod liveness;
pub mod logging;
pub mod session;
pub mod settings;

pub use config::{ClientConfig, SitzungsZeiten};
pub use session::{Session, Verbindungsdaten};
pub use settings::ConfigSettings;
