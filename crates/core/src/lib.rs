//! hush-core – Gemeinsame Typen, Collaborator-Traits und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die alle anderen Hush-Crates
//! gemeinsam nutzen: die Fehler-Taxonomie, den Sitzungszustand, die
//! Ereignisse an UI/Sitzungssteuerung und die Schnittstellen zu den
//! externen Collaborators (UI, Audio, Einstellungen).

pub mod collaborator;
pub mod error;
pub mod event;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-Exporte fuer bequemen Zugriff
pub use collaborator::{AudioSink, Collaborators, SettingsStore, UiSink};
pub use error::{HushError, Result};
pub use event::{SessionSignal, UiEvent};
pub use types::{
    ControlsState, DisconnectReason, Profile, RejectReason, SessionPhase, SoundEvent,
};
