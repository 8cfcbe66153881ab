//! hush-signaling – TCP-Steuerkanal und Presence
//!
//! Dieser Crate baut die Verbindung zum Chat-Server auf, fuehrt den
//! Handshake samt Schluesselaustausch durch und betreibt danach die
//! Empfangsschleife des Steuerkanals.
//!
//! ## Architektur
//!
//! ```text
//! handshake::verbinden / handshake_durchfuehren
//!     |  Connecting -> AwaitingServerInfo -> ExchangingKeys -> SyncingPresence
//!     v
//! ControlChannel (Lese-Mutex pro Frame, Stop-Watch, ActivityClock)
//!     |
//!     v
//! CommandDispatcher
//!     +-- Presence        (Raeume und Benutzer)
//!     +-- Collaborators   (UI, Audio, Einstellungen)
//!     +-- SessionSignal   (an die Sitzungssteuerung)
//! ```

pub mod aktivitaet;
pub mod channel;
pub mod dispatcher;
pub mod handshake;
pub mod presence;

// Bequeme Re-Exporte
pub use aktivitaet::ActivityClock;
pub use channel::{chat_klartext_pruefen, ControlChannel, LoopEnde, TrennErgebnis};
pub use dispatcher::CommandDispatcher;
pub use handshake::{handshake_durchfuehren, verbinden, HandshakeAnfrage, HandshakeErgebnis};
pub use presence::{Benutzer, Presence, PresenceError, Raum};
