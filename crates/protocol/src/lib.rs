//! hush-protocol – Binaeres Wire-Protokoll
//!
//! Dieses Crate definiert die Feldkodierung (`wire`), die Befehle des
//! TCP-Steuerkanals (`control`) und die Datagramme des UDP-Medienkanals
//! (`voice`). Es fuehrt selbst keine Netzwerk-I/O aus, ausser dem
//! feldweisen Lesen aus einem uebergebenen `AsyncRead`.

pub mod control;
pub mod voice;
pub mod wire;

pub use control::{CommandTag, ConnectResponse, PresenceSnapshot, ServerCommand};
pub use voice::{UdpMarker, VoiceDatagram};
pub use wire::{CodecError, FrameReader, FrameWriter, StreamReader};

// ---------------------------------------------------------------------------
// Protokoll-Grenzen
// ---------------------------------------------------------------------------

/// Maximale Laenge von Benutzer- und Raumnamen
pub const MAX_NAME_LENGTH: usize = 20;

/// Maximale Laenge des Versionsstrings
pub const MAX_VERSION_STRING_LENGTH: usize = 20;

/// Maximale Laenge einer Chat-Nachricht (UTF-16-Bytes, vor Verschluesselung)
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Puffergroesse fuer UDP-Datagramme und Server-Nachrichten
pub const MAX_BUFFER_SIZE: usize = 1450;

/// Puffergroesse fuer TCP-Pakete (Chat, Ping-Bericht, Raum-Snapshot)
pub const MAX_TCP_BUFFER_SIZE: usize = 8192;

/// Maximale Laenge des dezimalen Diffie-Hellman-Werts
pub const MAX_KEY_LENGTH: usize = 1000;
