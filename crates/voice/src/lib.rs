//! hush-voice – UDP-Medienkanal des Hush-Clients
//!
//! ## Module
//! - [`udp`] – Socket zum Server, Ping-Echo, Voice-Frames senden und empfangen
//! - [`playback`] – Queue zwischen Empfang und Audio-Collaborator

pub mod playback;
pub mod udp;

pub use playback::{Wiedergabe, WiedergabeAuftrag};
pub use udp::MediaChannel;
