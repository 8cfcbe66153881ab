//! Medienkanal-Protokoll (UDP)
//!
//! Das erste Byte jedes Datagramms unterscheidet die Paketart:
//!
//! ```text
//! Client -> Server
//!   [-1][nlen:1][name]          Vorbereitung (Name des lokalen Benutzers)
//!   [-3]                        bereit fuer Ping-Messung
//!   [1]                         letzter Voice-Frame
//!   [2][enclen:2][chiffrat]     Voice-Frame
//!
//! Server -> Client
//!   [0 | -2][...]               Ping-Probe, wird unveraendert zurueckgeschickt
//!   [nlen:1][name][letzter:1]   Voice-Frame-Ende eines Absenders (letzter = 1)
//!   [nlen:1][name][2][enclen:2][chiffrat]
//! ```

use bytes::Bytes;

use crate::wire::{CodecError, FrameReader, FrameWriter};
use crate::{MAX_BUFFER_SIZE, MAX_NAME_LENGTH};

// ---------------------------------------------------------------------------
// Marker
// ---------------------------------------------------------------------------

/// Marker-Bytes des Medienkanals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum UdpMarker {
    Vorbereiten = -1,
    Ping = 0,
    ErsterPing = -2,
    Bereit = -3,
    VoiceLetzter = 1,
    VoiceWeitere = 2,
}

impl UdpMarker {
    pub fn als_byte(self) -> u8 {
        self as i8 as u8
    }
}

// ---------------------------------------------------------------------------
// Eingehende Datagramme
// ---------------------------------------------------------------------------

/// Geparstes Datagramm vom Server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceDatagram {
    /// Ping-Probe; das Datagramm geht unveraendert zurueck
    PingProbe,
    /// Voice-Frame eines anderen Benutzers
    Voice {
        absender: String,
        letzter: bool,
        /// Leer wenn `letzter`
        chiffrat: Vec<u8>,
    },
}

impl VoiceDatagram {
    pub fn parsen(datagramm: &[u8]) -> Result<Self, CodecError> {
        let mut r = FrameReader::new(datagramm);
        let erstes = r.u8("marker")? as i8;

        if erstes == UdpMarker::Ping as i8 || erstes == UdpMarker::ErsterPing as i8 {
            return Ok(Self::PingProbe);
        }
        if erstes < 0 || erstes as usize > MAX_NAME_LENGTH {
            return Err(CodecError::UngueltigerWert {
                feld: "marker",
                wert: erstes as i64,
            });
        }

        let name = r.bytes("absender", erstes as usize)?;
        let absender = String::from_utf8(name.to_vec())
            .map_err(|_| CodecError::UngueltigerText { feld: "absender" })?;

        let letzter = r.u8("letzter")? == UdpMarker::VoiceLetzter as u8;
        let chiffrat = if letzter {
            Vec::new()
        } else {
            r.blob("voice_chiffrat", MAX_BUFFER_SIZE)?.to_vec()
        };

        Ok(Self::Voice {
            absender,
            letzter,
            chiffrat,
        })
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Datagramme
// ---------------------------------------------------------------------------

/// `[-1][nlen:1][name]`
pub fn vorbereiten(name: &str) -> Result<Bytes, CodecError> {
    let mut w = FrameWriter::mit_tag(UdpMarker::Vorbereiten.als_byte());
    w.kurztext("name", name)?;
    Ok(w.fertig())
}

/// `[-3]`
pub fn bereit() -> Bytes {
    FrameWriter::mit_tag(UdpMarker::Bereit.als_byte()).fertig()
}

/// `[1]`
pub fn letzter_frame() -> Bytes {
    FrameWriter::mit_tag(UdpMarker::VoiceLetzter.als_byte()).fertig()
}

/// `[2][enclen:2][chiffrat]`
pub fn voice_frame(chiffrat: &[u8]) -> Result<Bytes, CodecError> {
    let groesse = 3 + chiffrat.len();
    if groesse > MAX_BUFFER_SIZE {
        return Err(CodecError::ZuLang {
            feld: "voice_frame",
            laenge: groesse,
            maximum: MAX_BUFFER_SIZE,
        });
    }
    let mut w = FrameWriter::mit_tag(UdpMarker::VoiceWeitere.als_byte());
    w.blob("voice_chiffrat", chiffrat)?;
    Ok(w.fertig())
}
