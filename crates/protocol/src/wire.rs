//! Wire-Format: Felder schreiben und lesen
//!
//! Das Protokoll kennt keinen generischen Frame-Header. Jede Nachricht
//! besteht aus einem Tag-Byte und Feldern fester oder praefixierter Laenge:
//!
//! ```text
//! Ganzzahlen   u8 / u16 / u32 / i32, little-endian in natuerlicher Breite
//! Kurztext     [len:1][bytes]            (ASCII/UTF-8)
//! Breittext    [zeichen:1][utf16le]      (Passwoerter)
//! Blob         [len:2][bytes]            (Chiffrat, Pakete)
//! ```
//!
//! `FrameWriter` baut ausgehende Nachrichten in einem wachsenden Puffer,
//! `FrameReader` liest bounds-geprueft aus einem bereits empfangenen Paket,
//! `StreamReader` liest Feld fuer Feld direkt vom Socket.

use bytes::{BufMut, Bytes, BytesMut};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use hush_core::HushError;

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Kodieren oder Dekodieren von Feldern
#[derive(Debug, Error)]
pub enum CodecError {
    /// Die deklarierte Laenge reicht ueber das Pufferende hinaus
    #[error("Feld '{feld}' braucht {benoetigt} Bytes, vorhanden sind {vorhanden}")]
    Unvollstaendig {
        feld: &'static str,
        benoetigt: usize,
        vorhanden: usize,
    },

    /// Die deklarierte Laenge ueberschreitet die Pufferkapazitaet
    #[error("Feld '{feld}' zu lang: {laenge} (Maximum: {maximum})")]
    ZuLang {
        feld: &'static str,
        laenge: usize,
        maximum: usize,
    },

    /// Text ist kein gueltiges UTF-8 / UTF-16
    #[error("Feld '{feld}' enthaelt ungueltigen Text")]
    UngueltigerText { feld: &'static str },

    /// Unbekanntes Tag-Byte
    #[error("Unbekannter Befehl: {0}")]
    UnbekannterBefehl(u8),

    /// Wert passt nicht zum Feld
    #[error("Ungueltiger Wert {wert} in Feld '{feld}'")]
    UngueltigerWert { feld: &'static str, wert: i64 },

    /// IO-Fehler beim Lesen vom Socket
    #[error("IO-Fehler: {0}")]
    Io(#[from] io::Error),
}

impl From<CodecError> for HushError {
    fn from(e: CodecError) -> Self {
        match e {
            // Abbruch mitten im Frame ist ein abgeschnittener Frame
            CodecError::Io(quelle) if quelle.kind() == io::ErrorKind::UnexpectedEof => {
                HushError::protokoll("Frame unvollstaendig – Verbindung mitten im Frame beendet")
            }
            CodecError::Io(quelle) => HushError::transport("Empfangen", quelle),
            andere => HushError::protokoll(andere.to_string()),
        }
    }
}

fn laenge_pruefen(feld: &'static str, laenge: usize, maximum: usize) -> Result<(), CodecError> {
    if laenge > maximum {
        return Err(CodecError::ZuLang {
            feld,
            laenge,
            maximum,
        });
    }
    Ok(())
}

fn text_aus(feld: &'static str, bytes: &[u8]) -> Result<String, CodecError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::UngueltigerText { feld })
}

/// Kodiert Text als UTF-16LE
pub fn utf16le_kodieren(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Dekodiert UTF-16LE bis zum ersten NUL-Zeichen (oder Pufferende)
///
/// Ein ungerades Restbyte wird ignoriert – es stammt aus dem Block-Padding.
pub fn utf16le_dekodieren(feld: &'static str, bytes: &[u8]) -> Result<String, CodecError> {
    let einheiten: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16(&einheiten).map_err(|_| CodecError::UngueltigerText { feld })
}

// ---------------------------------------------------------------------------
// FrameWriter
// ---------------------------------------------------------------------------

/// Baut eine ausgehende Nachricht Feld fuer Feld
#[derive(Debug, Default)]
pub struct FrameWriter {
    buf: BytesMut,
}

impl FrameWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Beginnt eine Nachricht mit einem Tag-Byte
    pub fn mit_tag(tag: u8) -> Self {
        let mut w = Self::new();
        w.u8(tag);
        w
    }

    pub fn u8(&mut self, wert: u8) -> &mut Self {
        self.buf.put_u8(wert);
        self
    }

    pub fn i8(&mut self, wert: i8) -> &mut Self {
        self.buf.put_i8(wert);
        self
    }

    pub fn u16(&mut self, wert: u16) -> &mut Self {
        self.buf.put_u16_le(wert);
        self
    }

    pub fn u32(&mut self, wert: u32) -> &mut Self {
        self.buf.put_u32_le(wert);
        self
    }

    pub fn i32(&mut self, wert: i32) -> &mut Self {
        self.buf.put_i32_le(wert);
        self
    }

    /// Rohe Bytes ohne Laengenpraefix
    pub fn roh(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    /// `[len:1][bytes]`
    pub fn kurztext(&mut self, feld: &'static str, text: &str) -> Result<&mut Self, CodecError> {
        laenge_pruefen(feld, text.len(), u8::MAX as usize)?;
        self.buf.put_u8(text.len() as u8);
        self.buf.put_slice(text.as_bytes());
        Ok(self)
    }

    /// `[zeichen:1][utf16le]` – das Praefix zaehlt UTF-16-Einheiten
    pub fn breittext(&mut self, feld: &'static str, text: &str) -> Result<&mut Self, CodecError> {
        let kodiert = utf16le_kodieren(text);
        let zeichen = kodiert.len() / 2;
        laenge_pruefen(feld, zeichen, u8::MAX as usize)?;
        self.buf.put_u8(zeichen as u8);
        self.buf.put_slice(&kodiert);
        Ok(self)
    }

    /// `[len:2][bytes]`
    pub fn blob(&mut self, feld: &'static str, bytes: &[u8]) -> Result<&mut Self, CodecError> {
        laenge_pruefen(feld, bytes.len(), u16::MAX as usize)?;
        self.buf.put_u16_le(bytes.len() as u16);
        self.buf.put_slice(bytes);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Schliesst die Nachricht ab
    pub fn fertig(self) -> Bytes {
        self.buf.freeze()
    }
}

// ---------------------------------------------------------------------------
// FrameReader
// ---------------------------------------------------------------------------

/// Liest Felder bounds-geprueft aus einem empfangenen Paket
#[derive(Debug, Clone)]
pub struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Verbleibende Bytes
    pub fn rest_laenge(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn ist_leer(&self) -> bool {
        self.rest_laenge() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn nehmen(&mut self, feld: &'static str, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.rest_laenge() {
            return Err(CodecError::Unvollstaendig {
                feld,
                benoetigt: n,
                vorhanden: self.rest_laenge(),
            });
        }
        let teil = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(teil)
    }

    pub fn u8(&mut self, feld: &'static str) -> Result<u8, CodecError> {
        Ok(self.nehmen(feld, 1)?[0])
    }

    pub fn u16(&mut self, feld: &'static str) -> Result<u16, CodecError> {
        let b = self.nehmen(feld, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self, feld: &'static str) -> Result<u32, CodecError> {
        let b = self.nehmen(feld, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn i32(&mut self, feld: &'static str) -> Result<i32, CodecError> {
        let b = self.nehmen(feld, 4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Genau `n` Bytes
    pub fn bytes(&mut self, feld: &'static str, n: usize) -> Result<&'a [u8], CodecError> {
        self.nehmen(feld, n)
    }

    /// `[len:1][bytes]` mit Obergrenze
    pub fn kurztext(&mut self, feld: &'static str, maximum: usize) -> Result<String, CodecError> {
        let laenge = self.u8(feld)? as usize;
        laenge_pruefen(feld, laenge, maximum)?;
        text_aus(feld, self.nehmen(feld, laenge)?)
    }

    /// `[zeichen:1][utf16le]`
    pub fn breittext(&mut self, feld: &'static str) -> Result<String, CodecError> {
        let zeichen = self.u8(feld)? as usize;
        utf16le_dekodieren(feld, self.nehmen(feld, zeichen * 2)?)
    }

    /// `[len:2][bytes]` mit Obergrenze
    pub fn blob(&mut self, feld: &'static str, maximum: usize) -> Result<&'a [u8], CodecError> {
        let laenge = self.u16(feld)? as usize;
        laenge_pruefen(feld, laenge, maximum)?;
        self.nehmen(feld, laenge)
    }

    /// Alle restlichen Bytes
    pub fn rest(&mut self) -> &'a [u8] {
        let teil = &self.buf[self.pos..];
        self.pos = self.buf.len();
        teil
    }
}

// ---------------------------------------------------------------------------
// StreamReader
// ---------------------------------------------------------------------------

/// Liest Felder direkt aus einem `AsyncRead`
///
/// Jede Laengenangabe wird vor dem Lesen gegen die Kapazitaet geprueft,
/// damit ein fehlerhafter Server keinen beliebig grossen Puffer erzwingt.
pub struct StreamReader<'a, R> {
    inner: &'a mut R,
}

impl<'a, R> StreamReader<'a, R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(inner: &'a mut R) -> Self {
        Self { inner }
    }

    pub async fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.inner.read_u8().await?)
    }

    pub async fn u16(&mut self) -> Result<u16, CodecError> {
        Ok(self.inner.read_u16_le().await?)
    }

    pub async fn u32(&mut self) -> Result<u32, CodecError> {
        Ok(self.inner.read_u32_le().await?)
    }

    pub async fn i16(&mut self) -> Result<i16, CodecError> {
        Ok(self.inner.read_i16_le().await?)
    }

    pub async fn i32(&mut self) -> Result<i32, CodecError> {
        Ok(self.inner.read_i32_le().await?)
    }

    /// Genau `n` Bytes, hoechstens `maximum`
    pub async fn bytes(
        &mut self,
        feld: &'static str,
        n: usize,
        maximum: usize,
    ) -> Result<Vec<u8>, CodecError> {
        laenge_pruefen(feld, n, maximum)?;
        let mut puffer = vec![0u8; n];
        self.inner.read_exact(&mut puffer).await?;
        Ok(puffer)
    }

    /// `[len:1][bytes]` als Text
    pub async fn kurztext(
        &mut self,
        feld: &'static str,
        maximum: usize,
    ) -> Result<String, CodecError> {
        let laenge = self.u8().await? as usize;
        let bytes = self.bytes(feld, laenge, maximum).await?;
        text_aus(feld, &bytes)
    }

    /// `[len:1][bytes]` roh
    pub async fn kurzpaket(
        &mut self,
        feld: &'static str,
        maximum: usize,
    ) -> Result<Vec<u8>, CodecError> {
        let laenge = self.u8().await? as usize;
        self.bytes(feld, laenge, maximum).await
    }

    /// `[len:2][bytes]`
    pub async fn blob(&mut self, feld: &'static str, maximum: usize) -> Result<Vec<u8>, CodecError> {
        let laenge = self.u16().await? as usize;
        self.bytes(feld, laenge, maximum).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
