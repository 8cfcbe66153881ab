//! Steuerkanal-Protokoll (TCP)
//!
//! ## Handshake
//!
//! ```text
//! Client -> Server  [vlen:1][version][nlen:1][name][pzeichen:1][passwort utf16le]
//! Server -> Client  [antwort:1]
//!
//! antwort = 4 (Server-Info):
//!   [paketlen:2][Raum-Snapshot][p:4][g:4][publen:2][oeffentlicher Wert dezimal]
//! Client -> Server  [len:2][eigener oeffentlicher Wert dezimal]
//! Client -> Server  [99]   Server -> Client  [99]     (Gleichtakt)
//! ```
//!
//! ## Raum-Snapshot
//!
//! ```text
//! [raeume:1] { [nlen:1][name][max:2][anzahl:2] { [nlen:1][name] }* }*
//! ```
//!
//! Im Betrieb liest der Client ein Tag-Byte und danach die Felder des
//! jeweiligen `ServerCommand`.

use bytes::Bytes;
use tokio::io::AsyncRead;

use hush_core::DisconnectReason;

use crate::wire::{utf16le_kodieren, CodecError, FrameReader, FrameWriter, StreamReader};
use crate::{
    MAX_BUFFER_SIZE, MAX_KEY_LENGTH, MAX_NAME_LENGTH, MAX_TCP_BUFFER_SIZE,
    MAX_VERSION_STRING_LENGTH,
};

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Antwortbyte des Servers auf den Handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectResponse {
    NameVergeben = 0,
    ServerVoll = 2,
    FalscheVersion = 3,
    ServerInfo = 4,
    PasswortNoetig = 5,
}

impl ConnectResponse {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::NameVergeben),
            2 => Some(Self::ServerVoll),
            3 => Some(Self::FalscheVersion),
            4 => Some(Self::ServerInfo),
            5 => Some(Self::PasswortNoetig),
            _ => None,
        }
    }
}

/// Tag-Bytes der Befehle vom Server an den Client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandTag {
    NeuerBenutzer = 0,
    BenutzerWeg = 1,
    VoiceBereit = 2,
    SpamHinweis = 3,
    PingBericht = 8,
    KeepAlive = 9,
    ChatNachricht = 10,
    Gekickt = 11,
    PasswortSperre = 12,
    ServerNachricht = 13,
    RaumBetretbar = 20,
    RaumVoll = 21,
    RaumPasswortNoetig = 22,
    RaumPasswortFalsch = 23,
    BenutzerBetrittRaum = 25,
    RaumVerschoben = 26,
    RaumGeloescht = 27,
    RaumErstellt = 28,
    RaumGeaendert = 29,
}

impl CommandTag {
    pub fn from_u8(byte: u8) -> Option<Self> {
        let tag = match byte {
            0 => Self::NeuerBenutzer,
            1 => Self::BenutzerWeg,
            2 => Self::VoiceBereit,
            3 => Self::SpamHinweis,
            8 => Self::PingBericht,
            9 => Self::KeepAlive,
            10 => Self::ChatNachricht,
            11 => Self::Gekickt,
            12 => Self::PasswortSperre,
            13 => Self::ServerNachricht,
            20 => Self::RaumBetretbar,
            21 => Self::RaumVoll,
            22 => Self::RaumPasswortNoetig,
            23 => Self::RaumPasswortFalsch,
            25 => Self::BenutzerBetrittRaum,
            26 => Self::RaumVerschoben,
            27 => Self::RaumGeloescht,
            28 => Self::RaumErstellt,
            29 => Self::RaumGeaendert,
            _ => return None,
        };
        Some(tag)
    }
}

/// Tag-Bytes der Nachrichten vom Client an den Server
pub mod client_tag {
    /// Antwort auf ein Keep-Alive
    pub const KEEPALIVE_ACK: u8 = 9;
    /// Chat-Nachricht
    pub const CHAT_NACHRICHT: u8 = 10;
    /// Raum betreten
    pub const RAUM_BETRETEN: u8 = 15;
    /// Raum mit Passwort betreten
    pub const RAUM_BETRETEN_MIT_PASSWORT: u8 = 16;
    /// Gleichtakt-Byte am Ende des Handshakes
    pub const SYNC: u8 = 99;
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Kodiert die erste Nachricht an den Server
pub fn handshake_kodieren(
    version: &str,
    name: &str,
    passwort: Option<&str>,
) -> Result<Bytes, CodecError> {
    if version.len() > MAX_VERSION_STRING_LENGTH {
        return Err(CodecError::ZuLang {
            feld: "version",
            laenge: version.len(),
            maximum: MAX_VERSION_STRING_LENGTH,
        });
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(CodecError::ZuLang {
            feld: "name",
            laenge: name.len(),
            maximum: MAX_NAME_LENGTH,
        });
    }

    let mut w = FrameWriter::new();
    w.kurztext("version", version)?
        .kurztext("name", name)?
        .breittext("passwort", passwort.unwrap_or(""))?;
    Ok(w.fertig())
}

/// Kopf der Server-Info: DH-Parameter und der noch ungeparste Snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Raum-Snapshot, wird erst nach dem Gleichtakt-Byte geparst
    pub snapshot_paket: Vec<u8>,
    /// Primzahl p
    pub p: u32,
    /// Generator g
    pub g: u32,
    /// Oeffentlicher Wert des Servers als Dezimalstring
    pub oeffentlich: String,
}

impl ServerInfo {
    /// Liest die Server-Info nach dem Antwortbyte 4
    pub async fn lesen<R>(reader: &mut R) -> Result<Self, CodecError>
    where
        R: AsyncRead + Unpin,
    {
        let mut r = StreamReader::new(reader);
        let snapshot_paket = r.blob("snapshot", MAX_TCP_BUFFER_SIZE).await?;
        let p = r.u32().await?;
        let g = r.u32().await?;

        let laenge = r.i16().await?;
        if laenge <= 0 {
            return Err(CodecError::UngueltigerWert {
                feld: "oeffentlicher_wert",
                wert: laenge as i64,
            });
        }
        let bytes = r
            .bytes("oeffentlicher_wert", laenge as usize, MAX_KEY_LENGTH)
            .await?;
        let oeffentlich = String::from_utf8(bytes).map_err(|_| CodecError::UngueltigerText {
            feld: "oeffentlicher_wert",
        })?;

        Ok(Self {
            snapshot_paket,
            p,
            g,
            oeffentlich,
        })
    }
}

/// `[len:2][dezimal]` – eigener oeffentlicher Wert
pub fn schluessel_antwort(oeffentlich: &str) -> Result<Bytes, CodecError> {
    let mut w = FrameWriter::new();
    w.blob("oeffentlicher_wert", oeffentlich.as_bytes())?;
    Ok(w.fertig())
}

// ---------------------------------------------------------------------------
// Raum-Snapshot
// ---------------------------------------------------------------------------

/// Ein Raum aus dem initialen Snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRaum {
    pub name: String,
    pub max_benutzer: u16,
    pub benutzer: Vec<String>,
}

/// Initialer Zustand aller Raeume; der erste ist der Willkommensraum
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresenceSnapshot {
    pub raeume: Vec<SnapshotRaum>,
}

impl PresenceSnapshot {
    pub fn parsen(paket: &[u8]) -> Result<Self, CodecError> {
        let mut r = FrameReader::new(paket);
        let anzahl = r.u8("raum_anzahl")?;
        let mut raeume = Vec::with_capacity(anzahl as usize);

        for _ in 0..anzahl {
            let name = r.kurztext("raum_name", MAX_NAME_LENGTH)?;
            let max_benutzer = r.u16("max_benutzer")?;
            let mitglieder = r.u16("benutzer_anzahl")?;
            let benutzer = (0..mitglieder)
                .map(|_| r.kurztext("benutzer_name", MAX_NAME_LENGTH))
                .collect::<Result<Vec<_>, _>>()?;
            raeume.push(SnapshotRaum {
                name,
                max_benutzer,
                benutzer,
            });
        }

        Ok(Self { raeume })
    }

    /// Anzahl der Benutzer im Snapshot (ohne den lokalen Benutzer)
    pub fn benutzer_anzahl(&self) -> usize {
        self.raeume.iter().map(|r| r.benutzer.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Befehle vom Server
// ---------------------------------------------------------------------------

/// Ping eines Benutzers aus einem Ping-Bericht
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingEintrag {
    pub name: String,
    pub ping_ms: u16,
}

/// Vollstaendig gelesener Befehl vom Server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    NeuerBenutzer {
        online: u32,
        name: String,
    },
    BenutzerWeg {
        grund: DisconnectReason,
        online: u32,
        name: String,
    },
    VoiceBereit,
    SpamHinweis,
    PingBericht(Vec<PingEintrag>),
    KeepAlive,
    ChatNachricht {
        /// "HH:MM. Name: "
        kopf: String,
        chiffrat: Vec<u8>,
    },
    Gekickt,
    PasswortSperre,
    ServerNachricht(String),
    RaumBetretbar {
        raum: String,
    },
    RaumVoll,
    RaumPasswortNoetig {
        raum: String,
    },
    RaumPasswortFalsch,
    BenutzerBetrittRaum {
        benutzer: String,
        raum: String,
    },
    RaumVerschoben {
        raum: String,
        nach_oben: bool,
    },
    RaumGeloescht {
        raum: String,
    },
    RaumErstellt {
        raum: String,
        max_benutzer: u32,
    },
    RaumGeaendert {
        alter_name: String,
        neuer_name: String,
        max_benutzer: u32,
    },
}

impl ServerCommand {
    /// Liest die Felder des Befehls zum bereits gelesenen Tag
    pub async fn lesen<R>(tag: CommandTag, reader: &mut R) -> Result<Self, CodecError>
    where
        R: AsyncRead + Unpin,
    {
        let mut r = StreamReader::new(reader);
        let befehl = match tag {
            CommandTag::NeuerBenutzer => {
                let paket = r
                    .kurzpaket("neuer_benutzer", NEUER_BENUTZER_MAXIMUM)
                    .await?;
                neuer_benutzer_parsen(&paket)?
            }
            CommandTag::BenutzerWeg => {
                let grund_byte = r.u8().await?;
                let grund =
                    DisconnectReason::from_u8(grund_byte).ok_or(CodecError::UngueltigerWert {
                        feld: "trenngrund",
                        wert: grund_byte as i64,
                    })?;
                let paket = r.kurzpaket("benutzer_weg", BENUTZER_WEG_MAXIMUM).await?;
                benutzer_weg_parsen(grund, &paket)?
            }
            CommandTag::VoiceBereit => Self::VoiceBereit,
            CommandTag::SpamHinweis => Self::SpamHinweis,
            CommandTag::PingBericht => {
                let paket = r.blob("ping_bericht", MAX_TCP_BUFFER_SIZE).await?;
                Self::PingBericht(ping_bericht_parsen(&paket)?)
            }
            CommandTag::KeepAlive => Self::KeepAlive,
            CommandTag::ChatNachricht => {
                let paket = r.blob("chat", MAX_TCP_BUFFER_SIZE).await?;
                chat_parsen(&paket)?
            }
            CommandTag::Gekickt => Self::Gekickt,
            CommandTag::PasswortSperre => Self::PasswortSperre,
            CommandTag::ServerNachricht => {
                let bytes = r.blob("server_nachricht", MAX_BUFFER_SIZE).await?;
                let text = String::from_utf8_lossy(&bytes)
                    .trim_end_matches('\0')
                    .to_string();
                Self::ServerNachricht(text)
            }
            CommandTag::RaumBetretbar => Self::RaumBetretbar {
                raum: r.kurztext("raum", MAX_NAME_LENGTH).await?,
            },
            CommandTag::RaumVoll => Self::RaumVoll,
            CommandTag::RaumPasswortNoetig => Self::RaumPasswortNoetig {
                raum: r.kurztext("raum", MAX_NAME_LENGTH).await?,
            },
            CommandTag::RaumPasswortFalsch => Self::RaumPasswortFalsch,
            CommandTag::BenutzerBetrittRaum => {
                let benutzer = r.kurztext("benutzer", MAX_NAME_LENGTH).await?;
                let raum = r.kurztext("raum", MAX_NAME_LENGTH).await?;
                Self::BenutzerBetrittRaum { benutzer, raum }
            }
            CommandTag::RaumVerschoben => {
                let raum = r.kurztext("raum", MAX_NAME_LENGTH).await?;
                let nach_oben = r.u8().await? != 0;
                Self::RaumVerschoben { raum, nach_oben }
            }
            CommandTag::RaumGeloescht => Self::RaumGeloescht {
                raum: r.kurztext("raum", MAX_NAME_LENGTH).await?,
            },
            CommandTag::RaumErstellt => {
                let raum = r.kurztext("raum", MAX_NAME_LENGTH).await?;
                let max_benutzer = r.u32().await?;
                Self::RaumErstellt { raum, max_benutzer }
            }
            CommandTag::RaumGeaendert => {
                let alter_name = r.kurztext("alter_name", MAX_NAME_LENGTH).await?;
                let neuer_name = r.kurztext("neuer_name", MAX_NAME_LENGTH).await?;
                let max_benutzer = r.u32().await?;
                Self::RaumGeaendert {
                    alter_name,
                    neuer_name,
                    max_benutzer,
                }
            }
        };
        Ok(befehl)
    }
}

/// Obergrenzen der Benutzer-Pakete; Server haengen teils ein NUL oder Fuellbytes an
const NEUER_BENUTZER_MAXIMUM: usize = MAX_NAME_LENGTH + 11;
const BENUTZER_WEG_MAXIMUM: usize = MAX_NAME_LENGTH + 15;

/// Name bis zum ersten NUL, hoechstens `MAX_NAME_LENGTH` Bytes
fn name_aus_rest(feld: &'static str, rest: &[u8]) -> Result<String, CodecError> {
    let ende = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    if ende > MAX_NAME_LENGTH {
        return Err(CodecError::ZuLang {
            feld,
            laenge: ende,
            maximum: MAX_NAME_LENGTH,
        });
    }
    String::from_utf8(rest[..ende].to_vec()).map_err(|_| CodecError::UngueltigerText { feld })
}

/// `[online:4][nlen:1][name]` – nlen darf ein abschliessendes NUL mitzaehlen,
/// Bytes nach dem Namen werden ignoriert
pub fn neuer_benutzer_parsen(paket: &[u8]) -> Result<ServerCommand, CodecError> {
    let mut r = FrameReader::new(paket);
    let online = r.u32("online")?;
    let laenge = r.u8("name")? as usize;
    let name = name_aus_rest("name", r.bytes("name", laenge)?)?;
    Ok(ServerCommand::NeuerBenutzer { online, name })
}

/// `[online:4][name…]` – der Name reicht bis zum NUL oder Paketende
pub fn benutzer_weg_parsen(
    grund: DisconnectReason,
    paket: &[u8],
) -> Result<ServerCommand, CodecError> {
    let mut r = FrameReader::new(paket);
    let online = r.u32("online")?;
    let name = name_aus_rest("name", r.rest())?;
    Ok(ServerCommand::BenutzerWeg {
        grund,
        online,
        name,
    })
}

/// Wiederholt `[nlen:1][name][ping:2]` bis das Paket verbraucht ist
pub fn ping_bericht_parsen(paket: &[u8]) -> Result<Vec<PingEintrag>, CodecError> {
    let mut r = FrameReader::new(paket);
    let mut eintraege = Vec::new();
    while !r.ist_leer() {
        let name = r.kurztext("name", MAX_NAME_LENGTH)?;
        let ping_ms = r.u16("ping")?;
        eintraege.push(PingEintrag { name, ping_ms });
    }
    Ok(eintraege)
}

/// `"HH:MM. Name: "[enclen:2][chiffrat]`
///
/// Der Kopf endet zwei Zeichen nach dem zweiten Doppelpunkt.
pub fn chat_parsen(paket: &[u8]) -> Result<ServerCommand, CodecError> {
    let zweiter_doppelpunkt = paket
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b':')
        .nth(1)
        .map(|(i, _)| i)
        .ok_or(CodecError::Unvollstaendig {
            feld: "chat_kopf",
            benoetigt: 2,
            vorhanden: 0,
        })?;

    let mut r = FrameReader::new(paket);
    let kopf_bytes = r.bytes("chat_kopf", zweiter_doppelpunkt + 2)?;
    let kopf = String::from_utf8(kopf_bytes.to_vec())
        .map_err(|_| CodecError::UngueltigerText { feld: "chat_kopf" })?;
    let chiffrat = r.blob("chat_chiffrat", MAX_TCP_BUFFER_SIZE)?.to_vec();

    Ok(ServerCommand::ChatNachricht { kopf, chiffrat })
}

// ---------------------------------------------------------------------------
// Nachrichten an den Server
// ---------------------------------------------------------------------------

/// `[9]`
pub fn keepalive_antwort() -> Bytes {
    FrameWriter::mit_tag(client_tag::KEEPALIVE_ACK).fertig()
}

/// `[99]`
pub fn sync_byte() -> Bytes {
    FrameWriter::mit_tag(client_tag::SYNC).fertig()
}

/// `[10][enclen:2][chiffrat]`
pub fn chat_nachricht(chiffrat: &[u8]) -> Result<Bytes, CodecError> {
    let mut w = FrameWriter::mit_tag(client_tag::CHAT_NACHRICHT);
    w.blob("chat_chiffrat", chiffrat)?;
    Ok(w.fertig())
}

/// Klartext einer Chat-Nachricht: UTF-16LE plus ein NUL-Byte
pub fn chat_klartext(text: &str) -> Vec<u8> {
    let mut klartext = utf16le_kodieren(text);
    klartext.push(0);
    klartext
}

/// `[15][len:1][raum]`
pub fn raum_betreten(raum: &str) -> Result<Bytes, CodecError> {
    let mut w = FrameWriter::mit_tag(client_tag::RAUM_BETRETEN);
    w.kurztext("raum", raum)?;
    Ok(w.fertig())
}

/// `[16][len:1][raum][zeichen:1][passwort utf16le]`
pub fn raum_betreten_mit_passwort(raum: &str, passwort: &str) -> Result<Bytes, CodecError> {
    let mut w = FrameWriter::mit_tag(client_tag::RAUM_BETRETEN_MIT_PASSWORT);
    w.kurztext("raum", raum)?.breittext("passwort", passwort)?;
    Ok(w.fertig())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    async fn befehl(tag: u8, felder: &[u8]) -> Result<ServerCommand, CodecError> {
        let tag = CommandTag::from_u8(tag).expect("Tag muss bekannt sein");
        let mut quelle = felder;
        ServerCommand::lesen(tag, &mut quelle).await
    }

    #[test]
    fn handshake_layout() {
        let bytes = handshake_kodieren("1.0", "bob", Some("pw")).unwrap();
        assert_eq!(
            &bytes[..],
            &[3, b'1', b'.', b'0', 3, b'b', b'o', b'b', 2, b'p', 0, b'w', 0]
        );
    }

    #[test]
    fn handshake_ohne_passwort() {
        let bytes = handshake_kodieren("1.0", "bob", None).unwrap();
        assert_eq!(*bytes.last().unwrap(), 0);
    }

    #[test]
    fn handshake_lehnt_zu_langen_namen_ab() {
        let name = "n".repeat(MAX_NAME_LENGTH + 1);
        assert!(handshake_kodieren("1.0", &name, None).is_err());
    }

    #[tokio::test]
    async fn server_info_lesen() {
        let snapshot = [1u8, 5, b'L', b'o', b'b', b'b', b'y', 10, 0, 0, 0];
        let mut daten = Vec::new();
        daten.extend_from_slice(&(snapshot.len() as u16).to_le_bytes());
        daten.extend_from_slice(&snapshot);
        daten.extend_from_slice(&23u32.to_le_bytes());
        daten.extend_from_slice(&5u32.to_le_bytes());
        daten.extend_from_slice(&2u16.to_le_bytes());
        daten.extend_from_slice(b"17");

        let mut quelle = &daten[..];
        let info = ServerInfo::lesen(&mut quelle).await.unwrap();
        assert_eq!(info.p, 23);
        assert_eq!(info.g, 5);
        assert_eq!(info.oeffentlich, "17");

        let snapshot = PresenceSnapshot::parsen(&info.snapshot_paket).unwrap();
        assert_eq!(snapshot.raeume.len(), 1);
        assert_eq!(snapshot.raeume[0].name, "Lobby");
        assert_eq!(snapshot.raeume[0].max_benutzer, 10);
        assert!(snapshot.raeume[0].benutzer.is_empty());
    }

    #[tokio::test]
    async fn server_info_ohne_oeffentlichen_wert_ist_fehler() {
        let mut daten = vec![0u8, 0];
        daten.extend_from_slice(&23u32.to_le_bytes());
        daten.extend_from_slice(&5u32.to_le_bytes());
        daten.extend_from_slice(&0u16.to_le_bytes());
        let mut quelle = &daten[..];
        assert!(matches!(
            ServerInfo::lesen(&mut quelle).await,
            Err(CodecError::UngueltigerWert { .. })
        ));
    }

    #[test]
    fn snapshot_mit_mehreren_raeumen() {
        let paket = [
            2, // zwei Raeume
            1, b'A', 5, 0, 2, 0, 3, b'a', b'n', b'n', 3, b'b', b'e', b'n', //
            1, b'B', 0, 1, 0, 0,
        ];
        let snapshot = PresenceSnapshot::parsen(&paket).unwrap();
        assert_eq!(snapshot.raeume[0].benutzer, vec!["ann", "ben"]);
        assert_eq!(snapshot.raeume[1].max_benutzer, 256);
        assert_eq!(snapshot.benutzer_anzahl(), 2);
    }

    #[test]
    fn abgeschnittener_snapshot_ist_fehler() {
        let paket = [1, 5, b'L', b'o'];
        assert!(PresenceSnapshot::parsen(&paket).is_err());
    }

    #[tokio::test]
    async fn neuer_benutzer() {
        let felder = [8, 3, 0, 0, 0, 3, b'e', b'v', b'e'];
        assert_eq!(
            befehl(0, &felder).await.unwrap(),
            ServerCommand::NeuerBenutzer {
                online: 3,
                name: "eve".into()
            }
        );
    }

    #[tokio::test]
    async fn benutzer_weg_mit_grund() {
        let felder = [2, 7, 2, 0, 0, 0, b'e', b'v', b'e'];
        assert_eq!(
            befehl(1, &felder).await.unwrap(),
            ServerCommand::BenutzerWeg {
                grund: DisconnectReason::Gekickt,
                online: 2,
                name: "eve".into()
            }
        );
    }

    #[tokio::test]
    async fn neuer_benutzer_mit_maximaler_namenslaenge() {
        let name = "a".repeat(MAX_NAME_LENGTH);
        let erwartet = ServerCommand::NeuerBenutzer {
            online: 3,
            name: name.clone(),
        };

        let mut paket = vec![3, 0, 0, 0, MAX_NAME_LENGTH as u8];
        paket.extend_from_slice(name.as_bytes());
        let mut felder = vec![paket.len() as u8];
        felder.extend_from_slice(&paket);
        assert_eq!(befehl(0, &felder).await.unwrap(), erwartet);

        // Abschliessendes NUL hinter dem Namen
        paket.push(0);
        let mut felder = vec![paket.len() as u8];
        felder.extend_from_slice(&paket);
        assert_eq!(befehl(0, &felder).await.unwrap(), erwartet);

        // NUL in der Namenslaenge mitgezaehlt
        paket[4] = MAX_NAME_LENGTH as u8 + 1;
        let mut felder = vec![paket.len() as u8];
        felder.extend_from_slice(&paket);
        assert_eq!(befehl(0, &felder).await.unwrap(), erwartet);
    }

    #[tokio::test]
    async fn neuer_benutzer_mit_zu_langem_namen() {
        let name = "a".repeat(MAX_NAME_LENGTH + 1);
        let mut paket = vec![3, 0, 0, 0, name.len() as u8];
        paket.extend_from_slice(name.as_bytes());
        let mut felder = vec![paket.len() as u8];
        felder.extend_from_slice(&paket);
        assert!(matches!(
            befehl(0, &felder).await,
            Err(CodecError::ZuLang { .. })
        ));
    }

    #[tokio::test]
    async fn benutzer_weg_mit_maximaler_namenslaenge() {
        let name = "a".repeat(MAX_NAME_LENGTH);
        let erwartet = ServerCommand::BenutzerWeg {
            grund: DisconnectReason::Getrennt,
            online: 3,
            name: name.clone(),
        };

        let mut paket = vec![3, 0, 0, 0];
        paket.extend_from_slice(name.as_bytes());
        let mut felder = vec![0, paket.len() as u8];
        felder.extend_from_slice(&paket);
        assert_eq!(befehl(1, &felder).await.unwrap(), erwartet);

        paket.push(0);
        let mut felder = vec![0, paket.len() as u8];
        felder.extend_from_slice(&paket);
        assert_eq!(befehl(1, &felder).await.unwrap(), erwartet);
    }

    #[tokio::test]
    async fn benutzer_weg_mit_zu_langem_namen() {
        let mut paket = vec![3, 0, 0, 0];
        paket.extend_from_slice("a".repeat(MAX_NAME_LENGTH + 1).as_bytes());
        let mut felder = vec![0, paket.len() as u8];
        felder.extend_from_slice(&paket);
        assert!(matches!(
            befehl(1, &felder).await,
            Err(CodecError::ZuLang { .. })
        ));
    }

    #[test]
    fn snapshot_mit_maximaler_namenslaenge() {
        let name = "a".repeat(MAX_NAME_LENGTH);
        let mut paket = vec![1, MAX_NAME_LENGTH as u8];
        paket.extend_from_slice(name.as_bytes());
        paket.extend_from_slice(&[4, 0, 1, 0, MAX_NAME_LENGTH as u8]);
        paket.extend_from_slice(name.as_bytes());
        let snapshot = PresenceSnapshot::parsen(&paket).unwrap();
        assert_eq!(snapshot.raeume[0].name, name);
        assert_eq!(snapshot.raeume[0].benutzer, vec![name.clone()]);

        let zu_lang = "a".repeat(MAX_NAME_LENGTH + 1);
        let mut paket = vec![1, 1, b'L', 4, 0, 1, 0, zu_lang.len() as u8];
        paket.extend_from_slice(zu_lang.as_bytes());
        assert!(matches!(
            PresenceSnapshot::parsen(&paket),
            Err(CodecError::ZuLang { .. })
        ));
    }

    #[tokio::test]
    async fn benutzer_weg_mit_unbekanntem_grund() {
        let felder = [9, 4, 2, 0, 0, 0];
        assert!(befehl(1, &felder).await.is_err());
    }

    #[tokio::test]
    async fn ping_bericht() {
        let felder = [10, 0, 3, b'b', b'o', b'b', 42, 0, 1, b'x', 0, 1];
        assert_eq!(
            befehl(8, &felder).await.unwrap(),
            ServerCommand::PingBericht(vec![
                PingEintrag {
                    name: "bob".into(),
                    ping_ms: 42
                },
                PingEintrag {
                    name: "x".into(),
                    ping_ms: 256
                },
            ])
        );
    }

    #[test]
    fn ping_bericht_mit_ueberlaufendem_eintrag() {
        // Der Name behauptet 5 Bytes, das Paket endet vorher
        let paket = [5, b'b', b'o'];
        assert!(ping_bericht_parsen(&paket).is_err());
    }

    #[test]
    fn chat_kopf_endet_nach_zweitem_doppelpunkt() {
        let mut paket = b"12:30. bob: ".to_vec();
        paket.extend_from_slice(&3u16.to_le_bytes());
        paket.extend_from_slice(&[7, 8, 9]);
        assert_eq!(
            chat_parsen(&paket).unwrap(),
            ServerCommand::ChatNachricht {
                kopf: "12:30. bob: ".into(),
                chiffrat: vec![7, 8, 9]
            }
        );
    }

    #[test]
    fn chat_ohne_kopf_ist_fehler() {
        assert!(chat_parsen(b"kein kopf").is_err());
    }

    #[tokio::test]
    async fn raum_befehle() {
        assert_eq!(
            befehl(26, &[5, b'L', b'o', b'b', b'b', b'y', 1]).await.unwrap(),
            ServerCommand::RaumVerschoben {
                raum: "Lobby".into(),
                nach_oben: true
            }
        );
        assert_eq!(
            befehl(28, &[1, b'X', 12, 0, 0, 0]).await.unwrap(),
            ServerCommand::RaumErstellt {
                raum: "X".into(),
                max_benutzer: 12
            }
        );
        assert_eq!(
            befehl(29, &[1, b'X', 1, b'Y', 4, 0, 0, 0]).await.unwrap(),
            ServerCommand::RaumGeaendert {
                alter_name: "X".into(),
                neuer_name: "Y".into(),
                max_benutzer: 4
            }
        );
        assert_eq!(
            befehl(25, &[3, b'e', b'v', b'e', 1, b'Y']).await.unwrap(),
            ServerCommand::BenutzerBetrittRaum {
                benutzer: "eve".into(),
                raum: "Y".into()
            }
        );
    }

    #[tokio::test]
    async fn server_nachricht() {
        let felder = [5, 0, b'H', b'a', b'l', b'l', b'o'];
        assert_eq!(
            befehl(13, &felder).await.unwrap(),
            ServerCommand::ServerNachricht("Hallo".into())
        );
    }

    #[test]
    fn unbekannte_tags() {
        assert_eq!(CommandTag::from_u8(9), Some(CommandTag::KeepAlive));
        assert_eq!(CommandTag::from_u8(24), None);
        assert_eq!(ConnectResponse::from_u8(1), None);
    }

    #[test]
    fn ausgehende_nachrichten() {
        assert_eq!(&keepalive_antwort()[..], &[9]);
        assert_eq!(&sync_byte()[..], &[99]);
        assert_eq!(
            &raum_betreten("Lobby").unwrap()[..],
            &[15, 5, b'L', b'o', b'b', b'b', b'y']
        );
        assert_eq!(
            &raum_betreten_mit_passwort("A", "pw").unwrap()[..],
            &[16, 1, b'A', 2, b'p', 0, b'w', 0]
        );
        assert_eq!(&chat_nachricht(&[1, 2]).unwrap()[..], &[10, 2, 0, 1, 2]);
        assert_eq!(chat_klartext("hi"), vec![b'h', 0, b'i', 0, 0]);
    }
}
