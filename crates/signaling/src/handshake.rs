//! Verbindungsaufbau: Handshake, Schluesselaustausch, Gleichtakt
//!
//! ```text
//! Client                                  Server
//!   |-- [vlen][version][nlen][name][pw] --> |
//!   | <------------------- [antwort:1] ---- |   0/2/3/5 = Ablehnung
//!   | <--- [snapshot][p][g][A] ------------ |   4 = Server-Info
//!   |-- [blen][B] ------------------------> |
//!   |-- [99] -----------------------------> |
//!   | <---------------------- [echo:1] ---- |
//! ```
//!
//! Der Snapshot wird erst nach dem Gleichtakt-Byte ausgewertet.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use hush_core::{HushError, RejectReason, Result, SessionPhase};
use hush_crypto::{KeyExchange, SessionKey};
use hush_protocol::control::{self, ConnectResponse, ServerInfo};
use hush_protocol::wire::StreamReader;
use hush_protocol::{PresenceSnapshot, MAX_VERSION_STRING_LENGTH};

/// Wie lange nach einer Ablehnung noch auf das Restbyte gewartet wird
const ABLEHNUNG_NACHLAUF: Duration = Duration::from_millis(500);

/// Anmeldedaten fuer den Handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeAnfrage {
    pub client_version: String,
    pub username: String,
    pub passwort: Option<String>,
}

/// Ergebnis eines erfolgreichen Handshakes
#[derive(Debug)]
pub struct HandshakeErgebnis {
    pub key: SessionKey,
    pub snapshot: PresenceSnapshot,
}

/// Baut die TCP-Verbindung auf (mit Zeitlimit)
pub async fn verbinden(host: &str, port: u16, zeitlimit: Duration) -> Result<(TcpStream, SocketAddr)> {
    let host = host.trim();
    if host.is_empty() {
        return Err(HushError::UngueltigeEingabe("Kein Server angegeben".into()));
    }

    let stream = tokio::time::timeout(zeitlimit, TcpStream::connect((host, port)))
        .await
        .map_err(|_| HushError::Zeitlimit(format!("Verbindung zu {host}:{port}")))?
        .map_err(|e| HushError::transport("Verbinden", e))?;

    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!(fehler = %e, "TCP_NODELAY nicht gesetzt, Chat kann verzoegert ankommen");
    }
    let peer = stream
        .peer_addr()
        .map_err(|e| HushError::transport("Verbinden", e))?;

    tracing::info!(peer = %peer, "TCP-Verbindung aufgebaut");
    Ok((stream, peer))
}

/// Fuehrt Handshake und Schluesselaustausch auf einem offenen Stream durch
///
/// `phase` wird bei jedem Phasenwechsel aufgerufen.
pub async fn handshake_durchfuehren<S>(
    stream: &mut S,
    anfrage: &HandshakeAnfrage,
    phase: impl Fn(SessionPhase),
) -> Result<HandshakeErgebnis>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let hallo = control::handshake_kodieren(
        &anfrage.client_version,
        &anfrage.username,
        anfrage.passwort.as_deref(),
    )?;
    schreiben(stream, &hallo).await?;
    phase(SessionPhase::AwaitingServerInfo);

    let antwort = match stream.read_u8().await {
        Ok(byte) => byte,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(HushError::protokoll(
                "Server hat die Verbindung ohne Antwort beendet",
            ))
        }
        Err(e) => return Err(HushError::transport("Empfangen", e)),
    };

    let antwort = ConnectResponse::from_u8(antwort)
        .ok_or_else(|| HushError::protokoll(format!("Unbekannte Antwort auf Handshake: {antwort}")))?;

    match antwort {
        ConnectResponse::ServerInfo => {}
        ConnectResponse::FalscheVersion => {
            let server = StreamReader::new(stream)
                .kurztext("server_version", MAX_VERSION_STRING_LENGTH)
                .await?;
            return Err(HushError::Abgelehnt(RejectReason::FalscheVersion {
                client: anfrage.client_version.clone(),
                server,
            }));
        }
        ablehnung => {
            // Restbyte der Ablehnung verwerfen
            let _ = tokio::time::timeout(ABLEHNUNG_NACHLAUF, stream.read_u8()).await;
            let grund = match ablehnung {
                ConnectResponse::NameVergeben => RejectReason::NameVergeben,
                ConnectResponse::ServerVoll => RejectReason::ServerVoll,
                _ => RejectReason::PasswortErforderlich,
            };
            tracing::info!(grund = %grund, "Verbindung abgelehnt");
            return Err(HushError::Abgelehnt(grund));
        }
    }

    phase(SessionPhase::ExchangingKeys);
    let info = ServerInfo::lesen(stream).await?;
    tracing::debug!(p = info.p, g = info.g, "DH-Parameter empfangen");

    let austausch = KeyExchange::neu(info.p, info.g)?;
    schreiben(stream, &control::schluessel_antwort(&austausch.oeffentlicher_wert())?).await?;
    let key = austausch.gemeinsamer_schluessel(&info.oeffentlich)?;

    schreiben(stream, &control::sync_byte()).await?;
    match stream.read_u8().await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(HushError::protokoll("Server hat zu lange gewartet"))
        }
        Err(e) => return Err(HushError::transport("Empfangen", e)),
    }

    phase(SessionPhase::SyncingPresence);
    let snapshot = PresenceSnapshot::parsen(&info.snapshot_paket)?;
    tracing::debug!(
        raeume = snapshot.raeume.len(),
        benutzer = snapshot.benutzer_anzahl(),
        "Snapshot empfangen"
    );

    Ok(HandshakeErgebnis { key, snapshot })
}

async fn schreiben<S>(stream: &mut S, daten: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream
        .write_all(daten)
        .await
        .map_err(|e| HushError::transport("Senden", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hush_protocol::wire::FrameWriter;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::io::duplex;

    fn anfrage() -> HandshakeAnfrage {
        HandshakeAnfrage {
            client_version: "1.0".into(),
            username: "bob".into(),
            passwort: None,
        }
    }

    fn server_info(snapshot: &[u8]) -> Vec<u8> {
        let mut w = FrameWriter::mit_tag(ConnectResponse::ServerInfo as u8);
        w.blob("snapshot", snapshot).unwrap();
        w.u32(23).u32(5);
        w.blob("a", b"17").unwrap();
        w.fertig().to_vec()
    }

    /// Snapshot mit einem leeren Raum "Lobby"
    fn lobby_snapshot() -> Vec<u8> {
        let mut w = FrameWriter::new();
        w.u8(1).kurztext("raum", "Lobby").unwrap().u16(10).u16(0);
        w.fertig().to_vec()
    }

    #[tokio::test]
    async fn erfolgreicher_handshake() {
        let (mut client, mut server) = duplex(4096);
        let phasen = Arc::new(Mutex::new(Vec::new()));

        let server_task = tokio::spawn(async move {
            // [3]"1.0"[3]"bob"[0]
            let mut hallo = [0u8; 9];
            server.read_exact(&mut hallo).await.unwrap();
            assert_eq!(hallo, [3, b'1', b'.', b'0', 3, b'b', b'o', b'b', 0]);

            server.write_all(&server_info(&lobby_snapshot())).await.unwrap();

            let laenge = server.read_u16_le().await.unwrap();
            let mut b = vec![0u8; laenge as usize];
            server.read_exact(&mut b).await.unwrap();
            let b = String::from_utf8(b).unwrap();

            assert_eq!(server.read_u8().await.unwrap(), 99);
            server.write_all(&[99]).await.unwrap();

            let serverseite = KeyExchange::mit_privatem_exponenten(23, 5, 7).unwrap();
            serverseite.gemeinsamer_schluessel(&b).unwrap()
        });

        let p = phasen.clone();
        let ergebnis = handshake_durchfuehren(&mut client, &anfrage(), move |ph| p.lock().push(ph))
            .await
            .unwrap();
        let server_key = server_task.await.unwrap();

        assert_eq!(ergebnis.key, server_key);
        assert_eq!(ergebnis.snapshot.raeume.len(), 1);
        assert_eq!(ergebnis.snapshot.raeume[0].name, "Lobby");
        assert_eq!(
            *phasen.lock(),
            vec![
                SessionPhase::AwaitingServerInfo,
                SessionPhase::ExchangingKeys,
                SessionPhase::SyncingPresence
            ]
        );
    }

    #[tokio::test]
    async fn name_vergeben_wird_abgelehnt() {
        let (mut client, mut server) = duplex(1024);
        tokio::spawn(async move {
            let mut puffer = [0u8; 64];
            let _ = server.read(&mut puffer).await;
            server.write_all(&[0, 0]).await.unwrap();
        });

        let fehler = handshake_durchfuehren(&mut client, &anfrage(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(fehler, HushError::Abgelehnt(RejectReason::NameVergeben)));
    }

    #[tokio::test]
    async fn falsche_version_nennt_serverversion() {
        let (mut client, mut server) = duplex(1024);
        tokio::spawn(async move {
            let mut puffer = [0u8; 64];
            let _ = server.read(&mut puffer).await;
            server.write_all(&[3, 3, b'2', b'.', b'0']).await.unwrap();
        });

        match handshake_durchfuehren(&mut client, &anfrage(), |_| {}).await {
            Err(HushError::Abgelehnt(RejectReason::FalscheVersion { client, server })) => {
                assert_eq!(client, "1.0");
                assert_eq!(server, "2.0");
            }
            anderes => panic!("unerwartet: {anderes:?}"),
        }
    }

    #[tokio::test]
    async fn server_schliesst_vor_gleichtakt() {
        let (mut client, mut server) = duplex(4096);
        tokio::spawn(async move {
            let mut puffer = [0u8; 64];
            let _ = server.read(&mut puffer).await;
            server.write_all(&server_info(&lobby_snapshot())).await.unwrap();
            // bis einschliesslich Gleichtakt-Byte lesen, dann ohne Echo schliessen
            loop {
                let n = server.read(&mut puffer).await.unwrap();
                if n == 0 || puffer[n - 1] == 99 {
                    break;
                }
            }
            drop(server);
        });

        match handshake_durchfuehren(&mut client, &anfrage(), |_| {}).await {
            Err(HushError::Protokoll(text)) => assert!(text.contains("zu lange gewartet")),
            anderes => panic!("unerwartet: {anderes:?}"),
        }
    }

    #[tokio::test]
    async fn unbekannte_antwort_ist_protokollfehler() {
        let (mut client, mut server) = duplex(1024);
        tokio::spawn(async move {
            let mut puffer = [0u8; 64];
            let _ = server.read(&mut puffer).await;
            server.write_all(&[42]).await.unwrap();
        });

        assert!(matches!(
            handshake_durchfuehren(&mut client, &anfrage(), |_| {}).await,
            Err(HushError::Protokoll(_))
        ));
    }

    #[tokio::test]
    async fn leerer_host_wird_lokal_abgewiesen() {
        assert!(matches!(
            verbinden("   ", 2000, Duration::from_secs(1)).await,
            Err(HushError::UngueltigeEingabe(_))
        ));
    }

    #[test]
    fn oeffentlicher_wert_des_testservers() {
        // A = 5^7 mod 23
        let server = KeyExchange::mit_privatem_exponenten(23, 5, 7).unwrap();
        assert_eq!(server.oeffentlicher_wert(), "17");
    }
}
