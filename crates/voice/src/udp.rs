//! Medienkanal – UDP-Socket zum Server
//!
//! ## Ablauf
//! ```text
//! starten()        bind + connect, [-1][name] an den Server
//! bereit_melden()  [-3] nach der Voice-Freigabe im Steuerkanal
//! empfangs_loop()  Ping-Proben zurueckschicken, Voice-Frames entschluesseln
//!     |
//!     +--> Wiedergabe-Queue --> AudioSink::play_voice
//! ```
//!
//! Sendefehler sind nicht fatal: Voice ist verlustbehaftet. Nur harte
//! Lesefehler beenden die Empfangsschleife.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::UdpSocket;
use tokio::sync::{watch, Mutex};

use hush_core::{Collaborators, HushError, Result, UiEvent};
use hush_crypto::SessionCipher;
use hush_protocol::voice::{self, VoiceDatagram};
use hush_protocol::MAX_BUFFER_SIZE;
use hush_signaling::Presence;

use crate::playback::{Wiedergabe, WiedergabeAuftrag};

/// Empfangspuffer (etwas groesser als das Protokoll-Maximum)
const EMPFANGS_PUFFER: usize = MAX_BUFFER_SIZE + 60;

/// Verbundener Medienkanal
pub struct MediaChannel {
    socket: UdpSocket,
    lese_sperre: Mutex<()>,
    aktiv: AtomicBool,
    stop_tx: watch::Sender<bool>,
    cipher: SessionCipher,
    presence: Presence,
    collab: Collaborators,
}

impl MediaChannel {
    /// Bindet einen lokalen Socket, verbindet ihn mit dem Server und meldet den Namen an
    pub async fn starten(
        server: SocketAddr,
        name: &str,
        cipher: SessionCipher,
        presence: Presence,
        collab: Collaborators,
    ) -> Result<Self> {
        let lokal: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(lokal)
            .await
            .map_err(|e| HushError::transport("UDP-Socket anlegen", e))?;
        socket
            .connect(server)
            .await
            .map_err(|e| HushError::transport("UDP-Verbinden", e))?;

        let vorbereitung = voice::vorbereiten(name)?;
        let gesendet = socket
            .send(&vorbereitung)
            .await
            .map_err(|e| HushError::transport("UDP-Senden", e))?;
        if gesendet != vorbereitung.len() {
            return Err(HushError::Voice(format!(
                "Anmeldung unvollstaendig gesendet ({gesendet} von {} Bytes)",
                vorbereitung.len()
            )));
        }

        tracing::info!(
            server = %server,
            lokal = ?socket.local_addr().ok(),
            "Medienkanal vorbereitet"
        );

        let (stop_tx, _) = watch::channel(false);
        Ok(Self {
            socket,
            lese_sperre: Mutex::new(()),
            aktiv: AtomicBool::new(true),
            stop_tx,
            cipher,
            presence,
            collab,
        })
    }

    pub fn lokale_adresse(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    pub fn ist_aktiv(&self) -> bool {
        self.aktiv.load(Ordering::Acquire)
    }

    /// Meldet dem Server die Bereitschaft fuer die Ping-Messung
    pub async fn bereit_melden(&self) -> Result<()> {
        self.senden(&voice::bereit()).await
    }

    /// Sendet einen Voice-Frame oder die Ende-Markierung
    pub async fn voice_frame_senden(&self, samples: &[i16], letzter: bool) -> Result<()> {
        if letzter {
            return self.senden(&voice::letzter_frame()).await;
        }
        let roh: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let datagramm = voice::voice_frame(&self.cipher.verschluesseln(&roh))
            .map_err(|e| HushError::Voice(e.to_string()))?;
        self.senden(&datagramm).await
    }

    async fn senden(&self, datagramm: &[u8]) -> Result<()> {
        let gesendet = self
            .socket
            .send(datagramm)
            .await
            .map_err(|e| HushError::Voice(format!("Senden fehlgeschlagen: {e}")))?;
        if gesendet != datagramm.len() {
            return Err(HushError::Voice(format!(
                "Nur {gesendet} von {} Bytes gesendet",
                datagramm.len()
            )));
        }
        Ok(())
    }

    /// Empfaengt Datagramme bis Stop oder harten Fehler
    pub async fn empfangs_loop(&self, wiedergabe: &Wiedergabe) -> Result<()> {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut puffer = vec![0u8; EMPFANGS_PUFFER];

        while self.ist_aktiv() {
            let sperre = self.lese_sperre.lock().await;
            let gelesen = tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                gelesen = self.socket.recv(&mut puffer) => gelesen,
            };

            match gelesen {
                Ok(n) => self.datagramm_verarbeiten(&puffer[..n], wiedergabe).await,
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                    // ICMP "port unreachable" vom letzten Senden
                    tracing::warn!(fehler = %e, "Server-Port fuer Voice nicht erreichbar");
                }
                Err(e) => return Err(HushError::transport("UDP-Empfangen", e)),
            }
            drop(sperre);
        }

        tracing::debug!("Voice-Empfangsschleife gestoppt");
        Ok(())
    }

    async fn datagramm_verarbeiten(&self, datagramm: &[u8], wiedergabe: &Wiedergabe) {
        let paket = match VoiceDatagram::parsen(datagramm) {
            Ok(paket) => paket,
            Err(e) => {
                tracing::debug!(fehler = %e, bytes = datagramm.len(), "Datagramm verworfen");
                return;
            }
        };

        match paket {
            VoiceDatagram::PingProbe => {
                if let Err(e) = self.senden(datagramm).await {
                    tracing::warn!(fehler = %e, "Ping-Echo fehlgeschlagen");
                }
            }
            VoiceDatagram::Voice {
                absender,
                letzter: true,
                ..
            } => {
                self.spricht_melden(&absender, false);
                wiedergabe.einreihen(WiedergabeAuftrag {
                    absender,
                    samples: None,
                    letzter: true,
                });
            }
            VoiceDatagram::Voice {
                absender,
                chiffrat,
                ..
            } => {
                let laenge = self.collab.audio.samples_pro_frame() * 2;
                let klartext = match self.cipher.entschluesseln_gekuerzt(&chiffrat, laenge) {
                    Ok(k) => k,
                    Err(e) => {
                        tracing::debug!(fehler = %e, absender = %absender, "Voice-Frame nicht entschluesselbar");
                        return;
                    }
                };
                let samples: Vec<i16> = klartext
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]))
                    .collect();

                self.spricht_melden(&absender, true);
                wiedergabe.einreihen(WiedergabeAuftrag {
                    absender,
                    samples: Some(samples),
                    letzter: false,
                });
            }
        }
    }

    fn spricht_melden(&self, absender: &str, spricht: bool) {
        if let Some(ping_ms) = self.presence.spricht_setzen(absender, spricht) {
            self.collab.ui.anzeigen(UiEvent::PingAktualisiert {
                name: absender.to_string(),
                ping_ms,
                spricht,
            });
        }
    }

    /// Stoppt die Empfangsschleife; kehrt erst zurueck wenn kein Datagramm mehr verarbeitet wird
    pub async fn stoppen(&self) {
        self.aktiv.store(false, Ordering::Release);
        self.stop_tx.send_replace(true);
        drop(self.lese_sperre.lock().await);
    }
}
