//! Steuerkanal – TCP-Verbindung nach erfolgreichem Handshake
//!
//! Die Lesehaelfte liegt hinter einem async Mutex, der fuer die Dauer
//! eines ganzen Frames gehalten wird. `stoppen()` setzt das Aktiv-Flag
//! zurueck, weckt die Schleife ueber den Stop-Watch und nimmt danach
//! einmal den Mutex: Kehrt der Aufruf zurueck, liest niemand mehr.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};

use hush_core::{HushError, Result};
use hush_crypto::SessionCipher;
use hush_protocol::control::{self, CommandTag, ServerCommand};
use hush_protocol::{CodecError, MAX_BUFFER_SIZE, MAX_MESSAGE_LENGTH};

use crate::aktivitaet::ActivityClock;
use crate::dispatcher::CommandDispatcher;

/// Warum die Empfangsschleife endete
#[derive(Debug)]
pub enum LoopEnde {
    /// Lokal gestoppt
    Gestoppt,
    /// Null-Byte-Read: der Server hat die Verbindung geschlossen
    ServerGeschlossen,
    /// Transport- oder Protokollfehler
    Fehler(HushError),
}

/// Ergebnis des geordneten Trennens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrennErgebnis {
    /// Server hat mit FIN geantwortet
    Bestaetigt,
    /// Keine Antwort innerhalb der Versuche
    KeineAntwort,
}

/// Prueft eine Chat-Nachricht und liefert den Klartext fuer die Verschluesselung
pub fn chat_klartext_pruefen(text: &str) -> Result<Vec<u8>> {
    let laenge = text.encode_utf16().count() * 2;
    if laenge > MAX_MESSAGE_LENGTH {
        return Err(HushError::NachrichtZuLang {
            laenge,
            maximum: MAX_MESSAGE_LENGTH,
        });
    }
    Ok(control::chat_klartext(text))
}

/// Verbundener Steuerkanal
pub struct ControlChannel {
    leser: Mutex<BufReader<OwnedReadHalf>>,
    schreiber: Mutex<Option<OwnedWriteHalf>>,
    aktiv: AtomicBool,
    stop_tx: watch::Sender<bool>,
    aktivitaet: ActivityClock,
    peer: SocketAddr,
}

impl ControlChannel {
    pub fn neu(stream: TcpStream, peer: SocketAddr, aktivitaet: ActivityClock) -> Self {
        let (lese, schreib) = stream.into_split();
        let (stop_tx, _) = watch::channel(false);
        Self {
            leser: Mutex::new(BufReader::new(lese)),
            schreiber: Mutex::new(Some(schreib)),
            aktiv: AtomicBool::new(true),
            stop_tx,
            aktivitaet,
            peer,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn ist_aktiv(&self) -> bool {
        self.aktiv.load(Ordering::Acquire)
    }

    /// Sendet ein fertig kodiertes Frame
    pub async fn senden(&self, daten: &[u8]) -> Result<()> {
        let mut schreiber = self.schreiber.lock().await;
        let schreiber = schreiber.as_mut().ok_or(HushError::NichtVerbunden)?;
        schreiber
            .write_all(daten)
            .await
            .map_err(|e| HushError::transport("Senden", e))
    }

    pub async fn keepalive_beantworten(&self) -> Result<()> {
        tracing::trace!("Keepalive beantwortet");
        self.senden(&control::keepalive_antwort()).await
    }

    /// Verschluesselt und sendet eine Chat-Nachricht
    pub async fn chat_senden(&self, cipher: &SessionCipher, text: &str) -> Result<()> {
        let klartext = chat_klartext_pruefen(text)?;
        let frame = control::chat_nachricht(&cipher.verschluesseln(&klartext))?;
        self.senden(&frame).await
    }

    pub async fn raum_betreten(&self, raum: &str) -> Result<()> {
        self.senden(&control::raum_betreten(raum)?).await
    }

    pub async fn raum_betreten_mit_passwort(&self, raum: &str, passwort: &str) -> Result<()> {
        self.senden(&control::raum_betreten_mit_passwort(raum, passwort)?)
            .await
    }

    /// Liest und verarbeitet Frames bis Stop, FIN oder Fehler
    pub async fn empfangs_loop(&self, dispatcher: &CommandDispatcher) -> LoopEnde {
        let mut stop_rx = self.stop_tx.subscribe();

        while self.ist_aktiv() {
            let mut leser = self.leser.lock().await;
            let ergebnis = tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                ergebnis = self.frame_verarbeiten(&mut leser, dispatcher) => ergebnis,
            };
            drop(leser);

            if let Err(ende) = ergebnis {
                return ende;
            }
            self.aktivitaet.beruehren();
        }

        tracing::debug!(peer = %self.peer, "Empfangsschleife gestoppt");
        LoopEnde::Gestoppt
    }

    async fn frame_verarbeiten(
        &self,
        leser: &mut BufReader<OwnedReadHalf>,
        dispatcher: &CommandDispatcher,
    ) -> std::result::Result<(), LoopEnde> {
        let tag = match leser.read_u8().await {
            Ok(tag) => tag,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(LoopEnde::ServerGeschlossen)
            }
            Err(e) => return Err(LoopEnde::Fehler(HushError::transport("Empfangen", e))),
        };

        let tag = CommandTag::from_u8(tag)
            .ok_or_else(|| LoopEnde::Fehler(CodecError::UnbekannterBefehl(tag).into()))?;
        let befehl = ServerCommand::lesen(tag, leser)
            .await
            .map_err(|e| LoopEnde::Fehler(e.into()))?;

        match dispatcher.ausfuehren(befehl, self).await {
            Ok(()) => Ok(()),
            Err(e) if e.beendet_sitzung() => Err(LoopEnde::Fehler(e)),
            Err(e) => {
                tracing::warn!(fehler = %e, "Befehl nicht vollstaendig ausgefuehrt");
                Ok(())
            }
        }
    }

    /// Stoppt die Empfangsschleife; kehrt erst zurueck wenn kein Frame mehr gelesen wird
    pub async fn stoppen(&self) {
        self.aktiv.store(false, Ordering::Release);
        self.stop_tx.send_replace(true);
        drop(self.leser.lock().await);
    }

    /// Geordnetes Trennen: Schreibseite schliessen, Restdaten bis FIN verwerfen
    ///
    /// Darf erst nach `stoppen()` aufgerufen werden.
    pub async fn trennen_und_leeren(&self, versuche: u32, intervall: Duration) -> TrennErgebnis {
        self.schreibseite_schliessen().await;

        let mut leser = self.leser.lock().await;
        let mut puffer = vec![0u8; MAX_BUFFER_SIZE];
        for versuch in 1..=versuche {
            match tokio::time::timeout(intervall, leser.read(&mut puffer)).await {
                Ok(Ok(0)) => {
                    tracing::debug!(versuch, "Server hat die Trennung bestaetigt");
                    return TrennErgebnis::Bestaetigt;
                }
                Ok(Ok(n)) => tracing::trace!(bytes = n, versuch, "Restdaten verworfen"),
                Ok(Err(e)) => {
                    tracing::debug!(fehler = %e, "Lesefehler beim Trennen");
                    return TrennErgebnis::KeineAntwort;
                }
                Err(_) => tracing::trace!(versuch, "Noch keine Antwort vom Server"),
            }
        }
        TrennErgebnis::KeineAntwort
    }

    /// Schliesst die Schreibseite (FIN) und gibt sie frei
    pub async fn schreibseite_schliessen(&self) {
        if let Some(mut schreiber) = self.schreiber.lock().await.take() {
            if let Err(e) = schreiber.shutdown().await {
                tracing::debug!(fehler = %e, "Shutdown der Schreibseite fehlgeschlagen");
            }
        }
    }
}
