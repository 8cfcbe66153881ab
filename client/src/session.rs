//! Sitzungssteuerung
//!
//! ```text
//! Idle -> Connecting -> AwaitingServerInfo -> ExchangingKeys
//!      -> SyncingPresence -> Active -> Disconnecting -> Idle
//! ```
//!
//! Vor `Active` fuehrt jeder Fehler ueber `Aborted(grund)` zurueck nach
//! `Idle`. Aus `Active` gibt es drei Wege heraus:
//!
//! | Ausloeser                        | Abbau                                   |
//! |----------------------------------|-----------------------------------------|
//! | `trennen()` durch den Benutzer   | FIN senden, Restdaten bis FIN verwerfen |
//! | harter Fehler / keine Lebenszeichen | sofort, Verbindung-verloren-Ton      |
//! | FIN vom Server                   | FIN spiegeln                            |
//!
//! Jeder Weg endet im selben vollstaendigen Aufraeumen. Der Abbau einer
//! Sitzung laeuft genau einmal: wer die aktive Sitzung aus dem Slot nimmt,
//! baut sie ab, alle anderen sehen eine fremde Generation und tun nichts.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use hush_core::{
    Collaborators, ControlsState, HushError, Profile, Result, SessionPhase, SessionSignal,
    SoundEvent, UiEvent,
};
use hush_crypto::SessionCipher;
use hush_signaling::{
    chat_klartext_pruefen, handshake_durchfuehren, verbinden, ActivityClock, CommandDispatcher,
    ControlChannel, HandshakeAnfrage, LoopEnde, Presence, TrennErgebnis,
};
use hush_voice::{MediaChannel, Wiedergabe};

use crate::config::SitzungsZeiten;
use crate::liveness;

/// Ziel und Anmeldedaten eines Verbindungsversuchs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verbindungsdaten {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub passwort: Option<String>,
}

impl From<&Profile> for Verbindungsdaten {
    fn from(profil: &Profile) -> Self {
        Self {
            host: profil.host.clone(),
            port: profil.port,
            username: profil.username.clone(),
            passwort: profil.passwort.clone(),
        }
    }
}

/// Wie eine aktive Sitzung endet
#[derive(Debug, Clone, PartialEq, Eq)]
enum Abbau {
    /// Vom Benutzer ausgeloest
    Geordnet,
    /// Der Server hat zuerst FIN gesendet
    ServerBeendet,
    /// Harter Fehler oder abgelaufene Lebenszeichen
    Verloren(String),
}

/// Alles, was zu einer verbundenen Sitzung gehoert
struct AktiveSitzung {
    generation: u64,
    peer: SocketAddr,
    steuer: Arc<ControlChannel>,
    medien: Option<Arc<MediaChannel>>,
    cipher: SessionCipher,
    signal_tx: mpsc::UnboundedSender<SessionSignal>,
    /// Stoppt Lebenszeichen-Monitor und Ueberwachung
    stop_tx: watch::Sender<bool>,
    aufgaben: Vec<JoinHandle<()>>,
}

struct Kern {
    collab: Collaborators,
    zeiten: SitzungsZeiten,
    client_version: String,
    presence: Presence,
    phase_tx: watch::Sender<SessionPhase>,
    aktiv: Mutex<Option<AktiveSitzung>>,
    /// Serialisiert Verbindungsaufbau und Abbau
    ablauf: Mutex<()>,
    generation: AtomicU64,
}

/// Sitzungssteuerung eines Clients
///
/// Es existiert hoechstens eine aktive Sitzung; `verbinden()` baut eine
/// bestehende vorher ab.
#[derive(Clone)]
pub struct Session {
    kern: Arc<Kern>,
}

impl Session {
    pub fn neu(
        collab: Collaborators,
        zeiten: SitzungsZeiten,
        client_version: impl Into<String>,
    ) -> Self {
        let (phase_tx, _) = watch::channel(SessionPhase::Idle);
        Self {
            kern: Arc::new(Kern {
                collab,
                zeiten,
                client_version: client_version.into(),
                presence: Presence::neu(),
                phase_tx,
                aktiv: Mutex::new(None),
                ablauf: Mutex::new(()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Aktuelle Phase
    pub fn phase(&self) -> SessionPhase {
        self.kern.phase_tx.borrow().clone()
    }

    /// Abonniert Phasenwechsel
    pub fn phase_abonnieren(&self) -> watch::Receiver<SessionPhase> {
        self.kern.phase_tx.subscribe()
    }

    /// Lesender Zugriff auf Raeume und Benutzer
    pub fn presence(&self) -> &Presence {
        &self.kern.presence
    }

    /// Verbindet mit einem Server
    ///
    /// Kehrt nach Erreichen von `Active` zurueck oder mit dem Fehler, der
    /// den Versuch abgebrochen hat. Der Fehler wurde dann bereits an die UI
    /// gemeldet und die Sitzung steht wieder auf `Idle`.
    pub async fn verbinden(&self, daten: Verbindungsdaten) -> Result<()> {
        let kern = &self.kern;
        let _ablauf = kern.ablauf.lock().await;

        if kern.aktiv.lock().await.is_some() {
            tracing::info!("Bestehende Sitzung wird vor dem neuen Verbindungsaufbau getrennt");
            kern.abbauen_gesperrt(None, Abbau::Geordnet).await;
        }

        kern.collab
            .ui
            .anzeigen(UiEvent::Bedienelemente(ControlsState::Beschaeftigt));

        match kern.aufbauen(&daten).await {
            Ok(()) => Ok(()),
            Err(e) => {
                kern.abbrechen(&e);
                Err(e)
            }
        }
    }

    /// Trennt die aktive Sitzung geordnet
    pub async fn trennen(&self) {
        let _ablauf = self.kern.ablauf.lock().await;
        self.kern.abbauen_gesperrt(None, Abbau::Geordnet).await;
    }

    /// Sendet eine Chat-Nachricht an den aktuellen Raum
    pub async fn chat_senden(&self, text: &str) -> Result<()> {
        // Laenge vor jedem Netzwerkzugriff pruefen
        chat_klartext_pruefen(text)?;
        let (steuer, cipher, signal_tx) = self.kern.steuerkanal().await?;
        let ergebnis = steuer.chat_senden(&cipher, text).await;
        Self::sendefehler_melden(ergebnis, &signal_tx)
    }

    pub async fn raum_betreten(&self, raum: &str) -> Result<()> {
        let (steuer, _, signal_tx) = self.kern.steuerkanal().await?;
        let ergebnis = steuer.raum_betreten(raum).await;
        Self::sendefehler_melden(ergebnis, &signal_tx)
    }

    pub async fn raum_betreten_mit_passwort(&self, raum: &str, passwort: &str) -> Result<()> {
        let (steuer, _, signal_tx) = self.kern.steuerkanal().await?;
        let ergebnis = steuer.raum_betreten_mit_passwort(raum, passwort).await;
        Self::sendefehler_melden(ergebnis, &signal_tx)
    }

    /// Sendet einen Voice-Frame; Fehler werden gemeldet, die Sitzung bleibt
    pub async fn voice_frame_senden(&self, samples: &[i16], letzter: bool) -> Result<()> {
        let medien = {
            let aktiv = self.kern.aktiv.lock().await;
            aktiv
                .as_ref()
                .ok_or(HushError::NichtVerbunden)?
                .medien
                .clone()
        };
        let Some(medien) = medien else {
            return Err(HushError::Voice("Kein Medienkanal".into()));
        };

        let ergebnis = medien.voice_frame_senden(samples, letzter).await;
        if let Err(e) = &ergebnis {
            tracing::warn!(fehler = %e, "Voice-Frame nicht gesendet");
            self.kern.collab.ausgabe(e.to_string(), true);
        }
        ergebnis
    }

    /// Ein Sendefehler im Steuerkanal beendet die Sitzung ueber die Ueberwachung
    fn sendefehler_melden(
        ergebnis: Result<()>,
        signal_tx: &mpsc::UnboundedSender<SessionSignal>,
    ) -> Result<()> {
        if let Err(e) = &ergebnis {
            if e.beendet_sitzung() {
                let _ = signal_tx.send(SessionSignal::SteuerkanalFehler(fehler_beschreiben(e)));
            }
        }
        ergebnis
    }
}

impl Kern {
    fn phase_setzen(&self, phase: SessionPhase) {
        tracing::debug!(phase = ?phase, "Phasenwechsel");
        self.phase_tx.send_replace(phase);
    }

    async fn steuerkanal(
        &self,
    ) -> Result<(
        Arc<ControlChannel>,
        SessionCipher,
        mpsc::UnboundedSender<SessionSignal>,
    )> {
        let aktiv = self.aktiv.lock().await;
        let sitzung = aktiv.as_ref().ok_or(HushError::NichtVerbunden)?;
        Ok((
            sitzung.steuer.clone(),
            sitzung.cipher.clone(),
            sitzung.signal_tx.clone(),
        ))
    }

    /// Verbindungsaufbau bis `Active`
    async fn aufbauen(self: &Arc<Self>, daten: &Verbindungsdaten) -> Result<()> {
        let username = daten.username.trim().to_string();
        if username.is_empty() {
            return Err(HushError::UngueltigeEingabe("Kein Benutzername angegeben".into()));
        }

        self.phase_setzen(SessionPhase::Connecting);
        let (mut stream, peer) =
            verbinden(&daten.host, daten.port, self.zeiten.connect_timeout).await?;

        let anfrage = HandshakeAnfrage {
            client_version: self.client_version.clone(),
            username: username.clone(),
            passwort: daten.passwort.clone().filter(|p| !p.is_empty()),
        };
        let ergebnis = handshake_durchfuehren(&mut stream, &anfrage, |p| self.phase_setzen(p)).await?;
        let cipher = SessionCipher::neu(&ergebnis.key);

        // Snapshot uebernehmen und der UI in Snapshot-Reihenfolge melden
        let online = self.presence.snapshot_laden(&ergebnis.snapshot, &username);
        for raum in self.presence.raeume() {
            self.collab.ui.anzeigen(UiEvent::RaumHinzugefuegt {
                name: raum.name.clone(),
                max_benutzer: raum.max_benutzer,
                willkommen: raum.willkommen,
            });
            for mitglied in &raum.mitglieder {
                if *mitglied != username {
                    self.collab.audio.setup_user_audio(mitglied);
                }
                self.collab.ui.anzeigen(UiEvent::BenutzerHinzugefuegt {
                    name: mitglied.clone(),
                    raum: Some(raum.name.clone()),
                });
            }
        }
        self.collab.ui.anzeigen(UiEvent::OnlineAnzahl(online));

        let bisher = self.collab.settings.current_profile();
        self.collab.settings.save_profile(Profile {
            username: username.clone(),
            host: daten.host.trim().to_string(),
            port: daten.port,
            passwort: anfrage.passwort.clone(),
            verbindungs_hinweise: bisher.verbindungs_hinweise,
        });

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let uhr = ActivityClock::neu();
        let steuer = Arc::new(ControlChannel::neu(stream, peer, uhr.clone()));

        // Voice ist optional: ohne Medienkanal laeuft die Sitzung weiter
        let medien = match MediaChannel::starten(
            peer,
            &username,
            cipher.clone(),
            self.presence.clone(),
            self.collab.clone(),
        )
        .await
        {
            Ok(m) => Some(Arc::new(m)),
            Err(e) => {
                tracing::warn!(fehler = %e, "Medienkanal nicht verfuegbar");
                self.collab
                    .ausgabe(format!("Voice nicht verfuegbar: {}", fehler_beschreiben(&e)), true);
                None
            }
        };

        let dispatcher = CommandDispatcher::neu(
            self.presence.clone(),
            self.collab.clone(),
            cipher.clone(),
            signal_tx.clone(),
            username.as_str(),
        );
        let empfang = {
            let steuer = steuer.clone();
            let signal_tx = signal_tx.clone();
            tokio::spawn(async move {
                match steuer.empfangs_loop(&dispatcher).await {
                    LoopEnde::Gestoppt => {}
                    LoopEnde::ServerGeschlossen => {
                        let _ = signal_tx.send(SessionSignal::ServerGeschlossen);
                    }
                    LoopEnde::Fehler(e) => {
                        let _ = signal_tx.send(SessionSignal::SteuerkanalFehler(fehler_beschreiben(&e)));
                    }
                }
            })
        };
        let monitor = liveness::monitor_starten(
            uhr,
            self.zeiten.lebenszeichen_frist(),
            self.zeiten.pruef_intervall,
            signal_tx.clone(),
            stop_rx.clone(),
        );
        tokio::spawn(ueberwachen(self.clone(), generation, signal_rx, stop_rx));

        *self.aktiv.lock().await = Some(AktiveSitzung {
            generation,
            peer,
            steuer,
            medien,
            cipher,
            signal_tx,
            stop_tx,
            aufgaben: vec![empfang, monitor],
        });

        self.phase_setzen(SessionPhase::Active);
        self.collab
            .ui
            .anzeigen(UiEvent::Bedienelemente(ControlsState::Verbunden));
        self.collab
            .ausgabe(format!("Verbunden mit {peer} als {username}"), false);
        tracing::info!(peer = %peer, username = %username, generation, online, "Sitzung aktiv");
        Ok(())
    }

    /// Abbruch vor `Active`
    fn abbrechen(&self, fehler: &HushError) {
        let beschreibung = fehler_beschreiben(fehler);
        tracing::warn!(fehler = %beschreibung, "Verbindungsaufbau abgebrochen");

        self.phase_setzen(SessionPhase::Aborted(fehler.to_string()));
        self.collab.ausgabe(beschreibung, true);
        if let HushError::Abgelehnt(grund) = fehler {
            self.collab.hinweis(true, grund.to_string());
        }
        self.presence.leeren();
        self.collab
            .ui
            .anzeigen(UiEvent::Bedienelemente(ControlsState::Getrennt));
        self.phase_setzen(SessionPhase::Idle);
    }

    /// Abbau mit Ablauf-Sperre (aus der Ueberwachung)
    async fn abbauen(&self, generation: u64, art: Abbau) {
        let _ablauf = self.ablauf.lock().await;
        self.abbauen_gesperrt(Some(generation), art).await;
    }

    /// Nimmt die Sitzung aus dem Slot und baut sie ab
    ///
    /// `generation == None` baut jede aktive Sitzung ab. Der Aufrufer
    /// haelt die Ablauf-Sperre.
    async fn abbauen_gesperrt(&self, generation: Option<u64>, art: Abbau) {
        let sitzung = {
            let mut aktiv = self.aktiv.lock().await;
            let passt = aktiv
                .as_ref()
                .is_some_and(|s| generation.map_or(true, |g| g == s.generation));
            if passt {
                aktiv.take()
            } else {
                None
            }
        };
        let Some(sitzung) = sitzung else {
            tracing::debug!(?generation, ?art, "Keine passende Sitzung, Abbau entfaellt");
            return;
        };

        tracing::info!(peer = %sitzung.peer, generation = sitzung.generation, ?art, "Sitzung wird abgebaut");
        self.phase_setzen(SessionPhase::Disconnecting);

        sitzung.stop_tx.send_replace(true);
        sitzung.steuer.stoppen().await;
        if let Some(medien) = &sitzung.medien {
            medien.stoppen().await;
        }

        match art {
            Abbau::Geordnet => {
                let ergebnis = sitzung
                    .steuer
                    .trennen_und_leeren(self.zeiten.trenn_versuche, self.zeiten.trenn_intervall)
                    .await;
                match ergebnis {
                    TrennErgebnis::Bestaetigt => {
                        self.collab.ausgabe("Verbindung erfolgreich getrennt", false);
                    }
                    TrennErgebnis::KeineAntwort => {
                        tracing::warn!(
                            versuche = self.zeiten.trenn_versuche,
                            "Server hat die Trennung nicht bestaetigt, Socket wird geschlossen"
                        );
                        self.collab.ausgabe("Der Server hat nicht geantwortet", false);
                    }
                }
            }
            Abbau::ServerBeendet => {
                sitzung.steuer.schreibseite_schliessen().await;
                self.collab.ausgabe("Der Server hat die Verbindung beendet", false);
            }
            Abbau::Verloren(grund) => {
                self.collab.audio.play_sound(SoundEvent::VerbindungVerloren);
                self.collab
                    .ausgabe(format!("Verbindung verloren: {grund}"), true);
                self.collab
                    .hinweis(true, "Die Verbindung zum Server wurde unterbrochen");
            }
        }

        for aufgabe in sitzung.aufgaben {
            if let Err(e) = aufgabe.await {
                tracing::debug!(fehler = %e, "Hintergrund-Task endete mit Fehler");
            }
        }

        self.collab.audio.stop();
        for name in self.presence.andere_benutzer() {
            self.collab.audio.delete_user_audio(&name);
        }
        self.presence.leeren();

        let ui = &self.collab.ui;
        ui.anzeigen(UiEvent::BenutzerlisteGeleert);
        ui.anzeigen(UiEvent::OnlineAnzahl(0));
        ui.anzeigen(UiEvent::Bedienelemente(ControlsState::Getrennt));
        self.phase_setzen(SessionPhase::Idle);
        tracing::info!("Sitzung beendet");
    }

    /// Startet Audio und die Voice-Empfangsschleife nach der Freigabe durch den Server
    async fn voice_starten(&self, generation: u64) {
        let (medien, signal_tx) = {
            let aktiv = self.aktiv.lock().await;
            match aktiv.as_ref() {
                Some(s) if s.generation == generation => (s.medien.clone(), s.signal_tx.clone()),
                _ => return,
            }
        };
        let Some(medien) = medien else {
            tracing::debug!("Voice-Freigabe ohne Medienkanal ignoriert");
            return;
        };

        let audio = self.collab.audio.clone();
        let gestartet = tokio::task::spawn_blocking(move || audio.start())
            .await
            .unwrap_or(false);
        if !gestartet {
            tracing::warn!("Audio-Collaborator konnte nicht starten");
            self.collab.ausgabe("Voice konnte nicht gestartet werden", true);
            return;
        }

        if let Err(e) = medien.bereit_melden().await {
            tracing::warn!(fehler = %e, "Bereit-Meldung nicht gesendet");
        }
        self.collab.ausgabe("Mit dem Voice-Chat verbunden", false);

        let wiedergabe = Wiedergabe::starten(self.collab.audio.clone(), self.zeiten.warteschlange);
        let aufgabe = tokio::spawn(async move {
            if let Err(e) = medien.empfangs_loop(&wiedergabe).await {
                let _ = signal_tx.send(SessionSignal::MedienkanalFehler(fehler_beschreiben(&e)));
            }
        });

        let mut aktiv = self.aktiv.lock().await;
        match aktiv.as_mut() {
            Some(s) if s.generation == generation => s.aufgaben.push(aufgabe),
            // Sitzung wurde inzwischen abgebaut
            _ => aufgabe.abort(),
        }
    }
}

/// Wertet die Signale einer Sitzung aus, bis sie endet
async fn ueberwachen(
    kern: Arc<Kern>,
    generation: u64,
    mut signale: mpsc::UnboundedReceiver<SessionSignal>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        let signal = tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            signal = signale.recv() => match signal {
                Some(s) => s,
                None => break,
            },
        };
        tracing::debug!(generation, signal = ?signal, "Sitzungssignal");

        let art = match signal {
            SessionSignal::VoiceFreigegeben => {
                kern.voice_starten(generation).await;
                continue;
            }
            SessionSignal::ServerGeschlossen => Abbau::ServerBeendet,
            SessionSignal::SteuerkanalFehler(grund) | SessionSignal::MedienkanalFehler(grund) => {
                Abbau::Verloren(grund)
            }
            SessionSignal::LebenszeichenAbgelaufen { sekunden } => {
                Abbau::Verloren(HushError::Lebenszeichen { sekunden }.to_string())
            }
        };
        kern.abbauen(generation, art).await;
        break;
    }
    tracing::debug!(generation, "Ueberwachung beendet");
}

/// Fehlertext mit OS-Fehlercode und Hinweis zur Ursache
fn fehler_beschreiben(fehler: &HushError) -> String {
    let mut text = fehler.to_string();
    if let Some(code) = fehler.fehlercode() {
        text.push_str(&format!(" (Fehlercode {code})"));
    }
    if let Some(hinweis) = fehler.hinweis() {
        text.push_str(". ");
        text.push_str(hinweis);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn beschreibung_enthaelt_code_und_hinweis() {
        let e = HushError::transport("Verbinden", io::Error::from_raw_os_error(111));
        let text = fehler_beschreiben(&e);
        assert!(text.contains("Fehlercode 111"));

        let e = HushError::Zeitlimit("Verbindung zu x:1".into());
        assert!(fehler_beschreiben(&e).contains("nicht erreichbar"));

        let e = HushError::protokoll("kaputt");
        assert_eq!(fehler_beschreiben(&e), "Protokollfehler: kaputt");
    }

    #[test]
    fn verbindungsdaten_aus_profil() {
        let profil = Profile {
            username: "bob".into(),
            host: "chat.example.org".into(),
            port: 4000,
            passwort: Some("geheim".into()),
            verbindungs_hinweise: true,
        };
        let daten = Verbindungsdaten::from(&profil);
        assert_eq!(daten.username, "bob");
        assert_eq!(daten.port, 4000);
        assert_eq!(daten.passwort.as_deref(), Some("geheim"));
    }

    #[tokio::test]
    async fn senden_ohne_sitzung_ist_nicht_verbunden() {
        let attrappen = hush_core::testing::Attrappen::neu();
        let session = Session::neu(attrappen.collaborators(), SitzungsZeiten::default(), "1.0");
        assert!(matches!(
            session.raum_betreten("Lobby").await,
            Err(HushError::NichtVerbunden)
        ));
        assert!(matches!(
            session.chat_senden(&"x".repeat(600)).await,
            Err(HushError::NachrichtZuLang { .. })
        ));
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn leerer_benutzername_bricht_ab() {
        let attrappen = hush_core::testing::Attrappen::neu();
        let session = Session::neu(attrappen.collaborators(), SitzungsZeiten::default(), "1.0");
        let mut phasen = session.phase_abonnieren();

        let ergebnis = session
            .verbinden(Verbindungsdaten {
                host: "127.0.0.1".into(),
                port: 1,
                username: "  ".into(),
                passwort: None,
            })
            .await;
        assert!(matches!(ergebnis, Err(HushError::UngueltigeEingabe(_))));
        assert_eq!(*phasen.borrow_and_update(), SessionPhase::Idle);
        assert!(attrappen
            .ui
            .events()
            .contains(&UiEvent::Bedienelemente(ControlsState::Getrennt)));
    }
}
