//! Befehls-Dispatcher – wendet Server-Befehle auf Presence, UI und Audio an
//!
//! Laeuft ausschliesslich innerhalb der Empfangsschleife des Steuerkanals.
//! Unstimmigkeiten zwischen Server und lokalem Verzeichnis werden
//! protokolliert, beenden die Sitzung aber nicht.

use tokio::sync::mpsc;

use hush_core::{Collaborators, DisconnectReason, HushError, Result, SessionSignal, SoundEvent, UiEvent};
use hush_crypto::SessionCipher;
use hush_protocol::control::{PingEintrag, ServerCommand};
use hush_protocol::wire::utf16le_dekodieren;

use crate::channel::ControlChannel;
use crate::presence::{EntfernterBenutzer, Presence};

/// Fuehrt gelesene Befehle aus
pub struct CommandDispatcher {
    presence: Presence,
    collab: Collaborators,
    cipher: SessionCipher,
    signale: mpsc::UnboundedSender<SessionSignal>,
    lokaler_name: String,
}

impl CommandDispatcher {
    pub fn neu(
        presence: Presence,
        collab: Collaborators,
        cipher: SessionCipher,
        signale: mpsc::UnboundedSender<SessionSignal>,
        lokaler_name: impl Into<String>,
    ) -> Self {
        Self {
            presence,
            collab,
            cipher,
            signale,
            lokaler_name: lokaler_name.into(),
        }
    }

    /// Fuehrt einen Befehl aus
    ///
    /// Fehler beim Beantworten eines Keepalive werden zurueckgegeben,
    /// alles andere wird hier abgehandelt.
    pub async fn ausfuehren(&self, befehl: ServerCommand, kanal: &ControlChannel) -> Result<()> {
        tracing::trace!(befehl = ?befehl, "Befehl empfangen");

        match befehl {
            ServerCommand::NeuerBenutzer { online, name } => self.neuer_benutzer(online, name),
            ServerCommand::BenutzerWeg {
                grund,
                online,
                name,
            } => self.benutzer_weg(grund, online, name),
            ServerCommand::VoiceBereit => {
                if self.signale.send(SessionSignal::VoiceFreigegeben).is_err() {
                    tracing::debug!("Sitzungssteuerung beendet, Voice-Freigabe verworfen");
                }
            }
            ServerCommand::SpamHinweis => {
                self.collab
                    .hinweis(true, "Nachrichten koennen nicht so schnell hintereinander gesendet werden.");
            }
            ServerCommand::PingBericht(eintraege) => self.ping_bericht(eintraege),
            ServerCommand::KeepAlive => {
                kanal.keepalive_beantworten().await?;
            }
            ServerCommand::ChatNachricht { kopf, chiffrat } => self.chat_nachricht(kopf, &chiffrat),
            ServerCommand::Gekickt => {
                self.collab.ausgabe("Du wurdest vom Server entfernt.", true);
            }
            ServerCommand::PasswortSperre => {
                self.collab.hinweis(
                    true,
                    "Nach einem falschen Passwort bitte einige Sekunden warten.",
                );
            }
            ServerCommand::ServerNachricht(text) => {
                self.collab.ui.anzeigen(UiEvent::ServerNachricht { text });
                self.collab.audio.play_sound(SoundEvent::ServerNachricht);
            }
            ServerCommand::RaumBetretbar { raum } => {
                let name = self.lokaler_name.clone();
                self.verschieben(name, raum);
            }
            ServerCommand::RaumVoll => self.collab.hinweis(true, "Der Raum ist voll."),
            ServerCommand::RaumPasswortNoetig { raum } => {
                self.collab.ui.anzeigen(UiEvent::PasswortAbfrage { raum });
            }
            ServerCommand::RaumPasswortFalsch => self.collab.hinweis(true, "Falsches Passwort."),
            ServerCommand::BenutzerBetrittRaum { benutzer, raum } => self.verschieben(benutzer, raum),
            ServerCommand::RaumVerschoben { raum, nach_oben } => {
                match self.presence.raum_verschieben(&raum, nach_oben) {
                    Ok(()) => self.collab.ui.anzeigen(UiEvent::RaumVerschoben {
                        name: raum,
                        nach_oben,
                    }),
                    Err(e) => tracing::warn!(fehler = %e, "Raum konnte nicht verschoben werden"),
                }
            }
            ServerCommand::RaumGeloescht { raum } => match self.presence.raum_entfernen(&raum) {
                Ok(vertrieben) => {
                    tracing::debug!(raum = %raum, heimatlos = vertrieben.len(), "Raum geloescht");
                    // Listeneintraege verschwinden mit dem Raum
                    for name in vertrieben {
                        self.collab.ui.anzeigen(UiEvent::BenutzerEntfernt { name });
                    }
                    self.collab.ui.anzeigen(UiEvent::RaumGeloescht { name: raum });
                }
                Err(e) => tracing::warn!(fehler = %e, "Raum konnte nicht geloescht werden"),
            },
            ServerCommand::RaumErstellt { raum, max_benutzer } => {
                match self.presence.raum_hinzufuegen(&raum, max_benutzer) {
                    Ok(()) => self.collab.ui.anzeigen(UiEvent::RaumHinzugefuegt {
                        name: raum,
                        max_benutzer,
                        willkommen: false,
                    }),
                    Err(e) => tracing::warn!(fehler = %e, "Raum konnte nicht angelegt werden"),
                }
            }
            ServerCommand::RaumGeaendert {
                alter_name,
                neuer_name,
                max_benutzer,
            } => match self
                .presence
                .raum_aendern(&alter_name, &neuer_name, max_benutzer)
            {
                Ok(()) => self.collab.ui.anzeigen(UiEvent::RaumGeaendert {
                    alter_name,
                    neuer_name,
                    max_benutzer,
                }),
                Err(e) => tracing::warn!(fehler = %e, "Raum konnte nicht geaendert werden"),
            },
        }

        Ok(())
    }

    fn neuer_benutzer(&self, online: u32, name: String) {
        self.collab.ui.anzeigen(UiEvent::OnlineAnzahl(online));

        let raum = match self.presence.benutzer_hinzufuegen(&name) {
            Ok(raum) => raum,
            Err(e) => {
                tracing::warn!(fehler = %e, "Neuer Benutzer nicht uebernommen");
                return;
            }
        };

        self.collab.audio.setup_user_audio(&name);
        if raum.is_some() && self.presence.lokaler_raum() == raum {
            self.collab.audio.play_sound(SoundEvent::BenutzerKommt);
        }
        self.collab.ui.anzeigen(UiEvent::BenutzerHinzugefuegt {
            name: name.clone(),
            raum,
        });

        if self.collab.settings.current_profile().verbindungs_hinweise {
            self.collab.ui.anzeigen(UiEvent::VerbindungsHinweis { name });
        }
    }

    fn benutzer_weg(&self, grund: DisconnectReason, online: u32, name: String) {
        self.collab.ui.anzeigen(UiEvent::OnlineAnzahl(online));

        let entfernt = match self.presence.benutzer_entfernen(&name, grund) {
            Ok(entfernt) => entfernt,
            Err(e) => {
                tracing::warn!(fehler = %e, "Abgemeldeter Benutzer war nicht bekannt");
                return;
            }
        };
        let im_eigenen_raum =
            entfernt.raum.is_some() && entfernt.raum == self.presence.lokaler_raum();

        // Audio-Abbau ausserhalb der Empfangsschleife
        let collab = self.collab.clone();
        tokio::task::spawn_blocking(move || aufraeumen(collab, entfernt, im_eigenen_raum));
    }

    fn ping_bericht(&self, eintraege: Vec<PingEintrag>) {
        for PingEintrag { name, ping_ms } in eintraege {
            match self.presence.ping_setzen(&name, ping_ms) {
                Some(spricht) => self.collab.ui.anzeigen(UiEvent::PingAktualisiert {
                    name,
                    ping_ms,
                    spricht,
                }),
                None => tracing::debug!(benutzer = %name, "Ping fuer unbekannten Benutzer"),
            }
        }
    }

    fn chat_nachricht(&self, kopf: String, chiffrat: &[u8]) {
        let text = match self
            .cipher
            .entschluesseln(chiffrat)
            .map_err(HushError::from)
            .and_then(|klartext| utf16le_dekodieren("chat_text", &klartext).map_err(HushError::from))
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(fehler = %e, "Chat-Nachricht nicht lesbar");
                return;
            }
        };

        self.collab.ui.anzeigen(UiEvent::ChatNachricht { kopf, text });
        self.collab.audio.play_sound(SoundEvent::NeueNachricht);
    }

    fn verschieben(&self, benutzer: String, raum: String) {
        let eigener_raum_vorher = self.presence.lokaler_raum();

        let verschiebung = match self.presence.benutzer_verschieben(&benutzer, &raum) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(fehler = %e, "Raumwechsel nicht uebernommen");
                return;
            }
        };

        if benutzer != self.lokaler_name {
            if verschiebung.von.is_some() && verschiebung.von == eigener_raum_vorher {
                self.collab.audio.play_sound(SoundEvent::BenutzerGeht);
            } else if eigener_raum_vorher.as_deref() == Some(raum.as_str()) {
                self.collab.audio.play_sound(SoundEvent::BenutzerKommt);
            }
        }

        self.collab
            .ui
            .anzeigen(UiEvent::BenutzerVerschoben { name: benutzer, raum });
    }
}

/// Nebenwirkungen einer Abmeldung
fn aufraeumen(collab: Collaborators, entfernt: EntfernterBenutzer, im_eigenen_raum: bool) {
    let name = entfernt.benutzer.name;
    if im_eigenen_raum {
        collab.audio.play_sound(SoundEvent::BenutzerGeht);
    }
    collab.audio.delete_user_audio(&name);
    collab.ui.anzeigen(UiEvent::BenutzerEntfernt { name: name.clone() });

    if collab.settings.current_profile().verbindungs_hinweise {
        collab.ui.anzeigen(UiEvent::TrennHinweis {
            name,
            grund: entfernt.grund,
        });
    }
}
