//! Konsolen-Frontend: UI-Ereignisse als Textzeilen, Audio ohne Geraet

use hush_core::{AudioSink, ControlsState, DisconnectReason, SoundEvent, UiEvent, UiSink};

/// Gibt UI-Ereignisse zeilenweise auf stdout aus
#[derive(Debug, Default)]
pub struct KonsolenUi;

impl UiSink for KonsolenUi {
    fn anzeigen(&self, event: UiEvent) {
        if let Some(zeile) = zeile_formatieren(&event) {
            println!("{zeile}");
        }
    }
}

/// Formatiert ein Ereignis; `None` fuer Ereignisse ohne Textausgabe
pub fn zeile_formatieren(event: &UiEvent) -> Option<String> {
    let zeile = match event {
        UiEvent::Ausgabe { text, fehler: true } => format!("[Fehler] {text}"),
        UiEvent::Ausgabe { text, .. } => text.clone(),
        UiEvent::Hinweisfenster { warnung: true, text } => format!("[Warnung] {text}"),
        UiEvent::Hinweisfenster { text, .. } => format!("[Hinweis] {text}"),
        UiEvent::ChatNachricht { kopf, text } => format!("{kopf}{text}"),
        UiEvent::ServerNachricht { text } => format!("[Server] {text}"),
        UiEvent::PasswortAbfrage { raum } => {
            format!("Raum \"{raum}\" verlangt ein Passwort: /join {raum} <passwort>")
        }
        UiEvent::RaumHinzugefuegt {
            name,
            max_benutzer,
            willkommen,
        } => {
            let markierung = if *willkommen { " (Willkommensraum)" } else { "" };
            format!("+ Raum {name} [max. {max_benutzer}]{markierung}")
        }
        UiEvent::RaumGeloescht { name } => format!("- Raum {name}"),
        UiEvent::RaumGeaendert {
            alter_name,
            neuer_name,
            max_benutzer,
        } => format!("~ Raum {alter_name} -> {neuer_name} [max. {max_benutzer}]"),
        UiEvent::BenutzerVerschoben { name, raum } => format!("{name} -> {raum}"),
        UiEvent::VerbindungsHinweis { name } => format!("{name} hat sich verbunden"),
        UiEvent::TrennHinweis { name, grund } => {
            let wie = match grund {
                DisconnectReason::Getrennt => "hat sich getrennt",
                DisconnectReason::Verloren => "hat die Verbindung verloren",
                DisconnectReason::Gekickt => "wurde gekickt",
            };
            format!("{name} {wie}")
        }
        UiEvent::OnlineAnzahl(n) => format!("Online: {n}"),
        UiEvent::Bedienelemente(ControlsState::Getrennt) => {
            "Getrennt. Beenden mit /quit".to_string()
        }
        // Reine Listenpflege, auf der Konsole ohne Ausgabe
        UiEvent::RaumVerschoben { .. }
        | UiEvent::BenutzerHinzugefuegt { .. }
        | UiEvent::BenutzerEntfernt { .. }
        | UiEvent::PingAktualisiert { .. }
        | UiEvent::BenutzerlisteGeleert
        | UiEvent::Bedienelemente(_) => return None,
    };
    Some(zeile)
}

/// Audio-Collaborator ohne Geraet: Voice bleibt aus, Toene werden geloggt
#[derive(Debug, Default)]
pub struct OhneAudio;

impl AudioSink for OhneAudio {
    fn start(&self) -> bool {
        false
    }

    fn stop(&self) {}

    fn setup_user_audio(&self, _user: &str) {}

    fn delete_user_audio(&self, _user: &str) {}

    fn play_voice(&self, _user: &str, _samples: Option<Vec<i16>>, _ist_letzter: bool) {}

    fn play_sound(&self, sound: SoundEvent) {
        tracing::debug!(?sound, "Hinweiston");
    }

    fn samples_pro_frame(&self) -> usize {
        // 20 ms bei 48 kHz
        960
    }
}

/// Eine Eingabezeile der Konsole
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eingabe {
    Chat(String),
    RaumBetreten {
        raum: String,
        passwort: Option<String>,
    },
    Beenden,
    Leer,
    Unbekannt(String),
}

impl Eingabe {
    pub fn parsen(zeile: &str) -> Self {
        let zeile = zeile.trim();
        if zeile.is_empty() {
            return Self::Leer;
        }
        let Some(befehl) = zeile.strip_prefix('/') else {
            return Self::Chat(zeile.to_string());
        };

        let mut teile = befehl.split_whitespace();
        match teile.next() {
            Some("quit") | Some("exit") => Self::Beenden,
            Some("join") => match teile.next() {
                Some(raum) => Self::RaumBetreten {
                    raum: raum.to_string(),
                    passwort: teile.next().map(str::to_string),
                },
                None => Self::Unbekannt(zeile.to_string()),
            },
            _ => Self::Unbekannt(zeile.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eingaben_parsen() {
        assert_eq!(Eingabe::parsen("  hallo  "), Eingabe::Chat("hallo".into()));
        assert_eq!(Eingabe::parsen("/quit"), Eingabe::Beenden);
        assert_eq!(Eingabe::parsen(""), Eingabe::Leer);
        assert_eq!(
            Eingabe::parsen("/join Spiele"),
            Eingabe::RaumBetreten {
                raum: "Spiele".into(),
                passwort: None
            }
        );
        assert_eq!(
            Eingabe::parsen("/join Geheim 1234"),
            Eingabe::RaumBetreten {
                raum: "Geheim".into(),
                passwort: Some("1234".into())
            }
        );
        assert!(matches!(Eingabe::parsen("/join"), Eingabe::Unbekannt(_)));
        assert!(matches!(Eingabe::parsen("/kick ann"), Eingabe::Unbekannt(_)));
    }

    #[test]
    fn zeilen_formatieren() {
        assert_eq!(
            zeile_formatieren(&UiEvent::ChatNachricht {
                kopf: "12:30. ann: ".into(),
                text: "hi".into()
            })
            .as_deref(),
            Some("12:30. ann: hi")
        );
        assert_eq!(
            zeile_formatieren(&UiEvent::Ausgabe {
                text: "kaputt".into(),
                fehler: true
            })
            .as_deref(),
            Some("[Fehler] kaputt")
        );
        assert!(zeile_formatieren(&UiEvent::BenutzerlisteGeleert).is_none());
    }
}
