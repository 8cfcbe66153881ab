//! Hush Konsolen-Client – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging, verbindet mit dem
//! Server und liest danach Eingaben von stdin.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use hush_client::konsole::{Eingabe, KonsolenUi, OhneAudio};
use hush_client::logging::logging_initialisieren;
use hush_client::{ClientConfig, ConfigSettings, Session, Verbindungsdaten};
use hush_core::{Collaborators, SettingsStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("HUSH_CONFIG").unwrap_or_else(|_| "hush.toml".into());
    let config = ClientConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Hush Client wird initialisiert"
    );

    let settings = Arc::new(ConfigSettings::aus_config(&config));
    let collab = Collaborators {
        ui: Arc::new(KonsolenUi),
        audio: Arc::new(OhneAudio),
        settings: settings.clone(),
    };
    let session = Session::neu(
        collab,
        config.zeiten(),
        config.verbindung.client_version.clone(),
    );

    let daten = Verbindungsdaten::from(&settings.current_profile());
    if session.verbinden(daten).await.is_err() {
        // Ursache wurde bereits ausgegeben
        std::process::exit(1);
    }

    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let zeile = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            zeile = zeilen.next_line() => match zeile? {
                Some(z) => z,
                None => break,
            },
        };

        let ergebnis = match Eingabe::parsen(&zeile) {
            Eingabe::Beenden => break,
            Eingabe::Leer => continue,
            Eingabe::Chat(text) => session.chat_senden(&text).await,
            Eingabe::RaumBetreten {
                raum,
                passwort: Some(passwort),
            } => session.raum_betreten_mit_passwort(&raum, &passwort).await,
            Eingabe::RaumBetreten { raum, passwort: None } => session.raum_betreten(&raum).await,
            Eingabe::Unbekannt(befehl) => {
                println!("Unbekannter Befehl: {befehl} (/join <raum> [passwort], /quit)");
                continue;
            }
        };
        if let Err(e) = ergebnis {
            println!("[Fehler] {e}");
        }
    }

    session.trennen().await;
    tracing::info!("Hush Client beendet");
    Ok(())
}
