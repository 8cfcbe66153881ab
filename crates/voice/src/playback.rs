//! Wiedergabe-Queue – entkoppelt den UDP-Empfang vom Audio-Collaborator
//!
//! Der Empfang legt dekodierte Frames nicht-blockierend ab; ein eigener
//! Blocking-Task reicht sie der Reihe nach an `AudioSink::play_voice`
//! weiter. Ist die Queue voll, wird der Frame verworfen (UDP-Semantik).

use std::sync::Arc;

use tokio::sync::mpsc;

use hush_core::AudioSink;

/// Ein abzuspielender Frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiedergabeAuftrag {
    pub absender: String,
    /// `None` beim letzten Frame eines Absenders
    pub samples: Option<Vec<i16>>,
    pub letzter: bool,
}

/// Handle auf den Wiedergabe-Task
///
/// Wird das Handle gedroppt, endet der Task nach dem letzten Auftrag.
pub struct Wiedergabe {
    tx: mpsc::Sender<WiedergabeAuftrag>,
    _task: tokio::task::JoinHandle<()>,
}

impl Wiedergabe {
    /// Startet den Wiedergabe-Task
    pub fn starten(audio: Arc<dyn AudioSink>, queue_groesse: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<WiedergabeAuftrag>(queue_groesse.max(1));

        let task = tokio::task::spawn_blocking(move || {
            while let Some(auftrag) = rx.blocking_recv() {
                audio.play_voice(&auftrag.absender, auftrag.samples, auftrag.letzter);
            }
            tracing::debug!("Wiedergabe-Task beendet");
        });

        Self { tx, _task: task }
    }

    /// Legt einen Frame ab; false wenn er verworfen wurde
    pub fn einreihen(&self, auftrag: WiedergabeAuftrag) -> bool {
        match self.tx.try_send(auftrag) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(auftrag)) => {
                tracing::warn!(absender = %auftrag.absender, "Wiedergabe-Queue voll – Frame verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Wiedergabe-Queue geschlossen");
                false
            }
        }
    }
}
