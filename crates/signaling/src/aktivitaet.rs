//! Zeitpunkt des letzten vollstaendig verarbeiteten Frames
//!
//! Die Empfangsschleife schreibt, der Lebenszeichen-Monitor liest.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Geteilte Uhr der Empfangsaktivitaet
#[derive(Debug, Clone)]
pub struct ActivityClock {
    letzte: Arc<Mutex<Instant>>,
}

impl ActivityClock {
    pub fn neu() -> Self {
        Self {
            letzte: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Markiert "jetzt" als letzten Empfang
    pub fn beruehren(&self) {
        *self.letzte.lock() = Instant::now();
    }

    /// Zeit seit dem letzten Empfang
    pub fn seit_letztem_empfang(&self) -> Duration {
        self.letzte.lock().elapsed()
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::neu()
    }
}
