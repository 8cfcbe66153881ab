//! Lebenszeichen-Monitor
//!
//! Prueft in festem Takt, wie lange der letzte verarbeitete Frame des
//! Steuerkanals her ist. Ueberschreitet die Pause die Frist, meldet der
//! Monitor das genau einmal an die Sitzungssteuerung und endet.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use hush_core::SessionSignal;
use hush_signaling::ActivityClock;

/// Startet den Monitor als eigenen Task
///
/// Der Task endet, wenn `stop_rx` auf true wechselt oder der Sender
/// gedroppt wird.
pub fn monitor_starten(
    uhr: ActivityClock,
    frist: Duration,
    pruef_intervall: Duration,
    signale: mpsc::UnboundedSender<SessionSignal>,
    mut stop_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut takt = tokio::time::interval(pruef_intervall);
        takt.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Erster Tick kommt sofort
        takt.tick().await;

        loop {
            tokio::select! {
                biased;
                r = stop_rx.changed() => {
                    if r.is_err() || *stop_rx.borrow() {
                        tracing::debug!("Lebenszeichen-Monitor gestoppt");
                        return;
                    }
                }
                _ = takt.tick() => {
                    let pause = uhr.seit_letztem_empfang();
                    if pause > frist {
                        tracing::warn!(
                            pause_s = pause.as_secs(),
                            frist_s = frist.as_secs(),
                            "Keine Lebenszeichen vom Server"
                        );
                        let _ = signale.send(SessionSignal::LebenszeichenAbgelaufen {
                            sekunden: pause.as_secs(),
                        });
                        return;
                    }
                }
            }
        }
    })
}
