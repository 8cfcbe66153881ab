//! Property-Tests fuer das Presence-Verzeichnis
//!
//! Beliebige Folgen von Server-Aenderungen (auch widerspruechliche)
//! duerfen die Invarianten nie verletzen:
//!
//! 1. Jeder Benutzer ist Mitglied hoechstens eines Raums
//! 2. Der lokale Benutzer steht nie in der Liste der anderen
//! 3. Raumnamen sind eindeutig

use hush_core::DisconnectReason;
use hush_protocol::control::SnapshotRaum;
use hush_protocol::PresenceSnapshot;
use hush_signaling::Presence;
use proptest::prelude::*;

const NAMEN: &[&str] = &["ann", "ben", "bob", "eve", "max"];
const RAEUME: &[&str] = &["Lobby", "Spiele", "Musik", "Leise"];

#[derive(Debug, Clone)]
enum Aenderung {
    BenutzerNeu(usize),
    BenutzerWeg(usize),
    Verschieben(usize, usize),
    RaumNeu(usize),
    RaumWeg(usize),
    RaumUmbenennen(usize, usize),
    RaumSchieben(usize, bool),
}

fn aenderung() -> impl Strategy<Value = Aenderung> {
    let n = NAMEN.len();
    let r = RAEUME.len();
    prop_oneof![
        (0..n).prop_map(Aenderung::BenutzerNeu),
        (0..n).prop_map(Aenderung::BenutzerWeg),
        (0..n, 0..r).prop_map(|(b, z)| Aenderung::Verschieben(b, z)),
        (0..r).prop_map(Aenderung::RaumNeu),
        (0..r).prop_map(Aenderung::RaumWeg),
        (0..r, 0..r).prop_map(|(a, b)| Aenderung::RaumUmbenennen(a, b)),
        (0..r, any::<bool>()).prop_map(|(i, oben)| Aenderung::RaumSchieben(i, oben)),
    ]
}

fn startzustand() -> Presence {
    let presence = Presence::neu();
    presence.snapshot_laden(
        &PresenceSnapshot {
            raeume: vec![
                SnapshotRaum {
                    name: "Lobby".into(),
                    max_benutzer: 10,
                    benutzer: vec!["ann".into()],
                },
                SnapshotRaum {
                    name: "Spiele".into(),
                    max_benutzer: 5,
                    benutzer: vec![],
                },
            ],
        },
        "bob",
    );
    presence
}

fn anwenden(presence: &Presence, aenderung: &Aenderung) {
    // Fehler sind erlaubt, nur die Invarianten zaehlen
    let _ = match *aenderung {
        Aenderung::BenutzerNeu(b) => presence.benutzer_hinzufuegen(NAMEN[b]).map(|_| ()),
        Aenderung::BenutzerWeg(b) => presence
            .benutzer_entfernen(NAMEN[b], DisconnectReason::Getrennt)
            .map(|_| ()),
        Aenderung::Verschieben(b, z) => presence.benutzer_verschieben(NAMEN[b], RAEUME[z]).map(|_| ()),
        Aenderung::RaumNeu(r) => presence.raum_hinzufuegen(RAEUME[r], 8),
        Aenderung::RaumWeg(r) => presence.raum_entfernen(RAEUME[r]).map(|_| ()),
        Aenderung::RaumUmbenennen(a, b) => presence.raum_aendern(RAEUME[a], RAEUME[b], 3),
        Aenderung::RaumSchieben(r, oben) => presence.raum_verschieben(RAEUME[r], oben),
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn invarianten_bleiben_erhalten(aenderungen in prop::collection::vec(aenderung(), 0..60)) {
        let presence = startzustand();
        for a in &aenderungen {
            anwenden(&presence, a);
            prop_assert!(presence.ist_konsistent(), "verletzt nach {:?}", a);
        }
        prop_assert!(!presence.andere_benutzer().contains(&"bob".to_string()));
    }

    #[test]
    fn verschieben_hinterlaesst_genau_eine_mitgliedschaft(
        aenderungen in prop::collection::vec(aenderung(), 0..30),
        ziel in 0..RAEUME.len(),
    ) {
        let presence = startzustand();
        for a in &aenderungen {
            anwenden(&presence, a);
        }
        if presence.benutzer_verschieben("bob", RAEUME[ziel]).is_ok() {
            let mitgliedschaften = presence
                .raeume()
                .iter()
                .filter(|r| r.mitglieder.iter().any(|m| m == "bob"))
                .count();
            prop_assert_eq!(mitgliedschaften, 1);
            let lokaler_raum = presence.lokaler_raum();
            prop_assert_eq!(lokaler_raum.as_deref(), Some(RAEUME[ziel]));
        }
    }
}
