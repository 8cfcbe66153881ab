//! Presence – lokales Abbild der Raeume und Benutzer des Servers
//!
//! Ein einziger Mutex schuetzt das gesamte Verzeichnis (Raeume und
//! Benutzer als eine Einheit). Jede Operation haelt ihn genau fuer eine
//! strukturelle Aenderung oder einen Lesezugriff und nie ueber einen
//! Netzwerkaufruf hinweg.
//!
//! Invarianten:
//! - ein Benutzer ist Mitglied hoechstens eines Raums
//! - die Liste der anderen Benutzer enthaelt nie den lokalen Benutzer
//! - jeder Raumname existiert hoechstens einmal

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use hush_core::DisconnectReason;
use hush_protocol::PresenceSnapshot;

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Vom Server gemeldete Aenderung passt nicht zum lokalen Zustand
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenceError {
    #[error("Unbekannter Benutzer: {0}")]
    UnbekannterBenutzer(String),

    #[error("Unbekannter Raum: {0}")]
    UnbekannterRaum(String),

    #[error("Raum existiert bereits: {0}")]
    RaumExistiert(String),

    #[error("Benutzer existiert bereits: {0}")]
    BenutzerExistiert(String),
}

// ---------------------------------------------------------------------------
// Entitaeten
// ---------------------------------------------------------------------------

/// Ein Teilnehmer (lokal oder entfernt)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Benutzer {
    pub name: String,
    pub ping_ms: u16,
    pub spricht: bool,
}

impl Benutzer {
    fn neu(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ping_ms: 0,
            spricht: false,
        }
    }
}

/// Ein Raum mit seinen Mitgliedern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raum {
    pub name: String,
    pub passwort: Option<String>,
    pub max_benutzer: u32,
    pub willkommen: bool,
    pub mitglieder: Vec<String>,
}

/// Ergebnis von `benutzer_entfernen`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntfernterBenutzer {
    pub benutzer: Benutzer,
    pub raum: Option<String>,
    pub grund: DisconnectReason,
}

/// Ergebnis von `benutzer_verschieben`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verschiebung {
    pub von: Option<String>,
    pub nach: String,
}

// ---------------------------------------------------------------------------
// Verzeichnis (nur unter dem Lock erreichbar)
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Verzeichnis {
    raeume: Vec<Raum>,
    andere: HashMap<String, Benutzer>,
    lokal: Option<Benutzer>,
}

impl Verzeichnis {
    fn raum_index(&self, name: &str) -> Option<usize> {
        self.raeume.iter().position(|r| r.name == name)
    }

    fn raum_von(&self, benutzer: &str) -> Option<&Raum> {
        self.raeume
            .iter()
            .find(|r| r.mitglieder.iter().any(|m| m == benutzer))
    }

    fn ist_lokal(&self, name: &str) -> bool {
        self.lokal.as_ref().is_some_and(|l| l.name == name)
    }

    fn existiert(&self, name: &str) -> bool {
        self.ist_lokal(name) || self.andere.contains_key(name)
    }

    /// Entfernt den Benutzer aus seinem Raum, gibt den Raumnamen zurueck
    fn austragen(&mut self, benutzer: &str) -> Option<String> {
        for raum in &mut self.raeume {
            if let Some(pos) = raum.mitglieder.iter().position(|m| m == benutzer) {
                raum.mitglieder.remove(pos);
                return Some(raum.name.clone());
            }
        }
        None
    }

    fn willkommens_index(&self) -> Option<usize> {
        self.raeume.iter().position(|r| r.willkommen)
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Geteilter Zugriff auf das Verzeichnis
#[derive(Debug, Clone, Default)]
pub struct Presence {
    inner: Arc<Mutex<Verzeichnis>>,
}

impl Presence {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Uebernimmt den initialen Snapshot
    ///
    /// Der erste Raum wird Willkommensraum, der lokale Benutzer landet
    /// dort. Gibt die Online-Anzahl (Snapshot + lokaler Benutzer) zurueck.
    pub fn snapshot_laden(&self, snapshot: &PresenceSnapshot, lokaler_name: &str) -> u32 {
        let mut v = self.inner.lock();
        *v = Verzeichnis::default();

        for (i, eintrag) in snapshot.raeume.iter().enumerate() {
            if v.raum_index(&eintrag.name).is_some() {
                tracing::warn!(raum = %eintrag.name, "Doppelter Raum im Snapshot ignoriert");
                continue;
            }
            let mut raum = Raum {
                name: eintrag.name.clone(),
                passwort: None,
                max_benutzer: eintrag.max_benutzer as u32,
                willkommen: i == 0,
                mitglieder: Vec::with_capacity(eintrag.benutzer.len()),
            };
            for name in &eintrag.benutzer {
                if name == lokaler_name || v.andere.contains_key(name) {
                    tracing::warn!(benutzer = %name, "Doppelter Benutzer im Snapshot ignoriert");
                    continue;
                }
                v.andere.insert(name.clone(), Benutzer::neu(name));
                raum.mitglieder.push(name.clone());
            }
            v.raeume.push(raum);
        }

        v.lokal = Some(Benutzer::neu(lokaler_name));
        if let Some(willkommen) = v.raeume.first_mut() {
            willkommen.mitglieder.push(lokaler_name.to_string());
        }

        1 + v.andere.len() as u32
    }

    /// Neuer Benutzer betritt den Server (landet im Willkommensraum)
    pub fn benutzer_hinzufuegen(&self, name: &str) -> Result<Option<String>, PresenceError> {
        let mut v = self.inner.lock();
        if v.existiert(name) {
            return Err(PresenceError::BenutzerExistiert(name.to_string()));
        }
        v.andere.insert(name.to_string(), Benutzer::neu(name));
        let raum = v.willkommens_index().map(|i| {
            v.raeume[i].mitglieder.push(name.to_string());
            v.raeume[i].name.clone()
        });
        Ok(raum)
    }

    /// Benutzer verlaesst den Server
    pub fn benutzer_entfernen(
        &self,
        name: &str,
        grund: DisconnectReason,
    ) -> Result<EntfernterBenutzer, PresenceError> {
        let mut v = self.inner.lock();
        let benutzer = v
            .andere
            .remove(name)
            .ok_or_else(|| PresenceError::UnbekannterBenutzer(name.to_string()))?;
        let raum = v.austragen(name);
        Ok(EntfernterBenutzer {
            benutzer,
            raum,
            grund,
        })
    }

    /// Verschiebt einen Benutzer (auch den lokalen) atomar in einen anderen Raum
    pub fn benutzer_verschieben(&self, name: &str, ziel: &str) -> Result<Verschiebung, PresenceError> {
        let mut v = self.inner.lock();
        if !v.existiert(name) {
            return Err(PresenceError::UnbekannterBenutzer(name.to_string()));
        }
        let ziel_index = v
            .raum_index(ziel)
            .ok_or_else(|| PresenceError::UnbekannterRaum(ziel.to_string()))?;

        let von = v.austragen(name);
        v.raeume[ziel_index].mitglieder.push(name.to_string());
        Ok(Verschiebung {
            von,
            nach: ziel.to_string(),
        })
    }

    /// Legt einen Raum am Ende der Liste an
    pub fn raum_hinzufuegen(&self, name: &str, max_benutzer: u32) -> Result<(), PresenceError> {
        let mut v = self.inner.lock();
        if v.raum_index(name).is_some() {
            return Err(PresenceError::RaumExistiert(name.to_string()));
        }
        v.raeume.push(Raum {
            name: name.to_string(),
            passwort: None,
            max_benutzer,
            willkommen: false,
            mitglieder: Vec::new(),
        });
        Ok(())
    }

    /// Loescht einen Raum; seine Mitglieder werden heimatlos
    pub fn raum_entfernen(&self, name: &str) -> Result<Vec<String>, PresenceError> {
        let mut v = self.inner.lock();
        let index = v
            .raum_index(name)
            .ok_or_else(|| PresenceError::UnbekannterRaum(name.to_string()))?;
        Ok(v.raeume.remove(index).mitglieder)
    }

    /// Benennt einen Raum um und/oder aendert seine Kapazitaet
    pub fn raum_aendern(
        &self,
        alter_name: &str,
        neuer_name: &str,
        max_benutzer: u32,
    ) -> Result<(), PresenceError> {
        let mut v = self.inner.lock();
        let index = v
            .raum_index(alter_name)
            .ok_or_else(|| PresenceError::UnbekannterRaum(alter_name.to_string()))?;
        if alter_name != neuer_name && v.raum_index(neuer_name).is_some() {
            return Err(PresenceError::RaumExistiert(neuer_name.to_string()));
        }
        let raum = &mut v.raeume[index];
        raum.name = neuer_name.to_string();
        raum.max_benutzer = max_benutzer;
        Ok(())
    }

    /// Tauscht einen Raum mit seinem Nachbarn
    ///
    /// Am Rand der Liste bleibt die Reihenfolge unveraendert.
    pub fn raum_verschieben(&self, name: &str, nach_oben: bool) -> Result<(), PresenceError> {
        let mut v = self.inner.lock();
        let index = v
            .raum_index(name)
            .ok_or_else(|| PresenceError::UnbekannterRaum(name.to_string()))?;
        let ziel = if nach_oben {
            index.checked_sub(1)
        } else {
            Some(index + 1).filter(|&i| i < v.raeume.len())
        };
        if let Some(ziel) = ziel {
            v.raeume.swap(index, ziel);
        }
        Ok(())
    }

    /// Setzt den Ping; gibt den aktuellen "spricht"-Status zurueck
    pub fn ping_setzen(&self, name: &str, ping_ms: u16) -> Option<bool> {
        let mut v = self.inner.lock();
        let benutzer = if v.ist_lokal(name) {
            v.lokal.as_mut()
        } else {
            v.andere.get_mut(name)
        }?;
        benutzer.ping_ms = ping_ms;
        Some(benutzer.spricht)
    }

    /// Setzt den "spricht"-Status; gibt den Ping zurueck wenn sich etwas geaendert hat
    pub fn spricht_setzen(&self, name: &str, spricht: bool) -> Option<u16> {
        let mut v = self.inner.lock();
        let benutzer = v.andere.get_mut(name)?;
        if benutzer.spricht == spricht {
            return None;
        }
        benutzer.spricht = spricht;
        Some(benutzer.ping_ms)
    }

    /// Verwirft den gesamten Zustand
    pub fn leeren(&self) {
        *self.inner.lock() = Verzeichnis::default();
    }

    // --- Lesezugriffe ---

    /// Kopie aller Raeume in Anzeigereihenfolge
    pub fn raeume(&self) -> Vec<Raum> {
        self.inner.lock().raeume.clone()
    }

    /// Raum eines Benutzers (None = heimatlos oder unbekannt)
    pub fn raum_von(&self, name: &str) -> Option<String> {
        self.inner.lock().raum_von(name).map(|r| r.name.clone())
    }

    pub fn lokaler_benutzer(&self) -> Option<Benutzer> {
        self.inner.lock().lokal.clone()
    }

    /// Raum des lokalen Benutzers
    pub fn lokaler_raum(&self) -> Option<String> {
        let v = self.inner.lock();
        let lokal = v.lokal.as_ref()?;
        v.raum_von(&lokal.name).map(|r| r.name.clone())
    }

    pub fn willkommensraum(&self) -> Option<String> {
        let v = self.inner.lock();
        v.willkommens_index().map(|i| v.raeume[i].name.clone())
    }

    /// Ein anderer Benutzer
    pub fn benutzer(&self, name: &str) -> Option<Benutzer> {
        self.inner.lock().andere.get(name).cloned()
    }

    /// Namen aller anderen Benutzer (sortiert)
    pub fn andere_benutzer(&self) -> Vec<String> {
        let mut namen: Vec<String> = self.inner.lock().andere.keys().cloned().collect();
        namen.sort();
        namen
    }

    pub fn ist_leer(&self) -> bool {
        let v = self.inner.lock();
        v.raeume.is_empty() && v.andere.is_empty() && v.lokal.is_none()
    }

    /// Prueft die Invarianten des Verzeichnisses
    pub fn ist_konsistent(&self) -> bool {
        let v = self.inner.lock();
        if let Some(lokal) = &v.lokal {
            if v.andere.contains_key(&lokal.name) {
                return false;
            }
        }
        let mut gesehen: HashMap<&str, usize> = HashMap::new();
        for raum in &v.raeume {
            for mitglied in &raum.mitglieder {
                if !v.existiert(mitglied) {
                    return false;
                }
                *gesehen.entry(mitglied.as_str()).or_default() += 1;
            }
        }
        let mut namen: Vec<&str> = v.raeume.iter().map(|r| r.name.as_str()).collect();
        namen.sort_unstable();
        namen.dedup();
        namen.len() == v.raeume.len() && gesehen.values().all(|&n| n == 1)
    }
}
