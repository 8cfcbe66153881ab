//! Fehlertypen fuer das Kryptografie-Subsystem

use hush_core::HushError;
use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Oeffentlicher Wert nicht lesbar: '{0}'")]
    UngueltigerOeffentlicherWert(String),

    #[error("Unbrauchbare Parameter: p={p}, g={g}")]
    UngueltigeParameter { p: u32, g: u32 },

    #[error("Ungueltige Chiffrat-Laenge: {laenge} ist kein Vielfaches von {block}")]
    UngueltigeChiffratLaenge { laenge: usize, block: usize },
}

/// Result-Alias fuer Krypto-Operationen
pub type CryptoResult<T> = Result<T, CryptoError>;

impl From<CryptoError> for HushError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::UngueltigeChiffratLaenge { .. } => HushError::protokoll(e.to_string()),
            andere => HushError::Schluessel(andere.to_string()),
        }
    }
}
