//! # hush-crypto
//!
//! Schluesselaustausch und Blockverschluesselung einer Hush-Sitzung.
//!
//! ## Module
//! - `key_exchange` - Diffie-Hellman ueber kleine Primzahlen, Schluessel-Faltung
//! - `cipher` - AES-128 im ECB-Modus mit Null-Padding
//! - `types` - Sitzungsschluessel
//! - `error` - Fehlertypen
//!
//! ## Sicherheit
//!
//! Das Verfahren ist durch das Server-Protokoll vorgegeben: der
//! Austausch ist nicht authentifiziert, die Parameter sind klein und
//! ECB verkettet keine Bloecke und prueft keine Integritaet. Ein
//! veraenderter Block entschluesselt zu Datenmuell statt zu einem Fehler.

pub mod cipher;
pub mod error;
pub mod key_exchange;
pub mod types;

// Bequeme Re-Exports
pub use cipher::{SessionCipher, BLOCK_GROESSE};
pub use error::{CryptoError, CryptoResult};
pub use key_exchange::{schluessel_falten, KeyExchange};
pub use types::{SessionKey, SCHLUESSEL_LAENGE};
