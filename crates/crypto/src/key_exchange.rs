//! Diffie-Hellman-Schluesselaustausch
//!
//! Ablauf aus Sicht des Clients:
//! 1. Server schickt `p`, `g` und seinen oeffentlichen Wert `A` (dezimal)
//! 2. Client waehlt `b` gleichverteilt aus [100, 500]
//! 3. Client schickt `B = g^b mod p` (dezimal)
//! 4. Beide berechnen `A^b mod p` und falten die Dezimaldarstellung auf 16 Bytes
//!
//! `p` passt in 32 Bit, daher genuegt u64-Arithmetik mit u128-Zwischenwerten.
//! `A` wird ziffernweise modulo `p` reduziert, beliebig lange Dezimalstrings
//! sind also erlaubt.

use rand::Rng;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{SessionKey, SCHLUESSEL_LAENGE};

/// Untere Grenze des privaten Exponenten (inklusive)
pub const PRIVAT_MIN: u64 = 100;

/// Obere Grenze des privaten Exponenten (inklusive)
pub const PRIVAT_MAX: u64 = 500;

/// Eine Seite des Austauschs
#[derive(Debug, Clone)]
pub struct KeyExchange {
    p: u64,
    g: u64,
    privat: u64,
}

impl KeyExchange {
    /// Erstellt eine Instanz mit zufaelligem privaten Exponenten
    pub fn neu(p: u32, g: u32) -> CryptoResult<Self> {
        let privat = rand::thread_rng().gen_range(PRIVAT_MIN..=PRIVAT_MAX);
        Self::mit_privatem_exponenten(p, g, privat)
    }

    /// Erstellt eine Instanz mit festem privaten Exponenten
    pub fn mit_privatem_exponenten(p: u32, g: u32, privat: u64) -> CryptoResult<Self> {
        if p < 2 {
            return Err(CryptoError::UngueltigeParameter { p, g });
        }
        Ok(Self {
            p: p as u64,
            g: g as u64,
            privat,
        })
    }

    /// Eigener oeffentlicher Wert `g^privat mod p` als Dezimalstring
    pub fn oeffentlicher_wert(&self) -> String {
        mod_pow(self.g, self.privat, self.p).to_string()
    }

    /// Berechnet den gemeinsamen Schluessel aus dem Wert der Gegenseite
    pub fn gemeinsamer_schluessel(&self, gegenseite: &str) -> CryptoResult<SessionKey> {
        let basis = dezimal_mod(gegenseite, self.p)?;
        let geheimnis = mod_pow(basis, self.privat, self.p);
        tracing::trace!(p = self.p, "Gemeinsames Geheimnis berechnet");
        Ok(schluessel_falten(&geheimnis.to_string()))
    }
}

/// `basis^exp mod modul`
pub fn mod_pow(basis: u64, mut exp: u64, modul: u64) -> u64 {
    if modul == 1 {
        return 0;
    }
    let m = modul as u128;
    let mut ergebnis: u128 = 1;
    let mut b = basis as u128 % m;
    while exp > 0 {
        if exp & 1 == 1 {
            ergebnis = ergebnis * b % m;
        }
        b = b * b % m;
        exp >>= 1;
    }
    ergebnis as u64
}

/// Reduziert eine Dezimalzahl beliebiger Laenge modulo `modul`
fn dezimal_mod(dezimal: &str, modul: u64) -> CryptoResult<u64> {
    let ziffern = dezimal.trim_end_matches('\0');
    if ziffern.is_empty() || !ziffern.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CryptoError::UngueltigerOeffentlicherWert(dezimal.to_string()));
    }
    let m = modul as u128;
    let rest = ziffern
        .bytes()
        .fold(0u128, |acc, z| (acc * 10 + (z - b'0') as u128) % m);
    Ok(rest as u64)
}

/// Faltet die Dezimaldarstellung des Geheimnisses auf 16 Bytes
///
/// Ab 16 Zeichen zaehlen die ersten 16, kuerzere Strings werden zyklisch
/// wiederholt.
pub fn schluessel_falten(dezimal: &str) -> SessionKey {
    let quelle = dezimal.as_bytes();
    let mut key = [0u8; SCHLUESSEL_LAENGE];
    if !quelle.is_empty() {
        for (ziel, byte) in key.iter_mut().zip(quelle.iter().cycle()) {
            *ziel = *byte;
        }
    }
    SessionKey::aus_bytes(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_pow_kleine_werte() {
        assert_eq!(mod_pow(5, 7, 23), 17);
        assert_eq!(mod_pow(2, 10, 1000), 24);
        assert_eq!(mod_pow(7, 0, 13), 1);
        assert_eq!(mod_pow(7, 3, 1), 0);
    }

    #[test]
    fn mod_pow_ohne_ueberlauf() {
        let p = u32::MAX as u64 - 4; // 4294967291 ist prim
        let a = mod_pow(p - 1, 2, p);
        assert_eq!(a, 1);
    }

    #[test]
    fn beide_seiten_erhalten_denselben_schluessel() {
        let client = KeyExchange::mit_privatem_exponenten(23, 5, 123).unwrap();
        let server = KeyExchange::mit_privatem_exponenten(23, 5, 456).unwrap();

        let k_client = client
            .gemeinsamer_schluessel(&server.oeffentlicher_wert())
            .unwrap();
        let k_server = server
            .gemeinsamer_schluessel(&client.oeffentlicher_wert())
            .unwrap();
        assert_eq!(k_client, k_server);
    }

    #[test]
    fn zufaelliger_exponent_liegt_im_bereich() {
        for _ in 0..200 {
            let kx = KeyExchange::neu(23, 5).unwrap();
            assert!((PRIVAT_MIN..=PRIVAT_MAX).contains(&kx.privat));
        }
    }

    #[test]
    fn langer_oeffentlicher_wert_wird_reduziert() {
        let kx = KeyExchange::mit_privatem_exponenten(23, 5, 100).unwrap();
        // 23 * 10^20 + 17 ist kongruent zu 17
        let lang = kx.gemeinsamer_schluessel("230000000000000000017").unwrap();
        let kurz = kx.gemeinsamer_schluessel("17").unwrap();
        assert_eq!(lang, kurz);
    }

    #[test]
    fn unlesbarer_oeffentlicher_wert() {
        let kx = KeyExchange::mit_privatem_exponenten(23, 5, 100).unwrap();
        assert!(matches!(
            kx.gemeinsamer_schluessel("12a"),
            Err(CryptoError::UngueltigerOeffentlicherWert(_))
        ));
        assert!(kx.gemeinsamer_schluessel("").is_err());
        assert!(kx.gemeinsamer_schluessel("-5").is_err());
    }

    #[test]
    fn degenerierte_primzahl() {
        assert!(KeyExchange::mit_privatem_exponenten(1, 5, 100).is_err());
        assert!(KeyExchange::neu(0, 0).is_err());
    }

    #[test]
    fn kurzer_string_wird_zyklisch_gefaltet() {
        let key = schluessel_falten("123");
        assert_eq!(key.as_bytes(), b"1231231231231231");
    }

    #[test]
    fn langer_string_wird_abgeschnitten() {
        let key = schluessel_falten("12345678901234567890");
        assert_eq!(key.as_bytes(), b"1234567890123456");
    }

    #[test]
    fn genau_sechzehn_zeichen() {
        let key = schluessel_falten("abcdefghijklmnop");
        assert_eq!(key.as_bytes(), b"abcdefghijklmnop");
    }
}
