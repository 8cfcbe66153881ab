//! AES-128 im ECB-Modus
//!
//! Jeder 16-Byte-Block wird unabhaengig verschluesselt, der letzte Block
//! wird mit Nullen aufgefuellt. Die urspruengliche Laenge steckt nicht im
//! Chiffrat: Chat-Nachrichten enden mit einem NUL-Zeichen, Voice-Frames
//! haben eine feste Sample-Anzahl.

use std::fmt;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::error::{CryptoError, CryptoResult};
use crate::types::SessionKey;

/// Blockgroesse von AES in Bytes
pub const BLOCK_GROESSE: usize = 16;

/// Blockchiffre einer Sitzung
#[derive(Clone)]
pub struct SessionCipher {
    aes: Aes128,
}

impl SessionCipher {
    pub fn neu(key: &SessionKey) -> Self {
        Self {
            aes: Aes128::new(GenericArray::from_slice(key.as_bytes())),
        }
    }

    /// Verschluesselt beliebig lange Daten (Null-Padding auf volle Bloecke)
    pub fn verschluesseln(&self, klartext: &[u8]) -> Vec<u8> {
        let mut puffer = klartext.to_vec();
        let rest = puffer.len() % BLOCK_GROESSE;
        if rest != 0 {
            puffer.resize(puffer.len() + BLOCK_GROESSE - rest, 0);
        }
        for block in puffer.chunks_exact_mut(BLOCK_GROESSE) {
            self.aes.encrypt_block(GenericArray::from_mut_slice(block));
        }
        puffer
    }

    /// Entschluesselt volle Bloecke; das Padding bleibt erhalten
    pub fn entschluesseln(&self, chiffrat: &[u8]) -> CryptoResult<Vec<u8>> {
        if chiffrat.len() % BLOCK_GROESSE != 0 {
            return Err(CryptoError::UngueltigeChiffratLaenge {
                laenge: chiffrat.len(),
                block: BLOCK_GROESSE,
            });
        }
        let mut puffer = chiffrat.to_vec();
        for block in puffer.chunks_exact_mut(BLOCK_GROESSE) {
            self.aes.decrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(puffer)
    }

    /// Entschluesselt und kuerzt auf die bekannte Klartextlaenge
    pub fn entschluesseln_gekuerzt(&self, chiffrat: &[u8], laenge: usize) -> CryptoResult<Vec<u8>> {
        let mut klartext = self.entschluesseln(chiffrat)?;
        klartext.truncate(laenge);
        Ok(klartext)
    }
}

impl fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_exchange::schluessel_falten;
    use proptest::prelude::*;

    fn cipher() -> SessionCipher {
        SessionCipher::neu(&schluessel_falten("17"))
    }

    #[test]
    fn chiffrat_ist_auf_bloecke_aufgefuellt() {
        let c = cipher();
        assert_eq!(c.verschluesseln(&[1u8; 5]).len(), 16);
        assert_eq!(c.verschluesseln(&[1u8; 16]).len(), 16);
        assert_eq!(c.verschluesseln(&[1u8; 17]).len(), 32);
        assert!(c.verschluesseln(&[]).is_empty());
    }

    #[test]
    fn gleiche_bloecke_ergeben_gleiches_chiffrat() {
        // ECB: keine Verkettung
        let c = cipher();
        let chiffrat = c.verschluesseln(&[0xAB; 32]);
        assert_eq!(chiffrat[..16], chiffrat[16..]);
    }

    #[test]
    fn padding_bleibt_beim_entschluesseln_erhalten() {
        let c = cipher();
        let klartext = c.entschluesseln(&c.verschluesseln(b"hallo")).unwrap();
        assert_eq!(&klartext[..5], b"hallo");
        assert!(klartext[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn veraenderter_block_ergibt_muell_statt_fehler() {
        let c = cipher();
        let mut chiffrat = c.verschluesseln(b"geheime nachricht");
        chiffrat[0] ^= 0xFF;
        let klartext = c.entschluesseln(&chiffrat).unwrap();
        assert_ne!(&klartext[..16], &b"geheime nachricht"[..16]);
        // Der zweite Block ist unabhaengig und bleibt lesbar
        assert_eq!(klartext[16], b't');
    }

    #[test]
    fn falsche_chiffrat_laenge() {
        assert!(matches!(
            cipher().entschluesseln(&[0u8; 15]),
            Err(CryptoError::UngueltigeChiffratLaenge { laenge: 15, .. })
        ));
    }

    #[test]
    fn anderer_schluessel_entschluesselt_nicht() {
        let a = cipher();
        let b = SessionCipher::neu(&schluessel_falten("18"));
        let chiffrat = a.verschluesseln(b"0123456789abcdef");
        assert_ne!(b.entschluesseln(&chiffrat).unwrap(), b"0123456789abcdef");
    }

    proptest! {
        #[test]
        fn verschluesseln_entschluesseln_ist_identitaet(
            daten in proptest::collection::vec(any::<u8>(), 0..1450)
        ) {
            let c = cipher();
            let chiffrat = c.verschluesseln(&daten);
            prop_assert_eq!(chiffrat.len() % BLOCK_GROESSE, 0);
            let klartext = c.entschluesseln_gekuerzt(&chiffrat, daten.len()).unwrap();
            prop_assert_eq!(klartext, daten);
        }
    }
}
