//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use std::fmt;

/// Laenge des Sitzungsschluessels in Bytes
pub const SCHLUESSEL_LAENGE: usize = 16;

/// Symmetrischer Schluessel einer Sitzung
///
/// Wird einmal pro Sitzung abgeleitet und nie rotiert.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SessionKey([u8; SCHLUESSEL_LAENGE]);

impl SessionKey {
    pub fn aus_bytes(bytes: [u8; SCHLUESSEL_LAENGE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SCHLUESSEL_LAENGE] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Schluesselmaterial nie in Logs
        f.write_str("SessionKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_verraet_keinen_schluessel() {
        let key = SessionKey::aus_bytes([7u8; SCHLUESSEL_LAENGE]);
        assert!(!format!("{key:?}").contains('7'));
    }
}
