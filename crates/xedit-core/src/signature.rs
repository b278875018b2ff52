//! Four-character record signatures.

use std::fmt;
use std::str::FromStr;

use crate::error::XEditError;

/// A 4-character record-type tag such as `ARMO` or `NPC_`.
///
/// Signatures are plain ASCII. Anything else coming back from the engine is
/// rejected rather than truncated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature([u8; 4]);

impl Signature {
    /// Build a signature from a byte literal.
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Construction only admits ASCII.
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl FromStr for Signature {
    type Err = XEditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(XEditError::InvalidSignature(s.to_string()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl TryFrom<&str> for Signature {
    type Error = XEditError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.as_str())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known signatures.
pub mod signatures {
    use super::Signature;

    pub const ARMO: Signature = Signature::from_bytes(*b"ARMO");
    pub const ARMA: Signature = Signature::from_bytes(*b"ARMA");
    pub const GLOB: Signature = Signature::from_bytes(*b"GLOB");
    pub const REFR: Signature = Signature::from_bytes(*b"REFR");
    pub const HDPT: Signature = Signature::from_bytes(*b"HDPT");
    pub const RACE: Signature = Signature::from_bytes(*b"RACE");
    pub const CELL: Signature = Signature::from_bytes(*b"CELL");
    pub const NPC_: Signature = Signature::from_bytes(*b"NPC_");
    pub const NAVM: Signature = Signature::from_bytes(*b"NAVM");
    pub const TES4: Signature = Signature::from_bytes(*b"TES4");
}
