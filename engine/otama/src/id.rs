use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use crate::error::{OtamaError, OtamaResult};

/// Width in bytes of a record identifier.
pub const ID_LEN: usize = 20;

/// Length of the canonical hex form of an identifier.
pub const ID_HEX_LEN: usize = ID_LEN * 2;

/// Fixed-width binary key of one stored record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier([u8; ID_LEN]);

impl Identifier {
    pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Canonical lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(input: &str) -> OtamaResult<Self> {
        if input.len() != ID_HEX_LEN {
            return Err(OtamaError::InvalidIdentifier(input.to_string()));
        }
        let mut bytes = [0u8; ID_LEN];
        hex::decode_to_slice(input, &mut bytes)
            .map_err(|_| OtamaError::InvalidIdentifier(input.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Debug for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_hex())
    }
}

impl FromStr for Identifier {
    type Err = OtamaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::from_hex(s)
    }
}

impl From<[u8; ID_LEN]> for Identifier {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }
}
