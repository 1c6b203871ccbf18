//! The 20-byte content-address identifying an object.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub const SIZE: usize = 20;

/// A 20-byte SHA-1 object identifier.
///
/// Equality and ordering are lexicographic over the raw bytes — the
/// `#[derive]`d impls on a newtype around `[u8; 20]` give this for free.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; SIZE]);

impl ObjectId {
    pub fn from_bytes(bytes: [u8; SIZE]) -> Self {
        ObjectId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIZE] {
        &self.0
    }

    /// The first byte of the identifier, used to index the fan-out table.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for ObjectId {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; SIZE] = value
            .try_into()
            .map_err(|_| Error::invalid_object(format!("expected {SIZE} raw bytes, got {}", value.len())))?;
        Ok(ObjectId(bytes))
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != SIZE * 2 {
            return Err(Error::invalid_object(format!(
                "expected a {}-character hex identifier, got {} characters",
                SIZE * 2,
                s.len()
            )));
        }
        let mut bytes = [0u8; SIZE];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::invalid_object(format!("invalid hex identifier '{s}': {e}")))?;
        Ok(ObjectId(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}
