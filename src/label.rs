//! Wire labels for garbled circuits.

use std::ops::{BitXor, BitXorAssign};

use rand::{CryptoRng, Rng, RngCore};

use crate::Error;

/// A 128-bit wire label.
///
/// Every wire of a garbled circuit carries one of two labels, standing in for
/// the boolean values 0 and 1. The least significant bit is the *point bit*
/// used to select garbled table rows without trial decryption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Label(u128);

impl Label {
    /// Number of bytes in the serialized form of a label.
    pub const SIZE: usize = 16;

    /// Samples a label uniformly at random.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(rng.gen::<u128>())
    }

    /// Returns the point bit.
    #[inline]
    pub fn point_bit(&self) -> bool {
        self.0 & 1 == 1
    }

    /// Overwrites the point bit.
    #[inline]
    pub fn set_point_bit(&mut self, bit: bool) {
        self.0 = (self.0 & !1) | u128::from(bit);
    }

    /// Serializes the label as 16 big-endian bytes.
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        self.0.to_be_bytes()
    }

    /// Deserializes a label from big-endian bytes.
    ///
    /// Inputs shorter than 16 bytes are right-justified and zero-extended on
    /// the left; longer inputs fail with [`Error::LabelLength`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() > Self::SIZE {
            return Err(Error::LabelLength);
        }
        let mut buf = [0u8; Self::SIZE];
        buf[Self::SIZE - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(u128::from_be_bytes(buf)))
    }
}

impl From<[u8; Label::SIZE]> for Label {
    fn from(bytes: [u8; Label::SIZE]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }
}

impl BitXor for Label {
    type Output = Label;

    fn bitxor(self, rhs: Label) -> Self::Output {
        Label(self.0 ^ rhs.0)
    }
}

impl BitXorAssign for Label {
    fn bitxor_assign(&mut self, rhs: Label) {
        self.0 ^= rhs.0;
    }
}
