//! RSA-blinded 1-of-2 oblivious transfer.
//!
//! A [`Receiver`] obtains exactly one of two messages held by a [`Sender`]:
//! the sender never learns which message was taken, and the receiver learns
//! nothing about the other message. One protocol run goes through three
//! messages:
//!
//!   1. The sender picks two random values `x0, x1` below its RSA modulus and
//!      discloses them.
//!   2. The receiver blinds the `x` matching its choice bit with a random
//!      RSA encryption: `v = (x_b + k^e) mod N`.
//!   3. The sender strips both candidates with its private key,
//!      `k_i = (v - x_i)^d mod N`, and discloses `m_i XOR H(k_i)`. Only the
//!      chosen `k_b` equals the receiver's `k`, so only `m_b` can be
//!      unmasked.
//!
//! Each [`Sender`]/[`Receiver`] pair holds one RSA key and runs any number of
//! transfers; the per-transfer state lives in [`SenderTransfer`] and
//! [`ReceiverTransfer`]. The protocol is secure against semi-honest parties
//! under the RSA assumption.

use glass_pumpkin::prime;
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Signed};
use rand_chacha::ChaCha20Rng;

use crate::Error;

/// RSA key size in bits used by sessions.
pub const DEFAULT_KEY_SIZE: usize = 2048;

/// The public RSA exponent used for all generated keys.
const RSA_E: u32 = 65537;

/// An RSA public key, identifying one party in its sender role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    n: BigUint,
    e: u32,
}

impl PublicKey {
    /// Creates a public key from a modulus and public exponent.
    pub fn new(n: BigUint, e: u32) -> Self {
        Self { n, e }
    }

    /// The modulus as big-endian bytes without leading zeros.
    pub fn modulus_bytes(&self) -> Vec<u8> {
        self.n.to_bytes_be()
    }

    /// The public exponent.
    pub fn exponent(&self) -> u32 {
        self.e
    }

    /// Byte length of the fixed-width encodings under this key.
    pub fn byte_len(&self) -> usize {
        ((self.n.bits() + 7) / 8) as usize
    }
}

/// The party offering two messages, of which the [`Receiver`] obtains one.
#[derive(Debug)]
pub struct Sender {
    public: PublicKey,
    d: BigUint,
}

impl Sender {
    /// Generates a fresh RSA key of `key_size` bits.
    ///
    /// `key_size` must be an even number of at least 256 bits; 512-bit keys
    /// are fine for tests, real sessions use [`DEFAULT_KEY_SIZE`].
    pub fn new(key_size: usize, rng: &mut ChaCha20Rng) -> Result<Self, Error> {
        if key_size < 256 || key_size % 2 != 0 {
            return Err(Error::Crypto(format!(
                "RSA key size must be an even number of at least 256 bits, got {key_size}"
            )));
        }
        let e = BigUint::from(RSA_E);
        loop {
            let p = prime::from_rng(key_size / 2, rng)
                .map_err(|err| Error::Crypto(format!("prime generation failed: {err}")))?;
            let q = prime::from_rng(key_size / 2, rng)
                .map_err(|err| Error::Crypto(format!("prime generation failed: {err}")))?;
            if p == q {
                continue;
            }
            let n = &p * &q;
            let phi = (&p - 1u32) * (&q - 1u32);
            // e is almost always coprime to phi; retry with new primes if not.
            if let Some(d) = mod_inverse(&e, &phi) {
                return Ok(Self {
                    public: PublicKey::new(n, RSA_E),
                    d,
                });
            }
        }
    }

    /// The public half of the sender's RSA key, to be handed to the peer.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Starts one transfer of the message pair `(m0, m1)`.
    ///
    /// Both messages must have the same length, at most the byte length of
    /// the modulus.
    pub fn new_transfer(
        &self,
        m0: &[u8],
        m1: &[u8],
        rng: &mut ChaCha20Rng,
    ) -> Result<SenderTransfer<'_>, Error> {
        if m0.len() != m1.len() {
            return Err(Error::MessageLengthMismatch);
        }
        if m0.len() > self.public.byte_len() {
            return Err(Error::MessageTooLong);
        }
        let x0 = rng.gen_biguint_below(&self.public.n);
        let x1 = rng.gen_biguint_below(&self.public.n);
        Ok(SenderTransfer {
            sender: self,
            m0: m0.to_vec(),
            m1: m1.to_vec(),
            x0,
            x1,
            v: None,
        })
    }
}

/// Sender-side state of a single transfer.
#[derive(Debug)]
pub struct SenderTransfer<'a> {
    sender: &'a Sender,
    m0: Vec<u8>,
    m1: Vec<u8>,
    x0: BigUint,
    x1: BigUint,
    v: Option<BigUint>,
}

impl SenderTransfer<'_> {
    /// The two random messages `(x0, x1)`, as fixed-width big-endian bytes.
    pub fn random_messages(&self) -> (Vec<u8>, Vec<u8>) {
        let k = self.sender.public.byte_len();
        (fixed_bytes(&self.x0, k), fixed_bytes(&self.x1, k))
    }

    /// Stores the receiver's blinded challenge `v`.
    pub fn receive_v(&mut self, v: &[u8]) {
        self.v = Some(BigUint::from_bytes_be(v) % &self.sender.public.n);
    }

    /// The blinded payloads `(m0', m1')`.
    ///
    /// Fails with [`Error::OtState`] unless [`SenderTransfer::receive_v`] ran
    /// first.
    pub fn messages(&self) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let v = self.v.as_ref().ok_or(Error::OtState("receive_v"))?;
        let n = &self.sender.public.n;
        let k = self.sender.public.byte_len();

        let k0 = ((v + n - &self.x0) % n).modpow(&self.sender.d, n);
        let k1 = ((v + n - &self.x1) % n).modpow(&self.sender.d, n);

        let m0 = xor_bytes(&self.m0, &fixed_bytes(&k0, k));
        let m1 = xor_bytes(&self.m1, &fixed_bytes(&k1, k));
        Ok((m0, m1))
    }
}

/// The party choosing one of the two messages offered by a [`Sender`].
pub struct Receiver {
    key: PublicKey,
}

impl Receiver {
    /// Creates a receiver talking to the sender owning `key`.
    pub fn new(key: PublicKey) -> Self {
        Self { key }
    }

    /// The sender's public key this receiver was built from.
    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    /// Starts one transfer with the given choice bit.
    pub fn new_transfer(&self, bit: bool) -> ReceiverTransfer<'_> {
        ReceiverTransfer {
            receiver: self,
            bit,
            blind: None,
            v: None,
            message: None,
        }
    }
}

/// Receiver-side state of a single transfer.
pub struct ReceiverTransfer<'a> {
    receiver: &'a Receiver,
    bit: bool,
    blind: Option<BigUint>,
    v: Option<BigUint>,
    message: Option<Vec<u8>>,
}

impl ReceiverTransfer<'_> {
    /// Consumes the sender's random messages `(x0, x1)` and blinds the chosen
    /// one with a fresh random scalar.
    pub fn receive_random_messages(&mut self, x0: &[u8], x1: &[u8], rng: &mut ChaCha20Rng) {
        let n = &self.receiver.key.n;
        let x = BigUint::from_bytes_be(if self.bit { x1 } else { x0 }) % n;
        let blind = rng.gen_biguint_below(n);
        let e = BigUint::from(self.receiver.key.e);
        let v = (x + blind.modpow(&e, n)) % n;
        self.blind = Some(blind);
        self.v = Some(v);
    }

    /// The blinded challenge `v`, as fixed-width big-endian bytes.
    ///
    /// Fails with [`Error::OtState`] unless
    /// [`ReceiverTransfer::receive_random_messages`] ran first.
    pub fn v(&self) -> Result<Vec<u8>, Error> {
        let v = self
            .v
            .as_ref()
            .ok_or(Error::OtState("receive_random_messages"))?;
        Ok(fixed_bytes(v, self.receiver.key.byte_len()))
    }

    /// Unmasks the chosen message from the blinded payloads `(m0', m1')`.
    pub fn receive_messages(&mut self, m0: &[u8], m1: &[u8]) -> Result<(), Error> {
        if m0.len() != m1.len() {
            return Err(Error::MessageLengthMismatch);
        }
        if m0.len() > self.receiver.key.byte_len() {
            return Err(Error::MessageTooLong);
        }
        let blind = self
            .blind
            .as_ref()
            .ok_or(Error::OtState("receive_random_messages"))?;
        let pad = fixed_bytes(blind, self.receiver.key.byte_len());
        let chosen = if self.bit { m1 } else { m0 };
        self.message = Some(xor_bytes(chosen, &pad));
        Ok(())
    }

    /// The recovered message and the choice bit it belongs to.
    ///
    /// Fails with [`Error::OtState`] unless
    /// [`ReceiverTransfer::receive_messages`] ran first.
    pub fn message(&self) -> Result<(&[u8], bool), Error> {
        let m = self
            .message
            .as_ref()
            .ok_or(Error::OtState("receive_messages"))?;
        Ok((m, self.bit))
    }
}

/// Fixed-width big-endian encoding of `x`, left-padded with zeros to `k`
/// bytes.
fn fixed_bytes(x: &BigUint, k: usize) -> Vec<u8> {
    let bytes = x.to_bytes_be();
    if bytes.len() >= k {
        return bytes;
    }
    let mut buf = vec![0u8; k - bytes.len()];
    buf.extend_from_slice(&bytes);
    buf
}

/// XOR of `data` against the left-truncated pad.
fn xor_bytes(data: &[u8], pad: &[u8]) -> Vec<u8> {
    data.iter().zip(pad).map(|(d, p)| d ^ p).collect()
}

fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let a = BigInt::from(a.clone());
    let m = BigInt::from(m.clone());
    let ext = a.extended_gcd(&m);
    if !ext.gcd.is_one() {
        return None;
    }
    let mut x = ext.x % &m;
    if x.is_negative() {
        x += &m;
    }
    x.to_biguint()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const TEST_KEY_SIZE: usize = 512;

    fn run_transfer(
        sender: &Sender,
        receiver: &Receiver,
        m0: &[u8],
        m1: &[u8],
        bit: bool,
        rng: &mut ChaCha20Rng,
    ) -> Vec<u8> {
        let mut s_xfer = sender.new_transfer(m0, m1, rng).unwrap();
        let mut r_xfer = receiver.new_transfer(bit);

        let (x0, x1) = s_xfer.random_messages();
        r_xfer.receive_random_messages(&x0, &x1, rng);

        s_xfer.receive_v(&r_xfer.v().unwrap());
        let (m0p, m1p) = s_xfer.messages().unwrap();
        r_xfer.receive_messages(&m0p, &m1p).unwrap();

        let (message, message_bit) = r_xfer.message().unwrap();
        assert_eq!(message_bit, bit);
        message.to_vec()
    }

    #[test]
    fn transfers_the_chosen_message() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let sender = Sender::new(TEST_KEY_SIZE, &mut rng).unwrap();
        let receiver = Receiver::new(sender.public_key().clone());

        let m0 = [0x00; 16];
        let m1 = [0xff; 16];
        assert_eq!(run_transfer(&sender, &receiver, &m0, &m1, false, &mut rng), m0);
        assert_eq!(run_transfer(&sender, &receiver, &m0, &m1, true, &mut rng), m1);
    }

    #[test]
    fn transfers_arbitrary_payloads() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let sender = Sender::new(TEST_KEY_SIZE, &mut rng).unwrap();
        let receiver = Receiver::new(sender.public_key().clone());

        for bit in [false, true] {
            let mut m0 = [0u8; 20];
            let mut m1 = [0u8; 20];
            rand::RngCore::fill_bytes(&mut rng, &mut m0);
            rand::RngCore::fill_bytes(&mut rng, &mut m1);

            let expected = if bit { m1 } else { m0 };
            assert_eq!(
                run_transfer(&sender, &receiver, &m0, &m1, bit, &mut rng),
                expected
            );
        }
    }

    #[test]
    fn rejects_mismatched_message_lengths() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let sender = Sender::new(TEST_KEY_SIZE, &mut rng).unwrap();

        let m0 = [0u8; 15];
        let m1 = [0u8; 16];
        let err = sender.new_transfer(&m0, &m1, &mut rng).unwrap_err();
        assert_eq!(err, Error::MessageLengthMismatch);
    }

    #[test]
    fn rejects_messages_longer_than_the_modulus() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let sender = Sender::new(TEST_KEY_SIZE, &mut rng).unwrap();

        let too_long = vec![0u8; sender.public_key().byte_len() + 1];
        let err = sender
            .new_transfer(&too_long, &too_long, &mut rng)
            .unwrap_err();
        assert_eq!(err, Error::MessageTooLong);
    }

    #[test]
    fn operations_out_of_order_fail() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let sender = Sender::new(TEST_KEY_SIZE, &mut rng).unwrap();
        let receiver = Receiver::new(sender.public_key().clone());

        let s_xfer = sender.new_transfer(&[1; 8], &[2; 8], &mut rng).unwrap();
        assert_eq!(s_xfer.messages().unwrap_err(), Error::OtState("receive_v"));

        let mut r_xfer = receiver.new_transfer(true);
        assert_eq!(
            r_xfer.v().unwrap_err(),
            Error::OtState("receive_random_messages")
        );
        assert_eq!(
            r_xfer.receive_messages(&[0; 8], &[0; 8]).unwrap_err(),
            Error::OtState("receive_random_messages")
        );
        assert_eq!(
            r_xfer.message().unwrap_err(),
            Error::OtState("receive_messages")
        );
    }

    #[test]
    fn transcript_is_reproducible_with_a_fixed_seed() {
        let transcript = |seed: u64| {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let sender = Sender::new(TEST_KEY_SIZE, &mut rng).unwrap();
            let receiver = Receiver::new(sender.public_key().clone());

            let mut s_xfer = sender.new_transfer(&[7; 16], &[9; 16], &mut rng).unwrap();
            let mut r_xfer = receiver.new_transfer(true);
            let (x0, x1) = s_xfer.random_messages();
            r_xfer.receive_random_messages(&x0, &x1, &mut rng);
            let v = r_xfer.v().unwrap();
            s_xfer.receive_v(&v);
            let (m0p, m1p) = s_xfer.messages().unwrap();
            (x0, x1, v, m0p, m1p)
        };

        assert_eq!(transcript(42), transcript(42));
        assert_ne!(transcript(42), transcript(43));
    }

    #[test]
    fn blinded_challenge_does_not_depend_on_the_choice_bit() {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let sender = Sender::new(TEST_KEY_SIZE, &mut rng).unwrap();
        let receiver = Receiver::new(sender.public_key().clone());

        // The challenge v is a fresh RSA encryption added to x_b; with the
        // blinding scalar uniform in [0, N), every transfer must produce a
        // distinct v, no matter the choice bit.
        let s_xfer = sender.new_transfer(&[1; 16], &[2; 16], &mut rng).unwrap();
        let (x0, x1) = s_xfer.random_messages();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            for bit in [false, true] {
                let mut r_xfer = receiver.new_transfer(bit);
                r_xfer.receive_random_messages(&x0, &x1, &mut rng);
                assert!(seen.insert(r_xfer.v().unwrap()));
            }
        }
    }
}
