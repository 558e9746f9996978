//! Garbling: wire-label assignment and gate-table encryption.
//!
//! The garbler draws a circuit-global offset `R` and a random zero-label per
//! wire; the one-label is always `zero XOR R` (free-XOR). XOR gates relabel
//! their output wire as the XOR of the input zero-labels and INV gates as
//! `zero XOR R`, so neither needs a ciphertext. AND and OR gates are encoded
//! as four-row tables, permuted by the point bits of the input labels so the
//! evaluator decrypts exactly one row.

use rand_chacha::ChaCha20Rng;

use crate::{
    circuit::{Circuit, Gate, GateId, WireId},
    hash::garbling_hash,
    label::Label,
    Error,
};

/// The four encrypted rows of a garbled AND or OR gate.
///
/// Row `2*pa + pb` belongs to the input labels with point bits `(pa, pb)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GarbledTable(pub(crate) [Label; 4]);

impl GarbledTable {
    /// Byte length of a serialized table.
    pub const SIZE: usize = 4 * Label::SIZE;

    /// Serializes the four rows back to back.
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        for (chunk, row) in buf.chunks_exact_mut(Label::SIZE).zip(self.0) {
            chunk.copy_from_slice(&row.to_bytes());
        }
        buf
    }

    /// Deserializes a table from exactly 64 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Self::SIZE {
            return Err(Error::ProtocolMismatch {
                expected: Self::SIZE as u32,
                got: bytes.len() as u32,
            });
        }
        let mut rows = [Label::default(); 4];
        for (row, chunk) in rows.iter_mut().zip(bytes.chunks_exact(Label::SIZE)) {
            *row = Label::from_bytes(chunk)?;
        }
        Ok(Self(rows))
    }
}

/// A garbled gate as streamed from garbler to evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GarbledGate {
    /// Id of the gate the table belongs to.
    pub gate: GateId,
    /// The encrypted table rows.
    pub table: GarbledTable,
}

/// The garbling side of a two-party computation.
///
/// Holds the zero-label of every wire plus the global offset; the one-label
/// of wire `w` is `zero[w] XOR r`.
pub struct Garbler<'a> {
    circuit: &'a Circuit,
    r: Label,
    zero: Vec<Label>,
}

impl<'a> Garbler<'a> {
    /// Validates the circuit topology and assigns labels to every wire.
    pub fn new(circuit: &'a Circuit, rng: &mut ChaCha20Rng) -> Result<Self, Error> {
        circuit.validate()?;

        let mut r = Label::random(rng);
        r.set_point_bit(true);

        let mut zero: Vec<Label> = (0..circuit.num_wires())
            .map(|_| Label::random(rng))
            .collect();
        for gate in circuit.gates() {
            match *gate {
                Gate::Xor(a, b, c) => {
                    zero[c as usize] = zero[a as usize] ^ zero[b as usize];
                }
                // Free INV: the output zero-label is the input one-label, so
                // the evaluator passes the incoming label through unchanged.
                Gate::Inv(a, c) => {
                    zero[c as usize] = zero[a as usize] ^ r;
                }
                Gate::And(..) | Gate::Or(..) => {}
            }
        }

        Ok(Self { circuit, r, zero })
    }

    /// The label of `wire` representing `bit`.
    pub fn label(&self, wire: WireId, bit: bool) -> Label {
        if bit {
            self.zero[wire as usize] ^ self.r
        } else {
            self.zero[wire as usize]
        }
    }

    /// The garbled tables of all AND and OR gates, in gate-id order.
    pub fn garbled_gates(&self) -> impl Iterator<Item = GarbledGate> + '_ {
        self.circuit
            .gates()
            .iter()
            .enumerate()
            .filter_map(move |(id, gate)| {
                let id = id as GateId;
                match *gate {
                    Gate::And(a, b, c) => Some(self.garble_gate(id, a, b, c, |x, y| x & y)),
                    Gate::Or(a, b, c) => Some(self.garble_gate(id, a, b, c, |x, y| x | y)),
                    Gate::Xor(..) | Gate::Inv(..) => None,
                }
            })
    }

    /// Point bits of the output-wire zero-labels; the decoding information
    /// sent to the evaluator after all gate tables.
    pub fn decoding(&self) -> Vec<bool> {
        self.circuit
            .output_wires()
            .map(|w| self.zero[w as usize].point_bit())
            .collect()
    }

    fn garble_gate(
        &self,
        id: GateId,
        a: WireId,
        b: WireId,
        c: WireId,
        f: fn(bool, bool) -> bool,
    ) -> GarbledGate {
        let mut rows = [Label::default(); 4];
        for pa in [false, true] {
            for pb in [false, true] {
                // The semantic values whose labels carry point bits (pa, pb).
                let va = pa ^ self.zero[a as usize].point_bit();
                let vb = pb ^ self.zero[b as usize].point_bit();
                let la = self.label(a, va);
                let lb = self.label(b, vb);
                let lc = self.label(c, f(va, vb));
                rows[2 * usize::from(pa) + usize::from(pb)] = garbling_hash(id, la, lb) ^ lc;
            }
        }
        GarbledGate {
            gate: id,
            table: GarbledTable(rows),
        }
    }
}
