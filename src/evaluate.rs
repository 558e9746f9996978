//! Evaluation: consuming a stream of garbled tables.
//!
//! The evaluator mirrors the garbler's walk over the circuit. XOR and INV
//! wires are resolved locally; for every AND or OR gate one table row is
//! selected by the point bits of the two input labels and decrypted. Exactly
//! one row decrypts to a valid label; the evaluator never looks at the other
//! rows, and a misordered stream or wrong input label yields garbage output
//! rather than an error.

use crate::{
    circuit::{Circuit, Gate, GateId, WireId},
    garble::GarbledGate,
    hash::garbling_hash,
    label::Label,
    Error,
};

/// The evaluating side of a two-party computation.
pub struct Evaluator<'a> {
    circuit: &'a Circuit,
    labels: Vec<Option<Label>>,
    next_gate: GateId,
}

impl<'a> Evaluator<'a> {
    /// Validates the circuit topology and prepares the wire-label store.
    pub fn new(circuit: &'a Circuit) -> Result<Self, Error> {
        circuit.validate()?;
        Ok(Self {
            circuit,
            labels: vec![None; circuit.num_wires() as usize],
            next_gate: 0,
        })
    }

    /// Stores the received label of an input wire.
    pub fn set_input_label(&mut self, wire: WireId, label: Label) {
        self.labels[wire as usize] = Some(label);
    }

    /// Consumes the next garbled table from the stream.
    ///
    /// All free gates before the table's gate are evaluated first. Tables
    /// must arrive in gate-id order and must belong to AND or OR gates;
    /// anything else fails with [`Error::ProtocolMismatch`].
    pub fn feed(&mut self, garbled: &GarbledGate) -> Result<(), Error> {
        let num_gates = self.circuit.gates().len() as GateId;
        if garbled.gate >= num_gates {
            return Err(Error::ProtocolMismatch {
                expected: num_gates,
                got: garbled.gate,
            });
        }
        self.advance_free_gates(garbled.gate)?;

        match self.circuit.gates()[garbled.gate as usize] {
            Gate::And(a, b, c) | Gate::Or(a, b, c) => {
                let la = self.wire_label(a)?;
                let lb = self.wire_label(b)?;
                let row = 2 * usize::from(la.point_bit()) + usize::from(lb.point_bit());
                let lc = garbled.table.0[row] ^ garbling_hash(garbled.gate, la, lb);
                self.labels[c as usize] = Some(lc);
                self.next_gate = garbled.gate + 1;
                Ok(())
            }
            Gate::Xor(..) | Gate::Inv(..) => Err(Error::ProtocolMismatch {
                expected: self.next_gate,
                got: garbled.gate,
            }),
        }
    }

    /// Evaluates any free gates after the last received table.
    ///
    /// Fails with [`Error::ProtocolMismatch`] if a garbled table is still
    /// outstanding.
    pub fn finish(&mut self) -> Result<(), Error> {
        self.advance_free_gates(self.circuit.gates().len() as GateId)
    }

    /// The labels of the output wires, available once all gates have been
    /// evaluated.
    pub fn output_labels(&self) -> Result<Vec<Label>, Error> {
        self.circuit
            .output_wires()
            .map(|w| self.labels[w as usize].ok_or(Error::ProtocolStillInProgress))
            .collect()
    }

    /// Translates the output-wire labels back to plaintext bits using the
    /// garbler's decoding information.
    pub fn decode(&self, point_bits: &[bool]) -> Result<Vec<bool>, Error> {
        if point_bits.len() != self.circuit.outputs() {
            return Err(Error::ProtocolMismatch {
                expected: self.circuit.outputs() as u32,
                got: point_bits.len() as u32,
            });
        }
        let labels = self.output_labels()?;
        Ok(labels
            .iter()
            .zip(point_bits)
            .map(|(label, zero_point)| label.point_bit() ^ zero_point)
            .collect())
    }

    fn advance_free_gates(&mut self, up_to: GateId) -> Result<(), Error> {
        while self.next_gate < up_to {
            match self.circuit.gates()[self.next_gate as usize] {
                Gate::Xor(a, b, c) => {
                    let label = self.wire_label(a)? ^ self.wire_label(b)?;
                    self.labels[c as usize] = Some(label);
                }
                Gate::Inv(a, c) => {
                    let label = self.wire_label(a)?;
                    self.labels[c as usize] = Some(label);
                }
                Gate::And(..) | Gate::Or(..) => {
                    // A non-free gate whose table never arrived.
                    return Err(Error::ProtocolMismatch {
                        expected: self.next_gate,
                        got: up_to,
                    });
                }
            }
            self.next_gate += 1;
        }
        Ok(())
    }

    fn wire_label(&self, wire: WireId) -> Result<Label, Error> {
        self.labels[wire as usize].ok_or(Error::InsufficientInput)
    }
}
