//! Boolean circuits and their textual on-disk format.

use std::io::{BufRead, Write};

use blake3::Hasher;

use crate::Error;

/// Identifies a wire in a [`Circuit`]; wire ids are dense and 0-based.
pub type WireId = u32;

/// Identifies a gate in a [`Circuit`]; gate ids are dense, 0-based and define
/// the topological order of the circuit.
pub type GateId = u32;

const MAX_GATES: usize = (u32::MAX >> 4) as usize;

/// A single gate in a larger [`Circuit`].
///
/// The last wire id of each variant is the output wire of the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    /// XOR of the two input wires.
    Xor(WireId, WireId, WireId),
    /// AND of the two input wires.
    And(WireId, WireId, WireId),
    /// OR of the two input wires.
    Or(WireId, WireId, WireId),
    /// Negation of the input wire.
    Inv(WireId, WireId),
}

impl Gate {
    /// The wire produced by this gate.
    pub fn output(&self) -> WireId {
        match *self {
            Gate::Xor(_, _, c) | Gate::And(_, _, c) | Gate::Or(_, _, c) => c,
            Gate::Inv(_, c) => c,
        }
    }

    fn update_hash(&self, hasher: &mut Hasher) {
        let type_byte = match self {
            Gate::Xor(x, y, z) => {
                hasher.update(&x.to_be_bytes());
                hasher.update(&y.to_be_bytes());
                hasher.update(&z.to_be_bytes());
                0
            }
            Gate::And(x, y, z) => {
                hasher.update(&x.to_be_bytes());
                hasher.update(&y.to_be_bytes());
                hasher.update(&z.to_be_bytes());
                1
            }
            Gate::Or(x, y, z) => {
                hasher.update(&x.to_be_bytes());
                hasher.update(&y.to_be_bytes());
                hasher.update(&z.to_be_bytes());
                2
            }
            Gate::Inv(x, z) => {
                hasher.update(&x.to_be_bytes());
                hasher.update(&z.to_be_bytes());
                3
            }
        };
        hasher.update(&[type_byte]);
    }
}

/// A circuit of XOR, AND, OR and INV gates over densely numbered wires.
///
/// The first `garbler_inputs` wires carry the garbler's input bits, the next
/// `evaluator_inputs` wires the evaluator's, and the last `outputs` wires are
/// the circuit outputs. Gate ids define topological order: every gate only
/// reads wires that are circuit inputs or outputs of earlier gates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Circuit {
    /// The gates in id order; a gate's id is its index in the vector.
    gates: Vec<Gate>,
    /// Total number of wires, including unconnected ones.
    num_wires: u32,
    /// Number of garbler (party 1) input bits.
    garbler_inputs: usize,
    /// Number of evaluator (party 2) input bits.
    evaluator_inputs: usize,
    /// Number of output bits.
    outputs: usize,
}

impl Circuit {
    /// Creates a circuit from a collection of gates and the wire counts.
    pub fn new(
        gates: Vec<Gate>,
        num_wires: u32,
        garbler_inputs: usize,
        evaluator_inputs: usize,
        outputs: usize,
    ) -> Self {
        Self {
            gates,
            num_wires,
            garbler_inputs,
            evaluator_inputs,
            outputs,
        }
    }

    /// The gates of the circuit, in gate-id order.
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Total number of wires.
    pub fn num_wires(&self) -> u32 {
        self.num_wires
    }

    /// Number of garbler input bits.
    pub fn garbler_inputs(&self) -> usize {
        self.garbler_inputs
    }

    /// Number of evaluator input bits.
    pub fn evaluator_inputs(&self) -> usize {
        self.evaluator_inputs
    }

    /// Number of output bits.
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Total number of input wires across both parties.
    pub fn num_inputs(&self) -> usize {
        self.garbler_inputs + self.evaluator_inputs
    }

    /// The output wires, which are the last wires of the circuit, in order.
    pub fn output_wires(&self) -> std::ops::Range<WireId> {
        self.num_wires - self.outputs as u32..self.num_wires
    }

    /// Parses the textual circuit format.
    ///
    /// The format is line-oriented ASCII with whitespace-separated fields.
    /// The first line holds the gate and wire counts, the second the input
    /// and output bit widths of both parties, and every following line one
    /// gate as `<nIn> <nOut> <inWires...> <outWire> <OP>`. Blank lines are
    /// allowed anywhere.
    ///
    /// Parsing is strict about the syntax but does not check topological
    /// consistency; that is left to [`Circuit::validate`], which runs before
    /// garbling or evaluating.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut lines = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if !fields.is_empty() {
                lines.push((idx + 1, fields));
            }
        }
        let mut lines = lines.into_iter();

        let (line, fields) = lines.next().ok_or_else(|| Error::Parse {
            line: 1,
            reason: "missing gate and wire counts".to_string(),
        })?;
        if fields.len() != 2 {
            return Err(Error::Parse {
                line,
                reason: format!("expected '<numGates> <numWires>', found {} fields", fields.len()),
            });
        }
        let num_gates: usize = parse_num(&fields[0], line)?;
        let num_wires: u32 = parse_num(&fields[1], line)?;
        let header_line = line;

        let (line, fields) = lines.next().ok_or_else(|| Error::Parse {
            line: header_line,
            reason: "missing input and output widths".to_string(),
        })?;
        if fields.len() != 3 {
            return Err(Error::Parse {
                line,
                reason: format!("expected '<n1> <n2> <n3>', found {} fields", fields.len()),
            });
        }
        let garbler_inputs: usize = parse_num(&fields[0], line)?;
        let evaluator_inputs: usize = parse_num(&fields[1], line)?;
        let outputs: usize = parse_num(&fields[2], line)?;

        let mut gates = Vec::with_capacity(num_gates);
        for (line, fields) in lines {
            if fields.len() < 2 {
                return Err(Error::Parse {
                    line,
                    reason: "truncated gate line".to_string(),
                });
            }
            let n_in: usize = parse_num(&fields[0], line)?;
            let n_out: usize = parse_num(&fields[1], line)?;
            if n_out != 1 {
                return Err(Error::Parse {
                    line,
                    reason: format!("gates produce exactly one wire, not {n_out}"),
                });
            }
            if n_in == 0 || n_in > 2 {
                return Err(Error::Parse {
                    line,
                    reason: format!("gates take 1 or 2 inputs, not {n_in}"),
                });
            }
            if fields.len() != 2 + n_in + n_out + 1 {
                return Err(Error::Parse {
                    line,
                    reason: format!(
                        "gate with {n_in} inputs needs {} fields, found {}",
                        2 + n_in + n_out + 1,
                        fields.len()
                    ),
                });
            }
            let mut wires = [0 as WireId; 3];
            for (i, field) in fields[2..2 + n_in + 1].iter().enumerate() {
                wires[i] = parse_num(field, line)?;
            }
            let op = fields[2 + n_in + 1].as_str();
            let gate = match (op, n_in) {
                ("XOR", 2) => Gate::Xor(wires[0], wires[1], wires[2]),
                ("AND", 2) => Gate::And(wires[0], wires[1], wires[2]),
                ("OR", 2) => Gate::Or(wires[0], wires[1], wires[2]),
                ("INV", 1) => Gate::Inv(wires[0], wires[1]),
                ("XOR" | "AND" | "OR", _) => {
                    return Err(Error::Parse {
                        line,
                        reason: format!("{op} takes 2 inputs, not {n_in}"),
                    })
                }
                ("INV", _) => {
                    return Err(Error::Parse {
                        line,
                        reason: format!("INV takes 1 input, not {n_in}"),
                    })
                }
                _ => {
                    return Err(Error::Parse {
                        line,
                        reason: format!("invalid operation '{op}'"),
                    })
                }
            };
            gates.push(gate);
        }

        if gates.len() != num_gates {
            return Err(Error::Parse {
                line: header_line,
                reason: format!("expected {num_gates} gates, found {}", gates.len()),
            });
        }

        Ok(Self {
            gates,
            num_wires,
            garbler_inputs,
            evaluator_inputs,
            outputs,
        })
    }

    /// Writes the circuit in its canonical textual form, gates in id order.
    ///
    /// The output of `marshal` parses back into an equal circuit.
    pub fn marshal(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "{} {}", self.gates.len(), self.num_wires)?;
        writeln!(
            out,
            "{} {} {}",
            self.garbler_inputs, self.evaluator_inputs, self.outputs
        )?;
        writeln!(out)?;

        for gate in &self.gates {
            match *gate {
                Gate::Xor(a, b, c) => writeln!(out, "2 1 {a} {b} {c} XOR")?,
                Gate::And(a, b, c) => writeln!(out, "2 1 {a} {b} {c} AND")?,
                Gate::Or(a, b, c) => writeln!(out, "2 1 {a} {b} {c} OR")?,
                Gate::Inv(a, c) => writeln!(out, "1 1 {a} {c} INV")?,
            }
        }
        Ok(())
    }

    /// Performs a topology check of the circuit.
    ///
    /// A circuit is invalid if any of the following is true:
    ///   - a gate reads a wire that is neither a circuit input nor the output
    ///     of an earlier gate (this also rules out cycles)
    ///   - a wire is produced by more than one gate, or a gate overwrites an
    ///     input wire
    ///   - a wire id is outside `0..num_wires`
    ///   - an output wire is never produced
    ///   - the circuit has no output wires, or more gates than supported
    pub fn validate(&self) -> Result<(), Error> {
        let num_wires = self.num_wires as usize;
        let inputs = self.num_inputs();
        if inputs > num_wires {
            return Err(Error::Topology(format!(
                "{inputs} input wires exceed the {num_wires} wires of the circuit"
            )));
        }
        if self.outputs == 0 {
            return Err(Error::Topology("circuit has no output wires".to_string()));
        }
        if self.outputs > num_wires {
            return Err(Error::Topology(format!(
                "{} output wires exceed the {num_wires} wires of the circuit",
                self.outputs
            )));
        }
        if self.gates.len() > MAX_GATES {
            return Err(Error::Topology(format!(
                "circuit has {} gates, at most {MAX_GATES} are supported",
                self.gates.len()
            )));
        }

        let mut produced = vec![false; num_wires];
        for p in produced.iter_mut().take(inputs) {
            *p = true;
        }
        for (id, gate) in self.gates.iter().enumerate() {
            let (ins, out) = match *gate {
                Gate::Xor(a, b, c) | Gate::And(a, b, c) | Gate::Or(a, b, c) => (vec![a, b], c),
                Gate::Inv(a, c) => (vec![a], c),
            };
            for w in ins {
                if w as usize >= num_wires || !produced[w as usize] {
                    return Err(Error::Topology(format!(
                        "gate {id} reads wire {w}, which is not defined at that point"
                    )));
                }
            }
            if out as usize >= num_wires {
                return Err(Error::Topology(format!(
                    "gate {id} writes wire {out}, which is out of range"
                )));
            }
            if produced[out as usize] {
                return Err(Error::Topology(format!(
                    "gate {id} produces wire {out} a second time"
                )));
            }
            produced[out as usize] = true;
        }
        for w in self.output_wires() {
            if !produced[w as usize] {
                return Err(Error::Topology(format!(
                    "output wire {w} is never produced"
                )));
            }
        }
        Ok(())
    }

    /// Calculates a blake3 fingerprint of the circuit.
    ///
    /// Both parties compare fingerprints at session start to make sure they
    /// agreed on the same circuit.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Hasher::new();
        hasher.update(&(self.gates.len() as u32).to_be_bytes());
        hasher.update(&self.num_wires.to_be_bytes());
        hasher.update(&(self.garbler_inputs as u32).to_be_bytes());
        hasher.update(&(self.evaluator_inputs as u32).to_be_bytes());
        hasher.update(&(self.outputs as u32).to_be_bytes());
        for gate in &self.gates {
            gate.update_hash(&mut hasher);
        }
        *hasher.finalize().as_bytes()
    }
}

fn parse_num<T: std::str::FromStr>(field: &str, line: usize) -> Result<T, Error> {
    field.parse().map_err(|_| Error::Parse {
        line,
        reason: format!("invalid number '{field}'"),
    })
}
