//! Circuit construction helpers shared by the integration tests.

#![allow(dead_code)]

use duet::{Circuit, Gate, WireId};

/// Builds circuits gate by gate, allocating one fresh wire per gate.
///
/// Output wires of a circuit have to be its last wires, so [`finish`]
/// re-emits the requested outputs through OR gates with themselves, which
/// copy a wire's value without changing it.
///
/// [`finish`]: CircuitBuilder::finish
pub struct CircuitBuilder {
    gates: Vec<Gate>,
    garbler_inputs: usize,
    evaluator_inputs: usize,
    next: WireId,
}

impl CircuitBuilder {
    pub fn new(garbler_inputs: usize, evaluator_inputs: usize) -> Self {
        Self {
            gates: Vec::new(),
            garbler_inputs,
            evaluator_inputs,
            next: (garbler_inputs + evaluator_inputs) as WireId,
        }
    }

    pub fn garbler_input(&self, i: usize) -> WireId {
        assert!(i < self.garbler_inputs);
        i as WireId
    }

    pub fn evaluator_input(&self, i: usize) -> WireId {
        assert!(i < self.evaluator_inputs);
        (self.garbler_inputs + i) as WireId
    }

    pub fn xor(&mut self, a: WireId, b: WireId) -> WireId {
        self.push(|w| Gate::Xor(a, b, w))
    }

    pub fn and(&mut self, a: WireId, b: WireId) -> WireId {
        self.push(|w| Gate::And(a, b, w))
    }

    pub fn or(&mut self, a: WireId, b: WireId) -> WireId {
        self.push(|w| Gate::Or(a, b, w))
    }

    pub fn inv(&mut self, a: WireId) -> WireId {
        self.push(|w| Gate::Inv(a, w))
    }

    /// Ripple-carry addition of two little-endian bit vectors, which may
    /// differ in length. The result carries one extra bit.
    pub fn add(&mut self, xs: &[WireId], ys: &[WireId]) -> Vec<WireId> {
        let n = xs.len().max(ys.len());
        let mut out = Vec::with_capacity(n + 1);
        let mut carry: Option<WireId> = None;
        for i in 0..n {
            let (sum, next_carry) = match (xs.get(i), ys.get(i), carry) {
                (Some(&x), Some(&y), None) => (self.xor(x, y), Some(self.and(x, y))),
                (Some(&x), Some(&y), Some(c)) => {
                    let t = self.xor(x, y);
                    let sum = self.xor(t, c);
                    let generate = self.and(x, y);
                    let propagate = self.and(t, c);
                    (sum, Some(self.or(generate, propagate)))
                }
                (Some(&x), None, None) | (None, Some(&x), None) => (x, None),
                (Some(&x), None, Some(c)) | (None, Some(&x), Some(c)) => {
                    (self.xor(x, c), Some(self.and(x, c)))
                }
                (None, None, _) => unreachable!("loop runs to the longer operand"),
            };
            carry = next_carry;
            out.push(sum);
        }
        if let Some(c) = carry {
            out.push(c);
        }
        out
    }

    pub fn finish(mut self, outputs: &[WireId]) -> Circuit {
        for &w in outputs {
            self.or(w, w);
        }
        Circuit::new(
            self.gates,
            self.next,
            self.garbler_inputs,
            self.evaluator_inputs,
            outputs.len(),
        )
    }

    fn push(&mut self, gate: impl FnOnce(WireId) -> Gate) -> WireId {
        let w = self.next;
        self.next += 1;
        self.gates.push(gate(w));
        w
    }
}

/// A 2-bit adder: garbler bits plus evaluator bits, 3 output bits.
pub fn add2() -> Circuit {
    Circuit::new(
        vec![
            Gate::And(0, 2, 4),
            Gate::Xor(1, 3, 5),
            Gate::And(1, 3, 6),
            Gate::And(5, 4, 7),
            Gate::Xor(0, 2, 8),
            Gate::Xor(5, 4, 9),
            Gate::Or(6, 7, 10),
        ],
        11,
        2,
        2,
        3,
    )
}

/// A 3x3-bit multiplier built from AND rows and ripple-carry adders,
/// 6 output bits.
pub fn mul3() -> Circuit {
    let mut b = CircuitBuilder::new(3, 3);
    let a: Vec<WireId> = (0..3).map(|i| b.garbler_input(i)).collect();
    let y: Vec<WireId> = (0..3).map(|i| b.evaluator_input(i)).collect();

    let mut acc: Vec<WireId> = a.iter().map(|&ai| b.and(ai, y[0])).collect();
    for (j, &yj) in y.iter().enumerate().skip(1) {
        let row: Vec<WireId> = a.iter().map(|&ai| b.and(ai, yj)).collect();
        let summed = b.add(&acc[j..], &row);
        acc.truncate(j);
        acc.extend(summed);
    }
    b.finish(&acc)
}

/// Little-endian bit decomposition of `value`.
pub fn to_bits(value: u64, width: usize) -> Vec<bool> {
    (0..width).map(|i| value >> i & 1 == 1).collect()
}

/// Recomposes a little-endian bit vector.
pub fn from_bits(bits: &[bool]) -> u64 {
    bits.iter()
        .enumerate()
        .fold(0, |acc, (i, &bit)| acc | u64::from(bit) << i)
}
