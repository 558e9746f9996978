//! Secure two-party computation using Yao's garbled circuits.
//!
//! This crate lets two mutually distrusting parties evaluate a boolean circuit
//! (built from XOR, AND, OR and INV gates) on their private inputs, such that
//! neither party learns anything about the other's input beyond what the
//! circuit output reveals. The garbler side assigns encrypted labels to every
//! wire and streams garbled gate tables to the evaluator; the evaluator's own
//! input labels are delivered through RSA-blinded 1-of-2 oblivious transfer,
//! so the garbler never sees which labels were picked. Garbling uses the
//! free-XOR and point-and-permute optimizations, so only AND and OR gates
//! cost ciphertexts.
//!
//! The protocol targets the semi-honest model: both parties are assumed to
//! follow the protocol but may try to infer extra information from the
//! transcript.
//!
//! A [`Session`] runs the whole exchange over any reliable ordered byte
//! stream, such as a [`std::net::TcpStream`] or the in-memory pipe returned
//! by [`duplex`].
//!
//! # Examples
//!
//! ```
//! use duet::{duplex, Circuit, Error, Gate, Role, Session};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//! use std::thread;
//!
//! fn main() -> Result<(), Error> {
//!     // A circuit with 1 input bit per party, outputting the AND of both:
//!     let circuit = Circuit::new(vec![Gate::And(0, 1, 2)], 3, 1, 1, 1);
//!
//!     let (garbler_io, evaluator_io) = duplex();
//!
//!     // Spawn the garbler as a new thread, with the evaluator remaining on
//!     // the main thread:
//!     let circuit_for_garbler = circuit.clone();
//!     thread::spawn(move || -> Result<(), Error> {
//!         let (reader, writer) = garbler_io;
//!         let mut session = Session::new(
//!             reader,
//!             writer,
//!             0,
//!             Role::Server,
//!             512,
//!             ChaCha20Rng::from_entropy(),
//!         )?;
//!
//!         // Garble the circuit with input bit `true` and answer the
//!         // evaluator's oblivious transfers:
//!         session.garble(&circuit_for_garbler, &[true])?;
//!         Ok(())
//!     });
//!
//!     let (reader, writer) = evaluator_io;
//!     let mut session = Session::new(
//!         reader,
//!         writer,
//!         1,
//!         Role::Client,
//!         512,
//!         ChaCha20Rng::from_entropy(),
//!     )?;
//!
//!     let output = session.evaluate(&circuit, &[false])?;
//!     assert_eq!(output, vec![false]);
//!
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod circuit;
mod conn;
mod evaluate;
mod garble;
mod hash;
mod label;
pub mod ot;
mod session;
mod simulator;

pub use circuit::*;
pub use conn::Conn;
pub use evaluate::*;
pub use garble::*;
pub use label::*;
pub use session::*;
pub use simulator::*;

/// Errors occurring during circuit parsing, garbling or the execution of the
/// two-party protocol.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The circuit text could not be parsed.
    Parse {
        /// 1-based line number of the offending line.
        line: usize,
        /// Why the line was rejected.
        reason: String,
    },
    /// The circuit refers to undefined wires, produces a wire twice or breaks
    /// topological gate order.
    Topology(String),
    /// A label was decoded from more than 16 bytes.
    LabelLength,
    /// The two messages of an oblivious transfer differ in length.
    MessageLengthMismatch,
    /// An oblivious transfer message is longer than the RSA modulus.
    MessageTooLong,
    /// The peer sent a count or identifier that disagrees with the local
    /// state of the protocol.
    ProtocolMismatch {
        /// The value required at this point in the protocol.
        expected: u32,
        /// The value actually received.
        got: u32,
    },
    /// The protocol is still in progress and does not yet have any output.
    ProtocolStillInProgress,
    /// The two parties disagree on the circuit being evaluated.
    CircuitMismatch,
    /// An oblivious transfer operation was called before its precondition;
    /// the payload names the operation that has to run first.
    OtState(&'static str),
    /// RSA key generation or modular arithmetic failed.
    Crypto(String),
    /// Not enough or too many input bits were provided as party input.
    InsufficientInput,
    /// The peer closed the connection mid-protocol.
    TransportClosed,
    /// The underlying stream reported an I/O error.
    Io(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse { line, reason } => {
                write!(f, "Parse error on line {line}: {reason}")
            }
            Error::Topology(reason) => {
                write!(f, "The provided circuit is invalid: {reason}")
            }
            Error::LabelLength => f.write_str("Labels are at most 16 bytes long"),
            Error::MessageLengthMismatch => {
                f.write_str("Both messages of an oblivious transfer must have the same length")
            }
            Error::MessageTooLong => {
                f.write_str("Oblivious transfer messages cannot exceed the RSA modulus size")
            }
            Error::ProtocolMismatch { expected, got } => {
                write!(f, "Protocol mismatch: expected {expected}, got {got}")
            }
            Error::ProtocolStillInProgress => {
                f.write_str("The protocol is still in progress and does not yet have any output")
            }
            Error::CircuitMismatch => {
                f.write_str("The peer is evaluating a different circuit")
            }
            Error::OtState(op) => {
                write!(f, "Oblivious transfer called out of order, {op} has to run first")
            }
            Error::Crypto(reason) => write!(f, "Crypto failure: {reason}"),
            Error::InsufficientInput => f.write_str("Not enough or too many input bits provided"),
            Error::TransportClosed => f.write_str("The peer closed the connection"),
            Error::Io(reason) => write!(f, "I/O error: {reason}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::TransportClosed
        } else {
            Error::Io(e.to_string())
        }
    }
}
