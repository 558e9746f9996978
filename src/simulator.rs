//! Two-party execution environment on a single machine.
//!
//! [`simulate`] runs the full garbler/evaluator protocol, including the
//! oblivious transfers, over an in-memory duplex pipe with the garbler on a
//! separate thread. This executes the exact same code paths as a networked
//! session, just without any latency or bandwidth restrictions, and is the
//! workhorse of the integration tests.

use std::io::{Read, Write};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::{circuit::Circuit, session::Role, session::Session, Error};

/// RSA key size used by [`simulate`]; small enough to keep test runs fast.
const SIMULATION_KEY_SIZE: usize = 512;

/// Read half of an in-memory duplex pipe created by [`duplex`].
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    buf: Vec<u8>,
    pos: usize,
}

/// Write half of an in-memory duplex pipe created by [`duplex`].
pub struct PipeWriter {
    tx: Sender<Vec<u8>>,
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        while self.pos == self.buf.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                // The write half is gone; signal a clean end of stream.
                Err(_) => return Ok(0),
            }
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(buf.to_vec())
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Creates a pair of connected in-memory byte streams.
///
/// Everything written to one party's [`PipeWriter`] can be read from the
/// other party's [`PipeReader`], in order.
pub fn duplex() -> ((PipeReader, PipeWriter), (PipeReader, PipeWriter)) {
    let (a_tx, a_rx) = channel();
    let (b_tx, b_rx) = channel();
    let a = (
        PipeReader {
            rx: a_rx,
            buf: Vec::new(),
            pos: 0,
        },
        PipeWriter { tx: b_tx },
    );
    let b = (
        PipeReader {
            rx: b_rx,
            buf: Vec::new(),
            pos: 0,
        },
        PipeWriter { tx: a_tx },
    );
    (a, b)
}

/// Securely evaluates the circuit between two local parties.
///
/// The garbler (holding `garbler_input`) runs on a spawned thread and the
/// evaluator on the calling thread, connected through [`duplex`]; the full
/// protocol with all oblivious transfers is executed. Returns the circuit
/// output, which both parties learn.
pub fn simulate(
    circuit: &Circuit,
    garbler_input: &[bool],
    evaluator_input: &[bool],
) -> Result<Vec<bool>, Error> {
    let (garbler_io, evaluator_io) = duplex();

    let garbler_circuit = circuit.clone();
    let garbler_input = garbler_input.to_vec();
    let garbler = thread::spawn(move || -> Result<Vec<bool>, Error> {
        let (reader, writer) = garbler_io;
        let mut session = Session::new(
            reader,
            writer,
            0,
            Role::Server,
            SIMULATION_KEY_SIZE,
            ChaCha20Rng::from_entropy(),
        )?;
        session.garble(&garbler_circuit, &garbler_input)
    });

    let evaluator_result = (|| {
        let (reader, writer) = evaluator_io;
        let mut session = Session::new(
            reader,
            writer,
            1,
            Role::Client,
            SIMULATION_KEY_SIZE,
            ChaCha20Rng::from_entropy(),
        )?;
        session.evaluate(circuit, evaluator_input)
    })();

    let garbler_result = garbler
        .join()
        .map_err(|_| Error::Io("garbler thread panicked".to_string()))?;

    // Transport errors on one side are usually just the echo of the real
    // failure on the other; report the underlying cause.
    match (evaluator_result, garbler_result) {
        (Ok(output), Ok(revealed)) => {
            if revealed != output {
                return Err(Error::CircuitMismatch);
            }
            Ok(output)
        }
        (Ok(_), Err(err)) => Err(err),
        (Err(Error::TransportClosed | Error::Io(_)), Err(err)) => Err(err),
        (Err(err), _) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Gate;

    #[test]
    fn simulates_an_and_gate() {
        let circuit = Circuit::new(vec![Gate::And(0, 1, 2)], 3, 1, 1, 1);
        assert_eq!(simulate(&circuit, &[true], &[true]), Ok(vec![true]));
        assert_eq!(simulate(&circuit, &[true], &[false]), Ok(vec![false]));
    }

    #[test]
    fn rejects_wrong_input_widths() {
        let circuit = Circuit::new(vec![Gate::And(0, 1, 2)], 3, 1, 1, 1);
        assert_eq!(
            simulate(&circuit, &[true, false], &[true]),
            Err(Error::InsufficientInput)
        );
        assert_eq!(
            simulate(&circuit, &[true], &[]),
            Err(Error::InsufficientInput)
        );
    }

    #[test]
    fn pipe_delivers_bytes_in_order() {
        let ((mut a_reader, mut a_writer), (mut b_reader, mut b_writer)) = duplex();

        a_writer.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        b_reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        b_writer.write_all(b"pong").unwrap();
        a_reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }
}
