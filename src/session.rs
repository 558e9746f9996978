//! The peer session: sequencing OT rounds and label exchanges between two
//! parties over a reliable ordered byte stream.
//!
//! Each session owns one RSA key pair (used when playing OT sender) and the
//! peer's public key (used when playing OT receiver). One side of the stream
//! is the [`Role::Client`], the other the [`Role::Server`]; for every phase
//! in which both parties both query and respond, the client queries first and
//! the server responds first. Both parties calling the phases in this fixed
//! order is what keeps the two blocking message loops from deadlocking.

use std::io::{Read, Write};
use std::thread;

use num_bigint::BigUint;
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use crate::{
    circuit::{Circuit, WireId},
    conn::{self, Conn, PING},
    evaluate::Evaluator,
    garble::{GarbledGate, GarbledTable, Garbler},
    label::Label,
    ot, Error,
};

/// Transport role of a party, fixed at connection setup.
///
/// The client is the side that initiated the connection. The role is
/// independent of who garbles and who evaluates; it only decides message
/// ordering in symmetric phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The connecting side; queries first, responds second.
    Client,
    /// The accepting side; responds first, queries second.
    Server,
}

/// A session with one peer, running oblivious transfers and garbled-circuit
/// evaluations over the wrapped byte stream.
pub struct Session<R, W: Write> {
    conn: Conn<R, W>,
    local_id: u32,
    peer_id: u32,
    role: Role,
    ot_sender: ot::Sender,
    ot_receiver: ot::Receiver,
    rng: ChaCha20Rng,
}

impl<R: Read + Send, W: Write> Session<R, W> {
    /// Establishes a session: the parties exchange their ids and RSA public
    /// keys, after which either may garble or evaluate circuits.
    ///
    /// Reception of the peer's public key is overlapped with the expensive
    /// local key generation; the join at the end of the exchange is the only
    /// synchronization point of the session.
    pub fn new(
        reader: R,
        writer: W,
        local_id: u32,
        role: Role,
        key_size: usize,
        mut rng: ChaCha20Rng,
    ) -> Result<Self, Error> {
        let mut conn = Conn::new(reader, writer);

        conn.send_u32(local_id)?;
        conn.flush()?;
        let peer_id = conn.recv_u32()?;

        let Conn { reader, writer } = &mut conn;
        let (ot_sender, peer_key) =
            thread::scope(|scope| -> Result<(ot::Sender, ot::PublicKey), Error> {
                let peer_key = scope.spawn(move || -> Result<ot::PublicKey, Error> {
                    let modulus = conn::read_data(reader)?;
                    let exponent = conn::read_u32(reader)?;
                    Ok(ot::PublicKey::new(BigUint::from_bytes_be(&modulus), exponent))
                });

                let sender = ot::Sender::new(key_size, &mut rng)?;
                let public = sender.public_key();
                conn::write_data(writer, &public.modulus_bytes())?;
                conn::write_u32(writer, public.exponent())?;
                writer.flush()?;

                let peer_key = peer_key
                    .join()
                    .map_err(|_| Error::Io("public key exchange failed".to_string()))??;
                Ok((sender, peer_key))
            })?;

        debug!(local_id, peer_id, role = ?role, "session established");

        Ok(Self {
            conn,
            local_id,
            peer_id,
            role,
            ot_sender,
            ot_receiver: ot::Receiver::new(peer_key),
            rng,
        })
    }
}

impl<R: Read, W: Write> Session<R, W> {
    /// The id this party sent to the peer.
    pub fn local_id(&self) -> u32 {
        self.local_id
    }

    /// The id received from the peer.
    pub fn peer_id(&self) -> u32 {
        self.peer_id
    }

    /// The transport role of this side of the session.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Sends a ping sentinel on the control path; no response is expected.
    pub fn ping(&mut self) -> Result<(), Error> {
        self.conn.send_ping()
    }

    /// Runs the query side of a batched OT phase: for every choice bit, one
    /// message of the peer's corresponding pair is obtained obliviously.
    ///
    /// The peer must answer with [`Session::ot_respond`] over a batch of the
    /// same size, with message pairs of length `msg_len`.
    pub fn ot_query(&mut self, choices: &[bool], msg_len: usize) -> Result<Vec<Vec<u8>>, Error> {
        debug!(role = ?self.role, count = choices.len(), "batched OT query");
        self.conn.send_u32(choices.len() as u32)?;
        self.conn.flush()?;

        let k = self.ot_receiver.public_key().byte_len();
        let mut result = Vec::with_capacity(choices.len());
        for (i, &bit) in choices.iter().enumerate() {
            self.conn.send_u32(i as u32)?;
            self.conn.flush()?;

            let x0 = self.conn.recv_data_exact(k)?;
            let x1 = self.conn.recv_data_exact(k)?;
            let mut xfer = self.ot_receiver.new_transfer(bit);
            xfer.receive_random_messages(&x0, &x1, &mut self.rng);

            self.conn.send_data(&xfer.v()?)?;
            self.conn.flush()?;

            let m0 = self.conn.recv_data_exact(msg_len)?;
            let m1 = self.conn.recv_data_exact(msg_len)?;
            xfer.receive_messages(&m0, &m1)?;
            let (message, _) = xfer.message()?;
            result.push(message.to_vec());
        }
        Ok(result)
    }

    /// Runs the respond side of a batched OT phase, serving one transfer per
    /// queried index out of the given message pairs.
    ///
    /// Fails with [`Error::ProtocolMismatch`] if the peer's batch size
    /// disagrees with the number of message pairs.
    pub fn ot_respond(&mut self, m0s: &[Vec<u8>], m1s: &[Vec<u8>]) -> Result<(), Error> {
        if m0s.len() != m1s.len() {
            return Err(Error::MessageLengthMismatch);
        }
        let count = self.conn.recv_u32()?;
        if count as usize != m0s.len() {
            return Err(Error::ProtocolMismatch {
                expected: m0s.len() as u32,
                got: count,
            });
        }
        debug!(role = ?self.role, count, "batched OT respond");

        for _ in 0..count {
            let index = self.conn.recv_u32()?;
            if index >= count {
                return Err(Error::ProtocolMismatch {
                    expected: count,
                    got: index,
                });
            }

            let mut xfer = self.ot_sender.new_transfer(
                &m0s[index as usize],
                &m1s[index as usize],
                &mut self.rng,
            )?;
            let (x0, x1) = xfer.random_messages();
            self.conn.send_data(&x0)?;
            self.conn.send_data(&x1)?;
            self.conn.flush()?;

            let v = self
                .conn
                .recv_data_exact(self.ot_sender.public_key().byte_len())?;
            xfer.receive_v(&v);

            let (m0, m1) = xfer.messages()?;
            self.conn.send_data(&m0)?;
            self.conn.send_data(&m1)?;
            self.conn.flush()?;
        }
        Ok(())
    }

    /// Runs a batched OT phase in which both parties query and respond over
    /// the same batch size.
    ///
    /// The client queries first and then responds; the server responds first
    /// and then queries. Both parties must use the same batch size and call
    /// this phase at the same point of the protocol.
    pub fn ot_exchange(
        &mut self,
        choices: &[bool],
        m0s: &[Vec<u8>],
        m1s: &[Vec<u8>],
        msg_len: usize,
    ) -> Result<Vec<Vec<u8>>, Error> {
        match self.role {
            Role::Client => {
                let result = self.ot_query(choices, msg_len)?;
                self.ot_respond(m0s, m1s)?;
                Ok(result)
            }
            Role::Server => {
                self.ot_respond(m0s, m1s)?;
                self.ot_query(choices, msg_len)
            }
        }
    }

    /// Sends a count-prefixed vector of labels.
    pub fn send_labels(&mut self, labels: &[Label]) -> Result<(), Error> {
        self.conn.send_u32(labels.len() as u32)?;
        for label in labels {
            self.conn.send_data(&label.to_bytes())?;
        }
        self.conn.flush()
    }

    /// Receives a count-prefixed vector of labels, failing with
    /// [`Error::ProtocolMismatch`] unless exactly `expected` labels arrive.
    pub fn recv_labels(&mut self, expected: usize) -> Result<Vec<Label>, Error> {
        let count = self.conn.recv_u32()?;
        if count as usize != expected {
            return Err(Error::ProtocolMismatch {
                expected: expected as u32,
                got: count,
            });
        }
        let mut labels = Vec::with_capacity(expected);
        for _ in 0..count {
            let bytes = self.conn.recv_data_exact(Label::SIZE)?;
            labels.push(Label::from_bytes(&bytes)?);
        }
        Ok(labels)
    }

    /// Exchanges label vectors with the peer, in role-defined order: the
    /// client sends first, the server receives first.
    pub fn exchange_labels(
        &mut self,
        labels: &[Label],
        expected: usize,
    ) -> Result<Vec<Label>, Error> {
        match self.role {
            Role::Client => {
                self.send_labels(labels)?;
                self.recv_labels(expected)
            }
            Role::Server => {
                let received = self.recv_labels(expected)?;
                self.send_labels(labels)?;
                Ok(received)
            }
        }
    }

    /// Garbles `circuit` with this party's input bits and streams it to the
    /// peer, who must call [`Session::evaluate`] on the same circuit.
    ///
    /// Returns the circuit output, revealed by the evaluator at the end of
    /// the run.
    pub fn garble(&mut self, circuit: &Circuit, input: &[bool]) -> Result<Vec<bool>, Error> {
        if input.len() != circuit.garbler_inputs() {
            return Err(Error::InsufficientInput);
        }
        self.check_circuit(circuit)?;
        let garbler = Garbler::new(circuit, &mut self.rng)?;
        debug!(peer = self.peer_id, "garbling circuit");

        // The garbler's own input labels go over in the clear; they reveal
        // nothing without the decoding information.
        let labels: Vec<Label> = input
            .iter()
            .enumerate()
            .map(|(w, &bit)| garbler.label(w as WireId, bit))
            .collect();
        self.send_labels(&labels)?;

        // One OT per evaluator input bit, with the wire's two labels as the
        // message pair.
        let n1 = circuit.garbler_inputs();
        let m0s: Vec<Vec<u8>> = (0..circuit.evaluator_inputs())
            .map(|i| garbler.label((n1 + i) as WireId, false).to_bytes().to_vec())
            .collect();
        let m1s: Vec<Vec<u8>> = (0..circuit.evaluator_inputs())
            .map(|i| garbler.label((n1 + i) as WireId, true).to_bytes().to_vec())
            .collect();
        self.ot_respond(&m0s, &m1s)?;

        // Stream the garbled tables in gate-id order, terminated by the
        // control sentinel.
        for garbled in garbler.garbled_gates() {
            self.conn.send_u32(garbled.gate)?;
            self.conn.send_data(&garbled.table.to_bytes())?;
        }
        self.conn.send_u32(PING)?;
        self.conn.flush()?;

        let decoding: Vec<u8> = garbler.decoding().iter().map(|&b| u8::from(b)).collect();
        self.conn.send_data(&decoding)?;
        self.conn.flush()?;

        let revealed = self.conn.recv_data_exact(circuit.outputs())?;
        Ok(revealed.into_iter().map(|b| b != 0).collect())
    }

    /// Evaluates `circuit` with this party's input bits against a peer
    /// running [`Session::garble`] on the same circuit.
    ///
    /// Returns the circuit output and reveals it to the garbler.
    pub fn evaluate(&mut self, circuit: &Circuit, input: &[bool]) -> Result<Vec<bool>, Error> {
        if input.len() != circuit.evaluator_inputs() {
            return Err(Error::InsufficientInput);
        }
        self.check_circuit(circuit)?;
        let mut evaluator = Evaluator::new(circuit)?;
        debug!(peer = self.peer_id, "evaluating circuit");

        let garbler_labels = self.recv_labels(circuit.garbler_inputs())?;
        for (w, label) in garbler_labels.into_iter().enumerate() {
            evaluator.set_input_label(w as WireId, label);
        }

        let n1 = circuit.garbler_inputs();
        let own_labels = self.ot_query(input, Label::SIZE)?;
        for (i, bytes) in own_labels.iter().enumerate() {
            evaluator.set_input_label((n1 + i) as WireId, Label::from_bytes(bytes)?);
        }

        loop {
            let gate = self.conn.recv_u32()?;
            if gate == PING {
                break;
            }
            let table = self.conn.recv_data_exact(GarbledTable::SIZE)?;
            evaluator.feed(&GarbledGate {
                gate,
                table: GarbledTable::from_bytes(&table)?,
            })?;
        }
        evaluator.finish()?;

        let decoding = self.conn.recv_data_exact(circuit.outputs())?;
        let decoding: Vec<bool> = decoding.into_iter().map(|b| b != 0).collect();
        let output = evaluator.decode(&decoding)?;

        let revealed: Vec<u8> = output.iter().map(|&b| u8::from(b)).collect();
        self.conn.send_data(&revealed)?;
        self.conn.flush()?;
        Ok(output)
    }

    /// Compares circuit fingerprints with the peer before an evaluation.
    fn check_circuit(&mut self, circuit: &Circuit) -> Result<(), Error> {
        let fingerprint = circuit.fingerprint();
        self.conn.send_data(&fingerprint)?;
        self.conn.flush()?;
        let peer_fingerprint = self.conn.recv_data_exact(fingerprint.len())?;
        if peer_fingerprint != fingerprint {
            return Err(Error::CircuitMismatch);
        }
        Ok(())
    }
}
