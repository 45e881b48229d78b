//! Decision Ledger - tamper-evident hash chain of shadow decisions.
//!
//! Every shadow inference is folded into a SHA-256 chain:
//! `decision_hash = H(features || logits || temperature)` and
//! `chain_hash = H(previous_chain_hash || decision_hash)`, starting from a
//! fixed all-zero genesis value. `verify()` replays the chain from genesis;
//! a `false` result means a stored record was edited after the fact and
//! must be treated as a hard security event, not a soft warning.

use chrono::Utc;
use sha2::{Digest, Sha256};

use super::types::DecisionRecord;

/// Fixed genesis value for the chain.
const GENESIS_HASH: [u8; 32] = [0u8; 32];

pub struct DecisionLedger {
    records: Vec<DecisionRecord>,
    current_chain_hash: [u8; 32],
    next_sequence_id: u64,
}

impl DecisionLedger {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            current_chain_hash: GENESIS_HASH,
            next_sequence_id: 0,
        }
    }

    /// Hash the decision inputs, advance the chain, and append the record.
    pub fn record(
        &mut self,
        features: &[f64],
        logits: &[f64],
        temperature: f64,
        predicted_class: usize,
        confidence: f64,
    ) -> DecisionRecord {
        let decision_hash = hash_decision(features, logits, temperature);
        let chain_hash = chain_step(&self.current_chain_hash, &decision_hash);

        let record = DecisionRecord {
            sequence_id: self.next_sequence_id,
            timestamp: Utc::now().timestamp(),
            decision_hash,
            chain_hash,
            predicted_class,
            confidence,
            temperature,
        };

        self.current_chain_hash = chain_hash;
        self.next_sequence_id += 1;
        self.records.push(record.clone());

        record
    }

    /// Replay the chain from genesis over all stored records.
    ///
    /// Returns false at the first link whose stored `chain_hash` does not
    /// match the recomputation. A tampered `decision_hash` also breaks the
    /// link it feeds into, so either field being edited is detected.
    pub fn verify(&self) -> bool {
        let mut chain = GENESIS_HASH;
        for record in &self.records {
            chain = chain_step(&chain, &record.decision_hash);
            if chain != record.chain_hash {
                return false;
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hex encoding of the current chain head.
    pub fn current_hash(&self) -> String {
        hex::encode(self.current_chain_hash)
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    /// Test isolation only; never called from request handling.
    pub fn reset(&mut self) {
        self.records.clear();
        self.current_chain_hash = GENESIS_HASH;
        self.next_sequence_id = 0;
    }
}

impl Default for DecisionLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// `H(le_bytes(features) || le_bytes(logits) || le_bytes(temperature))`.
fn hash_decision(features: &[f64], logits: &[f64], temperature: f64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for f in features {
        hasher.update(f.to_le_bytes());
    }
    for l in logits {
        hasher.update(l.to_le_bytes());
    }
    hasher.update(temperature.to_le_bytes());
    hasher.finalize().into()
}

fn chain_step(previous: &[u8; 32], decision_hash: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(previous);
    hasher.update(decision_hash);
    hasher.finalize().into()
}
