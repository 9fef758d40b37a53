//! Transaction assembly
//!
//! [`assemble_transaction`] turns a source address and an ordered list of
//! operations into an unsigned [`Transaction`], using the ledger only to read
//! the source account's current sequence number. Signing happens elsewhere;
//! the signatures come back through [`Transaction::into_signed`] or as a
//! complete envelope through [`SignedTransaction::from_envelope_xdr`].

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::time::Duration;
use stellar_xdr::curr::{
    self as xdr, DecoratedSignature, Hash, Limits, Memo, Preconditions, ReadXdr, SequenceNumber,
    TimePoint, TransactionEnvelope, TransactionExt, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, TransactionV1Envelope, WriteXdr,
};

use crate::address::Address;
use crate::error::WalletError;
use crate::horizon::LedgerClient;
use crate::network::Network;
use crate::operation::Operation;
use crate::Result;

/// Per-operation fee in stroops
pub const BASE_FEE: u32 = 100;

/// Protocol cap on operations per transaction
pub const MAX_OPERATIONS: usize = 100;

/// Validity window in unix seconds; `max_time == 0` means unbounded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

impl TimeBounds {
    pub fn expiring_in(timeout: Duration) -> Self {
        let now = Utc::now().timestamp().max(0) as u64;
        Self {
            min_time: 0,
            max_time: now.saturating_add(timeout.as_secs()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TransactionOptions {
    /// When set, transactions expire this long after assembly; zero means never
    pub timeout: Option<Duration>,
}

/// Unsigned transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    source: Address,
    sequence: i64,
    network: Network,
    operations: Vec<Operation>,
    fee: u32,
    time_bounds: Option<TimeBounds>,
}

impl Transaction {
    /// Build a transaction at an explicit sequence number
    ///
    /// Operations keep the order given. The fee is [`BASE_FEE`] per operation.
    pub fn new(
        source: Address,
        sequence: i64,
        network: Network,
        operations: Vec<Operation>,
        time_bounds: Option<TimeBounds>,
    ) -> Result<Self> {
        check_operation_count(operations.len())?;
        let fee = BASE_FEE * operations.len() as u32;

        Ok(Self {
            source,
            sequence,
            network,
            operations,
            fee,
            time_bounds,
        })
    }

    pub fn source(&self) -> &Address {
        &self.source
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn fee(&self) -> u32 {
        self.fee
    }

    pub fn time_bounds(&self) -> Option<TimeBounds> {
        self.time_bounds
    }

    pub fn to_xdr(&self) -> Result<xdr::Transaction> {
        let operations = self
            .operations
            .iter()
            .map(Operation::to_xdr)
            .collect::<Result<Vec<_>>>()?;

        let cond = match self.time_bounds {
            Some(bounds) => Preconditions::Time(xdr::TimeBounds {
                min_time: TimePoint(bounds.min_time),
                max_time: TimePoint(bounds.max_time),
            }),
            None => Preconditions::None,
        };

        Ok(xdr::Transaction {
            source_account: self.source.to_muxed_account()?,
            fee: self.fee,
            seq_num: SequenceNumber(self.sequence),
            cond,
            memo: Memo::None,
            operations: operations.try_into()?,
            ext: TransactionExt::V0,
        })
    }

    /// Hash the signers sign: SHA-256 over the network id and the transaction
    pub fn hash(&self) -> Result<[u8; 32]> {
        signature_payload_hash(&self.network, self.to_xdr()?)
    }

    pub fn hash_hex(&self) -> Result<String> {
        Ok(hex::encode(self.hash()?))
    }

    /// Base64 envelope without signatures, for handing to an external signer
    pub fn to_envelope_xdr(&self) -> Result<String> {
        let envelope = self.to_envelope(Vec::new())?;
        Ok(envelope.to_xdr_base64(Limits::none())?)
    }

    /// Attach signatures produced elsewhere
    pub fn into_signed(self, signatures: Vec<DecoratedSignature>) -> Result<SignedTransaction> {
        if signatures.is_empty() {
            return Err(WalletError::InvalidTransaction(
                "at least one signature is required".to_string(),
            ));
        }
        let envelope = self.to_envelope(signatures)?;
        SignedTransaction::from_envelope(envelope)
    }

    fn to_envelope(&self, signatures: Vec<DecoratedSignature>) -> Result<TransactionEnvelope> {
        Ok(TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: self.to_xdr()?,
            signatures: signatures.try_into()?,
        }))
    }
}

/// Signed envelope, ready for submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    envelope: TransactionEnvelope,
    envelope_xdr: String,
}

impl SignedTransaction {
    pub fn from_envelope(envelope: TransactionEnvelope) -> Result<Self> {
        let envelope_xdr = envelope.to_xdr_base64(Limits::none())?;
        Ok(Self {
            envelope,
            envelope_xdr,
        })
    }

    /// Accept a base64 envelope signed by another tool
    pub fn from_envelope_xdr(envelope_xdr: &str) -> Result<Self> {
        let envelope = TransactionEnvelope::from_xdr_base64(envelope_xdr.trim(), Limits::none())
            .map_err(|e| WalletError::InvalidTransaction(format!("undecodable envelope: {}", e)))?;
        Self::from_envelope(envelope)
    }

    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    pub fn envelope_xdr(&self) -> &str {
        &self.envelope_xdr
    }

    pub fn signature_count(&self) -> usize {
        match &self.envelope {
            TransactionEnvelope::TxV0(env) => env.signatures.len(),
            TransactionEnvelope::Tx(env) => env.signatures.len(),
            TransactionEnvelope::TxFeeBump(env) => env.signatures.len(),
        }
    }

    /// Hash of the enclosed transaction on `network`
    pub fn hash(&self, network: &Network) -> Result<[u8; 32]> {
        match &self.envelope {
            TransactionEnvelope::Tx(env) => signature_payload_hash(network, env.tx.clone()),
            _ => Err(WalletError::InvalidTransaction(
                "only v1 transaction envelopes are supported".to_string(),
            )),
        }
    }
}

fn signature_payload_hash(network: &Network, tx: xdr::Transaction) -> Result<[u8; 32]> {
    let payload = TransactionSignaturePayload {
        network_id: Hash(network.network_id()),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx),
    };
    let bytes = payload.to_xdr(Limits::none())?;
    Ok(Sha256::digest(&bytes).into())
}

fn check_operation_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(WalletError::InvalidTransaction(
            "a transaction needs at least one operation".to_string(),
        ));
    }
    if count > MAX_OPERATIONS {
        return Err(WalletError::InvalidTransaction(format!(
            "{} operations exceed the limit of {}",
            count, MAX_OPERATIONS
        )));
    }
    Ok(())
}

/// Assemble an unsigned transaction for `source`
///
/// Operations are validated and encoded locally first; only then is the
/// source account's sequence number fetched. The result uses sequence
/// `current + 1`. Nothing is cached, so concurrent callers for the same
/// source race on the sequence number.
pub fn assemble_transaction<C: LedgerClient + ?Sized>(
    client: &C,
    network: &Network,
    source: &Address,
    operations: Vec<Operation>,
    options: &TransactionOptions,
) -> Result<Transaction> {
    check_operation_count(operations.len())?;
    source.to_muxed_account()?;
    for operation in &operations {
        operation.to_xdr()?;
    }

    let current = client.account_sequence(source)?;
    let sequence = current.checked_add(1).ok_or_else(|| {
        WalletError::InvalidResponse(format!("sequence number {} cannot advance", current))
    })?;

    let time_bounds = options
        .timeout
        .filter(|timeout| !timeout.is_zero())
        .map(TimeBounds::expiring_in);
    let tx = Transaction::new(source.clone(), sequence, network.clone(), operations, time_bounds)?;

    log::info!(
        "Assembled transaction for {}: sequence {}, {} operation(s), fee {}",
        source,
        sequence,
        tx.operations.len(),
        tx.fee
    );

    Ok(tx)
}
