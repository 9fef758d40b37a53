/// In-memory ledger
///
/// Holds just enough account state (sequence numbers, native balances,
/// trustlines, signers, sponsorship counters) to validate and apply the
/// transactions a wallet builds, and answers with Horizon's result codes.

use chrono::Utc;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use stellar_xdr::curr::{
    AccountId, ChangeTrustAsset, ChangeTrustOp, CreateAccountOp, DecoratedSignature, Hash, Limits,
    MuxedAccount, OperationBody, Preconditions, PublicKey, ReadXdr, SetOptionsOp, SignerKey,
    Transaction, TransactionEnvelope, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, Uint256, WriteXdr,
};
use thiserror::Error;

use crate::types::{format_stroops, AccountResponse, BalanceResponse, SignerResponse};

pub const BASE_FEE: i64 = 100;
pub const BASE_RESERVE: i64 = 5_000_000;

pub type AccountKey = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustLine {
    pub limit: i64,
    pub sponsor: Option<AccountKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerEntry {
    pub weight: u32,
    pub sponsor: Option<AccountKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    pub sequence: i64,
    pub balance: i64,
    /// Keyed by "CODE:ISSUER"
    pub trustlines: BTreeMap<String, TrustLine>,
    pub signers: BTreeMap<AccountKey, SignerEntry>,
    pub num_sponsoring: u32,
    pub num_sponsored: u32,
}

impl AccountState {
    pub fn subentry_count(&self) -> u32 {
        (self.trustlines.len() + self.signers.len()) as u32
    }

    pub fn minimum_balance(&self) -> i64 {
        let reserves = 2 + self.subentry_count() as i64 + self.num_sponsoring as i64
            - self.num_sponsored as i64;
        reserves * BASE_RESERVE
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("malformed transaction: {0}")]
    Malformed(String),

    #[error("transaction rejected: {code}")]
    Rejected { code: String, operations: Vec<String> },

    #[error("ledger lock poisoned")]
    Poisoned,
}

fn rejected(code: &str) -> SubmitError {
    SubmitError::Rejected {
        code: code.to_string(),
        operations: Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub struct Accepted {
    pub hash: String,
    pub ledger: u32,
}

#[derive(Debug, Clone)]
struct LedgerState {
    ledger: u32,
    accounts: HashMap<AccountKey, AccountState>,
}

/// Active sponsorships within one transaction: sponsored -> sponsor
type Sponsorships = HashMap<AccountKey, AccountKey>;

pub struct MockLedger {
    network_id: [u8; 32],
    state: Mutex<LedgerState>,
}

pub fn decode_address(address: &str) -> Option<AccountKey> {
    stellar_strkey::ed25519::PublicKey::from_string(address.trim())
        .ok()
        .map(|key| key.0)
}

pub fn encode_address(key: &AccountKey) -> String {
    stellar_strkey::ed25519::PublicKey(*key).to_string()
}

fn muxed_key(account: &MuxedAccount) -> AccountKey {
    match account {
        MuxedAccount::Ed25519(Uint256(key)) => *key,
        MuxedAccount::MuxedEd25519(muxed) => muxed.ed25519.0,
    }
}

fn account_id_key(account: &AccountId) -> AccountKey {
    match &account.0 {
        PublicKey::PublicKeyTypeEd25519(Uint256(key)) => *key,
    }
}

fn asset_key(code: &[u8], issuer: &AccountKey) -> String {
    let code = String::from_utf8_lossy(code);
    format!("{}:{}", code.trim_end_matches('\0'), encode_address(issuer))
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

impl MockLedger {
    pub fn new(passphrase: &str) -> Self {
        Self {
            network_id: Sha256::digest(passphrase.as_bytes()).into(),
            state: Mutex::new(LedgerState {
                ledger: 1,
                accounts: HashMap::new(),
            }),
        }
    }

    /// Seed an account directly (friendbot style)
    pub fn create_account(&self, address: &str, balance: i64, sequence: i64) -> anyhow::Result<()> {
        let key = decode_address(address)
            .ok_or_else(|| anyhow::anyhow!("Invalid account address: {}", address))?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("ledger lock poisoned"))?;

        state.accounts.insert(
            key,
            AccountState {
                sequence,
                balance,
                ..Default::default()
            },
        );
        log::info!("Seeded account {} with {} stroops", address, balance);
        Ok(())
    }

    pub fn account(&self, address: &str) -> Option<AccountState> {
        let key = decode_address(address)?;
        let state = self.state.lock().ok()?;
        state.accounts.get(&key).cloned()
    }

    pub fn ledger_sequence(&self) -> u32 {
        self.state.lock().map(|state| state.ledger).unwrap_or(0)
    }

    /// Horizon view of an account
    pub fn account_response(&self, address: &str) -> Option<AccountResponse> {
        let account = self.account(address)?;

        let mut balances: Vec<BalanceResponse> = account
            .trustlines
            .iter()
            .map(|(key, line)| {
                let (code, issuer) = key.split_once(':').unwrap_or((key.as_str(), ""));
                BalanceResponse {
                    balance: format_stroops(0),
                    asset_type: if code.len() <= 4 {
                        "credit_alphanum4".to_string()
                    } else {
                        "credit_alphanum12".to_string()
                    },
                    asset_code: Some(code.to_string()),
                    asset_issuer: Some(issuer.to_string()),
                    limit: Some(format_stroops(line.limit)),
                }
            })
            .collect();
        balances.push(BalanceResponse {
            balance: format_stroops(account.balance),
            asset_type: "native".to_string(),
            asset_code: None,
            asset_issuer: None,
            limit: None,
        });

        let mut signers: Vec<SignerResponse> = account
            .signers
            .iter()
            .map(|(key, entry)| SignerResponse {
                key: encode_address(key),
                weight: entry.weight,
                signer_type: "ed25519_public_key".to_string(),
            })
            .collect();
        signers.push(SignerResponse {
            key: address.to_string(),
            weight: 1,
            signer_type: "ed25519_public_key".to_string(),
        });

        Some(AccountResponse {
            id: address.to_string(),
            account_id: address.to_string(),
            sequence: account.sequence.to_string(),
            subentry_count: account.subentry_count(),
            num_sponsoring: account.num_sponsoring,
            num_sponsored: account.num_sponsored,
            balances,
            signers,
        })
    }

    fn transaction_hash(&self, tx: &Transaction) -> Result<[u8; 32], SubmitError> {
        let payload = TransactionSignaturePayload {
            network_id: Hash(self.network_id),
            tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
        };
        let bytes = payload
            .to_xdr(Limits::none())
            .map_err(|e| SubmitError::Malformed(e.to_string()))?;
        Ok(Sha256::digest(&bytes).into())
    }

    /// Validate and apply a base64 transaction envelope
    ///
    /// Transactions that pass validation consume their sequence number and
    /// fee even when an operation fails; operation effects are all-or-nothing.
    pub fn submit(&self, envelope_xdr: &str) -> Result<Accepted, SubmitError> {
        let envelope = TransactionEnvelope::from_xdr_base64(envelope_xdr.trim(), Limits::none())
            .map_err(|e| SubmitError::Malformed(e.to_string()))?;
        let (tx, signatures) = match envelope {
            TransactionEnvelope::Tx(env) => (env.tx, env.signatures),
            _ => {
                return Err(SubmitError::Malformed(
                    "only v1 transaction envelopes are supported".to_string(),
                ))
            }
        };

        if tx.operations.is_empty() {
            return Err(rejected("tx_missing_operation"));
        }
        let fee = tx.fee as i64;
        if fee < BASE_FEE * tx.operations.len() as i64 {
            return Err(rejected("tx_insufficient_fee"));
        }
        check_time_bounds(&tx.cond)?;

        let hash = self.transaction_hash(&tx)?;
        let source = muxed_key(&tx.source_account);

        let mut state = self.state.lock().map_err(|_| SubmitError::Poisoned)?;

        let current = state
            .accounts
            .get(&source)
            .ok_or_else(|| rejected("tx_no_source_account"))?;
        if tx.seq_num.0 != current.sequence + 1 {
            log::warn!(
                "Bad sequence for {}: got {}, expected {}",
                encode_address(&source),
                tx.seq_num.0,
                current.sequence + 1
            );
            return Err(rejected("tx_bad_seq"));
        }
        if current.balance - fee < 0 {
            return Err(rejected("tx_insufficient_balance"));
        }

        let mut required = vec![source];
        for op in tx.operations.iter() {
            let op_source = op.source_account.as_ref().map(muxed_key).unwrap_or(source);
            if !required.contains(&op_source) {
                required.push(op_source);
            }
        }
        for account in &required {
            if !is_authorized(&state, account, &hash, &signatures) {
                log::warn!("Missing signature for {}", encode_address(account));
                return Err(rejected("tx_bad_auth"));
            }
        }

        // Sequence number and fee are consumed from here on
        let ledger = state.ledger + 1;
        state.ledger = ledger;
        if let Some(account) = state.accounts.get_mut(&source) {
            account.sequence = tx.seq_num.0;
            account.balance -= fee;
        }

        if !sponsorship_brackets_balanced(&tx, source) {
            return Err(rejected("tx_bad_sponsorship"));
        }

        let mut scratch = state.clone();
        match apply_operations(&mut scratch, &tx, source, ledger) {
            Ok(()) => {
                *state = scratch;
                let hash = hex::encode(hash);
                log::info!("Applied transaction {} in ledger {}", hash, ledger);
                Ok(Accepted { hash, ledger })
            }
            Err(operations) => Err(SubmitError::Rejected {
                code: "tx_failed".to_string(),
                operations,
            }),
        }
    }
}

fn check_time_bounds(cond: &Preconditions) -> Result<(), SubmitError> {
    let bounds = match cond {
        Preconditions::Time(bounds) => Some(bounds),
        Preconditions::V2(v2) => v2.time_bounds.as_ref(),
        Preconditions::None => None,
    };

    if let Some(bounds) = bounds {
        let now = unix_now();
        if bounds.min_time.0 > now {
            return Err(rejected("tx_too_early"));
        }
        if bounds.max_time.0 != 0 && now > bounds.max_time.0 {
            return Err(rejected("tx_too_late"));
        }
    }
    Ok(())
}

fn verify_signature(key: &AccountKey, hash: &[u8; 32], signature: &DecoratedSignature) -> bool {
    if signature.hint.0[..] != key[28..] {
        return false;
    }
    let Ok(verifying_key) = VerifyingKey::from_bytes(key) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(signature.signature.0.as_slice()) else {
        return false;
    };
    verifying_key.verify(hash, &sig).is_ok()
}

/// Master key or any signer with positive weight
fn is_authorized(
    state: &LedgerState,
    account: &AccountKey,
    hash: &[u8; 32],
    signatures: &[DecoratedSignature],
) -> bool {
    let mut keys = vec![*account];
    if let Some(entry) = state.accounts.get(account) {
        keys.extend(
            entry
                .signers
                .iter()
                .filter(|(_, signer)| signer.weight > 0)
                .map(|(key, _)| *key),
        );
    }

    keys.iter()
        .any(|key| signatures.iter().any(|sig| verify_signature(key, hash, sig)))
}

/// Every Begin must be closed by an End from the sponsored account
///
/// Mismatched Ends are left to the operation itself (`op_not_sponsored`).
fn sponsorship_brackets_balanced(tx: &Transaction, tx_source: AccountKey) -> bool {
    let mut open: Vec<AccountKey> = Vec::new();
    for op in tx.operations.iter() {
        let source = op.source_account.as_ref().map(muxed_key).unwrap_or(tx_source);
        match &op.body {
            OperationBody::BeginSponsoringFutureReserves(begin) => {
                open.push(account_id_key(&begin.sponsored_id));
            }
            OperationBody::EndSponsoringFutureReserves => {
                if let Some(index) = open.iter().position(|sponsored| *sponsored == source) {
                    open.remove(index);
                }
            }
            _ => {}
        }
    }
    open.is_empty()
}

fn apply_operations(
    state: &mut LedgerState,
    tx: &Transaction,
    tx_source: AccountKey,
    ledger: u32,
) -> Result<(), Vec<String>> {
    let mut sponsorships = Sponsorships::new();
    let mut codes = Vec::with_capacity(tx.operations.len());

    for op in tx.operations.iter() {
        let source = op.source_account.as_ref().map(muxed_key).unwrap_or(tx_source);
        match apply_operation(state, &mut sponsorships, source, &op.body, ledger) {
            Ok(()) => codes.push("op_success".to_string()),
            Err(code) => {
                codes.push(code.to_string());
                return Err(codes);
            }
        }
    }
    Ok(())
}

fn apply_operation(
    state: &mut LedgerState,
    sponsorships: &mut Sponsorships,
    source: AccountKey,
    body: &OperationBody,
    ledger: u32,
) -> Result<(), &'static str> {
    if !state.accounts.contains_key(&source) {
        return Err("op_no_account");
    }

    match body {
        OperationBody::CreateAccount(op) => create_account(state, sponsorships, source, op, ledger),
        OperationBody::ChangeTrust(op) => change_trust(state, sponsorships, source, op),
        OperationBody::SetOptions(op) => set_options(state, sponsorships, source, op),
        OperationBody::BeginSponsoringFutureReserves(op) => {
            let sponsored = account_id_key(&op.sponsored_id);
            if sponsored == source {
                return Err("op_malformed");
            }
            if sponsorships.contains_key(&sponsored) {
                return Err("op_already_sponsored");
            }
            if sponsorships.contains_key(&source) || sponsorships.values().any(|s| *s == sponsored) {
                return Err("op_recursive");
            }
            sponsorships.insert(sponsored, source);
            Ok(())
        }
        OperationBody::EndSponsoringFutureReserves => {
            if sponsorships.remove(&source).is_none() {
                return Err("op_not_sponsored");
            }
            Ok(())
        }
        _ => Err("op_not_supported"),
    }
}

/// Account `count` reserves of a new entry owned by `owner`
fn take_reserve(
    state: &mut LedgerState,
    sponsor: Option<AccountKey>,
    owner: AccountKey,
    count: u32,
) -> Result<(), &'static str> {
    match sponsor {
        Some(sponsor) => {
            let sponsoring = state.accounts.get_mut(&sponsor).ok_or("op_no_account")?;
            sponsoring.num_sponsoring += count;
            if sponsoring.balance < sponsoring.minimum_balance() {
                return Err("op_low_reserve");
            }
            if let Some(owned) = state.accounts.get_mut(&owner) {
                owned.num_sponsored += count;
            }
            Ok(())
        }
        None => {
            let owned = state.accounts.get(&owner).ok_or("op_no_account")?;
            if owned.balance < owned.minimum_balance() {
                return Err("op_low_reserve");
            }
            Ok(())
        }
    }
}

fn release_reserve(state: &mut LedgerState, sponsor: Option<AccountKey>, owner: AccountKey, count: u32) {
    if let Some(sponsor) = sponsor {
        if let Some(sponsoring) = state.accounts.get_mut(&sponsor) {
            sponsoring.num_sponsoring = sponsoring.num_sponsoring.saturating_sub(count);
        }
        if let Some(owned) = state.accounts.get_mut(&owner) {
            owned.num_sponsored = owned.num_sponsored.saturating_sub(count);
        }
    }
}

fn create_account(
    state: &mut LedgerState,
    sponsorships: &Sponsorships,
    source: AccountKey,
    op: &CreateAccountOp,
    ledger: u32,
) -> Result<(), &'static str> {
    let destination = account_id_key(&op.destination);
    if op.starting_balance < 0 {
        return Err("op_malformed");
    }
    if state.accounts.contains_key(&destination) {
        return Err("op_already_exists");
    }

    let sponsor = sponsorships.get(&destination).copied();
    if sponsor.is_none() && op.starting_balance < 2 * BASE_RESERVE {
        return Err("op_low_reserve");
    }

    let payer = state.accounts.get_mut(&source).ok_or("op_no_account")?;
    if payer.balance - op.starting_balance < payer.minimum_balance() {
        return Err("op_underfunded");
    }
    payer.balance -= op.starting_balance;

    state.accounts.insert(
        destination,
        AccountState {
            sequence: (ledger as i64) << 32,
            balance: op.starting_balance,
            ..Default::default()
        },
    );
    if sponsor.is_some() {
        take_reserve(state, sponsor, destination, 2)?;
    }
    Ok(())
}

fn change_trust(
    state: &mut LedgerState,
    sponsorships: &Sponsorships,
    source: AccountKey,
    op: &ChangeTrustOp,
) -> Result<(), &'static str> {
    let (key, issuer) = match &op.line {
        ChangeTrustAsset::CreditAlphanum4(asset) => {
            let issuer = account_id_key(&asset.issuer);
            (asset_key(&asset.asset_code.0, &issuer), issuer)
        }
        ChangeTrustAsset::CreditAlphanum12(asset) => {
            let issuer = account_id_key(&asset.issuer);
            (asset_key(&asset.asset_code.0, &issuer), issuer)
        }
        _ => return Err("op_malformed"),
    };
    if op.limit < 0 || issuer == source {
        return Err("op_malformed");
    }
    if !state.accounts.contains_key(&issuer) {
        return Err("op_no_issuer");
    }

    let owner = state.accounts.get_mut(&source).ok_or("op_no_account")?;
    if op.limit == 0 {
        let removed = owner.trustlines.remove(&key).ok_or("op_invalid_limit")?;
        release_reserve(state, removed.sponsor, source, 1);
        return Ok(());
    }
    if let Some(line) = owner.trustlines.get_mut(&key) {
        line.limit = op.limit;
        return Ok(());
    }

    let sponsor = sponsorships.get(&source).copied();
    owner.trustlines.insert(
        key,
        TrustLine {
            limit: op.limit,
            sponsor,
        },
    );
    take_reserve(state, sponsor, source, 1)
}

fn set_options(
    state: &mut LedgerState,
    sponsorships: &Sponsorships,
    source: AccountKey,
    op: &SetOptionsOp,
) -> Result<(), &'static str> {
    let Some(signer) = &op.signer else {
        return Ok(());
    };
    let key = match &signer.key {
        SignerKey::Ed25519(Uint256(key)) => *key,
        _ => return Err("op_bad_signer"),
    };
    if key == source || signer.weight > 255 {
        return Err("op_bad_signer");
    }

    let owner = state.accounts.get_mut(&source).ok_or("op_no_account")?;
    if signer.weight == 0 {
        if let Some(removed) = owner.signers.remove(&key) {
            release_reserve(state, removed.sponsor, source, 1);
        }
        return Ok(());
    }
    if let Some(existing) = owner.signers.get_mut(&key) {
        existing.weight = signer.weight;
        return Ok(());
    }

    let sponsor = sponsorships.get(&source).copied();
    owner.signers.insert(
        key,
        SignerEntry {
            weight: signer.weight,
            sponsor,
        },
    );
    take_reserve(state, sponsor, source, 1)
}
