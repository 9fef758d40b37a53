//! Wallet Flow Integration Tests
//!
//! Builds, signs and submits account, trustline and signer transactions
//! against the in-memory Horizon mock.
//!
//! These tests are self-contained and do not require a Stellar network.
//!
//! Run with: cargo test --test wallet_flow_test -- --nocapture

mod common;

use common::{sign, TestEnvironment, START_BALANCE};
use std::time::Duration;
use stellar_xdr::curr::{
    Memo, SequenceNumber, TransactionEnvelope, TransactionV0, TransactionV0Envelope,
    TransactionV0Ext, Uint256,
};
use stellar_wallet::{
    assemble_transaction, Address, Amount, Asset, LedgerClient, Network, Operation,
    OperationBody, SignedTransaction, Sponsorship, TransactionOptions, WalletError, BASE_FEE,
};

// ============================================================================
// Account creation
// ============================================================================

#[test]
fn test_fund_account_end_to_end() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let source = env.funded_account(1, 41)?;
    let destination = env.wallet.create();

    let tx = env
        .wallet
        .fund(&source.public_key, &destination.public_key, "5", Sponsorship::Unsponsored)?;

    assert_eq!(tx.sequence(), 42);
    assert_eq!(tx.operations().len(), 1);
    assert_eq!(tx.network(), &env.network);
    assert_eq!(tx.fee(), BASE_FEE);

    let signed = sign(&tx, &[&source])?;
    let response = env.wallet.submit_transaction(&signed)?;
    log::info!("Submitted {} in ledger {}", response.hash, response.ledger);

    assert!(response.successful);
    assert_eq!(response.hash, tx.hash_hex()?);
    assert_eq!(env.sequence_of(&source), Some(42));

    let created = env
        .ledger
        .account(destination.public_key.as_str())
        .expect("destination account exists");
    assert_eq!(created.balance, 50_000_000);
    assert_eq!(
        env.ledger.account(source.public_key.as_str()).unwrap().balance,
        START_BALANCE - 50_000_000 - BASE_FEE as i64
    );
    Ok(())
}

#[test]
fn test_fund_below_minimum_is_rejected_locally() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let source = env.funded_account(1, 10)?;
    let destination = env.wallet.create();

    let err = env
        .wallet
        .fund(&source.public_key, &destination.public_key, "0.5", Sponsorship::Unsponsored)
        .unwrap_err();

    assert!(matches!(err, WalletError::InvalidAmount(_)));
    assert!(err.is_preflight());
    Ok(())
}

#[test]
fn test_unknown_source_account() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let stranger = env.wallet.create();
    let destination = env.wallet.create();

    let err = env
        .wallet
        .fund(&stranger.public_key, &destination.public_key, "2", Sponsorship::Unsponsored)
        .unwrap_err();

    assert!(matches!(err, WalletError::AccountNotFound(ref a) if a == stranger.public_key.as_str()));
    Ok(())
}

#[test]
fn test_sponsored_fund_builds_zero_balance_bracket() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let source = env.funded_account(1, 3)?;
    let sponsor = env.funded_account(2, 0)?;
    let destination = env.wallet.create();

    let tx = env.wallet.fund(
        &source.public_key,
        &destination.public_key,
        "25",
        Sponsorship::sponsored_by(sponsor.public_key.clone()),
    )?;

    let ops = tx.operations();
    assert_eq!(ops.len(), 3);
    assert_eq!(ops[0].source.as_ref(), Some(&sponsor.public_key));
    assert_eq!(
        ops[1].body,
        OperationBody::CreateAccount {
            destination: destination.public_key.clone(),
            starting_balance: Amount::ZERO,
        }
    );
    assert_eq!(ops[2].source.as_ref(), Some(&destination.public_key));
    assert_eq!(tx.sequence(), 4);
    assert_eq!(tx.fee(), 3 * BASE_FEE);
    Ok(())
}

// ============================================================================
// Submission failures
// ============================================================================

#[test]
fn test_stale_sequence_is_reported_not_retried() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let source = env.funded_account(1, 100)?;

    let first = env
        .wallet
        .fund(&source.public_key, &env.wallet.create().public_key, "2", Sponsorship::Unsponsored)?;
    let second = env
        .wallet
        .fund(&source.public_key, &env.wallet.create().public_key, "2", Sponsorship::Unsponsored)?;
    // Both were built against the same on-ledger sequence
    assert_eq!(first.sequence(), second.sequence());

    env.wallet.submit_transaction(&sign(&first, &[&source])?)?;
    let err = env
        .wallet
        .submit_transaction(&sign(&second, &[&source])?)
        .unwrap_err();

    assert_eq!(err.result_code(), Some("tx_bad_seq"));
    assert!(err.is_network_side());
    assert_eq!(env.sequence_of(&source), Some(101));

    // Rebuilding picks up the new sequence
    let rebuilt = env
        .wallet
        .fund(&source.public_key, &env.wallet.create().public_key, "2", Sponsorship::Unsponsored)?;
    assert_eq!(rebuilt.sequence(), 102);
    env.wallet.submit_transaction(&sign(&rebuilt, &[&source])?)?;
    Ok(())
}

#[test]
fn test_missing_signature_is_bad_auth() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let source = env.funded_account(1, 0)?;
    let other = env.funded_account(2, 0)?;

    let tx = env
        .wallet
        .fund(&source.public_key, &env.wallet.create().public_key, "2", Sponsorship::Unsponsored)?;

    let err = env
        .wallet
        .submit_transaction(&sign(&tx, &[&other])?)
        .unwrap_err();

    match err {
        WalletError::SubmissionRejected { result_code, .. } => {
            assert_eq!(result_code, "tx_bad_auth")
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(env.sequence_of(&source), Some(0));
    Ok(())
}

#[test]
fn test_network_mismatch_fails_deterministically() -> anyhow::Result<()> {
    // Wallet believes it talks to the public network; the endpoint is testnet
    let env = TestEnvironment::with_config(|mut config| {
        config.network = Network::public();
        config
    })?;
    let source = env.funded_account(1, 0)?;

    let tx = env
        .wallet
        .fund(&source.public_key, &env.wallet.create().public_key, "2", Sponsorship::Unsponsored)?;
    assert_eq!(tx.network(), &Network::public());

    for _ in 0..2 {
        let err = env
            .wallet
            .submit_transaction(&sign(&tx, &[&source])?)
            .unwrap_err();
        assert_eq!(err.result_code(), Some("tx_bad_auth"));
    }
    Ok(())
}

#[test]
fn test_operation_failure_surfaces_operation_codes() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let source = env.funded_account(1, 0)?;
    let existing = env.funded_account(2, 0)?;

    let tx = env
        .wallet
        .fund(&source.public_key, &existing.public_key, "2", Sponsorship::Unsponsored)?;
    let err = env
        .wallet
        .submit_transaction(&sign(&tx, &[&source])?)
        .unwrap_err();

    match err {
        WalletError::SubmissionRejected {
            result_code,
            operation_codes,
        } => {
            assert_eq!(result_code, "tx_failed");
            assert_eq!(operation_codes, vec!["op_already_exists".to_string()]);
        }
        other => panic!("unexpected error {:?}", other),
    }
    // A failed transaction still consumes its sequence number
    assert_eq!(env.sequence_of(&source), Some(1));
    Ok(())
}

#[test]
fn test_unbalanced_sponsorship_is_rejected() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let sponsor = env.funded_account(1, 0)?;
    let sponsored = env.funded_account(2, 0)?;

    let begin_only = vec![Operation::new(OperationBody::BeginSponsoringFutureReserves {
        sponsored_id: sponsored.public_key.clone(),
    })];
    let tx = assemble_transaction(
        env.wallet.client(),
        env.wallet.network(),
        &sponsor.public_key,
        begin_only,
        &TransactionOptions::default(),
    )?;

    let err = env
        .wallet
        .submit_transaction(&sign(&tx, &[&sponsor])?)
        .unwrap_err();
    assert_eq!(err.result_code(), Some("tx_bad_sponsorship"));
    Ok(())
}

#[test]
fn test_unclosed_bracket_wins_over_failing_operation() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let sponsor = env.funded_account(1, 0)?;
    let holder = env.funded_account(2, 0)?;
    // Issuer never created on the ledger
    let asset = Asset::new("USDC", env.wallet.create().public_key);

    let operations = vec![
        Operation::new(OperationBody::BeginSponsoringFutureReserves {
            sponsored_id: holder.public_key.clone(),
        }),
        Operation::new(OperationBody::ChangeTrust {
            asset,
            limit: Amount::parse("100")?,
        })
        .with_source(holder.public_key.clone()),
    ];
    let tx = assemble_transaction(
        env.wallet.client(),
        env.wallet.network(),
        &sponsor.public_key,
        operations,
        &TransactionOptions::default(),
    )?;

    let err = env
        .wallet
        .submit_transaction(&sign(&tx, &[&sponsor, &holder])?)
        .unwrap_err();
    match err {
        WalletError::SubmissionRejected {
            result_code,
            operation_codes,
        } => {
            assert_eq!(result_code, "tx_bad_sponsorship");
            assert!(operation_codes.is_empty());
        }
        other => panic!("unexpected error {:?}", other),
    }
    Ok(())
}

#[test]
fn test_sponsored_fund_is_rejected_for_missing_inner_source() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let source = env.funded_account(1, 0)?;
    let sponsor = env.funded_account(2, 0)?;
    let destination = env.wallet.create();

    let tx = env.wallet.fund(
        &source.public_key,
        &destination.public_key,
        "0",
        Sponsorship::sponsored_by(sponsor.public_key.clone()),
    )?;

    // The create runs as the not-yet-existing destination
    let err = env
        .wallet
        .submit_transaction(&sign(&tx, &[&source, &sponsor, &destination])?)
        .unwrap_err();
    match err {
        WalletError::SubmissionRejected {
            result_code,
            operation_codes,
        } => {
            assert_eq!(result_code, "tx_failed");
            assert_eq!(
                operation_codes,
                vec!["op_success".to_string(), "op_no_account".to_string()]
            );
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(env.ledger.account(destination.public_key.as_str()).is_none());
    Ok(())
}

#[test]
fn test_non_v1_envelope_is_horizon_error() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let source = env.funded_account(1, 0)?;

    let envelope = TransactionEnvelope::TxV0(TransactionV0Envelope {
        tx: TransactionV0 {
            source_account_ed25519: Uint256(source.public_key.public_key_bytes()?),
            fee: 100,
            seq_num: SequenceNumber(1),
            time_bounds: None,
            memo: Memo::None,
            operations: Default::default(),
            ext: TransactionV0Ext::V0,
        },
        signatures: Default::default(),
    });
    let signed = SignedTransaction::from_envelope(envelope)?;

    let err = env.wallet.submit_transaction(&signed).unwrap_err();
    assert!(
        matches!(err, WalletError::Horizon { status: 400, .. }),
        "unexpected error {:?}",
        err
    );
    assert_eq!(err.result_code(), None);
    assert_eq!(env.sequence_of(&source), Some(0));
    Ok(())
}

// ============================================================================
// Trustlines
// ============================================================================

#[test]
fn test_add_and_remove_asset_support() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let issuer = env.funded_account(1, 0)?;
    let holder = env.funded_account(2, 0)?;
    let asset = Asset::new("USDC", issuer.public_key.clone());

    let add = env
        .wallet
        .add_asset_support(&holder.public_key, &asset, None, Sponsorship::Unsponsored)?;
    env.wallet.submit_transaction(&sign(&add, &[&holder])?)?;

    let account = env.ledger.account(holder.public_key.as_str()).unwrap();
    let key = format!("USDC:{}", issuer.public_key);
    assert_eq!(account.trustlines.get(&key).map(|l| l.limit), Some(i64::MAX));

    let remove = env.wallet.remove_asset_support(&holder.public_key, &asset)?;
    env.wallet.submit_transaction(&sign(&remove, &[&holder])?)?;

    let account = env.ledger.account(holder.public_key.as_str()).unwrap();
    assert!(account.trustlines.is_empty());
    Ok(())
}

#[test]
fn test_removing_absent_trustline_is_left_to_the_network() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let issuer = env.funded_account(1, 0)?;
    let holder = env.funded_account(2, 0)?;
    let asset = Asset::new("EURT", issuer.public_key.clone());

    // Builds fine locally
    let remove = env.wallet.remove_asset_support(&holder.public_key, &asset)?;
    let err = env
        .wallet
        .submit_transaction(&sign(&remove, &[&holder])?)
        .unwrap_err();
    assert_eq!(err.result_code(), Some("tx_failed"));
    Ok(())
}

#[test]
fn test_sponsored_trustline_waives_holder_reserve() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let issuer = env.funded_account(1, 0)?;
    let sponsor = env.funded_account(2, 0)?;
    // Exactly the base account reserve plus a little for fees
    let holder = env.account_with_balance(3, 10_000_000 + 1_000, 0)?;
    let asset = Asset::new("USDC", issuer.public_key.clone());

    let unsponsored = env
        .wallet
        .add_asset_support(&holder.public_key, &asset, Some("1000"), Sponsorship::Unsponsored)?;
    let err = env
        .wallet
        .submit_transaction(&sign(&unsponsored, &[&holder])?)
        .unwrap_err();
    match err {
        WalletError::SubmissionRejected {
            operation_codes, ..
        } => assert_eq!(operation_codes, vec!["op_low_reserve".to_string()]),
        other => panic!("unexpected error {:?}", other),
    }

    let sponsored = env.wallet.add_asset_support(
        &holder.public_key,
        &asset,
        Some("1000"),
        Sponsorship::sponsored_by(sponsor.public_key.clone()),
    )?;
    assert_eq!(sponsored.operations().len(), 3);
    env.wallet
        .submit_transaction(&sign(&sponsored, &[&holder, &sponsor])?)?;

    let holder_state = env.ledger.account(holder.public_key.as_str()).unwrap();
    let sponsor_state = env.ledger.account(sponsor.public_key.as_str()).unwrap();
    assert_eq!(holder_state.trustlines.len(), 1);
    assert_eq!(holder_state.num_sponsored, 1);
    assert_eq!(sponsor_state.num_sponsoring, 1);
    Ok(())
}

#[test]
fn test_sponsored_trustline_needs_sponsor_signature() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let issuer = env.funded_account(1, 0)?;
    let sponsor = env.funded_account(2, 0)?;
    let holder = env.funded_account(3, 0)?;
    let asset = Asset::new("USDC", issuer.public_key.clone());

    let tx = env.wallet.add_asset_support(
        &holder.public_key,
        &asset,
        None,
        Sponsorship::sponsored_by(sponsor.public_key.clone()),
    )?;
    let err = env
        .wallet
        .submit_transaction(&sign(&tx, &[&holder])?)
        .unwrap_err();
    assert_eq!(err.result_code(), Some("tx_bad_auth"));
    Ok(())
}

// ============================================================================
// Signers
// ============================================================================

#[test]
fn test_add_and_remove_account_signer() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let account = env.funded_account(1, 0)?;
    let cosigner = env.wallet.create();

    let add = env
        .wallet
        .add_account_signer(&account.public_key, &cosigner.public_key, 10, Sponsorship::Unsponsored)?;
    env.wallet.submit_transaction(&sign(&add, &[&account])?)?;

    let state = env.ledger.account(account.public_key.as_str()).unwrap();
    assert_eq!(state.signers.len(), 1);
    assert_eq!(state.signers.values().next().map(|s| s.weight), Some(10));

    // The new signer alone can now authorize
    let remove = env
        .wallet
        .remove_account_signer(&account.public_key, &cosigner.public_key)?;
    env.wallet.submit_transaction(&sign(&remove, &[&cosigner])?)?;

    let state = env.ledger.account(account.public_key.as_str()).unwrap();
    assert!(state.signers.is_empty());
    Ok(())
}

#[test]
fn test_sponsored_signer() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let account = env.funded_account(1, 0)?;
    let sponsor = env.funded_account(2, 0)?;
    let cosigner = env.wallet.create();

    let tx = env.wallet.add_account_signer(
        &account.public_key,
        &cosigner.public_key,
        1,
        Sponsorship::sponsored_by(sponsor.public_key.clone()),
    )?;
    env.wallet
        .submit_transaction(&sign(&tx, &[&account, &sponsor])?)?;

    assert_eq!(
        env.ledger.account(sponsor.public_key.as_str()).unwrap().num_sponsoring,
        1
    );

    // Removing the signer releases the sponsor's reserve
    let remove = env
        .wallet
        .remove_account_signer(&account.public_key, &cosigner.public_key)?;
    env.wallet.submit_transaction(&sign(&remove, &[&account])?)?;
    assert_eq!(
        env.ledger.account(sponsor.public_key.as_str()).unwrap().num_sponsoring,
        0
    );
    Ok(())
}

#[test]
fn test_signer_weight_range_is_enforced_by_network() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let account = env.funded_account(1, 0)?;
    let cosigner = env.wallet.create();

    let tx = env
        .wallet
        .add_account_signer(&account.public_key, &cosigner.public_key, 300, Sponsorship::Unsponsored)?;
    let err = env
        .wallet
        .submit_transaction(&sign(&tx, &[&account])?)
        .unwrap_err();
    assert_eq!(err.result_code(), Some("tx_failed"));
    Ok(())
}

// ============================================================================
// Envelopes and options
// ============================================================================

#[test]
fn test_submit_externally_signed_envelope() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let source = env.funded_account(1, 7)?;

    let tx = env
        .wallet
        .fund(&source.public_key, &env.wallet.create().public_key, "1", Sponsorship::Unsponsored)?;
    let xdr = sign(&tx, &[&source])?.envelope_xdr().to_string();

    let restored = SignedTransaction::from_envelope_xdr(&xdr)?;
    assert_eq!(restored.signature_count(), 1);
    assert_eq!(restored.hash(&env.network)?, tx.hash()?);

    env.wallet.submit_transaction(&restored)?;
    assert_eq!(env.sequence_of(&source), Some(8));
    Ok(())
}

#[test]
fn test_transaction_timeout_is_accepted() -> anyhow::Result<()> {
    let env = TestEnvironment::with_config(|config| config.with_timeout(Duration::from_secs(60)))?;
    let source = env.funded_account(1, 0)?;

    let tx = env
        .wallet
        .fund(&source.public_key, &env.wallet.create().public_key, "3", Sponsorship::Unsponsored)?;
    assert!(tx.time_bounds().is_some());

    env.wallet.submit_transaction(&sign(&tx, &[&source])?)?;
    Ok(())
}

#[test]
fn test_unsigned_envelope_is_bad_auth() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let source = env.funded_account(1, 0)?;

    let tx = env
        .wallet
        .fund(&source.public_key, &env.wallet.create().public_key, "1", Sponsorship::Unsponsored)?;
    let unsigned = SignedTransaction::from_envelope_xdr(&tx.to_envelope_xdr()?)?;
    assert_eq!(unsigned.signature_count(), 0);

    let err = env.wallet.submit_transaction(&unsigned).unwrap_err();
    assert_eq!(err.result_code(), Some("tx_bad_auth"));
    assert_eq!(env.sequence_of(&source), Some(0));
    Ok(())
}

#[test]
fn test_garbage_input_is_rejected() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;

    // Truncated envelope
    let err = SignedTransaction::from_envelope_xdr("AAAA").unwrap_err();
    assert!(matches!(err, WalletError::InvalidTransaction(_)));

    let account = Address::new("GBOGUS");
    assert!(matches!(
        env.wallet.client().account_sequence(&account),
        Err(WalletError::AccountNotFound(_))
    ));
    Ok(())
}
