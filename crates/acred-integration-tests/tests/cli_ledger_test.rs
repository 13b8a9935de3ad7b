//! The CLI context on the in-memory network: ledger state written by one
//! run is visible to the next.

use std::path::Path;

use acred_cli::context::{finish, load_ledger, AppContext, GlobalOpts, NetworkArg};
use acred_core::Did;
use acred_crypto::PrivateKey;
use acred_ledger::{LedgerStore, RegistrationStatus, TaskStatus};
use acred_verify::{VerificationInput, Verifier};

fn opts(ledger: &Path) -> GlobalOpts {
    GlobalOpts {
        network: Some(NetworkArg::Memory),
        config: None,
        ledger: Some(ledger.to_path_buf()),
        retry_delay_secs: 0,
    }
}

#[tokio::test]
async fn registration_survives_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let did = Did::generate();

    {
        let ctx = AppContext::build(&opts(&path)).unwrap();
        let (workflow, pool) = ctx.workflow();
        workflow
            .register_issuer(&did, &PrivateKey::generate().public_key(), true)
            .await
            .unwrap();
        finish(workflow, pool).await;
        ctx.save().unwrap();
    }

    let ledger = load_ledger(&path).unwrap();
    let registration = ledger.get_registration(&did).unwrap();
    assert_eq!(registration.status, RegistrationStatus::Submitted);
    assert!(registration.registration_tx.is_some());

    let tasks = ledger.list_tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Succeeded);
    assert_eq!(ledger.pending_transactions().len(), 1);
}

#[tokio::test]
async fn verification_audit_is_appended_to_the_saved_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let hash = "ab".repeat(32);

    for requester in ["first", "second"] {
        let ctx = AppContext::build(&opts(&path)).unwrap();
        let input = VerificationInput::parse(&hash).unwrap();
        let report = Verifier::new(ctx.service.clone())
            .verify(&input, Some(requester))
            .await;
        // A fresh in-memory chain has anchored nothing.
        assert!(!report.overall_valid);
        ctx.save().unwrap();
    }

    let requesters: Vec<String> = load_ledger(&path)
        .unwrap()
        .list_verifications()
        .into_iter()
        .map(|v| v.requester)
        .collect();
    assert_eq!(requesters.len(), 2);
    assert!(requesters.contains(&"first".to_string()));
    assert!(requesters.contains(&"second".to_string()));
}
