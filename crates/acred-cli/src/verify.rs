//! `acred verify`: itemized verification of a hash or credential document.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use acred_verify::{VerificationInput, Verifier};

use crate::context::AppContext;
use crate::print_json;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Content hash (64 lowercase hex characters) or inline credential JSON.
    #[arg(required_unless_present = "document", conflicts_with = "document")]
    pub input: Option<String>,

    /// Credential document file.
    #[arg(long)]
    pub document: Option<PathBuf>,

    /// Who is asking. Requests with a requester leave an audit record.
    #[arg(long)]
    pub requester: Option<String>,
}

/// Exit code 0 when the credential is valid, 2 when it is not.
pub async fn run_verify(args: &VerifyArgs, ctx: &AppContext) -> Result<u8> {
    let raw = match (&args.input, &args.document) {
        (Some(input), _) => input.clone(),
        (None, Some(path)) => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
        }
        (None, None) => anyhow::bail!("a hash or --document is required"),
    };
    let input = VerificationInput::parse(&raw)?;

    let report = Verifier::new(ctx.service.clone())
        .verify(&input, args.requester.as_deref())
        .await;
    print_json(&report)?;
    Ok(if report.overall_valid { 0 } else { 2 })
}
