//! # Offline Key and Document Commands
//!
//! - `acred keygen` — new secp256k1 key pair with a `did:authenticred` DID.
//! - `acred sign` — attach an `EcdsaSecp256k1Signature2019` proof.
//! - `acred hash` — content hash of a credential (proof excluded).
//! - `acred verify-signature` — check a proof against a public key.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{json, Value};

use acred_core::Did;
use acred_crypto::{PrivateKey, PublicKey};
use acred_vc::CredentialDocument;

use crate::context::read_private_key;
use crate::print_json;

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Directory for `<name>.key` and `<name>.pub`. Without it the private
    /// key is printed.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    #[arg(long, default_value = "issuer")]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Unsigned credential JSON.
    #[arg(long)]
    pub document: PathBuf,

    /// Issuer private key file (hex or base64).
    #[arg(long)]
    pub key_file: PathBuf,

    /// Write the signed document here instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct HashArgs {
    #[arg(long)]
    pub document: PathBuf,
}

#[derive(Args, Debug)]
pub struct VerifySignatureArgs {
    #[arg(long)]
    pub document: PathBuf,

    /// Compressed public key, hex or base64.
    #[arg(long)]
    pub public_key: String,
}

pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let key = PrivateKey::generate();
    let public_key = key.public_key();
    let did = Did::generate();
    let mut summary = json!({
        "did": did,
        "public_key": public_key.to_hex(),
        "address": key.account_address_hex(),
    });

    match &args.out {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
            let key_path = dir.join(format!("{}.key", args.name));
            let pub_path = dir.join(format!("{}.pub", args.name));
            std::fs::write(&key_path, key.to_hex().as_bytes())
                .with_context(|| format!("failed to write private key: {}", key_path.display()))?;
            std::fs::write(&pub_path, public_key.to_hex())
                .with_context(|| format!("failed to write public key: {}", pub_path.display()))?;
            summary["private_key_file"] = json!(key_path.display().to_string());
        }
        None => {
            summary["private_key"] = json!(key.to_hex().as_str());
        }
    }
    print_json(&summary)?;
    Ok(0)
}

pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let mut document = read_document(&args.document)?;
    let key = read_private_key(&args.key_file)?;
    let hash = document.sign(&key, None).context("signing failed")?;
    let signed = document.to_value()?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, serde_json::to_vec_pretty(&signed)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), content_hash = %hash, "signed credential written");
            println!("{hash}");
        }
        None => print_json(&signed)?,
    }
    Ok(0)
}

pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let document = read_document(&args.document)?;
    println!("{}", document.content_hash()?);
    Ok(0)
}

/// Exit code 0 when the signature verifies, 2 when it does not.
pub fn run_verify_signature(args: &VerifySignatureArgs) -> Result<u8> {
    let document = read_document(&args.document)?;
    let public_key = PublicKey::parse(&args.public_key).context("invalid public key")?;
    let valid = document.verify_signature(&public_key);
    println!("{}", if valid { "valid" } else { "invalid" });
    Ok(if valid { 0 } else { 2 })
}

pub fn read_document(path: &Path) -> Result<CredentialDocument> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw).with_context(|| format!("{} is not JSON", path.display()))?;
    CredentialDocument::from_value(value).with_context(|| format!("{} is not a credential", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use acred_core::Timestamp;

    fn write_unsigned(dir: &Path) -> PathBuf {
        let doc = CredentialDocument::new(
            "urn:cred:1",
            "DegreeCredential",
            Did::new("did:authenticred:uni").unwrap(),
            &Did::new("did:authenticred:bob").unwrap(),
            json!({"degree": "BSc"}).as_object().cloned().unwrap(),
            Timestamp::parse("2024-01-01T00:00:00Z").unwrap(),
            None,
        )
        .unwrap();
        let path = dir.join("unsigned.json");
        std::fs::write(&path, serde_json::to_vec(&doc.to_value().unwrap()).unwrap()).unwrap();
        path
    }

    #[test]
    fn keygen_writes_key_files() {
        let dir = tempfile::tempdir().unwrap();
        run_keygen(&KeygenArgs {
            out: Some(dir.path().to_path_buf()),
            name: "uni".into(),
        })
        .unwrap();
        let key = read_private_key(&dir.path().join("uni.key")).unwrap();
        let public = std::fs::read_to_string(dir.path().join("uni.pub")).unwrap();
        assert_eq!(key.public_key().to_hex(), public);
    }

    #[test]
    fn sign_then_verify_signature() {
        let dir = tempfile::tempdir().unwrap();
        let unsigned = write_unsigned(dir.path());
        let key = PrivateKey::generate();
        let key_file = dir.path().join("issuer.key");
        std::fs::write(&key_file, key.to_hex().as_bytes()).unwrap();
        let signed = dir.path().join("signed.json");

        run_sign(&SignArgs {
            document: unsigned.clone(),
            key_file,
            out: Some(signed.clone()),
        })
        .unwrap();

        // Signing does not change the content hash.
        assert_eq!(
            read_document(&signed).unwrap().content_hash().unwrap(),
            read_document(&unsigned).unwrap().content_hash().unwrap()
        );

        let good = VerifySignatureArgs {
            document: signed.clone(),
            public_key: key.public_key().to_hex(),
        };
        assert_eq!(run_verify_signature(&good).unwrap(), 0);
        let other = VerifySignatureArgs {
            document: signed,
            public_key: PrivateKey::generate().public_key().to_hex(),
        };
        assert_eq!(run_verify_signature(&other).unwrap(), 2);
    }

    #[test]
    fn non_credential_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.json");
        std::fs::write(&path, br#"{"hello": "world"}"#).unwrap();
        assert!(read_document(&path).is_err());
    }
}
