//! Aggregate verdict rules.

use acred_ledger::{CheckOutcome, VerificationChecks, VerificationPath};

/// How an undecidable revocation check counts in the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationPolicy {
    /// Only a definite "revoked" fails the credential.
    FailOpen,
    /// Anything but a definite "not revoked" fails the credential.
    FailClosed,
}

impl RevocationPolicy {
    pub fn passes(&self, revoked: CheckOutcome) -> bool {
        match self {
            Self::FailOpen => !revoked.is_yes(),
            Self::FailClosed => revoked.is_no(),
        }
    }
}

/// Revocation policy applied by [`crate::Verifier`].
pub const REVOCATION_POLICY: RevocationPolicy = RevocationPolicy::FailOpen;

/// Combine itemized checks into the overall verdict.
///
/// The external path can only check anchoring, so that alone decides it.
pub fn overall_valid(path: VerificationPath, checks: &VerificationChecks, revocation: RevocationPolicy) -> bool {
    match path {
        VerificationPath::External => checks.anchored,
        VerificationPath::Internal => {
            checks.signature_valid
                && checks.anchored
                && revocation.passes(checks.revoked)
                && checks.issuer_trusted.is_yes()
                && !checks.expired
                && checks.issued.is_yes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn passing() -> VerificationChecks {
        VerificationChecks {
            signature_valid: true,
            anchored: true,
            issuer_trusted: CheckOutcome::Yes,
            revoked: CheckOutcome::No,
            expired: false,
            issued: CheckOutcome::Yes,
        }
    }

    fn outcome() -> impl Strategy<Value = CheckOutcome> {
        prop_oneof![Just(CheckOutcome::Yes), Just(CheckOutcome::No), Just(CheckOutcome::Indeterminate)]
    }

    #[test]
    fn all_passing_is_valid() {
        assert!(overall_valid(VerificationPath::Internal, &passing(), REVOCATION_POLICY));
    }

    #[test]
    fn indeterminate_revocation_fails_open() {
        let checks = VerificationChecks {
            revoked: CheckOutcome::Indeterminate,
            ..passing()
        };
        assert!(overall_valid(VerificationPath::Internal, &checks, RevocationPolicy::FailOpen));
        assert!(!overall_valid(VerificationPath::Internal, &checks, RevocationPolicy::FailClosed));
    }

    #[test]
    fn each_failing_check_invalidates() {
        let cases = [
            VerificationChecks { signature_valid: false, ..passing() },
            VerificationChecks { anchored: false, ..passing() },
            VerificationChecks { issuer_trusted: CheckOutcome::Indeterminate, ..passing() },
            VerificationChecks { revoked: CheckOutcome::Yes, ..passing() },
            VerificationChecks { expired: true, ..passing() },
            VerificationChecks { issued: CheckOutcome::No, ..passing() },
        ];
        for checks in cases {
            assert!(!overall_valid(VerificationPath::Internal, &checks, REVOCATION_POLICY), "{checks:?}");
        }
    }

    proptest! {
        #[test]
        fn external_verdict_is_anchoring(
            signature_valid in any::<bool>(),
            anchored in any::<bool>(),
            expired in any::<bool>(),
            trusted in outcome(),
            revoked in outcome(),
            issued in outcome(),
        ) {
            let checks = VerificationChecks { signature_valid, anchored, issuer_trusted: trusted, revoked, expired, issued };
            prop_assert_eq!(overall_valid(VerificationPath::External, &checks, REVOCATION_POLICY), anchored);
        }
    }
}
