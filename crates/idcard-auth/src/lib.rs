//! Signature authorization protocol.
//!
//! Two halves live here. The verifying half rebuilds the personal-message
//! hash of an authorization digest and recovers the signer from a 65-byte
//! signature; the ledger compares the recovered address against its
//! configured authorizer. The issuing half (`AuthorizationIssuer`) reads
//! the chain state a signature must commit to and asks the account service
//! to sign it.

pub mod issuer;
pub mod signature;

pub use issuer::{AuthorizationIssuer, IssueError};
pub use signature::{personal_message_hash, recover_signer, verify_authorization, AuthError};
