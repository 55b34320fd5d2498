//! TLS peer-identity verification.
//!
//! Chain validation (signatures, expiry, trust anchors) is delegated to
//! rustls/webpki; this crate only answers the question the chain check
//! does not: does the leaf certificate name the server we meant to dial?
//! The identity algorithm itself is a pure function over a capability
//! trait, so it stays independent of the X.509 parsing back-end.

pub mod identity;
pub mod verifier;
mod x509;

pub use identity::{PeerIdentity, verify_peer};
pub use verifier::{IdentityVerifier, TlsSetupError, build_tls_config};
pub use x509::X509Peer;
