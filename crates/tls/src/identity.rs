//! Hostname identity checks against certificate SAN/CN fields.
//!
//! The checks operate on raw attribute bytes rather than parsed strings so
//! the declared ASN.1 length can be compared against the embedded C-string
//! length. A mismatch means an embedded NUL — the classic trick where
//! `victim.com\0attacker.com` carries a signed name that naive C consumers
//! truncate at the NUL — and is always treated as untrusted.

/// Capability view of a peer certificate.
///
/// Abstracts the X.509 parser so [`verify_peer`] is reusable across crypto
/// back-ends. Implementations return `None` when a field is absent or
/// malformed; they must not panic on attacker-controlled input.
pub trait PeerIdentity {
    /// Raw bytes of every DNS-type subject-alternative-name entry, at their
    /// declared lengths. `None` if the extension is absent or malformed.
    fn san_dns_entries(&self) -> Option<Vec<&[u8]>>;

    /// Raw bytes of the most recent Common Name attribute in the subject
    /// distinguished name, if any.
    fn common_name(&self) -> Option<&[u8]>;
}

/// Decides whether a peer certificate proves the identity `hostname`.
///
/// Mirrors the shape of an OpenSSL verify callback:
///
/// * `depth != 0` — the call concerns an intermediate/root certificate;
///   identity binding is only checked on the leaf, so the incoming chain
///   verdict passes through unchanged.
/// * `depth == 0` with a failed chain — never overridden.
/// * `depth == 0` with a valid chain — trust iff the SAN check or, failing
///   that, the CN check matches `hostname`.
///
/// Pure and infallible: malformed certificate data degrades to "no match".
pub fn verify_peer(
    hostname: &str,
    chain_is_valid: bool,
    depth: usize,
    cert: &dyn PeerIdentity,
) -> bool {
    if depth != 0 {
        return chain_is_valid;
    }
    if !chain_is_valid {
        return false;
    }
    matches_subject_alternative_name(hostname, cert) || matches_common_name(hostname, cert)
}

/// Scans the SAN extension's DNS entries for a match.
///
/// A length mismatch on any entry aborts the whole scan as untrusted,
/// discarding earlier tentative matches. An absent extension is simply
/// "no match".
fn matches_subject_alternative_name(hostname: &str, cert: &dyn PeerIdentity) -> bool {
    let Some(entries) = cert.san_dns_entries() else {
        return false;
    };

    let mut matched = false;
    for entry in entries {
        if embedded_nul(entry) {
            return false;
        }
        if name_matches(hostname, entry) {
            matched = true;
        }
    }
    matched
}

/// Compares the most recent subject Common Name against the hostname,
/// with the same embedded-NUL rejection as the SAN scan.
fn matches_common_name(hostname: &str, cert: &dyn PeerIdentity) -> bool {
    let Some(cn) = cert.common_name() else {
        return false;
    };
    if embedded_nul(cn) {
        return false;
    }
    name_matches(hostname, cn)
}

/// True when the declared length differs from the embedded C-string length.
fn embedded_nul(bytes: &[u8]) -> bool {
    bytes.contains(&0)
}

/// ASCII-case-insensitive comparison of a certificate name against the
/// hostname. Non-UTF-8 attribute bytes never match.
fn name_matches(hostname: &str, bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok_and(|name| name.eq_ignore_ascii_case(hostname))
}
