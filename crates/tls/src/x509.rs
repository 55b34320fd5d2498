//! x509-parser back-end for the [`PeerIdentity`] capability trait.

use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

use crate::identity::PeerIdentity;

/// A parsed peer certificate borrowing its DER encoding.
pub struct X509Peer<'a> {
    cert: X509Certificate<'a>,
}

impl<'a> X509Peer<'a> {
    /// Parses a DER-encoded certificate.
    ///
    /// Returns `None` on any decode failure; a certificate we cannot parse
    /// is one we cannot trust, and the error detail is not actionable in
    /// the verify path.
    pub fn parse(der: &'a [u8]) -> Option<Self> {
        match X509Certificate::from_der(der) {
            Ok((_, cert)) => Some(Self { cert }),
            Err(_) => None,
        }
    }
}

impl PeerIdentity for X509Peer<'_> {
    fn san_dns_entries(&self) -> Option<Vec<&[u8]>> {
        match self.cert.subject_alternative_name() {
            Ok(Some(san)) => Some(
                san.value
                    .general_names
                    .iter()
                    .filter_map(|name| match name {
                        GeneralName::DNSName(dns) => Some(dns.as_bytes()),
                        _ => None,
                    })
                    .collect(),
            ),
            // Absent or malformed extension: no entries to scan.
            Ok(None) | Err(_) => None,
        }
    }

    fn common_name(&self) -> Option<&[u8]> {
        self.cert
            .subject()
            .iter_common_name()
            .last()
            .and_then(|attr| attr.as_str().ok())
            .map(str::as_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::verify_peer;

    fn self_signed_der(san: Vec<String>, cn: Option<&str>) -> Vec<u8> {
        let mut params = rcgen::CertificateParams::new(san).unwrap();
        if let Some(cn) = cn {
            let mut dn = rcgen::DistinguishedName::new();
            dn.push(rcgen::DnType::CommonName, cn);
            params.distinguished_name = dn;
        }
        let key = rcgen::KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().der().to_vec()
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(X509Peer::parse(b"not a certificate").is_none());
        assert!(X509Peer::parse(&[]).is_none());
    }

    #[test]
    fn san_entries_from_real_certificate() {
        let der = self_signed_der(
            vec!["api.example.com".into(), "cdn.example.com".into()],
            None,
        );
        let peer = X509Peer::parse(&der).unwrap();
        let entries = peer.san_dns_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&b"api.example.com".as_slice()));
    }

    #[test]
    fn common_name_from_real_certificate() {
        let der = self_signed_der(vec![], Some("api.example.com"));
        let peer = X509Peer::parse(&der).unwrap();
        assert_eq!(peer.common_name(), Some(b"api.example.com".as_slice()));
    }

    #[test]
    fn verify_peer_over_real_certificate_is_case_insensitive() {
        let der = self_signed_der(vec!["api.example.com".into()], None);
        let peer = X509Peer::parse(&der).unwrap();
        assert!(verify_peer("API.Example.com", true, 0, &peer));
        assert!(!verify_peer("other.example.com", true, 0, &peer));
    }
}
