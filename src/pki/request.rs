//! Certificate signing requests.

use std::net::IpAddr;

use rcgen::{CertificateParams, CertificateSigningRequestParams, SanType};

use super::{Key, Subject};
use crate::error::Result;

/// A PEM-encoded PKCS#10 certificate signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSigningRequest {
    pem: String,
}

impl CertificateSigningRequest {
    /// Parses and validates a PEM-encoded CSR.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let pem = super::pem_str(pem, "certificate request")?;
        CertificateSigningRequestParams::from_pem(&pem)?;
        Ok(Self { pem })
    }

    pub fn export(&self) -> &[u8] {
        self.pem.as_bytes()
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub(crate) fn params(&self) -> Result<CertificateSigningRequestParams> {
        Ok(CertificateSigningRequestParams::from_pem(&self.pem)?)
    }
}

/// Builds a CSR for `name`, signed by `key`.
///
/// `subject.common_name` is ignored in favour of `name`, which is what ends up
/// as the request's CN.
pub fn create_certificate_signing_request(
    key: &Key,
    subject: &Subject,
    ips: &[IpAddr],
    domains: &[String],
    uris: &[String],
    name: &str,
) -> Result<CertificateSigningRequest> {
    let subject = Subject {
        common_name: name.to_string(),
        ..subject.clone()
    };

    let mut params = CertificateParams::default();
    params.distinguished_name = subject.distinguished_name();

    let mut alt_names = Vec::with_capacity(ips.len() + domains.len() + uris.len());
    alt_names.extend(ips.iter().map(|ip| SanType::IpAddress(*ip)));
    for domain in domains {
        alt_names.push(SanType::DnsName(domain.clone().try_into()?));
    }
    for uri in uris {
        alt_names.push(SanType::URI(uri.clone().try_into()?));
    }
    params.subject_alt_names = alt_names;

    let request = params.serialize_request(&key.key_pair()?)?;
    Ok(CertificateSigningRequest {
        pem: request.pem()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pki::DEFAULT_KEY_BITS;

    #[test]
    fn request_carries_alt_names() {
        let key = Key::generate(DEFAULT_KEY_BITS).unwrap();
        let csr = create_certificate_signing_request(
            &key,
            &Subject {
                organization: "Acme".into(),
                ..Default::default()
            },
            &["127.0.0.1".parse().unwrap()],
            &["localhost".to_string()],
            &["spiffe://acme/svc".to_string()],
            "svc",
        )
        .unwrap();

        assert!(csr.pem().starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
        let parsed = CertificateSigningRequest::from_pem(csr.export()).unwrap();
        let params = parsed.params().unwrap();
        assert_eq!(params.params.subject_alt_names.len(), 3);
    }

    #[test]
    fn non_ascii_domain_is_rejected() {
        let key = Key::generate(DEFAULT_KEY_BITS).unwrap();
        let result = create_certificate_signing_request(
            &key,
            &Subject::default(),
            &[],
            &["bücher.example".to_string()],
            &[],
            "svc",
        );
        assert!(result.is_err());
    }
}
