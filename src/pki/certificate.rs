//! X.509 certificates: CA creation, signing of requests and inspection.

use chrono::{DateTime, Utc};
use rcgen::{
    BasicConstraints, CertificateParams, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyUsagePurpose,
};
use x509_parser::pem::parse_x509_pem;

use super::{
    CertificateSigningRequest, Key, Subject, from_unix_timestamp, new_serial_number,
    to_offset_date_time,
};
use crate::error::{Error, Result};

/// A PEM-encoded X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pem: String,
}

/// The parts of a certificate the lifecycle logic relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub is_ca: bool,
    pub subject: String,
    pub issuer: String,
    pub serial: String,
}

impl Certificate {
    /// Parses and validates a PEM-encoded certificate.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let cert = Self {
            pem: super::pem_str(pem, "certificate")?,
        };
        cert.info()?;
        Ok(cert)
    }

    pub fn export(&self) -> &[u8] {
        self.pem.as_bytes()
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Decodes the certificate and extracts validity, CA flag and names.
    pub fn info(&self) -> Result<CertificateInfo> {
        let (_, pem) = parse_x509_pem(self.pem.as_bytes())
            .map_err(|e| Error::Pki(format!("decoding certificate PEM: {}", e)))?;
        if pem.label != "CERTIFICATE" {
            return Err(Error::Pki(format!(
                "expected CERTIFICATE PEM block, got {}",
                pem.label
            )));
        }
        let cert = pem
            .parse_x509()
            .map_err(|e| Error::Pki(format!("parsing certificate: {}", e)))?;

        let validity = cert.validity();
        Ok(CertificateInfo {
            not_before: from_unix_timestamp(validity.not_before.timestamp())?,
            not_after: from_unix_timestamp(validity.not_after.timestamp())?,
            is_ca: cert.is_ca(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: cert.raw_serial_as_string(),
        })
    }
}

/// Creates a self-signed root CA certificate valid until `expires`.
pub fn create_certificate_authority(
    key: &Key,
    subject: &Subject,
    expires: DateTime<Utc>,
) -> Result<Certificate> {
    let mut params = CertificateParams::default();
    params.distinguished_name = subject.distinguished_name();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
    ];
    params.not_before = to_offset_date_time(Utc::now())?;
    params.not_after = to_offset_date_time(expires)?;
    params.serial_number = Some(new_serial_number());

    let cert = params.self_signed(&key.key_pair()?)?;
    Ok(Certificate { pem: cert.pem() })
}

/// Signs `csr` with the CA as a leaf (server and client) certificate.
pub fn create_certificate_host(
    ca: &Certificate,
    ca_key: &Key,
    csr: &CertificateSigningRequest,
    expires: DateTime<Utc>,
) -> Result<Certificate> {
    sign_request(ca, ca_key, csr, expires, Profile::Host)
}

/// Signs `csr` with the CA as an intermediate CA that may only issue leaves.
pub fn create_intermediate_certificate_authority(
    ca: &Certificate,
    ca_key: &Key,
    csr: &CertificateSigningRequest,
    expires: DateTime<Utc>,
) -> Result<Certificate> {
    sign_request(ca, ca_key, csr, expires, Profile::Intermediate)
}

enum Profile {
    Host,
    Intermediate,
}

fn sign_request(
    ca: &Certificate,
    ca_key: &Key,
    csr: &CertificateSigningRequest,
    expires: DateTime<Utc>,
    profile: Profile,
) -> Result<Certificate> {
    let mut request = csr.params()?;
    let params = &mut request.params;
    params.not_before = to_offset_date_time(Utc::now())?;
    params.not_after = to_offset_date_time(expires)?;
    params.serial_number = Some(new_serial_number());
    params.use_authority_key_identifier_extension = true;

    match profile {
        Profile::Host => {
            params.is_ca = IsCa::ExplicitNoCa;
            params.key_usages = vec![
                KeyUsagePurpose::DigitalSignature,
                KeyUsagePurpose::KeyEncipherment,
            ];
            params.extended_key_usages = vec![
                ExtendedKeyUsagePurpose::ServerAuth,
                ExtendedKeyUsagePurpose::ClientAuth,
            ];
        }
        Profile::Intermediate => {
            params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
            params.key_usages = vec![
                KeyUsagePurpose::DigitalSignature,
                KeyUsagePurpose::KeyCertSign,
                KeyUsagePurpose::CrlSign,
            ];
        }
    }

    let issuer = Issuer::from_ca_cert_pem(ca.pem(), ca_key.key_pair()?)?;
    let cert = request.signed_by(&issuer)?;
    Ok(Certificate { pem: cert.pem() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pki::{DEFAULT_KEY_BITS, create_certificate_signing_request};
    use chrono::Duration;

    fn root() -> (Key, Certificate) {
        let key = Key::generate(DEFAULT_KEY_BITS).unwrap();
        let subject = Subject {
            common_name: "root".into(),
            organization: "Acme".into(),
            ..Default::default()
        };
        let ca = create_certificate_authority(&key, &subject, Utc::now() + Duration::hours(1))
            .unwrap();
        (key, ca)
    }

    fn request(name: &str) -> CertificateSigningRequest {
        let key = Key::generate(DEFAULT_KEY_BITS).unwrap();
        create_certificate_signing_request(
            &key,
            &Subject::default(),
            &[],
            &[name.to_string()],
            &[],
            name,
        )
        .unwrap()
    }

    #[test]
    fn root_ca_is_self_signed_ca() {
        let (_, ca) = root();
        let info = ca.info().unwrap();
        assert!(info.is_ca);
        assert_eq!(info.subject, info.issuer);
        assert!(info.subject.contains("CN=root"));
        assert!(info.not_after > info.not_before);
    }

    #[test]
    fn host_certificate_is_issued_by_ca() {
        let (key, ca) = root();
        let expires = Utc::now() + Duration::minutes(5);
        let crt = create_certificate_host(&ca, &key, &request("localhost"), expires).unwrap();
        let info = crt.info().unwrap();

        assert!(!info.is_ca);
        assert_eq!(info.issuer, ca.info().unwrap().subject);
        assert!(info.subject.contains("CN=localhost"));
        assert_eq!(info.not_after.timestamp(), expires.timestamp());
    }

    #[test]
    fn intermediate_certificate_is_a_ca() {
        let (key, ca) = root();
        let crt = create_intermediate_certificate_authority(
            &ca,
            &key,
            &request("intermediate"),
            Utc::now() + Duration::minutes(5),
        )
        .unwrap();
        assert!(crt.info().unwrap().is_ca);
    }

    #[test]
    fn serials_differ_between_issuances() {
        let (key, ca) = root();
        let csr = request("svc");
        let expires = Utc::now() + Duration::minutes(5);
        let a = create_certificate_host(&ca, &key, &csr, expires).unwrap();
        let b = create_certificate_host(&ca, &key, &csr, expires).unwrap();
        assert_ne!(a.info().unwrap().serial, b.info().unwrap().serial);
    }

    #[test]
    fn from_pem_rejects_non_certificates() {
        assert!(Certificate::from_pem(b"").is_err());
        assert!(Certificate::from_pem(request("x").export()).is_err());
    }
}
