use crate::CertificateError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use const_oid::db::rfc4519::{COMMON_NAME, ORGANIZATIONAL_UNIT_NAME, ORGANIZATION_NAME};
use const_oid::ObjectIdentifier;
use num_bigint::BigUint;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sha1::{Digest as _, Sha1};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use x509_cert::der::asn1::{Ia5StringRef, PrintableStringRef, TeletexStringRef, Utf8StringRef};
use x509_cert::der::pem::LineEnding;
use x509_cert::der::{Any, DecodePem, Encode, EncodePem, Tag, Tagged};
use x509_cert::name::Name;

const BEGIN_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----";
const END_CERTIFICATE: &str = "-----END CERTIFICATE-----";
const PEM_LINE_WIDTH: usize = 64;

/// A parsed X.509 certificate.
///
/// Immutable once built. Equality and ordering compare the canonical PEM
/// text, so certificates can key ordered sets.
#[derive(Clone)]
pub struct Certificate {
    x509: x509_cert::Certificate,
    pem: String,
    public_key: OnceLock<RsaPublicKey>,
}

impl Certificate {
    /// Parse the first certificate in `text`.
    ///
    /// Returns the certificate and whatever non-empty lines follow its END
    /// marker, so a bundle can be consumed one certificate at a time.
    pub fn from_pem(text: &str) -> Result<(Certificate, String), CertificateError> {
        let lines: Vec<&str> = text.split(['\r', '\n']).map(str::trim).collect();

        let begin = lines
            .iter()
            .position(|l| *l == BEGIN_CERTIFICATE)
            .ok_or(CertificateError::MissingBegin)?;
        let end = lines[begin + 1..]
            .iter()
            .position(|l| *l == END_CERTIFICATE)
            .map(|i| begin + 1 + i)
            .ok_or(CertificateError::MissingEnd)?;

        // Files in the wild are wrapped inconsistently; re-wrap before decoding.
        let base64: String = lines[begin + 1..end].concat();
        let fixed = rewrap(&base64);

        let x509 = x509_cert::Certificate::from_pem(fixed.as_bytes())
            .map_err(|e| CertificateError::Decode(e.to_string()))?;
        let pem = x509
            .to_pem(LineEnding::LF)
            .map_err(|e| CertificateError::Encode(e.to_string()))?;

        let mut extra = String::new();
        for line in lines[end + 1..].iter().filter(|l| !l.is_empty()) {
            extra.push_str(line);
            extra.push('\n');
        }

        Ok((
            Certificate {
                x509,
                pem,
                public_key: OnceLock::new(),
            },
            extra,
        ))
    }

    /// The certificate as PEM, optionally without the BEGIN/END lines.
    pub fn certificate(&self, with_begin_end: bool) -> String {
        if with_begin_end {
            return self.pem.clone();
        }
        self.pem
            .replace(&format!("{BEGIN_CERTIFICATE}\n"), "")
            .replace(&format!("\n{END_CERTIFICATE}\n"), "")
    }

    /// Issuer distinguished name in RFC 4514 form, `+` escaped as `\+`.
    pub fn issuer(&self) -> String {
        self.x509.tbs_certificate.issuer.to_string()
    }

    /// Subject distinguished name in RFC 4514 form, `+` escaped as `\+`.
    pub fn subject(&self) -> String {
        self.x509.tbs_certificate.subject.to_string()
    }

    pub fn subject_common_name(&self) -> String {
        name_part(&self.x509.tbs_certificate.subject, COMMON_NAME)
    }

    pub fn subject_organization_name(&self) -> String {
        name_part(&self.x509.tbs_certificate.subject, ORGANIZATION_NAME)
    }

    pub fn subject_organizational_unit_name(&self) -> String {
        name_part(&self.x509.tbs_certificate.subject, ORGANIZATIONAL_UNIT_NAME)
    }

    /// Serial number in decimal.
    pub fn serial(&self) -> String {
        BigUint::from_bytes_be(self.x509.tbs_certificate.serial_number.as_bytes()).to_string()
    }

    /// Base64 SHA-1 of the DER-encoded `TBSCertificate`.
    pub fn thumbprint(&self) -> Result<String, CertificateError> {
        let tbs = self
            .x509
            .tbs_certificate
            .to_der()
            .map_err(|e| CertificateError::Encode(e.to_string()))?;
        Ok(STANDARD.encode(Sha1::digest(&tbs)))
    }

    /// The subject's RSA public key, extracted on first use.
    pub fn public_key(&self) -> Result<&RsaPublicKey, CertificateError> {
        if let Some(key) = self.public_key.get() {
            return Ok(key);
        }
        let spki = self
            .x509
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| CertificateError::PublicKey(e.to_string()))?;
        let key = RsaPublicKey::from_public_key_der(&spki)
            .map_err(|e| CertificateError::PublicKey(e.to_string()))?;
        Ok(self.public_key.get_or_init(|| key))
    }

    /// Whether this certificate names itself as issuer.
    pub fn is_self_issued(&self) -> bool {
        self.x509.tbs_certificate.issuer == self.x509.tbs_certificate.subject
    }
}

fn rewrap(base64: &str) -> String {
    let mut fixed = String::with_capacity(base64.len() + base64.len() / PEM_LINE_WIDTH + 64);
    fixed.push_str(BEGIN_CERTIFICATE);
    fixed.push('\n');
    let bytes = base64.as_bytes();
    for chunk in bytes.chunks(PEM_LINE_WIDTH) {
        fixed.push_str(&String::from_utf8_lossy(chunk));
        fixed.push('\n');
    }
    fixed.push_str(END_CERTIFICATE);
    fixed.push('\n');
    fixed
}

/// First value of attribute `oid` in `name`, or an empty string.
fn name_part(name: &Name, oid: ObjectIdentifier) -> String {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == oid)
        .and_then(|atv| any_to_string(&atv.value))
        .unwrap_or_default()
}

fn any_to_string(value: &Any) -> Option<String> {
    let text = match value.tag() {
        Tag::Utf8String => Utf8StringRef::try_from(value).ok()?.as_str().to_owned(),
        Tag::PrintableString => PrintableStringRef::try_from(value).ok()?.as_str().to_owned(),
        Tag::Ia5String => Ia5StringRef::try_from(value).ok()?.as_str().to_owned(),
        Tag::TeletexString => TeletexStringRef::try_from(value).ok()?.as_str().to_owned(),
        _ => return None,
    };
    Some(text)
}

impl FromStr for Certificate {
    type Err = CertificateError;

    /// Parse exactly one certificate; anything after it is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cert, extra) = Certificate::from_pem(s)?;
        if !extra.is_empty() {
            return Err(CertificateError::UnexpectedData);
        }
        Ok(cert)
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.pem == other.pem
    }
}

impl Eq for Certificate {}

impl PartialOrd for Certificate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Certificate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pem.cmp(&other.pem)
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pem)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("serial", &self.serial())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrap_breaks_at_64() {
        let body = "A".repeat(130);
        let fixed = rewrap(&body);
        let lines: Vec<&str> = fixed.lines().collect();
        assert_eq!(lines[0], BEGIN_CERTIFICATE);
        assert_eq!(lines[1].len(), 64);
        assert_eq!(lines[2].len(), 64);
        assert_eq!(lines[3].len(), 2);
        assert_eq!(lines[4], END_CERTIFICATE);
    }

    #[test]
    fn missing_markers() {
        assert!(matches!(
            Certificate::from_pem("no certificate here"),
            Err(CertificateError::MissingBegin)
        ));
        assert!(matches!(
            Certificate::from_pem("-----BEGIN CERTIFICATE-----\nMIIB\n"),
            Err(CertificateError::MissingEnd)
        ));
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        let text = "-----BEGIN CERTIFICATE-----\nbm90IGEgY2VydGlmaWNhdGU=\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            Certificate::from_pem(text),
            Err(CertificateError::Decode(_))
        ));
    }
}
