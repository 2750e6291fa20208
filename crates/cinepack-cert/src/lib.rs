//! X.509 certificates and certificate chains for signed packages.
//!
//! `Certificate` wraps a parsed X.509 certificate read from PEM text and
//! exposes the fields used when signing and verifying packages: distinguished
//! names, serial, thumbprint and RSA public key. `CertificateChain` holds a
//! set of certificates and orders them from root to leaf.

pub mod certificate;
pub mod chain;

pub use certificate::Certificate;
pub use chain::CertificateChain;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("missing BEGIN line in certificate")]
    MissingBegin,
    #[error("missing END line in certificate")]
    MissingEnd,
    #[error("could not read X509 certificate: {0}")]
    Decode(String),
    #[error("could not encode X509 certificate: {0}")]
    Encode(String),
    #[error("could not get RSA public key from certificate: {0}")]
    PublicKey(String),
    #[error("unexpected data after certificate")]
    UnexpectedData,
    #[error("certificate chain error: {0}")]
    Chain(String),
}
