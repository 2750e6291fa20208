use crate::{Certificate, CertificateError};
use std::collections::BTreeSet;
use tracing::debug;

/// A set of certificates that link from a self-issued root to a leaf.
#[derive(Debug, Clone, Default)]
pub struct CertificateChain {
    certificates: BTreeSet<Certificate>,
}

impl CertificateChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every certificate in a PEM bundle, in any order.
    pub fn from_bundle(text: &str) -> Result<Self, CertificateError> {
        let mut chain = Self::new();
        let mut rest = text.to_owned();
        loop {
            let (cert, extra) = Certificate::from_pem(&rest)?;
            chain.add(cert);
            if extra.is_empty() {
                break;
            }
            rest = extra;
        }
        debug!("read {} certificate(s) from bundle", chain.len());
        Ok(chain)
    }

    /// Insert `cert`; returns false if an identical certificate is present.
    pub fn add(&mut self, cert: Certificate) -> bool {
        self.certificates.insert(cert)
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.certificates.iter()
    }

    pub fn root(&self) -> Result<&Certificate, CertificateError> {
        self.certificates
            .iter()
            .find(|c| c.is_self_issued())
            .ok_or_else(|| CertificateError::Chain("no self-issued root certificate".to_owned()))
    }

    /// The certificate that issues no other certificate in the set.
    pub fn leaf(&self) -> Result<&Certificate, CertificateError> {
        let mut leaves = self.certificates.iter().filter(|candidate| {
            !self
                .certificates
                .iter()
                .any(|other| other != *candidate && other.issuer() == candidate.subject())
        });
        let leaf = leaves
            .next()
            .ok_or_else(|| CertificateError::Chain("no leaf certificate".to_owned()))?;
        if leaves.next().is_some() {
            return Err(CertificateError::Chain(
                "more than one leaf certificate".to_owned(),
            ));
        }
        Ok(leaf)
    }

    /// Certificates ordered by issuer-to-subject links, starting at the root.
    pub fn root_to_leaf(&self) -> Result<Vec<&Certificate>, CertificateError> {
        let mut ordered = vec![self.root()?];
        while ordered.len() < self.certificates.len() {
            let Some(current) = ordered.last() else {
                break;
            };
            let subject = current.subject();
            let next = self
                .certificates
                .iter()
                .find(|c| !c.is_self_issued() && c.issuer() == subject && !ordered.contains(c))
                .ok_or_else(|| {
                    CertificateError::Chain(format!("no certificate issued by {subject}"))
                })?;
            ordered.push(next);
        }
        Ok(ordered)
    }

    pub fn leaf_to_root(&self) -> Result<Vec<&Certificate>, CertificateError> {
        let mut ordered = self.root_to_leaf()?;
        ordered.reverse();
        Ok(ordered)
    }
}

impl FromIterator<Certificate> for CertificateChain {
    fn from_iter<I: IntoIterator<Item = Certificate>>(iter: I) -> Self {
        Self {
            certificates: iter.into_iter().collect(),
        }
    }
}
