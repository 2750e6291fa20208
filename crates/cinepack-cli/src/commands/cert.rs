use super::{json_pretty, EXIT_SUCCESS};
use cinepack_cert::CertificateChain;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CertificateSummary {
    subject: String,
    issuer: String,
    serial: String,
    thumbprint: String,
}

pub fn run(file: &Path, json: bool) -> Result<u8, String> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let chain = CertificateChain::from_bundle(&text).map_err(|e| e.to_string())?;
    let ordered = chain.root_to_leaf().map_err(|e| e.to_string())?;

    let summaries = ordered
        .iter()
        .map(|cert| {
            Ok(CertificateSummary {
                subject: cert.subject(),
                issuer: cert.issuer(),
                serial: cert.serial(),
                thumbprint: cert.thumbprint().map_err(|e| e.to_string())?,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    if json {
        println!("{}", json_pretty(&summaries)?);
        return Ok(EXIT_SUCCESS);
    }

    for (i, s) in summaries.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("subject:     {}", s.subject);
        println!("issuer:      {}", s.issuer);
        println!("serial:      {}", s.serial);
        println!("thumbprint:  {}", s.thumbprint);
    }
    Ok(EXIT_SUCCESS)
}
