use super::{json_pretty, EXIT_INTEGRITY_ERROR, EXIT_SUCCESS};
use cinepack_store::{verify_package_integrity, PackageLayout};
use std::path::Path;

pub fn run(dir: &Path, json: bool) -> Result<u8, String> {
    let layout = PackageLayout::new(dir);
    let report = verify_package_integrity(&layout).map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!(
            "package integrity: {}/{} assets passed",
            report.passed, report.checked
        );
        for f in &report.failed {
            println!("  FAIL {}: {}", f.id, f.reason);
        }
    }

    if report.failed.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_INTEGRITY_ERROR)
    }
}
