pub mod cert;
pub mod completions;
pub mod create;
pub mod diff;
pub mod info;
pub mod man_pages;
pub mod verify;

use cinepack_core::{Essence, NoteType};
use cinepack_mxf::EssenceBackend;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_READ_ERROR: u8 = 2;
pub const EXIT_INTEGRITY_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn open_backend(name: &str) -> Result<Arc<dyn EssenceBackend>, String> {
    cinepack_mxf::select_backend(name).map_err(|e| e.to_string())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// A bar over `len` steps, for frame-by-frame work.
pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("=> "),
    );
    pb.set_message(msg.to_owned());
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_note(kind: NoteType) -> String {
    use console::Style;
    let label = kind.to_string();
    match kind {
        NoteType::Error => Style::new().red().bold().apply_to(label).to_string(),
        NoteType::Note => Style::new().yellow().apply_to(label).to_string(),
        NoteType::Progress => Style::new().dim().apply_to(label).to_string(),
    }
}

/// `loaded`, `unavailable`, or `absent` for a reel slot.
pub fn essence_status<T>(slot: Option<&Essence<T>>) -> &'static str {
    match slot {
        Some(Essence::Loaded(_)) => "loaded",
        Some(Essence::Unavailable(_)) => "unavailable",
        None => "absent",
    }
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "loaded" => Style::new().green().apply_to(status).to_string(),
        "unavailable" => Style::new().red().apply_to(status).to_string(),
        "absent" => Style::new().dim().apply_to(status).to_string(),
        other => other.to_owned(),
    }
}

/// Frame position out of a progress note such as
/// `Comparing video frame 3 of 24`: the 1-based frame and the total.
pub fn frame_progress(message: &str) -> Option<(u64, u64)> {
    let (head, total) = message.rsplit_once(" of ")?;
    let index = head.rsplit(' ').next()?.parse::<u64>().ok()?;
    Some((index + 1, total.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_string() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn framed_backend_opens() {
        assert_eq!(open_backend("framed").unwrap().name(), "framed");
    }

    #[test]
    fn unknown_backend_names_itself() {
        let err = open_backend("asdcp").err().unwrap();
        assert!(err.contains("asdcp"));
    }

    #[test]
    fn frame_progress_parses_notes() {
        assert_eq!(frame_progress("Comparing video frame 0 of 24"), Some((1, 24)));
        assert_eq!(frame_progress("Comparing audio frame 23 of 24"), Some((24, 24)));
        assert_eq!(frame_progress("asset hashes differ"), None);
        assert_eq!(frame_progress("one of many"), None);
    }

    #[test]
    fn status_of_absent_slot() {
        assert_eq!(essence_status::<()>(None), "absent");
    }

    #[test]
    fn colorize_keeps_text() {
        assert!(colorize_note(NoteType::Error).contains("ERROR"));
        assert!(colorize_status("loaded").contains("loaded"));
        assert_eq!(colorize_status("other"), "other");
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_READ_ERROR);
        assert_ne!(EXIT_READ_ERROR, EXIT_INTEGRITY_ERROR);
    }

    #[test]
    fn spinner_creates_progress_bar() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}
