use serde::Serialize;
use std::fmt;

/// Severity of a note emitted while comparing packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    /// Position in a long comparison; carries no verdict.
    Progress,
    Error,
    Note,
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoteType::Progress => "PROGRESS",
            NoteType::Error => "ERROR",
            NoteType::Note => "NOTE",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub kind: NoteType,
    pub message: String,
}

impl Note {
    pub fn new(kind: NoteType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// What a package comparison looks at, and how much difference it forgives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualityOptions {
    /// Compare CPL names, content kinds, frame rates and lengths.
    pub compare_metadata: bool,
    /// Largest mean absolute sample difference accepted in a picture frame.
    pub max_mean_pixel_error: f64,
    /// Largest standard deviation of sample differences in a picture frame.
    pub max_std_dev_pixel_error: f64,
    /// Largest absolute difference accepted for one audio sample.
    pub max_audio_sample_error: i32,
    /// Scan essence frame by frame when file digests differ. When unset, a
    /// digest mismatch decides the comparison.
    pub compare_frames: bool,
}

impl Default for EqualityOptions {
    fn default() -> Self {
        Self {
            compare_metadata: true,
            max_mean_pixel_error: 0.0,
            max_std_dev_pixel_error: 0.0,
            max_audio_sample_error: 0,
            compare_frames: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_display_has_severity_prefix() {
        let note = Note::new(NoteType::Error, "reel counts differ");
        assert_eq!(note.to_string(), "ERROR: reel counts differ");
    }

    #[test]
    fn default_options_are_strict() {
        let opt = EqualityOptions::default();
        assert!(opt.compare_metadata);
        assert!(opt.compare_frames);
        assert_eq!(opt.max_audio_sample_error, 0);
    }

    #[test]
    fn note_serializes_with_snake_case_kind() {
        let json = serde_json::to_string(&Note::new(NoteType::Progress, "frame 1 of 2")).unwrap();
        assert!(json.contains("\"progress\""));
    }
}
