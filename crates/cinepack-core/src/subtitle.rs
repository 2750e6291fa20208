use crate::asset::{AssetFile, PackageAsset, ReelTiming};
use crate::notes::{EqualityOptions, NoteType};
use crate::DcpError;
use cinepack_schema::{AssetId, Digest, Fraction, SchemaError, Timecode, XmlNode, XmlWriter};
use cinepack_store::write_atomic;
use std::path::PathBuf;
use tracing::debug;

/// Milliseconds per DCSubtitle time tick.
const MS_PER_TICK: i64 = 4;

/// One subtitle shown between two times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEvent {
    pub time_in: Timecode,
    pub time_out: Timecode,
    pub lines: Vec<String>,
}

impl SubtitleEvent {
    pub fn new(time_in: Timecode, time_out: Timecode, lines: Vec<String>) -> Self {
        Self {
            time_in,
            time_out,
            lines,
        }
    }
}

/// A DCSubtitle XML document.
#[derive(Debug, Clone)]
pub struct SubtitleAsset {
    file: AssetFile,
    movie_title: String,
    reel_number: u32,
    language: String,
    timing: ReelTiming,
    events: Vec<SubtitleEvent>,
}

impl SubtitleAsset {
    pub fn new(
        file: AssetFile,
        movie_title: &str,
        reel_number: u32,
        language: &str,
        edit_rate: Fraction,
    ) -> Self {
        Self {
            file,
            movie_title: movie_title.to_owned(),
            reel_number,
            language: language.to_owned(),
            timing: ReelTiming::whole(edit_rate, 0),
            events: Vec::new(),
        }
    }

    /// Parse the DCSubtitle document behind `file`. `timing` comes from the
    /// CPL reel that references it.
    pub fn read(file: AssetFile, timing: ReelTiming) -> Result<Self, DcpError> {
        let root = XmlNode::parse_file(&file.path())?;
        if root.name != "DCSubtitle" {
            return Err(SchemaError::Malformed(format!(
                "expected DCSubtitle root element in {}, found {}",
                file.path().display(),
                root.name
            ))
            .into());
        }

        let mut nodes = Vec::new();
        root.descendants_named("Subtitle", &mut nodes);
        let events = nodes
            .into_iter()
            .map(|node| {
                Ok(SubtitleEvent {
                    time_in: parse_time(node, "TimeIn")?,
                    time_out: parse_time(node, "TimeOut")?,
                    lines: node
                        .children_named("Text")
                        .map(|t| t.text.trim().to_owned())
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        debug!("read {} subtitle events from {}", events.len(), file.path().display());
        Ok(Self {
            movie_title: root.optional_string_child("MovieTitle").unwrap_or_default(),
            reel_number: root.optional_number_child("ReelNumber")?.unwrap_or(1),
            language: root.optional_string_child("Language").unwrap_or_default(),
            file,
            timing,
            events,
        })
    }

    pub fn file(&self) -> &AssetFile {
        &self.file
    }

    pub fn movie_title(&self) -> &str {
        &self.movie_title
    }

    pub fn reel_number(&self) -> u32 {
        self.reel_number
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn timing(&self) -> &ReelTiming {
        &self.timing
    }

    pub fn events(&self) -> &[SubtitleEvent] {
        &self.events
    }

    /// Append an event. The asset's duration grows to cover it.
    pub fn add_event(&mut self, event: SubtitleEvent) {
        let fps = i64::from(self.timing.edit_rate.as_fps());
        let frames = (event.time_out.total_milliseconds() * fps + 999) / 1000;
        if frames > self.timing.intrinsic_duration {
            self.timing = ReelTiming::whole(self.timing.edit_rate, frames);
        }
        self.events.push(event);
    }

    pub fn write_xml(&self) -> Result<(), DcpError> {
        let mut w = XmlWriter::document("DCSubtitle", &[("Version", "1.0")])?;
        w.text_element("SubtitleID", self.file.id().to_string())?
            .text_element("MovieTitle", &self.movie_title)?
            .text_element("ReelNumber", self.reel_number.to_string())?
            .text_element("Language", &self.language)?
            .open("Font")?;
        for (i, event) in self.events.iter().enumerate() {
            let spot = (i + 1).to_string();
            let time_in = format_time(event.time_in);
            let time_out = format_time(event.time_out);
            w.open_with(
                "Subtitle",
                &[
                    ("SpotNumber", spot.as_str()),
                    ("TimeIn", time_in.as_str()),
                    ("TimeOut", time_out.as_str()),
                ],
            )?;
            for line in &event.lines {
                w.text_element("Text", line)?;
            }
            w.close("Subtitle")?;
        }
        w.close("Font")?;
        let bytes = w.finish("DCSubtitle")?;

        write_atomic(&self.file.path(), &bytes)?;
        self.file.invalidate_digest();
        Ok(())
    }

    /// Equal digests, or failing that the same events in the same order.
    pub fn equals(
        &self,
        other: &SubtitleAsset,
        _opt: &EqualityOptions,
        note: &mut dyn FnMut(NoteType, String),
    ) -> Result<bool, DcpError> {
        if self.file.digest()? == other.file.digest()? {
            return Ok(true);
        }
        note(
            NoteType::Note,
            "asset hashes differ; comparing subtitle events".to_owned(),
        );
        if self.events.len() != other.events.len() {
            note(
                NoteType::Error,
                format!(
                    "subtitle event counts differ: {} against {}",
                    self.events.len(),
                    other.events.len()
                ),
            );
            return Ok(false);
        }
        let mut equal = true;
        for (i, (a, b)) in self.events.iter().zip(&other.events).enumerate() {
            if a != b {
                note(NoteType::Error, format!("subtitle {} differs", i + 1));
                equal = false;
            }
        }
        Ok(equal)
    }
}

/// `HH:MM:SS:TTT` in 4 ms ticks, or `HH:MM:SS.mmm`.
fn parse_time(node: &XmlNode, attribute: &str) -> Result<Timecode, SchemaError> {
    let invalid = |value: &str| SchemaError::InvalidValue {
        field: attribute.to_owned(),
        value: value.to_owned(),
    };
    let text = node.attribute(attribute).ok_or_else(|| SchemaError::MissingNode {
        parent: node.name.clone(),
        child: attribute.to_owned(),
    })?;

    let (clock, ms) = match text.rsplit_once('.') {
        Some((clock, millis)) => (clock, millis.parse::<i64>().map_err(|_| invalid(text))?),
        None => {
            let (clock, ticks) = text.rsplit_once(':').ok_or_else(|| invalid(text))?;
            (clock, ticks.parse::<i64>().map_err(|_| invalid(text))? * MS_PER_TICK)
        }
    };
    let fields = clock
        .split(':')
        .map(str::parse::<i64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid(text))?;
    let [h, m, s] = fields[..] else {
        return Err(invalid(text));
    };
    Ok(Timecode::from_milliseconds(((h * 60 + m) * 60 + s) * 1000 + ms))
}

fn format_time(t: Timecode) -> String {
    format!("{:02}:{:02}:{:02}:{:03}", t.h, t.m, t.s, t.ms / MS_PER_TICK)
}

impl PackageAsset for SubtitleAsset {
    fn id(&self) -> AssetId {
        self.file.id()
    }

    fn file_path(&self) -> PathBuf {
        self.file.path()
    }

    fn digest(&self) -> Result<Digest, DcpError> {
        self.file.digest()
    }

    fn size(&self) -> Result<u64, DcpError> {
        self.file.size()
    }

    fn pkl_type(&self) -> &'static str {
        "text/xml"
    }
}
