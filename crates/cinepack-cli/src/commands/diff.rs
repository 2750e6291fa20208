use super::{
    colorize_note, frame_progress, json_pretty, progress_bar, spin_fail, spin_ok, EXIT_FAILURE,
    EXIT_SUCCESS,
};
use cinepack_core::{Dcp, EqualityOptions, Note, NoteType, ReadOptions};
use cinepack_mxf::EssenceBackend;
use std::path::Path;
use std::sync::Arc;

fn read(dir: &Path, backend: &Arc<dyn EssenceBackend>) -> Result<Dcp, String> {
    Dcp::read(dir, backend, ReadOptions::default()).map_err(|e| e.to_string())
}

pub fn run(
    a: &Path,
    b: &Path,
    backend: &Arc<dyn EssenceBackend>,
    options: &EqualityOptions,
    json: bool,
) -> Result<u8, String> {
    let first = read(a, backend)?;
    let second = read(b, backend)?;

    let pb = (!json).then(|| progress_bar(0, "comparing"));
    let mut notes: Vec<Note> = Vec::new();
    let equal = first
        .equals(&second, options, &mut |kind, message| {
            if kind != NoteType::Progress {
                notes.push(Note::new(kind, message));
                return;
            }
            if let (Some(pb), Some((position, total))) = (pb.as_ref(), frame_progress(&message)) {
                pb.set_length(total);
                pb.set_position(position);
            }
        })
        .map_err(|e| {
            if let Some(pb) = &pb {
                spin_fail(pb, "comparison failed");
            }
            e.to_string()
        })?;

    if json {
        let payload = serde_json::json!({
            "equal": equal,
            "notes": notes,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        if let Some(pb) = &pb {
            if equal {
                spin_ok(pb, "packages are equal");
            } else {
                spin_fail(pb, "packages differ");
            }
        }
        for n in &notes {
            println!("{}: {}", colorize_note(n.kind), n.message);
        }
    }

    Ok(if equal { EXIT_SUCCESS } else { EXIT_FAILURE })
}
