use super::{colorize_status, essence_status, json_pretty, EXIT_SUCCESS};
use cinepack_core::{Cpl, Dcp, ReadOptions, Reel};
use cinepack_mxf::EssenceBackend;
use cinepack_schema::Timecode;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Serialize)]
struct ReelSummary {
    id: String,
    duration: i64,
    stereoscopic: bool,
    picture: &'static str,
    sound: &'static str,
    subtitle: &'static str,
}

#[derive(Serialize)]
struct CplSummary {
    id: String,
    name: String,
    content_kind: String,
    fps: i32,
    length: i64,
    running_time: String,
    reels: Vec<ReelSummary>,
}

fn summarize_reel(reel: &Reel) -> ReelSummary {
    ReelSummary {
        id: reel.id().to_string(),
        duration: reel.duration(),
        stereoscopic: reel.is_stereoscopic(),
        picture: essence_status(Some(reel.picture())),
        sound: essence_status(reel.sound()),
        subtitle: essence_status(reel.subtitle()),
    }
}

fn summarize_cpl(cpl: &Cpl) -> CplSummary {
    CplSummary {
        id: cpl.id().to_string(),
        name: cpl.name().to_owned(),
        content_kind: cpl.content_kind().to_string(),
        fps: cpl.fps(),
        length: cpl.length(),
        running_time: Timecode::from_frame(cpl.length(), cpl.fps()).to_string(),
        reels: cpl.reels().iter().map(|r| summarize_reel(r)).collect(),
    }
}

pub fn run(
    dir: &Path,
    backend: &Arc<dyn EssenceBackend>,
    require_mxfs: bool,
    json: bool,
) -> Result<u8, String> {
    let dcp = Dcp::read(dir, backend, ReadOptions { require_mxfs }).map_err(|e| e.to_string())?;
    let cpls: Vec<CplSummary> = dcp.cpls().iter().map(|c| summarize_cpl(c)).collect();

    if json {
        println!("{}", json_pretty(&cpls)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("package:     {}", dir.display());
    println!("CPLs:        {}", cpls.len());
    for cpl in &cpls {
        println!();
        println!("CPL {}", cpl.id);
        println!("  name:      {}", cpl.name);
        println!("  kind:      {}", cpl.content_kind);
        println!("  fps:       {}", cpl.fps);
        println!("  length:    {} frames ({})", cpl.length, cpl.running_time);
        for (i, reel) in cpl.reels.iter().enumerate() {
            println!(
                "  reel {} {} ({} frames{})",
                i + 1,
                reel.id,
                reel.duration,
                if reel.stereoscopic { ", 3D" } else { "" }
            );
            println!(
                "    picture {}  sound {}  subtitle {}",
                colorize_status(reel.picture),
                colorize_status(reel.sound),
                colorize_status(reel.subtitle)
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
