use super::{json_pretty, progress_bar, spin_fail, spin_ok, EXIT_SUCCESS};
use cinepack_core::{AssetFile, Cpl, Dcp, PictureAsset, PictureKind, Reel, Size};
use cinepack_mxf::EssenceBackend;
use cinepack_schema::{parse_metadata_file, AssetId, ContentKind, Fraction, PackageMetadata};
use cinepack_store::PackageLayout;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct CreateArgs {
    pub dir: PathBuf,
    pub name: String,
    pub kind: ContentKind,
    pub fps: i32,
    pub width: u32,
    pub height: u32,
    pub stereo: bool,
    pub metadata: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

fn load_metadata(path: Option<&PathBuf>) -> Result<PackageMetadata, String> {
    match path {
        Some(p) => parse_metadata_file(p)
            .map_err(|e| format!("failed to load metadata from {}: {e}", p.display())),
        None => Ok(PackageMetadata::default()),
    }
}

fn wrap_picture(
    args: &CreateArgs,
    backend: &Arc<dyn EssenceBackend>,
    metadata: &PackageMetadata,
    show_progress: bool,
) -> Result<(Arc<PictureAsset>, i64), String> {
    let id = AssetId::new();
    let kind = if args.stereo {
        PictureKind::Stereo
    } else {
        PictureKind::Mono
    };
    let mut picture = PictureAsset::new(
        AssetFile::new(id, &args.dir, format!("j2c_{id}.mxf")),
        kind,
        Fraction::new(args.fps, 1),
        Size::new(args.width, args.height),
        Arc::clone(backend),
    );

    let pb = show_progress.then(|| progress_bar(100, "wrapping picture"));
    let mut report = |fraction: f32| {
        if let Some(pb) = &pb {
            pb.set_position((fraction.clamp(0.0, 1.0) * 100.0) as u64);
        }
    };
    let result = picture.create(&args.files, metadata, Some(&mut report));
    match (&pb, &result) {
        (Some(pb), Ok(frames)) => spin_ok(pb, &format!("wrapped {frames} frames")),
        (Some(pb), Err(_)) => spin_fail(pb, "wrapping failed"),
        (None, _) => {}
    }
    let frames = result.map_err(|e| e.to_string())?;
    Ok((Arc::new(picture), frames))
}

pub fn run(args: &CreateArgs, backend: &Arc<dyn EssenceBackend>, json: bool) -> Result<u8, String> {
    let metadata = load_metadata(args.metadata.as_ref())?;
    PackageLayout::new(&args.dir)
        .initialize()
        .map_err(|e| e.to_string())?;

    let (picture, frames) = wrap_picture(args, backend, &metadata, !json)?;

    let mut cpl = Cpl::new(&args.dir, &args.name, args.kind, frames, args.fps);
    cpl.add_reel(Arc::new(Reel::new(picture, None, None)));
    let cpl_id = cpl.id();

    let mut dcp = Dcp::new(&args.dir);
    dcp.add_cpl(Arc::new(cpl));
    let written = dcp.write_xml(&metadata).map_err(|e| e.to_string())?;
    info!("created package {} with CPL {cpl_id}", args.dir.display());

    if json {
        let payload = serde_json::json!({
            "cpl_id": cpl_id.to_string(),
            "frames": frames,
            "package": written,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("created package in {}", args.dir.display());
        println!("  CPL:       {cpl_id}");
        println!("  PKL:       {}", written.pkl_id);
        println!("  frames:    {frames}");
        println!("  asset map: {}", written.assetmap_path.display());
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_metadata_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_metadata(Some(&path)).unwrap_err();
        assert!(err.contains("absent.toml"));
    }

    #[test]
    fn metadata_defaults_without_file() {
        let m = load_metadata(None).unwrap();
        assert_eq!(m, PackageMetadata::default().with_issue_date(&m.issue_date));
    }

    #[test]
    fn metadata_file_overrides_issuer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.toml");
        std::fs::write(&path, "issuer = \"Studio\"\n").unwrap();
        assert_eq!(load_metadata(Some(&path)).unwrap().issuer, "Studio");
    }
}
