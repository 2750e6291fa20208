//! End-to-end tests: compose packages, write them, read them back, compare.
//!
//! Everything runs on the built-in `framed` essence backend, so no codec
//! library is needed.

use cinepack_core::{
    Asset, Cpl, Dcp, DcpError, EqualityOptions, Essence, NoteType, PackageAsset, PictureAsset,
    PictureKind, ReadOptions, Reel, Size, SoundAsset, SubtitleAsset, SubtitleEvent,
};
use cinepack_mxf::{EssenceBackend, Frame, FramedBackend};
use cinepack_schema::{
    AssetId, AssetMap, ContentKind, Fraction, PackageMetadata, PackingList, Timecode,
};
use cinepack_store::{make_digest, verify_package_integrity, PackageLayout};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const FPS: Fraction = Fraction::new(24, 1);

fn backend() -> Arc<dyn EssenceBackend> {
    Arc::new(FramedBackend::new())
}

fn write_picture(dir: &Path, name: &str, kind: PictureKind, frames: usize) -> Arc<PictureAsset> {
    let file = cinepack_core::AssetFile::new(AssetId::new(), dir, name);
    let mut asset = PictureAsset::new(file, kind, FPS, Size::new(1998, 1080), backend());
    let mut writer = asset
        .start_write(false, &PackageMetadata::default())
        .unwrap();
    for i in 0..frames {
        let byte = (i % 251) as u8;
        let frame = match kind {
            PictureKind::Mono => Frame::Mono(vec![byte; 32]),
            PictureKind::Stereo => Frame::Stereo {
                left: vec![byte; 32],
                right: vec![byte.wrapping_add(1); 32],
            },
        };
        writer.write(&frame).unwrap();
    }
    writer.finalize().unwrap();
    Arc::new(asset)
}

fn write_sound(dir: &Path, name: &str, frames: usize) -> Arc<SoundAsset> {
    let file = cinepack_core::AssetFile::new(AssetId::new(), dir, name);
    let mut asset = SoundAsset::new(file, FPS, 2, 48_000, backend());
    let mut writer = asset
        .start_write(false, &PackageMetadata::default())
        .unwrap();
    for _ in 0..frames {
        // 2000 samples per channel at 24 bits.
        writer.write(&Frame::Sound(vec![0; 2000 * 2 * 3])).unwrap();
    }
    writer.finalize().unwrap();
    Arc::new(asset)
}

/// A one-reel, one-second, 24 fps feature with a picture-only reel.
fn one_second_feature(dir: &Path) -> (Dcp, Arc<PictureAsset>) {
    let picture = write_picture(dir, "video.mxf", PictureKind::Mono, 24);
    let mut cpl = Cpl::new(dir, "A Test DCP", ContentKind::Feature, 24, 24);
    cpl.add_reel(Arc::new(Reel::new(Arc::clone(&picture), None, None)));
    let mut dcp = Dcp::new(dir);
    dcp.add_cpl(Arc::new(cpl));
    (dcp, picture)
}

fn errors_of(a: &Dcp, b: &Dcp, opt: &EqualityOptions) -> (bool, Vec<String>) {
    let mut errors = Vec::new();
    let equal = a
        .equals(b, opt, &mut |kind, msg| {
            if kind == NoteType::Error {
                errors.push(msg);
            }
        })
        .unwrap();
    (equal, errors)
}

#[test]
fn written_pkl_and_assetmap_describe_the_package() {
    let dir = tempfile::tempdir().unwrap();
    let (dcp, picture) = one_second_feature(dir.path());
    let written = dcp.write_xml(&PackageMetadata::default()).unwrap();

    let cpl = &dcp.cpls()[0];
    let cpl_path = cpl.file_path();
    assert!(cpl_path.exists());
    assert!(written.volindex_path.exists());

    let pkl = PackingList::parse_file(&written.pkl_path).unwrap();
    assert_eq!(pkl.id, written.pkl_id);
    assert_eq!(pkl.annotation_text.as_deref(), Some("A Test DCP"));

    let cpl_entries: Vec<_> = pkl
        .assets
        .iter()
        .filter(|a| a.asset_type == "text/xml")
        .collect();
    assert_eq!(cpl_entries.len(), 1);
    let entry = cpl_entries[0];
    assert_eq!(entry.id, cpl.id());
    assert_eq!(entry.size, fs::metadata(&cpl_path).unwrap().len());
    assert_eq!(entry.hash, make_digest(&cpl_path, None).unwrap());

    let picture_entry = pkl.asset(&picture.file().id()).unwrap();
    assert_eq!(picture_entry.asset_type, "application/mxf");

    let map = AssetMap::parse_file(&written.assetmap_path).unwrap();
    assert_eq!(map.assets.len(), 3);
    for id in [written.pkl_id, cpl.id(), picture.file().id()] {
        let asset = map.asset_from_id(&id).unwrap();
        assert_eq!(asset.chunks.len(), 1);
        assert_eq!(asset.chunks[0].offset, 0);
        assert_eq!(asset.chunks[0].volume_index, 1);
    }
    assert!(map.asset_from_id(&written.pkl_id).unwrap().packing_list);
    assert!(!map.asset_from_id(&cpl.id()).unwrap().packing_list);
    // Chunk paths are relative to the package root.
    assert_eq!(
        map.path_of(&picture.file().id()).unwrap(),
        Path::new("video.mxf")
    );
}

#[test]
fn read_reproduces_the_written_structure() {
    let dir = tempfile::tempdir().unwrap();
    let (dcp, picture) = one_second_feature(dir.path());
    dcp.write_xml(&PackageMetadata::default()).unwrap();

    let read = Dcp::read(dir.path(), &backend(), ReadOptions::default()).unwrap();
    assert_eq!(read.cpls().len(), 1);
    let cpl = &read.cpls()[0];
    assert_eq!(cpl.id(), dcp.cpls()[0].id());
    assert_eq!(cpl.name(), "A Test DCP");
    assert_eq!(cpl.content_kind(), ContentKind::Feature);
    assert_eq!(cpl.fps(), 24);
    assert_eq!(cpl.length(), 24);
    assert_eq!(cpl.reels().len(), 1);

    let reel = &cpl.reels()[0];
    assert_eq!(reel.id(), dcp.cpls()[0].reels()[0].id());
    let Essence::Loaded(read_picture) = reel.picture() else {
        panic!("picture essence should load");
    };
    assert_eq!(read_picture.kind(), PictureKind::Mono);
    assert_eq!(read_picture.file().id(), picture.file().id());
    assert_eq!(read_picture.intrinsic_duration(), 24);
    assert_eq!(read_picture.size(), Size::new(1998, 1080));
    assert!(reel.sound().is_none());
    assert!(reel.subtitle().is_none());
    assert!(read.packing_list().is_some());

    let (equal, errors) = errors_of(&dcp, &read, &EqualityOptions::default());
    assert!(equal, "unexpected differences: {errors:?}");
}

#[test]
fn stereo_package_reads_back_as_stereo() {
    let dir = tempfile::tempdir().unwrap();
    let picture = write_picture(dir.path(), "3d.mxf", PictureKind::Stereo, 4);
    let mut cpl = Cpl::new(dir.path(), "Depth", ContentKind::Trailer, 4, 24);
    cpl.add_reel(Arc::new(Reel::new(picture, None, None)));
    let mut dcp = Dcp::new(dir.path());
    dcp.add_cpl(Arc::new(cpl));
    dcp.write_xml(&PackageMetadata::default()).unwrap();

    let read = Dcp::read(dir.path(), &backend(), ReadOptions::default()).unwrap();
    let reel = &read.cpls()[0].reels()[0];
    assert!(reel.is_stereoscopic());
    let picture = reel.picture().loaded().unwrap();
    assert_eq!(picture.kind(), PictureKind::Stereo);
    assert_eq!(picture.frame_rate().unwrap(), Fraction::new(48, 1));
    assert_eq!(read.cpls()[0].fps(), 24);
}

#[test]
fn sound_and_subtitles_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let picture = write_picture(dir.path(), "video.mxf", PictureKind::Mono, 48);
    let sound = write_sound(dir.path(), "audio.mxf", 48);

    let subtitle_file = cinepack_core::AssetFile::new(AssetId::new(), dir.path(), "subs.xml");
    let mut subtitle = SubtitleAsset::new(subtitle_file, "Two Seconds", 1, "English", FPS);
    subtitle.add_event(SubtitleEvent::new(
        Timecode::new(0, 0, 0, 500),
        Timecode::new(0, 0, 1, 500),
        vec!["Hello".to_owned(), "there".to_owned()],
    ));
    subtitle.write_xml().unwrap();

    let mut cpl = Cpl::new(dir.path(), "Two Seconds", ContentKind::Short, 48, 24);
    cpl.add_reel(Arc::new(Reel::new(
        picture,
        Some(sound),
        Some(Arc::new(subtitle)),
    )));
    let mut dcp = Dcp::new(dir.path());
    dcp.add_cpl(Arc::new(cpl));
    let written = dcp.write_xml(&PackageMetadata::default()).unwrap();

    let pkl = PackingList::parse_file(&written.pkl_path).unwrap();
    assert_eq!(pkl.assets.len(), 4);
    assert_eq!(
        pkl.assets.iter().filter(|a| a.asset_type == "text/xml").count(),
        2
    );

    let read = Dcp::read(dir.path(), &backend(), ReadOptions::default()).unwrap();
    let reel = &read.cpls()[0].reels()[0];
    let sound = reel.sound().and_then(Essence::loaded).unwrap();
    assert_eq!(sound.channels(), 2);
    assert_eq!(sound.intrinsic_duration(), 48);
    let subs = reel.subtitle().and_then(Essence::loaded).unwrap();
    assert_eq!(subs.events().len(), 1);
    assert_eq!(subs.events()[0].lines, vec!["Hello", "there"]);

    let (equal, errors) = errors_of(&dcp, &read, &EqualityOptions::default());
    assert!(equal, "unexpected differences: {errors:?}");
}

#[test]
fn assets_are_sorted_and_unique() {
    let dir = tempfile::tempdir().unwrap();
    let p1 = write_picture(dir.path(), "one.mxf", PictureKind::Mono, 1);
    let p2 = write_picture(dir.path(), "two.mxf", PictureKind::Mono, 1);

    let mut first = Cpl::new(dir.path(), "First", ContentKind::Feature, 2, 24);
    first.add_reel(Arc::new(Reel::new(Arc::clone(&p2), None, None)));
    first.add_reel(Arc::new(Reel::new(Arc::clone(&p1), None, None)));
    let mut second = Cpl::new(dir.path(), "Second", ContentKind::Feature, 1, 24);
    second.add_reel(Arc::new(Reel::new(Arc::clone(&p1), None, None)));

    let mut dcp = Dcp::new(dir.path());
    dcp.add_cpl(Arc::new(first));
    dcp.add_cpl(Arc::new(second));

    let ids: Vec<AssetId> = dcp.assets().iter().map(Asset::id).collect();
    let mut expected = vec![p1.file().id(), p2.file().id()];
    expected.sort();
    assert_eq!(ids, expected);
    let again: Vec<AssetId> = dcp.assets().iter().map(Asset::id).collect();
    assert_eq!(ids, again);
}

#[test]
fn integrity_check_passes_then_catches_tampering() {
    let dir = tempfile::tempdir().unwrap();
    let (dcp, picture) = one_second_feature(dir.path());
    dcp.write_xml(&PackageMetadata::default()).unwrap();

    let layout = PackageLayout::new(dir.path());
    let report = verify_package_integrity(&layout).unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.passed, 2);
    assert!(report.failed.is_empty());

    fs::write(picture.file().path(), b"not the original essence").unwrap();
    let report = verify_package_integrity(&layout).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, picture.file().id().to_string());
}

#[test]
fn truncated_picture_is_reported() {
    let a_dir = tempfile::tempdir().unwrap();
    let b_dir = tempfile::tempdir().unwrap();
    let (a, _) = one_second_feature(a_dir.path());

    let short = write_picture(b_dir.path(), "video.mxf", PictureKind::Mono, 23);
    let mut cpl = Cpl::new(b_dir.path(), "A Test DCP", ContentKind::Feature, 24, 24);
    cpl.add_reel(Arc::new(Reel::new(short, None, None)));
    let mut b = Dcp::new(b_dir.path());
    b.add_cpl(Arc::new(cpl));

    let (equal, errors) = errors_of(&a, &b, &EqualityOptions::default());
    assert!(!equal);
    assert_eq!(errors, vec!["this asset has more frames than the other".to_owned()]);
}

#[test]
fn packages_can_carry_different_issuers() {
    let a_dir = tempfile::tempdir().unwrap();
    let b_dir = tempfile::tempdir().unwrap();
    let (a, _) = one_second_feature(a_dir.path());
    let (b, _) = one_second_feature(b_dir.path());

    let a_pkl = a
        .write_xml(&PackageMetadata::default().with_issuer("Studio A"))
        .unwrap()
        .pkl_path;
    let b_pkl = b
        .write_xml(&PackageMetadata::default().with_issuer("Studio B"))
        .unwrap()
        .pkl_path;
    assert_eq!(PackingList::parse_file(&a_pkl).unwrap().issuer, "Studio A");
    assert_eq!(PackingList::parse_file(&b_pkl).unwrap().issuer, "Studio B");
}

const CPL_ID: &str = "2b9b857f-ab4a-440e-a313-1ace0f1cfc95";
const PKL_ID: &str = "9e4c2a38-9dd5-4fb5-a1f1-7b1b7e9d5f3e";
const PICTURE_ID: &str = "81fb54df-e1bf-4647-8788-ea7ba154375b";

/// A package whose picture essence was never copied, with the stereo
/// signal given only by the frame rate.
fn package_without_essence(dir: &Path) {
    fs::write(
        dir.join("ASSETMAP"),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<AssetMap xmlns="http://www.smpte-ra.org/schemas/429-9/2007/AM">
  <Id>urn:uuid:0d5a83b4-5bd6-49e0-b7ef-3e1a2d28a0c1</Id>
  <AssetList>
    <Asset>
      <Id>urn:uuid:{PKL_ID}</Id>
      <PackingList>true</PackingList>
      <ChunkList><Chunk><Path>pkl.xml</Path></Chunk></ChunkList>
    </Asset>
    <Asset>
      <Id>urn:uuid:{CPL_ID}</Id>
      <ChunkList><Chunk><Path>cpl.xml</Path></Chunk></ChunkList>
    </Asset>
    <Asset>
      <Id>urn:uuid:{PICTURE_ID}</Id>
      <ChunkList><Chunk><Path>j2c_{PICTURE_ID}.mxf</Path></Chunk></ChunkList>
    </Asset>
  </AssetList>
</AssetMap>
"#
        ),
    )
    .unwrap();
    fs::write(
        dir.join("pkl.xml"),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<PackingList xmlns="http://www.smpte-ra.org/schemas/429-8/2007/PKL">
  <Id>urn:uuid:{PKL_ID}</Id>
  <AssetList>
    <Asset>
      <Id>urn:uuid:{CPL_ID}</Id>
      <Hash>AAAAAAAAAAAAAAAAAAAAAAAAAAA=</Hash>
      <Size>1</Size>
      <Type>text/xml</Type>
    </Asset>
  </AssetList>
</PackingList>
"#
        ),
    )
    .unwrap();
    fs::write(
        dir.join("cpl.xml"),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<CompositionPlaylist xmlns="http://www.smpte-ra.org/schemas/429-7/2006/CPL">
  <Id>urn:uuid:{CPL_ID}</Id>
  <ContentTitleText>Flat Looking</ContentTitleText>
  <ContentKind>feature</ContentKind>
  <ReelList>
    <Reel>
      <Id>urn:uuid:4d1c9a5e-0a4c-4d84-b6f1-0e0f3f3a9b11</Id>
      <AssetList>
        <MainPicture>
          <Id>urn:uuid:{PICTURE_ID}</Id>
          <EditRate>24 1</EditRate>
          <IntrinsicDuration>96</IntrinsicDuration>
          <EntryPoint>24</EntryPoint>
          <Duration>48</Duration>
          <FrameRate>48 1</FrameRate>
        </MainPicture>
      </AssetList>
    </Reel>
  </ReelList>
</CompositionPlaylist>
"#
        ),
    )
    .unwrap();
}

#[test]
fn missing_essence_is_unavailable_by_default() {
    let dir = tempfile::tempdir().unwrap();
    package_without_essence(dir.path());

    let dcp = Dcp::read(dir.path(), &backend(), ReadOptions::default()).unwrap();
    let cpl = &dcp.cpls()[0];
    assert_eq!(cpl.name(), "Flat Looking");
    assert_eq!(cpl.length(), 48);
    assert_eq!(cpl.fps(), 24);
    assert!(dcp.assets().is_empty());

    let reel = &cpl.reels()[0];
    let Essence::Unavailable(missing) = reel.picture() else {
        panic!("picture essence should be unavailable");
    };
    assert!(missing.stereoscopic);
    assert_eq!(missing.reference.entry_point, 24);
    assert!(missing.path.ends_with(format!("j2c_{PICTURE_ID}.mxf")));
    assert!(reel.is_stereoscopic());
    assert_eq!(reel.duration(), 48);
}

#[test]
fn missing_essence_fails_when_required() {
    let dir = tempfile::tempdir().unwrap();
    package_without_essence(dir.path());

    let err = Dcp::read(
        dir.path(),
        &backend(),
        ReadOptions { require_mxfs: true },
    )
    .unwrap_err();
    assert!(matches!(err, DcpError::Essence(_)), "got {err}");
}

#[test]
fn package_without_cpl_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    package_without_essence(dir.path());
    let map = fs::read_to_string(dir.path().join("ASSETMAP")).unwrap();
    let start = map.find(&format!("<Asset>\n      <Id>urn:uuid:{CPL_ID}")).unwrap();
    let end = start + map[start..].find("</Asset>").unwrap() + "</Asset>".len();
    fs::write(
        dir.path().join("ASSETMAP"),
        format!("{}{}", &map[..start], &map[end..]),
    )
    .unwrap();

    let err = Dcp::read(dir.path(), &backend(), ReadOptions::default()).unwrap_err();
    assert!(err.to_string().contains("no CPL files found"), "got {err}");
}

#[test]
fn duplicate_packing_lists_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    package_without_essence(dir.path());
    fs::copy(dir.path().join("pkl.xml"), dir.path().join("pkl2.xml")).unwrap();
    let map = fs::read_to_string(dir.path().join("ASSETMAP")).unwrap();
    let extra = r"<Asset>
      <Id>urn:uuid:c1f0a5a3-6f0e-4a5a-9c55-3d1d0b6f8e21</Id>
      <ChunkList><Chunk><Path>pkl2.xml</Path></Chunk></ChunkList>
    </Asset>
  </AssetList>";
    fs::write(
        dir.path().join("ASSETMAP"),
        map.replace("</AssetList>", extra),
    )
    .unwrap();

    let err = Dcp::read(dir.path(), &backend(), ReadOptions::default()).unwrap_err();
    assert!(err.to_string().contains("duplicate PKLs found"), "got {err}");
}

#[test]
fn unreadable_side_files_are_left_unclassified() {
    let dir = tempfile::tempdir().unwrap();
    package_without_essence(dir.path());
    fs::write(dir.path().join("sub_0001.png"), [0x89, b'P', b'N', b'G', 0xff, 0xfe]).unwrap();
    fs::write(dir.path().join("broken.xml"), "<Unclosed").unwrap();
    let map = fs::read_to_string(dir.path().join("ASSETMAP")).unwrap();
    let extra = r"<Asset>
      <Id>urn:uuid:5b1e2f64-7d0c-4a3e-8f21-0c9b6a4d2e10</Id>
      <ChunkList><Chunk><Path>sub_0001.png</Path></Chunk></ChunkList>
    </Asset>
    <Asset>
      <Id>urn:uuid:6c2f3a75-8e1d-4b4f-9a32-1dac7b5e3f21</Id>
      <ChunkList><Chunk><Path>broken.xml</Path></Chunk></ChunkList>
    </Asset>
    <Asset>
      <Id>urn:uuid:7d3a4b86-9f2e-4c5a-8b43-2ebd8c6f4a32</Id>
      <ChunkList><Chunk><Path>font.otf</Path></Chunk></ChunkList>
    </Asset>
  </AssetList>";
    fs::write(
        dir.path().join("ASSETMAP"),
        map.replace("</AssetList>", extra),
    )
    .unwrap();

    let read = Dcp::read(dir.path(), &backend(), ReadOptions::default()).unwrap();
    assert_eq!(read.cpls().len(), 1);
    assert!(read.packing_list().is_some());
}

#[test]
fn cpl_name_comes_from_annotation_text() {
    let dir = tempfile::tempdir().unwrap();
    package_without_essence(dir.path());
    let cpl = fs::read_to_string(dir.path().join("cpl.xml")).unwrap();
    fs::write(
        dir.path().join("cpl.xml"),
        cpl.replace(
            "<ContentTitleText>",
            "<AnnotationText>Flat Looking (reel edit)</AnnotationText>\n  <ContentTitleText>",
        ),
    )
    .unwrap();

    let dcp = Dcp::read(dir.path(), &backend(), ReadOptions::default()).unwrap();
    assert_eq!(dcp.cpls()[0].name(), "Flat Looking (reel edit)");
}
