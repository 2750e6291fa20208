//! The `framed` essence container.
//!
//! Layout: an 8-byte magic, then each frame as its buffers in order, each
//! buffer prefixed with its length as a little-endian `u32`, then a JSON
//! footer (kind, descriptor, writer identification, frame offsets), the
//! footer length as a little-endian `u64`, and the magic again.

use crate::backend::{EssenceBackend, EssenceWriter, PictureDecoder};
use crate::decoder::RawSampleDecoder;
use crate::essence::{EssenceDescriptor, EssenceKind, Frame, WriterInfo};
use crate::EssenceError;
use cinepack_schema::AssetId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::debug;

const MAGIC: &[u8; 8] = b"CPKFRM01";
const TRAILER_LEN: u64 = 16;

#[derive(Debug, Serialize, Deserialize)]
struct Footer {
    kind: EssenceKind,
    descriptor: EssenceDescriptor,
    asset_id: AssetId,
    company_name: String,
    product_name: String,
    product_version: String,
    frames: Vec<u64>,
}

/// A parsed footer, valid while the file keeps this length and mtime.
struct CachedFooter {
    len: u64,
    modified: Option<SystemTime>,
    footer: Arc<Footer>,
}

pub struct FramedBackend {
    decoder: Option<RawSampleDecoder>,
    footers: Mutex<HashMap<PathBuf, CachedFooter>>,
}

impl Default for FramedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FramedBackend {
    pub fn new() -> Self {
        Self {
            decoder: Some(RawSampleDecoder),
            footers: Mutex::default(),
        }
    }

    /// A backend that offers no picture decoder, so picture comparisons stop
    /// at the first differing buffer.
    pub fn without_decoder() -> Self {
        Self {
            decoder: None,
            footers: Mutex::default(),
        }
    }

    /// Open a container and check it holds `kind` essence. The footer is
    /// parsed once per file version and then served from the cache.
    fn open(
        &self,
        path: &Path,
        kind: EssenceKind,
    ) -> Result<(File, u64, Arc<Footer>), EssenceError> {
        let mut file = File::open(path).map_err(|e| EssenceError::open(path, e))?;
        let metadata = file.metadata().map_err(|e| EssenceError::open(path, e))?;
        let len = metadata.len();
        let modified = metadata.modified().ok();

        let cached = self
            .footers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .filter(|c| c.len == len && c.modified.is_some() && c.modified == modified)
            .map(|c| Arc::clone(&c.footer));
        let footer = match cached {
            Some(footer) => footer,
            None => {
                let footer = Arc::new(Self::parse_footer(&mut file, path, len)?);
                self.footers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(
                        path.to_path_buf(),
                        CachedFooter {
                            len,
                            modified,
                            footer: Arc::clone(&footer),
                        },
                    );
                footer
            }
        };

        if footer.kind != kind {
            return Err(EssenceError::open(
                path,
                format!("contains {} essence, not {kind}", footer.kind),
            ));
        }
        Ok((file, len, footer))
    }

    fn parse_footer(file: &mut File, path: &Path, len: u64) -> Result<Footer, EssenceError> {
        if len < MAGIC.len() as u64 + TRAILER_LEN {
            return Err(EssenceError::open(path, "file too short for a framed container"));
        }

        let mut magic = [0u8; 8];
        file.read_exact(&mut magic)
            .map_err(|e| EssenceError::open(path, e))?;
        if &magic != MAGIC {
            return Err(EssenceError::open(path, "not a framed container"));
        }

        let mut trailer = [0u8; 16];
        file.seek(SeekFrom::End(-(TRAILER_LEN as i64)))
            .and_then(|_| file.read_exact(&mut trailer))
            .map_err(|e| EssenceError::open(path, e))?;
        let mut footer_len = [0u8; 8];
        footer_len.copy_from_slice(&trailer[..8]);
        let footer_len = u64::from_le_bytes(footer_len);
        if &trailer[8..] != MAGIC || footer_len > len - TRAILER_LEN - MAGIC.len() as u64 {
            return Err(EssenceError::open(path, "truncated framed container"));
        }

        let mut raw = vec![0u8; footer_len as usize];
        file.seek(SeekFrom::Start(len - TRAILER_LEN - footer_len))
            .and_then(|_| file.read_exact(&mut raw))
            .map_err(|e| EssenceError::open(path, e))?;
        serde_json::from_slice(&raw).map_err(|e| EssenceError::open(path, e))
    }
}

impl EssenceBackend for FramedBackend {
    fn name(&self) -> &'static str {
        "framed"
    }

    fn read_descriptor(
        &self,
        path: &Path,
        kind: EssenceKind,
    ) -> Result<EssenceDescriptor, EssenceError> {
        let (_, _, footer) = self.open(path, kind)?;
        let mut descriptor = footer.descriptor;
        descriptor.set_intrinsic_duration(footer.frames.len() as i64);
        Ok(descriptor)
    }

    fn read_frame(
        &self,
        path: &Path,
        kind: EssenceKind,
        index: i64,
    ) -> Result<Frame, EssenceError> {
        let (mut file, len, footer) = self.open(path, kind)?;
        let count = footer.frames.len() as i64;
        let offset = usize::try_from(index)
            .ok()
            .and_then(|i| footer.frames.get(i))
            .copied()
            .ok_or_else(|| EssenceError::FrameOutOfRange {
                path: path.to_path_buf(),
                index,
                count,
            })?;

        let failed = |reason: String| EssenceError::ReadFrame {
            path: path.to_path_buf(),
            index,
            reason,
        };

        file.seek(SeekFrom::Start(offset))
            .map_err(|e| failed(e.to_string()))?;
        let mut parts = Vec::with_capacity(kind.parts_per_frame());
        for _ in 0..kind.parts_per_frame() {
            let mut size = [0u8; 4];
            file.read_exact(&mut size)
                .map_err(|e| failed(e.to_string()))?;
            let size = u64::from(u32::from_le_bytes(size));
            if size > len {
                return Err(failed(format!("buffer length {size} exceeds file size")));
            }
            let mut data = vec![0u8; size as usize];
            file.read_exact(&mut data)
                .map_err(|e| failed(e.to_string()))?;
            parts.push(data);
        }
        Frame::from_parts(kind, parts).ok_or_else(|| failed("wrong buffer count".to_owned()))
    }

    fn open_for_write(
        &self,
        path: &Path,
        kind: EssenceKind,
        descriptor: &EssenceDescriptor,
        info: &WriterInfo,
        overwrite: bool,
    ) -> Result<Box<dyn EssenceWriter>, EssenceError> {
        if info.encryption.is_some() {
            return Err(EssenceError::Unsupported {
                backend: self.name().to_owned(),
                feature: "encryption",
            });
        }
        if !descriptor.fits(kind) {
            return Err(EssenceError::write(
                path,
                format!("descriptor does not describe {kind} essence"),
            ));
        }
        if !overwrite && path.exists() {
            return Err(EssenceError::AlreadyExists(path.to_path_buf()));
        }

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir).map_err(|e| EssenceError::write(path, e))?;
        let mut out = BufWriter::new(tmp);
        out.write_all(MAGIC)
            .map_err(|e| EssenceError::write(path, e))?;

        debug!("writing {kind} essence to {}", path.display());
        Ok(Box::new(FramedWriter {
            path: path.to_path_buf(),
            out,
            overwrite,
            position: MAGIC.len() as u64,
            footer: Footer {
                kind,
                descriptor: *descriptor,
                asset_id: info.asset_id,
                company_name: info.company_name.clone(),
                product_name: info.product_name.clone(),
                product_version: info.product_version.clone(),
                frames: Vec::new(),
            },
        }))
    }

    fn picture_decoder(&self) -> Option<&dyn PictureDecoder> {
        self.decoder.as_ref().map(|d| d as &dyn PictureDecoder)
    }
}

struct FramedWriter {
    path: PathBuf,
    out: BufWriter<NamedTempFile>,
    overwrite: bool,
    position: u64,
    footer: Footer,
}

impl EssenceWriter for FramedWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), EssenceError> {
        if frame.kind() != self.footer.kind {
            return Err(EssenceError::FrameKindMismatch(self.footer.kind));
        }
        let offset = self.position;
        for part in frame.parts() {
            let size = u32::try_from(part.len()).map_err(|_| {
                EssenceError::write(&self.path, "frame buffer larger than 4 GiB")
            })?;
            self.out
                .write_all(&size.to_le_bytes())
                .and_then(|()| self.out.write_all(part))
                .map_err(|e| EssenceError::write(&self.path, e))?;
            self.position += 4 + u64::from(size);
        }
        self.footer.frames.push(offset);
        Ok(())
    }

    fn frames_written(&self) -> i64 {
        self.footer.frames.len() as i64
    }

    fn finalize(self: Box<Self>) -> Result<i64, EssenceError> {
        let FramedWriter {
            path,
            mut out,
            overwrite,
            mut footer,
            ..
        } = *self;
        let count = footer.frames.len() as i64;
        footer.descriptor.set_intrinsic_duration(count);

        let json = serde_json::to_vec(&footer).map_err(|e| EssenceError::write(&path, e))?;
        out.write_all(&json)
            .and_then(|()| out.write_all(&(json.len() as u64).to_le_bytes()))
            .and_then(|()| out.write_all(MAGIC))
            .map_err(|e| EssenceError::write(&path, e))?;

        let tmp = out
            .into_inner()
            .map_err(|e| EssenceError::write(&path, e.into_error()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| EssenceError::write(&path, e))?;
        let persisted = if overwrite {
            tmp.persist(&path)
        } else {
            tmp.persist_noclobber(&path)
        };
        persisted.map_err(|e| EssenceError::write(&path, e.error))?;

        debug!("finalized {} with {count} frames", path.display());
        Ok(count)
    }
}
