use crate::essence::{EssenceDescriptor, EssenceKind, Frame, WriterInfo};
use crate::EssenceError;
use std::path::Path;
use std::sync::Arc;

/// Access to essence containers on disk.
///
/// Every call opens the file it needs and releases it before returning, so no
/// handle outlives a call, including on error paths.
pub trait EssenceBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Read the descriptor of the essence at `path`, failing if the file is
    /// not a container of `kind`.
    fn read_descriptor(
        &self,
        path: &Path,
        kind: EssenceKind,
    ) -> Result<EssenceDescriptor, EssenceError>;

    /// Read the compressed buffer(s) of frame `index`.
    fn read_frame(&self, path: &Path, kind: EssenceKind, index: i64)
        -> Result<Frame, EssenceError>;

    /// Start writing a container of `kind` at `path`. With `overwrite` unset
    /// an existing file is an error.
    fn open_for_write(
        &self,
        path: &Path,
        kind: EssenceKind,
        descriptor: &EssenceDescriptor,
        info: &WriterInfo,
        overwrite: bool,
    ) -> Result<Box<dyn EssenceWriter>, EssenceError>;

    /// Decoder for the compressed picture buffers this backend stores, if it
    /// has one.
    fn picture_decoder(&self) -> Option<&dyn PictureDecoder> {
        None
    }
}

/// A container being written, one frame per call in presentation order.
///
/// Dropping a writer without calling [`finalize`](Self::finalize) discards
/// the partial file.
pub trait EssenceWriter: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), EssenceError>;

    fn frames_written(&self) -> i64;

    /// Complete the container and return the number of frames it holds.
    fn finalize(self: Box<Self>) -> Result<i64, EssenceError>;
}

/// Turns one compressed picture buffer into component samples.
pub trait PictureDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<Vec<i32>, EssenceError>;
}

pub fn select_backend(name: &str) -> Result<Arc<dyn EssenceBackend>, EssenceError> {
    match name {
        "framed" => Ok(Arc::new(crate::framed::FramedBackend::new())),
        other => Err(EssenceError::BackendUnavailable(other.to_owned())),
    }
}
