//! Frame sinks for the offline runtime.

use std::fs;
use std::path::{Path, PathBuf};

use image::Rgba32FImage;
use tracing::info;

use super::RuntimeError;
use crate::compositor::frame_to_rgba8;
use crate::params::RecordingConfig;

/// Consumer of composited frames
pub trait FrameSink {
    /// Accept frame `index`
    fn write_frame(&mut self, index: u64, frame: &Rgba32FImage) -> Result<(), RuntimeError>;

    /// Keep everything written so far
    fn finish(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Drop everything written so far
    fn discard(&mut self) -> Result<(), RuntimeError>;
}

/// PNG sequence (`frame_00000.png`, ...) for an external encoder
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl PngSequenceSink {
    /// Create the output directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, RuntimeError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| RuntimeError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FrameSink for PngSequenceSink {
    fn write_frame(&mut self, index: u64, frame: &Rgba32FImage) -> Result<(), RuntimeError> {
        let path = RecordingConfig::frame_path(&self.dir, index);
        frame_to_rgba8(frame).save(&path)?;
        self.written.push(path);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RuntimeError> {
        info!(
            frames = self.written.len(),
            dir = %self.dir.display(),
            "PNG sequence complete"
        );
        Ok(())
    }

    fn discard(&mut self) -> Result<(), RuntimeError> {
        for path in self.written.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(RuntimeError::Io { path, source }),
            }
        }
        info!(dir = %self.dir.display(), "Discarded partial PNG sequence");
        Ok(())
    }
}

/// Keeps frames in memory (tests, previews)
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<Rgba32FImage>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, _index: u64, frame: &Rgba32FImage) -> Result<(), RuntimeError> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RuntimeError> {
        self.finished = true;
        Ok(())
    }

    fn discard(&mut self) -> Result<(), RuntimeError> {
        self.frames.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_sequence_names_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSequenceSink::new(dir.path().join("frames")).unwrap();
        let frame = Rgba32FImage::from_pixel(4, 2, Rgba([1.0, 0.5, 0.0, 1.0]));

        sink.write_frame(0, &frame).unwrap();
        sink.write_frame(1, &frame).unwrap();

        let first = dir.path().join("frames/frame_00000.png");
        assert!(first.exists());
        assert!(dir.path().join("frames/frame_00001.png").exists());

        let decoded = image::open(&first).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 128, 0, 255]);

        sink.discard().unwrap();
        assert!(!first.exists());
        assert!(sink.written().is_empty());
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        let frame = Rgba32FImage::new(2, 2);
        sink.write_frame(0, &frame).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.frames.len(), 1);
        assert!(sink.finished);

        sink.discard().unwrap();
        assert!(sink.frames.is_empty());
    }
}
