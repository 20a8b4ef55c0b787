use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::checked_range;
use crate::worker::IoWorker;
use crate::{BackendError, BlockBackend, IoCompletion, IoReply, OpenFlags, Result};

/// Host file (raw image) backend.
///
/// Reads are bounds-checked against the current file length; writes past the end grow the file.
/// Positional I/O is used, so the file cursor is never touched and no lock is needed around the
/// handle.
pub struct FileBackend {
    file: Arc<File>,
    path: PathBuf,
    read_only: bool,
    worker: IoWorker,
}

impl FileBackend {
    pub fn open(path: impl AsRef<Path>, flags: OpenFlags) -> Result<Self> {
        let path = path.as_ref();
        let read_only = flags.is_read_only();
        let file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .create(!read_only && flags.contains(OpenFlags::CREATE))
            .open(path)
            .map_err(|err| BackendError::Io(format!("open {}: {err}", path.display())))?;
        tracing::debug!(path = %path.display(), read_only, "opened file backend");
        Self::from_parts(file, path.to_path_buf(), read_only)
    }

    pub fn from_file(file: File, read_only: bool) -> Result<Self> {
        Self::from_parts(file, PathBuf::new(), read_only)
    }

    fn from_parts(file: File, path: PathBuf, read_only: bool) -> Result<Self> {
        Ok(Self {
            file: Arc::new(file),
            path,
            read_only,
            worker: IoWorker::spawn("simdisk-file-io")?,
        })
    }
}

impl BlockBackend for FileBackend {
    fn read(&self, offset: u64, len: usize, done: IoCompletion) {
        let file = Arc::clone(&self.file);
        self.worker.run(
            move || {
                let capacity = file.metadata()?.len();
                checked_range(offset, len, capacity)?;
                let mut buf = vec![0u8; len];
                read_exact_at(&file, &mut buf, offset)?;
                Ok(IoReply::Read(buf))
            },
            done,
        );
    }

    fn write(&self, offset: u64, data: Vec<u8>, done: IoCompletion) {
        if self.read_only {
            done(Err(BackendError::ReadOnly));
            return;
        }
        let file = Arc::clone(&self.file);
        self.worker.run(
            move || {
                offset
                    .checked_add(data.len() as u64)
                    .ok_or(BackendError::OffsetOverflow)?;
                write_all_at(&file, &data, offset)?;
                Ok(IoReply::Written)
            },
            done,
        );
    }

    fn length(&self) -> Result<u64> {
        if self.worker.is_closed() {
            return Err(BackendError::Closed);
        }
        Ok(self.file.metadata()?.len())
    }

    fn close(&self) -> Result<()> {
        self.worker.shutdown();
        if !self.read_only {
            self.file
                .sync_all()
                .map_err(|err| BackendError::Io(format!("sync {}: {err}", self.path.display())))?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset)? {
            0 => return Err(std::io::ErrorKind::UnexpectedEof.into()),
            n => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset)? {
            0 => return Err(std::io::ErrorKind::WriteZero.into()),
            n => {
                buf = &buf[n..];
                offset += n as u64;
            }
        }
    }
    Ok(())
}
