//! Positional file I/O helpers.
//!
//! The file backend never seeks a shared cursor: every read and write
//! targets an explicit offset, so a reader and a writer sharing one file
//! descriptor never race over `lseek`.

use std::fs::File;
use std::io;

use crate::error::{Error, IoErrorKind};

#[cfg(unix)]
fn read_at_raw(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_at_raw(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

#[cfg(unix)]
fn write_at_raw(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.write_at(buf, offset)
}

#[cfg(windows)]
fn write_at_raw(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_write(buf, offset)
}

/// Read exactly `buf.len()` bytes starting at `offset`. A single
/// interrupted/would-block short read is retried once; anything else
/// surfaces as `Error::Io`.
pub fn read_exact_at(
    file: &File,
    buf: &mut [u8],
    offset: u64,
    context: &'static str,
) -> Result<(), Error> {
    let mut read = 0usize;
    let mut retried = false;
    while read < buf.len() {
        match read_at_raw(file, &mut buf[read..], offset + read as u64) {
            Ok(0) => {
                return Err(Error::Io {
                    context,
                    kind: IoErrorKind::Terminal,
                    source: io::Error::new(io::ErrorKind::UnexpectedEof, "short read"),
                })
            }
            Ok(n) => read += n,
            Err(e)
                if !retried
                    && matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) =>
            {
                tracing::warn!(%context, error = %e, "retrying interrupted positional read");
                retried = true;
            }
            Err(e) => return Err(Error::io(context, e)),
        }
    }
    Ok(())
}

/// Write all of `buf` starting at `offset`. A single interrupted/would-block
/// short write is retried once; anything else surfaces as `Error::Io`.
pub fn write_all_at(
    file: &File,
    buf: &[u8],
    offset: u64,
    context: &'static str,
) -> Result<(), Error> {
    let mut written = 0usize;
    let mut retried = false;
    while written < buf.len() {
        match write_at_raw(file, &buf[written..], offset + written as u64) {
            Ok(0) => {
                return Err(Error::io(
                    context,
                    io::Error::new(io::ErrorKind::WriteZero, "wrote zero bytes"),
                ))
            }
            Ok(n) => written += n,
            Err(e)
                if !retried
                    && matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) =>
            {
                tracing::warn!(%context, error = %e, "retrying interrupted positional write");
                retried = true;
            }
            Err(e) => return Err(Error::io(context, e)),
        }
    }
    Ok(())
}
