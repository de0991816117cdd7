//! Upload source and download sink helpers.
//!
//! Payloads are never buffered whole: file sources are opened as async
//! readers and wrapped in a [`LengthCheckedReader`] so a source that yields
//! more or fewer bytes than declared fails the upload instead of sending a
//! truncated object.

use crate::error::{RequestError, S3Error};
use pin_project_lite::pin_project;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

/// Content type used when nothing better is known.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pin_project! {
    /// Reader that enforces a declared length on its inner reader.
    pub struct LengthCheckedReader<R> {
        #[pin]
        inner: R,
        declared: u64,
        read: u64,
    }
}

impl<R> LengthCheckedReader<R> {
    /// Wrap `inner`, which must yield exactly `declared` bytes.
    pub fn new(inner: R, declared: u64) -> Self {
        Self {
            inner,
            declared,
            read: 0,
        }
    }

    /// Bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    /// Declared length.
    pub fn declared(&self) -> u64 {
        self.declared
    }
}

impl<R: AsyncRead> AsyncRead for LengthCheckedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let remaining = *this.declared - *this.read;
        if remaining == 0 {
            // Anything past the declared length is an overrun; `buf` stays untouched.
            let mut extra = [0u8; 1];
            let mut extra_buf = ReadBuf::new(&mut extra);
            ready!(this.inner.poll_read(cx, &mut extra_buf))?;
            if !extra_buf.filled().is_empty() {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "source produced more than the {} declared bytes",
                        this.declared
                    ),
                )));
            }
            return Poll::Ready(Ok(()));
        }

        let limit = remaining.min(buf.remaining() as u64) as usize;
        let mut limited = ReadBuf::new(buf.initialize_unfilled_to(limit));
        ready!(this.inner.poll_read(cx, &mut limited))?;
        let n = limited.filled().len();

        if n == 0 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "source ended after {} of {} declared bytes",
                    this.read, this.declared
                ),
            )));
        }

        buf.advance(n);
        *this.read += n as u64;
        Poll::Ready(Ok(()))
    }
}

/// Open a file as an upload source and return it with its length.
pub async fn open_file_source(path: &Path) -> Result<(File, u64), S3Error> {
    let unreadable = |e: io::Error| {
        S3Error::Request(RequestError::SourceUnreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    };

    let file = File::open(path).await.map_err(unreadable)?;
    let metadata = file.metadata().await.map_err(unreadable)?;
    if !metadata.is_file() {
        return Err(S3Error::Request(RequestError::SourceUnreadable {
            path: path.display().to_string(),
            message: "not a regular file".to_string(),
        }));
    }
    Ok((file, metadata.len()))
}

/// Create (or truncate) a download destination.
pub async fn create_file_sink(path: &Path) -> Result<File, S3Error> {
    File::create(path).await.map_err(|e| {
        S3Error::Request(RequestError::DestinationUnwritable {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    })
}

/// Guess a content type from a file extension.
pub fn detect_content_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_length_checked_reader_exact() {
        let mut reader = LengthCheckedReader::new(Cursor::new(vec![1u8; 100]), 100);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out.len(), 100);
        assert_eq!(reader.bytes_read(), 100);
    }

    #[tokio::test]
    async fn test_length_checked_reader_short_source() {
        let mut reader = LengthCheckedReader::new(Cursor::new(vec![1u8; 10]), 100);
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_length_checked_reader_long_source() {
        let mut reader = LengthCheckedReader::new(Cursor::new(vec![1u8; 200]), 100);
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_length_checked_reader_overrun_fills_nothing() {
        let mut reader = LengthCheckedReader::new(Cursor::new(vec![7u8; 200]), 100);
        let mut chunk = [0u8; 64];

        assert_eq!(reader.read(&mut chunk).await.unwrap(), 64);
        assert_eq!(reader.read(&mut chunk).await.unwrap(), 36);
        assert_eq!(reader.bytes_read(), 100);

        let mut buf = ReadBuf::new(&mut chunk);
        let err = std::future::poll_fn(|cx| Pin::new(&mut reader).poll_read(cx, &mut buf))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(buf.filled().is_empty());
        assert_eq!(reader.bytes_read(), 100);
    }

    #[tokio::test]
    async fn test_length_checked_reader_long_source_keeps_declared_prefix() {
        let mut reader = LengthCheckedReader::new(Cursor::new(vec![1u8; 200]), 100);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(out.len(), 100);
    }

    #[tokio::test]
    async fn test_open_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();

        let (_, length) = open_file_source(file.path()).await.unwrap();
        assert_eq!(length, 11);
    }

    #[tokio::test]
    async fn test_open_file_source_missing() {
        let result = open_file_source(Path::new("/no/such/input.bin")).await;
        assert!(matches!(
            result,
            Err(S3Error::Request(RequestError::SourceUnreadable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_create_file_sink_unwritable() {
        let result = create_file_sink(Path::new("/no/such/dir/output.bin")).await;
        assert!(matches!(
            result,
            Err(S3Error::Request(RequestError::DestinationUnwritable { .. }))
        ));
    }

    #[test]
    fn test_detect_content_type() {
        assert_eq!(
            detect_content_type(Path::new("photo.jpg")).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(
            detect_content_type(Path::new("notes.txt")).as_deref(),
            Some("text/plain")
        );
        assert_eq!(detect_content_type(Path::new("no_extension")), None);
    }
}
