//! Streaming encryption into a writer.
//!
//! [`EncryptingWriter`] encrypts each chunk it is given and forwards the
//! ciphertext to a sink. A chunk shorter than the cipher's block size marks
//! the end of the message; [`EncryptingWriter::write_tag`] appends the tag.
//! Concatenating everything written before the tag yields a ciphertext that
//! decrypts in one call with the session's IV.

use std::io::{self, Write};
use tracing::debug;

use crate::cipher::SecureCipher;
use prisma_common::{Error, Result};

/// Whether the writer still accepts data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Open,
    Finished,
}

/// Encrypting adapter in front of a [`Write`] sink.
pub struct EncryptingWriter<'a, C: SecureCipher, W: Write> {
    cipher: &'a mut C,
    sink: W,
    state: StreamState,
}

impl<'a, C: SecureCipher, W: Write> EncryptingWriter<'a, C, W> {
    /// Wrap `sink`, encrypting with `cipher`.
    pub fn new(cipher: &'a mut C, sink: W) -> Self {
        Self {
            cipher,
            sink,
            state: StreamState::Open,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The underlying cipher session.
    pub fn cipher(&self) -> &C {
        &*self.cipher
    }

    /// Encrypt `chunk` and forward it to the sink.
    ///
    /// # Postconditions
    /// - An empty chunk finishes the stream without output
    /// - A chunk shorter than the block size is padded, written, and
    ///   finishes the stream
    ///
    /// # Errors
    /// - `Exhausted` if the stream has already finished
    /// - `Io` if the sink fails
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<usize> {
        if self.state == StreamState::Finished {
            return Err(Error::Exhausted);
        }
        if chunk.is_empty() {
            self.finish_stream();
            return Ok(0);
        }

        let encrypted = self.cipher.encrypt(chunk)?;
        self.sink.write_all(&encrypted)?;
        if chunk.len() < self.cipher.block_size() {
            self.finish_stream();
        }
        Ok(encrypted.len())
    }

    /// Finish the stream and write the tag to the sink.
    ///
    /// # Errors
    /// - `Io` if the sink fails or accepts fewer bytes than the tag size
    pub fn write_tag(&mut self) -> Result<()> {
        self.finish_stream();
        let tag = self.cipher.finish()?;
        let written = self.sink.write(&tag)?;
        if written != self.cipher.tag_size() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!(
                    "wrote {} of {} tag bytes",
                    written,
                    self.cipher.tag_size()
                ),
            )));
        }
        self.sink.flush()?;
        Ok(())
    }

    /// Write the tag and hand back the sink.
    pub fn close(mut self) -> Result<W> {
        self.write_tag()?;
        Ok(self.sink)
    }

    /// Start a new message on `sink`, returning the previous sink.
    ///
    /// The session keeps its key and IV; only its running tag and
    /// chaining state restart.
    pub fn reset(&mut self, sink: W) -> W {
        self.cipher.reset();
        self.state = StreamState::Open;
        debug!("Encrypting stream reset");
        std::mem::replace(&mut self.sink, sink)
    }

    fn finish_stream(&mut self) {
        if self.state == StreamState::Open {
            debug!("Encrypting stream finished");
            self.state = StreamState::Finished;
        }
    }
}

impl<C: SecureCipher, W: Write> Write for EncryptingWriter<'_, C, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.write_chunk(buf) {
            Ok(_) => Ok(buf.len()),
            Err(Error::Exhausted) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "encrypting stream already finished",
            )),
            Err(Error::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}
