//!
//! IPP payload
//!
use std::io::{self, Read};

/// Document data following the end-of-attributes tag.
///
/// Bytes inspected with [`IppPayload::probe`] are buffered and still returned by `read`.
pub struct IppPayload<R> {
    prefix: Vec<u8>,
    pos: usize,
    inner: R,
}

impl<R> IppPayload<R>
where
    R: Read,
{
    pub fn new(inner: R) -> Self {
        IppPayload {
            prefix: Vec::new(),
            pos: 0,
            inner,
        }
    }

    /// Buffer up to `limit` bytes and return how many are available, fewer only at end of stream
    pub fn probe(&mut self, limit: usize) -> io::Result<usize> {
        let mut chunk = [0u8; 512];
        while self.prefix.len() - self.pos < limit {
            let wanted = (limit - (self.prefix.len() - self.pos)).min(chunk.len());
            match self.inner.read(&mut chunk[..wanted]) {
                Ok(0) => break,
                Ok(n) => self.prefix.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok((self.prefix.len() - self.pos).min(limit))
    }
}

impl<R> Read for IppPayload<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.prefix.len() {
            let n = (self.prefix.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.prefix[self.pos..self.pos + n]);
            self.pos += n;
            return Ok(n);
        }
        self.inner.read(buf)
    }
}
