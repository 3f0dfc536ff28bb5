//!
//! IPP reader
//!
use std::io::{self, Read};

use bytes::Bytes;

use crate::{model::IppVersion, util::decode_text, IppHeader};

/// Synchronous IPP reader contains a set of methods to read from IPP data stream
pub struct IppReader<R> {
    inner: R,
}

impl<R> IppReader<R>
where
    R: Read,
{
    /// Create IppReader from Read instance
    pub fn new(inner: R) -> Self {
        IppReader { inner }
    }

    fn read_bytes(&mut self, len: usize) -> io::Result<Bytes> {
        let mut buf = vec![0; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf.into())
    }

    fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_i32(&mut self) -> io::Result<i32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    // lengths are signed on the wire
    fn read_len(&mut self) -> io::Result<usize> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        let len = i16::from_be_bytes(buf);
        usize::try_from(len).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, format!("negative length {len}")))
    }

    /// Read tag, `None` when the stream ends cleanly before the tag byte
    pub fn read_tag(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Read IPP name from [len; name] element
    pub fn read_name(&mut self) -> io::Result<String> {
        let name_len = self.read_len()?;
        self.read_bytes(name_len).map(|b| decode_text(&b))
    }

    /// Read IPP value from [len; value] element
    pub fn read_value(&mut self) -> io::Result<Bytes> {
        let value_len = self.read_len()?;
        self.read_bytes(value_len)
    }

    /// Read IPP header
    pub fn read_header(&mut self) -> io::Result<IppHeader> {
        let major = self.read_u8()?;
        let minor = self.read_u8()?;
        let operation_status = self.read_u16()?;
        let request_id = self.read_i32()?;

        Ok(IppHeader::new(IppVersion::new(major, minor), operation_status, request_id))
    }

    /// Mutable access to the remaining stream
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Release the remaining stream
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> From<R> for IppReader<R>
where
    R: Read,
{
    fn from(r: R) -> Self {
        IppReader::new(r)
    }
}
