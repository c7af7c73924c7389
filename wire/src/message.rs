use crate::{
    config::WireConfig,
    error::CodecError,
    reader::ByteReader,
    writer::ByteWriter,
};

/// Implemented by every record type generated from a KProto schema.
///
/// `write` emits one encode step per field in declaration order and `read`
/// consumes them in the same order. `MAX_SIZE` is the worst-case encoded
/// length when every array and string stays within its declared length
/// marker.
pub trait Message: Sized {
    /// Numeric message ID assigned by the schema.
    const ID: u16;

    const MAX_SIZE: usize;

    fn write(&self, w: &mut ByteWriter<'_>) -> Result<(), CodecError>;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, CodecError>;

    /// Encode into `buf` and return the number of bytes written.
    fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        self.encode_with(buf, WireConfig::default())
    }

    fn encode_with(&self, buf: &mut [u8], config: WireConfig) -> Result<usize, CodecError> {
        let mut w = ByteWriter::with_config(buf, config);
        self.write(&mut w)?;
        Ok(w.offset())
    }

    /// Encode into a freshly allocated buffer of `MAX_SIZE` bytes, trimmed to
    /// the bytes actually written.
    fn encode_to_vec(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = vec![0u8; Self::MAX_SIZE];
        let len = self.encode(&mut buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        Self::decode_with(buf, WireConfig::default())
    }

    fn decode_with(buf: &[u8], config: WireConfig) -> Result<Self, CodecError> {
        Self::read(&mut ByteReader::with_config(buf, config))
    }
}
