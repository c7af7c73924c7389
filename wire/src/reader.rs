use crate::{
    config::WireConfig,
    error::CodecError,
    primitive::Primitive,
    LENGTH_PREFIX_SIZE,
};

/// A KProto reader over a borrowed byte slice.
///
/// Reads mirror [`ByteWriter`](crate::ByteWriter): every read checks the
/// bytes left before consuming anything, and a failed read leaves the cursor
/// where it was.
///
/// ```
/// let mut r = kproto_wire::ByteReader::new(&[2, 0, 1, 0, 2, 0]);
/// assert_eq!(r.read_u16_array(), Ok(vec![1, 2]));
/// assert!(r.read_u8().is_err());
/// assert_eq!(r.offset(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data:   &'a [u8],
    offset: usize,
    config: WireConfig,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> ByteReader<'a> {
        ByteReader::with_config(data, WireConfig::default())
    }

    pub fn with_config(data: &'a [u8], config: WireConfig) -> ByteReader<'a> {
        ByteReader { data, offset: 0, config }
    }

    pub fn config(&self) -> WireConfig {
        self.config
    }

    /// Rebind the reader to a new buffer and move the cursor back to zero.
    pub fn reset(&mut self, data: &'a [u8]) {
        self.data = data;
        self.offset = 0;
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current cursor position. This starts off as 0 and ends up as
    /// `self.len()` when everything has been read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn check(&self, needed: usize) -> Result<(), CodecError> {
        let remaining = self.remaining();
        if remaining < needed {
            Err(CodecError::EndOfBuffer { needed, remaining })
        } else {
            Ok(())
        }
    }

    // Callers have already checked that the bytes are there.
    fn take<T: Primitive>(&mut self) -> T {
        let value = T::get(self.config.byte_order, &self.data[self.offset..]);
        self.offset += T::WIDTH;
        value
    }

    fn peek_length(&self) -> Result<usize, CodecError> {
        self.check(LENGTH_PREFIX_SIZE)?;
        Ok(u16::get(self.config.byte_order, &self.data[self.offset..]) as usize)
    }

    /// Run `read` against a copy of the cursor and only commit it on success.
    fn atomically<T>(
        &mut self,
        read: impl FnOnce(&mut ByteReader<'a>) -> Result<T, CodecError>,
    ) -> Result<T, CodecError> {
        let mut probe = self.clone();
        let value = read(&mut probe)?;
        self.offset = probe.offset;
        Ok(value)
    }

    /// Borrow an opaque run of `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.check(len)?;
        let value = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(value)
    }

    /// Fill `out` with the next `out.len()` bytes.
    pub fn read_into(&mut self, out: &mut [u8]) -> Result<(), CodecError> {
        let bytes = self.read_bytes(out.len())?;
        out.copy_from_slice(bytes);
        Ok(())
    }

    /// Read a `u16` length prefix.
    pub fn read_length(&mut self) -> Result<usize, CodecError> {
        let len = self.peek_length()?;
        self.offset += LENGTH_PREFIX_SIZE;
        Ok(len)
    }

    pub fn read_primitive<T: Primitive>(&mut self) -> Result<T, CodecError> {
        self.check(T::WIDTH)?;
        Ok(self.take())
    }

    /// Read a length prefix and that many elements.
    pub fn read_primitive_array<T: Primitive>(&mut self) -> Result<Vec<T>, CodecError> {
        let len = self.peek_length()?;
        self.check(LENGTH_PREFIX_SIZE + len * T::WIDTH)?;
        self.offset += LENGTH_PREFIX_SIZE;
        Ok((0..len).map(|_| self.take()).collect())
    }

    /// Read a length-prefixed string, borrowing it from the buffer.
    pub fn read_str(&mut self) -> Result<&'a str, CodecError> {
        let len = self.peek_length()?;
        self.check(LENGTH_PREFIX_SIZE + len)?;
        let start = self.offset + LENGTH_PREFIX_SIZE;
        let value = std::str::from_utf8(&self.data[start..start + len])
            .map_err(|_| CodecError::InvalidUtf8 { offset: start })?;
        self.offset = start + len;
        Ok(value)
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        self.read_str().map(str::to_owned)
    }

    pub fn read_string_array(&mut self) -> Result<Vec<String>, CodecError> {
        self.atomically(|r| {
            let len = r.read_length()?;
            (0..len).map(|_| r.read_string()).collect()
        })
    }
}

macro_rules! primitive_readers {
    ($($ty:ty => $scalar:ident, $array:ident;)*) => {
        impl<'a> ByteReader<'a> {
            $(
                #[doc = concat!("Read one `", stringify!($ty), "`.")]
                pub fn $scalar(&mut self) -> Result<$ty, CodecError> {
                    self.read_primitive()
                }

                #[doc = concat!("Read a length-prefixed array of `", stringify!($ty), "`.")]
                pub fn $array(&mut self) -> Result<Vec<$ty>, CodecError> {
                    self.read_primitive_array()
                }
            )*
        }
    };
}

primitive_readers! {
    bool => read_bool, read_bool_array;
    u8   => read_byte, read_byte_array;
    u8   => read_u8,   read_u8_array;
    i8   => read_i8,   read_i8_array;
    u16  => read_u16,  read_u16_array;
    i16  => read_i16,  read_i16_array;
    u32  => read_u32,  read_u32_array;
    i32  => read_i32,  read_i32_array;
    u64  => read_u64,  read_u64_array;
    i64  => read_i64,  read_i64_array;
    f32  => read_f32,  read_f32_array;
    f64  => read_f64,  read_f64_array;
}

#[test]
fn read_scalars() {
    let mut r = ByteReader::new(&[
        1, 0, 255, 255, 0xFF, 0xFF, 0, 0, 0, 128, 1, 0, 0, 0, 0, 0, 0, 0,
    ]);
    assert_eq!(r.read_bool(), Ok(true));
    assert_eq!(r.read_bool(), Ok(false));
    assert_eq!(r.read_byte(), Ok(255));
    assert_eq!(r.read_i8(), Ok(-1));
    assert_eq!(r.read_u16(), Ok(u16::MAX));
    assert_eq!(r.read_i32(), Ok(i32::MIN));
    assert_eq!(r.read_u64(), Ok(1));
    assert_eq!(r.remaining(), 0);
}

#[test]
fn read_floats() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1.5f32.to_bits().to_le_bytes());
    bytes.extend_from_slice(&f64::MIN.to_bits().to_le_bytes());
    let mut r = ByteReader::new(&bytes);
    assert_eq!(r.read_f32(), Ok(1.5));
    assert_eq!(r.read_f64(), Ok(f64::MIN));
}

#[test]
fn read_arrays_and_strings() {
    let mut r = ByteReader::new(&[0, 0, 2, 0, 1, 0, 255, 255, 3, 0, 97, 98, 99, 0, 0]);
    assert_eq!(r.read_u8_array(), Ok(vec![]));
    assert_eq!(r.read_i16_array(), Ok(vec![1, -1]));
    assert_eq!(r.read_string(), Ok("abc".to_owned()));
    assert_eq!(r.read_str(), Ok(""));
    assert_eq!(r.remaining(), 0);

    let mut r = ByteReader::new(&[3, 0, 1, 0, 97, 0, 0, 2, 0, 98, 99]);
    assert_eq!(
        r.read_string_array(),
        Ok(vec!["a".to_owned(), String::new(), "bc".to_owned()])
    );
}

#[test]
fn read_big_endian() {
    let mut r = ByteReader::with_config(&[1, 2, 3, 4, 0, 1, 97], WireConfig::big_endian());
    assert_eq!(r.read_u32(), Ok(0x0102_0304));
    assert_eq!(r.read_string(), Ok("a".to_owned()));
}

#[test]
fn read_out_of_data_leaves_cursor() {
    let mut r = ByteReader::new(&[1, 0, 0]);
    assert_eq!(
        r.read_u32(),
        Err(CodecError::EndOfBuffer { needed: 4, remaining: 3 })
    );
    assert_eq!(r.offset(), 0);

    // The length prefix fits but the payload does not.
    let mut r = ByteReader::new(&[4, 0, 1, 2]);
    assert_eq!(
        r.read_u8_array(),
        Err(CodecError::EndOfBuffer { needed: 6, remaining: 4 })
    );
    assert_eq!(r.offset(), 0);
    assert!(r.read_string().is_err());
    assert_eq!(r.offset(), 0);

    // Second element is truncated.
    let mut r = ByteReader::new(&[2, 0, 1, 0, 97, 5, 0]);
    assert!(r.read_string_array().is_err());
    assert_eq!(r.offset(), 0);
}

#[test]
fn read_invalid_utf8() {
    let mut r = ByteReader::new(&[2, 0, 0xC3, 0x28]);
    assert_eq!(r.read_string(), Err(CodecError::InvalidUtf8 { offset: 2 }));
    assert_eq!(r.offset(), 0);
}

#[test]
fn read_raw_bytes() {
    let mut r = ByteReader::new(&[1, 2, 3, 4, 5]);
    assert_eq!(r.read_bytes(3), Ok([1u8, 2, 3].as_slice()));
    let mut out = [0u8; 2];
    r.read_into(&mut out).unwrap();
    assert_eq!(out, [4, 5]);
    assert!(r.read_bytes(1).is_err());
    r.reset(&[9]);
    assert_eq!(r.offset(), 0);
    assert_eq!(r.len(), 1);
    assert_eq!(r.read_byte(), Ok(9));
}
