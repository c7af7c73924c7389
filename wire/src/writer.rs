use crate::{
    config::WireConfig,
    error::CodecError,
    primitive::Primitive,
    LENGTH_PREFIX_SIZE, MAX_LENGTH,
};

/// A KProto writer over a fixed-size buffer.
///
/// Every write checks the space left between the cursor and the end of the
/// buffer first. A write that does not fit returns
/// [`CodecError::EndOfBuffer`] and leaves both the buffer and the cursor
/// untouched.
///
/// ```
/// let mut buf = [0u8; 8];
/// let mut w = kproto_wire::ByteWriter::new(&mut buf);
/// w.write_u16_array(&[1, 2]).unwrap();
/// assert_eq!(w.written(), [2, 0, 1, 0, 2, 0]);
/// assert!(w.write_u32(7).is_err());
/// assert_eq!(w.offset(), 6);
/// ```
pub struct ByteWriter<'a> {
    data:   &'a mut [u8],
    offset: usize,
    config: WireConfig,
}

impl<'a> ByteWriter<'a> {
    /// Create a writer with the default (little endian) configuration.
    pub fn new(data: &'a mut [u8]) -> ByteWriter<'a> {
        ByteWriter::with_config(data, WireConfig::default())
    }

    pub fn with_config(data: &'a mut [u8], config: WireConfig) -> ByteWriter<'a> {
        ByteWriter { data, offset: 0, config }
    }

    pub fn config(&self) -> WireConfig {
        self.config
    }

    /// Rebind the writer to a new buffer and move the cursor back to zero.
    pub fn reset(&mut self, data: &'a mut [u8]) {
        self.data = data;
        self.offset = 0;
    }

    /// Current cursor position, which is also the number of bytes written.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total capacity of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// The bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.data[..self.offset]
    }

    /// Give up the writer and keep the written prefix of the buffer.
    pub fn into_written(self) -> &'a [u8] {
        let offset = self.offset;
        let data: &'a [u8] = self.data;
        &data[..offset]
    }

    fn check(&self, needed: usize) -> Result<(), CodecError> {
        let remaining = self.remaining();
        if remaining < needed {
            Err(CodecError::EndOfBuffer { needed, remaining })
        } else {
            Ok(())
        }
    }

    fn check_length(len: usize) -> Result<u16, CodecError> {
        if len > MAX_LENGTH {
            Err(CodecError::LengthOverflow { len })
        } else {
            Ok(len as u16)
        }
    }

    // Callers have already checked that the bytes fit.
    fn put<T: Primitive>(&mut self, value: T) {
        value.put(self.config.byte_order, &mut self.data[self.offset..]);
        self.offset += T::WIDTH;
    }

    fn put_slice(&mut self, bytes: &[u8]) {
        self.data[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
    }

    /// Copy an opaque run of bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.check(bytes.len())?;
        self.put_slice(bytes);
        Ok(())
    }

    /// Write a `u16` length prefix.
    pub fn write_length(&mut self, len: usize) -> Result<(), CodecError> {
        let len = Self::check_length(len)?;
        self.check(LENGTH_PREFIX_SIZE)?;
        self.put(len);
        Ok(())
    }

    pub fn write_primitive<T: Primitive>(&mut self, value: T) -> Result<(), CodecError> {
        self.check(T::WIDTH)?;
        self.put(value);
        Ok(())
    }

    /// Write a length prefix followed by each element.
    pub fn write_primitive_array<T: Primitive>(&mut self, values: &[T]) -> Result<(), CodecError> {
        let len = Self::check_length(values.len())?;
        self.check(LENGTH_PREFIX_SIZE + values.len() * T::WIDTH)?;
        self.put(len);
        for value in values {
            self.put(*value);
        }
        Ok(())
    }

    /// Write a length prefix followed by the raw UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        let len = Self::check_length(value.len())?;
        self.check(LENGTH_PREFIX_SIZE + value.len())?;
        self.put(len);
        self.put_slice(value.as_bytes());
        Ok(())
    }

    /// Write a length prefix followed by each string. The whole array is sized
    /// up front, so a failure writes nothing.
    pub fn write_string_array<S: AsRef<str>>(&mut self, values: &[S]) -> Result<(), CodecError> {
        let count = Self::check_length(values.len())?;
        let mut needed = LENGTH_PREFIX_SIZE;
        for value in values {
            let len = value.as_ref().len();
            Self::check_length(len)?;
            needed += LENGTH_PREFIX_SIZE + len;
        }
        self.check(needed)?;

        self.put(count);
        for value in values {
            let value = value.as_ref();
            self.put(value.len() as u16);
            self.put_slice(value.as_bytes());
        }
        Ok(())
    }
}

macro_rules! primitive_writers {
    ($($ty:ty => $scalar:ident, $array:ident;)*) => {
        impl<'a> ByteWriter<'a> {
            $(
                #[doc = concat!("Write one `", stringify!($ty), "`.")]
                pub fn $scalar(&mut self, value: $ty) -> Result<(), CodecError> {
                    self.write_primitive(value)
                }

                #[doc = concat!("Write a length-prefixed array of `", stringify!($ty), "`.")]
                pub fn $array(&mut self, values: &[$ty]) -> Result<(), CodecError> {
                    self.write_primitive_array(values)
                }
            )*
        }
    };
}

primitive_writers! {
    bool => write_bool, write_bool_array;
    u8   => write_byte, write_byte_array;
    u8   => write_u8,   write_u8_array;
    i8   => write_i8,   write_i8_array;
    u16  => write_u16,  write_u16_array;
    i16  => write_i16,  write_i16_array;
    u32  => write_u32,  write_u32_array;
    i32  => write_i32,  write_i32_array;
    u64  => write_u64,  write_u64_array;
    i64  => write_i64,  write_i64_array;
    f32  => write_f32,  write_f32_array;
    f64  => write_f64,  write_f64_array;
}

#[cfg(test)]
fn write_once(cb: impl FnOnce(&mut ByteWriter) -> Result<(), CodecError>) -> Vec<u8> {
    let mut buf = [0u8; 64];
    let mut w = ByteWriter::new(&mut buf);
    cb(&mut w).unwrap();
    w.written().to_vec()
}

#[test]
fn write_scalars() {
    assert_eq!(write_once(|w| w.write_bool(true)), [1]);
    assert_eq!(write_once(|w| w.write_bool(false)), [0]);
    assert_eq!(write_once(|w| w.write_byte(255)), [255]);
    assert_eq!(write_once(|w| w.write_i8(-1)), [255]);
    assert_eq!(write_once(|w| w.write_u16(u16::MAX)), [255, 255]);
    assert_eq!(write_once(|w| w.write_i16(i16::MIN)), [0, 128]);
    assert_eq!(write_once(|w| w.write_u32(1)), [1, 0, 0, 0]);
    assert_eq!(write_once(|w| w.write_i32(i32::MIN)), [0, 0, 0, 128]);
    assert_eq!(write_once(|w| w.write_u64(u64::MAX)), [255; 8]);
    assert_eq!(write_once(|w| w.write_i64(0)), [0; 8]);
    assert_eq!(write_once(|w| w.write_f32(0.0)), [0; 4]);
    assert_eq!(
        write_once(|w| w.write_f64(1.0)),
        [0, 0, 0, 0, 0, 0, 0xF0, 0x3F]
    );
}

#[test]
fn write_arrays_and_strings() {
    assert_eq!(write_once(|w| w.write_u8_array(&[])), [0, 0]);
    assert_eq!(write_once(|w| w.write_bool_array(&[true, false])), [2, 0, 1, 0]);
    assert_eq!(
        write_once(|w| w.write_i16_array(&[1, -1])),
        [2, 0, 1, 0, 255, 255]
    );
    assert_eq!(write_once(|w| w.write_string("")), [0, 0]);
    assert_eq!(write_once(|w| w.write_string("abc")), [3, 0, 97, 98, 99]);
    assert_eq!(
        write_once(|w| w.write_string_array(&["a", "", "bc"])),
        [3, 0, 1, 0, 97, 0, 0, 2, 0, 98, 99]
    );
}

#[test]
fn write_big_endian() {
    let mut buf = [0u8; 16];
    let mut w = ByteWriter::with_config(&mut buf, WireConfig::big_endian());
    w.write_u32(0x0102_0304).unwrap();
    w.write_string("a").unwrap();
    w.write_f32(1.0).unwrap();
    assert_eq!(w.written(), [1, 2, 3, 4, 0, 1, 97, 0x3F, 0x80, 0, 0]);
}

#[test]
fn write_out_of_space_leaves_cursor() {
    let mut buf = [0u8; 5];
    let mut w = ByteWriter::new(&mut buf);
    w.write_u32(7).unwrap();
    assert_eq!(
        w.write_u16(1),
        Err(CodecError::EndOfBuffer { needed: 2, remaining: 1 })
    );
    assert_eq!(w.offset(), 4);
    assert_eq!(
        w.write_string(""),
        Err(CodecError::EndOfBuffer { needed: 2, remaining: 1 })
    );
    assert_eq!(w.offset(), 4);
    w.write_byte(9).unwrap();
    assert_eq!(w.remaining(), 0);
    assert_eq!(w.into_written(), [7, 0, 0, 0, 9]);
}

#[test]
fn write_string_array_is_all_or_nothing() {
    let mut buf = [0u8; 8];
    let mut w = ByteWriter::new(&mut buf);
    assert!(w.write_string_array(&["abc", "def"]).is_err());
    assert_eq!(w.offset(), 0);
    assert!(w.written().is_empty());
}

#[test]
fn write_length_overflow() {
    let mut buf = vec![0u8; MAX_LENGTH + 16];
    let mut w = ByteWriter::new(&mut buf);
    let too_long = vec![0u8; MAX_LENGTH + 1];
    assert_eq!(
        w.write_u8_array(&too_long),
        Err(CodecError::LengthOverflow { len: MAX_LENGTH + 1 })
    );
    assert_eq!(
        w.write_length(MAX_LENGTH + 1),
        Err(CodecError::LengthOverflow { len: MAX_LENGTH + 1 })
    );
    assert_eq!(w.offset(), 0);

    let longest = vec![7u8; MAX_LENGTH];
    w.write_u8_array(&longest).unwrap();
    assert_eq!(w.offset(), MAX_LENGTH + 2);
    assert_eq!(&w.written()[..2], [255, 255]);
}

#[test]
fn write_reset() {
    let mut first = [0u8; 4];
    let mut second = [0u8; 2];
    let mut w = ByteWriter::new(&mut first);
    w.write_u16(1).unwrap();
    assert_eq!(w.offset(), 2);
    w.reset(&mut second);
    assert_eq!(w.offset(), 0);
    assert_eq!(w.len(), 2);
    w.write_bytes(&[5, 6]).unwrap();
    assert!(w.write_bytes(&[1]).is_err());
    assert_eq!(second, [5, 6]);
}
