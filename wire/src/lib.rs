//! Runtime support for the KProto binary encoding.
//!
//! Every value is written at a cursor into a caller-supplied, fixed-size
//! buffer. Multi-byte primitives use the byte order carried by a
//! [`WireConfig`] (little endian unless configured otherwise), and strings
//! and arrays are prefixed with a `u16` element count.
//!
//! ```
//! use kproto_wire::{ByteReader, ByteWriter};
//!
//! let mut buf = [0u8; 16];
//! let mut w = ByteWriter::new(&mut buf);
//! w.write_u32(0x0102_0304).unwrap();
//! w.write_string("hi").unwrap();
//! assert_eq!(w.written(), [4, 3, 2, 1, 2, 0, b'h', b'i']);
//!
//! let mut r = ByteReader::new(&buf);
//! assert_eq!(r.read_u32(), Ok(0x0102_0304));
//! assert_eq!(r.read_string().as_deref(), Ok("hi"));
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod primitive;
pub mod reader;
pub mod writer;

pub use config::{ByteOrder, WireConfig};
pub use error::CodecError;
pub use message::Message;
pub use primitive::Primitive;
pub use reader::ByteReader;
pub use writer::ByteWriter;

/// Number of bytes used by the length prefix of strings and arrays.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest element count a length prefix can describe.
pub const MAX_LENGTH: usize = u16::MAX as usize;
