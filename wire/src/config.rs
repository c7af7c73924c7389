/// Byte order applied to every multi-byte primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

/// Codec settings handed to a writer or reader at construction time.
///
/// Two codecs with different settings can run side by side; nothing here is
/// process-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WireConfig {
    pub byte_order: ByteOrder,
}

impl WireConfig {
    pub const fn new(byte_order: ByteOrder) -> Self {
        WireConfig { byte_order }
    }

    pub const fn little_endian() -> Self {
        WireConfig::new(ByteOrder::LittleEndian)
    }

    pub const fn big_endian() -> Self {
        WireConfig::new(ByteOrder::BigEndian)
    }
}
