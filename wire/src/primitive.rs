use crate::config::ByteOrder;

/// A fixed-width scalar with a defined byte layout.
///
/// `put` and `get` are only called with slices of at least `WIDTH` bytes;
/// bounds are checked by the writer and reader before they get here.
pub trait Primitive: Copy {
    const WIDTH: usize;

    fn put(self, order: ByteOrder, out: &mut [u8]);

    fn get(order: ByteOrder, src: &[u8]) -> Self;
}

macro_rules! impl_integer {
    ($($ty:ty),* $(,)?) => {$(
        impl Primitive for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn put(self, order: ByteOrder, out: &mut [u8]) {
                let bytes = match order {
                    ByteOrder::LittleEndian => self.to_le_bytes(),
                    ByteOrder::BigEndian => self.to_be_bytes(),
                };
                out[..Self::WIDTH].copy_from_slice(&bytes);
            }

            fn get(order: ByteOrder, src: &[u8]) -> Self {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                bytes.copy_from_slice(&src[..Self::WIDTH]);
                match order {
                    ByteOrder::LittleEndian => <$ty>::from_le_bytes(bytes),
                    ByteOrder::BigEndian => <$ty>::from_be_bytes(bytes),
                }
            }
        }
    )*};
}

impl_integer!(u8, i8, u16, i16, u32, i32, u64, i64);

impl Primitive for bool {
    const WIDTH: usize = 1;

    fn put(self, _order: ByteOrder, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    // Any non-zero byte reads back as true.
    fn get(_order: ByteOrder, src: &[u8]) -> Self {
        src[0] != 0
    }
}

// Floats travel as their IEEE-754 bit pattern through the unsigned integer
// of the same width.
impl Primitive for f32 {
    const WIDTH: usize = 4;

    fn put(self, order: ByteOrder, out: &mut [u8]) {
        self.to_bits().put(order, out);
    }

    fn get(order: ByteOrder, src: &[u8]) -> Self {
        f32::from_bits(u32::get(order, src))
    }
}

impl Primitive for f64 {
    const WIDTH: usize = 8;

    fn put(self, order: ByteOrder, out: &mut [u8]) {
        self.to_bits().put(order, out);
    }

    fn get(order: ByteOrder, src: &[u8]) -> Self {
        f64::from_bits(u64::get(order, src))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: Primitive>(value: T, order: ByteOrder) -> Vec<u8> {
        let mut out = vec![0; T::WIDTH];
        value.put(order, &mut out);
        out
    }

    #[test]
    fn integer_layout() {
        assert_eq!(encode(0x1234u16, ByteOrder::LittleEndian), [0x34, 0x12]);
        assert_eq!(encode(0x1234u16, ByteOrder::BigEndian), [0x12, 0x34]);
        assert_eq!(encode(-1i32, ByteOrder::LittleEndian), [0xFF; 4]);
        assert_eq!(
            encode(0x0102_0304_0506_0708u64, ByteOrder::LittleEndian),
            [8, 7, 6, 5, 4, 3, 2, 1]
        );
        assert_eq!(encode(-128i8, ByteOrder::BigEndian), [0x80]);
    }

    #[test]
    fn bool_layout() {
        assert_eq!(encode(true, ByteOrder::LittleEndian), [1]);
        assert_eq!(encode(false, ByteOrder::BigEndian), [0]);
        assert!(bool::get(ByteOrder::LittleEndian, &[2]));
        assert!(!bool::get(ByteOrder::LittleEndian, &[0]));
    }

    #[test]
    fn float_layout_is_raw_bits() {
        assert_eq!(encode(1.0f32, ByteOrder::LittleEndian), [0, 0, 0x80, 0x3F]);
        assert_eq!(encode(1.0f32, ByteOrder::BigEndian), [0x3F, 0x80, 0, 0]);
        assert_eq!(
            encode(-2.5f64, ByteOrder::LittleEndian),
            (-2.5f64).to_bits().to_le_bytes()
        );

        let nan = f32::from_bits(0x7FC0_0001);
        let bytes = encode(nan, ByteOrder::LittleEndian);
        assert_eq!(f32::get(ByteOrder::LittleEndian, &bytes).to_bits(), 0x7FC0_0001);
    }
}
