use kproto_wire::{ByteReader, ByteWriter, CodecError, WireConfig, MAX_LENGTH};
use proptest::prelude::*;

fn configs() -> impl Strategy<Value = WireConfig> {
    prop_oneof![Just(WireConfig::little_endian()), Just(WireConfig::big_endian())]
}

proptest! {
    #[test]
    fn integers_round_trip(config in configs(), a: i8, b: u16, c: i32, d: u64, e: i64) {
        let mut buf = [0u8; 23];
        let mut w = ByteWriter::with_config(&mut buf, config);
        w.write_i8(a).unwrap();
        w.write_u16(b).unwrap();
        w.write_i32(c).unwrap();
        w.write_u64(d).unwrap();
        w.write_i64(e).unwrap();
        prop_assert_eq!(w.remaining(), 0);

        let mut r = ByteReader::with_config(&buf, config);
        prop_assert_eq!(r.read_i8().unwrap(), a);
        prop_assert_eq!(r.read_u16().unwrap(), b);
        prop_assert_eq!(r.read_i32().unwrap(), c);
        prop_assert_eq!(r.read_u64().unwrap(), d);
        prop_assert_eq!(r.read_i64().unwrap(), e);
    }

    #[test]
    fn float_bits_round_trip(config in configs(), a: u32, b: u64) {
        let (a, b) = (f32::from_bits(a), f64::from_bits(b));
        let mut buf = [0u8; 12];
        let mut w = ByteWriter::with_config(&mut buf, config);
        w.write_f32(a).unwrap();
        w.write_f64(b).unwrap();

        let mut r = ByteReader::with_config(&buf, config);
        prop_assert_eq!(r.read_f32().unwrap().to_bits(), a.to_bits());
        prop_assert_eq!(r.read_f64().unwrap().to_bits(), b.to_bits());
    }

    #[test]
    fn strings_round_trip(config in configs(), values in prop::collection::vec(".{0,16}", 0..8)) {
        let mut buf = vec![0u8; 2 + values.iter().map(|v| v.len() + 2).sum::<usize>()];
        let mut w = ByteWriter::with_config(&mut buf, config);
        w.write_string_array(&values).unwrap();
        prop_assert_eq!(w.remaining(), 0);

        let mut r = ByteReader::with_config(&buf, config);
        prop_assert_eq!(r.read_string_array().unwrap(), values);
    }

    #[test]
    fn short_buffers_fail_without_moving(values in prop::collection::vec(any::<u32>(), 1..16), cut in 1usize..8) {
        let needed = 2 + values.len() * 4;
        let mut buf = vec![0u8; needed - cut.min(needed)];
        let mut w = ByteWriter::new(&mut buf);
        let err = w.write_u32_array(&values);
        prop_assert!(matches!(err, Err(CodecError::EndOfBuffer { .. })), "expected end of buffer");
        prop_assert_eq!(w.offset(), 0);
    }
}

#[test]
fn boundary_values() {
    let mut buf = [0u8; 64];
    let mut w = ByteWriter::new(&mut buf);
    w.write_u64(u64::MAX).unwrap();
    w.write_i64(i64::MIN).unwrap();
    w.write_u8(0).unwrap();
    w.write_i16_array(&[]).unwrap();
    w.write_string("").unwrap();
    let len = w.offset();

    let mut r = ByteReader::new(&buf[..len]);
    assert_eq!(r.read_u64(), Ok(u64::MAX));
    assert_eq!(r.read_i64(), Ok(i64::MIN));
    assert_eq!(r.read_u8(), Ok(0));
    assert_eq!(r.read_i16_array(), Ok(vec![]));
    assert_eq!(r.read_string(), Ok(String::new()));
    assert_eq!(r.remaining(), 0);
}

#[test]
fn longest_array_round_trips() {
    let values: Vec<u8> = (0..MAX_LENGTH).map(|i| i as u8).collect();
    let mut buf = vec![0u8; MAX_LENGTH + 2];
    let mut w = ByteWriter::new(&mut buf);
    w.write_byte_array(&values).unwrap();
    assert_eq!(w.remaining(), 0);

    let mut r = ByteReader::new(&buf);
    assert_eq!(r.read_byte_array(), Ok(values));
}
