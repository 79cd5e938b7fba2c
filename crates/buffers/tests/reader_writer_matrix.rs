//! Writer/Reader roundtrip matrix for the buffers crate.

use proptest::prelude::*;
use schema_sync_buffers::{BufferError, Reader, Writer, VU57_MAX};

#[test]
fn fixed_width_matrix() {
    let mut w = Writer::new();
    w.u8(0xff);
    w.i8(i8::MIN);
    w.u16(u16::MAX);
    w.i16(-1000);
    w.u32(3520);
    w.i32(i32::MIN);
    w.u64(u64::MAX);
    w.i64(-1);
    w.f32(1.5);
    w.f64(-0.25);
    let data = w.flush();
    assert_eq!(data.len(), 1 + 1 + 2 + 2 + 4 + 4 + 8 + 8 + 4 + 8);

    let mut r = Reader::new(&data);
    assert_eq!(r.u8(), Ok(0xff));
    assert_eq!(r.i8(), Ok(i8::MIN));
    assert_eq!(r.u16(), Ok(u16::MAX));
    assert_eq!(r.i16(), Ok(-1000));
    assert_eq!(r.u32(), Ok(3520));
    assert_eq!(r.i32(), Ok(i32::MIN));
    assert_eq!(r.u64(), Ok(u64::MAX));
    assert_eq!(r.i64(), Ok(-1));
    assert_eq!(r.f32(), Ok(1.5));
    assert_eq!(r.f64(), Ok(-0.25));
    assert!(r.is_eof());
}

#[test]
fn low_byte_is_first_on_the_wire() {
    // 3520 = 0x0DC0: its low byte 0xC0 leads the encoding.
    let mut w = Writer::new();
    w.i32(3520);
    assert_eq!(w.flush(), vec![0xc0, 0x0d, 0x00, 0x00]);
}

#[test]
fn vu57_boundaries() {
    let cases = [0u64, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, VU57_MAX];
    let mut w = Writer::new();
    for v in cases {
        w.vu57(v);
    }
    let data = w.flush();
    let mut r = Reader::new(&data);
    for v in cases {
        assert_eq!(r.vu57(), Ok(v));
    }
    assert!(r.is_eof());
}

#[test]
fn vu57_max_is_eight_bytes() {
    let mut w = Writer::new();
    w.vu57(VU57_MAX);
    assert_eq!(w.len(), 8);
}

#[test]
fn utf8_strings() {
    let samples = ["", "гхб", "Пуредоминаце", "未知の選手", "알 수없는 플레이어", "😀"];
    let mut w = Writer::new();
    for s in samples {
        w.str(s);
    }
    let data = w.flush();
    let mut r = Reader::new(&data);
    for s in samples {
        assert_eq!(r.str(1024), Ok(s));
    }
}

#[test]
fn truncated_string_payload() {
    let mut w = Writer::new();
    w.str("hello");
    let mut data = w.flush();
    data.truncate(3);
    let mut r = Reader::new(&data);
    assert!(matches!(r.str(1024), Err(BufferError::EndOfBuffer { .. })));
    assert_eq!(r.x, 0);
}

proptest! {
    #[test]
    fn vu57_roundtrip(v in 0u64..=VU57_MAX) {
        let mut w = Writer::new();
        w.vu57(v);
        let data = w.flush();
        let mut r = Reader::new(&data);
        prop_assert_eq!(r.vu57(), Ok(v));
        prop_assert!(r.is_eof());
    }

    #[test]
    fn str_roundtrip(s in "\\PC*") {
        let mut w = Writer::new();
        w.str(&s);
        let data = w.flush();
        let mut r = Reader::new(&data);
        prop_assert_eq!(r.str(usize::MAX), Ok(s.as_str()));
    }
}
