use base64::Engine;

use yfkit::error::{Error, WireError};
use yfkit::wire::{self, MarketHours, QuoteType};

fn varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn key(field: u64, wire_type: u64, out: &mut Vec<u8>) {
    varint(field << 3 | wire_type, out);
}

fn text(field: u64, value: &str, out: &mut Vec<u8>) {
    key(field, 2, out);
    varint(value.len() as u64, out);
    out.extend_from_slice(value.as_bytes());
}

fn float(field: u64, value: f32, out: &mut Vec<u8>) {
    key(field, 5, out);
    out.extend_from_slice(&value.to_le_bytes());
}

fn sint(field: u64, value: i64, out: &mut Vec<u8>) {
    key(field, 0, out);
    varint(((value << 1) ^ (value >> 63)) as u64, out);
}

fn quote() -> Vec<u8> {
    let mut buf = Vec::new();
    text(1, "AAPL", &mut buf);
    float(2, 123.5, &mut buf);
    sint(3, 1_700_000_000, &mut buf);
    text(4, "USD", &mut buf);
    buf
}

#[test]
fn decodes_core_quote_fields() {
    let record = wire::decode(&quote()).unwrap();
    assert_eq!(record.symbol(), Some("AAPL"));
    assert!((record.price.unwrap() - 123.5).abs() < 0.001);
    assert_eq!(record.time, Some(1_700_000_000));
    assert_eq!(record.currency.as_deref(), Some("USD"));
}

#[test]
fn decodes_codes_and_wide_fields() {
    let mut buf = quote();
    key(6, 0, &mut buf);
    varint(8, &mut buf);
    key(7, 0, &mut buf);
    varint(1, &mut buf);
    key(33, 1, &mut buf);
    buf.extend_from_slice(&2.5e12f64.to_le_bytes());

    let record = wire::decode(&buf).unwrap();
    assert_eq!(record.quote_type_value(), Some(QuoteType::Equity));
    assert_eq!(record.market_hours_value(), Some(MarketHours::RegularMarket));
    assert_eq!(record.market_cap, Some(2.5e12));
}

#[test]
fn skips_unknown_fields_of_every_wire_type() {
    let mut buf = Vec::new();
    key(90, 0, &mut buf);
    varint(300, &mut buf);
    key(91, 1, &mut buf);
    buf.extend_from_slice(&[0; 8]);
    text(92, "ignored", &mut buf);
    key(93, 5, &mut buf);
    buf.extend_from_slice(&[0; 4]);
    buf.extend_from_slice(&quote());

    let record = wire::decode(&buf).unwrap();
    assert_eq!(record.symbol(), Some("AAPL"));
    assert_eq!(record.time, Some(1_700_000_000));
}

#[test]
fn empty_buffer_is_an_empty_record() {
    let record = wire::decode(&[]).unwrap();
    assert!(record.is_empty());
}

#[test]
fn truncated_string_is_rejected() {
    let mut buf = Vec::new();
    key(1, 2, &mut buf);
    varint(10, &mut buf);
    buf.extend_from_slice(b"AAP");
    assert!(matches!(
        wire::decode(&buf),
        Err(WireError::Truncated { needed: 10, available: 3, .. })
    ));
}

#[test]
fn group_wire_type_is_rejected() {
    let mut buf = Vec::new();
    key(5, 3, &mut buf);
    assert!(matches!(
        wire::decode(&buf),
        Err(WireError::UnsupportedWireType { wire_type: 3, .. })
    ));
}

#[test]
fn base64_and_envelope_frames() {
    let encoded = base64::engine::general_purpose::STANDARD.encode(quote());
    let record = wire::decode_base64(&encoded).unwrap();
    assert_eq!(record.symbol(), Some("AAPL"));

    let frame = format!(r#"{{"type":"pricing","message":"{}"}}"#, encoded);
    let message = wire::decode_envelope(frame.as_bytes()).unwrap();
    assert_eq!(message.message_type.as_deref(), Some("pricing"));
    assert_eq!(message.record, record);

    let err = wire::decode_envelope(br#"{"type":"pricing"}"#).unwrap_err();
    assert!(matches!(err, Error::Wire(WireError::Envelope(_))));
    assert!(wire::decode_base64("not base64!").is_err());
}

#[test]
fn batch_preserves_order_and_isolates_failures() {
    let mut broken = quote();
    broken.truncate(3);
    let buffers = vec![quote(), broken, Vec::new()];
    let results = wire::decode_batch(&buffers);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().symbol(), Some("AAPL"));
    assert!(results[1].is_err());
    assert!(results[2].as_ref().unwrap().is_empty());
}
