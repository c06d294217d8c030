//! Decoder for the binary streaming quote channel
//!
//! Each buffer is a flat sequence of fields. A field starts with a varint tag
//! whose low three bits are the wire type and whose remaining bits are the
//! field number; the payload layout follows from the wire type:
//!
//! | wire type | payload                                   |
//! |-----------|-------------------------------------------|
//! | 0         | base-128 varint, low group first          |
//! | 1         | 8 bytes little-endian                     |
//! | 2         | varint length, then that many bytes       |
//! | 5         | 4 bytes little-endian                     |
//!
//! Field numbers are listed in [`decode`]. Unknown field numbers are skipped.
//! The decoder keeps no state between buffers.

mod record;

use base64::Engine;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::{Result, WireError};
use crate::model::DynamicValue;

pub use record::{MarketHours, QuoteType, StreamingRecord};

pub type WireResult<T> = std::result::Result<T, WireError>;

/// Longest legal varint encoding of a u64
const MAX_VARINT_BYTES: usize = 10;

/// Payload layout selected by the low three tag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_tag(tag: u64, offset: usize) -> WireResult<Self> {
        match (tag & 0x7) as u8 {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            wire_type => Err(WireError::UnsupportedWireType { wire_type, offset }),
        }
    }
}

/// Map a zigzag-encoded varint back to its signed value
pub fn zigzag_decode(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}

/// Cursor over one wire buffer
struct WireReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.offset >= self.buf.len()
    }

    fn take(&mut self, needed: usize) -> WireResult<&'a [u8]> {
        let available = self.buf.len() - self.offset;
        if needed > available {
            return Err(WireError::Truncated {
                offset: self.offset,
                needed,
                available,
            });
        }
        let buf = self.buf;
        let bytes = &buf[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(bytes)
    }

    fn read_varint(&mut self) -> WireResult<u64> {
        let start = self.offset;
        let mut result = 0u64;
        for group in 0..MAX_VARINT_BYTES {
            let byte = self.take(1)?[0];
            result |= u64::from(byte & 0x7f) << (7 * group);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(WireError::MalformedVarint { offset: start })
    }

    fn read_fixed32(&mut self) -> WireResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_fixed64(&mut self) -> WireResult<u64> {
        let bytes = self.take(8)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(word))
    }

    fn read_length_delimited(&mut self) -> WireResult<&'a [u8]> {
        let len_offset = self.offset;
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| WireError::Truncated {
            offset: len_offset,
            needed: usize::MAX,
            available: self.buf.len() - self.offset,
        })?;
        self.take(len)
    }

    fn skip(&mut self, wire_type: WireType) -> WireResult<()> {
        match wire_type {
            WireType::Varint => self.read_varint().map(drop),
            WireType::Fixed64 => self.take(8).map(drop),
            WireType::LengthDelimited => self.read_length_delimited().map(drop),
            WireType::Fixed32 => self.take(4).map(drop),
        }
    }

    /// Skip a known field whose wire type does not match its declared layout
    fn mismatch<T>(
        &mut self,
        field: u64,
        wire_type: WireType,
    ) -> WireResult<Option<T>> {
        debug!(field, ?wire_type, "skipping field with unexpected wire type");
        self.skip(wire_type)?;
        Ok(None)
    }

    fn string(&mut self, field: u64, wire_type: WireType) -> WireResult<Option<String>> {
        match wire_type {
            WireType::LengthDelimited => {
                let bytes = self.read_length_delimited()?;
                Ok(Some(String::from_utf8_lossy(bytes).into_owned()))
            }
            other => self.mismatch(field, other),
        }
    }

    fn float(&mut self, field: u64, wire_type: WireType) -> WireResult<Option<f32>> {
        match wire_type {
            WireType::Fixed32 => Ok(Some(f32::from_bits(self.read_fixed32()?))),
            other => self.mismatch(field, other),
        }
    }

    fn double(&mut self, field: u64, wire_type: WireType) -> WireResult<Option<f64>> {
        match wire_type {
            WireType::Fixed64 => Ok(Some(f64::from_bits(self.read_fixed64()?))),
            other => self.mismatch(field, other),
        }
    }

    fn sint64(&mut self, field: u64, wire_type: WireType) -> WireResult<Option<i64>> {
        match wire_type {
            WireType::Varint => Ok(Some(zigzag_decode(self.read_varint()?))),
            other => self.mismatch(field, other),
        }
    }

    fn int32(&mut self, field: u64, wire_type: WireType) -> WireResult<Option<i32>> {
        match wire_type {
            // int32 values travel sign-extended to 64 bits
            WireType::Varint => Ok(Some(self.read_varint()? as i64 as i32)),
            other => self.mismatch(field, other),
        }
    }
}

/// Assign only when the field decoded to a value
fn set<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Decode one streaming buffer
///
/// Field numbers: 1 id, 2 price, 3 time, 4 currency, 5 exchange, 6 quote type,
/// 7 market hours, 8 change percent, 9 day volume, 10 day high, 11 day low,
/// 12 change, 13 short name, 14 expire date, 15 open, 16 previous close,
/// 17 strike, 18 underlying symbol, 19 open interest, 20 options type,
/// 21 mini option, 22 last size, 23 bid, 24 bid size, 25 ask, 26 ask size,
/// 27 price hint, 28 24h volume, 29 volume across currencies, 30 from currency,
/// 31 last market, 32 circulating supply, 33 market cap.
pub fn decode(bytes: &[u8]) -> WireResult<StreamingRecord> {
    let mut reader = WireReader::new(bytes);
    let mut record = StreamingRecord::default();

    while !reader.is_at_end() {
        let tag_offset = reader.offset;
        let tag = reader.read_varint()?;
        let wire_type = WireType::from_tag(tag, tag_offset)?;
        let field = tag >> 3;
        let r = &mut reader;

        match field {
            0 => return Err(WireError::InvalidTag { offset: tag_offset }),
            1 => set(&mut record.id, r.string(field, wire_type)?),
            2 => set(&mut record.price, r.float(field, wire_type)?),
            3 => set(&mut record.time, r.sint64(field, wire_type)?),
            4 => set(&mut record.currency, r.string(field, wire_type)?),
            5 => set(&mut record.exchange, r.string(field, wire_type)?),
            6 => set(&mut record.quote_type, r.int32(field, wire_type)?),
            7 => set(&mut record.market_hours, r.int32(field, wire_type)?),
            8 => set(&mut record.change_percent, r.float(field, wire_type)?),
            9 => set(&mut record.day_volume, r.sint64(field, wire_type)?),
            10 => set(&mut record.day_high, r.float(field, wire_type)?),
            11 => set(&mut record.day_low, r.float(field, wire_type)?),
            12 => set(&mut record.change, r.float(field, wire_type)?),
            13 => set(&mut record.short_name, r.string(field, wire_type)?),
            14 => set(&mut record.expire_date, r.sint64(field, wire_type)?),
            15 => set(&mut record.open_price, r.float(field, wire_type)?),
            16 => set(&mut record.previous_close, r.float(field, wire_type)?),
            17 => set(&mut record.strike_price, r.float(field, wire_type)?),
            18 => set(&mut record.underlying_symbol, r.string(field, wire_type)?),
            19 => set(&mut record.open_interest, r.sint64(field, wire_type)?),
            20 => set(&mut record.options_type, r.sint64(field, wire_type)?),
            21 => set(&mut record.mini_option, r.sint64(field, wire_type)?),
            22 => set(&mut record.last_size, r.sint64(field, wire_type)?),
            23 => set(&mut record.bid, r.float(field, wire_type)?),
            24 => set(&mut record.bid_size, r.sint64(field, wire_type)?),
            25 => set(&mut record.ask, r.float(field, wire_type)?),
            26 => set(&mut record.ask_size, r.sint64(field, wire_type)?),
            27 => set(&mut record.price_hint, r.sint64(field, wire_type)?),
            28 => set(&mut record.vol_24hr, r.sint64(field, wire_type)?),
            29 => set(&mut record.vol_all_currencies, r.sint64(field, wire_type)?),
            30 => set(&mut record.from_currency, r.string(field, wire_type)?),
            31 => set(&mut record.last_market, r.string(field, wire_type)?),
            32 => set(&mut record.circulating_supply, r.double(field, wire_type)?),
            33 => set(&mut record.market_cap, r.double(field, wire_type)?),
            _ => {
                debug!(field, ?wire_type, "skipping unknown wire field");
                r.skip(wire_type)?;
            }
        }
    }

    trace!(symbol = record.symbol(), time = record.time, "decoded streaming record");
    Ok(record)
}

/// Decode a base64 text payload as carried by the streaming channel
pub fn decode_base64(text: &str) -> WireResult<StreamingRecord> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(text.trim())?;
    decode(&bytes)
}

/// Decode independent buffers in parallel, one result per buffer in input order
pub fn decode_batch<B>(buffers: &[B]) -> Vec<WireResult<StreamingRecord>>
where
    B: AsRef<[u8]> + Sync,
{
    buffers.par_iter().map(|buf| decode(buf.as_ref())).collect()
}

/// A text frame from the streaming channel with its decoded payload
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingMessage {
    /// The frame as received
    pub raw: DynamicValue,
    /// Frame `type`, e.g. `pricing`
    pub message_type: Option<String>,
    /// Base64 text of the binary payload
    pub encoded: String,
    pub record: StreamingRecord,
}

/// Decode a `{"type": .., "message": "<base64>"}` text frame
pub fn decode_envelope(frame: &[u8]) -> Result<StreamingMessage> {
    let raw = DynamicValue::decode(frame)?;
    let encoded = raw
        .get("message")
        .and_then(DynamicValue::as_str)
        .ok_or_else(|| WireError::Envelope("missing string `message` member".to_string()))?
        .to_string();
    let record = decode_base64(&encoded)?;
    let message_type = raw
        .get("type")
        .and_then(DynamicValue::as_str)
        .map(str::to_string);
    Ok(StreamingMessage {
        raw,
        message_type,
        encoded,
        record,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn tag(field: u64, wire_type: u64, out: &mut Vec<u8>) {
        varint(field << 3 | wire_type, out);
    }

    fn text(field: u64, value: &str, out: &mut Vec<u8>) {
        tag(field, 2, out);
        varint(value.len() as u64, out);
        out.extend_from_slice(value.as_bytes());
    }

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag_decode(0), 0);
        assert_eq!(zigzag_decode(1), -1);
        assert_eq!(zigzag_decode(2), 1);
        assert_eq!(zigzag_decode(3), -2);
        assert_eq!(zigzag_decode(u64::MAX), i64::MIN);
    }

    #[test]
    fn test_decode_core_fields() {
        let mut buf = Vec::new();
        text(1, "AAPL", &mut buf);
        tag(2, 5, &mut buf);
        buf.extend_from_slice(&123.5f32.to_le_bytes());
        tag(3, 0, &mut buf);
        varint(1_700_000_000u64 << 1, &mut buf);
        text(4, "USD", &mut buf);
        tag(6, 0, &mut buf);
        varint(8, &mut buf);
        tag(7, 0, &mut buf);
        varint(1, &mut buf);

        let record = decode(&buf).unwrap();
        assert_eq!(record.symbol(), Some("AAPL"));
        assert!((record.price.unwrap() - 123.5).abs() < 0.001);
        assert_eq!(record.time, Some(1_700_000_000));
        assert_eq!(record.currency.as_deref(), Some("USD"));
        assert_eq!(record.quote_type_value(), Some(QuoteType::Equity));
        assert_eq!(record.market_hours_value(), Some(MarketHours::RegularMarket));
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let mut buf = Vec::new();
        tag(99, 0, &mut buf);
        varint(300, &mut buf);
        tag(100, 1, &mut buf);
        buf.extend_from_slice(&[0u8; 8]);
        text(101, "ignored", &mut buf);
        tag(102, 5, &mut buf);
        buf.extend_from_slice(&[0u8; 4]);
        text(1, "MSFT", &mut buf);

        let record = decode(&buf).unwrap();
        assert_eq!(record.id.as_deref(), Some("MSFT"));
    }

    #[test]
    fn test_empty_buffer_is_valid() {
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_known_field_with_wrong_wire_type_left_unset() {
        let mut buf = Vec::new();
        tag(2, 0, &mut buf);
        varint(7, &mut buf);
        let record = decode(&buf).unwrap();
        assert_eq!(record.price, None);
    }

    #[test]
    fn test_truncated_inputs() {
        let mut buf = Vec::new();
        text(1, "AAPL", &mut buf);
        buf.truncate(buf.len() - 1);
        assert!(matches!(decode(&buf), Err(WireError::Truncated { .. })));

        let mut buf = Vec::new();
        tag(2, 5, &mut buf);
        buf.extend_from_slice(&[0, 0]);
        assert!(matches!(decode(&buf), Err(WireError::Truncated { .. })));

        assert!(matches!(decode(&[0x80]), Err(WireError::Truncated { .. })));
    }

    #[test]
    fn test_invalid_tags() {
        assert_eq!(decode(&[0x00]), Err(WireError::InvalidTag { offset: 0 }));
        assert_eq!(
            decode(&[0x0b]),
            Err(WireError::UnsupportedWireType {
                wire_type: 3,
                offset: 0
            })
        );
        let overlong = [0xff; 11];
        assert_eq!(decode(&overlong), Err(WireError::MalformedVarint { offset: 0 }));
    }

    #[test]
    fn test_decode_envelope() {
        let mut buf = Vec::new();
        text(1, "ETH-USD", &mut buf);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&buf);
        let frame = format!(r#"{{"type":"pricing","message":"{}"}}"#, encoded);

        let message = decode_envelope(frame.as_bytes()).unwrap();
        assert_eq!(message.message_type.as_deref(), Some("pricing"));
        assert_eq!(message.record.symbol(), Some("ETH-USD"));

        assert!(decode_envelope(br#"{"type":"pricing"}"#).is_err());
        assert!(decode_base64("***").is_err());
    }

    #[test]
    fn test_decode_batch_keeps_order() {
        let mut a = Vec::new();
        text(1, "A", &mut a);
        let mut b = Vec::new();
        text(1, "B", &mut b);
        let bad = vec![0x00u8];

        let results = decode_batch(&[a, bad, b]);
        assert_eq!(results[0].as_ref().unwrap().symbol(), Some("A"));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().symbol(), Some("B"));
    }
}
