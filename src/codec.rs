use crate::error::{CacheError, Result};
use crate::record::Record;
use serde::{Deserialize, Serialize};

/// Abstracts away the selection of the on-disk format of a record.
///
/// The store hands the codec whole records and stores whatever bytes it gets back, one file
/// per key. Decoding a file written by a different codec is a [`CacheError::Codec`].
pub trait RecordCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Record>;
}

impl<C: RecordCodec + ?Sized> RecordCodec for Box<C> {
    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        (**self).encode(record)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        (**self).decode(bytes)
    }
}

/// Compact binary records. The default codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl RecordCodec for BincodeCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        bincode::serialize(record).map_err(|e| CacheError::Codec(Box::new(e)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        bincode::deserialize(bytes).map_err(|e| CacheError::Codec(Box::new(e)))
    }
}

/// Human-readable records, handy when inspecting a cache directory by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        serde_json::to_vec(record).map_err(|e| CacheError::Codec(Box::new(e)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Codec(Box::new(e)))
    }
}

/// Names the built-in codecs so they can be picked from configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Bincode,
    Json,
}

impl CodecKind {
    pub fn build(self) -> Box<dyn RecordCodec + Send + Sync> {
        match self {
            CodecKind::Bincode => Box::new(BincodeCodec),
            CodecKind::Json => Box::new(JsonCodec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Record {
        Record::new(
            Utc.with_ymd_and_hms(2031, 5, 17, 8, 30, 0).unwrap(),
            b"alice".to_vec(),
        )
    }

    #[test]
    fn bincode_decodes_what_it_encodes() {
        let bytes = BincodeCodec.encode(&sample()).unwrap();
        assert_eq!(BincodeCodec.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn json_is_readable() {
        let bytes = JsonCodec.encode(&sample()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("expires_at"));
        assert_eq!(JsonCodec.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn empty_payload_survives() {
        let record = Record::new(sample().expires_at, Vec::new());
        let bytes = BincodeCodec.encode(&record).unwrap();
        assert!(BincodeCodec.decode(&bytes).unwrap().data.is_empty());
    }

    #[test]
    fn garbage_is_a_codec_error() {
        assert!(matches!(
            JsonCodec.decode(b"not a record"),
            Err(CacheError::Codec(_))
        ));
        assert!(matches!(
            BincodeCodec.decode(&[0x01, 0x02]),
            Err(CacheError::Codec(_))
        ));
    }

    #[test]
    fn foreign_codec_output_is_rejected() {
        let bytes = BincodeCodec.encode(&sample()).unwrap();
        assert!(JsonCodec.decode(&bytes).is_err());
    }

    #[test]
    fn boxed_codec_delegates() {
        let codec = CodecKind::Json.build();
        let bytes = codec.encode(&sample()).unwrap();
        assert_eq!(JsonCodec.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn codec_kind_parses_lowercase() {
        let kind: CodecKind = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(kind, CodecKind::Json);
        assert_eq!(CodecKind::default(), CodecKind::Bincode);
    }
}
