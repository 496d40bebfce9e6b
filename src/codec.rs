//! Configured encoding and decoding, with per-codec shape memoization.

use std::sync::Arc;

use educe::Educe;
use serde::{de::DeserializeOwned, Serialize};

use crate::compress::{decompress, Compress};
use crate::de::from_value;
use crate::decode::Decoder;
use crate::element::Parser;
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::ser::to_value;
use crate::shape::{Shape, ShapeCache};
use crate::value::Value;

/// Limits and settings for a [`Codec`].
#[derive(Clone, Debug, PartialEq, Eq, Educe)]
#[educe(Default)]
pub struct Config {
    /// Maximum nesting of sequences, maps, records, and reference layers.
    #[educe(Default = crate::MAX_DEPTH)]
    pub max_depth: usize,
    /// Maximum size of an encoded value, and of a decompressed one.
    #[educe(Default = crate::MAX_SIZE)]
    pub max_size: usize,
    /// Compression used by [`Codec::pack`].
    #[educe(Default = Compress::None)]
    pub compression: Compress,
}

pub(crate) fn encode_with(value: &Value, shape: &Shape, config: &Config) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(config.max_depth);
    encoder.encode(value, shape)?;
    let buf = encoder.into_vec();
    if buf.len() > config.max_size {
        return Err(Error::LengthTooLong {
            max: config.max_size,
            actual: buf.len(),
        });
    }
    Ok(buf)
}

pub(crate) fn decode_with(data: &[u8], shape: &Shape, dst: &mut Value, config: &Config) -> Result<usize> {
    let mut parser = Parser::new(data);
    Decoder::new(config.max_depth).decode_into(&mut parser, shape, dst)?;
    Ok(parser.consumed())
}

pub(crate) fn decode_typed<T: DeserializeOwned>(
    data: &[u8],
    shape: &Shape,
    config: &Config,
) -> Result<(T, usize)> {
    let mut value = Value::Nil;
    let used = decode_with(data, shape, &mut value, config)?;
    Ok((from_value(value)?, used))
}

pub(crate) fn decode_typed_into<T: Serialize + DeserializeOwned>(
    data: &[u8],
    shape: &Shape,
    dst: &mut T,
    config: &Config,
) -> Result<usize> {
    let mut value = to_value(dst)?;
    let used = decode_with(data, shape, &mut value, config)?;
    *dst = from_value(value)?;
    Ok(used)
}

/// An encoder/decoder with its own settings and shape cache.
///
/// Codecs are cheap to create. Each one traces a type's shape the first time it sees the type and
/// reuses it afterwards; nothing is shared between codecs.
#[derive(Clone, Debug, Default)]
pub struct Codec {
    config: Config,
    shapes: ShapeCache,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            shapes: ShapeCache::with_max_depth(config.max_depth),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shape cache, for registering hand-built shapes.
    pub fn shapes(&mut self) -> &mut ShapeCache {
        &mut self.shapes
    }

    pub fn shape_of<T: DeserializeOwned + 'static>(&mut self) -> Result<Arc<Shape>> {
        self.shapes.shape_of::<T>()
    }

    pub fn encode_value(&self, value: &Value, shape: &Shape) -> Result<Vec<u8>> {
        encode_with(value, shape, &self.config)
    }

    /// Decode one value from the front of `data`, returning it along with the number of bytes it
    /// took up. Anything after it is left alone.
    pub fn decode_value(&self, data: &[u8], shape: &Shape) -> Result<(Value, usize)> {
        let mut value = Value::Nil;
        let used = decode_with(data, shape, &mut value, &self.config)?;
        Ok((value, used))
    }

    /// Decode one value from the front of `data` on top of `dst`. Record fields missing from the
    /// input keep their current values.
    pub fn decode_value_into(&self, data: &[u8], shape: &Shape, dst: &mut Value) -> Result<usize> {
        decode_with(data, shape, dst, &self.config)
    }

    /// Encode a value using its traced shape.
    ///
    /// The shape comes from `T`'s `Deserialize` implementation, so `T` needs both directions.
    pub fn encode<T: Serialize + DeserializeOwned + 'static>(&mut self, value: &T) -> Result<Vec<u8>> {
        let shape = self.shapes.shape_of::<T>()?;
        encode_with(&to_value(value)?, &shape, &self.config)
    }

    pub fn decode<T: DeserializeOwned + 'static>(&mut self, data: &[u8]) -> Result<(T, usize)> {
        let shape = self.shapes.shape_of::<T>()?;
        decode_typed(data, &shape, &self.config)
    }

    /// Decode on top of an existing value: struct fields missing from the input keep their
    /// current values.
    pub fn decode_into<T: Serialize + DeserializeOwned + 'static>(
        &mut self,
        data: &[u8],
        dst: &mut T,
    ) -> Result<usize> {
        let shape = self.shapes.shape_of::<T>()?;
        decode_typed_into(data, &shape, dst, &self.config)
    }

    /// Encode and then compress according to [`Config::compression`].
    pub fn pack<T: Serialize + DeserializeOwned + 'static>(&mut self, value: &T) -> Result<Vec<u8>> {
        let raw = self.encode(value)?;
        Ok(self.config.compression.compress(&raw)?)
    }

    /// Decompress and decode a frame made by [`Codec::pack`]. The frame must hold exactly one
    /// value.
    pub fn unpack<T: DeserializeOwned + 'static>(&mut self, frame: &[u8]) -> Result<T> {
        let raw = decompress(frame, self.config.max_size)?;
        let (value, used) = self.decode(&raw)?;
        if used != raw.len() {
            return Err(Error::MalformedData(format!(
                "{} trailing bytes after packed value",
                raw.len() - used
            )));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::integer::IntKind;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
    struct Settings {
        name: String,
        retries: u8,
        peers: Vec<String>,
    }

    fn settings() -> Settings {
        Settings {
            name: "node".to_string(),
            retries: 3,
            peers: vec!["a".to_string(); 40],
        }
    }

    #[test]
    fn typed_round_trip() {
        let mut codec = Codec::new();
        let enc = codec.encode(&settings()).unwrap();
        let (dec, used) = codec.decode::<Settings>(&enc).unwrap();
        assert_eq!(used, enc.len());
        assert_eq!(dec, settings());
        assert_eq!(codec.shapes().len(), 1);
    }

    #[test]
    fn hand_registered_shape() {
        let mut codec = Codec::new();
        codec
            .shapes()
            .insert::<u64>(Shape::Int(IntKind::U8));
        let err = codec.encode(&300u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn size_limit() {
        let mut codec = Codec::with_config(Config {
            max_size: 8,
            ..Config::default()
        });
        let err = codec.encode(&settings()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LengthTooLong);
    }

    #[test]
    fn depth_limit() {
        let mut codec = Codec::with_config(Config {
            max_depth: 2,
            ..Config::default()
        });
        let err = codec.encode(&vec![vec![vec![1u8]]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseLimit);
    }

    #[test]
    fn pack_and_unpack() {
        let mut codec = Codec::with_config(Config {
            compression: Compress::General { level: 3 },
            ..Config::default()
        });
        let packed = codec.pack(&settings()).unwrap();
        let plain = codec.encode(&settings()).unwrap();
        assert!(packed.len() < plain.len());
        assert_eq!(codec.unpack::<Settings>(&packed).unwrap(), settings());

        let mut trailing = vec![0u8];
        trailing.extend_from_slice(&plain);
        trailing.push(0x00);
        let err = codec.unpack::<Settings>(&trailing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.max_depth, crate::MAX_DEPTH);
        assert_eq!(config.max_size, crate::MAX_SIZE);
        assert_eq!(config.compression, Compress::None);
    }
}
