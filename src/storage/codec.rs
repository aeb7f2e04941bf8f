//! Value codecs
//!
//! A codec turns a stored value into the JSON object written to the log
//! and validates it back into its typed shape on load. The index never
//! inspects encoded values itself.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Errors raised while encoding or decoding a value
#[derive(Error, Debug)]
pub enum CodecError {
    /// Value does not match the expected shape
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Value has the right shape but fails a domain check
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Converts values to and from their persisted JSON form
pub trait Codec<T> {
    fn encode(&self, value: &T) -> Result<Value, CodecError>;

    fn decode(&self, raw: Value) -> Result<T, CodecError>;
}

/// Codec for any serde type
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonCodec<{}>", std::any::type_name::<T>())
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Value, CodecError> {
        Ok(serde_json::to_value(value)?)
    }

    fn decode(&self, raw: Value) -> Result<T, CodecError> {
        Ok(serde_json::from_value(raw)?)
    }
}

/// Wraps a codec with a validation check run on every encode and decode
///
/// Decoded values that fail the check abort the load; values that fail it
/// on encode are never written.
#[derive(Clone)]
pub struct ValidatingCodec<C, F> {
    inner: C,
    validate: F,
}

impl<C, F> ValidatingCodec<C, F> {
    pub fn new(inner: C, validate: F) -> Self {
        Self { inner, validate }
    }
}

impl<C: fmt::Debug, F> fmt::Debug for ValidatingCodec<C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatingCodec")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<T, C, F> Codec<T> for ValidatingCodec<C, F>
where
    C: Codec<T>,
    F: Fn(&T) -> Result<(), String>,
{
    fn encode(&self, value: &T) -> Result<Value, CodecError> {
        (self.validate)(value).map_err(CodecError::Validation)?;
        self.inner.encode(value)
    }

    fn decode(&self, raw: Value) -> Result<T, CodecError> {
        let value = self.inner.decode(raw)?;
        (self.validate)(&value).map_err(CodecError::Validation)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reading {
        temperature: f64,
        #[serde(default)]
        label: Option<String>,
    }

    fn in_range(r: &Reading) -> Result<(), String> {
        if (-50.0..=60.0).contains(&r.temperature) {
            Ok(())
        } else {
            Err(format!("temperature {} out of range", r.temperature))
        }
    }

    #[test]
    fn test_json_codec() {
        let codec = JsonCodec::<Reading>::new();
        let reading = Reading {
            temperature: 22.5,
            label: None,
        };

        let encoded = codec.encode(&reading).unwrap();
        assert_eq!(encoded, json!({"temperature": 22.5, "label": null}));

        // Optional fields may be omitted in stored data
        let decoded = codec.decode(json!({"temperature": 22.5})).unwrap();
        assert_eq!(decoded, reading);
    }

    #[test]
    fn test_json_codec_rejects_wrong_shape() {
        let codec = JsonCodec::<Reading>::new();
        let err = codec.decode(json!({"humidity": 0.4})).unwrap_err();
        assert!(matches!(err, CodecError::Serialization(_)));
    }

    #[test]
    fn test_validating_codec() {
        let codec = ValidatingCodec::new(JsonCodec::<Reading>::new(), in_range);

        assert!(codec.decode(json!({"temperature": 20.0})).is_ok());

        let err = codec.decode(json!({"temperature": 99.0})).unwrap_err();
        assert!(matches!(err, CodecError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation error: temperature 99 out of range"
        );

        let hot = Reading {
            temperature: 75.0,
            label: None,
        };
        assert!(matches!(
            codec.encode(&hot),
            Err(CodecError::Validation(_))
        ));
    }
}
