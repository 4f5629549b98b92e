// Copyright Quill Contributors
// SPDX-License-Identifier: Apache-2.0

//! Generic error envelope returned to the remote caller.
//!
//! When a call completes through either error path the transport sends this
//! envelope instead of the method's response payload. The envelope is a
//! generic carrier: a code, a text message and, for application errors, one
//! service-defined extension field whose tag is the extension id the two
//! ends agree on through the service's own schema. Callers that do not
//! recognize the extension id still read the message.
//!
//! The wire layout is plain protobuf, kept bit-exact with existing
//! deployments: `message` in field 1, `code` in field 2, the extension as a
//! length-delimited field at its own tag. `prost::Message` is implemented by
//! hand because the extension tag is not known statically.

use bytes::{Buf, BufMut, Bytes};
use prost::DecodeError;
use prost::encoding::{self, DecodeContext, WireType};
use thiserror::Error;

/// Extension ids below this value are reserved for the framework itself.
/// Service schemas must pick ids at or above it, unique per code base.
pub const MIN_APPLICATION_EXTENSION_ID: u32 = 101;

/// Wire code carried in field 2 of the envelope.
///
/// The completion core only ever emits [`ErrorCode::ErrorApplication`]
/// ("application error, no further detail"); the remaining values belong to
/// the surrounding transport, which shares this envelope for its own
/// rejections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum ErrorCode {
    ErrorApplication = 1,
    ErrorNoSuchMethod = 2,
    ErrorNoSuchService = 3,
    ErrorServerTooBusy = 4,
    ErrorInvalidRequest = 5,
    FatalUnknown = 10,
    FatalServerShuttingDown = 11,
    FatalInvalidRpcHeader = 12,
    FatalDeserializingRequest = 13,
    FatalVersionMismatch = 14,
    FatalUnauthorized = 15,
}

/// Errors produced when building or reading an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error(
        "extension id {0} is reserved for the framework (must be >= {MIN_APPLICATION_EXTENSION_ID})"
    )]
    ReservedExtensionId(u32),

    #[error("malformed error envelope: {0}")]
    Decode(#[from] DecodeError),
}

/// A service-specific error detail, opaque to this core.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorExtension {
    /// The extension id, used as the protobuf field tag.
    pub id: u32,
    /// The serialized detail payload. Only callers sharing the service's
    /// schema can decode it.
    pub payload: Bytes,
}

/// The generic error structure returned to the remote caller.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorEnvelope {
    pub message: String,
    pub code: ErrorCode,
    pub extension: Option<ErrorExtension>,
}

impl ErrorEnvelope {
    /// Envelope for a handler-reported error: code `ERROR_APPLICATION`, no
    /// extension.
    pub fn application(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: ErrorCode::ErrorApplication,
            extension: None,
        }
    }

    /// Attach a serialized service-specific detail under `id`.
    pub fn with_extension(mut self, id: u32, payload: Bytes) -> Result<Self, EnvelopeError> {
        if id < MIN_APPLICATION_EXTENSION_ID {
            return Err(EnvelopeError::ReservedExtensionId(id));
        }
        self.extension = Some(ErrorExtension { id, payload });
        Ok(self)
    }

    /// Decode the extension payload as `D` if this envelope carries an
    /// extension with the given id. Returns `Ok(None)` when the envelope has
    /// no extension or a different one.
    pub fn detail<D>(&self, id: u32) -> Result<Option<D>, EnvelopeError>
    where
        D: prost::Message + Default,
    {
        match &self.extension {
            Some(ext) if ext.id == id => Ok(Some(D::decode(ext.payload.clone())?)),
            _ => Ok(None),
        }
    }
}

impl Default for ErrorEnvelope {
    fn default() -> Self {
        Self {
            message: String::new(),
            code: ErrorCode::FatalUnknown,
            extension: None,
        }
    }
}

impl prost::Message for ErrorEnvelope {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        // `message` is a required field in the original schema, so it is
        // written even when empty.
        encoding::string::encode(1, &self.message, buf);
        encoding::int32::encode(2, &(self.code as i32), buf);
        if let Some(ext) = &self.extension {
            encoding::bytes::encode(ext.id, &ext.payload, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1 => encoding::string::merge(wire_type, &mut self.message, buf, ctx),
            2 => {
                let mut raw = 0i32;
                encoding::int32::merge(wire_type, &mut raw, buf, ctx)?;
                self.code = ErrorCode::try_from(raw).unwrap_or(ErrorCode::FatalUnknown);
                Ok(())
            }
            id if id >= MIN_APPLICATION_EXTENSION_ID && wire_type == WireType::LengthDelimited => {
                let mut payload = Bytes::new();
                encoding::bytes::merge(wire_type, &mut payload, buf, ctx)?;
                self.extension = Some(ErrorExtension { id, payload });
                Ok(())
            }
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = encoding::string::encoded_len(1, &self.message)
            + encoding::int32::encoded_len(2, &(self.code as i32));
        if let Some(ext) = &self.extension {
            len += encoding::bytes::encoded_len(ext.id, &ext.payload);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[derive(Clone, PartialEq, ::prost::Message)]
    struct DetailMessage {
        #[prost(string, tag = "1")]
        field: String,
    }

    #[test]
    fn test_wire_layout_without_extension() {
        let envelope = ErrorEnvelope::application("boom");
        // field 1 (string "boom"), field 2 (varint 1)
        let expected = [0x0a, 0x04, b'b', b'o', b'o', b'm', 0x10, 0x01];
        assert_eq!(envelope.encode_to_vec(), expected);
        assert_eq!(envelope.encoded_len(), expected.len());
    }

    #[test]
    fn test_wire_layout_with_extension() {
        let envelope = ErrorEnvelope::application("e")
            .with_extension(150, Bytes::from_static(b"xyz"))
            .unwrap();
        // tag 150, wire type 2 => key varint (150 << 3) | 2 = 1202
        let expected = [
            0x0a, 0x01, b'e', // message
            0x10, 0x01, // code
            0xb2, 0x09, 0x03, b'x', b'y', b'z', // extension 150
        ];
        assert_eq!(envelope.encode_to_vec(), expected);
    }

    #[test]
    fn test_roundtrip_with_extension() {
        let detail = DetailMessage {
            field: "x".to_string(),
        };
        let envelope = ErrorEnvelope::application("bad request")
            .with_extension(150, detail.encode_to_vec().into())
            .unwrap();

        let decoded = ErrorEnvelope::decode(envelope.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.message, "bad request");
        assert_eq!(decoded.code, ErrorCode::ErrorApplication);
        assert_eq!(decoded.detail::<DetailMessage>(150).unwrap(), Some(detail));
        // A caller looking for a different extension sees nothing.
        assert_eq!(decoded.detail::<DetailMessage>(200).unwrap(), None);
    }

    #[test]
    fn test_unknown_code_maps_to_fatal_unknown() {
        let mut buf = Vec::new();
        encoding::string::encode(1, &"m".to_string(), &mut buf);
        encoding::int32::encode(2, &99, &mut buf);
        let decoded = ErrorEnvelope::decode(buf.as_slice()).unwrap();
        assert_eq!(decoded.code, ErrorCode::FatalUnknown);
        assert_eq!(decoded.message, "m");
    }

    #[test]
    fn test_reserved_extension_id_rejected() {
        let err = ErrorEnvelope::application("e")
            .with_extension(42, Bytes::new())
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::ReservedExtensionId(42)));
    }

    #[test]
    fn test_skips_unknown_low_tags() {
        let mut buf = Vec::new();
        encoding::string::encode(1, &"m".to_string(), &mut buf);
        encoding::int32::encode(2, &1, &mut buf);
        // Unknown field 9, below the extension threshold.
        encoding::string::encode(9, &"ignored".to_string(), &mut buf);
        let decoded = ErrorEnvelope::decode(buf.as_slice()).unwrap();
        assert_eq!(decoded.message, "m");
        assert!(decoded.extension.is_none());
    }
}
