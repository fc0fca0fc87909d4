// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP frame codec
//!
//! Explicit decode and encode functions over byte slices. A request frame
//! carries a 7-byte MBAP header (transaction, protocol, length, unit)
//! followed by the function code and its payload; every multi-byte field
//! on the wire is big-endian.
//!
//! Decoding never reads past the received buffer: short or truncated
//! frames produce a [`FrameError`] instead of garbage. Header fields are
//! opaque to the codec and echoed verbatim into responses; only the
//! `length` field is recomputed where the protocol requires it.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

/// Read Holding Registers.
pub const FN_READ_HOLDING_REGS: u8 = 0x03;
/// Preset Single Register.
pub const FN_PRESET_SINGLE_REG: u8 = 0x06;
/// Preset Few (multiple) Registers.
pub const FN_PRESET_FEW_REGS: u8 = 0x10;

/// Size of the MBAP header alone.
pub const MBAP_HEADER_LEN: usize = 7;
/// Size of the MBAP header plus the function code. A frame shorter than
/// this is not dispatched.
pub const REQUEST_HEADER_LEN: usize = MBAP_HEADER_LEN + 1;

/// The fixed transaction/protocol/length/unit preamble of every frame.
///
/// `transaction_id`, `protocol_id` and `unit_id` are opaque and echoed
/// verbatim in responses. `length` is whatever the master sent; it is not
/// trusted on input and recomputed for responses that need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub length: u16,
    pub unit_id: u8,
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Function 3: read `quantity` words starting at `start`.
    ReadHoldingRegs { start: u16, quantity: u16 },
    /// Function 6: write one word.
    PresetSingleReg { addr: u16, value: u16 },
    /// Function 16: write consecutive words starting at `start`.
    PresetFewRegs { start: u16, values: Vec<u16> },
    /// Any other function code. Decoded so the dispatcher can log it, but
    /// the slave sends nothing back and the master runs into its own
    /// timeout. Answering with a Modbus exception would be kinder; kept
    /// silent to match the device being simulated.
    Unsupported { function: u8 },
}

/// A typed result ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Function 3: the words read, in address order.
    ReadHoldingRegs { words: Vec<u16> },
    /// Function 6: echo of the written address and value.
    PresetSingleReg { addr: u16, value: u16 },
    /// Function 16: echo of the start address and the word count.
    PresetFewRegs { start: u16, quantity: u16 },
}

/// Error type for frame decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than an MBAP header plus function code.
    #[error("frame too short for MBAP header and function code: {len} bytes")]
    ShortFrame { len: usize },

    /// The payload the function code implies does not fit in the received
    /// bytes.
    #[error("function {function} payload truncated: expected {expected} bytes, received {received}")]
    TruncatedPayload {
        function: u8,
        expected: usize,
        received: usize,
    },
}

fn require(function: u8, frame: &[u8], expected: usize) -> Result<(), FrameError> {
    if frame.len() < expected {
        return Err(FrameError::TruncatedPayload {
            function,
            expected,
            received: frame.len(),
        });
    }
    Ok(())
}

/// Decode a request frame into its header and typed command.
///
/// The frame must contain at least the MBAP header and the function code.
/// Function-specific payloads are validated against the received length,
/// including the full value run of a multi-register write.
pub fn decode_request(frame: &[u8]) -> Result<(MbapHeader, Request), FrameError> {
    if frame.len() < REQUEST_HEADER_LEN {
        return Err(FrameError::ShortFrame { len: frame.len() });
    }

    let header = MbapHeader {
        transaction_id: BigEndian::read_u16(&frame[0..2]),
        protocol_id: BigEndian::read_u16(&frame[2..4]),
        length: BigEndian::read_u16(&frame[4..6]),
        unit_id: frame[6],
    };
    let function = frame[7];

    let request = match function {
        FN_READ_HOLDING_REGS => {
            require(function, frame, REQUEST_HEADER_LEN + 4)?;
            Request::ReadHoldingRegs {
                start: BigEndian::read_u16(&frame[8..10]),
                quantity: BigEndian::read_u16(&frame[10..12]),
            }
        }
        FN_PRESET_SINGLE_REG => {
            require(function, frame, REQUEST_HEADER_LEN + 4)?;
            Request::PresetSingleReg {
                addr: BigEndian::read_u16(&frame[8..10]),
                value: BigEndian::read_u16(&frame[10..12]),
            }
        }
        FN_PRESET_FEW_REGS => {
            // start, quantity, then a byte count the original ignores in
            // favour of the quantity field
            require(function, frame, REQUEST_HEADER_LEN + 5)?;
            let start = BigEndian::read_u16(&frame[8..10]);
            let quantity = BigEndian::read_u16(&frame[10..12]);
            let values_at = REQUEST_HEADER_LEN + 5;
            require(function, frame, values_at + 2 * quantity as usize)?;
            let values = frame[values_at..values_at + 2 * quantity as usize]
                .chunks_exact(2)
                .map(BigEndian::read_u16)
                .collect();
            Request::PresetFewRegs { start, values }
        }
        _ => Request::Unsupported { function },
    };

    Ok((header, request))
}

fn write_header(buf: &mut [u8], header: &MbapHeader, length: u16, function: u8) {
    BigEndian::write_u16(&mut buf[0..2], header.transaction_id);
    BigEndian::write_u16(&mut buf[2..4], header.protocol_id);
    BigEndian::write_u16(&mut buf[4..6], length);
    buf[6] = header.unit_id;
    buf[7] = function;
}

/// Encode a response frame.
///
/// The transaction, protocol and unit fields of `header` are echoed
/// verbatim. The `length` field follows the per-function rules of the
/// device being simulated:
///
/// - read: total response bytes minus the 6 non-length-prefixed header
///   bytes, i.e. `3 + 2 * word count`;
/// - single write: the request's own `length` field, because the response
///   is a byte-for-byte echo of the first 12 request bytes;
/// - multiple write: the fixed value 6.
pub fn encode_response(header: &MbapHeader, response: &Response) -> Vec<u8> {
    match response {
        Response::ReadHoldingRegs { words } => {
            let length = 3 + 2 * words.len();
            let mut buf = vec![0u8; REQUEST_HEADER_LEN + 1 + 2 * words.len()];
            write_header(&mut buf, header, length as u16, FN_READ_HOLDING_REGS);
            // The data-length byte wraps past 127 words, exactly like the
            // 8-bit field it mirrors
            buf[8] = (2 * words.len()) as u8;
            for (chunk, word) in buf[9..].chunks_exact_mut(2).zip(words) {
                BigEndian::write_u16(chunk, *word);
            }
            buf
        }
        Response::PresetSingleReg { addr, value } => {
            let mut buf = vec![0u8; REQUEST_HEADER_LEN + 4];
            write_header(&mut buf, header, header.length, FN_PRESET_SINGLE_REG);
            BigEndian::write_u16(&mut buf[8..10], *addr);
            BigEndian::write_u16(&mut buf[10..12], *value);
            buf
        }
        Response::PresetFewRegs { start, quantity } => {
            let mut buf = vec![0u8; REQUEST_HEADER_LEN + 4];
            write_header(&mut buf, header, 6, FN_PRESET_FEW_REGS);
            BigEndian::write_u16(&mut buf[8..10], *start);
            BigEndian::write_u16(&mut buf[10..12], *quantity);
            buf
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> MbapHeader {
        MbapHeader {
            transaction_id: 0x2A3B,
            protocol_id: 0,
            length: 6,
            unit_id: 0x11,
        }
    }

    #[test]
    fn test_decode_read_holding_regs() {
        let frame = [
            0x2A, 0x3B, // transaction
            0x00, 0x00, // protocol
            0x00, 0x06, // length
            0x11, // unit
            0x03, // function
            0x00, 0x64, // start = 100
            0x00, 0x02, // quantity = 2
        ];
        let (hdr, request) = decode_request(&frame).unwrap();
        assert_eq!(hdr, header());
        assert_eq!(
            request,
            Request::ReadHoldingRegs {
                start: 100,
                quantity: 2
            }
        );
    }

    #[test]
    fn test_decode_preset_single_reg() {
        let frame = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06, 0x01, 0x00, 0xAB, 0xCD,
        ];
        let (_, request) = decode_request(&frame).unwrap();
        assert_eq!(
            request,
            Request::PresetSingleReg {
                addr: 256,
                value: 0xABCD
            }
        );
    }

    #[test]
    fn test_decode_preset_few_regs() {
        let frame = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x10, // header + function
            0x00, 0x0A, // start = 10
            0x00, 0x02, // quantity = 2
            0x04, // byte count (ignored)
            0x12, 0x34, 0x56, 0x78, // values
        ];
        let (_, request) = decode_request(&frame).unwrap();
        assert_eq!(
            request,
            Request::PresetFewRegs {
                start: 10,
                values: vec![0x1234, 0x5678]
            }
        );
    }

    #[test]
    fn test_decode_short_frame() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01];
        assert_eq!(
            decode_request(&frame),
            Err(FrameError::ShortFrame { len: 7 })
        );
    }

    #[test]
    fn test_decode_read_missing_payload() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x64];
        assert!(matches!(
            decode_request(&frame),
            Err(FrameError::TruncatedPayload { function: 0x03, .. })
        ));
    }

    #[test]
    fn test_decode_preset_few_regs_truncated_values() {
        // Claims two registers but carries bytes for one
        let frame = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x10, 0x00, 0x0A, 0x00, 0x02, 0x04, 0x12,
            0x34,
        ];
        assert!(matches!(
            decode_request(&frame),
            Err(FrameError::TruncatedPayload {
                function: 0x10,
                expected: 17,
                received: 15
            })
        ));
    }

    #[test]
    fn test_decode_unsupported_function() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x04, 0x00, 0x00, 0x00, 0x01];
        let (_, request) = decode_request(&frame).unwrap();
        assert_eq!(request, Request::Unsupported { function: 0x04 });
    }

    #[test]
    fn test_encode_read_response() {
        let response = Response::ReadHoldingRegs {
            words: vec![30, 0x41F0],
        };
        let encoded = encode_response(&header(), &response);
        assert_eq!(
            encoded,
            vec![
                0x2A, 0x3B, // transaction echoed
                0x00, 0x00, // protocol echoed
                0x00, 0x07, // length = 3 + 2 * 2
                0x11, // unit echoed
                0x03, // function
                0x04, // data bytes
                0x00, 0x1E, // 30
                0x41, 0xF0,
            ]
        );
    }

    #[test]
    fn test_encode_single_write_echoes_request_length() {
        let mut hdr = header();
        // A master sending a nonsense length field gets it echoed straight back
        hdr.length = 0x1234;
        let response = Response::PresetSingleReg {
            addr: 7,
            value: 99,
        };
        let encoded = encode_response(&hdr, &response);
        assert_eq!(
            encoded,
            vec![0x2A, 0x3B, 0x00, 0x00, 0x12, 0x34, 0x11, 0x06, 0x00, 0x07, 0x00, 0x63]
        );
    }

    #[test]
    fn test_encode_multiple_write_has_fixed_length() {
        let mut hdr = header();
        hdr.length = 0x0B;
        let response = Response::PresetFewRegs {
            start: 10,
            quantity: 2,
        };
        let encoded = encode_response(&hdr, &response);
        assert_eq!(
            encoded,
            vec![0x2A, 0x3B, 0x00, 0x00, 0x00, 0x06, 0x11, 0x10, 0x00, 0x0A, 0x00, 0x02]
        );
    }
}
