//! # FOTA Fragmentation Module
//!
//! Turns an encoder report into the packets a device's fragmentation session receives: the
//! session setup header followed by the coded fragments, each prefixed by its index header.
//!
//! The report format belongs to the encoder, not to us, so everything that knows about it is
//! kept in this module:
//! ```text
//! Fragmentation header likely: [  0x02, 0x00, 0x05, 0x00, 0xEA, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00 ]
//! [8, 0, 1, 12, 34, ...]
//! [8, 0, 2, 56, 78, ...]
//! ```
//!
//! ## Corrections
//! Two fields of the report disagree with what the firmware expects and are rewritten:
//! - header byte 6 (padding) is recomputed from the payload length and fragment size
//! - bytes 1 and 2 of every fragment (the fragment counter) are swapped into little-endian order
//!
//! Fragment payload bytes are never touched.
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

use super::super::constants::{FRAG_HEADER_MARKER, FRAG_INDEX_SIZE, FRAG_LINE_PREFIX, FRAG_PADDING_INDEX};
use super::super::external::FragmentationEncoder;
use super::super::fota_errors::FotaError;
use anyhow::Result;

/// Fragmentation session setup as sent to the device.
/// ```text
/// [0x02: command][session][nb_frag lo][nb_frag hi][frag size][control][padding][descriptor x4]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentationHeader {
    bytes: Vec<u8>,
}

impl FragmentationHeader {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() <= FRAG_PADDING_INDEX {
            return Err(FotaError::MalformedFragmentationHeader(bytes.len()).into());
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn nb_frag(&self) -> u16 {
        u16::from_le_bytes([self.bytes[2], self.bytes[3]])
    }

    pub fn frag_size(&self) -> u8 {
        self.bytes[4]
    }

    pub fn padding(&self) -> u8 {
        self.bytes[FRAG_PADDING_INDEX]
    }

    fn set_padding(&mut self, padding: u8) {
        self.bytes[FRAG_PADDING_INDEX] = padding;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedPayload {
    pub header: FragmentationHeader,
    pub fragments: Vec<Vec<u8>>,
}

impl FramedPayload {
    /// Length of every fragment, index header included.
    pub fn fragment_length(&self) -> usize {
        self.fragments.first().map_or(0, Vec::len)
    }

    /// Header first, then the fragments in order.
    pub fn packets(&self) -> impl Iterator<Item = &[u8]> {
        std::iter::once(self.header.as_bytes()).chain(self.fragments.iter().map(Vec::as_slice))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentFramer {
    pub frag_size: u16,
    pub redundancy_packets: u16,
}

impl FragmentFramer {
    pub fn new(frag_size: u16, redundancy_packets: u16) -> Result<Self> {
        if frag_size == 0 || frag_size > u8::MAX as u16 {
            return Err(FotaError::InvalidFragmentSize(frag_size).into());
        }
        Ok(Self {
            frag_size,
            redundancy_packets,
        })
    }

    /// Runs `encoder` over the payload and frames its report.
    pub fn frame_with(&self, encoder: &dyn FragmentationEncoder, payload: &[u8]) -> Result<FramedPayload> {
        let report = encoder.encode(payload, self.frag_size, self.redundancy_packets)?;
        self.frame(payload, &report)
    }

    /// Parses an encoder report for `payload` and applies the header and fragment corrections.
    pub fn frame(&self, payload: &[u8], report: &str) -> Result<FramedPayload> {
        let mut header = None;
        let mut fragments = Vec::new();

        for line in report.lines() {
            if line.starts_with(FRAG_HEADER_MARKER) {
                header = Some(parse_header_line(line)?);
            } else if line.starts_with(FRAG_LINE_PREFIX) {
                fragments.push(parse_fragment_line(line)?);
            }
        }

        let mut header = FragmentationHeader::from_bytes(header.ok_or(FotaError::HeaderNotFound)?)?;
        if fragments.is_empty() {
            return Err(FotaError::NoFragmentsProduced.into());
        }

        header.set_padding(padding_length(payload.len(), self.frag_size));

        let fragment_length = fragments[0].len();
        for (index, fragment) in fragments.iter_mut().enumerate() {
            if fragment.len() < FRAG_INDEX_SIZE || fragment.len() != fragment_length {
                return Err(FotaError::MalformedFragment(index).into());
            }
            fragment.swap(1, 2);
        }

        tracing::debug!(
            fragments = fragments.len(),
            fragment_length,
            padding = header.padding(),
            "framed encoder report"
        );

        Ok(FramedPayload { header, fragments })
    }
}

/// Zero bytes appended to the last data fragment.
pub fn padding_length(payload_length: usize, frag_size: u16) -> u8 {
    let remainder = payload_length % frag_size as usize;
    if remainder == 0 {
        0
    } else {
        (frag_size as usize - remainder) as u8
    }
}

fn parse_header_line(line: &str) -> Result<Vec<u8>> {
    let values = line[FRAG_HEADER_MARKER.len()..].trim_start_matches(':');
    values
        .split(|c: char| c == ',' || c == '[' || c == ']' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(parse_byte)
        .collect()
}

fn parse_fragment_line(line: &str) -> Result<Vec<u8>> {
    line.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|token| parse_byte(token.trim()))
        .collect()
}

fn parse_byte(token: &str) -> Result<u8> {
    let parsed = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => token.parse::<u8>(),
    };
    parsed.map_err(|_| anyhow::Error::from(FotaError::InvalidReportToken(token.to_string())))
}
