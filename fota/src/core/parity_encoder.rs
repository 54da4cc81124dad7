//! # FOTA Parity Encoder Module
//!
//! Built-in fragmentation encoder using the LoRaWAN fragmented data block transport parity
//! matrix. Data rows are the payload split into `frag_size` chunks (the last one zero padded);
//! each redundancy row is the XOR of the data rows selected by a pseudo-random matrix line, so a
//! device missing a few fragments can still rebuild the payload.
//!
//! The encoder prints the same textual report an external encoder script prints, so
//! `FragmentFramer` treats both the same way and applies the same corrections.
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

use super::super::constants::{FRAG_DATA_TAG, FRAG_HEADER_MARKER, FRAG_SESSION_SETUP_CID};
use super::super::external::FragmentationEncoder;
use super::super::fota_errors::FotaError;
use anyhow::Result;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct ParityEncoder;

impl FragmentationEncoder for ParityEncoder {
    fn encode(&self, payload: &[u8], frag_size: u16, redundancy_packets: u16) -> Result<String> {
        if frag_size == 0 || frag_size > u8::MAX as u16 {
            return Err(FotaError::InvalidFragmentSize(frag_size).into());
        }
        let frag_size = frag_size as usize;

        let mut data = payload.to_vec();
        if data.len() % frag_size != 0 {
            data.resize(data.len() + frag_size - data.len() % frag_size, 0);
        }

        let data_rows: Vec<&[u8]> = data.chunks(frag_size).collect();
        let data_row_count = data_rows.len();
        let total_rows = data_row_count + redundancy_packets as usize;
        if total_rows > u16::MAX as usize {
            return Err(FotaError::TooManyFragments(total_rows).into());
        }

        let mut rows: Vec<Vec<u8>> = data_rows.iter().map(|row| row.to_vec()).collect();
        for line_number in 1..=redundancy_packets as usize {
            let mut parity = vec![0u8; frag_size];
            for (selected, row) in matrix_line(line_number, data_row_count).iter().zip(&data_rows) {
                if *selected {
                    parity.iter_mut().zip(row.iter()).for_each(|(p, b)| *p ^= b);
                }
            }
            rows.push(parity);
        }

        let mut report = String::new();
        writeln!(
            report,
            "{FRAG_HEADER_MARKER}: [  0x{FRAG_SESSION_SETUP_CID:02X}, 0x00, 0x{:02X}, 0x{:02X}, 0x{frag_size:02X}, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00 ]",
            data_row_count & 0xFF,
            (data_row_count >> 8) & 0xFF,
        )?;

        for (index, row) in rows.iter().enumerate() {
            let fcnt = index + 1;
            let values: Vec<String> = [FRAG_DATA_TAG, (fcnt >> 8) as u8, fcnt as u8]
                .iter()
                .chain(row.iter())
                .map(u8::to_string)
                .collect();
            writeln!(report, "[{}]", values.join(", "))?;
        }

        tracing::debug!(data_rows = data_row_count, redundancy_packets, "parity encoding done");
        Ok(report)
    }
}

fn prbs23(x: u64) -> u64 {
    let b0 = x & 1;
    let b1 = (x >> 5) & 1;
    (x >> 1) + ((b0 ^ b1) << 22)
}

/// Row selection for redundancy line `line_number` over `line_length` data rows.
pub fn matrix_line(line_number: usize, line_length: usize) -> Vec<bool> {
    let mut line = vec![false; line_length];

    let m = if line_length.is_power_of_two() { 1 } else { 0 };
    let mut x = 1 + 1001 * line_number as u64;

    for _ in 0..line_length / 2 {
        let mut r = 1usize << 16;
        while r >= line_length {
            x = prbs23(x);
            r = (x % (line_length + m) as u64) as usize;
        }
        line[r] = true;
    }

    line
}
