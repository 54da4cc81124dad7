//! # FOTA Output Module
//!
//! Renders signed updates and fragmented packets into the encodings the rest of the tool chain
//! consumes: raw bytes, hex text for test harnesses, and C sources for firmware build trees.
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

use super::core::device_identity::DeviceIdentity;
use super::core::fragmentation::FramedPayload;
use super::core::manifest::DecodedManifest;
use super::utils::bytes_to_hex;
use anyhow::{Context, Result, bail};
use std::fmt::{self, Write};
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Signed binary as is.
    #[default]
    Bin,
    /// Header and fragments as space separated hex, one packet per line.
    PacketsPlain,
    /// Header and fragments as C arrays.
    PacketsH,
}

impl OutputFormat {
    pub fn is_packets(&self) -> bool {
        !matches!(self, Self::Bin)
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bin" => Ok(Self::Bin),
            "packets-plain" | "plain" => Ok(Self::PacketsPlain),
            "packets-h" | "h" => Ok(Self::PacketsH),
            other => bail!("unknown output format `{other}`"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bin => write!(f, "bin"),
            Self::PacketsPlain => write!(f, "packets-plain"),
            Self::PacketsH => write!(f, "packets-h"),
        }
    }
}

pub fn render_packets(format: OutputFormat, framed: &FramedPayload) -> Result<String> {
    match format {
        OutputFormat::PacketsPlain => Ok(render_packets_plain(framed)),
        OutputFormat::PacketsH => render_packets_h(framed),
        OutputFormat::Bin => bail!("binary output has no packet rendering"),
    }
}

pub fn render_packets_plain(framed: &FramedPayload) -> String {
    framed
        .packets()
        .map(|packet| packet.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_packets_h(framed: &FramedPayload) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "#ifndef PACKETS_H")?;
    writeln!(out, "#define PACKETS_H")?;
    writeln!(out)?;
    writeln!(out, "#include \"mbed.h\"")?;
    writeln!(out)?;
    writeln!(out, "const uint8_t FAKE_PACKETS_HEADER[] = {{ {} }};", c_bytes(framed.header.as_bytes()))?;
    writeln!(out)?;
    writeln!(out, "const uint8_t FAKE_PACKETS[][{}] = {{", framed.fragment_length())?;
    for fragment in &framed.fragments {
        writeln!(out, "    {{ {} }},", c_bytes(fragment))?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    writeln!(out, "#endif")?;
    Ok(out)
}

/// Firmware header carrying the update public key and the product identity.
pub fn render_update_certs_header(public_key_pem: &str, identity: &DeviceIdentity) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "#ifndef _UPDATE_CERTS_H")?;
    writeln!(out, "#define _UPDATE_CERTS_H")?;
    writeln!(out)?;
    writeln!(out, "const char * UPDATE_CERT_PUBKEY = {};", serde_json::to_string(public_key_pem)?)?;
    writeln!(out, "const size_t UPDATE_CERT_LENGTH = {};", public_key_pem.len() + 1)?;
    writeln!(out)?;
    writeln!(out, "const uint8_t UPDATE_CERT_MANUFACTURER_UUID[16] = {{ {} }};", c_bytes(identity.manufacturer_bytes()))?;
    writeln!(out, "const uint8_t UPDATE_CERT_DEVICE_CLASS_UUID[16] = {{ {} }};", c_bytes(identity.device_class_bytes()))?;
    writeln!(out)?;
    writeln!(out, "#endif // _UPDATE_CERTS_H_")?;
    Ok(out)
}

/// Human readable dump of a decoded manifest.
pub fn describe_manifest(manifest: &DecodedManifest) -> String {
    let mut lines = vec![
        "-----------------------------------".to_string(),
        format!("The file signature length is : {}", manifest.sig_length),
        "hex signature of file id : ".to_string(),
        bytes_to_hex(&manifest.signature),
        "-----------------------------------".to_string(),
        format!("manuUUID is    : {}", bytes_to_hex(manifest.identity.manufacturer_bytes())),
        format!("deviceUUID is  : {}", bytes_to_hex(manifest.identity.device_class_bytes())),
        "-----------------------------------".to_string(),
        format!("Bin version : {}", manifest.version),
    ];

    match manifest.diff {
        Some(diff) => {
            lines.push(format!("This is a {diff}"));
            if let Some(size) = diff.base_image_size() {
                lines.push(format!("Old binary size should be : {size} bytes"));
            }
        }
        None => lines.push(format!("Diff descriptor bytes : {}", bytes_to_hex(&manifest.diff_bytes))),
    }

    lines.extend(manifest.warnings.iter().map(|warning| format!("warning: {warning}")));
    lines.join("\n")
}

/// Writes a finished output in one go.
pub fn write_output<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("Written to {}", path.display());
    Ok(())
}

fn c_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("0x{b:x}")).collect::<Vec<_>>().join(", ")
}
