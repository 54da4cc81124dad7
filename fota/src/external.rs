//! # FOTA External Collaborators Module
//!
//! Signing, diffing and fragmentation encoding are done by other tools. Each one is reached
//! through a narrow trait so the codecs can be driven by deterministic stubs in tests and by
//! external processes in production.
//!
//! ## Process contract
//! - every tool is invoked once, blocking, without timeout or retry
//! - a non-zero exit becomes `FotaError::EncoderInvocationFailed` with the captured streams
//! - temporary files handed to a tool are removed whatever the outcome
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

use super::fota_errors::FotaError;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Produces a DER encoded signature (70..=72 bytes for ECDSA P-256) over a file.
pub trait SigningOracle {
    fn sign(&self, file: &Path) -> Result<Vec<u8>>;
}

/// Produces a binary diff turning `old` into `new`.
pub trait DiffGenerator {
    fn diff(&self, old: &Path, new: &Path) -> Result<Vec<u8>>;
}

/// Produces a textual fragmentation report for a payload (see `FragmentFramer`).
pub trait FragmentationEncoder {
    fn encode(&self, payload: &[u8], frag_size: u16, redundancy_packets: u16) -> Result<String>;
}

/// Runs a prepared command and returns its stdout, or the captured output on failure.
pub fn run_tool(tool: &str, command: &mut Command) -> Result<Vec<u8>> {
    tracing::debug!(tool, ?command, "invoking external tool");

    let output = command.output().with_context(|| format!("failed to start {tool}"))?;
    if !output.status.success() {
        return Err(FotaError::EncoderInvocationFailed {
            tool: tool.to_string(),
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
        .into());
    }

    Ok(output.stdout)
}

#[derive(Debug, Clone)]
pub struct OpensslSigner {
    pub openssl: String,
    pub key_path: PathBuf,
}

impl OpensslSigner {
    pub fn new<P: AsRef<Path>>(openssl: &str, key_path: P) -> Self {
        Self {
            openssl: openssl.to_string(),
            key_path: key_path.as_ref().to_path_buf(),
        }
    }

    /// Generates a secp256r1 private key at `key_path` and returns the PEM public key.
    pub fn generate_keypair(&self) -> Result<Vec<u8>> {
        run_tool(
            "openssl ecparam",
            Command::new(&self.openssl)
                .args(["ecparam", "-genkey", "-name", "secp256r1", "-out"])
                .arg(&self.key_path),
        )?;

        run_tool(
            "openssl ec",
            Command::new(&self.openssl).args(["ec", "-in"]).arg(&self.key_path).arg("-pubout"),
        )
    }
}

impl SigningOracle for OpensslSigner {
    fn sign(&self, file: &Path) -> Result<Vec<u8>> {
        let signature = run_tool(
            "openssl dgst",
            Command::new(&self.openssl)
                .args(["dgst", "-sha256", "-sign"])
                .arg(&self.key_path)
                .arg(file),
        )?;

        tracing::info!(signature = %hex::encode(&signature), "signed {}", file.display());
        Ok(signature)
    }
}

#[derive(Debug, Clone)]
pub struct JdiffGenerator {
    pub diff_tool: PathBuf,
}

/// jdiff exit status for an unwritable output location.
const JDIFF_PERMISSION_STATUS: i32 = 5;

impl DiffGenerator for JdiffGenerator {
    fn diff(&self, old: &Path, new: &Path) -> Result<Vec<u8>> {
        let work_dir = tempfile::tempdir().context("failed to create diff work directory")?;
        let diff_path = work_dir.path().join("update.diff");

        let result = run_tool(
            "jdiff",
            Command::new(&self.diff_tool).arg(old).arg(new).arg(&diff_path),
        );
        if let Err(err) = &result {
            if let Some(FotaError::EncoderInvocationFailed { status: JDIFF_PERMISSION_STATUS, .. }) = err.downcast_ref::<FotaError>() {
                tracing::warn!(dir = %work_dir.path().display(), "this seems like a permission error, check write access");
            }
        }
        result?;

        fs::read(&diff_path).with_context(|| format!("failed to read diff {}", diff_path.display()))
    }
}

/// External encoder script invoked as `<python> <script> <payload file> <frag size> <redundancy>`.
#[derive(Debug, Clone)]
pub struct ScriptEncoder {
    pub python: String,
    pub script: PathBuf,
}

impl FragmentationEncoder for ScriptEncoder {
    fn encode(&self, payload: &[u8], frag_size: u16, redundancy_packets: u16) -> Result<String> {
        let mut payload_file = tempfile::NamedTempFile::new().context("failed to create payload file")?;
        payload_file.write_all(payload)?;
        payload_file.flush()?;

        let stdout = run_tool(
            "fragmentation encoder",
            Command::new(&self.python)
                .arg(&self.script)
                .arg(payload_file.path())
                .arg(frag_size.to_string())
                .arg(redundancy_packets.to_string()),
        )?;

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_run_tool_captures_output_on_failure() {
        let err = run_tool("sh", Command::new("sh").args(["-c", "echo out; echo err >&2; exit 3"])).unwrap_err();

        match err.downcast_ref::<FotaError>() {
            Some(FotaError::EncoderInvocationFailed { tool, status, stdout, stderr }) => {
                assert_eq!(tool, "sh");
                assert_eq!(*status, 3);
                assert_eq!(stdout, "out\n");
                assert_eq!(stderr, "err\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_tool_returns_stdout() {
        let stdout = run_tool("sh", Command::new("sh").args(["-c", "printf abc"])).unwrap();
        assert_eq!(stdout, b"abc");
    }

    #[cfg(unix)]
    #[test]
    fn test_script_encoder_passes_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("encoder.sh");
        fs::write(&script, "echo \"Fragmentation header likely: [ $(wc -c < \"$1\") ]\"\necho \"[8, $2, $3]\"\n").unwrap();

        let encoder = ScriptEncoder {
            python: "sh".to_string(),
            script,
        };
        let report = encoder.encode(&[1, 2, 3], 40, 7).unwrap();
        let lines: Vec<&str> = report.lines().map(str::trim).collect();

        assert!(lines[0].ends_with("3 ]"));
        assert_eq!(lines[1], "[8, 40, 7]");
    }

    #[test]
    fn test_missing_tool_fails_to_start() {
        let signer = OpensslSigner::new("/nonexistent/openssl", "update.key");
        assert!(signer.sign(Path::new("firmware.bin")).is_err());
    }
}
