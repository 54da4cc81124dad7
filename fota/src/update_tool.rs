//! # FOTA Update Tool Module
//!
//! Ties configuration, identity and the external collaborators together into the commands a
//! release engineer runs: provisioning a product line, signing a full image or a diff, reading a
//! manifest back and fragmenting a signed update for multicast delivery.
//!
//! ## Signed update layout
//! ```text
//! [payload: full image | generic diff | external diff][113 bytes: manifest]
//! ```
//! The signature and the version always describe the *new* firmware image, also when the payload
//! is a diff, because the device verifies the image it reconstructs.
//!
//! ## Usage
//! ```rust,ignore
//! let tool = UpdateTool::from_config(FotaConfig::load_or_default("FotaConfig.toml")?);
//! let signed = tool.sign_full_image("firmware.bin", false)?;
//! let framed = tool.create_fragments(&signed, 204, 40)?;
//! ```
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

use std::fs;
use std::path::Path;

use super::config::FotaConfig;
use super::core::device_identity::DeviceIdentity;
use super::core::diff_descriptor::DiffDescriptor;
use super::core::fragmentation::{FragmentFramer, FramedPayload};
use super::core::manifest::{DecodedManifest, Manifest};
use super::core::parity_encoder::ParityEncoder;
use super::external::{DiffGenerator, FragmentationEncoder, JdiffGenerator, OpensslSigner, ScriptEncoder, SigningOracle};
use super::fota_errors::FotaError;
use super::output::{OutputFormat, render_packets, render_update_certs_header, write_output};
use super::utils::{ensure_exists, modified_time_as_u32, read_input};

use anyhow::{Context, Result};

pub struct UpdateTool {
    pub config: FotaConfig,
    signer: Box<dyn SigningOracle>,
    differ: Box<dyn DiffGenerator>,
    encoder: Box<dyn FragmentationEncoder>,
}

impl UpdateTool {
    pub fn new(
        config: FotaConfig,
        signer: Box<dyn SigningOracle>,
        differ: Box<dyn DiffGenerator>,
        encoder: Box<dyn FragmentationEncoder>,
    ) -> Self {
        Self {
            config,
            signer,
            differ,
            encoder,
        }
    }

    /// Tool backed by openssl, jdiff and either the configured encoder script or the built-in encoder.
    pub fn from_config(config: FotaConfig) -> Self {
        let signer = OpensslSigner::new(&config.openssl, config.key_path());
        let differ = JdiffGenerator {
            diff_tool: config.diff_tool.clone(),
        };
        let encoder: Box<dyn FragmentationEncoder> = match &config.encoder_script {
            Some(script) => Box::new(ScriptEncoder {
                python: config.python.clone(),
                script: script.clone(),
            }),
            None => Box::new(ParityEncoder),
        };

        Self::new(config, Box::new(signer), Box::new(differ), encoder)
    }

    /// Creates the key pair and identity of a product line, and the firmware header embedding them.
    /// A failed provisioning leaves no keys folder behind.
    pub fn provision(config: &FotaConfig, domain_name: &str, model: &str) -> Result<DeviceIdentity> {
        if config.keys_dir.exists() {
            return Err(FotaError::IdentityAlreadyExists(config.keys_dir.clone()).into());
        }
        fs::create_dir_all(&config.keys_dir).with_context(|| format!("failed to create {}", config.keys_dir.display()))?;

        match Self::provision_keys_dir(config, domain_name, model) {
            Ok(identity) => Ok(identity),
            Err(err) => {
                if let Err(cleanup) = fs::remove_dir_all(&config.keys_dir) {
                    tracing::warn!(dir = %config.keys_dir.display(), %cleanup, "failed to remove partial keys folder");
                }
                Err(err)
            }
        }
    }

    fn provision_keys_dir(config: &FotaConfig, domain_name: &str, model: &str) -> Result<DeviceIdentity> {
        tracing::info!("Creating keypair");
        let public_key = OpensslSigner::new(&config.openssl, config.key_path()).generate_keypair()?;
        write_output(config.public_key_path(), &public_key)?;

        let identity = DeviceIdentity::from_names(domain_name, model);
        let header = render_update_certs_header(&String::from_utf8_lossy(&public_key), &identity)?;

        identity.save(config.identity_path())?;
        tracing::info!(
            manufacturer = %identity.manufacturer_uuid,
            device_class = %identity.device_class_uuid,
            "Wrote {}",
            config.identity_path().display()
        );

        write_output(&config.update_certs_header, header.as_bytes())?;

        Ok(identity)
    }

    pub fn identity(&self) -> Result<DeviceIdentity> {
        DeviceIdentity::load(self.config.identity_path(), self.config.legacy_identity_path())
    }

    /// Signs `signed_file` and returns its manifest bytes.
    fn create_manifest(&self, signed_file: &Path, diff: DiffDescriptor, override_version: bool) -> Result<Vec<u8>> {
        let identity = self.identity()?;
        ensure_exists(signed_file)?;

        let signature = self.signer.sign(signed_file)?;
        tracing::info!(diff = %diff, "diff descriptor");

        Manifest::for_file(signed_file, &signature, identity, diff, override_version)?.to_bytes()
    }

    /// Full image followed by its manifest.
    pub fn sign_full_image<P: AsRef<Path>>(&self, binary: P, override_version: bool) -> Result<Vec<u8>> {
        let binary = binary.as_ref();
        let mut signed = read_input(binary)?;
        signed.extend(self.create_manifest(binary, DiffDescriptor::Full, override_version)?);
        Ok(signed)
    }

    /// Generated diff from `old` to `new` followed by the manifest of `new`.
    pub fn sign_generic_diff<P: AsRef<Path>>(&self, old: P, new: P, override_version: bool) -> Result<Vec<u8>> {
        let (old, new) = (old.as_ref(), new.as_ref());
        ensure_exists(old)?;
        ensure_exists(new)?;

        let diff = DiffDescriptor::generic(fs::metadata(old)?.len())?;
        let mut signed = self.differ.diff(old, new)?;
        signed.extend(self.create_manifest(new, diff, override_version)?);
        Ok(signed)
    }

    /// Externally produced diff followed by the manifest of `new`.
    pub fn sign_external_diff<P: AsRef<Path>>(&self, old: P, new: P, diff_file: P, override_version: bool) -> Result<Vec<u8>> {
        let (old, new) = (old.as_ref(), new.as_ref());
        ensure_exists(old)?;
        tracing::info!(old = modified_time_as_u32(old)?, new = modified_time_as_u32(new)?, "binary versions");

        let diff = DiffDescriptor::external(fs::metadata(old)?.len())?;
        let mut signed = read_input(diff_file)?;
        signed.extend(self.create_manifest(new, diff, override_version)?);
        Ok(signed)
    }

    /// Decodes the manifest at the end of a signed file.
    pub fn read_manifest<P: AsRef<Path>>(file: P) -> Result<DecodedManifest> {
        Manifest::from_file_tail(&read_input(file)?)
    }

    pub fn create_fragments(&self, payload: &[u8], frag_size: u16, redundancy_packets: u16) -> Result<FramedPayload> {
        FragmentFramer::new(frag_size, redundancy_packets)?.frame_with(self.encoder.as_ref(), payload)
    }

    /// Renders a signed update in `format`. Packet formats need a fragmentation setup.
    pub fn render(&self, signed: Vec<u8>, format: OutputFormat, fragmentation: Option<(u16, u16)>) -> Result<Vec<u8>> {
        if !format.is_packets() {
            return Ok(signed);
        }

        let (frag_size, redundancy_packets) =
            fragmentation.context("--frag-size and --redundancy-packets are required for packet output")?;
        let framed = self.create_fragments(&signed, frag_size, redundancy_packets)?;
        Ok(render_packets(format, &framed)?.into_bytes())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    struct FixedSigner(usize);

    impl SigningOracle for FixedSigner {
        fn sign(&self, _file: &Path) -> Result<Vec<u8>> {
            Ok(vec![0x30; self.0])
        }
    }

    struct ConcatDiff;

    impl DiffGenerator for ConcatDiff {
        fn diff(&self, _old: &Path, new: &Path) -> Result<Vec<u8>> {
            let mut diff = b"DIFF".to_vec();
            diff.extend(fs::read(new)?);
            Ok(diff)
        }
    }

    fn tool(dir: &Path) -> UpdateTool {
        let config = FotaConfig {
            keys_dir: dir.join("keys"),
            ..FotaConfig::default()
        };
        fs::create_dir_all(&config.keys_dir).unwrap();
        DeviceIdentity::from_names("example.com", "awesome-2000").save(config.identity_path()).unwrap();

        UpdateTool::new(config, Box::new(FixedSigner(71)), Box::new(ConcatDiff), Box::new(ParityEncoder))
    }

    fn write(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, vec![0x5A; len]).unwrap();
        path
    }

    #[cfg(unix)]
    fn fake_openssl(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("openssl.sh");
        fs::write(
            &script,
            "#!/bin/sh\nif [ \"$1\" = \"ecparam\" ]; then echo PRIVATE > \"$6\"; exit 0; fi\nprintf '%s\\n' '-----BEGIN PUBLIC KEY-----' 'MFkw' '-----END PUBLIC KEY-----'\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn provisioning_config(dir: &Path, openssl: &str) -> FotaConfig {
        FotaConfig {
            keys_dir: dir.join(".fota-keys"),
            openssl: openssl.to_string(),
            update_certs_header: dir.join("UpdateCerts.h"),
            ..FotaConfig::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_provision_writes_keys_identity_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let openssl = fake_openssl(dir.path());
        let config = provisioning_config(dir.path(), openssl.to_str().unwrap());

        let identity = UpdateTool::provision(&config, "example.com", "awesome-2000").unwrap();
        assert_eq!(identity, DeviceIdentity::from_names("example.com", "awesome-2000"));

        assert_eq!(fs::read_to_string(config.key_path()).unwrap(), "PRIVATE\n");
        assert_eq!(
            fs::read_to_string(config.public_key_path()).unwrap(),
            "-----BEGIN PUBLIC KEY-----\nMFkw\n-----END PUBLIC KEY-----\n"
        );

        let tool = UpdateTool::from_config(config.clone());
        assert_eq!(tool.identity().unwrap(), identity);

        let header = fs::read_to_string(&config.update_certs_header).unwrap();
        assert!(header.contains("UPDATE_CERT_PUBKEY = \"-----BEGIN PUBLIC KEY-----\\nMFkw\\n-----END PUBLIC KEY-----\\n\";"));
        let manufacturer: Vec<String> = identity.manufacturer_bytes().iter().map(|b| format!("0x{b:x}")).collect();
        assert!(header.contains(&format!("UPDATE_CERT_MANUFACTURER_UUID[16] = {{ {} }};", manufacturer.join(", "))));
        let device_class: Vec<String> = identity.device_class_bytes().iter().map(|b| format!("0x{b:x}")).collect();
        assert!(header.contains(&format!("UPDATE_CERT_DEVICE_CLASS_UUID[16] = {{ {} }};", device_class.join(", "))));

        let err = UpdateTool::provision(&config, "example.com", "awesome-2000").unwrap_err();
        assert!(matches!(err.downcast_ref::<FotaError>(), Some(FotaError::IdentityAlreadyExists(_))));
    }

    #[test]
    fn test_failed_provision_leaves_no_keys_folder() {
        let dir = tempfile::tempdir().unwrap();
        let config = provisioning_config(dir.path(), "/nonexistent/openssl");

        assert!(UpdateTool::provision(&config, "example.com", "awesome-2000").is_err());
        assert!(!config.keys_dir.exists());
        assert!(!config.update_certs_header.exists());

        let err = UpdateTool::provision(&config, "example.com", "awesome-2000").unwrap_err();
        assert!(!matches!(err.downcast_ref::<FotaError>(), Some(FotaError::IdentityAlreadyExists(_))));
        assert!(!config.keys_dir.exists());
    }

    #[test]
    fn test_sign_full_image() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool(dir.path());
        let binary = write(dir.path(), "fw.bin", 300);

        let signed = tool.sign_full_image(&binary, false).unwrap();
        assert_eq!(signed.len(), 300 + 113);

        let manifest = Manifest::from_file_tail(&signed).unwrap();
        assert_eq!(manifest.sig_length, 71);
        assert_eq!(manifest.diff, Some(DiffDescriptor::Full));
        assert_eq!(manifest.identity, DeviceIdentity::from_names("example.com", "awesome-2000"));
    }

    #[test]
    fn test_sign_generic_diff() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool(dir.path());
        let old = write(dir.path(), "old.bin", 4000);
        let new = write(dir.path(), "new.bin", 10);

        let signed = tool.sign_generic_diff(&old, &new, false).unwrap();
        assert_eq!(&signed[..4], b"DIFF");
        assert_eq!(signed.len(), 4 + 10 + 113);

        let manifest = Manifest::from_file_tail(&signed).unwrap();
        assert_eq!(manifest.diff, Some(DiffDescriptor::GenericDiff { base_image_size: 4000 }));
        assert_eq!(manifest.version, modified_time_as_u32(&new).unwrap());
    }

    #[test]
    fn test_sign_external_diff() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool(dir.path());
        let old = write(dir.path(), "old.bin", 70_000);
        let new = write(dir.path(), "new.bin", 10);
        let patch = write(dir.path(), "patch.ddelta", 33);

        let signed = tool.sign_external_diff(&old, &new, &patch, false).unwrap();
        assert_eq!(signed.len(), 33 + 113);
        assert_eq!(&signed[signed.len() - 4..], &[2, 0x01, 0x11, 0x70]);
    }

    #[test]
    fn test_missing_identity() {
        let dir = tempfile::tempdir().unwrap();
        let config = FotaConfig {
            keys_dir: dir.path().join("keys"),
            ..FotaConfig::default()
        };
        let tool = UpdateTool::new(config, Box::new(FixedSigner(70)), Box::new(ConcatDiff), Box::new(ParityEncoder));
        let binary = write(dir.path(), "fw.bin", 10);

        let err = tool.sign_full_image(&binary, false).unwrap_err();
        assert!(matches!(err.downcast_ref::<FotaError>(), Some(FotaError::MissingIdentity(_))));
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool(dir.path());

        let err = tool.sign_full_image(dir.path().join("absent.bin"), false).unwrap_err();
        assert!(matches!(err.downcast_ref::<FotaError>(), Some(FotaError::FileNotFound(_))));
    }

    #[test]
    fn test_bad_signature_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut tool = tool(dir.path());
        tool.signer = Box::new(FixedSigner(64));
        let binary = write(dir.path(), "fw.bin", 10);

        let err = tool.sign_full_image(&binary, false).unwrap_err();
        assert!(matches!(err.downcast_ref::<FotaError>(), Some(FotaError::InvalidSignatureLength(64))));
    }

    #[test]
    fn test_render_packets() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool(dir.path());
        let binary = write(dir.path(), "fw.bin", 1000);
        let signed = tool.sign_full_image(&binary, false).unwrap();

        assert_eq!(tool.render(signed.clone(), OutputFormat::Bin, None).unwrap(), signed);
        assert!(tool.render(signed.clone(), OutputFormat::PacketsPlain, None).is_err());

        let plain = String::from_utf8(tool.render(signed, OutputFormat::PacketsPlain, Some((100, 2))).unwrap()).unwrap();
        let lines: Vec<&str> = plain.lines().collect();
        assert_eq!(lines.len(), 1 + 12 + 2);
        // 1113 bytes over 100 byte fragments leaves 87 bytes of padding
        assert_eq!(lines[0], "02 00 0c 00 64 00 57 00 00 00 00");
        assert!(lines[1].starts_with("08 01 00 5a"));
    }

    #[test]
    fn test_read_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool(dir.path());
        let binary = write(dir.path(), "fw.bin", 20);
        let signed_path = dir.path().join("signed.bin");
        fs::write(&signed_path, tool.sign_full_image(&binary, true).unwrap()).unwrap();

        let manifest = UpdateTool::read_manifest(&signed_path).unwrap();
        assert_eq!(manifest.signature, vec![0x30; 71]);

        let short = write(dir.path(), "short.bin", 50);
        assert!(UpdateTool::read_manifest(short).is_err());
    }
}
