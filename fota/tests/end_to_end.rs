use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use anyhow::Result;
use fota::prelude::*;
use uuid::Uuid;

struct StubSigner;

impl SigningOracle for StubSigner {
    fn sign(&self, _file: &Path) -> Result<Vec<u8>> {
        Ok((0..70).collect())
    }
}

struct NoDiff;

impl DiffGenerator for NoDiff {
    fn diff(&self, _old: &Path, _new: &Path) -> Result<Vec<u8>> {
        anyhow::bail!("no diff tool in tests")
    }
}

fn provisioned_tool(dir: &Path) -> UpdateTool {
    let config = FotaConfig {
        keys_dir: dir.join(".fota-keys"),
        ..FotaConfig::default()
    };
    fs::create_dir_all(&config.keys_dir).unwrap();

    let identity = DeviceIdentity::new(
        Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap(),
        Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap(),
    );
    identity.save(config.identity_path()).unwrap();

    UpdateTool::new(config, Box::new(StubSigner), Box::new(NoDiff), Box::new(ParityEncoder))
}

#[test]
fn signed_full_image_carries_mtime_version() {
    let dir = tempfile::tempdir().unwrap();
    let tool = provisioned_tool(dir.path());

    let image = dir.path().join("firmware.bin");
    fs::write(&image, vec![0xC3; 10_000]).unwrap();
    File::options()
        .write(true)
        .open(&image)
        .unwrap()
        .set_modified(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        .unwrap();

    let signed = tool.sign_full_image(&image, false).unwrap();
    assert_eq!(signed.len(), 10_113);

    let manifest = &signed[10_000..];
    assert_eq!(manifest[0], 70);
    assert_eq!(&manifest[71..73], &[0, 0]);
    assert_eq!(&manifest[73..89], &[0x11; 16]);
    assert_eq!(&manifest[89..105], &[0x22; 16]);
    assert_eq!(u32::from_le_bytes(manifest[105..109].try_into().unwrap()), 1_700_000_000);
    assert_eq!(&manifest[109..113], &[0, 0, 0, 0]);

    let out = dir.path().join("signed.bin");
    write_output(&out, &signed).unwrap();
    let decoded = UpdateTool::read_manifest(&out).unwrap();
    assert_eq!(decoded.version, 1_700_000_000);
    assert_eq!(decoded.signature, (0..70).collect::<Vec<u8>>());
    assert_eq!(decoded.diff, Some(DiffDescriptor::Full));
    assert!(decoded.warnings.is_empty());
}

#[test]
fn signed_image_fragments_into_device_packets() {
    let dir = tempfile::tempdir().unwrap();
    let tool = provisioned_tool(dir.path());

    let image = dir.path().join("firmware.bin");
    fs::write(&image, vec![0x42; 887]).unwrap();
    let signed = tool.sign_full_image(&image, true).unwrap();
    assert_eq!(signed.len(), 1000);

    let framed = tool.create_fragments(&signed, 234, 3).unwrap();
    assert_eq!(framed.header.nb_frag(), 5);
    assert_eq!(framed.header.padding(), 170);
    assert_eq!(framed.fragments.len(), 8);
    assert!(framed.fragments.iter().all(|f| f.len() == 237));

    // data fragments reassemble into the signed payload
    let mut reassembled: Vec<u8> = framed.fragments[..5].iter().flat_map(|f| f[3..].to_vec()).collect();
    reassembled.truncate(signed.len());
    assert_eq!(reassembled, signed);

    let text = render_packets_plain(&framed);
    assert_eq!(text.lines().count(), 9);
    assert!(text.lines().nth(8).unwrap().starts_with("08 08 00"));
}

#[test]
fn unknown_diff_tag_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let tool = provisioned_tool(dir.path());

    let image = dir.path().join("firmware.bin");
    fs::write(&image, vec![1; 64]).unwrap();
    let mut signed = tool.sign_full_image(&image, false).unwrap();
    let tag = signed.len() - 4;
    signed[tag] = 7;

    let decoded = Manifest::from_file_tail(&signed).unwrap();
    assert_eq!(decoded.diff, None);
    assert_eq!(decoded.warnings, vec![ManifestWarning::UnrecognizedDiffTag(7)]);
}
