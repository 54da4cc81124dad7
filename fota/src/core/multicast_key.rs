use super::super::constants::{ROOT_KEY_SIZE, RootKey};
use super::super::fota_errors::FotaError;
use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use anyhow::Result;

/// Derives the multicast root key distributed to the deployment server: AES-128 of a single
/// all-zero block under the device root key. The device root key itself is never distributed.
pub fn derive_multicast_root_key(device_root_key: &RootKey) -> RootKey {
    let cipher = Aes128::new(GenericArray::from_slice(device_root_key));
    let mut block = GenericArray::default();
    cipher.encrypt_block(&mut block);

    let mut derived = [0u8; ROOT_KEY_SIZE];
    derived.copy_from_slice(&block);
    derived
}

/// Same as `derive_multicast_root_key` for keys of unchecked length, e.g. decoded from hex.
pub fn derive_multicast_root_key_from_slice(device_root_key: &[u8]) -> Result<RootKey> {
    let key: &RootKey = device_root_key
        .try_into()
        .map_err(|_| FotaError::InvalidRootKeyLength(device_root_key.len()))?;
    Ok(derive_multicast_root_key(key))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_key_known_answer() {
        let derived = derive_multicast_root_key(&[0u8; 16]);
        assert_eq!(hex::encode(derived), "66e94bd4ef8a2c3b884cfa59ca342b2e");
    }

    #[test]
    fn test_derived_key_differs_from_root_key() {
        let root_key: RootKey = hex::decode("2c62dbf08cde92e5704da76a4999b2af").unwrap().try_into().unwrap();
        let derived = derive_multicast_root_key(&root_key);
        assert_ne!(derived, root_key);
        assert_eq!(derived, derive_multicast_root_key(&root_key));
    }

    #[test]
    fn test_wrong_key_length() {
        let err = derive_multicast_root_key_from_slice(&[1u8; 15]).unwrap_err();
        assert!(matches!(err.downcast_ref::<FotaError>(), Some(FotaError::InvalidRootKeyLength(15))));
    }
}
