use bincode::{Encode, config, encode_to_vec};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Hex SHA-256 of the bincode encoding of `data`.
pub fn hash_object<T: Encode>(data: &T) -> Result<String> {
    let sdata = encode_to_vec(data, config::standard())?;
    Ok(hash_bytes(&sdata))
}

pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub(crate) fn digest(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Window;

    #[test]
    fn test_hash_is_stable_and_content_sensitive() {
        let mut window = Window::default();
        window.opens.push(1.0);
        let a = hash_object(&window).unwrap();
        assert_eq!(a, hash_object(&window.clone()).unwrap());
        assert_eq!(a.len(), 64);

        window.opens[0] = 1.0000000001;
        assert_ne!(a, hash_object(&window).unwrap());
    }
}
