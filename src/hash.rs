use std::cmp::Ordering;
use std::fmt;
use std::hash::Hasher;
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::Error;

/// largest digest we carry (SHA-1)
const MAX_DIGEST_LEN: usize = 20;

/// digest algorithm used for content addressing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
}

impl HashAlgorithm {
    /// raw digest size in bytes
    pub const fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
        }
    }

    /// infer the algorithm from a hex string length
    fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            32 => Some(HashAlgorithm::Md5),
            40 => Some(HashAlgorithm::Sha1),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            other => Err(format!("unknown hash algorithm: {}", other)),
        }
    }
}

/// content digest used both as identity and as storage address
///
/// the buffer is sized for the largest algorithm; only the first
/// `algorithm.digest_len()` bytes are meaningful, the rest stay zero.
#[derive(Clone, Copy)]
pub struct Hash {
    algorithm: HashAlgorithm,
    bytes: [u8; MAX_DIGEST_LEN],
}

impl Hash {
    /// create from raw digest output
    pub fn from_digest_bytes(algorithm: HashAlgorithm, digest: &[u8]) -> crate::Result<Self> {
        if digest.len() != algorithm.digest_len() {
            return Err(Error::InvalidDigestLength {
                algorithm,
                actual: digest.len(),
            });
        }
        let mut bytes = [0u8; MAX_DIGEST_LEN];
        bytes[..digest.len()].copy_from_slice(digest);
        Ok(Self { algorithm, bytes })
    }

    /// parse from hex string, inferring the algorithm from its length
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let algorithm = HashAlgorithm::from_hex_len(s.len()).ok_or_else(|| Error::MalformedHash {
            input: s.to_string(),
            reason: format!(
                "hash hex strings can be only 32 characters for md5 or 40 for sha1, got {}",
                s.len()
            ),
        })?;
        let decoded = hex::decode(s).map_err(|e| Error::MalformedHash {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_digest_bytes(algorithm, &decoded)
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// meaningful digest bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.algorithm.digest_len()]
    }

    /// convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// split into the three sharded path components for the object store:
    /// first byte, second byte, remaining bytes
    pub fn to_path_components(&self) -> (String, String, String) {
        let bytes = self.as_bytes();
        (
            format!("{:02x}", bytes[0]),
            format!("{:02x}", bytes[1]),
            hex::encode(&bytes[2..]),
        )
    }

    /// relative storage address, e.g. `d4/1d/d8cd98f00b204e9800998ecf8427e`
    pub fn storage_address(&self) -> String {
        let (first, second, rest) = self.to_path_components();
        format!("{}/{}/{}", first, second, rest)
    }
}

impl PartialEq for Hash {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Hash {}

impl PartialOrd for Hash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// full lexicographic comparison, never a truncated prefix
impl Ord for Hash {
    fn cmp(&self, other: &Self) -> Ordering {
        self.algorithm
            .cmp(&other.algorithm)
            .then_with(|| self.as_bytes().cmp(other.as_bytes()))
    }
}

impl std::hash::Hash for Hash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.algorithm, state);
        std::hash::Hash::hash(self.as_bytes(), state);
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}:{})", self.algorithm, &self.to_hex()[..12])
    }
}

impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// hash a complete buffer
pub fn compute_hash(algorithm: HashAlgorithm, content: &[u8]) -> Hash {
    let mut hasher = ContentHasher::new(algorithm);
    hasher.update(content);
    hasher.finalize()
}

/// streaming content hasher for large files
pub enum ContentHasher {
    Md5(Md5),
    Sha1(Sha1),
}

impl ContentHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => ContentHasher::Md5(Md5::new()),
            HashAlgorithm::Sha1 => ContentHasher::Sha1(Sha1::new()),
        }
    }

    /// feed content bytes
    pub fn update(&mut self, data: &[u8]) {
        match self {
            ContentHasher::Md5(h) => h.update(data),
            ContentHasher::Sha1(h) => h.update(data),
        }
    }

    /// finalize and return hash
    pub fn finalize(self) -> Hash {
        let (algorithm, digest) = match self {
            ContentHasher::Md5(h) => (HashAlgorithm::Md5, h.finalize().to_vec()),
            ContentHasher::Sha1(h) => (HashAlgorithm::Sha1, h.finalize().to_vec()),
        };
        let mut bytes = [0u8; MAX_DIGEST_LEN];
        bytes[..digest.len()].copy_from_slice(&digest);
        Hash { algorithm, bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::{BTreeSet, HashSet};

    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";
    const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    #[test]
    fn test_hash_hex_roundtrip() {
        let md5 = Hash::from_hex(EMPTY_MD5).unwrap();
        assert_eq!(md5.algorithm(), HashAlgorithm::Md5);
        assert_eq!(md5.to_hex(), EMPTY_MD5);

        let sha1 = Hash::from_hex(EMPTY_SHA1).unwrap();
        assert_eq!(sha1.algorithm(), HashAlgorithm::Sha1);
        assert_eq!(sha1.as_bytes().len(), 20);
        assert_eq!(sha1.to_hex(), EMPTY_SHA1);
    }

    #[test]
    fn test_hash_uppercase_renders_lowercase() {
        let h = Hash::from_hex(&EMPTY_MD5.to_uppercase()).unwrap();
        assert_eq!(h.to_hex(), EMPTY_MD5);
    }

    #[test]
    fn test_hash_invalid_hex() {
        assert!(matches!(
            Hash::from_hex("abcd"),
            Err(Error::MalformedHash { .. })
        ));
        // right length, not hex
        assert!(matches!(
            Hash::from_hex("zz1d8cd98f00b204e9800998ecf8427e"),
            Err(Error::MalformedHash { .. })
        ));
        // 64 chars is a sha256, not accepted
        assert!(matches!(
            Hash::from_hex(&"ab".repeat(32)),
            Err(Error::MalformedHash { .. })
        ));
    }

    #[test]
    fn test_malformed_hash_keeps_input() {
        match Hash::from_hex("0123") {
            Err(Error::MalformedHash { input, reason }) => {
                assert_eq!(input, "0123");
                assert!(reason.contains('4'));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_digest_bytes_length_check() {
        assert!(Hash::from_digest_bytes(HashAlgorithm::Md5, &[0u8; 16]).is_ok());
        assert!(Hash::from_digest_bytes(HashAlgorithm::Sha1, &[0u8; 20]).is_ok());

        match Hash::from_digest_bytes(HashAlgorithm::Md5, &[0u8; 20]) {
            Err(Error::InvalidDigestLength { algorithm, actual }) => {
                assert_eq!(algorithm, HashAlgorithm::Md5);
                assert_eq!(actual, 20);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(Hash::from_digest_bytes(HashAlgorithm::Sha1, &[0u8; 16]).is_err());
    }

    #[test]
    fn test_storage_address() {
        let h = Hash::from_hex(EMPTY_MD5).unwrap();
        assert_eq!(h.storage_address(), "d4/1d/d8cd98f00b204e9800998ecf8427e");

        let (first, second, rest) = h.to_path_components();
        assert_eq!(first, "d4");
        assert_eq!(second, "1d");
        assert_eq!(rest.len(), 2 * (16 - 2));
    }

    #[test]
    fn test_storage_address_zero_padded() {
        let mut digest = [0xffu8; 20];
        digest[0] = 0x01;
        digest[1] = 0x00;
        let h = Hash::from_digest_bytes(HashAlgorithm::Sha1, &digest).unwrap();
        let (first, second, _) = h.to_path_components();
        assert_eq!(first, "01");
        assert_eq!(second, "00");
    }

    #[test]
    fn test_equality_includes_algorithm() {
        let md5 = Hash::from_digest_bytes(HashAlgorithm::Md5, &[7u8; 16]).unwrap();
        let mut padded = [0u8; 20];
        padded[..16].copy_from_slice(&[7u8; 16]);
        let sha1 = Hash::from_digest_bytes(HashAlgorithm::Sha1, &padded).unwrap();
        assert_ne!(md5, sha1);
    }

    #[test]
    fn test_ordering_uses_full_digest() {
        // identical leading 8 bytes, differ only at the tail
        let mut a = [0x11u8; 20];
        let mut b = [0x11u8; 20];
        a[19] = 0x01;
        b[19] = 0x02;
        let a = Hash::from_digest_bytes(HashAlgorithm::Sha1, &a).unwrap();
        let b = Hash::from_digest_bytes(HashAlgorithm::Sha1, &b).unwrap();

        assert!(a < b);
        assert_ne!(a, b);

        let set: BTreeSet<_> = [a, b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
        let set: HashSet<_> = [a, b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_compute_hash_known_values() {
        assert_eq!(compute_hash(HashAlgorithm::Md5, b"").to_hex(), EMPTY_MD5);
        assert_eq!(compute_hash(HashAlgorithm::Sha1, b"").to_hex(), EMPTY_SHA1);
    }

    #[test]
    fn test_streaming_hasher() {
        let direct = compute_hash(HashAlgorithm::Sha1, b"helloworld");

        let mut streaming = ContentHasher::new(HashAlgorithm::Sha1);
        streaming.update(b"hello");
        streaming.update(b"world");
        assert_eq!(direct, streaming.finalize());
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("MD5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert_eq!("sha1".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha1);
        assert!("sha256".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_hash_serde_json() {
        let h = Hash::from_hex(EMPTY_SHA1).unwrap();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", EMPTY_SHA1));
        let parsed: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, parsed);

        assert!(serde_json::from_str::<Hash>("\"abc\"").is_err());
    }

    fn any_hash() -> impl Strategy<Value = Hash> {
        prop_oneof![
            prop::collection::vec(any::<u8>(), 16)
                .prop_map(|b| Hash::from_digest_bytes(HashAlgorithm::Md5, &b).unwrap()),
            prop::collection::vec(any::<u8>(), 20)
                .prop_map(|b| Hash::from_digest_bytes(HashAlgorithm::Sha1, &b).unwrap()),
        ]
    }

    proptest! {
        #[test]
        fn prop_hex_roundtrip(h in any_hash()) {
            prop_assert_eq!(Hash::from_hex(&h.to_hex()).unwrap(), h);
        }

        #[test]
        fn prop_rejects_other_lengths(s in "[0-9a-f]{0,64}") {
            prop_assume!(s.len() != 32 && s.len() != 40);
            let rejected = matches!(Hash::from_hex(&s), Err(Error::MalformedHash { .. }));
            prop_assert!(rejected);
        }

        #[test]
        fn prop_address_sharding(h in any_hash()) {
            let address = h.storage_address();
            let segments: Vec<_> = address.split('/').collect();
            prop_assert_eq!(segments.len(), 3);
            for segment in &segments[..2] {
                prop_assert_eq!(segment.len(), 2);
                prop_assert!(segment.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
            }
            prop_assert_eq!(segments[2].len(), 2 * (h.as_bytes().len() - 2));
        }
    }
}
