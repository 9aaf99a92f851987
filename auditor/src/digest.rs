//! Content digests with a fixed algorithm per check.
//!
//! Every check hashes its whole file set with one algorithm. Digests are
//! rendered as lowercase hexadecimal strings so they can be compared with
//! checksum sidecar files and registry metadata directly.

use serde::Deserialize;
use sha1::Sha1;
use sha2::digest::Output;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Supported content digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-1, used by Maven sidecars and registry ETags.
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    /// Every supported algorithm, in sidecar lookup order.
    pub const ALL: [Self; 3] = [Self::Sha1, Self::Sha256, Self::Sha512];

    /// Extension of the checksum sidecar file for this algorithm.
    #[must_use]
    pub const fn sidecar_extension(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the hex-encoded digest.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    /// Hash the file at `path`, reading it in chunks.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or read.
    pub fn hash_file(self, path: &Path) -> io::Result<String> {
        let file = fs::File::open(path)?;
        match self {
            Self::Sha1 => hash_reader::<Sha1>(file),
            Self::Sha256 => hash_reader::<Sha256>(file),
            Self::Sha512 => hash_reader::<Sha512>(file),
        }
    }

    /// Hash an in-memory buffer.
    ///
    /// ```
    /// use repository_auditor::digest::DigestAlgorithm;
    ///
    /// let hex = DigestAlgorithm::Sha1.hash_bytes(b"");
    /// assert_eq!(hex, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    /// ```
    #[must_use]
    pub fn hash_bytes(self, bytes: &[u8]) -> String {
        match self {
            Self::Sha1 => format!("{:x}", Sha1::digest(bytes)),
            Self::Sha256 => format!("{:x}", Sha256::digest(bytes)),
            Self::Sha512 => format!("{:x}", Sha512::digest(bytes)),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        })
    }
}

fn hash_reader<D>(mut reader: impl Read) -> io::Result<String>
where
    D: Digest,
    Output<D>: fmt::LowerHex,
{
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Extract the digest from the contents of a checksum sidecar file.
///
/// Sidecars hold either the bare digest or the `sha1sum` style
/// `<digest>  <file name>`; only the first whitespace-separated token is
/// significant. The result is lowercased.
#[must_use]
pub fn parse_sidecar(contents: &str) -> Option<String> {
    contents
        .split_whitespace()
        .next()
        .map(str::to_ascii_lowercase)
}
