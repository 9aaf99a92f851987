//! Digest extraction from registry response metadata.
//!
//! Registries never agree on how to advertise content digests. Nexus
//! embeds the SHA-1 in a composite entity tag, Artifactory prefixes it,
//! and a plain Apache server only knows file size and modification time.
//! Each strategy pairs the remote extraction with the matching local
//! computation so that the two digests are comparable.

use super::RegistryFlavor;
use super::client::ProbeResponse;
use crate::digest::DigestAlgorithm;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use std::time::{Duration, UNIX_EPOCH};
use thiserror::Error;

const ETAG: &str = "etag";

/// A digest could not be derived.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The response carried no entity tag.
    #[error("response has no {header} header")]
    MissingHeader {
        /// Header that was looked up.
        header: &'static str,
    },
    /// The entity tag does not follow the registry's format.
    #[error("cannot parse {flavor} digest from {header} value {value:?}")]
    Unparsable {
        /// Registry flavour whose format was expected.
        flavor: RegistryFlavor,
        /// Header that was parsed.
        header: &'static str,
        /// The rejected value.
        value: String,
    },
    /// The local file could not be read.
    #[error("cannot read local file {path}")]
    LocalRead {
        /// File that failed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Derives comparable digests for one registry implementation.
pub trait ChecksumExtractionStrategy: Send + Sync {
    /// Registry flavour this strategy understands.
    fn flavor(&self) -> RegistryFlavor;

    /// Digest of the local file at `path`, in the remote's format.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::LocalRead`] if the file cannot be read.
    fn local_digest(&self, path: &Utf8Path) -> Result<String, ExtractionError>;

    /// Digest advertised by `response`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] if the metadata is absent or malformed.
    fn remote_digest(&self, response: &ProbeResponse) -> Result<String, ExtractionError>;
}

/// Strategy for the registry flavour `flavor`.
#[must_use]
pub fn strategy_for(flavor: RegistryFlavor) -> &'static dyn ChecksumExtractionStrategy {
    match flavor {
        RegistryFlavor::Nexus => &NexusStrategy,
        RegistryFlavor::Artifactory => &ArtifactoryStrategy,
        RegistryFlavor::Apache => &ApacheStrategy,
    }
}

/// Entity tag with any weak-validator prefix and quotes removed.
fn entity_tag(response: &ProbeResponse) -> Result<&str, ExtractionError> {
    let raw = response
        .header(ETAG)
        .ok_or(ExtractionError::MissingHeader { header: ETAG })?;
    let tag = raw.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    Ok(tag.trim_matches('"'))
}

fn unparsable(flavor: RegistryFlavor, value: &str) -> ExtractionError {
    ExtractionError::Unparsable {
        flavor,
        header: ETAG,
        value: value.to_owned(),
    }
}

fn is_hex_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|byte| byte.is_ascii_hexdigit())
}

fn sha1_of(path: &Utf8Path) -> Result<String, ExtractionError> {
    DigestAlgorithm::Sha1
        .hash_file(path.as_std_path())
        .map_err(|source| ExtractionError::LocalRead {
            path: path.to_owned(),
            source,
        })
}

/// Nexus: `"{SHA1{<hex>}}"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NexusStrategy;

impl ChecksumExtractionStrategy for NexusStrategy {
    fn flavor(&self) -> RegistryFlavor {
        RegistryFlavor::Nexus
    }

    fn local_digest(&self, path: &Utf8Path) -> Result<String, ExtractionError> {
        sha1_of(path)
    }

    fn remote_digest(&self, response: &ProbeResponse) -> Result<String, ExtractionError> {
        let tag = entity_tag(response)?;
        tag.strip_prefix("{SHA1{")
            .and_then(|rest| rest.strip_suffix("}}"))
            .filter(|hex| is_hex_of_len(hex, DigestAlgorithm::Sha1.hex_len()))
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| unparsable(self.flavor(), tag))
    }
}

/// Artifactory: `"sha1:<hex>"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactoryStrategy;

impl ChecksumExtractionStrategy for ArtifactoryStrategy {
    fn flavor(&self) -> RegistryFlavor {
        RegistryFlavor::Artifactory
    }

    fn local_digest(&self, path: &Utf8Path) -> Result<String, ExtractionError> {
        sha1_of(path)
    }

    fn remote_digest(&self, response: &ProbeResponse) -> Result<String, ExtractionError> {
        let tag = entity_tag(response)?;
        tag.strip_prefix("sha1:")
            .filter(|hex| is_hex_of_len(hex, DigestAlgorithm::Sha1.hex_len()))
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| unparsable(self.flavor(), tag))
    }
}

/// Apache httpd: `"[<inode>-]<size>-<mtime µs>"`, all hex.
///
/// The digest is `<size>-<mtime seconds>` in lowercase hex. Comparison only
/// holds when the local copy kept the modification time it was published
/// with.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApacheStrategy;

fn synthesised(size: u64, mtime: Duration) -> String {
    format!("{size:x}-{:x}", mtime.as_secs())
}

impl ChecksumExtractionStrategy for ApacheStrategy {
    fn flavor(&self) -> RegistryFlavor {
        RegistryFlavor::Apache
    }

    fn local_digest(&self, path: &Utf8Path) -> Result<String, ExtractionError> {
        let read_error = |source| ExtractionError::LocalRead {
            path: path.to_owned(),
            source,
        };
        let metadata = fs::metadata(path).map_err(read_error)?;
        let mtime = metadata
            .modified()
            .map_err(read_error)?
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Ok(synthesised(metadata.len(), mtime))
    }

    fn remote_digest(&self, response: &ProbeResponse) -> Result<String, ExtractionError> {
        let tag = entity_tag(response)?;
        let fields: Vec<&str> = tag.split('-').collect();
        let (size, mtime) = match fields.as_slice() {
            [size, mtime] | [_, size, mtime] => (*size, *mtime),
            _ => return Err(unparsable(self.flavor(), tag)),
        };
        let size = u64::from_str_radix(size, 16).map_err(|_| unparsable(self.flavor(), tag))?;
        let micros = u64::from_str_radix(mtime, 16).map_err(|_| unparsable(self.flavor(), tag))?;
        Ok(synthesised(size, Duration::from_micros(micros)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use tempfile::TempDir;

    const SHA1_OF_WIDGET: &str = "ff700e0204ca58fe8cbbf19ab0c126da1f6970c3";

    fn with_etag(value: &str) -> ProbeResponse {
        ProbeResponse::new(200).with_header("ETag", value)
    }

    #[rstest]
    #[case::nexus(RegistryFlavor::Nexus)]
    #[case::artifactory(RegistryFlavor::Artifactory)]
    #[case::apache(RegistryFlavor::Apache)]
    fn strategy_for_returns_matching_flavor(#[case] flavor: RegistryFlavor) {
        assert_eq!(strategy_for(flavor).flavor(), flavor);
    }

    #[rstest]
    #[case::nexus(RegistryFlavor::Nexus)]
    #[case::artifactory(RegistryFlavor::Artifactory)]
    #[case::apache(RegistryFlavor::Apache)]
    fn missing_etag_is_an_extraction_failure(#[case] flavor: RegistryFlavor) {
        let err = strategy_for(flavor)
            .remote_digest(&ProbeResponse::new(200))
            .expect_err("no etag");
        assert!(matches!(err, ExtractionError::MissingHeader { .. }));
    }

    #[rstest]
    #[case::plain("\"{SHA1{FF700E0204CA58FE8CBBF19AB0C126DA1F6970C3}}\"")]
    #[case::weak("W/\"{SHA1{ff700e0204ca58fe8cbbf19ab0c126da1f6970c3}}\"")]
    fn nexus_reads_composite_tag(#[case] etag: &str) {
        let digest = NexusStrategy
            .remote_digest(&with_etag(etag))
            .expect("parsable");
        assert_eq!(digest, SHA1_OF_WIDGET);
    }

    #[rstest]
    #[case::artifactory_format("\"sha1:ff700e0204ca58fe8cbbf19ab0c126da1f6970c3\"")]
    #[case::short_hex("\"{SHA1{5f3a}}\"")]
    #[case::not_hex("\"{SHA1{zz700e0204ca58fe8cbbf19ab0c126da1f6970c3}}\"")]
    fn nexus_rejects_foreign_tags(#[case] etag: &str) {
        let err = NexusStrategy
            .remote_digest(&with_etag(etag))
            .expect_err("unparsable");
        assert!(matches!(err, ExtractionError::Unparsable { .. }));
    }

    #[test]
    fn artifactory_reads_prefixed_tag() {
        let digest = ArtifactoryStrategy
            .remote_digest(&with_etag("W/\"sha1:ff700e0204ca58fe8cbbf19ab0c126da1f6970c3\""))
            .expect("parsable");
        assert_eq!(digest, SHA1_OF_WIDGET);
    }

    #[test]
    fn artifactory_rejects_bare_hex() {
        let err = ArtifactoryStrategy
            .remote_digest(&with_etag("\"ff700e0204ca58fe8cbbf19ab0c126da1f6970c3\""))
            .expect_err("unparsable");
        assert!(matches!(err, ExtractionError::Unparsable { .. }));
    }

    #[rstest]
    #[case::with_inode("\"2a1b-6-5cba3f55a5abc\"", "6-613b5b44")]
    #[case::without_inode("\"6-5cba3f55a5abc\"", "6-613b5b44")]
    fn apache_synthesises_size_and_seconds(#[case] etag: &str, #[case] expected: &str) {
        let digest = ApacheStrategy
            .remote_digest(&with_etag(etag))
            .expect("parsable");
        assert_eq!(digest, expected);
    }

    #[rstest]
    #[case::single_field("\"abcdef\"")]
    #[case::not_hex("\"6-nothex\"")]
    #[case::too_many("\"1-2-3-4\"")]
    fn apache_rejects_malformed_tags(#[case] etag: &str) {
        let err = ApacheStrategy
            .remote_digest(&with_etag(etag))
            .expect_err("unparsable");
        assert!(matches!(err, ExtractionError::Unparsable { .. }));
    }

    #[test]
    fn apache_local_digest_uses_length_and_mtime() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("w-1.jar")).expect("utf-8 path");
        fs::write(&path, "widget").expect("write file");
        let mtime = UNIX_EPOCH + Duration::from_secs(0x613b_5b44);
        File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(mtime))
            .expect("set mtime");

        let digest = ApacheStrategy.local_digest(&path).expect("readable");

        assert_eq!(digest, "6-613b5b44");
    }

    #[test]
    fn sha1_strategies_hash_local_content() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("w-1.jar")).expect("utf-8 path");
        fs::write(&path, "widget").expect("write file");

        assert_eq!(NexusStrategy.local_digest(&path).expect("readable"), SHA1_OF_WIDGET);
        assert_eq!(
            ArtifactoryStrategy.local_digest(&path).expect("readable"),
            SHA1_OF_WIDGET
        );
    }

    #[test]
    fn local_read_failure_is_reported() {
        let err = NexusStrategy
            .local_digest(Utf8Path::new("/definitely/not/here.jar"))
            .expect_err("unreadable");
        assert!(matches!(err, ExtractionError::LocalRead { .. }));
    }
}
