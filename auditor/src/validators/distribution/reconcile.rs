//! Content-addressable reconciliation of repository, distribution and cache.
//!
//! [`reconcile`] is a pure function over `(path, hash)` pairs. Each defect
//! category is computed independently, so one file can show up in several
//! categories, for instance as both corrupted and duplicated. Output order
//! depends only on the input sets: categories come in declaration order and
//! each category is sorted by path. Paths compare as plain strings, so
//! `a-b.jar` sorts before `a/b.jar`.

use crate::validation::{ErrorKind, FileRoot};
use std::cmp::Ordering;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A file and its content hash.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HashedFile {
    /// Path relative to the root the file was found under.
    pub path: Utf8PathBuf,
    /// Lowercase hex content hash.
    pub hash: String,
}

impl HashedFile {
    /// Pair `path` with `hash`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
        }
    }

    fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or_else(|| self.path.as_str())
    }
}

fn by_path(left: &Utf8Path, right: &Utf8Path) -> Ordering {
    left.as_str().cmp(right.as_str())
}

/// One consistency violation between the three file sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Defect {
    /// Repository content has no copy in the distribution.
    Missing {
        /// Content hash.
        hash: String,
        /// Smallest repository path with this hash.
        path: Utf8PathBuf,
    },
    /// Distribution content is in neither the repository nor the cache.
    Redundant {
        /// Content hash.
        hash: String,
        /// Smallest distribution path with this hash.
        path: Utf8PathBuf,
    },
    /// The same content is present more than once in the distribution.
    Duplicate {
        /// Content hash.
        hash: String,
        /// Every distribution path with this hash, sorted.
        paths: Vec<Utf8PathBuf>,
    },
    /// Identical content under different file names.
    Misnomer {
        /// Content hash shared by both files.
        hash: String,
        /// Repository path.
        repository: Utf8PathBuf,
        /// Distribution path.
        distribution: Utf8PathBuf,
    },
    /// Same file name, different content.
    Corrupted {
        /// Repository path.
        repository: Utf8PathBuf,
        /// Hash of the repository file.
        repository_hash: String,
        /// Distribution path.
        distribution: Utf8PathBuf,
        /// Hash of the distribution file.
        distribution_hash: String,
    },
}

impl Defect {
    /// Error kind recorded for this defect.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Missing { .. } => ErrorKind::DistributionMissing,
            Self::Redundant { .. } => ErrorKind::DistributionRedundant,
            Self::Duplicate { .. } => ErrorKind::DistributionDuplicate,
            Self::Misnomer { .. } => ErrorKind::DistributionMisnomer,
            Self::Corrupted { .. } => ErrorKind::DistributionCorrupted,
        }
    }

    /// Tree [`Self::file`] belongs to.
    #[must_use]
    pub const fn root(&self) -> FileRoot {
        match self {
            Self::Missing { .. } => FileRoot::Repository,
            _ => FileRoot::Distribution,
        }
    }

    /// The file the defect is reported against.
    ///
    /// Missing content belongs to its repository file; every other defect
    /// belongs to a distribution file.
    #[must_use]
    pub fn file(&self) -> &Utf8Path {
        match self {
            Self::Missing { path, .. } | Self::Redundant { path, .. } => path.as_path(),
            Self::Duplicate { paths, .. } => paths
                .first()
                .map_or_else(|| Utf8Path::new(""), Utf8PathBuf::as_path),
            Self::Misnomer { distribution, .. } | Self::Corrupted { distribution, .. } => {
                distribution.as_path()
            }
        }
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { hash, path } => {
                write!(f, "{path} is missing from the distribution (hash {hash})")
            }
            Self::Redundant { hash, path } => write!(
                f,
                "{path} is in the distribution but not in the repository (hash {hash})"
            ),
            Self::Duplicate { hash, paths } => {
                let joined: Vec<&str> = paths.iter().map(|path| path.as_str()).collect();
                write!(
                    f,
                    "distribution holds the same content {} times: {} (hash {hash})",
                    paths.len(),
                    joined.join(", ")
                )
            }
            Self::Misnomer {
                hash,
                repository,
                distribution,
            } => write!(
                f,
                "{distribution} has the content of {repository} under another name (hash {hash})"
            ),
            Self::Corrupted {
                repository,
                repository_hash,
                distribution,
                distribution_hash,
            } => write!(
                f,
                "{distribution} differs from {repository} (hash {distribution_hash}, expected {repository_hash})"
            ),
        }
    }
}

/// Multimap from hash to the sorted files holding it.
type HashIndex<'a> = BTreeMap<&'a str, Vec<&'a HashedFile>>;

fn index_by_hash(files: &[HashedFile]) -> HashIndex<'_> {
    let mut index: HashIndex<'_> = BTreeMap::new();
    for file in files {
        index.entry(file.hash.as_str()).or_default().push(file);
    }
    for entries in index.values_mut() {
        entries.sort_by(|left, right| by_path(&left.path, &right.path));
    }
    index
}

fn index_by_name(files: &[HashedFile]) -> BTreeMap<&str, Vec<&HashedFile>> {
    let mut index: BTreeMap<&str, Vec<&HashedFile>> = BTreeMap::new();
    for file in files {
        index.entry(file.file_name()).or_default().push(file);
    }
    index
}

/// Compare repository (`repository`), distribution (`distribution`) and
/// trusted cache (`cache`) file sets.
///
/// # Examples
///
/// ```
/// use repository_auditor::validators::distribution::reconcile::{reconcile, Defect, HashedFile};
///
/// let repository = [HashedFile::new("a.jar", "h1")];
/// let defects = reconcile(&repository, &[], &[]);
/// assert_eq!(
///     defects,
///     vec![Defect::Missing { hash: "h1".to_owned(), path: "a.jar".into() }]
/// );
/// ```
#[must_use]
pub fn reconcile(
    repository: &[HashedFile],
    distribution: &[HashedFile],
    cache: &[HashedFile],
) -> Vec<Defect> {
    let repository_index = index_by_hash(repository);
    let distribution_index = index_by_hash(distribution);
    let cache_hashes: BTreeSet<&str> = cache.iter().map(|file| file.hash.as_str()).collect();

    let mut defects = missing(&repository_index, &distribution_index);
    defects.extend(redundant(&repository_index, &distribution_index, &cache_hashes));
    defects.extend(duplicates(&distribution_index));
    defects.extend(misnomers(&repository_index, &distribution_index));
    defects.extend(corrupted(repository, distribution));
    defects
}

fn missing(repository: &HashIndex<'_>, distribution: &HashIndex<'_>) -> Vec<Defect> {
    let mut defects: Vec<Defect> = repository
        .iter()
        .filter(|(hash, _)| !distribution.contains_key(*hash))
        .filter_map(|(hash, files)| {
            files.first().map(|file| Defect::Missing {
                hash: (*hash).to_owned(),
                path: file.path.clone(),
            })
        })
        .collect();
    defects.sort_by(|left, right| by_path(left.file(), right.file()));
    defects
}

fn redundant(
    repository: &HashIndex<'_>,
    distribution: &HashIndex<'_>,
    cache: &BTreeSet<&str>,
) -> Vec<Defect> {
    let mut defects: Vec<Defect> = distribution
        .iter()
        .filter(|(hash, _)| !repository.contains_key(*hash) && !cache.contains(*hash))
        .filter_map(|(hash, files)| {
            files.first().map(|file| Defect::Redundant {
                hash: (*hash).to_owned(),
                path: file.path.clone(),
            })
        })
        .collect();
    defects.sort_by(|left, right| by_path(left.file(), right.file()));
    defects
}

fn duplicates(distribution: &HashIndex<'_>) -> Vec<Defect> {
    let mut defects: Vec<Defect> = distribution
        .iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(hash, files)| Defect::Duplicate {
            hash: (*hash).to_owned(),
            paths: files.iter().map(|file| file.path.clone()).collect(),
        })
        .collect();
    defects.sort_by(|left, right| by_path(left.file(), right.file()));
    defects
}

fn misnomers(repository: &HashIndex<'_>, distribution: &HashIndex<'_>) -> Vec<Defect> {
    let mut pairs = Vec::new();
    for (hash, distributed) in distribution {
        let Some(expected) = repository.get(hash) else {
            continue;
        };
        for dist_file in distributed {
            for repo_file in expected {
                if dist_file.file_name() != repo_file.file_name() {
                    pairs.push((dist_file.path.clone(), repo_file.path.clone(), *hash));
                }
            }
        }
    }
    pairs.sort_by(|(left_dist, left_repo, _), (right_dist, right_repo, _)| {
        by_path(left_dist, right_dist).then_with(|| by_path(left_repo, right_repo))
    });
    pairs
        .into_iter()
        .map(|(distribution, repository, hash)| Defect::Misnomer {
            hash: hash.to_owned(),
            repository,
            distribution,
        })
        .collect()
}

fn corrupted(repository: &[HashedFile], distribution: &[HashedFile]) -> Vec<Defect> {
    let repository_names = index_by_name(repository);
    let mut pairs = Vec::new();
    for dist_file in distribution {
        let Some(candidates) = repository_names.get(dist_file.file_name()) else {
            continue;
        };
        for repo_file in candidates {
            if repo_file.hash != dist_file.hash {
                pairs.push((*repo_file, dist_file));
            }
        }
    }
    pairs.sort_by(|(left_repo, left_dist), (right_repo, right_dist)| {
        by_path(&left_dist.path, &right_dist.path)
            .then_with(|| by_path(&left_repo.path, &right_repo.path))
    });
    pairs
        .into_iter()
        .map(|(repo_file, dist_file)| Defect::Corrupted {
            repository: repo_file.path.clone(),
            repository_hash: repo_file.hash.clone(),
            distribution: dist_file.path.clone(),
            distribution_hash: dist_file.hash.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(entries: &[(&str, &str)]) -> Vec<HashedFile> {
        entries
            .iter()
            .map(|(path, hash)| HashedFile::new(*path, *hash))
            .collect()
    }

    fn kinds(defects: &[Defect]) -> Vec<ErrorKind> {
        defects.iter().map(Defect::kind).collect()
    }

    #[test]
    fn repository_file_absent_from_distribution_is_missing() {
        let defects = reconcile(&files(&[("a.jar", "h1")]), &[], &[]);

        assert_eq!(
            defects,
            vec![Defect::Missing {
                hash: "h1".to_owned(),
                path: Utf8PathBuf::from("a.jar"),
            }]
        );
    }

    #[test]
    fn missing_uses_smallest_repository_path() {
        let defects = reconcile(
            &files(&[("z/copy.jar", "h1"), ("b/copy.jar", "h1")]),
            &[],
            &[],
        );

        assert_eq!(defects.len(), 1);
        assert_eq!(
            defects.first().map(Defect::file),
            Some(Utf8Path::new("b/copy.jar"))
        );
    }

    #[test]
    fn paths_compare_as_plain_strings() {
        let defects = reconcile(&files(&[("a/b.jar", "h1"), ("a-b.jar", "h1")]), &[], &[]);

        assert_eq!(defects.first().map(Defect::file), Some(Utf8Path::new("a-b.jar")));
    }

    #[test]
    fn only_missing_content_belongs_to_the_repository() {
        let defects = reconcile(&files(&[("a.jar", "h1")]), &files(&[("a.jar", "h2")]), &[]);

        let roots: Vec<FileRoot> = defects.iter().map(Defect::root).collect();
        assert_eq!(
            roots,
            vec![FileRoot::Repository, FileRoot::Distribution, FileRoot::Distribution]
        );
    }

    #[test]
    fn unexpected_distribution_file_is_redundant() {
        let defects = reconcile(&[], &files(&[("b.jar", "h2")]), &[]);

        assert_eq!(
            defects,
            vec![Defect::Redundant {
                hash: "h2".to_owned(),
                path: Utf8PathBuf::from("b.jar"),
            }]
        );
    }

    #[test]
    fn cached_content_is_not_redundant() {
        let defects = reconcile(&[], &files(&[("b.jar", "h2")]), &files(&[("c.jar", "h2")]));

        assert!(defects.is_empty());
    }

    #[test]
    fn repeated_distribution_content_is_one_duplicate_with_sorted_paths() {
        let repository = files(&[("x.jar", "h1")]);
        let distribution = files(&[("y.jar", "h1"), ("x.jar", "h1")]);

        let defects = reconcile(&repository, &distribution, &[]);
        let duplicates: Vec<&Defect> = defects
            .iter()
            .filter(|defect| defect.kind() == ErrorKind::DistributionDuplicate)
            .collect();

        assert_eq!(
            duplicates,
            vec![&Defect::Duplicate {
                hash: "h1".to_owned(),
                paths: vec![Utf8PathBuf::from("x.jar"), Utf8PathBuf::from("y.jar")],
            }]
        );
    }

    #[test]
    fn duplicate_message_lists_every_path() {
        let defect = Defect::Duplicate {
            hash: "h1".to_owned(),
            paths: vec![Utf8PathBuf::from("lib/x.jar"), Utf8PathBuf::from("lib/y.jar")],
        };

        assert_eq!(
            defect.to_string(),
            "distribution holds the same content 2 times: lib/x.jar, lib/y.jar (hash h1)"
        );
    }

    #[test]
    fn same_content_under_another_name_is_a_misnomer_only() {
        let defects = reconcile(&files(&[("a.jar", "h1")]), &files(&[("b.jar", "h1")]), &[]);

        assert_eq!(
            defects,
            vec![Defect::Misnomer {
                hash: "h1".to_owned(),
                repository: Utf8PathBuf::from("a.jar"),
                distribution: Utf8PathBuf::from("b.jar"),
            }]
        );
    }

    #[test]
    fn same_name_with_other_content_is_corrupted_and_missing() {
        let defects = reconcile(&files(&[("a.jar", "h1")]), &files(&[("a.jar", "h2")]), &[]);

        assert_eq!(
            kinds(&defects),
            vec![
                ErrorKind::DistributionMissing,
                ErrorKind::DistributionRedundant,
                ErrorKind::DistributionCorrupted,
            ]
        );
        assert!(!kinds(&defects).contains(&ErrorKind::DistributionMisnomer));
        assert_eq!(
            defects.last(),
            Some(&Defect::Corrupted {
                repository: Utf8PathBuf::from("a.jar"),
                repository_hash: "h1".to_owned(),
                distribution: Utf8PathBuf::from("a.jar"),
                distribution_hash: "h2".to_owned(),
            })
        );
    }

    #[test]
    fn file_names_compare_without_directories() {
        let defects = reconcile(
            &files(&[("org/acme/w/1/w-1.jar", "h1")]),
            &files(&[("lib/w-1.jar", "h1")]),
            &[],
        );

        assert!(defects.is_empty());
    }

    #[test]
    fn one_file_can_be_duplicate_and_corrupted() {
        let repository = files(&[("a.jar", "h1")]);
        let distribution = files(&[("a.jar", "h2"), ("lib/a.jar", "h2")]);

        let defects = reconcile(&repository, &distribution, &[]);

        assert_eq!(
            kinds(&defects),
            vec![
                ErrorKind::DistributionMissing,
                ErrorKind::DistributionRedundant,
                ErrorKind::DistributionDuplicate,
                ErrorKind::DistributionCorrupted,
                ErrorKind::DistributionCorrupted,
            ]
        );
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let repository = files(&[("a.jar", "h1"), ("b.jar", "h2"), ("c.jar", "h3")]);
        let distribution = files(&[("c.jar", "h9"), ("d.jar", "h1"), ("d2.jar", "h1")]);
        let mut reversed_repository = repository.clone();
        reversed_repository.reverse();
        let mut reversed_distribution = distribution.clone();
        reversed_distribution.reverse();

        assert_eq!(
            reconcile(&repository, &distribution, &[]),
            reconcile(&reversed_repository, &reversed_distribution, &[])
        );
    }
}
