//! Mapping between source files and logical components.
//!
//! `<a_root>/widgets/card.dart` and `<b_root>/widgets/card.tsx` are the two
//! sides of the logical component `widgets/card`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::SyncSectionConfig;
use crate::core::Representation;
use crate::utils::path::{normalize_path, to_slash};

/// A source file resolved against the pairing rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedPath {
    pub logical_id: String,
    pub representation: Representation,
    pub file_a: PathBuf,
    pub file_b: PathBuf,
    /// Test or mock file, synced through the test converter
    pub is_test: bool,
}

impl PairedPath {
    pub fn source(&self) -> &Path {
        self.file(self.representation)
    }

    pub fn target(&self) -> &Path {
        self.file(self.representation.other())
    }

    pub fn file(&self, rep: Representation) -> &Path {
        match rep {
            Representation::A => &self.file_a,
            Representation::B => &self.file_b,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathPairing {
    a_root: PathBuf,
    a_extension: String,
    b_root: PathBuf,
    b_extension: String,
}

impl PathPairing {
    pub fn new(
        a_root: impl Into<PathBuf>,
        a_extension: impl Into<String>,
        b_root: impl Into<PathBuf>,
        b_extension: impl Into<String>,
    ) -> Self {
        Self {
            a_root: a_root.into(),
            a_extension: a_extension.into(),
            b_root: b_root.into(),
            b_extension: b_extension.into(),
        }
    }

    pub fn from_config(config: &SyncSectionConfig) -> Self {
        Self::new(
            &config.a_root,
            &config.a_extension,
            &config.b_root,
            &config.b_extension,
        )
    }

    pub fn root(&self, rep: Representation) -> &Path {
        match rep {
            Representation::A => &self.a_root,
            Representation::B => &self.b_root,
        }
    }

    fn extension(&self, rep: Representation) -> &str {
        match rep {
            Representation::A => &self.a_extension,
            Representation::B => &self.b_extension,
        }
    }

    /// Resolve `path` to its component, `None` for files outside both roots.
    pub fn pair(&self, path: &Path) -> Option<PairedPath> {
        self.pair_exact(path)
            .or_else(|| self.pair_exact(&normalize_path(path)))
    }

    fn pair_exact(&self, path: &Path) -> Option<PairedPath> {
        [Representation::A, Representation::B]
            .into_iter()
            .find_map(|rep| {
                let rel = path.strip_prefix(self.root(rep)).ok()?;
                let rel = to_slash(rel)?;
                let logical_id = rel.strip_suffix(&format!(".{}", self.extension(rep)))?;
                if logical_id.is_empty() || logical_id.ends_with('/') {
                    return None;
                }
                Some(self.paired(logical_id, rep))
            })
    }

    fn paired(&self, logical_id: &str, rep: Representation) -> PairedPath {
        PairedPath {
            logical_id: logical_id.to_owned(),
            representation: rep,
            file_a: self.path_for(logical_id, Representation::A),
            file_b: self.path_for(logical_id, Representation::B),
            is_test: is_test_file(logical_id),
        }
    }

    /// Both sides of a known component, with `rep` as the source.
    pub fn component(&self, logical_id: &str, rep: Representation) -> PairedPath {
        self.paired(logical_id, rep)
    }

    /// File of `rep` for a logical component.
    pub fn path_for(&self, logical_id: &str, rep: Representation) -> PathBuf {
        let mut path = self.root(rep).to_path_buf();
        for part in logical_id.split('/') {
            path.push(part);
        }
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(self.extension(rep));
        PathBuf::from(name)
    }

    /// All source files of `rep`, sorted.
    pub fn scan(&self, rep: Representation) -> Vec<PathBuf> {
        let root = self.root(rep);
        if !root.is_dir() {
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = jwalk::WalkDir::new(root)
            .skip_hidden(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path())
            .filter(|p| {
                self.pair_exact(p)
                    .is_some_and(|paired| paired.representation == rep)
            })
            .collect();
        files.sort();
        files
    }
}

/// Matched against the lowercased logical id.
const TEST_FILE_PATTERN: &str = r"(_test$|\.test$|\.spec$|_test/|(^|/)__(tests|mocks)__/|mock)";

/// Test and mock sources: `_test.`, `.test.`, `.spec.`, `__tests__/`,
/// `__mocks__/` or anything mentioning `mock`, in any case.
pub fn is_test_file(logical_id: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(TEST_FILE_PATTERN).ok());
    let lowered = logical_id.to_ascii_lowercase();
    re.as_ref().is_some_and(|re| re.is_match(&lowered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pairing() -> PathPairing {
        PathPairing::new("/proj/flutter/lib", "dart", "/proj/react/src", "tsx")
    }

    #[test]
    fn test_pair_a_file() {
        let paired = pairing()
            .pair(Path::new("/proj/flutter/lib/widgets/card.dart"))
            .unwrap();
        assert_eq!(paired.logical_id, "widgets/card");
        assert_eq!(paired.representation, Representation::A);
        assert_eq!(paired.target(), Path::new("/proj/react/src/widgets/card.tsx"));
        assert!(!paired.is_test);
    }

    #[test]
    fn test_pair_b_file() {
        let paired = pairing().pair(Path::new("/proj/react/src/home.tsx")).unwrap();
        assert_eq!(paired.logical_id, "home");
        assert_eq!(paired.representation, Representation::B);
        assert_eq!(paired.source(), Path::new("/proj/react/src/home.tsx"));
        assert_eq!(paired.target(), Path::new("/proj/flutter/lib/home.dart"));
    }

    #[test]
    fn test_pair_rejects_foreign_files() {
        let p = pairing();
        assert!(p.pair(Path::new("/proj/react/src/home.css")).is_none());
        assert!(p.pair(Path::new("/elsewhere/home.tsx")).is_none());
        assert!(p.pair(Path::new("/proj/react/src/.tsx")).is_none());
    }

    #[test]
    fn test_compound_extension() {
        let p = PathPairing::new("/a", "g.dart", "/b", "tsx");
        assert_eq!(p.pair(Path::new("/a/home.g.dart")).unwrap().logical_id, "home");
        assert!(p.pair(Path::new("/a/home.dart")).is_none());
    }

    #[test]
    fn test_test_file_detection() {
        assert!(is_test_file("widgets/card_test"));
        assert!(is_test_file("widgets/card.test"));
        assert!(is_test_file("widgets/card.spec"));
        assert!(is_test_file("__tests__/card"));
        assert!(is_test_file("api/__mocks__/client"));
        assert!(is_test_file("services/MockClient"));
        assert!(!is_test_file("widgets/card"));
        assert!(!is_test_file("testimonials/list"));
    }

    #[test]
    fn test_test_file_pattern_compiles_with_crate_features() {
        assert!(Regex::new(TEST_FILE_PATTERN).is_ok());
        assert!(is_test_file("Widgets/Card_TEST"));
        assert!(is_test_file("__Mocks__/Api"));
    }

    #[test]
    fn test_test_file_flag_on_pair() {
        let paired = pairing()
            .pair(Path::new("/proj/flutter/lib/home_test.dart"))
            .unwrap();
        assert!(paired.is_test);
        assert_eq!(paired.target(), Path::new("/proj/react/src/home_test.tsx"));
    }

    #[test]
    fn test_scan_lists_matching_files() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        std::fs::create_dir_all(a.join("nested")).unwrap();
        std::fs::write(a.join("home.dart"), "").unwrap();
        std::fs::write(a.join("nested/card.dart"), "").unwrap();
        std::fs::write(a.join("readme.md"), "").unwrap();

        let p = PathPairing::new(&a, "dart", dir.path().join("b"), "tsx");
        let files = p.scan(Representation::A);
        assert_eq!(files, vec![a.join("home.dart"), a.join("nested/card.dart")]);
        assert!(p.scan(Representation::B).is_empty());
    }
}
