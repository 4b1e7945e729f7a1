//! Rerun targeting: what to execute again for a selected node.

use crate::model::tree::{NodeRef, TestKey, last_path_component};

/// Scope of a rerun.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RerunTarget {
    /// Every test in a package.
    Package(String),
    /// Exactly one test (possibly a subtest) within its package.
    Test(TestKey),
}

impl RerunTarget {
    /// Map a node reference to a rerun target. Unaddressed nodes have none.
    #[must_use]
    pub fn from_ref(reference: &NodeRef) -> Option<Self> {
        match reference {
            NodeRef::None => None,
            NodeRef::Package(package) if package.is_empty() => None,
            NodeRef::Package(package) => Some(Self::Package(package.clone())),
            NodeRef::Test(key) if key.name.is_empty() => None,
            NodeRef::Test(key) => Some(Self::Test(key.clone())),
        }
    }

    /// Import path of the package to run.
    #[must_use]
    pub fn package(&self) -> &str {
        match self {
            Self::Package(package) => package,
            Self::Test(key) => &key.package,
        }
    }

    /// Name of the History created for this rerun.
    #[must_use]
    pub fn history_name(&self) -> String {
        match self {
            Self::Package(package) => format!("Rerun: pkg {}", last_path_component(package)),
            Self::Test(key) => format!("Rerun: {}", key.last_segment()),
        }
    }

    /// `-run` pattern selecting exactly this test, `None` for packages.
    ///
    /// `go test` matches each slash-separated element of `-run` against the
    /// corresponding subtest level, so every segment is anchored and escaped
    /// on its own.
    #[must_use]
    pub fn run_pattern(&self) -> Option<String> {
        match self {
            Self::Package(_) => None,
            Self::Test(key) => Some(
                key.name
                    .split('/')
                    .map(|segment| format!("^{}$", regex::escape(segment)))
                    .collect::<Vec<_>>()
                    .join("/"),
            ),
        }
    }
}
