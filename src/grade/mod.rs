pub mod battery;
pub mod disk;

use serde::{Deserialize, Serialize};

/// Coarse component health grade.
///
/// Variants are declared worst-first so the derived `Ord` gives
/// `F < C < B < A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    F,
    C,
    B,
    A,
}

impl Grade {
    /// Worst-of combination.
    pub fn worse(self, other: Grade) -> Grade {
        self.min(other)
    }

    pub fn better(self, other: Grade) -> Grade {
        self.max(other)
    }

    /// Worst grade in a set; `None` for an empty set.
    pub fn worst_of(grades: impl IntoIterator<Item = Grade>) -> Option<Grade> {
        grades.into_iter().min()
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::F => "F",
        };
        f.write_str(s)
    }
}

/// Outcome of a health test as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Warning,
    Failed,
}

impl TestStatus {
    /// F fails; C or any issue warns; otherwise passes.
    pub fn from_outcome(grade: Grade, issues: &[String]) -> Self {
        match grade {
            Grade::F => TestStatus::Failed,
            Grade::C => TestStatus::Warning,
            _ if !issues.is_empty() => TestStatus::Warning,
            _ => TestStatus::Passed,
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Passed => write!(f, "passed"),
            TestStatus::Warning => write!(f, "warning"),
            TestStatus::Failed => write!(f, "failed"),
        }
    }
}
