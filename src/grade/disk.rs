use super::{Grade, TestStatus};
use crate::detect::disk::{DiskInfo, DiskKind};
use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Size bands for disk grading. Sizes are decimal gigabytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskGradingCriteria {
    pub min_size_for_a_gb: f64,
    pub min_size_for_b_gb: f64,
    /// Below this the disk is graded F regardless of type.
    pub min_size_for_c_gb: f64,
    /// An SSD is never graded below this unless a hard-F rule applies.
    pub ssd_min_grade: Grade,
}

impl Default for DiskGradingCriteria {
    fn default() -> Self {
        Self {
            min_size_for_a_gb: 200.0,
            min_size_for_b_gb: 120.0,
            min_size_for_c_gb: 60.0,
            ssd_min_grade: Grade::B,
        }
    }
}

impl DiskGradingCriteria {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_size_for_a_gb >= self.min_size_for_b_gb
            && self.min_size_for_b_gb >= self.min_size_for_c_gb)
        {
            return Err(Error::Config(
                "disk size thresholds must satisfy A >= B >= C".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskHealthTest {
    pub disk: String,
    pub kind: DiskKind,
    pub status: TestStatus,
    pub grade: Grade,
    pub size_gb: f64,
    pub partitions: Vec<String>,
    pub issues: Vec<String>,
    pub timestamp: DateTime<Local>,
}

pub fn grade_from_size(criteria: &DiskGradingCriteria, size_gb: f64) -> Grade {
    if size_gb >= criteria.min_size_for_a_gb {
        Grade::A
    } else if size_gb >= criteria.min_size_for_b_gb {
        Grade::B
    } else if size_gb >= criteria.min_size_for_c_gb {
        Grade::C
    } else {
        Grade::F
    }
}

/// Residual partitions or an undersized disk force F. Otherwise the size band
/// applies, lifted to `ssd_min_grade` for solid-state disks.
pub fn compute_grade(
    criteria: &DiskGradingCriteria,
    kind: DiskKind,
    size_gb: f64,
    has_partitions: bool,
) -> Grade {
    if has_partitions || size_gb < criteria.min_size_for_c_gb {
        return Grade::F;
    }

    let grade = grade_from_size(criteria, size_gb);
    match kind {
        DiskKind::Ssd => grade.better(criteria.ssd_min_grade),
        DiskKind::Hdd => grade,
    }
}

pub fn detect_issues(
    size_gb: f64,
    partitions: &[String],
    criteria: &DiskGradingCriteria,
) -> Vec<String> {
    let mut issues = Vec::new();

    if !partitions.is_empty() {
        issues.push(format!(
            "residual partitions detected: [{}]",
            partitions.join(", ")
        ));
    }
    if size_gb < criteria.min_size_for_c_gb {
        issues.push(format!(
            "disk too small (< {:.0} GB)",
            criteria.min_size_for_c_gb
        ));
    } else if size_gb < criteria.min_size_for_b_gb {
        issues.push(format!(
            "limited capacity (< {:.0} GB)",
            criteria.min_size_for_b_gb
        ));
    }

    issues
}

pub fn run(info: &DiskInfo, criteria: &DiskGradingCriteria) -> DiskHealthTest {
    let size_gb = info.size_gb();
    let grade = compute_grade(criteria, info.kind, size_gb, !info.partitions.is_empty());
    let issues = detect_issues(size_gb, &info.partitions, criteria);

    DiskHealthTest {
        disk: info.name.clone(),
        kind: info.kind,
        status: TestStatus::from_outcome(grade, &issues),
        grade,
        size_gb,
        partitions: info.partitions.clone(),
        issues,
        timestamp: Local::now(),
    }
}
