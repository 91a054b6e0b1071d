use super::{Grade, TestStatus};
use crate::detect::battery::{BatteryInfo, BatteryStatus};
use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Health-percent and cycle-count bands for battery grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryGradingCriteria {
    /// Minimum health (% of design capacity) for each grade, descending.
    pub min_health_for_a: f64,
    pub min_health_for_b: f64,
    pub min_health_for_c: f64,
    /// Maximum charge cycles for each grade, ascending.
    pub max_cycles_for_a: u32,
    pub max_cycles_for_b: u32,
    pub max_cycles_for_c: u32,
}

impl Default for BatteryGradingCriteria {
    fn default() -> Self {
        Self {
            min_health_for_a: 85.0,
            min_health_for_b: 70.0,
            min_health_for_c: 50.0,
            max_cycles_for_a: 300,
            max_cycles_for_b: 500,
            max_cycles_for_c: 800,
        }
    }
}

impl BatteryGradingCriteria {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_health_for_a >= self.min_health_for_b
            && self.min_health_for_b >= self.min_health_for_c)
        {
            return Err(Error::Config(
                "battery health thresholds must satisfy A >= B >= C".to_string(),
            ));
        }
        if !(self.max_cycles_for_a <= self.max_cycles_for_b
            && self.max_cycles_for_b <= self.max_cycles_for_c)
        {
            return Err(Error::Config(
                "battery cycle thresholds must satisfy A <= B <= C".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of grading one battery.
#[derive(Debug, Clone, Serialize)]
pub struct BatteryHealthTest {
    pub status: TestStatus,
    pub grade: Grade,
    pub health_percent: f64,
    pub cycle_count: Option<u32>,
    pub issues: Vec<String>,
    pub timestamp: DateTime<Local>,
}

pub fn grade_from_health(criteria: &BatteryGradingCriteria, health_percent: f64) -> Grade {
    if health_percent >= criteria.min_health_for_a {
        Grade::A
    } else if health_percent >= criteria.min_health_for_b {
        Grade::B
    } else if health_percent >= criteria.min_health_for_c {
        Grade::C
    } else {
        Grade::F
    }
}

pub fn grade_from_cycles(criteria: &BatteryGradingCriteria, cycle_count: u32) -> Grade {
    if cycle_count <= criteria.max_cycles_for_a {
        Grade::A
    } else if cycle_count <= criteria.max_cycles_for_b {
        Grade::B
    } else if cycle_count <= criteria.max_cycles_for_c {
        Grade::C
    } else {
        Grade::F
    }
}

/// Worse of the health grade and the cycle grade.
pub fn compute_grade(
    criteria: &BatteryGradingCriteria,
    health_percent: f64,
    cycle_count: u32,
) -> Grade {
    grade_from_health(criteria, health_percent).worse(grade_from_cycles(criteria, cycle_count))
}

/// Threshold violations worth telling the operator about.
///
/// An unrecognised status string yields a single issue and nothing else is
/// checked.
pub fn detect_issues(
    status: &str,
    health_percent: f64,
    cycle_count: Option<u32>,
    criteria: &BatteryGradingCriteria,
) -> Vec<String> {
    let Ok(status) = status.parse::<BatteryStatus>() else {
        return vec![format!("invalid battery status: {}", status)];
    };

    let mut issues = Vec::new();

    if status == BatteryStatus::Discharging && health_percent < 20.0 {
        issues.push("battery discharging with very low health (<20%)".to_string());
    }
    if health_percent < criteria.min_health_for_c {
        issues.push(format!(
            "battery health too low ({:.0}% < {:.0}%)",
            health_percent, criteria.min_health_for_c
        ));
    }
    if health_percent > 100.0 {
        issues.push(format!(
            "abnormal battery health ({:.0}% > 100%), check the sensors",
            health_percent
        ));
    }
    if let Some(cycles) = cycle_count
        && cycles > criteria.max_cycles_for_c
    {
        issues.push(format!(
            "high charge cycle count ({} > {}), consider replacement",
            cycles, criteria.max_cycles_for_c
        ));
    }

    issues
}

/// Grade a probed battery. Fails when no capacity counters allow a health figure.
pub fn run(info: &BatteryInfo, criteria: &BatteryGradingCriteria) -> Result<BatteryHealthTest> {
    let health = info.health_percent().ok_or_else(|| {
        Error::Detection(format!(
            "battery {}: no energy_full/charge_full counters to derive health",
            info.supply_name
        ))
    })?;

    let grade = match info.cycle_count {
        Some(cycles) => compute_grade(criteria, health, cycles),
        None => grade_from_health(criteria, health),
    };
    let issues = detect_issues(&info.status, health, info.cycle_count, criteria);

    Ok(BatteryHealthTest {
        status: TestStatus::from_outcome(grade, &issues),
        grade,
        health_percent: health,
        cycle_count: info.cycle_count,
        issues,
        timestamp: Local::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn criteria() -> BatteryGradingCriteria {
        BatteryGradingCriteria::default()
    }

    #[test]
    fn test_reference_grades() {
        assert_eq!(compute_grade(&criteria(), 90.0, 100), Grade::A);
        assert_eq!(compute_grade(&criteria(), 60.0, 900), Grade::F);
        assert_eq!(compute_grade(&criteria(), 75.0, 100), Grade::B);
        assert_eq!(compute_grade(&criteria(), 95.0, 650), Grade::C);
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let c = criteria();
        assert_eq!(grade_from_health(&c, 85.0), Grade::A);
        assert_eq!(grade_from_health(&c, 84.99), Grade::B);
        assert_eq!(grade_from_health(&c, 50.0), Grade::C);
        assert_eq!(grade_from_health(&c, 49.9), Grade::F);
        assert_eq!(grade_from_cycles(&c, 300), Grade::A);
        assert_eq!(grade_from_cycles(&c, 301), Grade::B);
        assert_eq!(grade_from_cycles(&c, 800), Grade::C);
        assert_eq!(grade_from_cycles(&c, 801), Grade::F);
    }

    #[test]
    fn test_invalid_status_short_circuits() {
        let issues = detect_issues("Unknown", 10.0, Some(5000), &criteria());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("invalid battery status"));
        assert!(issues[0].contains("Unknown"));
    }

    #[test]
    fn test_healthy_battery_has_no_issues() {
        assert!(detect_issues("Full", 92.0, Some(120), &criteria()).is_empty());
        assert!(detect_issues("Not charging", 92.0, None, &criteria()).is_empty());
    }

    #[test]
    fn test_issue_rules() {
        let issues = detect_issues("Discharging", 15.0, Some(900), &criteria());
        assert_eq!(issues.len(), 3);
        assert!(issues[0].contains("discharging"));
        assert!(issues[1].contains("too low"));
        assert!(issues[2].contains("cycle"));

        let issues = detect_issues("Charging", 104.0, Some(10), &criteria());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("check the sensors"));

        // Low health alone does not trigger the discharging rule while charging.
        let issues = detect_issues("Charging", 15.0, None, &criteria());
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(criteria().validate().is_ok());
        let bad = BatteryGradingCriteria {
            min_health_for_b: 90.0,
            ..criteria()
        };
        assert!(bad.validate().is_err());
        let bad = BatteryGradingCriteria {
            max_cycles_for_a: 600,
            ..criteria()
        };
        assert!(bad.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_monotonic_in_health(h1 in 0.0f64..150.0, h2 in 0.0f64..150.0, cycles in 0u32..2000) {
            let (lo, hi) = if h1 <= h2 { (h1, h2) } else { (h2, h1) };
            let c = criteria();
            prop_assert!(compute_grade(&c, hi, cycles) >= compute_grade(&c, lo, cycles));
        }

        #[test]
        fn prop_monotonic_in_cycles(health in 0.0f64..150.0, c1 in 0u32..2000, c2 in 0u32..2000) {
            let (lo, hi) = if c1 <= c2 { (c1, c2) } else { (c2, c1) };
            let c = criteria();
            prop_assert!(compute_grade(&c, health, hi) <= compute_grade(&c, health, lo));
        }

        #[test]
        fn prop_combined_is_worst_of(health in 0.0f64..150.0, cycles in 0u32..2000) {
            let c = criteria();
            let g = compute_grade(&c, health, cycles);
            prop_assert!(g <= grade_from_health(&c, health));
            prop_assert!(g <= grade_from_cycles(&c, cycles));
        }
    }
}
