//! Domain primitives for the bias audit.

use std::fmt;

/// Metrics for one slice of the audited batch.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupMetrics {
    pub group: String,
    pub rows: usize,
    pub accuracy: f64,
    /// Recall of survival; `None` where it is not reported or the group has
    /// no survivors.
    pub recall: Option<f64>,
}

/// Audit results sliced by sex and by passenger class.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BiasReport {
    pub by_sex: Vec<GroupMetrics>,
    pub by_class: Vec<GroupMetrics>,
}

impl BiasReport {
    pub fn sex(&self, group: &str) -> Option<&GroupMetrics> {
        self.by_sex.iter().find(|g| g.group == group)
    }

    pub fn class(&self, group: &str) -> Option<&GroupMetrics> {
        self.by_class.iter().find(|g| g.group == group)
    }
}

impl fmt::Display for BiasReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== MODEL BIAS AUDIT ===")?;
        for g in &self.by_sex {
            let recall = g
                .recall
                .map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}"));
            writeln!(
                f,
                "Gender: {:6} | Rows: {:4} | Accuracy: {:.2} | Recall (Survival): {recall}",
                g.group, g.rows, g.accuracy
            )?;
        }
        writeln!(f, "{}", "-".repeat(35))?;
        for g in &self.by_class {
            writeln!(
                f,
                "Class: {:6}  | Rows: {:4} | Accuracy: {:.2}",
                g.group, g.rows, g.accuracy
            )?;
        }
        Ok(())
    }
}
