use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::counter::Tally;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClassCount {
    pub label: String,
    pub count: u32,
    pub percentage: f32,
}

/// End of run summary of a [`Tally`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Summary {
    pub classes: Vec<ClassCount>,
    pub total: usize,
}

impl Summary {
    pub fn from_tally(tally: &Tally, labels: &[String]) -> Self {
        let total = tally.total();

        let classes = tally
            .iter()
            .map(|(class, count)| ClassCount {
                label: labels
                    .get(class)
                    .cloned()
                    .unwrap_or_else(|| format!("class {}", class)),
                count,
                percentage: if total > 0 {
                    count as f32 / total as f32 * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        Self { classes, total }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vehicle Count Summary:")?;

        for c in &self.classes {
            writeln!(f, "{}: {} ({:.2}%)", c.label, c.count, c.percentage)?;
        }

        write!(f, "\nTotal Vehicles: {}", self.total)
    }
}
