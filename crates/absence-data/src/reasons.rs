//! Ranking of absence reasons.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use absence_core::models::AbsenceInterval;

/// Occurrences of one reason string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: usize,
}

/// Counts reasons and ranks them by descending count.
pub struct ReasonTally;

impl ReasonTally {
    /// Ties keep the order in which the reasons were first encountered.
    pub fn tally<'a, A, I>(absences: I) -> Vec<ReasonCount>
    where
        A: AbsenceInterval + 'a,
        I: IntoIterator<Item = &'a A>,
    {
        let mut ranked: Vec<ReasonCount> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for absence in absences {
            let reason = absence.reason();
            match index.get(reason) {
                Some(&i) => ranked[i].count += 1,
                None => {
                    index.insert(reason.to_string(), ranked.len());
                    ranked.push(ReasonCount {
                        reason: reason.to_string(),
                        count: 1,
                    });
                }
            }
        }

        // Stable sort preserves first-encountered order among equal counts.
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }
}
