//! Plan items returned by infrastructure and foundation providers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A planned change from one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Human-readable description
    pub description: String,

    /// Tasks to perform, in order
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A single unit of planned work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task type, e.g. "terraform.apply"
    #[serde(rename = "type")]
    pub task_type: String,

    /// Human-readable description
    pub description: String,

    /// Task arguments
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.task_type, self.description)
    }
}

/// Ordered plans for an appfile: infrastructure first, then each foundation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPlan {
    pub plans: Vec<Plan>,
}

impl ExecutionPlan {
    /// Total number of tasks across plans.
    pub fn task_count(&self) -> usize {
        self.plans.iter().map(|p| p.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
