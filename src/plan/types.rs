use serde::{Deserialize, Serialize};

use crate::dependency::{Category, InterdependentPair};

/// A compiled run plan: the orderings a runner should execute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunPlan {
    pub plan: PlanMetadata,
    pub steps: Vec<PlanStep>,
    /// Each ordering lists step names in the order they should run.
    pub orderings: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interdependent: Vec<InterdependentPair>,
    /// Producer-first order, set when the execution order runs a consumer
    /// before its producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_order: Option<Vec<String>>,
}

/// Metadata about the plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanMetadata {
    pub scenario: String,
    pub phase: String,
    pub position_strategy: String,
    pub steps_total: usize,
    pub orderings_total: usize,
}

/// A scenario step in execution order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanStep {
    pub order: usize,
    pub step: String,
    pub position: i64,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}
