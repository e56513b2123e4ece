use crate::dependency::Category;
use crate::plan::types::{PlanMetadata, PlanStep, RunPlan};

/// A two-step producer plan shared by the emitter tests.
pub(crate) fn shop_plan() -> RunPlan {
    RunPlan {
        plan: PlanMetadata {
            scenario: "Shop".into(),
            phase: "producer".into(),
            position_strategy: "source-line".into(),
            steps_total: 2,
            orderings_total: 1,
        },
        steps: vec![
            PlanStep {
                order: 1,
                step: "login".into(),
                position: 3,
                category: Category::ProducerOnly,
                produces: vec!["token".into()],
                consumes: vec![],
                depends_on: vec![],
            },
            PlanStep {
                order: 2,
                step: "checkout".into(),
                position: 8,
                category: Category::ConsumerOnly,
                produces: vec![],
                consumes: vec!["token".into()],
                depends_on: vec!["login".into()],
            },
        ],
        orderings: vec![vec!["login".into(), "checkout".into()]],
        interdependent: vec![],
        dependency_order: None,
    }
}
