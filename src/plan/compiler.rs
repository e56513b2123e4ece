use thiserror::Error;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::dependency::{Relation, ScenarioDependencies, StepDependency, relation_of};
use crate::graph::analysis::{find_cycle, respects_dependencies};
use crate::graph::builder::build;
use crate::graph::traversal::{dependency_order, step_names};
use crate::phase::{Phase, PhaseContext};
use crate::plan::permutation::{
    PermutationLimitExceeded, factorial_estimate, outer_join, permutations,
};
use crate::plan::types::{PlanMetadata, PlanStep, RunPlan};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("scenario '{scenario}': steps '{first}' and '{second}' depend on each other via [{}]", .keys.join(", "))]
    Interdependent {
        scenario: String,
        first: String,
        second: String,
        keys: Vec<String>,
    },

    #[error("scenario '{scenario}': dependency cycle {}", .steps.join(" -> "))]
    Cycle { scenario: String, steps: Vec<String> },

    #[error("scenario '{scenario}': {source}")]
    TooManyOrderings {
        scenario: String,
        #[source]
        source: PermutationLimitExceeded,
    },
}

/// Compile a scenario into a run plan for the context's phase.
///
/// The permutational phase yields every ordering of each independent step
/// group, combined across groups; every other phase yields the single
/// execution order.
///
/// # Errors
///
/// In the permutational phase, returns an error for interdependent steps,
/// dependency cycles, or when the ordering count would exceed the cap.
pub fn compile(
    scenario: &ScenarioDependencies,
    ctx: &PhaseContext,
    config: &EngineConfig,
) -> Result<RunPlan, PlanError> {
    let order = scenario.execution_order();
    let interdependent = scenario.interdependent_pairs();
    for pair in &interdependent {
        warn!(
            scenario = %scenario.name,
            first = %pair.first,
            second = %pair.second,
            "steps depend on each other"
        );
    }

    let mut reordered = None;
    let orderings = match ctx.phase() {
        Phase::Permutational => {
            if let Some(pair) = interdependent.first() {
                return Err(PlanError::Interdependent {
                    scenario: scenario.name.clone(),
                    first: pair.first.clone(),
                    second: pair.second.clone(),
                    keys: pair.keys.clone(),
                });
            }
            permuted_orderings(scenario, config)?
        }
        _ if order.is_empty() => Vec::new(),
        _ => {
            let names: Vec<String> = order.iter().map(|s| s.name.clone()).collect();
            reordered = producer_first(scenario, &names);
            vec![names]
        }
    };

    let steps: Vec<PlanStep> = order
        .iter()
        .enumerate()
        .map(|(i, step)| PlanStep {
            order: i + 1,
            step: step.name.clone(),
            position: step.position,
            category: step.category(),
            produces: step.produces.iter().cloned().collect(),
            consumes: step.consumes.iter().cloned().collect(),
            depends_on: depends_on(step, &order),
        })
        .collect();

    info!(
        scenario = %scenario.name,
        phase = %ctx.phase(),
        steps = steps.len(),
        orderings = orderings.len(),
        "compiled run plan"
    );

    Ok(RunPlan {
        plan: PlanMetadata {
            scenario: scenario.name.clone(),
            phase: ctx.phase().to_string(),
            position_strategy: scenario.strategy().to_string(),
            steps_total: steps.len(),
            orderings_total: orderings.len(),
        },
        steps,
        orderings,
        interdependent,
        dependency_order: reordered,
    })
}

/// Producer-first order when `names` runs a consumer before its producer.
fn producer_first(scenario: &ScenarioDependencies, names: &[String]) -> Option<Vec<String>> {
    let dg = build(scenario);
    if respects_dependencies(&dg, names) {
        return None;
    }
    match dependency_order(&dg) {
        Ok(order) => {
            let order = step_names(&dg, &order);
            warn!(
                scenario = %scenario.name,
                suggested = %order.join(", "),
                "execution order runs a consumer before its producer"
            );
            Some(order)
        }
        Err(e) => {
            warn!(scenario = %scenario.name, error = %e, "no producer-first order");
            None
        }
    }
}

fn depends_on(step: &StepDependency, order: &[&StepDependency]) -> Vec<String> {
    order
        .iter()
        .filter(|other| other.name != step.name)
        .filter(|other| {
            matches!(
                relation_of(step, other),
                Relation::DependsOn | Relation::Interdependent
            )
        })
        .map(|other| other.name.clone())
        .collect()
}

fn permuted_orderings(
    scenario: &ScenarioDependencies,
    config: &EngineConfig,
) -> Result<Vec<Vec<String>>, PlanError> {
    let dg = build(scenario);
    if config.respect_dependencies
        && let Some(steps) = find_cycle(&dg)
    {
        return Err(PlanError::Cycle {
            scenario: scenario.name.clone(),
            steps,
        });
    }

    let groups: Vec<Vec<String>> = scenario
        .independent_groups()
        .iter()
        .map(|g| g.iter().map(|s| s.name.clone()).collect())
        .collect();

    let limit = u128::from(config.max_permutations);
    let estimated = groups
        .iter()
        .map(|g| factorial_estimate(g.len()))
        .fold(1u128, u128::saturating_mul);
    if estimated > limit {
        return Err(PlanError::TooManyOrderings {
            scenario: scenario.name.clone(),
            source: PermutationLimitExceeded {
                items: groups.iter().map(Vec::len).sum(),
                estimated,
                limit,
            },
        });
    }

    let mut orderings: Vec<Vec<String>> = Vec::new();
    for group in &groups {
        let mut group_orderings = permutations(group);
        if config.respect_dependencies {
            group_orderings.retain(|ordering| respects_dependencies(&dg, ordering));
        }
        orderings = outer_join(&orderings, &group_orderings);
    }
    Ok(orderings)
}
