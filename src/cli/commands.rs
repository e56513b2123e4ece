use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::EngineConfig;
use crate::dependency::relation::shared_keys;
use crate::dependency::{PositionStrategy, Relation, relation_of};
use crate::emit::emit;
use crate::extract::{ScannedScenario, scan_file};
use crate::phase::{Phase, PhaseContext, PhaseProcessor, validate_methods};
use crate::plan::compiler::compile;
use crate::store::{FileStore, verify_consumable};

/// Options shared by every command.
pub struct CommonOptions {
    pub config: Option<PathBuf>,
    pub phase: Option<String>,
    pub synthetic: bool,
    pub max_permutations: Option<u64>,
    pub format: String,
    pub output: Option<PathBuf>,
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self {
            config: None,
            phase: None,
            synthetic: false,
            max_permutations: None,
            format: "yaml".to_owned(),
            output: None,
        }
    }
}

impl CommonOptions {
    /// Config file, then `PHASED_PHASE`, then command-line flags.
    fn resolve_config(&self) -> Result<EngineConfig, String> {
        let config = match &self.config {
            Some(path) => EngineConfig::load(path).map_err(|e| e.to_string())?,
            None => EngineConfig::default(),
        };
        let mut config = config
            .apply_env(|name| std::env::var(name).ok())
            .map_err(|e| e.to_string())?;

        if let Some(phase) = &self.phase {
            config.phase = phase.parse::<Phase>()?;
        }
        if self.synthetic {
            config.position_strategy = PositionStrategy::Synthetic;
        }
        if let Some(max) = self.max_permutations {
            config.max_permutations = max;
        }
        Ok(config)
    }
}

fn scan_all(files: &[PathBuf], config: &EngineConfig) -> Result<Vec<ScannedScenario>, String> {
    files
        .iter()
        .map(|file| scan_file(file, config.position_strategy).map_err(|e| e.to_string()))
        .collect()
}

fn finish(output: String, options: &CommonOptions, what: &str) -> Result<String, String> {
    if let Some(out_path) = &options.output {
        std::fs::write(out_path, &output)
            .map_err(|e| format!("failed to write {}: {e}", out_path.display()))?;
        Ok(format!("{what} written to {}", out_path.display()))
    } else {
        Ok(output)
    }
}

/// Run the `plan` command: scan scenario sources and emit their run plans.
///
/// # Errors
///
/// Returns an error string if scanning, compiling, or emitting fails.
pub fn run_plan(files: &[PathBuf], options: &CommonOptions) -> Result<String, String> {
    let config = options.resolve_config()?;
    let ctx = PhaseContext::new(config.phase);
    let mut all_output = String::new();

    for scanned in scan_all(files, &config)? {
        let plan = compile(&scanned.dependencies, &ctx, &config).map_err(|e| e.to_string())?;
        all_output.push_str(&emit(&plan, &options.format)?);
    }

    finish(all_output, options, "plan")
}

#[derive(Debug, Serialize)]
struct RelationReport {
    scenario: String,
    relations: Vec<RelationEntry>,
}

#[derive(Debug, Serialize)]
struct RelationEntry {
    step: String,
    other: String,
    relation: Relation,
    keys: Vec<String>,
}

/// Run the `relations` command: classify every pair of scenario steps.
///
/// Independent pairs are omitted.
///
/// # Errors
///
/// Returns an error string if scanning or emitting fails.
pub fn run_relations(files: &[PathBuf], options: &CommonOptions) -> Result<String, String> {
    let config = options.resolve_config()?;
    let mut all_output = String::new();

    for scanned in scan_all(files, &config)? {
        let order = scanned.dependencies.execution_order();
        let mut relations = Vec::new();
        for (i, a) in order.iter().enumerate() {
            for b in &order[i + 1..] {
                let relation = relation_of(a, b);
                if relation != Relation::Independent {
                    relations.push(RelationEntry {
                        step: a.name.clone(),
                        other: b.name.clone(),
                        relation,
                        keys: shared_keys(a, b),
                    });
                }
            }
        }
        let report = RelationReport {
            scenario: scanned.dependencies.name.clone(),
            relations,
        };
        all_output.push_str(&emit(&report, &options.format)?);
    }

    finish(all_output, options, "relations")
}

#[derive(Debug, Serialize)]
struct GateReport {
    scenario: String,
    phase: Phase,
    methods: Vec<GateEntry>,
}

#[derive(Debug, Serialize)]
struct GateEntry {
    method: String,
    runs: bool,
    tags: Vec<String>,
}

/// Run the `gate` command: decide which lifecycle methods run in the phase.
///
/// All methods are validated before any decision is reported.
///
/// # Errors
///
/// Returns an error string listing every configuration error, or if scanning fails.
pub fn run_gate(files: &[PathBuf], options: &CommonOptions) -> Result<String, String> {
    let config = options.resolve_config()?;
    let ctx = PhaseContext::new(config.phase);
    let scanned = scan_all(files, &config)?;

    let all_methods: Vec<_> = scanned
        .iter()
        .flat_map(|s| s.lifecycle.iter().cloned())
        .collect();
    validate_methods(&all_methods).map_err(|errors| {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    })?;

    let mut all_output = String::new();
    for scenario in &scanned {
        let mut methods = Vec::with_capacity(scenario.lifecycle.len());
        for method in &scenario.lifecycle {
            let runs = PhaseProcessor::for_method(method)
                .can_process(method, &ctx)
                .map_err(|e| e.to_string())?;
            methods.push(GateEntry {
                method: method.name.clone(),
                runs,
                tags: method.tags(),
            });
        }
        let report = GateReport {
            scenario: scenario.dependencies.name.clone(),
            phase: ctx.phase(),
            methods,
        };
        all_output.push_str(&emit(&report, &options.format)?);
    }

    finish(all_output, options, "gate report")
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    scenario: String,
    run_id: String,
    /// Every key the scenario's steps consume, all present in the store.
    keys: Vec<String>,
}

/// Run the `verify` command: check a producer run stored every key the
/// scenarios consume.
///
/// # Errors
///
/// Returns an error string naming the scenario, step and key of the first
/// missing value, or if no store root is configured.
pub fn run_verify(
    files: &[PathBuf],
    run_id: &str,
    store_root: Option<&Path>,
    options: &CommonOptions,
) -> Result<String, String> {
    let config = options.resolve_config()?;
    let root = store_root
        .map(Path::to_path_buf)
        .or_else(|| config.store_root.clone())
        .ok_or_else(|| "no store root: pass --store or set store_root in config".to_owned())?;
    let store = FileStore::open(&root, run_id).map_err(|e| e.to_string())?;

    let mut all_output = String::new();
    for scanned in scan_all(files, &config)? {
        let deps = &scanned.dependencies;
        verify_consumable(deps, &store).map_err(|e| e.to_string())?;
        info!(scenario = %deps.name, run_id, "consumer inputs present");

        let keys: BTreeSet<String> = deps
            .execution_order()
            .iter()
            .flat_map(|step| step.consumes.iter().cloned())
            .collect();
        let report = VerifyReport {
            scenario: deps.name.clone(),
            run_id: run_id.to_owned(),
            keys: keys.into_iter().collect(),
        };
        all_output.push_str(&emit(&report, &options.format)?);
    }

    finish(all_output, options, "verify report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CrossRunStore;

    fn write_scenario(dir: &Path, name: &str, source: &str) -> PathBuf {
        let path = dir.join(format!("{name}.rs"));
        std::fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn cli_phase_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("phased.yaml");
        std::fs::write(&cfg, "phase: consumer\nmax_permutations: 10\n").unwrap();
        let options = CommonOptions {
            config: Some(cfg),
            phase: Some("permutational".into()),
            synthetic: true,
            max_permutations: Some(99),
            ..CommonOptions::default()
        };
        let config = options.resolve_config().unwrap();
        assert_eq!(config.phase, Phase::Permutational);
        assert_eq!(config.position_strategy, PositionStrategy::Synthetic);
        assert_eq!(config.max_permutations, 99);
    }

    #[test]
    fn unknown_phase_flag_is_error() {
        let options = CommonOptions {
            phase: Some("eventually".into()),
            ..CommonOptions::default()
        };
        assert!(options.resolve_config().is_err());
    }

    #[test]
    fn plan_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_scenario(dir.path(), "Shop", "#[step]\nfn a() { produce(\"x\"); }\n");
        let out = dir.path().join("plan.yaml");
        let options = CommonOptions {
            phase: Some("producer".into()),
            output: Some(out.clone()),
            ..CommonOptions::default()
        };
        let msg = run_plan(&[file], &options).unwrap();
        assert!(msg.contains("plan written to"));
        let contents = std::fs::read_to_string(&out).unwrap();
        assert!(contents.contains("scenario: Shop"));
    }

    #[test]
    fn gate_reports_every_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_scenario(
            dir.path(),
            "Broken",
            "#[before_phase(consumer)]\nfn a() {}\n#[after_phase(producer)]\nfn b() {}\n",
        );
        let options = CommonOptions {
            phase: Some("producer".into()),
            ..CommonOptions::default()
        };
        let err = run_gate(&[file], &options).unwrap_err();
        assert!(err.contains("Broken::a"), "got: {err}");
        assert!(err.contains("Broken::b"), "got: {err}");
    }

    #[test]
    fn verify_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_scenario(dir.path(), "Shop", "#[step]\nfn a() { consume(\"x\"); }\n");
        let store_root = dir.path().join("store");
        FileStore::open(&store_root, "r")
            .unwrap()
            .put("x", serde_json::json!(1))
            .unwrap();
        let out = dir.path().join("verify.json");
        let options = CommonOptions {
            format: "json".into(),
            output: Some(out.clone()),
            ..CommonOptions::default()
        };

        let msg = run_verify(&[file], "r", Some(&store_root), &options).unwrap();
        assert!(msg.contains("verify report written to"), "got: {msg}");
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(report["scenario"], "Shop");
        assert_eq!(report["run_id"], "r");
        assert_eq!(report["keys"], serde_json::json!(["x"]));
    }

    #[test]
    fn verify_requires_store_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_scenario(dir.path(), "Shop", "#[step]\nfn a() {}\n");
        let err = run_verify(&[file], "run", None, &CommonOptions::default()).unwrap_err();
        assert!(err.contains("store root"), "got: {err}");
    }
}
