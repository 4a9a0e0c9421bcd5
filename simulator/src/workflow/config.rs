use crate::display::model::QualityGate;
use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use rppgcore::prelude::{CombinationStrategy, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub subject: String,
    /// Enable periodic record submission once the first sample is in.
    pub sampling: bool,
    pub pipeline: PipelineConfig,
    pub generator: GeneratorConfig,
    pub gate: QualityGate,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            subject: "demo-subject".to_string(),
            sampling: false,
            pipeline: PipelineConfig::default(),
            generator: GeneratorConfig::default(),
            gate: QualityGate::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        subject: &str,
        strategy: CombinationStrategy,
        sampling: bool,
        generator: GeneratorConfig,
    ) -> Self {
        Self {
            subject: subject.to_string(),
            sampling,
            pipeline: PipelineConfig {
                strategy,
                ..Default::default()
            },
            generator,
            gate: QualityGate::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_sets_strategy() {
        let cfg = WorkflowConfig::from_args(
            "kim",
            CombinationStrategy::ChrominanceCombination,
            true,
            GeneratorConfig::default(),
        );
        assert_eq!(cfg.pipeline.strategy, CombinationStrategy::ChrominanceCombination);
        assert_eq!(cfg.pipeline.schedule.sampling_interval_secs, 10.0);
        assert!(cfg.sampling);
    }

    #[test]
    fn config_load_reads_partial_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"subject: lee\npipeline:\n  strategy: red\n  valley:\n    refractory_ms: 250\ngenerator:\n  bpm: 90\n  seed: 7\ngate:\n  min_score: 0.7\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.subject, "lee");
        assert_eq!(cfg.pipeline.strategy, CombinationStrategy::RedOnly);
        assert_eq!(cfg.pipeline.valley.refractory_ms, 250.0);
        assert_eq!(cfg.pipeline.valley.smoothing_secs, 0.1);
        assert_eq!(cfg.generator.bpm, 90.0);
        assert_eq!(cfg.generator.fps, 30.0);
        assert_eq!(cfg.gate.min_score, 0.7);
        assert_eq!(cfg.gate.min_confidence, 0.5);
    }

    #[test]
    fn config_load_reports_missing_file() {
        let err = WorkflowConfig::load("/nonexistent/workflow.yaml").unwrap_err();
        assert!(err.to_string().contains("reading workflow config"));
    }
}
