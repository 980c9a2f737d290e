use crate::domain::model::{
    file_extension, AudioArtifact, AudioInput, FlowReport, FlowStrategy,
};
use crate::domain::ports::{AudioProcessor, Storage};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use crate::utils::validation::{
    validate_audio_file_name, validate_non_empty_string, validate_positive_number, Validate,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// 一個具名、可計時的 merge / mix 流程
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPlan {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub strategy: FlowStrategy,
    pub first: String,
    pub second: String,
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
}

fn default_repetitions() -> usize {
    1
}

impl FlowPlan {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        strategy: FlowStrategy,
        first: impl Into<String>,
        second: impl Into<String>,
        repetitions: usize,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            strategy,
            first: first.into(),
            second: second.into(),
            repetitions,
        }
    }

    /// `<flow>_<stage>.<ext>`，副檔名跟第一個 fixture 一致
    pub fn output_name(&self, stage: &str) -> String {
        let extension = file_extension(&self.first).unwrap_or_else(|| "mp3".to_string());
        format!("{}_{}.{}", self.name, stage, extension)
    }
}

impl Validate for FlowPlan {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("flow.name", &self.name)?;
        validate_audio_file_name("flow.first", &self.first)?;
        validate_audio_file_name("flow.second", &self.second)?;
        validate_positive_number("flow.repetitions", self.repetitions, 1)?;
        Ok(())
    }
}

/// Runs flow plans against an `AudioProcessor`, loading fixtures from `S`.
pub struct FlowRunner<P: AudioProcessor, S: Storage> {
    processor: P,
    fixtures: S,
    monitor: SystemMonitor,
    parallel_channels: bool,
}

impl<P: AudioProcessor, S: Storage> FlowRunner<P, S> {
    pub fn new(processor: P, fixtures: S) -> Self {
        Self {
            processor,
            fixtures,
            monitor: SystemMonitor::default(),
            parallel_channels: false,
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    /// merge_then_mix 的兩個聲道同時處理
    pub fn with_parallel_channels(mut self, enabled: bool) -> Self {
        self.parallel_channels = enabled;
        self
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub async fn run(&self, plan: &FlowPlan) -> Result<FlowReport> {
        plan.validate()?;

        self.monitor.begin_run();
        let started_at = Utc::now();
        let start = Instant::now();
        tracing::info!(
            "🚀 Starting flow {} ({}, {} repetitions)",
            plan.name,
            plan.strategy.as_str(),
            plan.repetitions
        );

        let first = self.load_fixture(&plan.first).await?;
        let second = self.load_fixture(&plan.second).await?;
        self.monitor.log_phase(&plan.name, "fixtures loaded");

        let (artifact, operations) = match plan.strategy {
            FlowStrategy::MergeThenMix => self.run_merge_then_mix(plan, &first, &second).await?,
            FlowStrategy::MixThenMerge => self.run_mix_then_merge(plan, &first, &second).await?,
            FlowStrategy::Merge => (
                self.processor
                    .merge(&first, &second, &plan.output_name("output"))
                    .await?,
                1,
            ),
            FlowStrategy::Mix => (
                self.processor
                    .mix(&first, &second, &plan.output_name("output"))
                    .await?,
                1,
            ),
        };
        self.monitor.log_phase(&plan.name, "done");

        let report = FlowReport {
            flow: plan.name.clone(),
            description: plan.description.clone(),
            strategy: plan.strategy,
            output_path: artifact.path,
            size_bytes: artifact.size_bytes,
            duration_ms: start.elapsed().as_millis() as u64,
            operations,
            started_at,
            peak_memory_mb: self.monitor.peak_memory_mb(),
        };
        tracing::info!("✅ {}", report.summary());
        Ok(report)
    }

    async fn load_fixture(&self, name: &str) -> Result<AudioInput> {
        let data = self.fixtures.read_file(name).await?;
        tracing::debug!("Loaded fixture {} ({} bytes)", name, data.len());
        Ok(AudioInput::new(name, data))
    }

    async fn run_merge_then_mix(
        &self,
        plan: &FlowPlan,
        first: &AudioInput,
        second: &AudioInput,
    ) -> Result<(AudioArtifact, usize)> {
        let channel_a_output = plan.output_name("channelA");
        let channel_b_output = plan.output_name("channelB");

        let ((channel_a, ops_a), (channel_b, ops_b)) = if self.parallel_channels {
            tokio::try_join!(
                self.merge_channel(first, plan.repetitions, &channel_a_output),
                self.merge_channel(second, plan.repetitions, &channel_b_output)
            )?
        } else {
            let a = self
                .merge_channel(first, plan.repetitions, &channel_a_output)
                .await?;
            let b = self
                .merge_channel(second, plan.repetitions, &channel_b_output)
                .await?;
            (a, b)
        };
        self.monitor.log_phase(&plan.name, "channels merged");

        let mixed = self
            .processor
            .mix(&channel_a, &channel_b, &plan.output_name("final_mix"))
            .await?;
        Ok((mixed, ops_a + ops_b + 1))
    }

    /// seed 重複串接 `repetitions - 1` 次
    async fn merge_channel(
        &self,
        seed: &AudioInput,
        repetitions: usize,
        output: &str,
    ) -> Result<(AudioInput, usize)> {
        let mut channel = seed.clone();
        let mut operations = 0;
        for round in 1..repetitions {
            let merged = self.processor.merge(&channel, seed, output).await?;
            tracing::debug!("{} round {}: {} bytes", output, round, merged.size_bytes);
            channel = merged.into_input();
            operations += 1;
        }
        Ok((channel, operations))
    }

    async fn run_mix_then_merge(
        &self,
        plan: &FlowPlan,
        first: &AudioInput,
        second: &AudioInput,
    ) -> Result<(AudioArtifact, usize)> {
        let segment_output = plan.output_name("segment");
        let final_output = plan.output_name("final_merge");

        let mut accumulated = self.processor.mix(first, second, &segment_output).await?;
        let mut operations = 1;

        for round in 1..plan.repetitions {
            let segment = self.processor.mix(first, second, &segment_output).await?;
            let merged = self
                .processor
                .merge(
                    &accumulated.clone().into_input(),
                    &segment.into_input(),
                    &final_output,
                )
                .await?;
            tracing::debug!("{} round {}: {} bytes", final_output, round, merged.size_bytes);
            accumulated = merged;
            operations += 2;
        }
        self.monitor.log_phase(&plan.name, "segments merged");

        Ok((accumulated, operations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::AudioOperation;
    use crate::utils::error::AudioError;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn with_file(self, path: &str, data: &[u8]) -> Self {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            self
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files
                .get(path)
                .cloned()
                .ok_or_else(|| AudioError::ResourceNotFound {
                    path: path.to_string(),
                })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn location(&self, path: &str) -> String {
            format!("memory://{}", path)
        }
    }

    /// merge 串接位元組，mix 取較長的一個
    #[derive(Default)]
    struct MockProcessor {
        calls: Mutex<Vec<(AudioOperation, String)>>,
    }

    impl MockProcessor {
        async fn record(&self, op: AudioOperation, data: Vec<u8>, output: &str) -> AudioArtifact {
            self.calls.lock().await.push((op, output.to_string()));
            AudioArtifact {
                path: format!("memory://{}", output),
                file_name: output.to_string(),
                size_bytes: data.len() as u64,
                data: Bytes::from(data),
            }
        }
    }

    #[async_trait]
    impl AudioProcessor for MockProcessor {
        async fn merge(
            &self,
            first: &AudioInput,
            second: &AudioInput,
            output: &str,
        ) -> Result<AudioArtifact> {
            let mut data = first.data.to_vec();
            data.extend_from_slice(&second.data);
            Ok(self.record(AudioOperation::Merge, data, output).await)
        }

        async fn mix(
            &self,
            first: &AudioInput,
            second: &AudioInput,
            output: &str,
        ) -> Result<AudioArtifact> {
            let longest = if first.len() >= second.len() { first } else { second };
            Ok(self
                .record(AudioOperation::Mix, longest.data.to_vec(), output)
                .await)
        }
    }

    async fn fixtures() -> MockStorage {
        MockStorage::default()
            .with_file("short_a.mp3", b"aa")
            .await
            .with_file("short_b.mp3", b"bbb")
            .await
    }

    #[test]
    fn test_output_name_uses_fixture_extension() {
        let plan = FlowPlan::new("flow9", "", FlowStrategy::Mix, "a.wav", "b.wav", 1);
        assert_eq!(plan.output_name("output"), "flow9_output.wav");
    }

    #[test]
    fn test_plan_validation() {
        let plan = FlowPlan::new("flow1", "", FlowStrategy::MergeThenMix, "a.mp3", "b.mp3", 0);
        assert!(plan.validate().is_err());

        let plan = FlowPlan::new("flow1", "", FlowStrategy::MergeThenMix, "a.txt", "b.mp3", 2);
        assert!(plan.validate().is_err());

        let plan = FlowPlan::new("flow1", "", FlowStrategy::MergeThenMix, "a.mp3", "b.mp3", 2);
        assert!(plan.validate().is_ok());
    }

    #[tokio::test]
    async fn test_merge_then_mix_builds_channels() {
        let runner = FlowRunner::new(MockProcessor::default(), fixtures().await);
        let plan = FlowPlan::new(
            "flow1",
            "channel merge then mix",
            FlowStrategy::MergeThenMix,
            "short_a.mp3",
            "short_b.mp3",
            3,
        );

        let report = runner.run(&plan).await.unwrap();

        // channel A = 3 x "aa" (6 bytes), channel B = 3 x "bbb" (9 bytes), mix keeps the longest
        assert_eq!(report.size_bytes, 9);
        assert_eq!(report.operations, 5);
        assert_eq!(report.output_path, "memory://flow1_final_mix.mp3");
        assert_eq!(report.strategy, FlowStrategy::MergeThenMix);

        let calls = runner.processor().calls.lock().await;
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], (AudioOperation::Merge, "flow1_channelA.mp3".to_string()));
        assert_eq!(calls[2], (AudioOperation::Merge, "flow1_channelB.mp3".to_string()));
        assert_eq!(calls[4], (AudioOperation::Mix, "flow1_final_mix.mp3".to_string()));
    }

    #[tokio::test]
    async fn test_merge_then_mix_parallel_channels() {
        let runner = FlowRunner::new(MockProcessor::default(), fixtures().await)
            .with_parallel_channels(true);
        let plan = FlowPlan::new(
            "flow3",
            "",
            FlowStrategy::MergeThenMix,
            "short_a.mp3",
            "short_b.mp3",
            4,
        );

        let report = runner.run(&plan).await.unwrap();

        assert_eq!(report.size_bytes, 12);
        assert_eq!(report.operations, 7);
    }

    #[tokio::test]
    async fn test_single_repetition_skips_merging() {
        let runner = FlowRunner::new(MockProcessor::default(), fixtures().await);
        let plan = FlowPlan::new(
            "flow1",
            "",
            FlowStrategy::MergeThenMix,
            "short_a.mp3",
            "short_b.mp3",
            1,
        );

        let report = runner.run(&plan).await.unwrap();

        assert_eq!(report.operations, 1);
        assert_eq!(report.size_bytes, 3);
    }

    #[tokio::test]
    async fn test_mix_then_merge_accumulates_segments() {
        let runner = FlowRunner::new(MockProcessor::default(), fixtures().await);
        let plan = FlowPlan::new(
            "flow2",
            "mix then merge",
            FlowStrategy::MixThenMerge,
            "short_a.mp3",
            "short_b.mp3",
            3,
        );

        let report = runner.run(&plan).await.unwrap();

        // every segment is "bbb", three of them end up merged
        assert_eq!(report.size_bytes, 9);
        assert_eq!(report.operations, 5);
        assert_eq!(report.output_path, "memory://flow2_final_merge.mp3");
    }

    #[tokio::test]
    async fn test_mix_then_merge_single_repetition_reports_segment() {
        let runner = FlowRunner::new(MockProcessor::default(), fixtures().await);
        let plan = FlowPlan::new(
            "flow4",
            "",
            FlowStrategy::MixThenMerge,
            "short_a.mp3",
            "short_b.mp3",
            1,
        );

        let report = runner.run(&plan).await.unwrap();

        assert_eq!(report.operations, 1);
        assert_eq!(report.output_path, "memory://flow4_segment.mp3");
    }

    #[tokio::test]
    async fn test_single_operation_flows() {
        let runner = FlowRunner::new(MockProcessor::default(), fixtures().await);

        let merge = FlowPlan::new("merge", "", FlowStrategy::Merge, "short_a.mp3", "short_b.mp3", 1);
        let report = runner.run(&merge).await.unwrap();
        assert_eq!(report.size_bytes, 5);
        assert_eq!(report.output_path, "memory://merge_output.mp3");

        let mix = FlowPlan::new("mix", "", FlowStrategy::Mix, "short_a.mp3", "short_b.mp3", 1);
        let report = runner.run(&mix).await.unwrap();
        assert_eq!(report.size_bytes, 3);
        assert_eq!(report.operations, 1);
    }

    #[cfg(feature = "cli")]
    #[tokio::test]
    async fn test_peak_memory_is_per_run() {
        let runner =
            FlowRunner::new(MockProcessor::default(), fixtures().await).with_monitoring(true);
        let plan = FlowPlan::new("mix", "", FlowStrategy::Mix, "short_a.mp3", "short_b.mp3", 1);

        let first = runner.run(&plan).await.unwrap();
        runner.monitor.record_peak(u64::MAX / 2);
        let second = runner.run(&plan).await.unwrap();

        if let (Some(_), Some(peak)) = (first.peak_memory_mb, second.peak_memory_mb) {
            assert!(peak < u64::MAX / 2);
        }
    }

    #[tokio::test]
    async fn test_missing_fixture() {
        let runner = FlowRunner::new(MockProcessor::default(), fixtures().await);
        let plan = FlowPlan::new("mix", "", FlowStrategy::Mix, "long_a.mp3", "long_b.mp3", 1);

        let err = runner.run(&plan).await.unwrap_err();

        assert!(matches!(err, AudioError::ResourceNotFound { .. }));
        assert!(runner.processor().calls.lock().await.is_empty());
    }
}
