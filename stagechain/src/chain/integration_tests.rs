//! End-to-end tests for the standard chain and the driver.

#[cfg(test)]
mod tests {
    use crate::chain::{standard_sequence, ReconstructionPath};
    use crate::context::{keys, ExecutionContext};
    use crate::driver::PipelineDriver;
    use crate::errors::ChainError;
    use crate::options::RunOptions;
    use crate::progress::CollectingProgressSink;
    use crate::stages::{FnStage, StageId, StageRegistry, StageRun};
    use crate::testing::{full_registry, CallLog, FailingStage, ProducingStage, RecordingStage};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn names(path: ReconstructionPath) -> Vec<String> {
        standard_sequence(path)
            .into_iter()
            .map(|id| id.name().to_string())
            .collect()
    }

    fn benchmark_lines(dir: &TempDir) -> Vec<String> {
        fs::read_to_string(dir.path().join("benchmark.txt"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_fast_orthophoto_skips_dense_reconstruction() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let options = RunOptions::new(dir.path()).with_fast_orthophoto(true);

        let ctx = PipelineDriver::new(options, &full_registry(&log))
            .unwrap()
            .execute()
            .unwrap();

        assert_eq!(log.calls(), names(ReconstructionPath::Sparse));
        assert_eq!(log.len(), 12);
        assert!(!log.calls().contains(&"openmvs".to_string()));
        assert!(!ctx.contains_key(keys::DENSE_POINT_CLOUD));
        assert!(ctx.contains_key(keys::ORTHOPHOTO));
    }

    #[test]
    fn test_dense_run_with_fresh_benchmark_log() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let options = RunOptions::new(dir.path()).with_benchmarking(true);

        PipelineDriver::new(options, &full_registry(&log))
            .unwrap()
            .execute()
            .unwrap();

        assert_eq!(log.calls(), names(ReconstructionPath::Dense));

        let lines = benchmark_lines(&dir);
        assert!(lines[0].starts_with("Benchmarking file created "));
        assert!(lines[1].starts_with("Number of Cores: "));
        assert_eq!(lines[2], "");

        let rows: Vec<&str> = lines[3..]
            .iter()
            .map(|line| line.split(" runtime: ").next().unwrap())
            .collect();
        assert_eq!(rows, StageId::ALL.map(StageId::name).to_vec());
        assert!(lines[3..].iter().all(|line| line.ends_with(" seconds")));
    }

    #[test]
    fn test_prior_benchmark_log_is_replaced() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("benchmark.txt"), "stale contents\n").unwrap();
        let options = RunOptions::new(dir.path()).with_benchmarking(true).with_end_with("dataset");

        PipelineDriver::new(options, &StageRegistry::dry_run())
            .unwrap()
            .execute()
            .unwrap();

        let lines = benchmark_lines(&dir);
        assert!(lines[0].starts_with("Benchmarking file created "));
        assert!(!lines.iter().any(|line| line.contains("stale")));
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_no_benchmark_log_without_flag() {
        let dir = TempDir::new().unwrap();

        PipelineDriver::new(RunOptions::new(dir.path()), &StageRegistry::dry_run())
            .unwrap()
            .execute()
            .unwrap();

        assert!(!dir.path().join("benchmark.txt").exists());
    }

    #[test]
    fn test_texturing_failure_stops_the_chain() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let registry = full_registry(&log).with(
            StageId::Texturing,
            Arc::new(FailingStage::new(log.clone(), "texture atlas overflow")),
        );
        let options = RunOptions::new(dir.path()).with_benchmarking(true);
        let driver = PipelineDriver::new(options, &registry).unwrap();

        let mut ctx = driver.prepare().unwrap();
        let err = driver.run_prepared(&mut ctx).unwrap_err();

        match &err {
            ChainError::StageFailed { stage, source } => {
                assert_eq!(stage, "mvs_texturing");
                assert_eq!(source.to_string(), "texture atlas overflow");
            }
            other => panic!("unexpected error: {other}"),
        }

        let calls = log.calls();
        assert_eq!(calls.last().map(String::as_str), Some("mvs_texturing"));
        assert_eq!(calls.len(), 9);
        assert!(ctx.contains_key(keys::MESH));
        assert!(!ctx.contains_key(keys::TEXTURED_MODEL));
        assert!(!ctx.contains_key(keys::GEOREFERENCED_MODEL));

        // Rows for the eight stages that completed, none for the failed one.
        let lines = benchmark_lines(&dir);
        assert_eq!(lines.len(), 3 + 8);
        assert!(!lines.iter().any(|line| line.starts_with("mvs_texturing")));
    }

    #[test]
    fn test_entry_stage_sees_seeded_context() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let entry = Arc::new(RecordingStage::new(StageId::Multispectral, log.clone()));
        let registry = full_registry(&log).with(StageId::Multispectral, entry.clone());

        PipelineDriver::new(RunOptions::new(dir.path()), &registry)
            .unwrap()
            .execute()
            .unwrap();

        let seen = entry.seen_keys();
        assert_eq!(seen.len(), 1);
        for key in keys::SEEDED {
            assert!(seen[0].contains(&key.to_string()), "missing {key}");
        }
    }

    #[test]
    fn test_end_with_stops_early() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let options = RunOptions::new(dir.path()).with_end_with("odm_meshing");

        let ctx = PipelineDriver::new(options, &full_registry(&log))
            .unwrap()
            .execute()
            .unwrap();

        assert_eq!(log.calls().last().map(String::as_str), Some("odm_meshing"));
        assert_eq!(log.len(), 8);
        assert!(!ctx.contains_key(keys::TEXTURED_MODEL));
    }

    #[test]
    fn test_rerun_single_stage() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let dataset = Arc::new(RecordingStage::new(StageId::Dataset, log.clone()));
        let meshing = Arc::new(RecordingStage::new(StageId::Meshing, log.clone()));
        let registry = full_registry(&log)
            .with(StageId::Dataset, dataset.clone())
            .with(StageId::Meshing, meshing.clone());
        let options = RunOptions::new(dir.path()).with_rerun("odm_meshing");

        PipelineDriver::new(options, &registry).unwrap().execute().unwrap();

        assert_eq!(dataset.reruns(), vec![false]);
        assert_eq!(meshing.reruns(), vec![true]);
        assert_eq!(log.calls().last().map(String::as_str), Some("odm_meshing"));
    }

    #[test]
    fn test_rerun_from_flags_remaining_stages() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let options = RunOptions::new(dir.path()).with_rerun_from("mvs_texturing");
        let driver = PipelineDriver::new(options, &full_registry(&log)).unwrap();

        let chain = driver.chain();
        assert!(!chain.is_rerun("odm_meshing"));
        assert!(chain.is_rerun("mvs_texturing"));
        assert!(chain.is_rerun("odm_report"));

        driver.execute().unwrap();
        assert_eq!(log.len(), 13);
    }

    #[test]
    fn test_progress_bands_follow_predecessor() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(CollectingProgressSink::new());
        let options = RunOptions::new(dir.path()).with_fast_orthophoto(true);

        PipelineDriver::new(options, &full_registry(&CallLog::new()))
            .unwrap()
            .with_progress_sink(sink.clone())
            .execute()
            .unwrap();

        let filterpoints: Vec<f64> = sink
            .updates()
            .into_iter()
            .filter(|(stage, _)| stage == "odm_filterpoints")
            .map(|(_, percent)| percent)
            .collect();
        assert_eq!(filterpoints, vec![38.5, 52.0]);

        let dataset: Vec<f64> = sink
            .updates()
            .into_iter()
            .filter(|(stage, _)| stage == "dataset")
            .map(|(_, percent)| percent)
            .collect();
        assert_eq!(dataset, vec![10.0, 15.0]);

        assert_eq!(sink.last(), Some(100.0));
    }

    #[test]
    fn test_missing_output_stops_the_chain() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let registry = full_registry(&log).with(StageId::Meshing, Arc::new(ProducingStage::new()));

        let err = PipelineDriver::new(RunOptions::new(dir.path()), &registry)
            .unwrap()
            .execute()
            .unwrap_err();

        match err {
            ChainError::MissingOutput { stage, key } => {
                assert_eq!(stage, "odm_meshing");
                assert_eq!(key, keys::MESH);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!log.calls().contains(&"mvs_texturing".to_string()));
    }

    #[test]
    fn test_construction_errors_run_nothing() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();

        let err = PipelineDriver::new(
            RunOptions::new(dir.path()).with_end_with("odm_nothing"),
            &full_registry(&log),
        )
        .unwrap_err();
        assert!(err.is_construction_error());

        let driver = PipelineDriver::new(RunOptions::new(dir.path().join("absent")), &full_registry(&log)).unwrap();
        assert!(matches!(driver.execute(), Err(ChainError::Environment { .. })));

        assert!(log.is_empty());
    }

    #[test]
    fn test_unreadable_tree_stops_the_run() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let entry = FnStage::new("multispectral", |ctx: &mut ExecutionContext, _run: &StageRun<'_>| {
            ctx.set(keys::TREE, "not-a-tree")?;
            Ok(())
        });
        let registry = full_registry(&log).with(StageId::Multispectral, Arc::new(entry));
        let options = RunOptions::new(dir.path()).with_benchmarking(true);

        let err = PipelineDriver::new(options, &registry)
            .unwrap()
            .execute()
            .unwrap_err();

        match err {
            ChainError::InvalidOutput { stage, key, .. } => {
                assert_eq!(stage, "multispectral");
                assert_eq!(key, keys::TREE);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(log.is_empty());
        assert_eq!(benchmark_lines(&dir).len(), 3);
    }
}
