//! Full runs against a real filesystem with stub compression backends

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use agentfm::catalog::Catalog;
use agentfm::compression::{
    BackendId, BackendSet, CompressionBackend, CompressionError, CompressionSelector, ZipBackend, reserve_sibling,
};
use agentfm::ops::{OpsContext, OpsExecutor};
use agentfm::oracle::{PlanDecision, ProposedCall, ScriptedOracle};
use agentfm::orchestrator::{Orchestrator, OrchestratorConfig, RunOutcome, StepStatus};
use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};

/// Writes `<tag>:<original>` as the compressed form
struct TaggingBackend {
    id: BackendId,
    tag: &'static str,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CompressionBackend for TaggingBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    async fn compress(&self, path: &Path) -> Result<PathBuf, CompressionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let original = fs::read_to_string(path).unwrap();
        let target = reserve_sibling(path).unwrap();
        fs::write(&target, format!("{}:{}", self.tag, original)).unwrap();
        Ok(target)
    }
}

struct AlwaysFails {
    id: BackendId,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CompressionBackend for AlwaysFails {
    fn id(&self) -> BackendId {
        self.id
    }

    async fn compress(&self, _path: &Path) -> Result<PathBuf, CompressionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CompressionError::Backend {
            backend: self.id,
            message: "service rejected the file".to_string(),
        })
    }
}

struct Fixture {
    _temp: TempDir,
    input: PathBuf,
    output: PathBuf,
}

fn fixture(files: &[(&str, &str)]) -> Fixture {
    let temp = tempdir().unwrap();
    let input = temp.path().join("input");
    let output = temp.path().join("output");
    fs::create_dir_all(&input).unwrap();
    fs::create_dir_all(&output).unwrap();
    for (name, content) in files {
        fs::write(input.join(name), content).unwrap();
    }
    Fixture {
        _temp: temp,
        input,
        output,
    }
}

fn selector() -> CompressionSelector {
    let mut rules = BTreeMap::new();
    rules.insert("JPG".to_string(), BackendId::SpecializedImage);
    rules.insert("PNG".to_string(), BackendId::SpecializedImage);
    rules.insert("PDF".to_string(), BackendId::SpecializedDocument);
    CompressionSelector::from_rules(&rules)
}

fn orchestrator(fx: &Fixture, backends: BackendSet, plan: Vec<PlanDecision>) -> Orchestrator {
    let ctx = OpsContext::new(
        fx.input.clone(),
        fx.output.clone(),
        &["PDF".to_string(), "PNG".to_string(), "JPG".to_string()],
        selector(),
        backends,
    );
    Orchestrator::new(
        Catalog::standard(),
        Arc::new(ScriptedOracle::new(plan)),
        OpsExecutor::new(ctx),
        OrchestratorConfig::default(),
    )
}

fn call(name: &str, arguments: Value) -> PlanDecision {
    PlanDecision::Propose(ProposedCall::new(name, arguments))
}

#[tokio::test]
async fn test_sorts_and_compresses_mixed_input() {
    let fx = fixture(&[("photo.jpg", "jpeg"), ("report.pdf", "pdf"), ("unknown.xyz", "data")]);
    let image_calls = Arc::new(AtomicUsize::new(0));
    let document_calls = Arc::new(AtomicUsize::new(0));
    let backends = BackendSet::new()
        .with_backend(Arc::new(TaggingBackend {
            id: BackendId::SpecializedImage,
            tag: "image",
            calls: image_calls.clone(),
        }))
        .with_backend(Arc::new(TaggingBackend {
            id: BackendId::SpecializedDocument,
            tag: "document",
            calls: document_calls.clone(),
        }))
        .with_backend(Arc::new(ZipBackend));

    let (input, output) = (&fx.input, &fx.output);
    let plan = vec![
        call("scan", json!({"input_dir": input})),
        call("classify", json!({"path": input.join("photo.jpg")})),
        call("classify", json!({"path": input.join("report.pdf")})),
        call("classify", json!({"path": input.join("unknown.xyz")})),
        call("create_folder", json!({"output_dir": output, "type_name": "JPG"})),
        call("create_folder", json!({"output_dir": output, "type_name": "PDF"})),
        call("create_folder", json!({"output_dir": output, "type_name": "Unknown"})),
        call("move", json!({"source": input.join("photo.jpg"), "destination_folder": output.join("JPG")})),
        call("move", json!({"source": input.join("report.pdf"), "destination_folder": output.join("PDF")})),
        call("move", json!({"source": input.join("unknown.xyz"), "destination_folder": output.join("Unknown")})),
        call("compress", json!({"path": output.join("JPG").join("photo.jpg"), "file_type": "JPG"})),
        call("compress", json!({"path": output.join("PDF").join("report.pdf"), "file_type": "PDF"})),
        PlanDecision::Done,
    ];

    let report = orchestrator(&fx, backends, plan).run("organize").await;

    assert_eq!(report.outcome, RunOutcome::Completed { processed_files: 3 });
    assert!(report.history.iter().all(|s| s.status == StepStatus::Succeeded));
    assert_eq!(report.history[0].result.as_ref().unwrap()["files"].as_array().unwrap().len(), 3);
    assert_eq!(report.history[3].result.as_ref().unwrap()["declared_type"], "Unknown");

    assert_eq!(fs::read_to_string(output.join("JPG/photo.jpg")).unwrap(), "image:jpeg");
    assert_eq!(fs::read_to_string(output.join("PDF/report.pdf")).unwrap(), "document:pdf");
    assert_eq!(fs::read_to_string(output.join("Unknown/unknown.xyz")).unwrap(), "data");
    assert_eq!(fs::read_dir(output.join("JPG")).unwrap().count(), 1);
    assert_eq!(fs::read_dir(input).unwrap().count(), 0);
    assert_eq!(image_calls.load(Ordering::SeqCst), 1);
    assert_eq!(document_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_move_conflict_is_recorded_and_source_kept() {
    let fx = fixture(&[("photo.jpg", "new")]);
    fs::create_dir_all(fx.output.join("JPG")).unwrap();
    fs::write(fx.output.join("JPG/photo.jpg"), "old").unwrap();

    let plan = vec![
        call(
            "move",
            json!({"source": fx.input.join("photo.jpg"), "destination_folder": fx.output.join("JPG")}),
        ),
        PlanDecision::Done,
    ];
    let report = orchestrator(&fx, BackendSet::new(), plan).run("organize").await;

    assert_eq!(report.outcome, RunOutcome::Completed { processed_files: 0 });
    assert_eq!(report.history[0].error.as_ref().unwrap().code, "move_conflict");
    assert_eq!(fs::read_to_string(fx.input.join("photo.jpg")).unwrap(), "new");
    assert_eq!(fs::read_to_string(fx.output.join("JPG/photo.jpg")).unwrap(), "old");
}

#[tokio::test]
async fn test_failed_compression_falls_back_to_archive() {
    let fx = fixture(&[]);
    fs::create_dir_all(fx.output.join("PDF")).unwrap();
    fs::write(fx.output.join("PDF/report.pdf"), "pdf").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let backends = BackendSet::new()
        .with_backend(Arc::new(AlwaysFails {
            id: BackendId::SpecializedDocument,
            calls: calls.clone(),
        }))
        .with_backend(Arc::new(ZipBackend));

    let plan = vec![
        call("compress", json!({"path": fx.output.join("PDF/report.pdf"), "file_type": "PDF"})),
        PlanDecision::Done,
    ];
    let report = orchestrator(&fx, backends, plan).run("organize").await;

    assert!(report.outcome.is_completed());
    let result = report.history[0].result.as_ref().unwrap();
    assert_eq!(result["backend"], "generic-archive");
    assert_eq!(result["used_fallback"], true);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(fx.output.join("PDF/report.pdf.zip").exists());
}

#[tokio::test]
async fn test_both_compressions_failing_keeps_original() {
    let fx = fixture(&[]);
    fs::create_dir_all(fx.output.join("JPG")).unwrap();
    fs::write(fx.output.join("JPG/photo.jpg"), "jpeg").unwrap();
    let primary = Arc::new(AtomicUsize::new(0));
    let fallback = Arc::new(AtomicUsize::new(0));
    let backends = BackendSet::new()
        .with_backend(Arc::new(AlwaysFails {
            id: BackendId::SpecializedImage,
            calls: primary.clone(),
        }))
        .with_backend(Arc::new(AlwaysFails {
            id: BackendId::GenericArchive,
            calls: fallback.clone(),
        }));

    let plan = vec![
        call("compress", json!({"path": fx.output.join("JPG/photo.jpg"), "file_type": "JPG"})),
        PlanDecision::Done,
    ];
    let report = orchestrator(&fx, backends, plan).run("organize").await;

    assert!(report.outcome.is_completed());
    assert_eq!(report.history[0].status, StepStatus::Failed);
    assert_eq!(report.history[0].error.as_ref().unwrap().code, "compression_failed");
    assert_eq!(primary.load(Ordering::SeqCst), 1);
    assert_eq!(fallback.load(Ordering::SeqCst), 1);
    assert_eq!(fs::read_to_string(fx.output.join("JPG/photo.jpg")).unwrap(), "jpeg");
}

#[tokio::test]
async fn test_reads_outside_input_root_are_refused() {
    let fx = fixture(&[]);
    let outside = fx.input.parent().unwrap().join("elsewhere.pdf");
    fs::write(&outside, "secret").unwrap();

    let plan = vec![
        call("move", json!({"source": outside, "destination_folder": fx.output})),
        PlanDecision::Done,
    ];
    let report = orchestrator(&fx, BackendSet::new(), plan).run("organize").await;

    assert_eq!(report.history[0].error.as_ref().unwrap().code, "outside_root");
    assert!(outside.exists());
}

#[tokio::test]
async fn test_compress_in_input_root_is_refused() {
    let fx = fixture(&[("notes.txt", "notes")]);
    let backends = BackendSet::new().with_backend(Arc::new(ZipBackend));

    let plan = vec![
        call("compress", json!({"path": fx.input.join("notes.txt"), "file_type": "Unknown"})),
        PlanDecision::Done,
    ];
    let report = orchestrator(&fx, backends, plan).run("organize").await;

    assert!(report.outcome.is_completed());
    assert_eq!(report.history[0].error.as_ref().unwrap().code, "outside_root");
    let names: Vec<_> = fs::read_dir(&fx.input).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(names, vec![std::ffi::OsString::from("notes.txt")]);
}
