//! Library-level runs of the orchestrator against a scripted AI endpoint

use repoqa::ai::{ClientSettings, CredentialPool, HttpResponse, ResilientClient, Transport};
use repoqa::analyzer::StaticAnalyzer;
use repoqa::orchestrator::{Flavor, FlavorSummary, Orchestrator, OrchestratorSettings};
use repoqa::scoring::Status;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Answers every completion by looking at which file the prompt is about
struct ScriptedEndpoint {
    calls: Arc<AtomicUsize>,
    keys_seen: Arc<Mutex<Vec<String>>>,
    answer: fn(&str) -> Result<HttpResponse, String>,
}

impl Transport for ScriptedEndpoint {
    fn post_json(&self, _url: &str, bearer: &str, body: &Value) -> Result<HttpResponse, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys_seen.lock().unwrap().push(bearer.to_string());
        let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
        (self.answer)(prompt)
    }
}

fn reply(content: Value) -> Result<HttpResponse, String> {
    Ok(HttpResponse {
        status: 200,
        body: json!({"choices": [{"message": {"content": content.to_string()}}]}).to_string(),
    })
}

struct Harness {
    orchestrator: Orchestrator,
    calls: Arc<AtomicUsize>,
    keys_seen: Arc<Mutex<Vec<String>>>,
}

fn harness(keys: &str, answer: fn(&str) -> Result<HttpResponse, String>) -> Harness {
    let calls = Arc::new(AtomicUsize::new(0));
    let keys_seen = Arc::new(Mutex::new(Vec::new()));
    let client = ResilientClient::with_transport(
        CredentialPool::from_values([keys]),
        ClientSettings::default(),
        ScriptedEndpoint {
            calls: Arc::clone(&calls),
            keys_seen: Arc::clone(&keys_seen),
            answer,
        },
    );
    let settings = OrchestratorSettings {
        workers: 2,
        ..OrchestratorSettings::default()
    };
    let orchestrator = Orchestrator::new(Arc::new(client), StaticAnalyzer::new(), settings).unwrap();
    Harness {
        orchestrator,
        calls,
        keys_seen,
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn test_defect_run_ranks_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Billing.java", "class Billing { void run() {} }\n");
    write(dir.path(), "src/Cart.java", "class Cart {}\n");
    write(dir.path(), "README.md", "# not code\n");

    let h = harness("gsk_one", |prompt| {
        if prompt.contains("File: src/Billing.java") {
            reply(json!({"defectScore": 82, "crashProbability": 40, "severity": "critical", "riskReasons": ["shared mutable state"]}))
        } else {
            reply(json!({"defectScore": 20, "crashProbability": 5}))
        }
    });
    let report = h.orchestrator.run(dir.path(), Flavor::DefectPrediction);

    assert_eq!(report.status, Status::Completed);
    assert_eq!(report.total_files_analyzed, 2);
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);

    let Some(FlavorSummary::Defect(summary)) = &report.summary else {
        panic!("expected defect summary, got {:?}", report.summary);
    };
    assert_eq!(summary.predictions[0].file, "src/Billing.java");
    assert_eq!(summary.high_risk_files, 1);
    assert_eq!(summary.average_defect_score, 51);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["flavor"], "defect-prediction");
    assert_eq!(json["predictions"][0]["severity"], "HIGH");
    assert_eq!(json["predictions"][1]["severity"], "LOW");
}

#[test]
fn test_rate_limited_key_hands_over_to_next() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app/orders.py", "def total(items):\n    return sum(items)\n");

    // The first key is always limited; the second answers
    fn answer(_: &str) -> Result<HttpResponse, String> {
        reply(json!({"findings": [{"type": "logic", "severity": "MEDIUM", "line": 2, "evidence": "sum", "reasoning": "None items"}]}))
    }
    let calls = Arc::new(AtomicUsize::new(0));
    let keys_seen = Arc::new(Mutex::new(Vec::new()));
    struct LimitedFirst {
        inner: ScriptedEndpoint,
    }
    impl Transport for LimitedFirst {
        fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<HttpResponse, String> {
            if bearer == "gsk_limited" {
                self.inner.keys_seen.lock().unwrap().push(bearer.to_string());
                return Ok(HttpResponse {
                    status: 429,
                    body: json!({"error": {"message": "Rate limit reached"}}).to_string(),
                });
            }
            self.inner.post_json(url, bearer, body)
        }
    }
    let client = ResilientClient::with_transport(
        CredentialPool::from_values(["gsk_limited, gsk_fresh"]),
        ClientSettings::default(),
        LimitedFirst {
            inner: ScriptedEndpoint {
                calls: Arc::clone(&calls),
                keys_seen: Arc::clone(&keys_seen),
                answer,
            },
        },
    );
    let orchestrator =
        Orchestrator::new(Arc::new(client), StaticAnalyzer::new(), OrchestratorSettings::default())
            .unwrap();

    let report = orchestrator.run(dir.path(), Flavor::Insight);

    assert_eq!(report.status, Status::Completed);
    assert_eq!(*keys_seen.lock().unwrap(), vec!["gsk_limited", "gsk_fresh"]);
    let Some(FlavorSummary::Insight(summary)) = &report.summary else {
        panic!("expected insight summary");
    };
    assert_eq!(summary.total_insights, 1);
    assert_eq!(summary.insights[0].findings[0].line, Some(2));
}

#[test]
fn test_malformed_reply_is_kept_as_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib/pool.js", "function open() { return conn(); }\n");

    let h = harness("gsk_one", |_| reply(json!("not an object at all")));
    let report = h.orchestrator.run(dir.path(), Flavor::MemoryLeak);

    assert_eq!(report.status, Status::Completed);
    assert!(report.errors.is_empty());
    assert!(report.diagnostics.iter().any(|d| d.contains("lib/pool.js")));
    let Some(FlavorSummary::Leaks(summary)) = &report.summary else {
        panic!("expected leak summary");
    };
    assert_eq!(summary.total_leaks, 0);
}

#[test]
fn test_refactor_run_merges_architecture_advice() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "svc/a.ts", "export function a() { return 1; }\n");
    write(dir.path(), "svc/b.ts", "export function b() { return 2; }\n");

    let h = harness("gsk_one", |prompt| {
        let smell = if prompt.contains("File: svc/a.ts") { "duplicate a" } else { "duplicate b" };
        reply(json!({
            "architecture": ["Introduce a service layer"],
            "functions": [],
            "codeSmells": [smell],
            "packageRestructure": []
        }))
    });
    let report = h.orchestrator.run(dir.path(), Flavor::Refactor);

    let Some(FlavorSummary::Refactor(summary)) = &report.summary else {
        panic!("expected refactor summary");
    };
    assert_eq!(summary.architecture_recommendations, vec!["Introduce a service layer"]);
    assert_eq!(summary.file_recommendations.len(), 2);
    assert_eq!(h.keys_seen.lock().unwrap().len(), 2);
}
