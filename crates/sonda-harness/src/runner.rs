//! Case runner
//!
//! Drives the declared case set: consults the run clock at dispatch,
//! provisions the model, applies the resource gate against a fresh listing,
//! dispatches to the matching validator, and records one terminal outcome
//! per case. The whole run executes under the hard deadline; expiry cancels
//! in-flight work and the report is marked aborted. Already-recorded
//! outcomes survive cancellation.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use sonda_api::{EmbeddingsRequest, GenerateRequest, ModelService};

use crate::cases::{Acceptance, CaseKind, TestCase};
use crate::clock::RunClock;
use crate::config::HarnessConfig;
use crate::error::Error;
use crate::gatekeeper::{should_skip, skip_reason};
use crate::provision::ensure_model;
use crate::validators::{validate_embedding, validate_generate};

/// Characters of passing output kept in the record
const DETAIL_SNIPPET: usize = 120;

/// Terminal outcome of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    /// Acceptance criterion satisfied
    Passed,
    /// Provisioning or validation failed
    Failed,
    /// Not started: soft deadline had passed at dispatch
    SkippedTimeout,
    /// Not started: model too large for the capacity budget
    SkippedResource,
}

impl CaseStatus {
    /// Whether this is a passing outcome
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Whether this is a failing outcome
    #[must_use]
    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Whether the case was skipped rather than executed
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::SkippedTimeout | Self::SkippedResource)
    }
}

/// One case's recorded outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Model the case exercised
    pub model: String,
    /// Which validator the case dispatched to
    pub kind: CaseKind,
    /// Terminal status
    pub status: CaseStatus,
    /// Diagnostic detail: failure payload, skip reason, or output snippet
    pub detail: String,
    /// Wall time spent on the case in milliseconds
    pub duration_ms: u64,
    /// When the record was produced
    pub timestamp: DateTime<Utc>,
}

impl CaseRecord {
    fn new(case: &TestCase, status: CaseStatus, detail: String, duration: Duration) -> Self {
        Self {
            model: case.model.clone(),
            kind: case.kind(),
            status,
            detail,
            duration_ms: duration.as_millis() as u64,
            timestamp: Utc::now(),
        }
    }

    /// Record a pass
    #[must_use]
    pub fn passed(case: &TestCase, detail: impl Into<String>, duration: Duration) -> Self {
        Self::new(case, CaseStatus::Passed, detail.into(), duration)
    }

    /// Record a failure
    #[must_use]
    pub fn failed(case: &TestCase, error: &Error, duration: Duration) -> Self {
        Self::new(case, CaseStatus::Failed, error.to_string(), duration)
    }

    /// Record a soft-deadline skip
    #[must_use]
    pub fn skipped_timeout(case: &TestCase, elapsed: Duration) -> Self {
        Self::new(
            case,
            CaseStatus::SkippedTimeout,
            format!("soft deadline passed after {}s", elapsed.as_secs()),
            Duration::ZERO,
        )
    }

    /// Record a resource skip
    #[must_use]
    pub fn skipped_resource(case: &TestCase, reason: impl Into<String>) -> Self {
        Self::new(case, CaseStatus::SkippedResource, reason.into(), Duration::ZERO)
    }
}

/// Accumulates records as cases finish
#[derive(Debug, Default)]
pub struct CaseLedger {
    records: Vec<CaseRecord>,
}

impl CaseLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn add(&mut self, record: CaseRecord) {
        self.records.push(record);
    }

    /// All records so far
    #[must_use]
    pub fn all(&self) -> &[CaseRecord] {
        &self.records
    }
}

/// The finished (or aborted) run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Records for every case that reached a terminal state
    pub records: Vec<CaseRecord>,
    /// Whether the hard deadline cancelled the run
    pub aborted: bool,
    /// Total run wall time in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    /// Passed-case count
    #[must_use]
    pub fn passed(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_pass()).count()
    }

    /// Failed-case count
    #[must_use]
    pub fn failed(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_fail()).count()
    }

    /// Skipped-case count (both skip reasons)
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_skip()).count()
    }

    /// Count of records with `status`
    #[must_use]
    pub fn count(&self, status: CaseStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// Failed records, for diagnostics
    #[must_use]
    pub fn failures(&self) -> Vec<&CaseRecord> {
        self.records
            .iter()
            .filter(|r| r.status.is_fail())
            .collect()
    }

    /// A run succeeds when it completed and nothing failed; skips are not
    /// failures and are never conflated with passes
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.aborted && self.failed() == 0
    }

    /// Process exit code conveying aggregate success
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    /// Export all records as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Executes the declared case set against one service session
pub struct CaseRunner<'s> {
    service: &'s dyn ModelService,
    clock: RunClock,
    capacity_budget: Option<u64>,
    generate_timeout: Duration,
    idle_timeout: Duration,
    ledger: Mutex<CaseLedger>,
}

impl<'s> CaseRunner<'s> {
    /// Create a runner over `service` with the run's clock and configuration
    #[must_use]
    pub fn new(service: &'s dyn ModelService, clock: RunClock, config: &HarnessConfig) -> Self {
        Self {
            service,
            clock,
            capacity_budget: config.effective_budget(),
            generate_timeout: config.generate_timeout,
            idle_timeout: config.idle_timeout,
            ledger: Mutex::new(CaseLedger::new()),
        }
    }

    /// Run every declared case under the hard deadline
    ///
    /// The soft deadline is consulted only at case dispatch and never cancels
    /// in-flight work; the hard deadline cancels everything outstanding.
    pub async fn run(&self, cases: &[TestCase]) -> RunReport {
        let started = Instant::now();
        if self.capacity_budget.is_none() {
            warn!("no capacity budget configured, exercising all models; large ones may time out");
        }

        let aborted = tokio::time::timeout(self.clock.hard_remaining(), self.run_all(cases))
            .await
            .is_err();
        if aborted {
            warn!(
                elapsed_s = self.clock.elapsed().as_secs(),
                "hard deadline reached, run aborted"
            );
        }

        let records = self.ledger.lock().expect("ledger lock").all().to_vec();
        RunReport {
            records,
            aborted,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    async fn run_all(&self, cases: &[TestCase]) {
        for case in cases {
            let record = self.run_case(case).await;
            info!(
                model = %record.model,
                kind = %case.kind(),
                status = ?record.status,
                duration_ms = record.duration_ms,
                "case finished"
            );
            self.ledger.lock().expect("ledger lock").add(record);
        }
    }

    /// Pending → {SkippedTimeout, SkippedResource, Provisioning, Running}
    /// → {Passed, Failed}; every outcome is terminal and produced exactly once.
    async fn run_case(&self, case: &TestCase) -> CaseRecord {
        if self.clock.soft_expired() {
            return CaseRecord::skipped_timeout(case, self.clock.elapsed());
        }

        let started = Instant::now();

        // Provisioning
        if let Err(error) = ensure_model(self.service, &case.model).await {
            return CaseRecord::failed(case, &error, started.elapsed());
        }

        // Resource gate, against a fresh listing: the store may have changed
        // since the previous case.
        if let Some(budget) = self.capacity_budget {
            match self.service.list_models().await {
                Err(source) => {
                    return CaseRecord::failed(case, &Error::Api(source), started.elapsed());
                }
                Ok(list) => {
                    if let Some(descriptor) = list.find(&case.model) {
                        if should_skip(descriptor.size, Some(budget)) {
                            return CaseRecord::skipped_resource(
                                case,
                                skip_reason(&case.model, descriptor.size, budget),
                            );
                        }
                    }
                }
            }
        }

        // Running
        match &case.acceptance {
            Acceptance::AnyTerm(terms) => {
                let request = GenerateRequest::streaming(
                    case.model.clone(),
                    case.prompt.clone(),
                    case.options.clone(),
                );
                match validate_generate(
                    self.service,
                    request,
                    terms,
                    self.generate_timeout,
                    self.idle_timeout,
                )
                .await
                {
                    Ok(output) => CaseRecord::passed(case, snippet(&output), started.elapsed()),
                    Err(error) => CaseRecord::failed(case, &error, started.elapsed()),
                }
            }
            Acceptance::Reference(reference) => {
                let request = EmbeddingsRequest {
                    model: case.model.clone(),
                    prompt: case.prompt.clone(),
                    options: Some(case.options.clone()),
                };
                match validate_embedding(self.service, request, reference).await {
                    Ok(similarity) => CaseRecord::passed(
                        case,
                        format!("similarity {similarity:.6}"),
                        started.elapsed(),
                    ),
                    Err(error) => CaseRecord::failed(case, &error, started.elapsed()),
                }
            }
        }
    }
}

fn snippet(output: &str) -> String {
    output.chars().take(DETAIL_SNIPPET).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Timeouts;
    use crate::fixture::ReferenceVectors;
    use sonda_api::{MockModelService, ScriptedGeneration};

    const GIB: u64 = 1 << 30;

    fn fresh_clock() -> RunClock {
        RunClock::start(Timeouts::default())
    }

    fn expired_soft_clock() -> RunClock {
        let timeouts = Timeouts::resolve(
            Some(Duration::from_millis(1)),
            Some(Duration::from_secs(3600)),
        )
        .expect("valid");
        RunClock::with_start(Instant::now() - Duration::from_secs(1), timeouts)
    }

    fn scattering_mock() -> MockModelService {
        MockModelService::new()
            .with_model("gemma3:1b", GIB)
            .with_script(ScriptedGeneration::completing([
                "Rayleigh ",
                "scattering explains it.",
            ]))
    }

    #[tokio::test]
    async fn test_run_all_passing() {
        let mock = scattering_mock().with_embedding("all-minilm", vec![0.1, 0.2, 0.3]);
        let cases = vec![
            TestCase::generation("gemma3:1b"),
            TestCase::embedding("all-minilm", vec![0.1, 0.2, 0.3]),
        ];
        let runner = CaseRunner::new(&mock, fresh_clock(), &HarnessConfig::default());
        let report = runner.run(&cases).await;

        assert!(!report.aborted);
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 0);
        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_soft_deadline_skips_every_case_without_provisioning() {
        let mock = scattering_mock();
        let cases = vec![
            TestCase::generation("gemma3:1b"),
            TestCase::generation("llama3.2:1b"),
        ];
        let runner = CaseRunner::new(&mock, expired_soft_clock(), &HarnessConfig::default());
        let report = runner.run(&cases).await;

        assert_eq!(report.count(CaseStatus::SkippedTimeout), 2);
        assert_eq!(report.skipped(), 2);
        assert!(report.is_success());
        // No case was dispatched, so nothing was provisioned or listed
        assert!(mock.pull_log().is_empty());
        assert_eq!(mock.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_resource_skip_without_pull() {
        // Model already present at 10 GiB against an 8 GiB budget
        let mock = MockModelService::new().with_model("gemma3:1b", 10 * GIB);
        let config = HarnessConfig {
            capacity_budget: Some(8 * GIB),
            ..Default::default()
        };
        let runner = CaseRunner::new(&mock, fresh_clock(), &config);
        let report = runner.run(&[TestCase::generation("gemma3:1b")]).await;

        assert_eq!(report.count(CaseStatus::SkippedResource), 1);
        let record = &report.records[0];
        assert!(record.detail.contains("too large"));
        assert!(record.detail.contains("8 GiB"));
        // Already present, so provisioning pulled nothing
        assert_eq!(mock.pull_count("gemma3:1b"), 0);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_fitting_model_runs_under_budget() {
        let mock = scattering_mock(); // 1 GiB model
        let config = HarnessConfig {
            capacity_budget: Some(8 * GIB),
            ..Default::default()
        };
        let runner = CaseRunner::new(&mock, fresh_clock(), &config);
        let report = runner.run(&[TestCase::generation("gemma3:1b")]).await;
        assert_eq!(report.passed(), 1);
    }

    #[tokio::test]
    async fn test_provision_failure_fails_case_and_run_continues() {
        let mock = MockModelService::new()
            .with_pull_error("manifest unknown")
            .with_model("gemma3:1b", GIB)
            .with_script(ScriptedGeneration::completing(["scattering"]));
        let cases = vec![
            TestCase::generation("missing-model"),
            TestCase::generation("gemma3:1b"),
        ];
        let runner = CaseRunner::new(&mock, fresh_clock(), &HarnessConfig::default());
        let report = runner.run(&cases).await;

        assert_eq!(report.failed(), 1);
        assert_eq!(report.passed(), 1);
        assert!(report.failures()[0].detail.contains("manifest unknown"));
        assert!(!report.is_success());
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_detail_carries_output() {
        let mock = MockModelService::new()
            .with_model("gemma3:1b", GIB)
            .with_script(ScriptedGeneration::completing([
                "Because it reflects the ocean.",
            ]));
        let runner = CaseRunner::new(&mock, fresh_clock(), &HarnessConfig::default());
        let report = runner.run(&[TestCase::generation("gemma3:1b")]).await;

        assert_eq!(report.failed(), 1);
        assert!(report.records[0].detail.contains("reflects the ocean"));
    }

    #[tokio::test]
    async fn test_descriptor_fetched_fresh_per_case() {
        let mock = scattering_mock().with_model("llama3.2:1b", GIB);
        let config = HarnessConfig {
            capacity_budget: Some(8 * GIB),
            ..Default::default()
        };
        let runner = CaseRunner::new(&mock, fresh_clock(), &config);
        let cases = vec![
            TestCase::generation("gemma3:1b"),
            TestCase::generation("llama3.2:1b"),
        ];
        runner.run(&cases).await;
        // One listing inside provisioning plus one fresh gate listing, per case
        assert_eq!(mock.list_calls(), 4);
    }

    #[tokio::test]
    async fn test_hard_deadline_aborts_run() {
        let mock = MockModelService::new().with_model("gemma3:1b", GIB).with_script(
            ScriptedGeneration::completing(["slow"])
                .with_fragment_delay(Duration::from_millis(500)),
        );
        let timeouts = Timeouts::resolve(
            Some(Duration::from_millis(80)),
            Some(Duration::from_millis(80)),
        )
        .expect("valid");
        let runner = CaseRunner::new(&mock, RunClock::start(timeouts), &HarnessConfig::default());
        let report = runner.run(&[TestCase::generation("gemma3:1b")]).await;

        assert!(report.aborted);
        assert!(!report.is_success());
        assert_eq!(report.exit_code(), 1);
        // The in-flight case never reached a terminal state
        assert!(report.records.is_empty());
    }

    #[tokio::test]
    async fn test_report_json_roundtrip_fields() {
        let mock = scattering_mock();
        let runner = CaseRunner::new(&mock, fresh_clock(), &HarnessConfig::default());
        let report = runner.run(&[TestCase::generation("gemma3:1b")]).await;
        let json = report.to_json().expect("serializes");
        assert!(json.contains("\"Passed\""));
        assert!(json.contains("gemma3:1b"));
    }

    #[test]
    fn test_status_predicates() {
        assert!(CaseStatus::Passed.is_pass());
        assert!(CaseStatus::Failed.is_fail());
        assert!(CaseStatus::SkippedTimeout.is_skip());
        assert!(CaseStatus::SkippedResource.is_skip());
        assert!(!CaseStatus::SkippedResource.is_fail());
        assert!(!CaseStatus::SkippedTimeout.is_pass());
    }

    #[test]
    fn test_ledger_accumulates() {
        let case = TestCase::generation("m");
        let mut ledger = CaseLedger::new();
        ledger.add(CaseRecord::passed(&case, "ok", Duration::from_millis(5)));
        ledger.add(CaseRecord::skipped_timeout(&case, Duration::from_secs(700)));
        assert_eq!(ledger.all().len(), 2);
        assert_eq!(ledger.all()[1].status, CaseStatus::SkippedTimeout);
    }
}
