//! Stage plans and the runner that drives them.
//!
//! A run is a fixed, ordered list of [`Stage`]s. Each stage yields a typed
//! result and the runner decides what happens next: setup stages never stop
//! anything, a failure in the pipeline or vector group skips the rest of that
//! group, and the LLM probe stands alone.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use kgprobe_core::{Config, ConfigurationError, Settings};
use kgprobe_pipeline::{
    BackendRegistry, CollectionSpec, IngestError, Pipeline, PipelineError, QueryError,
    RegistrationError, RegistrationOutcome, SetupError, TransformError, VectorStore,
    chat_completions_url, register_backends,
};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::raw_probe::{TransportError, probe_raw_endpoint};

/// Env var overriding the configured stage plan.
pub const PLAN_VAR: &str = "KGPROBE_PLAN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    ShowConfig,
    RegisterBackends,
    LlmProbe,
    VectorHttp,
    VectorCollections,
    VectorTestCollection,
    Prune,
    Ingest,
    Transform,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StageGroup {
    Setup,
    Llm,
    Vector,
    Pipeline,
}

impl StageGroup {
    /// Whether a failure skips the group's remaining stages.
    pub fn is_dependent(self) -> bool {
        matches!(self, Self::Vector | Self::Pipeline)
    }
}

impl Stage {
    /// Every stage, in the order the `full` plan runs them.
    pub const ALL: [Stage; 10] = [
        Stage::ShowConfig,
        Stage::RegisterBackends,
        Stage::LlmProbe,
        Stage::VectorHttp,
        Stage::VectorCollections,
        Stage::VectorTestCollection,
        Stage::Prune,
        Stage::Ingest,
        Stage::Transform,
        Stage::Query,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ShowConfig => "show-config",
            Self::RegisterBackends => "register-backends",
            Self::LlmProbe => "llm-probe",
            Self::VectorHttp => "vector-http",
            Self::VectorCollections => "vector-collections",
            Self::VectorTestCollection => "vector-test-collection",
            Self::Prune => "prune",
            Self::Ingest => "ingest",
            Self::Transform => "transform",
            Self::Query => "query",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ShowConfig => "Configuration",
            Self::RegisterBackends => "Register storage backends",
            Self::LlmProbe => "LLM chat completion",
            Self::VectorHttp => "Vector store HTTP",
            Self::VectorCollections => "Vector store collections",
            Self::VectorTestCollection => "Vector store test collection",
            Self::Prune => "Prune previous data",
            Self::Ingest => "Ingest sample documents",
            Self::Transform => "Build knowledge graph",
            Self::Query => "Search",
        }
    }

    pub fn group(self) -> StageGroup {
        match self {
            Self::ShowConfig | Self::RegisterBackends => StageGroup::Setup,
            Self::LlmProbe => StageGroup::Llm,
            Self::VectorHttp | Self::VectorCollections | Self::VectorTestCollection => {
                StageGroup::Vector
            }
            Self::Prune | Self::Ingest | Self::Transform | Self::Query => StageGroup::Pipeline,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PlanError::UnknownStage(wanted.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("unknown plan '{0}' (expected connection, llm, vector or full)")]
    UnknownPlan(String),
    #[error("unknown stage '{0}'")]
    UnknownStage(String),
    #[error("stage list is empty")]
    Empty,
}

/// Ordered stages to run under a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    name: String,
    stages: Vec<Stage>,
}

impl StagePlan {
    pub fn named(name: &str) -> Result<Self, PlanError> {
        use Stage::*;
        let stages = match name.trim().to_ascii_lowercase().as_str() {
            "connection" => vec![ShowConfig, RegisterBackends, Ingest, Transform, Query],
            "llm" => vec![
                ShowConfig,
                LlmProbe,
                RegisterBackends,
                Prune,
                Ingest,
                Transform,
                Query,
            ],
            "vector" => vec![
                ShowConfig,
                RegisterBackends,
                VectorHttp,
                VectorCollections,
                VectorTestCollection,
            ],
            "full" => Stage::ALL.to_vec(),
            _ => return Err(PlanError::UnknownPlan(name.to_string())),
        };
        Ok(Self {
            name: name.trim().to_ascii_lowercase(),
            stages,
        })
    }

    /// A `custom` plan from explicit stage names, kept in the given order.
    pub fn from_stages<S: AsRef<str>>(names: &[S]) -> Result<Self, PlanError> {
        if names.is_empty() {
            return Err(PlanError::Empty);
        }
        let stages = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<Stage>, _>>()?;
        Ok(Self {
            name: "custom".to_string(),
            stages,
        })
    }

    /// Plan for this run: `KGPROBE_PLAN` if set, then the settings' explicit
    /// stage list, then the settings' named plan.
    pub fn from_settings(settings: &Settings) -> Result<Self, PlanError> {
        let override_plan = std::env::var(PLAN_VAR).ok();
        Self::resolve(settings, override_plan.as_deref())
    }

    pub fn resolve(settings: &Settings, override_plan: Option<&str>) -> Result<Self, PlanError> {
        if let Some(plan) = override_plan.filter(|p| !p.trim().is_empty()) {
            return Self::named(plan);
        }
        if let Some(stages) = &settings.stages {
            return Self::from_stages(stages.as_slice());
        }
        Self::named(&settings.plan)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

/// Why a stage failed.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("failed to build pipeline client: {0}")]
    Client(#[source] reqwest::Error),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("prune failed: {0}")]
    Prune(#[source] PipelineError),
    #[error("vector store call failed: {0}")]
    Vector(#[source] PipelineError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<SetupError> for StageError {
    fn from(err: SetupError) -> Self {
        match err {
            SetupError::Configuration(err) => Self::Configuration(err),
            SetupError::Registration(err) => Self::Registration(err),
            SetupError::Client(err) => Self::Client(err),
        }
    }
}

/// Display text of `err` followed by any source not already part of it.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[derive(Debug)]
pub enum StageStatus {
    Passed { detail: Vec<String> },
    Failed(StageError),
    Skipped { reason: String },
}

#[derive(Debug)]
pub struct StageOutcome {
    pub stage: Stage,
    pub label: String,
    pub status: StageStatus,
    pub elapsed: Duration,
}

impl StageOutcome {
    pub fn passed(&self) -> bool {
        matches!(self.status, StageStatus::Passed { .. })
    }

    pub fn failed(&self) -> bool {
        matches!(self.status, StageStatus::Failed(_))
    }

    pub fn skipped(&self) -> bool {
        matches!(self.status, StageStatus::Skipped { .. })
    }
}

#[derive(Debug)]
pub struct ProbeReport {
    pub plan: String,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<StageOutcome>,
}

impl ProbeReport {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(StageOutcome::failed)
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|o| o.stage == stage)
    }

    /// Counts of passed, failed and skipped stages.
    pub fn tally(&self) -> (usize, usize, usize) {
        let passed = self.outcomes.iter().filter(|o| o.passed()).count();
        let failed = self.outcomes.iter().filter(|o| o.failed()).count();
        let skipped = self.outcomes.iter().filter(|o| o.skipped()).count();
        (passed, failed, skipped)
    }
}

/// Runs stage plans against one configuration and backend registry.
pub struct Harness {
    config: Config,
    registry: BackendRegistry,
    pipeline: Option<Arc<Pipeline>>,
}

impl Harness {
    pub fn new(config: Config, registry: BackendRegistry) -> Self {
        Self {
            config,
            registry,
            pipeline: None,
        }
    }

    /// Use `pipeline` for the pipeline stages instead of building one from
    /// the configuration.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(Arc::new(pipeline));
        self
    }

    pub async fn run(&mut self, plan: &StagePlan) -> ProbeReport {
        let started_at = Utc::now();
        info!(
            "Running plan '{}': {}",
            plan.name(),
            plan.stages()
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut aborted: BTreeMap<StageGroup, Stage> = BTreeMap::new();
        let mut outcomes = Vec::with_capacity(plan.stages().len());

        for &stage in plan.stages() {
            if let Some(failed) = aborted.get(&stage.group()) {
                let reason = format!("{failed} failed");
                warn!("Skipping {}: {}", stage, reason);
                outcomes.push(StageOutcome {
                    stage,
                    label: stage.label().to_string(),
                    status: StageStatus::Skipped { reason },
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            info!("Stage {} started", stage);
            let started = Instant::now();
            let result = self.run_stage(stage).await;
            let elapsed = started.elapsed();

            let status = match result {
                Ok(detail) => {
                    info!("Stage {} passed in {} ms", stage, elapsed.as_millis());
                    StageStatus::Passed { detail }
                }
                Err(err) => {
                    error!("Stage {} failed: {}", stage, error_chain(&err));
                    if stage.group().is_dependent() {
                        aborted.insert(stage.group(), stage);
                    }
                    StageStatus::Failed(err)
                }
            };
            outcomes.push(StageOutcome {
                stage,
                label: stage.label().to_string(),
                status,
                elapsed,
            });
        }

        ProbeReport {
            plan: plan.name().to_string(),
            started_at,
            outcomes,
        }
    }

    async fn run_stage(&mut self, stage: Stage) -> Result<Vec<String>, StageError> {
        match stage {
            Stage::ShowConfig => Ok(self.show_config()),
            Stage::RegisterBackends => self.register_backends(),
            Stage::LlmProbe => self.llm_probe().await,
            Stage::VectorHttp => self.vector_http().await,
            Stage::VectorCollections => self.vector_collections().await,
            Stage::VectorTestCollection => self.vector_test_collection().await,
            Stage::Prune => self.prune().await,
            Stage::Ingest => self.ingest().await,
            Stage::Transform => self.transform().await,
            Stage::Query => self.query().await,
        }
    }

    fn show_config(&self) -> Vec<String> {
        self.config
            .connection
            .entries()
            .iter()
            .map(|entry| format!("{}: {}", entry.key, entry.display_value()))
            .collect()
    }

    fn register_backends(&mut self) -> Result<Vec<String>, StageError> {
        let reports = register_backends(&self.config, &mut self.registry);
        let mut detail = Vec::with_capacity(reports.len());
        let mut first_error = None;
        for report in reports {
            let line = match report.result {
                Ok(RegistrationOutcome::Registered) => "registered".to_string(),
                Ok(RegistrationOutcome::AlreadyRegistered) => "already registered".to_string(),
                Ok(RegistrationOutcome::NotConfigured(key)) => {
                    format!("not configured ({key} not set)")
                }
                Ok(RegistrationOutcome::NotSelected(provider)) => {
                    format!("skipped ({provider} selected)")
                }
                Err(err) => {
                    let line = format!("failed: {err}");
                    first_error.get_or_insert(err);
                    line
                }
            };
            detail.push(format!("{} {}: {}", report.kind, report.name, line));
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(detail),
        }
    }

    async fn llm_probe(&self) -> Result<Vec<String>, StageError> {
        let connection = &self.config.connection;
        let probe = &self.config.settings.probe;
        let endpoint = connection.llm_endpoint_url()?;
        let model = connection.require_llm_model()?;
        let url = chat_completions_url(endpoint.as_str());

        let payload = json!({
            "model": model,
            "messages": [{"role": "user", "content": probe.llm_probe_prompt}],
            "max_tokens": probe.llm_probe_max_tokens,
        });
        let auth = connection
            .llm_api_key
            .as_deref()
            .map(|key| format!("Bearer {key}"));
        let mut headers = Vec::new();
        if let Some(auth) = &auth {
            headers.push(("Authorization", auth.as_str()));
        }

        let response =
            probe_raw_endpoint(&url, Some(&payload), &headers, self.config.probe_timeout())
                .await?
                .error_for_status()?;

        let mut detail = vec![format!(
            "POST {} -> {} in {} ms",
            url,
            response.status,
            response.elapsed.as_millis()
        )];
        let reply = response.json().and_then(|body| {
            body.pointer("/choices/0/message/content")
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        match reply {
            Some(reply) => detail.push(format!("reply: {}", reply.trim())),
            None => detail.push(format!(
                "body: {}",
                response.body_preview(probe.body_preview_chars)
            )),
        }
        Ok(detail)
    }

    async fn vector_http(&self) -> Result<Vec<String>, StageError> {
        let connection = &self.config.connection;
        let base = connection.vector_endpoint()?;
        let url = format!("{}/collections", base.as_str().trim_end_matches('/'));
        let mut headers = Vec::new();
        if let Some(key) = connection.vector_db_key.as_deref() {
            headers.push(("api-key", key));
        }

        let response = probe_raw_endpoint(&url, None, &headers, self.config.probe_timeout())
            .await?
            .error_for_status()?;

        let mut detail = vec![format!(
            "GET {} -> {} in {} ms",
            url,
            response.status,
            response.elapsed.as_millis()
        )];
        let names: Option<Vec<String>> = response.json().and_then(|body| {
            body.pointer("/result/collections")
                .and_then(Value::as_array)
                .map(|collections| {
                    collections
                        .iter()
                        .filter_map(|c| c.get("name").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
        });
        match names {
            Some(names) => detail.push(format!("collections: {}", names.join(", "))),
            None => detail.push(format!(
                "body: {}",
                response.body_preview(self.config.settings.probe.body_preview_chars)
            )),
        }
        Ok(detail)
    }

    fn vector_adapter(&self) -> Result<Arc<dyn VectorStore>, StageError> {
        Ok(self
            .registry
            .vector(self.config.connection.vector_provider())?)
    }

    async fn vector_collections(&self) -> Result<Vec<String>, StageError> {
        let store = self.vector_adapter()?;
        let names = store.list_collections().await.map_err(StageError::Vector)?;
        let mut detail = vec![format!(
            "{} lists {} collections",
            store.provider(),
            names.len()
        )];
        detail.extend(names.into_iter().map(|name| format!("- {name}")));
        Ok(detail)
    }

    async fn vector_test_collection(&self) -> Result<Vec<String>, StageError> {
        let store = self.vector_adapter()?;
        let settings = &self.config.settings.vector;
        let name = settings.test_collection.as_str();

        if store
            .collection_exists(name)
            .await
            .map_err(StageError::Vector)?
        {
            return Ok(vec![format!("{name} already exists")]);
        }
        let spec = CollectionSpec::cosine(settings.vector_name.clone(), settings.vector_size);
        store
            .create_collection(name, &spec)
            .await
            .map_err(StageError::Vector)?;
        Ok(vec![format!(
            "created {} (vector '{}', size {}, cosine)",
            name, spec.vector_name, spec.size
        )])
    }

    fn pipeline(&mut self) -> Result<Arc<Pipeline>, StageError> {
        if let Some(pipeline) = &self.pipeline {
            return Ok(pipeline.clone());
        }
        let pipeline = Arc::new(Pipeline::from_config(&self.config, &self.registry)?);
        self.pipeline = Some(pipeline.clone());
        Ok(pipeline)
    }

    async fn prune(&mut self) -> Result<Vec<String>, StageError> {
        let pipeline = self.pipeline()?;
        let summary = pipeline.prune().await.map_err(StageError::Prune)?;
        Ok(vec![format!(
            "removed {} datasets and {} collections",
            summary.datasets, summary.collections
        )])
    }

    async fn ingest(&mut self) -> Result<Vec<String>, StageError> {
        let pipeline = self.pipeline()?;
        let probe = &self.config.settings.probe;
        if probe.documents.is_empty() {
            return Ok(vec!["no sample documents configured".to_string()]);
        }

        let mut detail = Vec::with_capacity(probe.documents.len());
        for document in &probe.documents {
            let receipt = pipeline.add(document, &probe.dataset).await?;
            detail.push(format!(
                "document {} -> '{}' ({} chunks)",
                receipt.document_id, receipt.dataset, receipt.chunks
            ));
        }
        Ok(detail)
    }

    async fn transform(&mut self) -> Result<Vec<String>, StageError> {
        let pipeline = self.pipeline()?;
        let dataset = &self.config.settings.probe.dataset;
        let summary = pipeline.cognify(dataset).await?;
        Ok(vec![format!(
            "'{}': {} documents, {} nodes, {} edges",
            dataset, summary.documents, summary.nodes, summary.edges
        )])
    }

    async fn query(&mut self) -> Result<Vec<String>, StageError> {
        let pipeline = self.pipeline()?;
        let probe = &self.config.settings.probe;
        let results = pipeline.search(&probe.question, &probe.dataset).await?;

        let mut detail = vec![format!(
            "'{}' -> {} results",
            probe.question,
            results.len()
        )];
        detail.extend(
            results
                .iter()
                .take(probe.result_preview)
                .enumerate()
                .map(|(i, result)| format!("{}. {}", i + 1, result)),
        );
        Ok(detail)
    }
}
