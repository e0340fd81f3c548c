//! Bootstrap-and-probe harness: checks that the configured LLM endpoint,
//! vector store and graph store work together through the kgprobe pipeline.

pub mod harness;
pub mod raw_probe;
pub mod report;

pub use harness::{
    Harness, PlanError, ProbeReport, Stage, StageError, StageGroup, StageOutcome, StagePlan,
    StageStatus,
};
pub use raw_probe::{RawProbeResponse, TransportError, probe_raw_endpoint};
pub use report::render_report;
