//! Plain-text rendering of a [`ProbeReport`].

use std::fmt::{self, Write};

use crate::harness::{ProbeReport, StageOutcome, StageStatus, error_chain};

const INDENT: &str = "    ";

fn write_outcome(out: &mut impl Write, outcome: &StageOutcome) -> fmt::Result {
    let name = outcome.stage.name();
    let millis = outcome.elapsed.as_millis();
    match &outcome.status {
        StageStatus::Passed { detail } => {
            writeln!(out, "[PASS] {} ({name}, {millis} ms)", outcome.label)?;
            for line in detail {
                writeln!(out, "{INDENT}{line}")?;
            }
        }
        StageStatus::Failed(err) => {
            writeln!(out, "[FAIL] {} ({name}, {millis} ms)", outcome.label)?;
            writeln!(out, "{INDENT}error: {}", error_chain(err))?;
        }
        StageStatus::Skipped { reason } => {
            writeln!(out, "[SKIP] {} ({name})", outcome.label)?;
            writeln!(out, "{INDENT}skipped: {reason}")?;
        }
    }
    Ok(())
}

/// Write `report` as one block per stage followed by a closing tally.
pub fn write_report(out: &mut impl Write, report: &ProbeReport) -> fmt::Result {
    writeln!(
        out,
        "kgprobe plan '{}' started {}",
        report.plan,
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out)?;
    for outcome in &report.outcomes {
        write_outcome(out, outcome)?;
    }
    let (passed, failed, skipped) = report.tally();
    write!(out, "\n{passed} passed, {failed} failed, {skipped} skipped")
}

pub fn render_report(report: &ProbeReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, report);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{Stage, StageError};
    use chrono::TimeZone;
    use kgprobe_core::ConfigurationError;
    use std::time::Duration;

    fn outcome(stage: Stage, status: StageStatus, millis: u64) -> StageOutcome {
        StageOutcome {
            stage,
            label: stage.label().to_string(),
            status,
            elapsed: Duration::from_millis(millis),
        }
    }

    fn report(outcomes: Vec<StageOutcome>) -> ProbeReport {
        ProbeReport {
            plan: "connection".to_string(),
            started_at: chrono::Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap(),
            outcomes,
        }
    }

    #[test]
    fn renders_each_status() {
        let report = report(vec![
            outcome(
                Stage::ShowConfig,
                StageStatus::Passed {
                    detail: vec![
                        "LLM_MODEL: demo-model".to_string(),
                        "LLM_API_KEY: sk-abcdefg...vwxyz".to_string(),
                        "VECTOR_DB_URL: None".to_string(),
                    ],
                },
                2,
            ),
            outcome(
                Stage::Ingest,
                StageStatus::Failed(StageError::Configuration(
                    ConfigurationError::MissingValue("LLM_ENDPOINT"),
                )),
                15,
            ),
            outcome(
                Stage::Transform,
                StageStatus::Skipped {
                    reason: "ingest failed".to_string(),
                },
                0,
            ),
        ]);

        insta::assert_snapshot!(render_report(&report), @r"
        kgprobe plan 'connection' started 2026-10-19 08:30:00 UTC

        [PASS] Configuration (show-config, 2 ms)
            LLM_MODEL: demo-model
            LLM_API_KEY: sk-abcdefg...vwxyz
            VECTOR_DB_URL: None
        [FAIL] Ingest sample documents (ingest, 15 ms)
            error: missing required setting: LLM_ENDPOINT
        [SKIP] Build knowledge graph (transform)
            skipped: ingest failed

        1 passed, 1 failed, 1 skipped
        ");
    }

    #[test]
    fn numbered_query_results_are_kept_verbatim() {
        let report = report(vec![outcome(
            Stage::Query,
            StageStatus::Passed {
                detail: vec![
                    "'What is Cognee?' -> 2 results".to_string(),
                    "1. [chunk 0.812] Cognee builds knowledge graphs.".to_string(),
                    "2. [relation 0.731] Cognee --uses--> Qdrant".to_string(),
                ],
            },
            40,
        )]);

        insta::assert_snapshot!(render_report(&report), @r"
        kgprobe plan 'connection' started 2026-10-19 08:30:00 UTC

        [PASS] Search (query, 40 ms)
            'What is Cognee?' -> 2 results
            1. [chunk 0.812] Cognee builds knowledge graphs.
            2. [relation 0.731] Cognee --uses--> Qdrant

        1 passed, 0 failed, 0 skipped
        ");
    }
}
