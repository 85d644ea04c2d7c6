mod coercer;
mod fallback;
mod locator;
mod repair;

pub use coercer::ParseError;

use crate::domain::test_case::TestCaseRecord;
use crate::infrastructure::response::ResponseSanitizer;
use coercer::coerce_record;
use fallback::synthesize_fallback;
use locator::locate_json_object;
use repair::repair_json;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Sanitized,
    Located,
    Repaired,
    Parsed,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    NotFound,
    Parse(ParseError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Parsed { repaired: bool },
    Fallback(FallbackReason),
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub record: TestCaseRecord,
    pub terminal: Terminal,
    /// Stages visited in order, ending in `Parsed` or `Fallback`.
    pub trace: Vec<PipelineStage>,
}

impl PipelineOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.terminal, Terminal::Fallback(_))
    }
}

/// Sanitize, locate, repair once, parse, and fall back to an unresolved
/// record when nothing usable comes out. Stateless between calls.
#[derive(Debug, Clone, Default)]
pub struct TestCasePipeline {
    sanitizer: ResponseSanitizer,
}

impl TestCasePipeline {
    pub fn new(sanitizer: ResponseSanitizer) -> Self {
        Self { sanitizer }
    }

    pub fn sanitizer(&self) -> &ResponseSanitizer {
        &self.sanitizer
    }

    pub fn run(&self, raw: &str, title_hint: Option<&str>) -> PipelineOutcome {
        let sanitized = self.sanitizer.sanitize(raw);
        let mut trace = vec![PipelineStage::Sanitized];
        debug!(
            raw_len = raw.len(),
            sanitized_len = sanitized.len(),
            "Sanitized model response"
        );

        let Some(candidate) = locate_json_object(&sanitized) else {
            return Self::fall_back(&sanitized, title_hint, FallbackReason::NotFound, trace);
        };
        trace.push(PipelineStage::Located);
        debug!(candidate_len = candidate.len(), "Located JSON candidate");

        let repaired = repair_json(candidate);
        trace.push(PipelineStage::Repaired);
        let changed = repaired != candidate;
        debug!(changed, "Repaired JSON candidate");

        match coerce_record(&repaired) {
            Ok(record) => {
                trace.push(PipelineStage::Parsed);
                PipelineOutcome {
                    record,
                    terminal: Terminal::Parsed { repaired: changed },
                    trace,
                }
            }
            Err(err) => Self::fall_back(&sanitized, title_hint, FallbackReason::Parse(err), trace),
        }
    }

    fn fall_back(
        sanitized: &str,
        title_hint: Option<&str>,
        reason: FallbackReason,
        mut trace: Vec<PipelineStage>,
    ) -> PipelineOutcome {
        match &reason {
            FallbackReason::NotFound => {
                warn!("No JSON object found in model response, storing unresolved record")
            }
            FallbackReason::Parse(err) => {
                warn!(error = %err, "Model response could not be structured, storing unresolved record")
            }
        }
        trace.push(PipelineStage::Fallback);
        PipelineOutcome {
            record: synthesize_fallback(sanitized, title_hint),
            terminal: Terminal::Fallback(reason),
            trace,
        }
    }
}
