// KioskLog - core/classifier.rs
//
// Pattern classification and boot sequencing.
// Core layer: pure logic over parsed lines and an explicit session state.
//
// Sequencing rule: language changes and logouts are "last known good
// interaction" checkpoints. A boot no more than ABNORMAL_BOOT_THRESHOLD_SECS
// after the latest checkpoint is a planned restart, and a boot with no
// checkpoint in the session is the first boot. Elapsed time is a plain
// time-of-day difference: it does not wrap at midnight, so a boot whose clock
// reads earlier than the checkpoint has a negative elapsed and counts as
// normal.

use crate::core::model::{BootKind, ErrorType, EventRecord, LogSource, ParsedLine, SessionScope};
use crate::core::parser;
use crate::core::patterns::{PatternRole, PatternTable};
use crate::util::constants;
use crate::util::error::ClassifyError;
use crate::util::logging;
use chrono::{Duration, NaiveTime};

// =============================================================================
// Session state
// =============================================================================

/// Running state of one logical session, owned by the caller.
///
/// Only session-boundary matches write to it; boot matches read it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    last_boundary: Option<NaiveTime>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of day of the most recent session boundary, if any.
    pub fn last_boundary(&self) -> Option<NaiveTime> {
        self.last_boundary
    }

    pub fn reset(&mut self) {
        self.last_boundary = None;
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Classifies parsed lines against a pattern table.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    patterns: &'a PatternTable,
    abnormal_after: Duration,
}

impl<'a> Classifier<'a> {
    pub fn new(patterns: &'a PatternTable) -> Self {
        Self {
            patterns,
            abnormal_after: Duration::seconds(constants::ABNORMAL_BOOT_THRESHOLD_SECS),
        }
    }

    pub fn patterns(&self) -> &'a PatternTable {
        self.patterns
    }

    /// Classify one parsed line.
    ///
    /// Returns `Ok(None)` when nothing matched or when the match was a
    /// session boundary (which updates `state` but is never reported).
    /// Returns `Err` when a pattern matched but the line's time is not a
    /// valid time of day; `state` is left untouched in that case.
    pub fn classify(
        &self,
        line: &ParsedLine,
        state: &mut SessionState,
    ) -> Result<Option<ErrorType>, ClassifyError> {
        let Some(entry) = self.patterns.first_match(&line.message) else {
            return Ok(None);
        };
        let at = line.time_of_day()?;

        match entry.role() {
            PatternRole::SessionBoundary => {
                tracing::trace!(key = entry.key(), %at, "Session boundary recorded");
                state.last_boundary = Some(at);
                Ok(None)
            }
            PatternRole::BootMarker => {
                let kind = match state.last_boundary {
                    None => BootKind::First,
                    Some(last) => {
                        let elapsed = at.signed_duration_since(last);
                        if elapsed > self.abnormal_after {
                            BootKind::Abnormal
                        } else {
                            BootKind::Normal
                        }
                    }
                };
                Ok(Some(ErrorType::Boot(kind)))
            }
            PatternRole::Plain => Ok(Some(ErrorType::Pattern(entry.key().to_string()))),
        }
    }
}

// =============================================================================
// Sequencer
// =============================================================================

/// Per-file counters produced by [`Sequencer::process_content`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutcome {
    pub records: Vec<EventRecord>,
    pub lines: usize,
    pub parsed_lines: usize,
    pub malformed_timestamps: usize,
}

/// Drives the classifier over an ordered stream of source lines and owns the
/// session state for the configured scope.
#[derive(Debug)]
pub struct Sequencer<'a> {
    classifier: Classifier<'a>,
    scope: SessionScope,
    state: SessionState,
    /// Machine whose lines were fed last; drives the per-machine reset.
    current_machine: Option<String>,
}

impl<'a> Sequencer<'a> {
    pub fn new(patterns: &'a PatternTable, scope: SessionScope) -> Self {
        Self {
            classifier: Classifier::new(patterns),
            scope,
            state: SessionState::new(),
            current_machine: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Mark the start of a new machine archive. Clears the session state
    /// unless the scope spans the whole run.
    pub fn begin_archive(&mut self) {
        if self.scope == SessionScope::Machine {
            self.state.reset();
            self.current_machine = None;
        }
    }

    /// Parse and classify one raw line from `source`.
    ///
    /// Lines outside the grammar yield `Ok(None)`.
    pub fn feed(
        &mut self,
        source: &LogSource,
        raw_line: &str,
    ) -> Result<Option<EventRecord>, ClassifyError> {
        let Some(parsed) = parser::parse_line(raw_line) else {
            return Ok(None);
        };
        self.feed_parsed(source, &parsed)
    }

    fn feed_parsed(
        &mut self,
        source: &LogSource,
        parsed: &ParsedLine,
    ) -> Result<Option<EventRecord>, ClassifyError> {
        if self.current_machine.as_deref() != Some(source.machine.as_str()) {
            if self.scope == SessionScope::Machine && self.current_machine.is_some() {
                tracing::debug!(machine = %source.machine, "Machine changed; session state reset");
                self.state.reset();
            }
            self.current_machine = Some(source.machine.clone());
        }

        let Some(error_type) = self.classifier.classify(parsed, &mut self.state)? else {
            return Ok(None);
        };
        // classify() has already validated the time for any match.
        let time = parsed.time_of_day()?;
        Ok(Some(EventRecord {
            library: source.library.clone(),
            machine: source.machine.clone(),
            date: source.date,
            time,
            error_type,
        }))
    }

    /// Process the full text of one log file, line by line in order.
    ///
    /// Malformed timestamps are logged and skipped; they never abort the file.
    pub fn process_content(&mut self, source: &LogSource, content: &str) -> FileOutcome {
        let mut outcome = FileOutcome::default();

        for (idx, raw_line) in content.lines().enumerate() {
            outcome.lines += 1;
            let Some(parsed) = parser::parse_line(raw_line) else {
                continue;
            };
            outcome.parsed_lines += 1;

            match self.feed_parsed(source, &parsed) {
                Ok(Some(record)) => outcome.records.push(record),
                Ok(None) => {}
                Err(e) => {
                    outcome.malformed_timestamps += 1;
                    tracing::warn!(
                        machine = %source.machine,
                        date = %source.date,
                        line_number = idx + 1,
                        line = logging::preview(raw_line),
                        error = %e,
                        "Skipping line with malformed timestamp"
                    );
                }
            }
        }

        tracing::debug!(
            machine = %source.machine,
            date = %source.date,
            lines = outcome.lines,
            parsed = outcome.parsed_lines,
            records = outcome.records.len(),
            "File classified"
        );

        outcome
    }
}

// =============================================================================
// Tests
// =============================================================================
