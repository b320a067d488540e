use crate::error::QuizError;
use crate::pipeline::PipelineEvent;
use crate::quiz::{COUNT_RANGE, DIFFICULTY_RANGE, QuizItem, QuizRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Idle,
    Building,
    Streaming { received_bytes: usize },
    Validating,
    Success,
    Failed,
}

impl QuizPhase {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            QuizPhase::Building | QuizPhase::Streaming { .. } | QuizPhase::Validating
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Known,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemState {
    pub item: QuizItem,
    pub revealed: bool,
    pub mark: Option<Mark>,
}

/// Interactive state for one terminal session.
///
/// Only one request may be in flight: [`QuizSession::start`] returns `None` while
/// the phase is busy. Form values survive across requests and resets.
#[derive(Debug)]
pub struct QuizSession {
    topic: String,
    difficulty: u8,
    count: u8,
    phase: QuizPhase,
    items: Vec<ItemState>,
    failure: Option<QuizError>,
    warning: Option<String>,
}

impl QuizSession {
    pub fn new(topic: &str, difficulty: u8, count: u8) -> Self {
        Self {
            topic: topic.to_string(),
            difficulty: difficulty.clamp(*DIFFICULTY_RANGE.start(), *DIFFICULTY_RANGE.end()),
            count: count.clamp(*COUNT_RANGE.start(), *COUNT_RANGE.end()),
            phase: QuizPhase::Idle,
            items: Vec::new(),
            failure: None,
            warning: None,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn items(&self) -> &[ItemState] {
        &self.items
    }

    pub fn failure(&self) -> Option<&QuizError> {
        self.failure.as_ref()
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn set_topic(&mut self, topic: &str) {
        if !self.is_busy() {
            self.topic = topic.to_string();
        }
    }

    pub fn adjust_difficulty(&mut self, delta: i16) {
        if !self.is_busy() {
            self.difficulty = step_within(self.difficulty, delta, &DIFFICULTY_RANGE);
        }
    }

    pub fn adjust_count(&mut self, delta: i16) {
        if !self.is_busy() {
            self.count = step_within(self.count, delta, &COUNT_RANGE);
        }
    }

    /// Restarts at `Idle` and moves to `Building`. Returns the request to run, or
    /// `None` when a request is already in flight or the form is invalid.
    pub fn start(&mut self) -> Option<QuizRequest> {
        if self.is_busy() {
            return None;
        }

        self.clear_result();
        match QuizRequest::new(&self.topic, self.difficulty, self.count) {
            Ok(request) => {
                self.phase = QuizPhase::Building;
                Some(request)
            }
            Err(err) => {
                self.warning = Some(err.to_string());
                None
            }
        }
    }

    pub fn apply(&mut self, event: PipelineEvent) {
        if !self.is_busy() {
            return;
        }
        self.phase = match event {
            PipelineEvent::Building => QuizPhase::Building,
            PipelineEvent::Streaming => QuizPhase::Streaming { received_bytes: 0 },
            PipelineEvent::Received { bytes } => QuizPhase::Streaming {
                received_bytes: bytes,
            },
            PipelineEvent::Validating => QuizPhase::Validating,
        };
    }

    pub fn finish(&mut self, result: Result<Vec<QuizItem>, QuizError>) {
        if !self.is_busy() {
            return;
        }
        match result {
            Ok(items) => {
                self.items = items
                    .into_iter()
                    .map(|item| ItemState {
                        item,
                        revealed: false,
                        mark: None,
                    })
                    .collect();
                self.phase = QuizPhase::Success;
            }
            Err(err) => {
                self.failure = Some(err);
                self.phase = QuizPhase::Failed;
            }
        }
    }

    pub fn reveal(&mut self, idx: usize) {
        if let Some(state) = self.items.get_mut(idx) {
            state.revealed = true;
        }
    }

    /// Marking an item unknown also reveals its answer.
    pub fn mark(&mut self, idx: usize, mark: Mark) {
        if let Some(state) = self.items.get_mut(idx) {
            state.mark = Some(mark);
            if mark == Mark::Unknown {
                state.revealed = true;
            }
        }
    }

    pub fn reset(&mut self) {
        if self.is_busy() {
            return;
        }
        self.clear_result();
        self.phase = QuizPhase::Idle;
    }

    fn clear_result(&mut self) {
        self.items.clear();
        self.failure = None;
        self.warning = None;
    }
}

fn step_within(value: u8, delta: i16, range: &std::ops::RangeInclusive<u8>) -> u8 {
    let stepped = i16::from(value) + delta;
    let clamped = stepped.clamp(i16::from(*range.start()), i16::from(*range.end()));
    u8::try_from(clamped).unwrap_or(*range.start())
}
