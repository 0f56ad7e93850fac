#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use exam_core::model::{MaterialId, Question, QuestionId, QuestionKind, SubmitTrigger, TestDefinition};
use exam_core::time::fixed_now;
use services::{Clock, ExamService, InMemoryExamBackend, SessionConfig, SessionNotifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Auto-submit notice, with the number of submission requests seen at that moment.
    Notice { requests_before: usize },
    Submitted(SubmitTrigger),
    Failed(String),
}

/// Notifier that records every call in order.
pub struct RecordingNotifier {
    backend: InMemoryExamBackend,
    events: Mutex<Vec<Event>>,
}

impl RecordingNotifier {
    pub fn new(backend: InMemoryExamBackend) -> Self {
        Self {
            backend,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl SessionNotifier for RecordingNotifier {
    fn auto_submit_notice(&self, _material_id: &MaterialId) {
        let requests_before = self.backend.requests().len();
        self.events
            .lock()
            .unwrap()
            .push(Event::Notice { requests_before });
    }

    fn submitted(&self, _material_id: &MaterialId, trigger: SubmitTrigger) {
        self.events.lock().unwrap().push(Event::Submitted(trigger));
    }

    fn submission_failed(&self, _material_id: &MaterialId, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Failed(message.to_owned()));
    }
}

pub fn multiple_choice(id: i64, ordinal: u32) -> Question {
    Question::new(
        QuestionId::new(id),
        ordinal,
        format!("Question {ordinal}"),
        QuestionKind::MultipleChoice,
        vec!["1".into(), "2".into(), "3".into(), "4".into()],
    )
    .unwrap()
}

pub fn definition(material: &str, questions: u32, minutes: i64) -> TestDefinition {
    let questions = (1..=questions)
        .map(|ordinal| multiple_choice(1000 + i64::from(ordinal), ordinal))
        .collect();
    TestDefinition::new(
        MaterialId::new(material),
        "Unit quiz",
        "Answer every question",
        minutes,
        questions,
        false,
    )
    .unwrap()
}

pub struct Harness {
    pub backend: InMemoryExamBackend,
    pub notifier: Arc<RecordingNotifier>,
    pub service: ExamService,
}

pub fn harness(backend: InMemoryExamBackend, config: SessionConfig) -> Harness {
    let notifier = Arc::new(RecordingNotifier::new(backend.clone()));
    let service = ExamService::new(Arc::new(backend.clone()), Arc::new(backend.clone()))
        .with_notifier(notifier.clone())
        .with_clock(Clock::fixed(fixed_now()))
        .with_config(config);
    Harness {
        backend,
        notifier,
        service,
    }
}

pub fn answers_of(backend: &InMemoryExamBackend, request: usize) -> Vec<String> {
    backend.requests()[request]
        .1
        .entries
        .iter()
        .map(|e| e.answer.clone())
        .collect()
}
