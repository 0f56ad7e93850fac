use log::warn;
use serde::{Deserialize, Serialize};

use exam_core::model::{
    AnswerSheet, DefinitionError, MaterialId, Question, QuestionId, QuestionKind, TestDefinition,
};

//
// ─── TEST DATA (GET) ───────────────────────────────────────────────────────────
//

/// Body of the test-data response.
///
/// Every field may be absent or `null`; an empty test is reported as missing
/// rather than as a decoding failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDataResponse {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Time limit in minutes.
    #[serde(default)]
    pub time: Option<i64>,
    /// Whether the student already completed this test.
    #[serde(default)]
    pub submit: Option<bool>,
    #[serde(default)]
    pub questions: Option<Vec<QuestionDto>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub test_id: i64,
    #[serde(default)]
    pub probno: Option<u32>,
    #[serde(default)]
    pub question: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub choice1: Option<String>,
    #[serde(default)]
    pub choice2: Option<String>,
    #[serde(default)]
    pub choice3: Option<String>,
    #[serde(default)]
    pub choice4: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

impl TestDataResponse {
    /// Decode a raw response body. An empty body or a JSON `null` means the
    /// server has no test and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the decoding error for any other malformed body.
    pub fn from_body(body: &[u8]) -> Result<Option<Self>, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(body)
    }

    /// Convert the wire shape into a validated `TestDefinition`.
    ///
    /// Ordinals come from position; a disagreeing `probno` is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns `exam_core::Error` when the test is empty or a question is malformed.
    pub fn into_definition(self, material_id: MaterialId) -> Result<TestDefinition, exam_core::Error> {
        let title = self.title.unwrap_or_default();
        if title.trim().is_empty() {
            return Err(DefinitionError::EmptyTitle.into());
        }
        let dtos = self.questions.unwrap_or_default();
        if dtos.is_empty() {
            return Err(DefinitionError::NoQuestions.into());
        }

        let mut questions = Vec::with_capacity(dtos.len());
        for (position, dto) in dtos.into_iter().enumerate() {
            let ordinal = u32::try_from(position + 1).unwrap_or(u32::MAX);
            if dto.probno.is_some_and(|probno| probno != ordinal) {
                warn!(
                    "question {} has probno {:?} but is at position {ordinal}",
                    dto.test_id, dto.probno
                );
            }
            questions.push(dto.into_question(ordinal)?);
        }

        Ok(TestDefinition::new(
            material_id,
            title,
            self.content.unwrap_or_default(),
            self.time.unwrap_or_default(),
            questions,
            self.submit.unwrap_or_default(),
        )?)
    }
}

impl QuestionDto {
    fn into_question(self, ordinal: u32) -> Result<Question, exam_core::Error> {
        let kind = QuestionKind::from_code(&self.kind)?;
        let choices = match kind {
            QuestionKind::MultipleChoice => [self.choice1, self.choice2, self.choice3, self.choice4]
                .into_iter()
                .flatten()
                .collect(),
            // Some backends echo empty choice slots for free-text questions.
            QuestionKind::FreeText => Vec::new(),
        };

        let question = Question::new(
            QuestionId::new(self.test_id),
            ordinal,
            self.question,
            kind,
            choices,
        )?;
        Ok(question.with_submitted_answer(self.answer))
    }
}

//
// ─── SUBMISSION (POST) ─────────────────────────────────────────────────────────
//

/// One element of the submission body. `stud_id` and `correct` are filled in server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEntryDto {
    pub testsub_id: i64,
    pub testnum: i64,
    pub stud_id: Option<i64>,
    pub submit: String,
    pub correct: bool,
}

impl SubmissionEntryDto {
    #[must_use]
    pub fn from_sheet(sheet: &AnswerSheet) -> Vec<Self> {
        sheet
            .entries
            .iter()
            .map(|entry| Self {
                testsub_id: 0,
                testnum: entry.question_id.value(),
                stud_id: None,
                submit: entry.answer.clone(),
                correct: false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AnswerEntry, SubmitTrigger};
    use serde_json::json;

    fn sample_response() -> serde_json::Value {
        json!({
            "title": "Chapter 3 quiz",
            "content": "Covers fractions",
            "time": 2,
            "submit": false,
            "questions": [
                {
                    "testId": 501, "probno": 1, "question": "1/2 + 1/2 = ?",
                    "type": "TES001",
                    "choice1": "0", "choice2": "1", "choice3": "2", "choice4": null
                },
                {
                    "testId": 502, "probno": 2, "question": "Explain a numerator.",
                    "type": "TES002",
                    "choice1": "", "choice2": null
                }
            ]
        })
    }

    #[test]
    fn parses_wire_shape_into_definition() {
        let response: TestDataResponse = serde_json::from_value(sample_response()).unwrap();
        let def = response.into_definition(MaterialId::new("77")).unwrap();

        assert_eq!(def.title(), "Chapter 3 quiz");
        assert_eq!(def.description(), "Covers fractions");
        assert_eq!(def.duration_secs(), 120);
        assert!(!def.already_submitted());

        let questions = def.questions();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].kind(), QuestionKind::MultipleChoice);
        assert_eq!(questions[0].choices().len(), 3);
        assert_eq!(questions[1].kind(), QuestionKind::FreeText);
        assert!(questions[1].choices().is_empty());
        assert_eq!(questions[1].ordinal(), 2);
        assert_eq!(questions[1].id(), QuestionId::new(502));
    }

    #[test]
    fn ordinals_follow_position_not_probno() {
        let mut value = sample_response();
        value["questions"][0]["probno"] = json!(7);
        let response: TestDataResponse = serde_json::from_value(value).unwrap();
        let def = response.into_definition(MaterialId::new("77")).unwrap();
        assert_eq!(def.questions()[0].ordinal(), 1);
    }

    #[test]
    fn empty_payload_is_missing_test() {
        let response: TestDataResponse = serde_json::from_value(json!({})).unwrap();
        let err = response.into_definition(MaterialId::new("1")).unwrap_err();
        assert!(matches!(
            err,
            exam_core::Error::Definition(DefinitionError::EmptyTitle)
        ));

        let response: TestDataResponse =
            serde_json::from_value(json!({ "title": "T", "time": 5, "questions": [] })).unwrap();
        let err = response.into_definition(MaterialId::new("1")).unwrap_err();
        assert!(matches!(
            err,
            exam_core::Error::Definition(DefinitionError::NoQuestions)
        ));
    }

    fn decode(body: &str) -> Option<TestDataResponse> {
        TestDataResponse::from_body(body.as_bytes()).unwrap()
    }

    #[test]
    fn empty_or_null_body_means_no_test() {
        assert!(decode("").is_none());
        assert!(decode("  \n").is_none());
        assert!(decode("null").is_none());
        assert!(TestDataResponse::from_body(b"{\"title\":").is_err());
    }

    #[test]
    fn null_fields_decode_as_missing() {
        let response =
            decode(r#"{"title":"T","time":5,"submit":false,"questions":null}"#).unwrap();
        let err = response.into_definition(MaterialId::new("1")).unwrap_err();
        assert!(matches!(
            err,
            exam_core::Error::Definition(DefinitionError::NoQuestions)
        ));

        let response = decode(
            r#"{"title":null,"content":null,"time":null,"submit":null,"questions":null}"#,
        )
        .unwrap();
        let err = response.into_definition(MaterialId::new("1")).unwrap_err();
        assert!(matches!(
            err,
            exam_core::Error::Definition(DefinitionError::EmptyTitle)
        ));
    }

    #[test]
    fn null_submit_flag_means_fresh_attempt() {
        let mut value = sample_response();
        value["submit"] = serde_json::Value::Null;
        value["content"] = serde_json::Value::Null;
        let response: TestDataResponse = serde_json::from_value(value).unwrap();
        let def = response.into_definition(MaterialId::new("77")).unwrap();
        assert!(!def.already_submitted());
        assert_eq!(def.description(), "");
    }

    #[test]
    fn unknown_type_code_is_rejected() {
        let mut value = sample_response();
        value["questions"][1]["type"] = json!("TES777");
        let response: TestDataResponse = serde_json::from_value(value).unwrap();
        let err = response.into_definition(MaterialId::new("1")).unwrap_err();
        assert!(matches!(err, exam_core::Error::Question(_)));
    }

    #[test]
    fn submission_body_matches_backend_contract() {
        let sheet = AnswerSheet {
            trigger: SubmitTrigger::Manual,
            entries: vec![
                AnswerEntry {
                    question_id: QuestionId::new(501),
                    answer: "1".into(),
                },
                AnswerEntry {
                    question_id: QuestionId::new(502),
                    answer: String::new(),
                },
            ],
        };

        let body = serde_json::to_value(SubmissionEntryDto::from_sheet(&sheet)).unwrap();
        assert_eq!(
            body,
            json!([
                { "testsubId": 0, "testnum": 501, "studId": null, "submit": "1", "correct": false },
                { "testsubId": 0, "testnum": 502, "studId": null, "submit": "", "correct": false }
            ])
        );
    }
}
