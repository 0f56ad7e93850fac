use serde_json::json;
use std::error::Error;

use exam_core::model::{MaterialId, TestDefinition};
use services::backend::TestDataResponse;

pub const DEMO_MATERIAL: &str = "demo";

/// Sample test served by `exam demo`, built from the same wire shape the backend sends.
pub fn definition(minutes: i64) -> Result<TestDefinition, Box<dyn Error>> {
    let body = json!({
        "title": "Demo: fractions warm-up",
        "content": "Three short questions. Answers are submitted automatically when time runs out.",
        "time": minutes,
        "submit": false,
        "questions": [
            {
                "testId": 1, "probno": 1, "question": "What is 1/2 + 1/4?",
                "type": "TES001",
                "choice1": "1/6", "choice2": "2/6", "choice3": "3/4", "choice4": "1"
            },
            {
                "testId": 2, "probno": 2, "question": "Which is larger: 2/3 or 3/5?",
                "type": "TES001",
                "choice1": "2/3", "choice2": "3/5", "choice3": "They are equal", "choice4": null
            },
            {
                "testId": 3, "probno": 3, "question": "In your own words, what does a denominator tell you?",
                "type": "TES002"
            }
        ]
    });

    let response: TestDataResponse = serde_json::from_value(body)?;
    Ok(response.into_definition(MaterialId::new(DEMO_MATERIAL))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::QuestionKind;

    #[test]
    fn demo_test_is_a_valid_fresh_attempt() {
        let definition = definition(2).unwrap();
        assert_eq!(definition.duration_secs(), 120);
        assert!(!definition.already_submitted());
        assert_eq!(definition.questions().len(), 3);
        assert_eq!(definition.questions()[1].choices().len(), 3);
        assert_eq!(definition.questions()[2].kind(), QuestionKind::FreeText);
    }
}
