use serde::Deserialize;
use serde_json::Value;

use crate::error::ValidationFailure;
use crate::quiz::QuizItem;

/// Parses the accumulated model output into quiz items.
///
/// The result is all-or-nothing: one bad element rejects the whole array.
/// The array length is not checked against the requested count.
pub fn validate(raw_text: &str) -> Result<Vec<QuizItem>, ValidationFailure> {
    let parsed: Value =
        serde_json::from_str(raw_text).map_err(|err| ValidationFailure::MalformedJson {
            message: err.to_string(),
            raw_text: raw_text.to_string(),
        })?;

    let Value::Array(elements) = parsed else {
        return Err(ValidationFailure::UnexpectedShape {
            actual_type: json_type_name(&parsed),
            raw_text: raw_text.to_string(),
        });
    };

    let mut items = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let item = parse_item(element).map_err(|reason| ValidationFailure::InvalidItem {
            index,
            item: element.to_string(),
            reason,
            raw_text: raw_text.to_string(),
        })?;
        items.push(item);
    }

    Ok(items)
}

fn parse_item(element: &Value) -> Result<QuizItem, String> {
    // Derived struct impls also accept sequences, so the object check comes first.
    if !element.is_object() {
        return Err(format!(
            "expected an object, got {}",
            json_type_name(element)
        ));
    }
    QuizItem::deserialize(element).map_err(|err| err.to_string())
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_array_is_success() {
        assert_eq!(validate("[]").unwrap(), Vec::<QuizItem>::new());
        assert_eq!(validate(" \n[ ]\n").unwrap(), Vec::<QuizItem>::new());
    }

    #[test]
    fn malformed_json_keeps_raw_text() {
        let err = validate("not json").unwrap_err();
        match err {
            ValidationFailure::MalformedJson { raw_text, .. } => assert_eq!(raw_text, "not json"),
            other => panic!("expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn empty_response_is_malformed() {
        assert!(matches!(
            validate(""),
            Err(ValidationFailure::MalformedJson { .. })
        ));
    }

    #[test]
    fn fenced_json_is_not_unwrapped() {
        let raw = "```json\n[{\"question\":\"Q\",\"answer\":\"A\"}]\n```";
        assert!(matches!(
            validate(raw),
            Err(ValidationFailure::MalformedJson { .. })
        ));
    }

    #[test]
    fn object_instead_of_array_is_unexpected_shape() {
        let raw = "{\"question\":\"Q\",\"answer\":\"A\"}";
        assert_eq!(
            validate(raw).unwrap_err(),
            ValidationFailure::UnexpectedShape {
                actual_type: "object",
                raw_text: raw.to_string(),
            }
        );
        assert!(matches!(
            validate("\"just a string\""),
            Err(ValidationFailure::UnexpectedShape {
                actual_type: "string",
                ..
            })
        ));
    }

    #[test]
    fn missing_key_rejects_whole_array() {
        let raw = r#"[{"question":"Q1","answer":"A1"},{"question":"Q2"},{"question":"Q3","answer":"A3"}]"#;
        match validate(raw).unwrap_err() {
            ValidationFailure::InvalidItem {
                index,
                item,
                reason,
                raw_text,
            } => {
                assert_eq!(index, 1);
                assert_eq!(item, r#"{"question":"Q2"}"#);
                assert!(reason.contains("answer"));
                assert_eq!(raw_text, raw);
            }
            other => panic!("expected InvalidItem, got {other:?}"),
        }
    }

    #[test]
    fn non_string_values_are_rejected_not_coerced() {
        let raw = r#"[{"question":"How many legs does a spider have?","answer":8}]"#;
        assert!(matches!(
            validate(raw),
            Err(ValidationFailure::InvalidItem { index: 0, .. })
        ));
    }

    #[test]
    fn non_object_elements_are_rejected() {
        let raw = r#"[["What?","That"]]"#;
        match validate(raw).unwrap_err() {
            ValidationFailure::InvalidItem { index, reason, .. } => {
                assert_eq!(index, 0);
                assert_eq!(reason, "expected an object, got array");
            }
            other => panic!("expected InvalidItem, got {other:?}"),
        }
    }

    #[test]
    fn extra_keys_are_ignored() {
        let raw = r#"[{"question":"What pigment captures light?","answer":"Chlorophyll","explanation":"green"}]"#;
        assert_eq!(
            validate(raw).unwrap(),
            vec![QuizItem::new("What pigment captures light?", "Chlorophyll")]
        );
    }

    #[test]
    fn offending_item_keeps_model_key_order() {
        let raw = r#"[{"question":"How many legs does a spider have?","answer":8}]"#;
        match validate(raw).unwrap_err() {
            ValidationFailure::InvalidItem { item, .. } => assert_eq!(
                item,
                r#"{"question":"How many legs does a spider have?","answer":8}"#
            ),
            other => panic!("expected InvalidItem, got {other:?}"),
        }
    }

    fn item_strategy() -> impl Strategy<Value = QuizItem> {
        ("[a-zA-Z0-9 ?]{1,30}", "[a-zA-Z0-9 .]{1,30}")
            .prop_map(|(question, answer)| QuizItem::new(question, answer))
    }

    proptest! {
        #[test]
        fn valid_arrays_keep_length_and_order(items in prop::collection::vec(item_strategy(), 0..20)) {
            let raw = serde_json::to_string(&items).unwrap();
            let validated = validate(&raw).unwrap();
            prop_assert_eq!(validated, items);
        }

        #[test]
        fn one_bad_element_means_no_items(
            items in prop::collection::vec(item_strategy(), 1..10),
            bad_at in 0usize..10,
        ) {
            let mut values: Vec<Value> = items
                .iter()
                .map(|item| serde_json::to_value(item).unwrap())
                .collect();
            let bad_at = bad_at % values.len();
            values[bad_at] = serde_json::json!({ "question": items[bad_at].question });
            let raw = Value::Array(values).to_string();

            let rejected_at = match validate(&raw) {
                Err(ValidationFailure::InvalidItem { index, .. }) => Some(index),
                _ => None,
            };
            prop_assert_eq!(rejected_at, Some(bad_at));
        }
    }
}
