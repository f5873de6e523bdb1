//! Extraction of JSON fragments from free-form model output.

use serde_json::Value;

/// Extract the outermost JSON object embedded in `payload`, if any.
pub(crate) fn extract_object(payload: &str) -> Option<Value> {
    extract_fragment(payload, '{', '}')
}

/// Extract the outermost JSON array embedded in `payload`, if any.
pub(crate) fn extract_array(payload: &str) -> Option<Value> {
    extract_fragment(payload, '[', ']')
}

fn extract_fragment(payload: &str, open: char, close: char) -> Option<Value> {
    let start = payload.find(open)?;
    let end = payload.rfind(close)?;
    if end < start {
        return None;
    }

    serde_json::from_str(&payload[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let payload = "Here are the scores:\n{\"0\": 85, \"1\": 40}\nDone.";

        let value = extract_object(payload).expect("object");

        assert_eq!(value["0"], 85);
        assert_eq!(value["1"], 40);
    }

    #[test]
    fn extracts_array_with_nested_objects() {
        let payload = "```json\n[{\"name\": \"Diwali\"}]\n```";

        let value = extract_array(payload).expect("array");

        assert_eq!(value[0]["name"], "Diwali");
    }

    #[test]
    fn rejects_payload_without_fragment() {
        assert!(extract_object("no json here").is_none());
        assert!(extract_array("} [ backwards").is_none());
    }

    #[test]
    fn rejects_malformed_fragment() {
        assert!(extract_object("{\"unterminated\": ").is_none());
    }
}
