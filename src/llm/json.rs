//! Locating the JSON document inside a generated response.
//!
//! Models wrap their answer in markdown fences or chat around it. The
//! extraction here finds the first complete object while respecting string
//! literals, so braces inside commit messages do not confuse it.

/// Extract the JSON object embedded in a response.
///
/// Tries a ` ```json ` fence, then a bare fence whose body starts with `{`,
/// then the first balanced object in the text. Returns `None` when the
/// response contains no parseable object.
pub fn extract_json(response: &str) -> Option<String> {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json")
        && let Some(end) = trimmed[start + 7..].find("```")
    {
        let inner = trimmed[start + 7..start + 7 + end].trim();
        if is_object(inner) {
            return Some(inner.to_string());
        }
    }

    if let Some(start) = trimmed.find("```")
        && let Some(end) = trimmed[start + 3..].find("```")
    {
        let inner = trimmed[start + 3..start + 3 + end].trim();
        if inner.starts_with('{') && is_object(inner) {
            return Some(inner.to_string());
        }
    }

    find_valid_json_object(trimmed)
}

fn is_object(text: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(text),
        Ok(serde_json::Value::Object(_))
    )
}

/// First `{` from which a valid object can be read.
///
/// A streaming parse handles trailing text; balanced-brace extraction with
/// string-escape awareness covers the rest.
fn find_valid_json_object(text: &str) -> Option<String> {
    for (start_idx, _) in text.match_indices('{') {
        let candidate = &text[start_idx..];

        let mut stream =
            serde_json::Deserializer::from_str(candidate).into_iter::<serde_json::Value>();
        if let Some(Ok(value @ serde_json::Value::Object(_))) = stream.next() {
            return Some(value.to_string());
        }

        if let Some(json_str) = extract_balanced_braces(candidate)
            && is_object(&json_str)
        {
            return Some(json_str);
        }
    }

    None
}

/// Substring with balanced braces starting at the first `{`.
fn extract_balanced_braces(text: &str) -> Option<String> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (idx, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[..=idx].to_string());
                }
            }
            _ => {}
        }
    }

    None
}
