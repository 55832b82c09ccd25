//! Field-level normalization of admin payloads.
//!
//! Payloads arrive as loosely typed JSON. Every helper takes the whole
//! object plus a field name and returns the normalized value.

use serde_json::{Map, Value};

use super::error::ContentError;

pub type Payload = Map<String, Value>;

pub fn object(value: &Value) -> Result<&Payload, ContentError> {
    value.as_object().ok_or(ContentError::NotAnObject)
}

fn is_slug(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Required; trimmed; lowercase ASCII letters, digits and hyphens only.
pub fn slug(payload: &Payload) -> Result<String, ContentError> {
    let raw = optional_text(payload, "slug")?
        .ok_or(ContentError::Missing { field: "slug" })?;
    if !is_slug(&raw) {
        return Err(ContentError::InvalidSlug(raw));
    }
    Ok(raw)
}

/// Trimmed text; missing, `null` and blank all read as `None`.
pub fn optional_text(
    payload: &Payload,
    field: &'static str,
) -> Result<Option<String>, ContentError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(_) => Err(ContentError::InvalidText { field }),
    }
}

pub fn required_text(payload: &Payload, field: &'static str) -> Result<String, ContentError> {
    optional_text(payload, field)?.ok_or(ContentError::Missing { field })
}

/// Loose boolean: JSON bools, numbers (non-zero is true) and the usual form
/// strings. Missing reads as false.
pub fn flag(payload: &Payload, field: &'static str) -> Result<bool, ContentError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(true),
            "false" | "0" | "off" | "no" | "" => Ok(false),
            _ => Err(ContentError::InvalidFlag { field }),
        },
        Some(_) => Err(ContentError::InvalidFlag { field }),
    }
}

/// URL list from an array or a newline-separated string. Entries are
/// trimmed, blanks dropped, duplicates removed keeping the first.
pub fn url_list(payload: &Payload, field: &'static str) -> Result<Vec<String>, ContentError> {
    let raw: Vec<&str> = match payload.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(s)) => s.lines().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().ok_or(ContentError::InvalidList { field }))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(ContentError::InvalidList { field }),
    };
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for url in raw.into_iter().map(str::trim).filter(|u| !u.is_empty()) {
        if !out.iter().any(|seen| seen == url) {
            out.push(url.to_string());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn slug_rules() {
        assert_eq!(
            slug(&payload(json!({ "slug": "  my-post-2 " }))).unwrap(),
            "my-post-2"
        );
        assert_eq!(
            slug(&payload(json!({ "slug": "My Post" }))),
            Err(ContentError::InvalidSlug("My Post".to_string()))
        );
        assert_eq!(
            slug(&payload(json!({ "slug": "   " }))),
            Err(ContentError::Missing { field: "slug" })
        );
        assert_eq!(
            slug(&payload(json!({}))),
            Err(ContentError::Missing { field: "slug" })
        );
        assert!(slug(&payload(json!({ "slug": "über" }))).is_err());
    }

    #[test]
    fn blank_text_becomes_none() {
        let p = payload(json!({ "a": "  hi  ", "b": "   ", "c": null, "d": 3 }));
        assert_eq!(optional_text(&p, "a").unwrap().as_deref(), Some("hi"));
        assert_eq!(optional_text(&p, "b").unwrap(), None);
        assert_eq!(optional_text(&p, "c").unwrap(), None);
        assert_eq!(optional_text(&p, "missing").unwrap(), None);
        assert_eq!(optional_text(&p, "d"), Err(ContentError::InvalidText { field: "d" }));
    }

    #[test]
    fn flags_are_coerced() {
        let p = payload(json!({
            "a": true, "b": "true", "c": "0", "d": 1, "e": "On", "f": "maybe", "g": []
        }));
        assert!(flag(&p, "a").unwrap());
        assert!(flag(&p, "b").unwrap());
        assert!(!flag(&p, "c").unwrap());
        assert!(flag(&p, "d").unwrap());
        assert!(flag(&p, "e").unwrap());
        assert!(!flag(&p, "missing").unwrap());
        assert!(flag(&p, "f").is_err());
        assert!(flag(&p, "g").is_err());
    }

    #[test]
    fn url_lists_are_trimmed_and_deduplicated() {
        let p = payload(json!({
            "list": [" https://a.test ", "", "https://b.test", "https://a.test"],
            "text": "https://c.test\n\n  https://c.test  \nhttps://d.test",
            "bad": [1, 2],
        }));
        assert_eq!(
            url_list(&p, "list").unwrap(),
            vec!["https://a.test", "https://b.test"]
        );
        assert_eq!(
            url_list(&p, "text").unwrap(),
            vec!["https://c.test", "https://d.test"]
        );
        assert!(url_list(&p, "missing").unwrap().is_empty());
        assert_eq!(url_list(&p, "bad"), Err(ContentError::InvalidList { field: "bad" }));
    }
}
