use listing_contracts::ListingRecord;
use serde_json::Value;

use crate::error::GenerationError;

/// Maps the model's textual reply to a typed record, unchanged on success.
pub fn parse_listing_response(text: Option<&str>) -> Result<ListingRecord, GenerationError> {
    let Some(text) = text.filter(|value| !value.trim().is_empty()) else {
        return Err(GenerationError::EmptyResponse);
    };
    serde_json::from_str::<ListingRecord>(text)
        .map_err(|err| GenerationError::MalformedResponse(err.to_string()))
}

/// Joins the text parts of the first candidate in a `generateContent` reply.
pub fn extract_response_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)?;
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        return None;
    }
    Some(texts.concat())
}
