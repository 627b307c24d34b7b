use serde_json::{json, Map, Value};

pub const REQUIRED_FIELDS: &[&str] = &["description", "materials"];

const STRING_FIELDS: &[&str] = &[
    "title",
    "description",
    "category",
    "primaryColor",
    "secondaryColor",
    "primaryFabric",
    "occasion",
    "holiday",
    "style",
    "priceEstimate",
];

const STRING_LIST_FIELDS: &[&str] = &["tags", "materials"];

/// Structured-output schema for a listing, in the generation API's type dialect.
pub fn response_schema() -> Value {
    let mut properties = Map::new();
    for field in STRING_FIELDS {
        properties.insert((*field).to_string(), json!({ "type": "STRING" }));
    }
    for field in STRING_LIST_FIELDS {
        properties.insert(
            (*field).to_string(),
            json!({
                "type": "ARRAY",
                "items": { "type": "STRING" },
            }),
        );
    }
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": REQUIRED_FIELDS,
    })
}
