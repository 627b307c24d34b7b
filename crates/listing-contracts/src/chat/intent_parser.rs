use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, COPYABLE_FIELDS, COPY_FIELD_COMMAND, COPY_TAG_COMMAND, MULTI_PATH_COMMANDS,
    NO_ARG_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            command_args: BTreeMap::new(),
        }
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn normalize_field_name(arg: &str) -> Option<String> {
    let normalized = arg
        .trim()
        .to_ascii_lowercase()
        .replace(['-', ' '], "_");
    let alias = match normalized.as_str() {
        "color" | "primarycolor" => "primary_color",
        "secondarycolor" => "secondary_color",
        "fabric" | "primaryfabric" => "primary_fabric",
        "price_estimate" | "priceestimate" => "price",
        other => other,
    };
    COPYABLE_FIELDS
        .iter()
        .find(|field| **field == alias)
        .map(|field| (*field).to_string())
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        let mut intent = Intent::new("unknown", text);
        intent
            .command_args
            .insert("command".to_string(), Value::String(String::new()));
        intent
            .command_args
            .insert("arg".to_string(), Value::String(raw_trimmed.to_string()));
        return intent;
    };

    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if let Some(action) = find_action(&command, MULTI_PATH_COMMANDS) {
        let mut intent = Intent::new(action, text);
        intent.command_args.insert(
            "paths".to_string(),
            Value::Array(
                parse_path_args(arg)
                    .into_iter()
                    .map(Value::String)
                    .collect(),
            ),
        );
        return intent;
    }

    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return Intent::new(action, text);
    }

    if command == COPY_FIELD_COMMAND.command {
        let mut intent = Intent::new(COPY_FIELD_COMMAND.action, text);
        intent.command_args.insert(
            "field".to_string(),
            normalize_field_name(arg)
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        intent
            .command_args
            .insert("arg".to_string(), Value::String(arg.to_string()));
        return intent;
    }

    if command == COPY_TAG_COMMAND.command {
        let mut intent = Intent::new(COPY_TAG_COMMAND.action, text);
        // 1-based on the command line, 0-based in the payload.
        let index = arg
            .parse::<u64>()
            .ok()
            .filter(|value| *value > 0)
            .map(|value| Value::Number((value - 1).into()))
            .unwrap_or(Value::Null);
        intent.command_args.insert("index".to_string(), index);
        return intent;
    }

    let mut intent = Intent::new("unknown", text);
    intent
        .command_args
        .insert("command".to_string(), Value::String(command));
    intent
        .command_args
        .insert("arg".to_string(), Value::String(arg.to_string()));
    intent
}
