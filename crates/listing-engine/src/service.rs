use std::collections::BTreeMap;

use listing_contracts::vocabulary::{COLORS, FABRICS, HOLIDAYS, OCCASIONS};
use listing_contracts::ListingRecord;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::ServiceConfig;
use crate::encoder::{encode_all, SelectedImage};
use crate::error::GenerationError;
use crate::request::{build_request, GenerationRequest};
use crate::response::{extract_response_text, parse_listing_response};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Raw reply of a generation call: the model's text, if it produced any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceReply {
    pub text: Option<String>,
}

pub trait ListingService: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Preconditions that must hold before any file is read or request sent.
    fn check_ready(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    fn send(&self, request: &GenerationRequest) -> Result<ServiceReply, GenerationError>;
}

#[derive(Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, Box<dyn ListingService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: ListingService + 'static>(&mut self, service: S) {
        self.services
            .insert(service.name().to_string(), Box::new(service));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ListingService> {
        self.services.get(name).map(|service| service.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}

pub fn default_service_registry(config: &ServiceConfig) -> ServiceRegistry {
    let mut services = ServiceRegistry::new();
    services.register(GeminiService::new(config.clone()));
    services.register(DryrunService::new(&config.model));
    services
}

/// Encoder, builder, call and validator, in that order, for one generation.
pub fn generate_listing(
    service: &dyn ListingService,
    files: &[SelectedImage],
) -> Result<ListingRecord, GenerationError> {
    service.check_ready()?;
    let images = encode_all(files)?;
    let request = build_request(service.model(), images);
    let reply = service.send(&request)?;
    parse_listing_response(reply.text.as_deref())
}

pub struct GeminiService {
    config: ServiceConfig,
    http: HttpClient,
}

impl GeminiService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            http: HttpClient::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.config.api_base, model_path)
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Configuration("API Key not found".to_string()))
    }
}

impl ListingService for GeminiService {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn check_ready(&self) -> Result<(), GenerationError> {
        self.api_key().map(|_| ())
    }

    fn send(&self, request: &GenerationRequest) -> Result<ServiceReply, GenerationError> {
        let api_key = self.api_key()?;
        let endpoint = self.endpoint_for_model(&request.model);
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .timeout(self.config.request_timeout)
            .json(&request.to_gemini_payload())
            .send()
            .map_err(|err| {
                let reason = if err.is_timeout() {
                    format!(
                        "timed out after {}s",
                        self.config.request_timeout.as_secs_f64()
                    )
                } else {
                    err.without_url().to_string()
                };
                GenerationError::Service(format!("Gemini request failed ({endpoint}): {reason}"))
            })?;
        let payload = decode_reply(response)?;
        Ok(ServiceReply {
            text: extract_response_text(&payload),
        })
    }
}

/// Offline transport: answers with a deterministic listing derived from the image bytes.
pub struct DryrunService {
    model: String,
}

impl DryrunService {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }

    fn listing_for(request: &GenerationRequest) -> ListingRecord {
        let mut hasher = Sha256::new();
        for image in &request.images {
            hasher.update(image.mime_type.as_bytes());
            hasher.update(image.data.as_bytes());
        }
        let digest = hasher.finalize();
        let pick = |list: &[&str], byte: u8| list[byte as usize % list.len()].to_string();
        let primary_fabric = pick(FABRICS, digest[2]);
        let count = request.images.len();

        ListingRecord {
            title: format!("Handmade {} piece", primary_fabric.to_ascii_lowercase()),
            description: format!(
                "A one-of-a-kind handmade piece, photographed in {count} image{}.\n\n\
                 What's included: the item shown. Props/Decor not included.\n\n\
                 Made to order in a smoke-free/pet-free environment.",
                if count == 1 { "" } else { "s" }
            ),
            category: "Handmade".to_string(),
            primary_color: pick(COLORS, digest[0]),
            secondary_color: pick(COLORS, digest[1]),
            primary_fabric: primary_fabric.clone(),
            occasion: pick(OCCASIONS, digest[3]),
            holiday: pick(HOLIDAYS, digest[4]),
            style: "Handcrafted".to_string(),
            tags: vec![
                "handmade".to_string(),
                primary_fabric.to_ascii_lowercase(),
                "gift idea".to_string(),
            ],
            materials: vec![primary_fabric, "thread".to_string()],
            price_estimate: format!("${}-${}", 20 + digest[5] % 40, 60 + digest[6] % 60),
        }
    }
}

impl ListingService for DryrunService {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn send(&self, request: &GenerationRequest) -> Result<ServiceReply, GenerationError> {
        let text = serde_json::to_string(&Self::listing_for(request))
            .map_err(|err| GenerationError::Service(err.to_string()))?;
        Ok(ServiceReply { text: Some(text) })
    }
}

/// Reads a `generateContent` reply, keeping at most 512 chars of an error body.
fn decode_reply(response: HttpResponse) -> Result<Value, GenerationError> {
    let status = response.status();
    let body = response.text().map_err(|err| {
        GenerationError::Service(format!("Gemini reply unreadable: {}", err.without_url()))
    })?;
    if status.is_success() {
        serde_json::from_str(&body).map_err(|err| {
            GenerationError::MalformedResponse(format!("Gemini reply is not JSON: {err}"))
        })
    } else {
        Err(GenerationError::Service(format!(
            "Gemini answered {status}: {}",
            excerpt(&body, 512)
        )))
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
