use listing_contracts::schema::response_schema;
use listing_contracts::{Vocabulary, MAX_TAGS};
use serde_json::{json, Value};

use crate::encoder::EncodedImage;

/// One structured generation call: images, instruction, and the output contract.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub images: Vec<EncodedImage>,
    pub instruction: String,
    pub response_schema: Value,
}

pub fn build_request(model: &str, images: Vec<EncodedImage>) -> GenerationRequest {
    GenerationRequest {
        model: model.trim().to_string(),
        images,
        instruction: listing_instruction(),
        response_schema: response_schema(),
    }
}

impl GenerationRequest {
    /// `generateContent` body: image parts in input order, then the instruction text.
    pub fn to_gemini_payload(&self) -> Value {
        let mut parts: Vec<Value> = self
            .images
            .iter()
            .map(|image| {
                json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": image.data,
                    }
                })
            })
            .collect();
        parts.push(json!({ "text": self.instruction }));
        json!({
            "contents": [{
                "role": "user",
                "parts": parts,
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": self.response_schema,
            },
        })
    }
}

pub fn listing_instruction() -> String {
    let colors = Vocabulary::Color.joined();
    format!(
        "You are an expert Etsy SEO specialist.
Analyze these product images and generate a high-quality Etsy listing description and attributes.

1. Description: Write a professional, \"Best Seller\" quality description.
   - Structure:
     (a) Engaging Hook.
     (b) What's Included: CLEARLY state exactly what the buyer gets. EXPLICITLY state \"Props/Decor not included\" if relevant.
     (c) Measurements/Fit: Provide specific measurements or mention \"Fits standard X\". Mention that items are tested for fit if applicable.
     (d) Materials: Mention specific materials (e.g., \"Handcrafted with [Material]\").
     (e) Production/Care: Mention \"Made to order\", \"Handmade in a smoke-free/pet-free environment\", and \"Care instructions\".
   - Tone: Helpful, detailed, transparent, and defensive (managing expectations about props/shipping).

2. Attributes: YOU MUST SELECT FROM THE PROVIDED LISTS ONLY. If no fit, return empty string.
   - Primary Color: Choose from [{colors}]
   - Secondary Color: Choose from [{colors}]
   - Primary Fabric: Choose from [{fabrics}]
   - Occasion: Choose from [{occasions}]
   - Holiday: Choose from [{holidays}]

3. Materials: List of likely materials used.

4. Listing details:
   - Title: A keyword-rich title under 140 characters.
   - Category: The most specific marketplace category that fits.
   - Style: One or two words describing the style (e.g., \"Boho\", \"Minimalist\").
   - Tags: Up to {max_tags} short search tags, each under 20 characters.
   - Price Estimate: A typical price range for comparable handmade items, as text.
",
        fabrics = Vocabulary::Fabric.joined(),
        occasions = Vocabulary::Occasion.joined(),
        holidays = Vocabulary::Holiday.joined(),
        max_tags = MAX_TAGS,
    )
}

#[cfg(test)]
mod tests {
    use listing_contracts::vocabulary::{FABRICS, HOLIDAYS, OCCASIONS};
    use serde_json::json;

    use super::{build_request, listing_instruction};
    use crate::encoder::EncodedImage;

    fn image(data: &str, mime: &str) -> EncodedImage {
        EncodedImage {
            data: data.to_string(),
            mime_type: mime.to_string(),
        }
    }

    #[test]
    fn instruction_covers_structure_and_every_vocabulary() {
        let text = listing_instruction();
        for section in [
            "Engaging Hook",
            "What's Included",
            "Props/Decor not included",
            "Measurements/Fit",
            "Production/Care",
            "Tone:",
            "Up to 13 short search tags",
        ] {
            assert!(text.contains(section), "instruction lacks {section}");
        }
        assert_eq!(text.matches("Choose from [Beige, Black").count(), 2);
        for value in FABRICS.iter().chain(OCCASIONS).chain(HOLIDAYS) {
            assert!(text.contains(value), "instruction lacks {value}");
        }
    }

    #[test]
    fn payload_lists_images_in_order_then_instruction() {
        let request = build_request(
            " gemini-2.5-flash ",
            vec![image("AAA", "image/png"), image("BBB", "image/jpeg")],
        );
        assert_eq!(request.model, "gemini-2.5-flash");
        let payload = request.to_gemini_payload();
        let parts = payload["contents"][0]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        assert_eq!(payload["contents"][0]["role"], json!("user"));
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inlineData"]["data"], json!("AAA"));
        assert_eq!(parts[0]["inlineData"]["mimeType"], json!("image/png"));
        assert_eq!(parts[1]["inlineData"]["data"], json!("BBB"));
        assert_eq!(parts[2]["text"], json!(request.instruction));
    }

    #[test]
    fn payload_declares_json_output_contract() {
        let payload = build_request("m", Vec::new()).to_gemini_payload();
        let config = &payload["generationConfig"];
        assert_eq!(config["responseMimeType"], json!("application/json"));
        assert_eq!(
            config["responseSchema"]["required"],
            json!(["description", "materials"])
        );
        assert_eq!(
            config["responseSchema"]["properties"]["materials"]["items"]["type"],
            json!("STRING")
        );
    }
}
