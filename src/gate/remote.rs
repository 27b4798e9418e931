//! Ollama-backed field extractor.
//!
//! Staged documents are sent base64-encoded to a local vision model
//! which returns the structured fields as JSON plus a confidence
//! self-assessment. All I/O is blocking; the gate wraps the call in
//! `spawn_blocking`.

use std::fs;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{Extraction, ExtractionError, FieldExtractor};
use crate::models::{DocumentRef, ExtractedFields};

const SYSTEM_PROMPT: &str = "\
You are an intake clerk for German address-change registrations. You receive \
scans of a registration form (Anmeldung) and a landlord confirmation \
(Wohnungsgeberbestätigung). Extract the requested fields exactly as written. \
Respond with JSON only, no prose.";

const USER_PROMPT: &str = "\
Extract from the attached documents:\n\
- full_name: the citizen's full name\n\
- date_of_birth: ISO date (YYYY-MM-DD)\n\
- old_address: previous address as \"street number, postal-code city\"\n\
- new_address: new address in the same shape\n\
- move_in_date: ISO date (YYYY-MM-DD)\n\
- landlord_name: name of the landlord or property manager\n\
- confidence: your overall confidence in [0.0, 1.0]\n\
Use null for anything not legible. Respond with a single JSON object.";

pub struct RemoteExtractor {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl RemoteExtractor {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Backend(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    images: Vec<String>,
    format: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// The model's JSON answer: the fields plus its self-assessment.
#[derive(Deserialize)]
struct ModelAnswer {
    #[serde(flatten)]
    fields: ExtractedFields,
    confidence: f64,
}

/// Strip a ```json fence if the model wrapped its answer in one.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn parse_answer(raw: &str) -> Result<Extraction, ExtractionError> {
    let answer: ModelAnswer = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| ExtractionError::ResponseParsing(format!("{e}: {raw}")))?;
    Ok(Extraction {
        fields: answer.fields,
        confidence: answer.confidence.clamp(0.0, 1.0),
    })
}

impl FieldExtractor for RemoteExtractor {
    fn extract(&self, documents: &[DocumentRef]) -> Result<Extraction, ExtractionError> {
        let mut images = Vec::with_capacity(documents.len());
        for doc in documents {
            let bytes = fs::read(&doc.stored_path).map_err(|e| {
                ExtractionError::Unreadable(format!("{}: {e}", doc.stored_path))
            })?;
            images.push(base64::engine::general_purpose::STANDARD.encode(bytes));
        }

        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: USER_PROMPT,
            system: SYSTEM_PROMPT,
            images,
            format: "json",
            stream: false,
        };

        let start = std::time::Instant::now();
        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                ExtractionError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                ExtractionError::Backend("request timed out".into())
            } else {
                ExtractionError::Backend(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::Backend(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

        let extraction = parse_answer(&parsed.response)?;
        tracing::info!(
            model = %self.model,
            documents = documents.len(),
            confidence = extraction.confidence,
            elapsed_ms = %start.elapsed().as_millis(),
            "extraction completed"
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_answer() {
        let raw = r#"{
            "full_name": "Erika Mustermann",
            "date_of_birth": "1984-08-12",
            "old_address": "Beispielweg 3, 20095 Hamburg",
            "new_address": "Musterstraße 12, 10115 Berlin",
            "move_in_date": "2026-09-01",
            "landlord_name": null,
            "confidence": 0.91
        }"#;
        let extraction = parse_answer(raw).unwrap();
        assert_eq!(
            extraction.fields.full_name.as_deref(),
            Some("Erika Mustermann")
        );
        assert_eq!(extraction.fields.landlord_name, None);
        assert_eq!(extraction.confidence, 0.91);
    }

    #[test]
    fn parses_fenced_answer() {
        let raw = "```json\n{\"full_name\": \"Max\", \"confidence\": 0.5}\n```";
        let extraction = parse_answer(raw).unwrap();
        assert_eq!(extraction.fields.full_name.as_deref(), Some("Max"));
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let extraction = parse_answer(r#"{"confidence": 1.7}"#).unwrap();
        assert_eq!(extraction.confidence, 1.0);
    }

    #[test]
    fn prose_answer_is_a_parsing_error() {
        let err = parse_answer("I could not read the document, sorry.").unwrap_err();
        assert!(matches!(err, ExtractionError::ResponseParsing(_)));
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let extractor = RemoteExtractor::new("http://localhost:11434/", "gemma3:12b", 60).unwrap();
        assert_eq!(extractor.base_url, "http://localhost:11434");
    }

    #[test]
    fn missing_file_maps_to_unreadable() {
        let extractor = RemoteExtractor::new("http://localhost:11434", "gemma3:12b", 60).unwrap();
        let doc = DocumentRef {
            id: uuid::Uuid::new_v4(),
            case_id: uuid::Uuid::new_v4(),
            kind: crate::models::DocumentKind::RegistrationForm,
            filename: "gone.pdf".into(),
            sha256: String::new(),
            stored_path: "/nonexistent/gone.pdf".into(),
            uploaded_at: chrono::Utc::now(),
        };
        let err = extractor.extract(&[doc]).unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable(_)));
    }
}
