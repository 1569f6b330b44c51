// location.rs
use async_trait::async_trait;
use log::debug;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::Ollama;
use reqwest::Url;
use serde::Deserialize;

/// Place names found in a piece of text, most relevant first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedLocations {
    #[serde(default)]
    pub locations: Vec<String>,
}

impl ExtractedLocations {
    /// The location the map should follow, if any.
    pub fn primary(&self) -> Option<&str> {
        self.locations.first().map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Ollama error: {0}")]
    Service(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid Ollama host: {0}")]
    Host(String),
}

/// Finds place names in free text.
#[async_trait(?Send)]
pub trait LocationExtractor {
    async fn extract_locations(&self, text: &str) -> Result<ExtractedLocations, LocationError>;
}

const EXTRACTION_PROMPT: &str = "You extract geographic locations from questions about ocean data. \
List every ocean, sea, bay, gulf, strait, coast, country or city mentioned in the question, \
most specific first. Reply with JSON only, in the form {\"locations\": [\"...\"]}. \
Reply {\"locations\": []} when there is none.\n\nQuestion: ";

/// Location extraction backed by a local Ollama model.
pub struct OllamaLocationExtractor {
    ollama: Ollama,
    model: String,
}

impl OllamaLocationExtractor {
    /// Creates an extractor talking to the Ollama server at `host:port`.
    ///
    /// # Arguments
    /// * `host` - Base URL including the scheme, e.g. `http://localhost`.
    ///
    /// # Returns
    /// * `Err(LocationError::Host)` if `host` is not an http(s) URL that can carry a port.
    pub fn new(host: impl Into<String>, port: u16, model: impl Into<String>) -> Result<Self, LocationError> {
        let host = host.into();
        check_host(&host, port)?;
        Ok(Self {
            ollama: Ollama::new(host, port),
            model: model.into(),
        })
    }
}

/// `Ollama::new` panics on a host it cannot turn into a URL, so reject those here.
fn check_host(host: &str, port: u16) -> Result<(), LocationError> {
    let mut url = Url::parse(host).map_err(|e| LocationError::Host(format!("'{}': {}", host, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(LocationError::Host(format!("'{}': expected http:// or https://", host)));
    }
    url.set_port(Some(port))
        .map_err(|_| LocationError::Host(format!("'{}' cannot take port {}", host, port)))
}

#[async_trait(?Send)]
impl LocationExtractor for OllamaLocationExtractor {
    async fn extract_locations(&self, text: &str) -> Result<ExtractedLocations, LocationError> {
        let prompt = format!("{}{}", EXTRACTION_PROMPT, text);
        let request = GenerationRequest::new(self.model.clone(), prompt);

        let response = self
            .ollama
            .generate(request)
            .await
            .map_err(|e| LocationError::Service(e.to_string()))?;
        debug!("location model replied: {}", response.response);

        parse_locations(&response.response)
    }
}

/// Stands in when location lookup is turned off; never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLocationExtractor;

#[async_trait(?Send)]
impl LocationExtractor for DisabledLocationExtractor {
    async fn extract_locations(&self, _text: &str) -> Result<ExtractedLocations, LocationError> {
        Ok(ExtractedLocations::default())
    }
}

/// Pulls the `{"locations": [...]}` object out of a model reply.
///
/// Models like to wrap JSON in prose or code fences, so the outermost braces
/// are located first. Blank names are dropped.
pub fn parse_locations(reply: &str) -> Result<ExtractedLocations, LocationError> {
    let start = reply
        .find('{')
        .ok_or_else(|| LocationError::Parse(format!("no JSON object in reply: {}", reply)))?;
    let end = reply
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| LocationError::Parse(format!("unterminated JSON in reply: {}", reply)))?;

    let mut extracted: ExtractedLocations = serde_json::from_str(&reply[start..=end])
        .map_err(|e| LocationError::Parse(e.to_string()))?;

    extracted.locations = extracted
        .locations
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let found = parse_locations(r#"{"locations": ["Bay of Bengal", "Chennai"]}"#).unwrap();
        assert_eq!(found.primary(), Some("Bay of Bengal"));
        assert_eq!(found.locations.len(), 2);
    }

    #[test]
    fn test_parse_fenced_reply_and_drop_blanks() {
        let reply = "Sure! Here you go:\n```json\n{\"locations\": [\"  \", \" Arabian Sea \"]}\n```";
        let found = parse_locations(reply).unwrap();
        assert_eq!(found.locations, vec!["Arabian Sea".to_string()]);
    }

    #[test]
    fn test_parse_empty_and_missing_field() {
        assert_eq!(parse_locations(r#"{"locations": []}"#).unwrap().primary(), None);
        assert_eq!(parse_locations("{}").unwrap(), ExtractedLocations::default());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(parse_locations("no places here"), Err(LocationError::Parse(_))));
        assert!(matches!(parse_locations("} backwards {"), Err(LocationError::Parse(_))));
        assert!(matches!(
            parse_locations(r#"{"locations": "Bay of Bengal"}"#),
            Err(LocationError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_extractor_finds_nothing() {
        let found = DisabledLocationExtractor
            .extract_locations("temperature in the Red Sea")
            .await
            .unwrap();
        assert!(found.locations.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_ollama_is_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let extractor = OllamaLocationExtractor::new("http://127.0.0.1", port, "llama3.2:latest").unwrap();
        let result = extractor.extract_locations("Bay of Bengal").await;
        assert!(matches!(result, Err(LocationError::Service(_))));
    }

    #[test]
    fn test_host_without_scheme_is_error() {
        for host in ["localhost", "localhost:11434", "127.0.0.1", "", "ftp://localhost"] {
            let result = OllamaLocationExtractor::new(host, 11434, "llama3.2:latest");
            assert!(matches!(result, Err(LocationError::Host(_))), "host {:?} was accepted", host);
        }
        assert!(OllamaLocationExtractor::new("https://ollama.internal", 443, "llama3.2:latest").is_ok());
    }
}
