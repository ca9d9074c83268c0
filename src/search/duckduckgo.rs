//! DuckDuckGo image search.
//!
//! The image endpoint needs a per-query token that only the HTML landing page
//! hands out, so every query costs two requests.
use super::{Candidate, Candidates, RelevanceTerms, SearchProvider};
use crate::error::ProviderError;
use crate::http::HttpClient;
use crate::record::{CarQuery, Dimensions};
use regex::Regex;
use serde::Deserialize;

const LANDING_URL: &str = "https://duckduckgo.com/";
const IMAGES_URL: &str = "https://duckduckgo.com/i.js";
const DEFAULT_REGION: &str = "fr-fr";

#[derive(Debug, Deserialize)]
struct ImageResults {
    #[serde(default)]
    results: Vec<ImageResult>,
}

#[derive(Debug, Deserialize)]
struct ImageResult {
    image: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

pub struct DuckDuckGo {
    client: HttpClient,
    region: String,
}

impl DuckDuckGo {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            region: DEFAULT_REGION.to_string(),
        }
    }
}

impl SearchProvider for DuckDuckGo {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    fn search(&mut self, query: &CarQuery) -> Result<Candidates<'_>, ProviderError> {
        let text = query_text(query);
        let landing = self.client.get_text(
            LANDING_URL,
            &[("q", text.as_str()), ("iax", "images"), ("ia", "images")],
        )?;
        let token = extract_vqd(&landing)
            .ok_or_else(|| ProviderError::Layout("landing page carries no vqd token".to_string()))?;
        let results: ImageResults = self.client.get_json(
            IMAGES_URL,
            &[
                ("l", self.region.as_str()),
                ("o", "json"),
                ("q", text.as_str()),
                ("vqd", token.as_str()),
                ("f", ",,,,,"),
                ("p", "1"),
            ],
            LANDING_URL,
        )?;
        tracing::debug!(query = %query, results = results.results.len(), "duckduckgo results");
        Ok(Box::new(relevant_candidates(
            results.results,
            RelevanceTerms::new(query),
        )))
    }
}

fn query_text(query: &CarQuery) -> String {
    format!("{} {} {}", query.make, query.model, query.year)
}

fn extract_vqd(page: &str) -> Option<String> {
    let pattern = Regex::new(r#"vqd["']?\s*[=:]\s*["']?([0-9-]+)"#).expect("regex for vqd token");
    pattern
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Keep results whose URL mentions the make, the model or the year.
fn relevant_candidates(
    results: Vec<ImageResult>,
    terms: RelevanceTerms,
) -> impl Iterator<Item = Candidate> {
    results
        .into_iter()
        .filter(|result| result.image.starts_with("http"))
        .filter(move |result| terms.mentioned_in(&result.image))
        .map(|result| Candidate {
            discovered: match (result.width, result.height) {
                (Some(width), Some(height)) => Some(Dimensions::new(width, height)),
                _ => None,
            },
            url: result.image,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vqd_token_is_found_in_both_page_styles() {
        assert_eq!(
            extract_vqd("...;vqd='4-1234567890123';..."),
            Some("4-1234567890123".to_string())
        );
        assert_eq!(
            extract_vqd(r#"{"vqd":"4-998877"}"#),
            Some("4-998877".to_string())
        );
        assert_eq!(
            extract_vqd(r#"<script>vqd = "4-31415";</script>"#),
            Some("4-31415".to_string())
        );
        assert_eq!(extract_vqd("<html>nothing here</html>"), None);
    }

    #[test]
    fn results_are_filtered_by_url_relevance() {
        let results: ImageResults = serde_json::from_value(serde_json::json!({
            "results": [
                {"image": "https://cdn.example.com/peugeot-205-gti.jpg", "width": 1920, "height": 1080},
                {"image": "https://cdn.example.com/random.jpg", "width": 1920, "height": 1080},
                {"image": "https://cdn.example.com/1987/front.jpg"},
                {"image": "data:image/png;base64,AAAA"}
            ]
        }))
        .expect("parse results");
        let query = CarQuery {
            make: "Peugeot".to_string(),
            model: "205".to_string(),
            year: 1987,
        };
        let candidates: Vec<Candidate> =
            relevant_candidates(results.results, RelevanceTerms::new(&query)).collect();
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0].discovered,
            Some(Dimensions::new(1920, 1080))
        );
        assert_eq!(candidates[1].url, "https://cdn.example.com/1987/front.jpg");
        assert_eq!(candidates[1].discovered, None);
        assert_eq!(query_text(&query), "Peugeot 205 1987");
    }
}
