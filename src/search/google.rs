//! Google image search, scraped from the HTML results page.
use super::{Candidate, Candidates, RelevanceTerms, SearchProvider};
use crate::error::ProviderError;
use crate::http::HttpClient;
use crate::record::CarQuery;
use regex::Regex;

const SEARCH_URL: &str = "https://www.google.com/search";

pub struct Google {
    client: HttpClient,
}

impl Google {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl SearchProvider for Google {
    fn name(&self) -> &'static str {
        "google"
    }

    fn search(&mut self, query: &CarQuery) -> Result<Candidates<'_>, ProviderError> {
        let text = format!("{} {}", query.model, query.make);
        let page = self.client.get_text(
            SEARCH_URL,
            &[("q", text.as_str()), ("tbm", "isch"), ("hl", "fr")],
        )?;
        let images = image_tags(&page);
        if images.is_empty() {
            return Err(ProviderError::Layout(
                "results page contains no <img> tags".to_string(),
            ));
        }
        let terms = RelevanceTerms::new(query);
        Ok(Box::new(
            images
                .into_iter()
                .filter(move |tag| terms.make_in(&tag.alt))
                .map(|tag| Candidate::new(tag.src)),
        ))
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ImageTag {
    alt: String,
    src: String,
}

/// Every `<img>` carrying both an `alt` and an absolute http(s) `src`.
fn image_tags(page: &str) -> Vec<ImageTag> {
    let tag = Regex::new(r"(?is)<img\b[^>]*>").expect("regex for img tags");
    let alt_attr = Regex::new(r#"(?i)\balt\s*=\s*"([^"]*)""#).expect("regex for alt attribute");
    let src_attr = Regex::new(r#"(?i)\bsrc\s*=\s*"([^"]*)""#).expect("regex for src attribute");
    tag.find_iter(page)
        .filter_map(|found| {
            let text = found.as_str();
            let alt = alt_attr.captures(text)?.get(1)?.as_str();
            let src = decode_entities(src_attr.captures(text)?.get(1)?.as_str());
            if !(src.starts_with("http://") || src.starts_with("https://")) {
                return None;
            }
            Some(ImageTag {
                alt: decode_entities(alt),
                src,
            })
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <img class="logo" src="/images/branding/logo.png" alt="Google">
        <img alt="Renault Clio IV 2016 rouge" src="https://encrypted-tbn0.gstatic.com/images?q=tbn:A&amp;s=1">
        <img src="https://encrypted-tbn0.gstatic.com/images?q=tbn:B" alt="Peugeot 208">
        <IMG ALT="renault clio" SRC="https://example.com/clio.jpg" />
        <img src="data:image/gif;base64,R0lGOD" alt="Renault">
        </body></html>
    "#;

    #[test]
    fn image_tags_keep_absolute_sources_with_alt_text() {
        let tags = image_tags(PAGE);
        assert_eq!(tags.len(), 3);
        assert_eq!(
            tags[0].src,
            "https://encrypted-tbn0.gstatic.com/images?q=tbn:A&s=1"
        );
        assert_eq!(tags[1].alt, "Peugeot 208");
    }

    #[test]
    fn make_filter_applies_to_alt_text() {
        let query = CarQuery {
            make: "Renault".to_string(),
            model: "Clio".to_string(),
            year: 2016,
        };
        let terms = RelevanceTerms::new(&query);
        let urls: Vec<String> = image_tags(PAGE)
            .into_iter()
            .filter(|tag| terms.make_in(&tag.alt))
            .map(|tag| tag.src)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://encrypted-tbn0.gstatic.com/images?q=tbn:A&s=1".to_string(),
                "https://example.com/clio.jpg".to_string(),
            ]
        );
    }
}
