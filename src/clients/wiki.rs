use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::error::BotError;

#[derive(Debug, Clone)]
pub struct WikiArticle {
    pub title: String,
    pub extract: String,
    pub page_url: String,
}

/// French Wikipedia lookup: the REST summary endpoint first, then the
/// full-text search API when the exact page does not exist.
pub struct WikiClient {
    http: Client,
}

impl WikiClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Ok(None) when neither the direct page nor the search finds anything.
    pub async fn summary(&self, term: &str) -> Result<Option<WikiArticle>, BotError> {
        let url = format!(
            "https://fr.wikipedia.org/api/rest_v1/page/summary/{}",
            urlencoding::encode(term)
        );
        let response = self.http.get(&url).send().await?;
        if response.status().is_success() {
            let data: Value = response.json().await?;
            return Ok(Some(WikiArticle {
                title: data
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or(term)
                    .to_string(),
                extract: data
                    .get("extract")
                    .and_then(Value::as_str)
                    .unwrap_or("Aucun résumé disponible.")
                    .to_string(),
                page_url: data
                    .pointer("/content_urls/desktop/page")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            }));
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(BotError::Upstream(format!(
                "wikipedia summary returned {}",
                response.status()
            )));
        }

        self.search_fallback(term).await
    }

    async fn search_fallback(&self, term: &str) -> Result<Option<WikiArticle>, BotError> {
        let url = format!(
            "https://fr.wikipedia.org/w/api.php?action=query&format=json&list=search&srsearch={}&srlimit=1",
            urlencoding::encode(term)
        );
        let data: Value = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        let Some(hit) = data
            .pointer("/query/search")
            .and_then(Value::as_array)
            .and_then(|hits| hits.first())
        else {
            return Ok(None);
        };

        let title = hit
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(term)
            .to_string();
        let snippet = hit.get("snippet").and_then(Value::as_str).unwrap_or("");
        Ok(Some(WikiArticle {
            page_url: format!(
                "https://fr.wikipedia.org/wiki/{}",
                title.replace(' ', "_")
            ),
            extract: format!("{}...", strip_html(snippet)),
            title,
        }))
    }
}

fn strip_html(snippet: &str) -> String {
    match Regex::new("<[^>]*>") {
        Ok(re) => re.replace_all(snippet, "").to_string(),
        Err(_) => snippet.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("le <span class=\"searchmatch\">chat</span> noir"),
            "le chat noir"
        );
        assert_eq!(strip_html("sans balises"), "sans balises");
    }
}
