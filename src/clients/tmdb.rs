use reqwest::Client;
use serde_json::Value;

use crate::error::BotError;

#[derive(Debug, Clone)]
pub struct Movie {
    pub title: String,
    pub original_title: Option<String>,
    pub overview: String,
    pub release_date: String,
    pub vote_average: f64,
    pub vote_count: i64,
}

/// TMDB movie search, French locale. Without an API key the command
/// reports the service as unavailable.
pub struct TmdbClient {
    http: Client,
    api_key: Option<String>,
}

impl TmdbClient {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Ok(None) means the search ran but matched nothing.
    pub async fn search(&self, query: &str) -> Result<Option<Movie>, BotError> {
        let Some(api_key) = &self.api_key else {
            return Err(BotError::Upstream("TMDB API key not configured".into()));
        };
        let url = format!(
            "https://api.themoviedb.org/3/search/movie?api_key={api_key}&query={}&language=fr-FR",
            urlencoding::encode(query)
        );
        let data: Value = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        let Some(movie) = data
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
        else {
            return Ok(None);
        };

        let title = movie
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string();
        let original_title = movie
            .get("original_title")
            .and_then(Value::as_str)
            .filter(|t| *t != title)
            .map(str::to_string);

        Ok(Some(Movie {
            original_title,
            overview: movie
                .get("overview")
                .and_then(Value::as_str)
                .filter(|o| !o.is_empty())
                .unwrap_or("Pas de description disponible.")
                .to_string(),
            release_date: movie
                .get("release_date")
                .and_then(Value::as_str)
                .unwrap_or("N/A")
                .to_string(),
            vote_average: movie.get("vote_average").and_then(Value::as_f64).unwrap_or(0.0),
            vote_count: movie.get("vote_count").and_then(Value::as_i64).unwrap_or(0),
            title,
        }))
    }
}

/// One star per two rating points, "❓" for unrated films.
pub fn rating_stars(vote_average: f64) -> String {
    if vote_average > 0.0 {
        "⭐".repeat((vote_average / 2.0) as usize)
    } else {
        "❓".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_stars() {
        assert_eq!(rating_stars(8.4), "⭐⭐⭐⭐");
        assert_eq!(rating_stars(10.0), "⭐⭐⭐⭐⭐");
        assert_eq!(rating_stars(1.9), "");
        assert_eq!(rating_stars(0.0), "❓");
    }

    #[tokio::test]
    async fn test_search_without_key_is_upstream_error() {
        let client = TmdbClient::new(reqwest::Client::new(), None);
        assert!(!client.is_configured());
        assert!(matches!(
            client.search("Inception").await.unwrap_err(),
            BotError::Upstream(_)
        ));
    }
}
