use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::error::BotError;

#[derive(Debug, Clone)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

/// Last-resort quotes, used once every remote feed has failed.
pub const FALLBACK_QUOTES: &[(&str, &str)] = &[
    (
        "La seule façon de faire du bon travail est d'aimer ce que vous faites.",
        "Steve Jobs",
    ),
    ("L'innovation distingue un leader d'un suiveur.", "Steve Jobs"),
    (
        "La vie, c'est comme une bicyclette, il faut avancer pour ne pas perdre l'équilibre.",
        "Albert Einstein",
    ),
    (
        "Le succès, c'est d'aller d'échec en échec sans perdre son enthousiasme.",
        "Winston Churchill",
    ),
    (
        "Il n'y a qu'une façon d'échouer, c'est d'abandonner avant d'avoir réussi.",
        "Georges Clemenceau",
    ),
];

pub const FALLBACK_JOKES: &[&str] = &[
    "Pourquoi les plongeurs plongent-ils toujours en arrière et jamais en avant ? Parce que sinon, ils tombent dans le bateau !",
    "Que dit un escargot quand il croise une limace ? « Regarde, un nudiste ! »",
    "Pourquoi les poissons n'aiment pas jouer au tennis ? Parce qu'ils ont peur du filet !",
    "Que dit un informaticien quand il se noie ? F1 ! F1 !",
    "Comment appelle-t-on un boomerang qui ne revient pas ? Un bâton !",
    "Pourquoi les développeurs préfèrent-ils le mode sombre ? Parce que la lumière attire les bugs !",
];

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self) -> Result<Quote, BotError>;
}

#[async_trait]
pub trait JokeProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self) -> Result<String, BotError>;
}

pub struct FunService {
    quote_providers: Vec<Box<dyn QuoteProvider>>,
    joke_providers: Vec<Box<dyn JokeProvider>>,
}

impl FunService {
    pub fn new(http: Client) -> Self {
        Self {
            quote_providers: vec![Box::new(Quotable { http: http.clone() })],
            joke_providers: vec![Box::new(JokeApi { http })],
        }
    }

    #[cfg(test)]
    fn with_providers(
        quote_providers: Vec<Box<dyn QuoteProvider>>,
        joke_providers: Vec<Box<dyn JokeProvider>>,
    ) -> Self {
        Self {
            quote_providers,
            joke_providers,
        }
    }

    /// Never fails: the curated list covers total provider outage.
    pub async fn random_quote(&self) -> Quote {
        for provider in &self.quote_providers {
            match provider.fetch().await {
                Ok(quote) => return quote,
                Err(e) => warn!("{} failed: {e}", provider.name()),
            }
        }
        let (text, author) = FALLBACK_QUOTES[pick(FALLBACK_QUOTES.len())];
        Quote {
            text: text.to_string(),
            author: author.to_string(),
        }
    }

    pub async fn random_joke(&self) -> String {
        for provider in &self.joke_providers {
            match provider.fetch().await {
                Ok(joke) => return joke,
                Err(e) => warn!("{} failed: {e}", provider.name()),
            }
        }
        FALLBACK_JOKES[pick(FALLBACK_JOKES.len())].to_string()
    }
}

/// Cheap index without pulling in an RNG crate: subsecond nanos modulo len.
fn pick(len: usize) -> usize {
    (chrono::Utc::now().timestamp_subsec_nanos() as usize) % len.max(1)
}

struct Quotable {
    http: Client,
}

#[async_trait]
impl QuoteProvider for Quotable {
    fn name(&self) -> &'static str {
        "quotable.io"
    }

    async fn fetch(&self) -> Result<Quote, BotError> {
        let data: Value = self
            .http
            .get("https://api.quotable.io/random")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let text = data
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| BotError::Upstream("missing quote content".into()))?;
        let author = data
            .get("author")
            .and_then(Value::as_str)
            .unwrap_or("Inconnu");
        Ok(Quote {
            text: text.to_string(),
            author: author.to_string(),
        })
    }
}

struct JokeApi {
    http: Client,
}

#[async_trait]
impl JokeProvider for JokeApi {
    fn name(&self) -> &'static str {
        "JokeAPI"
    }

    async fn fetch(&self) -> Result<String, BotError> {
        let data: Value = self
            .http
            .get("https://v2.jokeapi.dev/joke/Any?blacklistFlags=nsfw,religious,political,racist,sexist,explicit&type=single")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if data.get("type").and_then(Value::as_str) != Some("single") {
            return Err(BotError::Upstream("unexpected joke shape".into()));
        }
        data.get("joke")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BotError::Upstream("missing joke".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenQuote;

    #[async_trait]
    impl QuoteProvider for BrokenQuote {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn fetch(&self) -> Result<Quote, BotError> {
            Err(BotError::Upstream("down".into()))
        }
    }

    struct BrokenJoke;

    #[async_trait]
    impl JokeProvider for BrokenJoke {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn fetch(&self) -> Result<String, BotError> {
            Err(BotError::Upstream("down".into()))
        }
    }

    struct FixedQuote;

    #[async_trait]
    impl QuoteProvider for FixedQuote {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn fetch(&self) -> Result<Quote, BotError> {
            Ok(Quote {
                text: "Connais-toi toi-même.".into(),
                author: "Socrate".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_quote_provider_result_used_when_available() {
        let service =
            FunService::with_providers(vec![Box::new(BrokenQuote), Box::new(FixedQuote)], vec![]);
        let quote = service.random_quote().await;
        assert_eq!(quote.author, "Socrate");
    }

    #[tokio::test]
    async fn test_quote_falls_back_to_curated_list() {
        let service = FunService::with_providers(vec![Box::new(BrokenQuote)], vec![]);
        let quote = service.random_quote().await;
        assert!(FALLBACK_QUOTES.iter().any(|(q, _)| *q == quote.text));
    }

    #[tokio::test]
    async fn test_joke_falls_back_to_curated_list() {
        let service = FunService::with_providers(vec![], vec![Box::new(BrokenJoke)]);
        let joke = service.random_joke().await;
        assert!(FALLBACK_JOKES.contains(&joke.as_str()));
    }
}
