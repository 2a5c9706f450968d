use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::error::BotError;

/// One backing translation service. Providers are ranked and tried in
/// order; any error advances the chain.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, BotError>;
}

#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub provider: &'static str,
}

pub struct Translator {
    providers: Vec<Box<dyn TranslationProvider>>,
}

impl Translator {
    pub fn new(http: Client, libretranslate_url: &str) -> Self {
        Self {
            providers: vec![
                Box::new(GoogleTranslate { http: http.clone() }),
                Box::new(MyMemory { http: http.clone() }),
                Box::new(PopCat { http: http.clone() }),
                Box::new(LibreTranslate {
                    http,
                    base_url: libretranslate_url.to_string(),
                }),
            ],
        }
    }

    #[cfg(test)]
    fn with_providers(providers: Vec<Box<dyn TranslationProvider>>) -> Self {
        Self { providers }
    }

    pub async fn translate(&self, text: &str, target_lang: &str) -> Result<Translation, BotError> {
        for provider in &self.providers {
            match provider.translate(text, target_lang).await {
                Ok(translated) if !translated.trim().is_empty() => {
                    return Ok(Translation {
                        text: translated,
                        provider: provider.name(),
                    });
                }
                Ok(_) => warn!("{} returned an empty translation", provider.name()),
                Err(e) => warn!("{} failed: {e}", provider.name()),
            }
        }
        Err(BotError::Upstream(
            "all translation providers failed".into(),
        ))
    }
}

/// Crude stopword check: text that reads French goes to English, anything
/// else goes to French.
pub fn auto_target_lang(text: &str) -> &'static str {
    const FRENCH_WORDS: &[&str] = &["le", "la", "les", "un", "une", "des", "et", "ou", "mais"];
    let lower = text.to_lowercase();
    let is_french = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| FRENCH_WORDS.contains(&w));
    if is_french {
        "en"
    } else {
        "fr"
    }
}

struct GoogleTranslate {
    http: Client,
}

#[async_trait]
impl TranslationProvider for GoogleTranslate {
    fn name(&self) -> &'static str {
        "Google Translate"
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, BotError> {
        let url = format!(
            "https://translate.googleapis.com/translate_a/single?client=gtx&sl=auto&tl={target_lang}&dt=t&q={}",
            urlencoding::encode(text)
        );
        let data: Value = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        // Response is a nested array; segment texts live at [0][i][0].
        let segments = data
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| BotError::Upstream("unexpected Google payload".into()))?;
        let translated: String = segments
            .iter()
            .filter_map(|seg| seg.get(0).and_then(Value::as_str))
            .collect();
        if translated.is_empty() {
            return Err(BotError::Upstream("empty Google payload".into()));
        }
        Ok(translated)
    }
}

struct MyMemory {
    http: Client,
}

#[async_trait]
impl TranslationProvider for MyMemory {
    fn name(&self) -> &'static str {
        "MyMemory"
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, BotError> {
        let url = format!(
            "https://api.mymemory.translated.net/get?q={}&langpair=auto|{target_lang}",
            urlencoding::encode(text)
        );
        let data: Value = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        data.pointer("/responseData/translatedText")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| BotError::Upstream("missing MyMemory translatedText".into()))
    }
}

struct PopCat {
    http: Client,
}

#[async_trait]
impl TranslationProvider for PopCat {
    fn name(&self) -> &'static str {
        "PopCat"
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, BotError> {
        let data: Value = self
            .http
            .get("https://api.popcat.xyz/v2/translate")
            .query(&[("to", target_lang), ("text", text)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if data.get("error").and_then(Value::as_bool).unwrap_or(true) {
            return Err(BotError::Upstream("PopCat reported an error".into()));
        }
        data.pointer("/message/translated")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BotError::Upstream("missing PopCat translation".into()))
    }
}

struct LibreTranslate {
    http: Client,
    base_url: String,
}

#[async_trait]
impl TranslationProvider for LibreTranslate {
    fn name(&self) -> &'static str {
        "LibreTranslate"
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, BotError> {
        let data: Value = self
            .http
            .post(format!("{}/translate", self.base_url))
            .json(&serde_json::json!({
                "q": text,
                "source": "auto",
                "target": target_lang,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        data.get("translatedText")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BotError::Upstream("missing LibreTranslate translatedText".into()))
    }
}
