use reqwest::Client;
use serde_json::Value;

use super::PRINCETECH_BASE;
use crate::error::BotError;

/// PrinceTech API surface: GPT completion, wikimedia article lookup, and
/// the media download endpoints. Every call is a GET with the API key as a
/// query parameter and a `{success, result}` JSON envelope.
pub struct PrinceTechClient {
    http: Client,
    api_key: String,
}

#[derive(Debug, Clone)]
pub struct ArticleSummary {
    pub title: String,
    pub extract: String,
    pub page_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VideoDownload {
    pub media_url: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub duration: Option<String>,
    pub is_hd: bool,
}

#[derive(Debug, Clone)]
pub struct ApkDownload {
    pub download_url: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    TikTok,
    Facebook,
    Instagram,
    Twitter,
    Pinterest,
}

impl VideoSource {
    pub fn endpoint(self) -> &'static str {
        match self {
            VideoSource::TikTok => "download/tiktokdlv3",
            VideoSource::Facebook => "download/facebook",
            VideoSource::Instagram => "download/instadl",
            VideoSource::Twitter => "download/twitter",
            VideoSource::Pinterest => "download/pinterestdl",
        }
    }

    /// Preference order for the media URL field, best quality first.
    fn media_keys(self) -> &'static [&'static str] {
        match self {
            VideoSource::TikTok => &["video", "videoUrl"],
            VideoSource::Facebook => &["hd", "sd", "video"],
            VideoSource::Instagram => &["url", "video"],
            VideoSource::Twitter => &["video", "url"],
            VideoSource::Pinterest => &["video", "url"],
        }
    }
}

impl PrinceTechClient {
    pub fn new(http: Client, api_key: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
        }
    }

    async fn call(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, BotError> {
        let mut query: Vec<(&str, &str)> = vec![("apikey", self.api_key.as_str())];
        query.extend_from_slice(params);
        let data: Value = self
            .http
            .get(format!("{PRINCETECH_BASE}/{path}"))
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !data.get("success").and_then(Value::as_bool).unwrap_or(false) {
            return Err(BotError::Upstream(format!("{path} reported failure")));
        }
        data.get("result")
            .cloned()
            .ok_or_else(|| BotError::Upstream(format!("{path} returned no result")))
    }

    pub async fn ask_gpt(&self, prompt: &str) -> Result<String, BotError> {
        let result = self.call("ai/gpt", &[("q", prompt)]).await?;
        result
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| BotError::Upstream("empty GPT result".into()))
    }

    pub async fn wikimedia_summary(&self, topic: &str) -> Result<ArticleSummary, BotError> {
        let result = self.call("search/wikimedia", &[("title", topic)]).await?;
        Ok(ArticleSummary {
            title: result
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(topic)
                .to_string(),
            extract: result
                .get("extract")
                .and_then(Value::as_str)
                .unwrap_or("Aucune information disponible.")
                .to_string(),
            page_url: result
                .pointer("/content_urls/desktop/page")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    pub async fn download_video(
        &self,
        source: VideoSource,
        url: &str,
    ) -> Result<VideoDownload, BotError> {
        let result = self.call(source.endpoint(), &[("url", url)]).await?;
        let media_url = first_string(&result, source.media_keys())
            .ok_or_else(|| BotError::Upstream("no media URL in download result".into()))?;
        Ok(VideoDownload {
            is_hd: result.get("hd").and_then(Value::as_str).is_some(),
            media_url,
            title: result.get("title").and_then(Value::as_str).map(str::to_string),
            author: result.get("author").and_then(Value::as_str).map(str::to_string),
            duration: result
                .get("duration")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    pub async fn download_apk(&self, app_name: &str) -> Result<ApkDownload, BotError> {
        let result = self
            .call("download/apkdl", &[("appName", app_name)])
            .await?;
        let download_url = first_string(&result, &["dllink", "download"])
            .ok_or_else(|| BotError::Upstream("no APK URL in download result".into()))?;
        Ok(ApkDownload {
            download_url,
            name: result.get("name").and_then(Value::as_str).map(str::to_string),
            version: result
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string),
            size: result.get("size").and_then(Value::as_str).map(str::to_string),
        })
    }
}

fn first_string(result: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| result.get(k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
