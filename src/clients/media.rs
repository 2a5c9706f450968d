use reqwest::Client;
use serde_json::Value;

use crate::error::BotError;

#[derive(Debug, Clone)]
pub struct Meme {
    pub title: String,
    pub media_url: String,
    pub subreddit: String,
    pub author: String,
    pub ups: i64,
    pub post_link: String,
    pub spoiler: bool,
    pub animated: bool,
}

pub struct MemeClient {
    http: Client,
}

impl MemeClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Fetches a random meme; NSFW posts are rejected as a user-facing
    /// notice rather than an outage.
    pub async fn random(&self) -> Result<Meme, BotError> {
        let data: Value = self
            .http
            .get("https://meme-api.com/gimme")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if data.get("nsfw").and_then(Value::as_bool).unwrap_or(false) {
            return Err(BotError::UserInput(
                "🔞 **Contenu NSFW détecté**\n\nCe meme ne peut pas être affiché. Réessayez pour en obtenir un autre !".into(),
            ));
        }

        let media_url = data
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| BotError::Upstream("meme without media URL".into()))?
            .to_string();

        Ok(Meme {
            title: data
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("Meme sans titre")
                .to_string(),
            animated: is_animated(&media_url),
            media_url,
            subreddit: data
                .get("subreddit")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            author: data
                .get("author")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            ups: data.get("ups").and_then(Value::as_i64).unwrap_or(0),
            post_link: data
                .get("postLink")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            spoiler: data.get("spoiler").and_then(Value::as_bool).unwrap_or(false),
        })
    }
}

fn is_animated(url: &str) -> bool {
    url.ends_with(".gif") || url.ends_with(".mp4") || url.ends_with(".webm")
}

/// 300x300 PNG from the QR Server API. The URL itself is the fallback: if
/// sending it as a photo fails, the caller hands the link out as text.
pub fn qr_image_url(text: &str) -> String {
    format!(
        "https://api.qrserver.com/v1/create-qr-code/?size=300x300&data={}",
        urlencoding::encode(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_animated() {
        assert!(is_animated("https://i.redd.it/x.gif"));
        assert!(is_animated("https://v.redd.it/x.mp4"));
        assert!(is_animated("https://v.redd.it/x.webm"));
        assert!(!is_animated("https://i.redd.it/x.png"));
        assert!(!is_animated("https://i.redd.it/x.jpg"));
    }

    #[test]
    fn test_qr_image_url_encodes_payload() {
        let url = qr_image_url("hello world & co");
        assert!(url.starts_with("https://api.qrserver.com/v1/create-qr-code/?size=300x300&data="));
        assert!(url.contains("hello%20world%20%26%20co"));
    }
}
