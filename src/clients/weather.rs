use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use super::PRINCETECH_BASE;
use crate::error::BotError;

#[derive(Debug, Clone)]
pub struct WeatherReport {
    pub location: String,
    pub country: String,
    pub description: String,
    pub emoji: &'static str,
    pub temperature_c: f64,
    pub feels_like_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind: Option<String>,
    pub provider: &'static str,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, city: &str) -> Result<WeatherReport, BotError>;
}

pub struct WeatherService {
    providers: Vec<Box<dyn WeatherProvider>>,
}

impl WeatherService {
    pub fn new(http: Client, princetech_api_key: &str) -> Self {
        Self {
            providers: vec![
                Box::new(PrinceTechWeather {
                    http: http.clone(),
                    api_key: princetech_api_key.to_string(),
                }),
                Box::new(OpenMeteo { http }),
            ],
        }
    }

    #[cfg(test)]
    fn with_providers(providers: Vec<Box<dyn WeatherProvider>>) -> Self {
        Self { providers }
    }

    pub async fn fetch(&self, city: &str) -> Result<WeatherReport, BotError> {
        let mut last_user_error = None;
        for provider in &self.providers {
            match provider.fetch(city).await {
                Ok(report) => return Ok(report),
                // "City not found" is an answer, not an outage; remember it
                // but still let a later provider disagree.
                Err(BotError::UserInput(msg)) => {
                    last_user_error = Some(msg);
                }
                Err(e) => warn!("{} failed: {e}", provider.name()),
            }
        }
        match last_user_error {
            Some(msg) => Err(BotError::UserInput(msg)),
            None => Err(BotError::Upstream("all weather providers failed".into())),
        }
    }
}

struct PrinceTechWeather {
    http: Client,
    api_key: String,
}

#[async_trait]
impl WeatherProvider for PrinceTechWeather {
    fn name(&self) -> &'static str {
        "PrinceTech"
    }

    async fn fetch(&self, city: &str) -> Result<WeatherReport, BotError> {
        let url = format!(
            "{PRINCETECH_BASE}/search/weather?apikey={}&location={}",
            self.api_key,
            urlencoding::encode(city)
        );
        let data: Value = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        if !data.get("success").and_then(Value::as_bool).unwrap_or(false) {
            return Err(BotError::Upstream("PrinceTech weather unsuccessful".into()));
        }
        let result = data
            .get("result")
            .ok_or_else(|| BotError::Upstream("missing weather result".into()))?;

        let description = result
            .pointer("/weather/description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let main_kind = result
            .pointer("/weather/main")
            .and_then(Value::as_str)
            .unwrap_or("");
        let temperature_c = result
            .pointer("/main/temp")
            .and_then(Value::as_f64)
            .ok_or_else(|| BotError::Upstream("missing temperature".into()))?;

        Ok(WeatherReport {
            location: result
                .get("location")
                .and_then(Value::as_str)
                .unwrap_or(city)
                .to_string(),
            country: result
                .pointer("/sys/country")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            emoji: emoji_for_condition(main_kind),
            description,
            temperature_c,
            feels_like_c: result.pointer("/main/feels_like").and_then(Value::as_f64),
            humidity_pct: result.pointer("/main/humidity").and_then(Value::as_f64),
            wind: result
                .pointer("/wind/speed")
                .and_then(Value::as_f64)
                .map(|s| format!("{s} m/s")),
            provider: self.name(),
        })
    }
}

struct OpenMeteo {
    http: Client,
}

#[async_trait]
impl WeatherProvider for OpenMeteo {
    fn name(&self) -> &'static str {
        "Open-Meteo"
    }

    async fn fetch(&self, city: &str) -> Result<WeatherReport, BotError> {
        let geo_url = format!(
            "https://geocoding-api.open-meteo.com/v1/search?name={}&count=1",
            urlencoding::encode(city)
        );
        let geo: Value = self.http.get(&geo_url).send().await?.error_for_status()?.json().await?;
        let Some(location) = geo
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
        else {
            return Err(BotError::UserInput(format!("❌ Ville '{city}' non trouvée.")));
        };

        let lat = location
            .get("latitude")
            .and_then(Value::as_f64)
            .ok_or_else(|| BotError::Upstream("missing latitude".into()))?;
        let lon = location
            .get("longitude")
            .and_then(Value::as_f64)
            .ok_or_else(|| BotError::Upstream("missing longitude".into()))?;

        let weather_url = format!(
            "https://api.open-meteo.com/v1/forecast?latitude={lat}&longitude={lon}&current_weather=true"
        );
        let data: Value = self
            .http
            .get(&weather_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let current = data
            .get("current_weather")
            .ok_or_else(|| BotError::Upstream("missing current_weather".into()))?;
        let code = current
            .get("weathercode")
            .and_then(Value::as_i64)
            .unwrap_or(-1);

        Ok(WeatherReport {
            location: location
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(city)
                .to_string(),
            country: location
                .get("country")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            emoji: emoji_for_code(code),
            description: description_for_code(code).to_string(),
            temperature_c: current
                .get("temperature")
                .and_then(Value::as_f64)
                .ok_or_else(|| BotError::Upstream("missing temperature".into()))?,
            feels_like_c: None,
            humidity_pct: None,
            wind: current
                .get("windspeed")
                .and_then(Value::as_f64)
                .map(|s| format!("{s} km/h")),
            provider: self.name(),
        })
    }
}

fn emoji_for_condition(main: &str) -> &'static str {
    let main = main.to_lowercase();
    const MAP: &[(&str, &str)] = &[
        ("clear", "☀️"),
        ("sunny", "☀️"),
        ("cloud", "☁️"),
        ("rain", "🌧️"),
        ("drizzle", "🌦️"),
        ("thunder", "⛈️"),
        ("storm", "⛈️"),
        ("snow", "❄️"),
        ("mist", "🌫️"),
        ("fog", "🌫️"),
        ("haze", "🌫️"),
    ];
    for (key, emoji) in MAP {
        if main.contains(key) {
            return emoji;
        }
    }
    "🌡️"
}

fn emoji_for_code(code: i64) -> &'static str {
    match code {
        0 => "☀️",
        1 => "🌤️",
        2 => "⛅",
        3 => "☁️",
        45 | 48 => "🌫️",
        51 | 53 | 55 | 80 | 81 | 82 => "🌦️",
        61 | 63 | 65 => "🌧️",
        71 | 73 | 75 => "❄️",
        95 | 96 | 99 => "⛈️",
        _ => "🌡️",
    }
}

fn description_for_code(code: i64) -> &'static str {
    match code {
        0 => "Ciel dégagé",
        1 | 2 => "Partiellement nuageux",
        3 => "Couvert",
        45 | 48 => "Brouillard",
        51 | 53 | 55 => "Bruine",
        61 | 63 | 65 | 80 | 81 | 82 => "Pluie",
        71 | 73 | 75 => "Neige",
        95 | 96 | 99 => "Orage",
        _ => "Conditions variables",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(provider: &'static str) -> WeatherReport {
        WeatherReport {
            location: "Paris".into(),
            country: "France".into(),
            description: "Ciel dégagé".into(),
            emoji: "☀️",
            temperature_c: 21.0,
            feels_like_c: None,
            humidity_pct: None,
            wind: None,
            provider,
        }
    }

    struct Broken;

    #[async_trait]
    impl WeatherProvider for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn fetch(&self, _: &str) -> Result<WeatherReport, BotError> {
            Err(BotError::Upstream("malformed".into()))
        }
    }

    struct Working;

    #[async_trait]
    impl WeatherProvider for Working {
        fn name(&self) -> &'static str {
            "working"
        }
        async fn fetch(&self, _: &str) -> Result<WeatherReport, BotError> {
            Ok(report("working"))
        }
    }

    struct UnknownCity;

    #[async_trait]
    impl WeatherProvider for UnknownCity {
        fn name(&self) -> &'static str {
            "unknown-city"
        }
        async fn fetch(&self, city: &str) -> Result<WeatherReport, BotError> {
            Err(BotError::UserInput(format!("❌ Ville '{city}' non trouvée.")))
        }
    }

    #[tokio::test]
    async fn test_fallback_to_second_provider() {
        let service = WeatherService::with_providers(vec![Box::new(Broken), Box::new(Working)]);
        let report = service.fetch("Paris").await.unwrap();
        assert_eq!(report.provider, "working");
    }

    #[tokio::test]
    async fn test_all_broken_is_upstream_error() {
        let service = WeatherService::with_providers(vec![Box::new(Broken), Box::new(Broken)]);
        assert!(matches!(
            service.fetch("Paris").await.unwrap_err(),
            BotError::Upstream(_)
        ));
    }

    #[tokio::test]
    async fn test_city_not_found_surfaces_as_user_input() {
        let service =
            WeatherService::with_providers(vec![Box::new(Broken), Box::new(UnknownCity)]);
        let err = service.fetch("Nulleparte").await.unwrap_err();
        match err {
            BotError::UserInput(msg) => assert!(msg.contains("Nulleparte")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_condition_emojis() {
        assert_eq!(emoji_for_condition("Clear"), "☀️");
        assert_eq!(emoji_for_condition("broken clouds"), "☁️");
        assert_eq!(emoji_for_condition("volcanic ash"), "🌡️");
        assert_eq!(emoji_for_code(0), "☀️");
        assert_eq!(emoji_for_code(95), "⛈️");
        assert_eq!(emoji_for_code(1234), "🌡️");
    }
}
