//! Nationality option list

use serde::Deserialize;
use tracing::{debug, warn};

/// Public country list, names only
pub const DEFAULT_COUNTRIES_URL: &str = "https://restcountries.com/v3.1/all?fields=name";

/// Used when the country list cannot be fetched
pub fn fallback_countries() -> Vec<String> {
    vec!["Thailand".to_string(), "United States".to_string()]
}

#[derive(Debug, Deserialize)]
struct CountryEntry {
    name: CountryName,
}

#[derive(Debug, Deserialize)]
struct CountryName {
    common: String,
}

/// Parse a `[{"name":{"common":...}}, ...]` body into sorted names
pub fn parse_countries(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let entries: Vec<CountryEntry> = serde_json::from_str(body)?;
    let mut names: Vec<String> = entries
        .into_iter()
        .map(|entry| entry.name.common)
        .filter(|name| !name.trim().is_empty())
        .collect();
    names.sort_by_key(|name| name.to_lowercase());
    names.dedup();
    Ok(names)
}

/// Fetch the country list, falling back to a fixed list on any failure
pub async fn fetch_countries(http: &reqwest::Client, url: &str) -> Vec<String> {
    match try_fetch(http, url).await {
        Ok(names) if !names.is_empty() => {
            debug!(count = names.len(), "Loaded countries");
            names
        }
        Ok(_) => {
            warn!("Country list from {} was empty, using fallback", url);
            fallback_countries()
        }
        Err(e) => {
            warn!("Failed to fetch countries: {:#}", e);
            fallback_countries()
        }
    }
}

async fn try_fetch(http: &reqwest::Client, url: &str) -> anyhow::Result<Vec<String>> {
    let body = http.get(url).send().await?.error_for_status()?.text().await?;
    Ok(parse_countries(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sorts_names() {
        let body = r#"[
            {"name": {"common": "Thailand", "official": "Kingdom of Thailand"}},
            {"name": {"common": "Japan"}},
            {"name": {"common": "bhutan"}},
            {"name": {"common": "Austria"}}
        ]"#;
        assert_eq!(
            parse_countries(body).unwrap(),
            vec!["Austria", "bhutan", "Japan", "Thailand"]
        );
    }

    #[test]
    fn test_parse_rejects_unexpected_shape() {
        assert!(parse_countries(r#"{"message": "rate limited"}"#).is_err());
        assert!(parse_countries(r#"[{"name": "Japan"}]"#).is_err());
    }

    #[tokio::test]
    async fn test_fetch_failure_uses_fallback() {
        let http = reqwest::Client::new();
        let names = fetch_countries(&http, "http://127.0.0.1:9/countries").await;
        assert_eq!(names, fallback_countries());
    }
}
