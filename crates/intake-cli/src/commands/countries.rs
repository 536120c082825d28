//! Countries command handler

use anyhow::Result;

use intake_core::countries::fetch_countries;
use intake_core::Config;

use crate::output::Output;

/// List nationality options (falls back to a fixed list when offline)
pub async fn list(config: &Config, output: &Output) -> Result<()> {
    let countries = fetch_countries(&reqwest::Client::new(), &config.countries_url).await;
    output.print_countries(&countries)
}
