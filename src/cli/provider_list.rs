use std::error::Error;

use crate::api::{ApiClient, Provider};
use crate::cli::{load_settings, print_markdown};
use crate::core::config::Config;

/// Pipes would break the markdown table.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn provider_table(providers: &[Provider]) -> String {
    let mut table = String::from("| ID | Name | Type | Base URL |\n|---|---|---|---|\n");
    for provider in providers {
        table.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            cell(&provider.id),
            cell(&provider.name),
            cell(&provider.kind),
            cell(&provider.base_url)
        ));
    }
    table
}

pub async fn list_providers() -> Result<(), Box<dyn Error>> {
    let api = ApiClient::new(&Config::load()?.api_settings())?;
    let providers = api.providers().await?;
    if providers.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }

    let settings = load_settings();
    let content = format!(
        "{}:\n\n{}",
        settings.language.labels().providers,
        provider_table(&providers)
    );
    print_markdown(&content, &settings);
    Ok(())
}
