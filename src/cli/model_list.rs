//! Model listing from the backend, optionally narrowed to one provider.

use std::error::Error;

use crate::api::{ApiClient, Model};
use crate::cli::{load_settings, print_markdown};
use crate::core::config::Config;
use crate::ui::i18n::Labels;

fn model_table(models: &[Model], labels: &Labels) -> String {
    let mut table =
        String::from("| ID | Provider | Name | Model | Type | Context |\n|---|---|---|---|---|--:|\n");
    for model in models {
        let name = if model.is_default {
            format!("{} ({})", model.name, labels.default)
        } else {
            model.name.clone()
        };
        let context = model
            .context_length
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            model.id,
            model.provider_id,
            name.replace('|', "\\|"),
            model.model_id.replace('|', "\\|"),
            model.kind.as_str(),
            context
        ));
    }
    table
}

pub async fn list_models(provider: Option<&str>) -> Result<(), Box<dyn Error>> {
    let api = ApiClient::new(&Config::load()?.api_settings())?;
    let models = match provider {
        Some(id) => api.models(id).await?,
        None => api.all_models().await?,
    };
    if models.is_empty() {
        match provider {
            Some(id) => println!("No models configured for provider {id}."),
            None => println!("No models configured."),
        }
        return Ok(());
    }

    let settings = load_settings();
    let labels = settings.language.labels();
    let content = format!("{}:\n\n{}", labels.models, model_table(&models, labels));
    print_markdown(&content, &settings);
    Ok(())
}
