//! Command-line interface parsing and dispatch.

pub mod model_list;
pub mod provider_list;
pub mod render;
pub mod settings;
pub mod theme_list;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::core::config::{ConfigStore, Settings};
use crate::core::parse::RenderNode;
use crate::ui::markdown::MarkdownRenderer;
use crate::ui::renderer::{render_nodes, ViewOptions};
use crate::ui::theme::Theme;
use crate::utils::logging;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    " ",
    env!("VERGEN_GIT_SHA"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

#[derive(Parser)]
#[command(name = "pixelverse")]
#[command(about = "Render and replay streamed chat transcripts in the terminal")]
#[command(version, long_version = LONG_VERSION)]
#[command(long_about = "Pixelverse parses streamed assistant output (markdown, thinking blocks \
and tool calls) into render nodes and prints them with the configured theme and language.\n\n\
Environment Variables:\n\
  PIXELVERSE_API_BASE_URL   Backend base URL (overrides the config file)\n\
  PIXELVERSE_API_KEY        Backend bearer token (overrides the config file)\n\
  RUST_LOG                  Diagnostic log filter (overrides -v)")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase diagnostic output on stderr (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a finished assistant message from a file
    Render {
        file: PathBuf,
        /// Show parsed parameters under each tool group
        #[arg(long)]
        expand_tools: bool,
        /// Show HTML blocks as source instead of a preview
        #[arg(long)]
        html_source: bool,
    },
    /// Replay a file as a simulated stream and print each render update
    Replay {
        file: PathBuf,
        /// Characters per streamed chunk
        #[arg(long, default_value_t = 16)]
        chunk_size: usize,
        /// Pause between chunks, in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Read or change persisted settings (theme, language)
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// List the built-in themes
    Themes,
    /// List providers configured on the backend
    Providers,
    /// List models configured on the backend
    Models {
        /// Only list models of this provider id
        provider: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print one setting, or all of them
    Get { key: Option<String> },
    /// Validate and store a setting
    Set { key: String, value: String },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    let result = match args.command {
        Commands::Render {
            file,
            expand_tools,
            html_source,
        } => render::render_file(&file, expand_tools, html_source),
        Commands::Replay {
            file,
            chunk_size,
            delay_ms,
        } => render::replay_file(&file, chunk_size, delay_ms).await,
        Commands::Settings { action } => match action {
            SettingsAction::Get { key } => settings::get(key.as_deref()),
            SettingsAction::Set { key, value } => settings::set(&key, &value),
        },
        Commands::Themes => theme_list::list_themes(),
        Commands::Providers => provider_list::list_providers().await,
        Commands::Models { provider } => model_list::list_models(provider.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
    Ok(())
}

/// Persisted settings, or defaults when the config file cannot be read.
pub(crate) fn load_settings() -> Settings {
    match ConfigStore::open_default() {
        Ok(store) => Settings::load(&store),
        Err(err) => {
            warn!(error = %err, "could not read settings, using defaults");
            Settings::default()
        }
    }
}

/// Print markdown through the renderer using the persisted theme and language.
pub(crate) fn print_markdown(content: &str, settings: &Settings) {
    let mut markdown = MarkdownRenderer::new(Theme::from_name(settings.theme));
    let nodes = [RenderNode::Markdown {
        source: content.to_string(),
    }];
    let lines = render_nodes(
        &nodes,
        &mut markdown,
        settings.language.labels(),
        ViewOptions::default(),
    );
    for line in lines {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_replay_with_defaults() {
        let args = Args::try_parse_from(["pixelverse", "-vv", "replay", "chat.txt"]).unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Commands::Replay {
                file,
                chunk_size,
                delay_ms,
            } => {
                assert_eq!(file, PathBuf::from("chat.txt"));
                assert_eq!(chunk_size, 16);
                assert_eq!(delay_ms, 0);
            }
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn parses_settings_set() {
        let args =
            Args::try_parse_from(["pixelverse", "settings", "set", "theme", "cyber"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Settings {
                action: SettingsAction::Set { ref key, ref value }
            } if key == "theme" && value == "cyber"
        ));
    }
}
