//! One-shot rendering and simulated streaming of transcript files.

use std::error::Error;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cli::load_settings;
use crate::core::parse::build_nodes;
use crate::core::stream::{run_exchange, ConversationView, RenderUpdate, ReplayTransport, StreamOutcome};
use crate::ui::markdown::MarkdownRenderer;
use crate::ui::renderer::{render_conversation, render_nodes, HtmlView, ViewOptions};
use crate::ui::theme::Theme;

fn read_transcript(path: &Path) -> Result<String, Box<dyn Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()).into())
}

pub fn render_file(path: &Path, expand_tools: bool, html_source: bool) -> Result<(), Box<dyn Error>> {
    let content = read_transcript(path)?;
    let settings = load_settings();
    let options = ViewOptions {
        expand_tools,
        html_view: if html_source {
            HtmlView::Code
        } else {
            HtmlView::Preview
        },
        copied: false,
    };

    let mut markdown = MarkdownRenderer::new(Theme::from_name(settings.theme));
    let nodes = build_nodes(&content, false);
    for line in render_nodes(&nodes, &mut markdown, settings.language.labels(), options) {
        println!("{line}");
    }
    Ok(())
}

/// One summary row per update: sequence, node count and what changed.
fn describe_update(sequence: usize, update: &RenderUpdate) -> String {
    let changed: Vec<&str> = update.changed().iter().map(|n| n.kind()).collect();
    format!(
        "#{sequence:<4} nodes={} unchanged={} changed=[{}]",
        update.nodes.len(),
        update.unchanged_prefix,
        changed.join(", ")
    )
}

pub async fn replay_file(path: &Path, chunk_size: usize, delay_ms: u64) -> Result<(), Box<dyn Error>> {
    let content = read_transcript(path)?;
    let settings = load_settings();
    let transport = ReplayTransport::new(content, chunk_size).with_delay(Duration::from_millis(delay_ms));

    let mut view = ConversationView::new(Theme::from_name(settings.theme));
    let mut sequence = 0;
    let outcome = run_exchange(
        &mut view,
        &transport,
        &path.display().to_string(),
        None,
        CancellationToken::new(),
        |update| {
            sequence += 1;
            println!("{}", describe_update(sequence, update));
        },
    )
    .await?;

    if let StreamOutcome::Failed(reason) = &outcome {
        eprintln!("⚠️  Stream failed: {reason}");
    }
    println!();
    for line in render_conversation(&mut view, settings.language.labels(), ViewOptions::default()) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scroll::ScrollAction;
    use std::sync::Arc;

    #[test]
    fn update_summary_lists_changed_kinds() {
        let nodes: Arc<[_]> = build_nodes("intro\n<thinking>hm", true).into();
        let update = RenderUpdate {
            message_id: "m".into(),
            nodes,
            unchanged_prefix: 1,
            scroll: ScrollAction::ScrollToBottom,
        };
        assert_eq!(
            describe_update(3, &update),
            "#3    nodes=2 unchanged=1 changed=[thinking]"
        );
    }

    #[test]
    fn missing_files_report_the_path() {
        let err = read_transcript(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }
}
