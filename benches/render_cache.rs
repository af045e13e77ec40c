use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pixelverse::core::parse::{build_nodes, NodeCache, RenderNode};
use pixelverse::ui::markdown::MarkdownRenderer;
use pixelverse::ui::theme::{Theme, ThemeName};

/// An assistant reply with prose, a thinking block, tool calls and code.
fn make_reply(sections: usize) -> String {
    let mut out = String::new();
    for i in 0..sections {
        out.push_str(&format!(
            "## Step {i}\n\nLorem ipsum dolor sit amet, consectetur adipiscing elit.\n\n\
             <thinking>consider option {i} and compare it to the previous one</thinking>\n\
             <tool_action name=\"search\"><query>item {i}</query></tool_action>\n\n\
             ```rust\nfn step_{i}() -> usize {{\n    {i}\n}}\n```\n\n"
        ));
    }
    out
}

/// Prefix lengths a stream of `chunk` characters would produce.
fn stream_prefixes(text: &str, chunk: usize) -> Vec<&str> {
    let mut cuts: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .step_by(chunk)
        .skip(1)
        .collect();
    cuts.push(text.len());
    cuts.into_iter().map(|end| &text[..end]).collect()
}

fn render_markdown(nodes: &[RenderNode], markdown: &mut MarkdownRenderer, cached: bool) {
    for node in nodes {
        if let RenderNode::Markdown { source } = node {
            if cached {
                let _ = markdown.render_cached(source);
            } else {
                let _ = markdown.render(source);
            }
        }
    }
}

fn bench_streaming_rederivation(c: &mut Criterion) {
    for &sections in &[4usize, 16usize] {
        let reply = make_reply(sections);
        let prefixes = stream_prefixes(&reply, 64);

        let mut group = c.benchmark_group(format!("stream_sections{sections}"));
        group.throughput(Throughput::Elements(prefixes.len() as u64));

        group.bench_function(BenchmarkId::new("no_cache", prefixes.len()), |b| {
            b.iter(|| {
                let mut markdown = MarkdownRenderer::new(Theme::from_name(ThemeName::Dark));
                for prefix in &prefixes {
                    let nodes = build_nodes(prefix, true);
                    render_markdown(&nodes, &mut markdown, false);
                }
            })
        });

        group.bench_function(BenchmarkId::new("with_cache", prefixes.len()), |b| {
            b.iter(|| {
                let mut markdown = MarkdownRenderer::new(Theme::from_name(ThemeName::Dark));
                let mut cache = NodeCache::default();
                for prefix in &prefixes {
                    let nodes = cache.nodes(prefix, true);
                    render_markdown(&nodes, &mut markdown, true);
                }
            })
        });

        group.finish();
    }
}

criterion_group!(benches, bench_streaming_rederivation);
criterion_main!(benches);
