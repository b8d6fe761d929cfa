//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `lazynote_editor` linkage with deterministic output.
//! - Convert a markdown file into document markup plus its outline.
//!
//! Usage: `lazynote_cli [markdown-file]`. Set `LAZYNOTE_EDITOR_LOG_DIR` to an
//! absolute path to enable file logging.

use lazynote_editor::extension::schema::TOP_NODE;
use lazynote_editor::{
    core_version, ingest_text, init_logging_from_config, serialize, Attrs, EditorConfig,
    ExtensionRegistry, OutlineExtractor, OutlineItem,
};
use log::{error, info};
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "LAZYNOTE_EDITOR_LOG_DIR";

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging_from_config(&EditorConfig::default(), log_dir.as_str()) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("lazynote_editor version={}", core_version());
    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match convert(path.as_str()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_convert module=cli status=error");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn convert(path: &str) -> Result<(), String> {
    let text =
        std::fs::read_to_string(path).map_err(|err| format!("cannot read `{path}`: {err}"))?;
    let (markup, items) = convert_markdown(text.as_str(), &EditorConfig::default())?;
    println!("{markup}");
    let json = serde_json::to_string_pretty(&items).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}

/// Markdown to stored markup, with derived heading ids written into the
/// markup so they match the printed outline.
fn convert_markdown(
    text: &str,
    config: &EditorConfig,
) -> Result<(String, Vec<OutlineItem>), String> {
    let kit = ExtensionRegistry::with_builtins()
        .and_then(ExtensionRegistry::build)
        .map_err(|err| err.to_string())?;
    let ingested =
        ingest_text(&kit.schema, text, config.markdown_paste).map_err(|err| err.to_string())?;
    let doc = kit
        .schema
        .node(TOP_NODE, Attrs::new(), ingested.nodes)
        .map_err(|err| err.to_string())?;

    let outline = OutlineExtractor::new(config.slug_max_chars).extract(&doc);
    let doc = outline
        .assignments
        .compose(&kit.schema, &doc)
        .map_err(|err| err.to_string())?
        .doc;
    info!(
        "event=cli_convert module=cli status=ok kind={} roots={} assigned={}",
        ingested.kind.as_str(),
        outline.items.len(),
        outline.assignments.len()
    );
    Ok((serialize(&kit.schema, &doc), outline.items))
}

#[cfg(test)]
mod tests {
    use super::convert_markdown;
    use lazynote_editor::EditorConfig;

    #[test]
    fn markup_carries_the_printed_heading_ids() {
        let (markup, items) =
            convert_markdown("# Title\n\nbody\n\n## Part", &EditorConfig::default())
                .expect("convert");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].children.len(), 1);
        for id in [&items[0].id, &items[0].children[0].id] {
            assert!(
                markup.contains(format!("id=\"{id}\"").as_str()),
                "markup lacks {id}: {markup}"
            );
        }
        assert!(markup.contains("id=\"heading-1-title-0\""));
    }
}
