use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use vellum_document::{Document, Outline};
use vellum_dom::{ExternalDom, Reconciler};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Outline document (JSON)
    pub input: PathBuf,

    /// Redraw a second time to show that nothing changes
    #[arg(long)]
    pub twice: bool,

    /// Config file (defaults to vellum.config.json in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print every mutation record
    #[arg(long)]
    pub records: bool,
}

pub async fn render(args: RenderArgs, cwd: &str) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(cwd)?,
    };
    let show_records = args.records || config.show_records;

    let doc = load_document(&args.input)?;
    debug!(nodes = doc.len(), "document loaded");

    println!(
        "{} {}",
        "🖋  Rendering".bright_blue().bold(),
        args.input.display()
    );

    let mut dom = ExternalDom::new();
    let mount = dom.create_element(&config.engine.mount_tag);
    let body = dom.root();
    dom.append_child(body, mount)?;

    let mut engine = Reconciler::new(mount, config.engine.clone());
    let passes = if args.twice { 2 } else { 1 };
    for pass in 1..=passes {
        let report = engine.redraw(&doc, &mut dom, None).await?;
        println!(
            "  {} pass {}: {} mutations, {} rendered, {} reused",
            "✓".green(),
            pass,
            report.mutations,
            report.rendered,
            report.reused
        );
        for record in dom.take_records() {
            if show_records {
                println!("    {}", serde_json::to_string(&record)?);
            }
        }
    }

    println!();
    println!("{}", dom.to_html(mount));
    Ok(())
}

fn load_document(path: &Path) -> Result<Document> {
    let source = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let outline = Outline::parse(&source).with_context(|| format!("Invalid outline in {}", path.display()))?;
    Ok(Document::from_outline(&outline)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, r#"[{ "container": "p", "children": [{ "text": "hi" }] }]"#).unwrap();
        let doc = load_document(&path).unwrap();
        assert_eq!(doc.text_content(doc.root_id()), "hi");
    }

    #[test]
    fn test_load_document_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid outline"));
    }
}
