use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Tag of the mount element
    #[arg(short, long, default_value = "div")]
    pub mount_tag: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

const EXAMPLE_OUTLINE: &str = r#"[
  { "container": "h1", "children": [{ "text": "Hello" }] },
  { "container": "p", "attributes": { "class": "lead" }, "children": [
    { "text": "Two  spaces, " },
    { "text": "bold", "formats": ["b"] },
    "lineBreak",
    { "atomic": "img", "attributes": { "src": "logo.png" } }
  ] }
]
"#;

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Vellum project...".bright_blue().bold());

    let example_file = PathBuf::from(cwd).join("example.json");
    if !example_file.exists() {
        fs::write(&example_file, EXAMPLE_OUTLINE)?;
        println!("  {} Created example.json", "✓".green());
    }

    let mut config = Config::default();
    config.engine.mount_tag = args.mount_tag;
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    println!();
    println!("Run {} to see it drawn", "vellum render example.json".bright_white());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_document::Outline;

    #[test]
    fn test_init_writes_loadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        init(
            InitArgs {
                mount_tag: "main".to_string(),
                force: false,
            },
            &cwd,
        )
        .unwrap();

        let config = Config::load(&cwd).unwrap();
        assert_eq!(config.engine.mount_tag, "main");
        let example = fs::read_to_string(dir.path().join("example.json")).unwrap();
        assert_eq!(Outline::parse(&example).unwrap().len(), 2);
    }
}
