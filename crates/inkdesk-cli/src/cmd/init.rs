use anyhow::Context;
use inkdesk_core::config::Config;
use inkdesk_core::paths;
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let studio_name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "studio".to_string());

    println!("Initializing inkdesk in: {}", root.display());

    let dir = paths::inkdesk_dir(root);
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    if paths::config_path(root).exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        Config::new(&studio_name)
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    }

    println!(
        "\nNext: set gateway.url in {} and export the API key variable it names.",
        paths::CONFIG_FILE
    );
    Ok(())
}
