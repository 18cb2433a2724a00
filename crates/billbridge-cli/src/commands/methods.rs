//! Show discovered methods and the resulting tool surface.

use billbridge_core::Config;
use billbridge_tools::{SurfaceBuilder, SurfaceMode};

pub async fn run(config: Config, filter: Option<&str>) -> anyhow::Result<()> {
    let config = config.into_validated()?;
    let discovery = super::discovery(&config);
    let surface = SurfaceBuilder::new(discovery, &config).build().await;

    if surface.mode == SurfaceMode::Fallback {
        let reason = surface
            .fallback_reason
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        println!("✗ No methods discovered ({})", reason);
        println!("  Run 'billbridge doctor' for details.");
        return Ok(());
    }

    let needle = filter.map(str::to_lowercase);
    let shown: Vec<&String> = surface
        .methods
        .iter()
        .filter(|m| needle.as_ref().map_or(true, |n| m.to_lowercase().contains(n.as_str())))
        .collect();

    for method in &shown {
        println!("{}", method);
    }

    println!(
        "\n{} of {} methods shown. Surface: {} mode, {} tools (threshold {}).",
        shown.len(),
        surface.method_count(),
        surface.mode,
        surface.registry.len(),
        config.discovery.meta_threshold
    );
    if surface.mode == SurfaceMode::Direct {
        println!("Tools: {}", surface.registry.list().join(", "));
    }
    Ok(())
}
