//! Check platform capabilities and configuration.

use clipcast_common::config::RecorderConfig;
use clipcast_platform_core::capability::all_required_available;
use clipcast_platform_core::{print_capability_report, CapturePlatform};
use clipcast_platform_synthetic::SyntheticPlatform;

pub fn run(config: RecorderConfig) -> anyhow::Result<()> {
    println!("Clipcast System Check");
    println!("{}", "=".repeat(50));

    let platform = SyntheticPlatform::new();
    println!("[OK] Platform: {}", platform.name());

    match config.validate() {
        Ok(()) => println!("[OK] Configuration is valid"),
        Err(e) => println!("[FAIL] Configuration: {e}"),
    }

    if platform.is_type_supported(&config.mime_type) {
        println!("[OK] Recording format: {}", config.mime_type);
    } else {
        println!("[WARN] Recording format not supported: {}", config.mime_type);
    }
    println!(
        "     Export: {} ({})",
        config.download_filename,
        config.content_type()
    );

    let capabilities = platform.capabilities();
    println!();
    print_capability_report(&capabilities);

    println!();
    if all_required_available(&capabilities) && config.validate().is_ok() {
        println!("All required capabilities are available. Clipcast is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
