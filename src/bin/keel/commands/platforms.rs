//! `keel platforms` command

use anyhow::Result;

use keel::core::platform::{Platform, DEFAULT_PLATFORMS, KNOWN_ARCH, KNOWN_OS};

pub fn execute() -> Result<()> {
    println!("host: {}", Platform::host());
    println!();

    println!("default platforms (keel build --all):");
    for platform in DEFAULT_PLATFORMS {
        println!("  {}", platform);
    }
    println!();

    println!("operating systems: {}", KNOWN_OS.join(", "));
    println!("architectures: {}", KNOWN_ARCH.join(", "));

    Ok(())
}
