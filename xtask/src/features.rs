use std::process::Command;

use anyhow::{Context, Result};

/// `lorekeep-common` tiers. `runtime` implies `foundation`.
const FEATURE_COMBINATIONS: &[&[&str]] = &[&[], &["foundation"], &["runtime"]];

/// Check that each `lorekeep-common` tier compiles on its own.
pub fn test_feature_matrix() -> Result<()> {
    println!("Testing {} lorekeep-common feature combinations...", FEATURE_COMBINATIONS.len());

    for (index, features) in FEATURE_COMBINATIONS.iter().enumerate() {
        let joined = features.join(",");
        let label = if features.is_empty() { "none".to_string() } else { joined.clone() };

        println!(
            "\n[{}/{}] cargo check -p lorekeep-common --no-default-features --features '{joined}'",
            index + 1,
            FEATURE_COMBINATIONS.len(),
        );

        let status = Command::new("cargo")
            .args(["check", "-p", "lorekeep-common", "--no-default-features"])
            .args(["--features", joined.as_str()])
            .status()
            .with_context(|| format!("Failed to run cargo check for '{label}'"))?;

        if !status.success() {
            anyhow::bail!("Feature combination '{label}' failed to compile");
        }

        println!("✅ Features '{label}' compiled successfully");
    }

    println!("\n✅ All {} feature combinations compile successfully!", FEATURE_COMBINATIONS.len());
    Ok(())
}
