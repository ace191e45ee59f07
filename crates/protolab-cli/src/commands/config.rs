//! Configuration checks.

use anyhow::Result;
use protolab_core::config::resolve_gateway_config;

/// Reports whether gateway credentials resolve from the secret file or
/// the environment.
pub fn check() -> Result<()> {
    match resolve_gateway_config() {
        Ok(config) => {
            println!("Gateway credentials: found");
            println!("Model: {}", config.model_or_default());
        }
        Err(e) => {
            println!("Gateway credentials: missing");
            println!("  {e}");
            println!("  Demo subcommands still work; live runs need credentials.");
        }
    }
    Ok(())
}
