//! Application configuration and constants
//!
//! Branding and operator-facing text live here so the firmware banner, the
//! host tooling and the docs agree on what the device calls itself.

/// The application name
pub const APP_NAME: &str = "Flashloop";

/// The application type/category
pub const APP_TYPE: &str = "QSPI sample looper";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Boot banner printed once on the debug channel.
pub const fn boot_banner() -> &'static str {
    "Flashloop - looping a WAV sample from QSPI flash"
}

/// Operator hint printed when no usable sample image was found.
pub const LOAD_HINT: &str =
    "no usable sample in flash: run `cargo xtask gen-wav` then `cargo xtask flash-sample`";

/// Operator hint printed after a sample was accepted.
pub const PLAY_HINT: &str = "sample bound, looping on SAI1 at the engine rate";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_names_both_tooling_commands() {
        assert!(LOAD_HINT.contains("gen-wav"));
        assert!(LOAD_HINT.contains("flash-sample"));
    }

    #[test]
    fn banner_starts_with_app_name() {
        assert!(boot_banner().starts_with(APP_NAME));
    }
}
