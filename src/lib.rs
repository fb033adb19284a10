//! Ultimate Tic-Tac-Toe engine based on Monte Carlo Tree Search.
//!
//! The rules are implemented on top of 9-bit [`game::Bitboard`]s with lookup
//! tables generated at build time, the [`search`] runs random playouts under a
//! per-turn time budget and the [`Engine`] talks to the referee over a simple
//! line-based text protocol.

pub mod environment;
pub mod game;
pub mod search;

mod engine;
pub use engine::Engine;
use shadow_rs::shadow;

shadow!(build);

/// Build type and target. Produced by `build.rs`.
const FEATURES: &str = include_str!(concat!(env!("OUT_DIR"), "/features"));

/// Returns the full engine version that can be used to identify how it was
/// built in the first place.
#[must_use]
pub fn engine_version() -> String {
    format!(
        "{} (commit {}, branch {})",
        build::PKG_VERSION,
        build::SHORT_COMMIT,
        build::BRANCH
    )
}

/// Logs the engine version, the build type and features on startup. The
/// protocol owns stdout, so everything goes through [`tracing`].
pub fn print_engine_info() {
    tracing::info!("Ultimate Tic-Tac-Toe engine {}", engine_version());
    tracing::info!("Release build: {}", !shadow_rs::is_debug());
    tracing::info!("Features: {}", FEATURES.trim());
    if !shadow_rs::git_clean() {
        tracing::warn!("built with uncommitted changes");
    }
}
