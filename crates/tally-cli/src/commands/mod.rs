//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `ai` - AI backend check and effective config display
//! - `detect` - Subscription detection over a transaction file
//! - `normalize` - Merchant key preview
//! - `prompts` - Prompt library management commands
//! - `serve` - Web server command

pub mod ai;
pub mod detect;
pub mod normalize;
pub mod prompts;
pub mod serve;

// Re-export command functions for main.rs
pub use ai::*;
pub use detect::*;
pub use normalize::*;
pub use prompts::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
