//! UI module for consistent CLI output
//!
//! Uses `cliclack` for interactive prompts with automatic fallback to plain
//! output in CI/non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use coffeeshop::ui::{self, UiContext, InstallProgress};
//!
//! let ctx = UiContext::detect();
//! let progress = InstallProgress::new(&ctx, "coffee-shop-cache-v1", manifest.len());
//! let report = host.install(&|url| progress.on_fetched(url)).await?;
//! progress.finish();
//! ui::step_ok_detail(&ctx, "Installed", &report.generation);
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    format_bytes, intro, key_value, key_value_status, note, outro_success, remark, section,
    step_error, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{InstallProgress, TaskSpinner};
pub use prompts::{confirm, input};
pub use theme::{init_theme, ShopTheme};
