/// Configuration system for the swap engine
///
/// - `config_struct!` declares each section with embedded defaults
/// - `schemas` holds every section
/// - `utils` loads the TOML file into a global `OnceCell<RwLock<Config>>`
///
/// ```rust,ignore
/// use openbook_swap::config::{load_config, with_config};
///
/// load_config()?;
/// let timeout = with_config(|cfg| cfg.swap.confirmation_timeout_secs);
/// ```
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::*;
