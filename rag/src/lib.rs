pub mod bench;
pub mod logging;
pub mod settings;

pub use bench::{OutputFormat, ProviderSummary, build_providers, compare_provider, render, render_as};
pub use logging::{LogFormat, LoggingConfig, init_logging};
pub use settings::Settings;
