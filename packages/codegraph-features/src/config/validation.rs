//! Configuration validation

use super::error::ConfigResult;

/// Implemented by every configuration section
pub trait Validatable {
    /// `Ok(())` if valid, otherwise the first violated rule
    fn validate(&self) -> ConfigResult<()>;

    /// Section name for error messages
    fn config_name(&self) -> &'static str {
        "Config"
    }
}
