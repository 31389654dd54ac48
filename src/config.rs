//! Log configuration.

use crate::error::LogError;

/// Options accepted by [`crate::empty_log`].
///
/// Defaults: a branching factor of 2048, a 4 KiB inline tail budget, and
/// a 512 KiB slab seal threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub branching_factor: u32,
    pub max_inline_bytes: u32,
    pub optimal_slab_bytes: u64,
}

impl Default for LogOptions {
    fn default() -> Self {
        LogOptions {
            branching_factor: 2048,
            max_inline_bytes: 4096,
            optimal_slab_bytes: 524_288,
        }
    }
}

impl LogOptions {
    pub(crate) fn validate(self) -> Result<Self, LogError> {
        if self.branching_factor < 2 {
            return Err(LogError::Configuration(format!(
                "branching_factor must be >= 2, got {}",
                self.branching_factor
            )));
        }
        if self.max_inline_bytes < 512 {
            return Err(LogError::Configuration(format!(
                "max_inline_bytes must be >= 512, got {}",
                self.max_inline_bytes
            )));
        }
        if self.optimal_slab_bytes < 1024 {
            return Err(LogError::Configuration(format!(
                "optimal_slab_bytes must be >= 1024, got {}",
                self.optimal_slab_bytes
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(LogOptions::default().validate().is_ok());
    }

    #[test]
    fn rejects_small_branching_factor() {
        let opts = LogOptions {
            branching_factor: 1,
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(LogError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_small_inline_bytes() {
        let opts = LogOptions {
            max_inline_bytes: 10,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn rejects_small_slab_bytes() {
        let opts = LogOptions {
            optimal_slab_bytes: 100,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }
}
