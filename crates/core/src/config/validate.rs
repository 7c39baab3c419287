use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Bit-rate bounds are non-zero and ordered
/// - Converter timeout is not 0
/// - Output extension is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let merge = &config.merge;
    if merge.min_bitrate == 0 {
        return Err(ConfigError::ValidationError(
            "merge.min_bitrate cannot be 0".to_string(),
        ));
    }
    if merge.min_bitrate > merge.max_bitrate {
        return Err(ConfigError::ValidationError(format!(
            "merge.min_bitrate ({}) exceeds merge.max_bitrate ({})",
            merge.min_bitrate, merge.max_bitrate
        )));
    }
    if merge.output_extension.trim_start_matches('.').is_empty() {
        return Err(ConfigError::ValidationError(
            "merge.output_extension cannot be empty".to_string(),
        ));
    }

    if config.converter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
