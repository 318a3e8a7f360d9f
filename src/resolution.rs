//! Output resolution parsing.
//!
//! Accepts either an explicit `WIDTHxHEIGHT` pair or a progressive-scan
//! shorthand such as `720p`, which implies the conventional 16:9 width.

use crate::error::ConfigError;

/// Progressive shorthand heights and the widths they imply.
const PROGRESSIVE_MODES: &[(u32, u32)] = &[(720, 1280), (1080, 1920)];

/// Parse a resolution string into `(width, height)`.
///
/// Errors name the offending input.
pub fn parse_resolution(input: &str) -> Result<(u32, u32), ConfigError> {
    if let Some((width, height)) = input.split_once('x') {
        let width = parse_dimension(width, input)?;
        let height = parse_dimension(height, input)?;

        if width <= 0 || height <= 0 {
            return Err(ConfigError::InvalidDimensions(input.to_string()));
        }

        // Both sides fit in i64 and are positive; anything over u32 is
        // nonsense for a framebuffer.
        let width = u32::try_from(width)
            .map_err(|_| ConfigError::InvalidDimensions(input.to_string()))?;
        let height = u32::try_from(height)
            .map_err(|_| ConfigError::InvalidDimensions(input.to_string()))?;
        return Ok((width, height));
    }

    let Some(progressive) = input.strip_suffix('p') else {
        return Err(ConfigError::Unparseable(input.to_string()));
    };
    let height = parse_dimension(progressive, input)?;

    PROGRESSIVE_MODES
        .iter()
        .find(|(h, _)| i64::from(*h) == height)
        .map(|&(h, w)| (w, h))
        .ok_or_else(|| ConfigError::UnsupportedProgressive(input.to_string()))
}

fn parse_dimension(token: &str, input: &str) -> Result<i64, ConfigError> {
    token
        .trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::Unparseable(input.to_string()))
}
