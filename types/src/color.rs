use crate::error::SetupError;

/// Converts a team color given as three floats (`"1.0 0.5 0.0"`) into the hex
/// form stored with a team.
///
/// Each channel is scaled by 256, truncated, clamped to `[0, 256]` and written
/// as lowercase hex without padding, so `"1.0 0.5 0.0"` becomes `"100800"`.
pub fn floats_to_rgb_hex(floats: &str) -> Result<String, SetupError> {
    let channels = floats
        .split_whitespace()
        .map(|channel| {
            let value: f64 = channel
                .parse()
                .map_err(|_| SetupError::InvalidColor(floats.to_string()))?;
            let scaled = (value * 256.0) as i64;
            Ok(format!("{:x}", scaled.clamp(0, 256)))
        })
        .collect::<Result<Vec<_>, SetupError>>()?;

    if channels.is_empty() {
        return Err(SetupError::InvalidColor(floats.to_string()));
    }
    Ok(channels.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_half_zero() {
        assert_eq!(floats_to_rgb_hex("1.0 0.5 0.0").unwrap(), "100800");
    }

    #[test]
    fn test_channels_are_not_padded() {
        // 0.02 * 256 = 5.12 -> "5"
        assert_eq!(floats_to_rgb_hex("0.02 0.02 0.02").unwrap(), "555");
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(floats_to_rgb_hex("2.0 -0.5 0.999").unwrap(), "1000ff");
    }

    #[test]
    fn test_invalid_color() {
        assert_eq!(
            floats_to_rgb_hex("red green blue"),
            Err(SetupError::InvalidColor("red green blue".to_string()))
        );
        assert!(floats_to_rgb_hex("   ").is_err());
    }
}
