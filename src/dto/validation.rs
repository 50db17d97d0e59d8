//! Validation helpers for DTOs.

use validator::ValidationError;

/// Rejects names that are empty once trimmed.
pub fn validate_team_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("team_name_blank");
        err.message = Some("Team name must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a `#rgb` or `#rrggbb` hex color.
///
/// # Examples
///
/// ```ignore
/// validate_color("#0af")    // Ok
/// validate_color("#00AAFF") // Ok
/// validate_color("teal")    // Err - not hex
/// ```
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let Some(hex) = color.strip_prefix('#') else {
        let mut err = ValidationError::new("color_format");
        err.message = Some("Color must start with `#`".into());
        return Err(err);
    };

    if !matches!(hex.len(), 3 | 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        let mut err = ValidationError::new("color_format");
        err.message = Some(format!("Color must be 3 or 6 hex digits (got `{hex}`)").into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_color_valid() {
        assert!(validate_color("#0af").is_ok());
        assert!(validate_color("#00AAFF").is_ok());
    }

    #[test]
    fn test_validate_color_invalid() {
        assert!(validate_color("00aaff").is_err()); // no hash
        assert!(validate_color("#00aaf").is_err()); // 5 digits
        assert!(validate_color("#00aafg").is_err()); // invalid hex
        assert!(validate_color("").is_err());
    }

    #[test]
    fn test_validate_team_name() {
        assert!(validate_team_name("Hawks").is_ok());
        assert!(validate_team_name("  ").is_err());
    }
}
