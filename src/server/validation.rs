use crate::server::response::ApiError;

const MAX_RESOURCE_NAME_LEN: usize = 255;

/// Resource names (objects, keys, images) and variable keys: non-empty,
/// bounded, no control characters or slashes.
pub fn validate_resource_name(name: &str, field: &'static str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::validation(field, format!("{field} cannot be empty")));
    }
    if name.len() > MAX_RESOURCE_NAME_LEN {
        return Err(ApiError::validation(
            field,
            format!("{field} cannot exceed {MAX_RESOURCE_NAME_LEN} characters"),
        ));
    }
    if name.chars().any(|c| c.is_control() || c == '/') {
        return Err(ApiError::validation(
            field,
            format!("{field} contains invalid characters"),
        ));
    }
    Ok(())
}

/// Splits an inline namespace target like "team/project@gordon" into the
/// path and the optional owner username. No suffix means the requester's
/// own tree.
pub fn split_namespace_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('@') {
        Some((path, username)) if !username.is_empty() => (path, Some(username)),
        _ => (target, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_namespace_target() {
        assert_eq!(split_namespace_target("conclave"), ("conclave", None));
        assert_eq!(
            split_namespace_target("conclave@me"),
            ("conclave", Some("me"))
        );
        assert_eq!(
            split_namespace_target("team/project@gordon"),
            ("team/project", Some("gordon"))
        );
        assert_eq!(split_namespace_target("conclave@"), ("conclave@", None));
    }

    #[test]
    fn test_validate_resource_name() {
        assert!(validate_resource_name("PGPASSWORD", "key").is_ok());
        assert!(validate_resource_name("", "key").is_err());
        assert!(validate_resource_name("a/b", "name").is_err());
        assert!(validate_resource_name("a\nb", "name").is_err());
    }
}
