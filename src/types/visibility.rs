use serde::{Deserialize, Serialize};

/// Who can see a namespace and the resources inside it.
///
/// Visibility is authoritative only at the root of a namespace tree; every
/// descendant carries a copy that is kept in sync by the tree store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Owner and collaborators only.
    #[default]
    Private,
    /// Any authenticated user.
    Internal,
    /// Anyone, including anonymous requests.
    Public,
}

impl Visibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Public => "public",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "private" => Some(Visibility::Private),
            "internal" => Some(Visibility::Internal),
            "public" => Some(Visibility::Public),
            _ => None,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for v in [Visibility::Private, Visibility::Internal, Visibility::Public] {
            assert_eq!(Visibility::parse(v.as_str()), Some(v));
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Visibility::parse("hidden"), None);
        assert_eq!(Visibility::parse(""), None);
    }

    #[test]
    fn test_default_is_private() {
        assert_eq!(Visibility::default(), Visibility::Private);
    }
}
