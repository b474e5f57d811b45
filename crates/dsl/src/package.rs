//! Package identity and package metadata lookup.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of the package that declares a template.
///
/// Two templates belong to the same package when their identities are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageId {
    /// Package name
    pub name: String,
    /// Package version tag
    pub tag: String,
}

impl PackageId {
    /// Create a package identity.
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

/// Published metadata of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package name
    pub name: String,
    /// Version tag
    pub tag: String,
    /// Owning account, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// License identifier, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Search keywords
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl From<&PackageId> for PackageMetadata {
    fn from(id: &PackageId) -> Self {
        Self {
            name: id.name.clone(),
            tag: id.tag.clone(),
            owner: None,
            license: None,
            keywords: Vec::new(),
        }
    }
}

/// Looks up the published metadata of a package.
pub trait MetadataProvider {
    /// Metadata for `package`, or `None` when the package is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup itself fails.
    fn metadata(&self, package: &PackageId) -> Result<Option<PackageMetadata>>;
}

/// In-memory metadata keyed by package name.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataProvider {
    entries: HashMap<String, PackageMetadata>,
}

impl StaticMetadataProvider {
    /// Create an empty provider
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the metadata of a package.
    pub fn insert(&mut self, metadata: PackageMetadata) -> &mut Self {
        self.entries.insert(metadata.name.clone(), metadata);
        self
    }
}

impl MetadataProvider for StaticMetadataProvider {
    fn metadata(&self, package: &PackageId) -> Result<Option<PackageMetadata>> {
        Ok(self.entries.get(&package.name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(PackageId::new("honeybee-radiance", "1.2.0").to_string(), "honeybee-radiance:1.2.0");
    }

    #[test]
    fn test_static_provider_lookup_by_name() {
        let mut provider = StaticMetadataProvider::new();
        provider.insert(PackageMetadata {
            license: Some("MIT".to_string()),
            ..PackageMetadata::from(&PackageId::new("sky", "0.4.1"))
        });

        let found = provider.metadata(&PackageId::new("sky", "0.0.0")).unwrap();
        assert_eq!(found.map(|m| m.tag), Some("0.4.1".to_string()));
        assert!(provider.metadata(&PackageId::new("other", "1.0.0")).unwrap().is_none());
    }
}
