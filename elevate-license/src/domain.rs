//! Domain-keyed copyright protection.
//!
//! Sites running the platform identify themselves by host name. The registry
//! maps each licensed host to a tier and a feature list; anything else is an
//! unauthorized deployment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Feature name that grants every feature.
pub const ALL_FEATURES: &str = "all";

/// License tier of a domain, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainTier {
    Basic,
    SisterSite,
    Private,
    Enterprise,
    Development,
}

impl DomainTier {
    /// Returns true if this tier is at least `min`.
    #[must_use]
    pub fn meets(self, min: DomainTier) -> bool {
        self >= min
    }

    /// Wire name of the tier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::SisterSite => "sister-site",
            Self::Private => "private",
            Self::Enterprise => "enterprise",
            Self::Development => "development",
        }
    }
}

/// What a licensed domain is allowed to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainGrant {
    pub domain: String,
    pub tier: DomainTier,
    pub features: Vec<String>,
}

impl DomainGrant {
    /// Returns true if the grant covers `feature`, directly or via `all`.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features
            .iter()
            .any(|f| f == feature || f == ALL_FEATURES)
    }
}

/// Outcome of a domain lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainCheck {
    Authorized(DomainGrant),
    Unauthorized { domain: String },
}

/// Registry of licensed domains.
#[derive(Debug, Clone, Default)]
pub struct DomainRegistry {
    grants: HashMap<String, DomainGrant>,
}

impl DomainRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the production sites and local development hosts.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.insert("elevateforhumanity.com", DomainTier::Enterprise, &[ALL_FEATURES]);
        for site in ["kingdom-konnect", "urban-build-crew", "serene-comfort-care"] {
            registry.insert(
                &format!("{site}.elevateforhumanity.com"),
                DomainTier::SisterSite,
                &["lms", "basic"],
            );
        }
        registry.insert(
            "elevate-brain.elevateforhumanity.com",
            DomainTier::Private,
            &["admin", "analytics"],
        );
        registry.insert("localhost", DomainTier::Development, &[ALL_FEATURES]);
        registry.insert("127.0.0.1", DomainTier::Development, &[ALL_FEATURES]);
        registry
    }

    /// Registers or replaces a domain grant.
    pub fn insert(&mut self, domain: &str, tier: DomainTier, features: &[&str]) {
        let domain = normalize_host(domain);
        self.grants.insert(
            domain.clone(),
            DomainGrant {
                domain,
                tier,
                features: features.iter().map(|f| (*f).to_string()).collect(),
            },
        );
    }

    /// Looks up a host, ignoring case, port and a trailing dot.
    #[must_use]
    pub fn check(&self, host: &str) -> DomainCheck {
        let domain = normalize_host(host);
        match self.grants.get(&domain) {
            Some(grant) => DomainCheck::Authorized(grant.clone()),
            None => DomainCheck::Unauthorized { domain },
        }
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// Lowercases a host and strips any `:port` suffix and trailing dot.
#[must_use]
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// Feature an API path requires, if any.
#[must_use]
pub fn required_feature(path: &str) -> Option<&'static str> {
    const ROUTES: [(&str, &str); 5] = [
        ("/api/lms", "lms"),
        ("/api/admin", "admin"),
        ("/api/analytics", "analytics"),
        ("/api/ai-tutor", "ai-tutor"),
        ("/api/compliance", "compliance"),
    ];
    ROUTES
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix))
        .map(|(_, feature)| *feature)
}
