//! Opaque app/category/web-domain selections.
//!
//! A `Selection` is produced by the platform's activity picker and is carried
//! around untouched. The core only unions selections and tests membership;
//! token contents are never parsed.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }
    };
}

opaque_token!(
    /// Platform token naming one application.
    ApplicationToken
);
opaque_token!(
    /// Platform token naming an activity category (e.g. "social").
    CategoryToken
);
opaque_token!(
    /// Platform token naming a web domain.
    WebDomainToken
);

/// A set of restriction targets chosen by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub applications: BTreeSet<ApplicationToken>,
    #[serde(default)]
    pub categories: BTreeSet<CategoryToken>,
    #[serde(default)]
    pub web_domains: BTreeSet<WebDomainToken>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application(mut self, token: impl Into<String>) -> Self {
        self.applications.insert(ApplicationToken::new(token));
        self
    }

    pub fn with_category(mut self, token: impl Into<String>) -> Self {
        self.categories.insert(CategoryToken::new(token));
        self
    }

    pub fn with_web_domain(mut self, token: impl Into<String>) -> Self {
        self.web_domains.insert(WebDomainToken::new(token));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty() && self.categories.is_empty() && self.web_domains.is_empty()
    }

    /// Total number of tokens across all three sets.
    pub fn len(&self) -> usize {
        self.applications.len() + self.categories.len() + self.web_domains.len()
    }

    /// Merge `other` into `self`. Duplicate tokens collapse.
    pub fn extend_from(&mut self, other: &Selection) {
        self.applications.extend(other.applications.iter().cloned());
        self.categories.extend(other.categories.iter().cloned());
        self.web_domains.extend(other.web_domains.iter().cloned());
    }

    pub fn union(&self, other: &Selection) -> Selection {
        let mut merged = self.clone();
        merged.extend_from(other);
        merged
    }

    pub fn contains_application(&self, token: &ApplicationToken) -> bool {
        self.applications.contains(token)
    }

    pub fn contains_category(&self, token: &CategoryToken) -> bool {
        self.categories.contains(token)
    }

    pub fn contains_web_domain(&self, token: &WebDomainToken) -> bool {
        self.web_domains.contains(token)
    }

    /// True if any token of `other` is also in `self`.
    pub fn overlaps(&self, other: &Selection) -> bool {
        other.applications.iter().any(|t| self.applications.contains(t))
            || other.categories.iter().any(|t| self.categories.contains(t))
            || other.web_domains.iter().any(|t| self.web_domains.contains(t))
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} apps, {} categories, {} domains",
            self.applications.len(),
            self.categories.len(),
            self.web_domains.len()
        )
    }
}
