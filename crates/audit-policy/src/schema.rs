use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level audit policy as decoded from a policy file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Schema identifier, e.g. `audit.k8s.io/v1`.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Always `Policy`.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Ordered rules; the first match wins.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    /// Stages skipped for every request, merged into each rule on load.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub omit_stages: Vec<Stage>,
    /// Default for rules that do not set `omitManagedFields` themselves.
    #[serde(default)]
    pub omit_managed_fields: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            rules: Vec::new(),
            omit_stages: Vec::new(),
            omit_managed_fields: false,
        }
    }
}

fn default_api_version() -> String {
    "audit.k8s.io/v1".to_string()
}

fn default_kind() -> String {
    "Policy".to_string()
}

/// A single rule: predicates selecting requests plus the audit disposition
/// applied to them.  Every empty predicate list matches anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    /// Audit level recorded for matching requests.
    pub level: Level,
    /// Exact user names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    /// Group names; membership in any one of them is enough.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_groups: Vec<String>,
    /// Exact verbs, e.g. `get`, `watch`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verbs: Vec<String>,
    /// Resource selectors, checked only for resource requests.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<GroupResources>,
    /// Namespaces; `""` selects cluster-scoped resources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    /// Path specs for non-resource requests: exact, `*`, or `prefix*`.
    #[serde(
        default,
        rename = "nonResourceURLs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub non_resource_urls: Vec<String>,
    /// Stages skipped for matching requests.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub omit_stages: Vec<Stage>,
    /// Overrides [`Policy::omit_managed_fields`] when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omit_managed_fields: Option<bool>,
}

impl PolicyRule {
    /// True when the rule selects on namespace or resource type, which
    /// restricts it to resource requests.
    pub fn targets_resources(&self) -> bool {
        !self.namespaces.is_empty() || !self.resources.is_empty()
    }
}

/// Resources within one API group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResources {
    /// API group; `""` is the core group.
    #[serde(default)]
    pub group: String,
    /// Type specs: `pods`, `pods/log`, `*`, `*/status`, `pods/*`.
    /// Empty matches every resource in the group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    /// Exact object names; empty matches any name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_names: Vec<String>,
}

/// How much of a request is recorded.  Variants are ordered from least to
/// most verbose.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Level {
    /// Do not log the request.
    #[default]
    None,
    /// Request metadata only (user, verb, resource, timestamps).
    Metadata,
    /// Metadata plus the request body.
    Request,
    /// Metadata plus request and response bodies.
    RequestResponse,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::None => "None",
            Level::Metadata => "Metadata",
            Level::Request => "Request",
            Level::RequestResponse => "RequestResponse",
        }
    }

    /// Returns `true` if `self` records strictly less than `other`.
    pub fn less(&self, other: Level) -> bool {
        *self < other
    }

    /// Returns `true` if `self` records at least as much as `other`.
    pub fn greater_or_equal(&self, other: Level) -> bool {
        *self >= other
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase of request handling for which an audit event may be emitted.
///
/// Unknown identifiers are kept verbatim in [`Stage::Other`]; validating
/// them is left to whoever writes the policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    /// The handler received the request.
    RequestReceived,
    /// Response headers were sent; only for long-running requests.
    ResponseStarted,
    /// The response body was completed.
    ResponseComplete,
    /// The request handler panicked.
    Panic,
    Other(String),
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::RequestReceived => "RequestReceived",
            Stage::ResponseStarted => "ResponseStarted",
            Stage::ResponseComplete => "ResponseComplete",
            Stage::Panic => "Panic",
            Stage::Other(s) => s,
        }
    }
}

impl From<&str> for Stage {
    fn from(s: &str) -> Self {
        match s {
            "RequestReceived" => Stage::RequestReceived,
            "ResponseStarted" => Stage::ResponseStarted,
            "ResponseComplete" => Stage::ResponseComplete,
            "Panic" => Stage::Panic,
            other => Stage::Other(other.to_string()),
        }
    }
}

impl From<String> for Stage {
    fn from(s: String) -> Self {
        match Stage::from(s.as_str()) {
            Stage::Other(_) => Stage::Other(s),
            known => known,
        }
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
