use audit_policy::{AttributesRecord, Disposition, Level, Stage};
use serde::{Deserialize, Serialize};

/// One evaluated request together with the disposition chosen for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub request: RequestSummary,
    pub level: Level,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub omit_stages: Vec<Stage>,
    pub omit_managed_fields: bool,
    /// Index of the deciding rule; `None` when the policy default applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<usize>,
}

impl DecisionEntry {
    /// Create an entry with a fresh UUID v4 and the current UTC timestamp,
    /// copying the disposition out of the evaluator's borrow.
    pub fn new(request: RequestSummary, disposition: &Disposition<'_>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            request,
            level: disposition.level,
            omit_stages: disposition.omit_stages.to_vec(),
            omit_managed_fields: disposition.omit_managed_fields,
            matched_rule: None,
        }
    }

    /// Record which rule decided, builder-style.
    pub fn with_matched_rule(mut self, index: Option<usize>) -> Self {
        self.matched_rule = index;
        self
    }
}

/// The parts of a request worth keeping next to its decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub verb: String,
    pub target: RequestTarget,
}

/// What the request addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestTarget {
    Resource {
        api_group: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        api_version: String,
        resource: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        subresource: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        name: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        namespace: String,
    },
    NonResource {
        path: String,
    },
}

impl From<&AttributesRecord> for RequestSummary {
    fn from(attrs: &AttributesRecord) -> Self {
        let target = match &attrs.resource {
            Some(t) => RequestTarget::Resource {
                api_group: t.api_group.clone(),
                api_version: t.api_version.clone(),
                resource: t.resource.clone(),
                subresource: t.subresource.clone(),
                name: t.name.clone(),
                namespace: t.namespace.clone(),
            },
            None => RequestTarget::NonResource {
                path: attrs.path.clone(),
            },
        };
        Self {
            user: attrs.user.as_ref().map(|u| u.name.clone()),
            verb: attrs.verb.clone(),
            target,
        }
    }
}
