use serde::{Deserialize, Serialize};

/// Identity of the requester as seen by the rule evaluator.
pub trait UserInfo {
    /// The unique user name.
    fn name(&self) -> &str;
    /// Groups the user belongs to.
    fn groups(&self) -> &[String];
}

/// Read-only view of an inbound request, supplied by the embedding server.
///
/// Resource accessors are only consulted when
/// [`is_resource_request`](Self::is_resource_request) returns `true`, and
/// [`path`](Self::path) only when it returns `false`.
pub trait RequestAttributes {
    /// The authenticated requester, or `None` for anonymous requests.
    fn user(&self) -> Option<&dyn UserInfo>;
    fn verb(&self) -> &str;
    /// Whether the request addresses a typed API resource rather than a
    /// bare URL path.
    fn is_resource_request(&self) -> bool;
    /// Namespace of the addressed object; `""` for cluster-scoped resources.
    fn namespace(&self) -> &str;
    fn api_group(&self) -> &str;
    fn api_version(&self) -> &str;
    /// Resource type, e.g. `pods`.
    fn resource(&self) -> &str;
    /// Subresource, e.g. `log`; `""` when absent.
    fn subresource(&self) -> &str;
    /// Object name; `""` for collection requests.
    fn name(&self) -> &str;
    /// URL path of a non-resource request.
    fn path(&self) -> &str;

    /// Whether the verb only reads state.
    fn is_read_only(&self) -> bool {
        matches!(self.verb(), "get" | "list" | "watch")
    }
}

/// A plain user record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Builder-style helper adding group memberships.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }
}

impl UserInfo for User {
    fn name(&self) -> &str {
        &self.name
    }

    fn groups(&self) -> &[String] {
        &self.groups
    }
}

/// The typed-resource part of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTarget {
    #[serde(default)]
    pub api_group: String,
    #[serde(default)]
    pub api_version: String,
    pub resource: String,
    #[serde(default)]
    pub subresource: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl ResourceTarget {
    pub fn new(api_group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            api_group: api_group.into(),
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn with_subresource(mut self, subresource: impl Into<String>) -> Self {
        self.subresource = subresource.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }
}

/// An owned [`RequestAttributes`] implementation.
///
/// A request is a resource request exactly when `resource` is present.  The
/// serde form is what the `audit-policy-check` tool reads, one JSON object
/// per line:
///
/// ```json
/// {"user":{"name":"alice","groups":["dev"]},"verb":"get","resource":{"resource":"pods","namespace":"default"}}
/// {"verb":"get","path":"/healthz"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributesRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub verb: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceTarget>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl AttributesRecord {
    /// An anonymous resource request.
    pub fn resource_request(verb: impl Into<String>, target: ResourceTarget) -> Self {
        Self {
            user: None,
            verb: verb.into(),
            resource: Some(target),
            path: String::new(),
        }
    }

    /// An anonymous non-resource request.
    pub fn non_resource_request(verb: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            user: None,
            verb: verb.into(),
            resource: None,
            path: path.into(),
        }
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    fn target_field(&self, f: impl FnOnce(&ResourceTarget) -> &str) -> &str {
        self.resource.as_ref().map(f).unwrap_or("")
    }
}

impl RequestAttributes for AttributesRecord {
    fn user(&self) -> Option<&dyn UserInfo> {
        self.user.as_ref().map(|u| u as &dyn UserInfo)
    }

    fn verb(&self) -> &str {
        &self.verb
    }

    fn is_resource_request(&self) -> bool {
        self.resource.is_some()
    }

    fn namespace(&self) -> &str {
        self.target_field(|t| t.namespace.as_str())
    }

    fn api_group(&self) -> &str {
        self.target_field(|t| t.api_group.as_str())
    }

    fn api_version(&self) -> &str {
        self.target_field(|t| t.api_version.as_str())
    }

    fn resource(&self) -> &str {
        self.target_field(|t| t.resource.as_str())
    }

    fn subresource(&self) -> &str {
        self.target_field(|t| t.subresource.as_str())
    }

    fn name(&self) -> &str {
        self.target_field(|t| t.name.as_str())
    }

    fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_record_accessors() {
        let attrs = AttributesRecord::resource_request(
            "get",
            ResourceTarget::new("apps", "deployments")
                .with_api_version("v1")
                .with_subresource("scale")
                .with_name("web")
                .with_namespace("prod"),
        );
        assert!(attrs.is_resource_request());
        assert_eq!(attrs.api_group(), "apps");
        assert_eq!(attrs.api_version(), "v1");
        assert_eq!(attrs.resource(), "deployments");
        assert_eq!(attrs.subresource(), "scale");
        assert_eq!(attrs.name(), "web");
        assert_eq!(attrs.namespace(), "prod");
        assert_eq!(attrs.path(), "");
        assert!(attrs.user().is_none());
        assert!(attrs.is_read_only());
    }

    #[test]
    fn non_resource_record_has_empty_resource_fields() {
        let attrs = AttributesRecord::non_resource_request("post", "/api/v1/foo")
            .with_user(User::new("bob").with_groups(["dev", "ops"]));
        assert!(!attrs.is_resource_request());
        assert_eq!(attrs.resource(), "");
        assert_eq!(attrs.namespace(), "");
        assert_eq!(attrs.path(), "/api/v1/foo");
        assert!(!attrs.is_read_only());

        let user = attrs.user().unwrap();
        assert_eq!(user.name(), "bob");
        assert_eq!(user.groups().to_vec(), vec!["dev", "ops"]);
    }

    #[test]
    fn deserialize_records_from_json() {
        let res: AttributesRecord = serde_json::from_str(
            r#"{"user":{"name":"alice","groups":["dev"]},"verb":"get","resource":{"resource":"pods","namespace":"default"}}"#,
        )
        .unwrap();
        assert!(res.is_resource_request());
        assert_eq!(res.api_group(), "");
        assert_eq!(res.resource(), "pods");
        assert_eq!(res.namespace(), "default");
        assert_eq!(res.user.as_ref().unwrap().groups, vec!["dev"]);

        let non: AttributesRecord =
            serde_json::from_str(r#"{"verb":"get","path":"/healthz"}"#).unwrap();
        assert!(!non.is_resource_request());
        assert!(non.user.is_none());
        assert_eq!(non.path(), "/healthz");
    }
}
