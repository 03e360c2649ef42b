use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::schema::{Policy, PolicyRule};

/// API versions accepted in the `apiVersion` field.
pub const SUPPORTED_API_VERSIONS: &[&str] = &[
    "audit.k8s.io/v1",
    "audit.k8s.io/v1beta1",
    "audit.k8s.io/v1alpha1",
];

/// Load a [`Policy`] from a YAML file on disk.
///
/// Validates the policy after deserialization.
pub fn load_policy(path: impl AsRef<Path>) -> Result<Policy> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read policy file: {}", path.display()))?;
    load_policy_from_str(&contents)
        .with_context(|| format!("failed to parse policy file: {}", path.display()))
}

/// Parse and validate a [`Policy`] from a YAML string.
pub fn load_policy_from_str(yaml: &str) -> Result<Policy> {
    let policy: Policy = serde_yml::from_str(yaml).context("YAML deserialization failed")?;
    validate(&policy)?;
    Ok(policy)
}

/// Post-deserialization checks.  Stage names are deliberately not checked;
/// unknown stages are carried through as-is.
fn validate(policy: &Policy) -> Result<()> {
    if !SUPPORTED_API_VERSIONS.contains(&policy.api_version.as_str()) {
        bail!(
            "unsupported policy apiVersion '{}'; expected one of {:?}",
            policy.api_version,
            SUPPORTED_API_VERSIONS
        );
    }
    if policy.kind != "Policy" {
        bail!("unsupported kind '{}'; expected 'Policy'", policy.kind);
    }

    for (index, rule) in policy.rules.iter().enumerate() {
        validate_rule(rule).with_context(|| format!("invalid rule at index {index}"))?;
    }
    Ok(())
}

fn validate_rule(rule: &PolicyRule) -> Result<()> {
    if rule.targets_resources() && !rule.non_resource_urls.is_empty() {
        bail!("rule may not combine nonResourceURLs with resources or namespaces");
    }

    for url in &rule.non_resource_urls {
        if url == "*" {
            continue;
        }
        if !url.starts_with('/') {
            bail!("nonResourceURL '{url}' must begin with '/' or be '*'");
        }
        if url.trim_end_matches('*').contains('*') {
            bail!("nonResourceURL '{url}' may only use '*' as a trailing wildcard");
        }
    }

    for group in &rule.resources {
        if group.resources.iter().any(|r| r.is_empty()) {
            bail!("empty resource name in group '{}'", group.group);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::schema::{Level, Stage};

    #[test]
    fn load_minimal_policy() {
        let yaml = r#"
apiVersion: audit.k8s.io/v1
kind: Policy
rules: []
"#;
        let policy = load_policy_from_str(yaml).unwrap();
        assert_eq!(policy.api_version, "audit.k8s.io/v1");
        assert!(policy.rules.is_empty());
    }

    #[test]
    fn missing_header_defaults_to_v1_policy() {
        let policy = load_policy_from_str("rules:\n  - level: Metadata\n").unwrap();
        assert_eq!(policy.kind, "Policy");
        assert_eq!(policy.rules[0].level, Level::Metadata);
    }

    #[test]
    fn accepts_older_api_versions() {
        for version in ["audit.k8s.io/v1beta1", "audit.k8s.io/v1alpha1"] {
            let yaml = format!("apiVersion: {version}\nkind: Policy\nrules: []\n");
            assert!(load_policy_from_str(&yaml).is_ok(), "{version} rejected");
        }
    }

    #[test]
    fn reject_wrong_api_version() {
        let yaml = r#"
apiVersion: audit.k8s.io/v2
kind: Policy
rules: []
"#;
        let err = load_policy_from_str(yaml).unwrap_err();
        assert!(
            err.to_string().contains("unsupported policy apiVersion"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn reject_wrong_kind() {
        let yaml = r#"
apiVersion: audit.k8s.io/v1
kind: Pod
rules: []
"#;
        let err = load_policy_from_str(yaml).unwrap_err();
        assert!(
            err.to_string().contains("unsupported kind"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn reject_mixed_resource_and_url_rule() {
        let yaml = r#"
apiVersion: audit.k8s.io/v1
kind: Policy
rules:
  - level: Metadata
    namespaces: ["default"]
    nonResourceURLs: ["/healthz"]
"#;
        let err = load_policy_from_str(yaml).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("invalid rule at index 0"), "unexpected error: {chain}");
        assert!(chain.contains("may not combine"), "unexpected error: {chain}");
    }

    #[test]
    fn reject_relative_url() {
        let yaml = r#"
apiVersion: audit.k8s.io/v1
kind: Policy
rules:
  - level: Metadata
    nonResourceURLs: ["healthz"]
"#;
        let err = load_policy_from_str(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("must begin with '/'"));
    }

    #[test]
    fn reject_inner_wildcard_url() {
        let yaml = r#"
apiVersion: audit.k8s.io/v1
kind: Policy
rules:
  - level: Metadata
    nonResourceURLs: ["/api/*/foo"]
"#;
        let err = load_policy_from_str(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("trailing wildcard"));
    }

    #[test]
    fn reject_empty_resource() {
        let yaml = r#"
apiVersion: audit.k8s.io/v1
kind: Policy
rules:
  - level: Metadata
    resources:
      - group: apps
        resources: [""]
"#;
        let err = load_policy_from_str(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("empty resource name in group 'apps'"));
    }

    #[test]
    fn unknown_stages_pass_validation() {
        let yaml = r#"
apiVersion: audit.k8s.io/v1
kind: Policy
omitStages: ["NotARealStage"]
rules:
  - level: Metadata
    omitStages: ["AlsoMadeUp"]
"#;
        let policy = load_policy_from_str(yaml).unwrap();
        assert_eq!(policy.omit_stages, vec![Stage::from("NotARealStage")]);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "apiVersion: audit.k8s.io/v1\nkind: Policy\nrules:\n  - level: Request\n    verbs: [\"create\"]"
        )
        .unwrap();

        let policy = load_policy(file.path()).unwrap();
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(policy.rules[0].verbs, vec!["create"]);
    }

    #[test]
    fn load_from_nonexistent_file() {
        let err = load_policy("/does/not/exist.yaml").unwrap_err();
        assert!(
            err.to_string().contains("failed to read policy file"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn load_complex_policy() {
        let yaml = r#"
apiVersion: audit.k8s.io/v1
kind: Policy
omitStages:
  - "RequestReceived"
rules:
  - level: None
    users: ["system:kube-proxy"]
    verbs: ["watch"]
    resources:
      - group: ""
        resources: ["endpoints", "services", "services/status"]
  - level: None
    userGroups: ["system:nodes"]
    verbs: ["get"]
    resources:
      - group: ""
        resources: ["nodes", "nodes/status"]
  - level: None
    nonResourceURLs:
      - "/healthz*"
      - "/version"
  - level: Metadata
    resources:
      - group: ""
        resources: ["secrets", "configmaps"]
      - group: authentication.k8s.io
        resources: ["tokenreviews"]
  - level: Request
    verbs: ["get", "list", "watch"]
  - level: RequestResponse
"#;
        let policy = load_policy_from_str(yaml).unwrap();
        assert_eq!(policy.rules.len(), 6);
        assert_eq!(policy.rules[3].resources[1].group, "authentication.k8s.io");
        assert_eq!(policy.rules[5].level, Level::RequestResponse);
    }
}
