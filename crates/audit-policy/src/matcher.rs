//! Predicates deciding whether a single [`PolicyRule`] applies to a request.
//!
//! All matching is literal string comparison: `*` is only special as a whole
//! spec, as a trailing path character, or in the `*/sub` and `type/*`
//! resource forms.  Nothing here allocates.

use crate::attributes::RequestAttributes;
use crate::schema::{GroupResources, PolicyRule};

/// Check whether every predicate declared on `rule` accepts `attrs`.
pub fn rule_matches<A>(rule: &PolicyRule, attrs: &A) -> bool
where
    A: RequestAttributes + ?Sized,
{
    let user = attrs.user();

    if !rule.users.is_empty() {
        match user {
            Some(u) if has_string(&rule.users, u.name()) => {}
            _ => return false,
        }
    }
    if !rule.user_groups.is_empty() {
        let Some(u) = user else {
            return false;
        };
        if !u.groups().iter().any(|g| has_string(&rule.user_groups, g)) {
            return false;
        }
    }
    if !rule.verbs.is_empty() && !has_string(&rule.verbs, attrs.verb()) {
        return false;
    }

    if rule.targets_resources() {
        return rule_matches_resource(rule, attrs);
    }
    if !rule.non_resource_urls.is_empty() {
        return rule_matches_non_resource(rule, attrs);
    }
    true
}

/// Namespace and resource predicates; only resource requests can pass.
fn rule_matches_resource<A>(rule: &PolicyRule, attrs: &A) -> bool
where
    A: RequestAttributes + ?Sized,
{
    if !attrs.is_resource_request() {
        return false;
    }
    // Cluster-scoped resources carry the empty namespace.
    if !rule.namespaces.is_empty() && !has_string(&rule.namespaces, attrs.namespace()) {
        return false;
    }
    if rule.resources.is_empty() {
        return true;
    }

    let api_group = attrs.api_group();
    let resource = attrs.resource();
    let subresource = attrs.subresource();
    let name = attrs.name();

    rule.resources
        .iter()
        .filter(|gr| gr.group == api_group)
        .any(|gr| group_accepts(gr, resource, subresource, name))
}

/// Whether one API group's resource list accepts the request.  An empty
/// resource list covers the whole group.
fn group_accepts(gr: &GroupResources, resource: &str, subresource: &str, name: &str) -> bool {
    if gr.resources.is_empty() {
        return true;
    }
    if !gr.resource_names.is_empty() && !has_string(&gr.resource_names, name) {
        return false;
    }
    gr.resources
        .iter()
        .any(|spec| resource_matches(spec, resource, subresource))
}

/// Check a single resource spec against a request's type and subresource.
///
/// | spec        | matches                                   |
/// |-------------|-------------------------------------------|
/// | `pods`      | `pods` without a subresource              |
/// | `pods/log`  | `pods` with subresource `log`             |
/// | `*`         | anything                                  |
/// | `*/status`  | any type with subresource `status`        |
/// | `pods/*`    | `pods` with any non-empty subresource     |
pub fn resource_matches(spec: &str, resource: &str, subresource: &str) -> bool {
    if spec == "*" || is_combined(spec, resource, subresource) {
        return true;
    }
    if !subresource.is_empty() && spec.strip_prefix("*/") == Some(subresource) {
        return true;
    }
    if !subresource.is_empty() && spec.strip_suffix("/*") == Some(resource) {
        return true;
    }
    false
}

/// `spec == resource` or `spec == resource + "/" + subresource`, compared
/// in place.
fn is_combined(spec: &str, resource: &str, subresource: &str) -> bool {
    if subresource.is_empty() {
        return spec == resource;
    }
    spec.strip_prefix(resource)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|sub| sub == subresource)
}

/// Non-resource URL predicate; resource requests never pass.
fn rule_matches_non_resource<A>(rule: &PolicyRule, attrs: &A) -> bool
where
    A: RequestAttributes + ?Sized,
{
    if attrs.is_resource_request() {
        return false;
    }
    let path = attrs.path();
    rule.non_resource_urls
        .iter()
        .any(|spec| path_matches(path, spec))
}

/// Check a request path against a path spec: `*` matches every path, a spec
/// ending in `*` matches by prefix, anything else must be equal.
pub fn path_matches(path: &str, spec: &str) -> bool {
    if spec == "*" || spec == path {
        return true;
    }
    spec.ends_with('*') && path.starts_with(spec.trim_end_matches('*'))
}

/// Exact membership test.
pub fn has_string(slice: &[String], value: &str) -> bool {
    slice.iter().any(|s| s == value)
}
