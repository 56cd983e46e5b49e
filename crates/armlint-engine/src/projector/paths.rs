//! URL template helpers

const PROVIDERS: &str = "/providers/";

pub(crate) fn is_parameter(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

/// Lowercase a template and replace every `{param}` with `{}`, so templates
/// that differ only in parameter names compare equal.
pub fn normalize_template(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut in_param = false;
    for c in template.chars() {
        match c {
            '{' => {
                in_param = true;
                out.push('{');
            }
            '}' => {
                in_param = false;
                out.push('}');
            }
            _ if in_param => {}
            _ => out.extend(c.to_lowercase()),
        }
    }
    out.trim_end_matches('/').to_string()
}

/// Segments after the last `/providers/`, starting with the namespace.
fn provider_segments(template: &str) -> Option<Vec<&str>> {
    let idx = template.to_ascii_lowercase().rfind(PROVIDERS)?;
    let rest = &template[idx + PROVIDERS.len()..];
    Some(rest.split('/').filter(|s| !s.is_empty()).collect())
}

/// Resource provider namespace, e.g. `Microsoft.Foo`.
pub fn provider_namespace(template: &str) -> Option<&str> {
    provider_segments(template)?.first().copied()
}

/// Number of `type/{name}` pairs after the provider namespace: one for a
/// top-level resource, more for nested ones.
pub fn resource_pair_count(template: &str) -> usize {
    let Some(segments) = provider_segments(template) else {
        return 0;
    };

    let mut pairs = 0;
    let mut rest = segments.get(1..).unwrap_or_default();
    while let [kind, name, tail @ ..] = rest {
        if is_parameter(kind) || !is_parameter(name) {
            break;
        }
        pairs += 1;
        rest = tail;
    }
    pairs
}

/// Template with its final `/{name}` segment removed, when it ends in one.
pub(crate) fn strip_name_segment(template: &str) -> Option<&str> {
    let trimmed = template.trim_end_matches('/');
    let (parent, last) = trimmed.rsplit_once('/')?;
    if is_parameter(last) && !parent.is_empty() {
        Some(parent)
    } else {
        None
    }
}

/// `/subscriptions/{}/providers/<ns>/<type>`: a list across a whole
/// subscription.
pub(crate) fn is_subscription_list(template: &str) -> bool {
    let normalized = normalize_template(template);
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    matches!(
        segments.as_slice(),
        ["subscriptions", "{}", "providers", _namespace, kind] if !is_parameter(kind)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM: &str = "/subscriptions/{s}/resourceGroups/{g}/providers/Microsoft.Foo/widgets/{w}";

    #[test]
    fn test_normalize_ignores_parameter_names() {
        assert_eq!(
            normalize_template(ITEM),
            normalize_template(concat!(
                "/subscriptions/{subscriptionId}/resourcegroups/{rg}",
                "/providers/microsoft.foo/Widgets/{widgetName}"
            ))
        );
        assert_eq!(normalize_template("/a/{b}/"), "/a/{}");
    }

    #[test]
    fn test_provider_namespace() {
        assert_eq!(provider_namespace(ITEM), Some("Microsoft.Foo"));
        assert_eq!(provider_namespace("/items/{name}"), None);
    }

    #[test]
    fn test_pair_counting() {
        assert_eq!(resource_pair_count(ITEM), 1);
        assert_eq!(resource_pair_count(&format!("{}/gadgets/{{g}}", ITEM)), 2);
        assert_eq!(
            resource_pair_count(
                "/subscriptions/{s}/resourceGroups/{g}/providers/Microsoft.Foo/widgets"
            ),
            0
        );
        // only the last providers segment counts
        assert_eq!(
            resource_pair_count(concat!(
                "/{scope}/providers/Microsoft.Authorization/locks/{l}",
                "/providers/Microsoft.Foo/widgets/{w}"
            )),
            1
        );
    }

    #[test]
    fn test_strip_and_subscription_list() {
        assert_eq!(
            strip_name_segment(ITEM),
            Some("/subscriptions/{s}/resourceGroups/{g}/providers/Microsoft.Foo/widgets")
        );
        assert_eq!(strip_name_segment("/subscriptions/{s}/widgets"), None);
        assert!(is_subscription_list("/subscriptions/{id}/providers/Microsoft.Foo/widgets"));
        assert!(!is_subscription_list(
            "/subscriptions/{id}/resourceGroups/{g}/providers/Microsoft.Foo/widgets"
        ));
    }

    proptest::proptest! {
        #[test]
        fn normalization_is_idempotent_and_ignores_names(
            types in proptest::collection::vec("[a-zA-Z]{1,8}", 1..4),
            names in proptest::collection::vec("[a-zA-Z]{1,8}", 4),
        ) {
            let build = |suffix: &str| {
                let mut template = "/subscriptions/{s}/providers/Microsoft.Foo".to_string();
                for (kind, name) in types.iter().zip(&names) {
                    template.push_str(&format!("/{}/{{{}{}}}", kind, name, suffix));
                }
                template
            };
            let normalized = normalize_template(&build(""));
            proptest::prop_assert_eq!(normalize_template(&normalized), normalized.clone());
            proptest::prop_assert_eq!(normalize_template(&build("X")), normalized);
            proptest::prop_assert_eq!(resource_pair_count(&build("")), types.len());
        }
    }
}
