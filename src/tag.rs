//! Namespaced tag grammar, validation, diff, and merge (§4.7 Tag Subsystem).
//!
//! A tag is `namespace:value[@sha]`. Several reserved namespaces constrain
//! which values are legal; everything else just has to match the grammar.

use std::collections::BTreeSet;
use std::fmt;

use crate::model::types::{ErrorKind, ValidationError, RECONCILER_ID};

/// A parsed, validated tag.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tag {
    /// The namespace segment.
    pub namespace: String,
    /// The value segment.
    pub value: String,
    /// The optional `@sha` version suffix.
    pub version: Option<String>,
}

impl Tag {
    /// Parse a tag string into its grammar components without checking
    /// reserved-namespace constraints. Returns `None` on grammar failure.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (rest, version) = match s.split_once('@') {
            Some((rest, v)) => (rest, Some(v.to_owned())),
            None => (s, None),
        };
        let (namespace, value) = rest.split_once(':')?;
        if !is_valid_namespace(namespace) || !is_valid_value(value) {
            return None;
        }
        if let Some(v) = &version {
            if !is_valid_sha(v) {
                return None;
            }
        }
        Some(Self {
            namespace: namespace.to_owned(),
            value: value.to_owned(),
            version,
        })
    }

    /// Render back to `namespace:value[@sha]`. Grammar-equivalent to the
    /// string the tag was parsed from (§8 property 8).
    #[must_use]
    pub fn format(&self) -> String {
        match &self.version {
            Some(v) => format!("{}:{}@{v}", self.namespace, self.value),
            None => format!("{}:{}", self.namespace, self.value),
        }
    }

    /// Validate a tag against both grammar and reserved-namespace rules.
    ///
    /// # Errors
    /// Returns [`ValidationError`] describing the grammar or namespace
    /// violation.
    pub fn validate(s: &str) -> Result<Self, ValidationError> {
        let tag = Self::parse(s).ok_or_else(|| ValidationError {
            kind: ErrorKind::Tag,
            value: s.to_owned(),
            reason: "does not match namespace:value[@sha] grammar".to_owned(),
        })?;

        match tag.namespace.as_str() {
            "managed" => {
                if tag.value != RECONCILER_ID {
                    return Err(ValidationError {
                        kind: ErrorKind::Tag,
                        value: s.to_owned(),
                        reason: format!("managed: namespace only accepts '{RECONCILER_ID}'"),
                    });
                }
            }
            "layer" => {
                if !["base", "org", "project", "user", "lane"].contains(&tag.value.as_str()) {
                    return Err(ValidationError {
                        kind: ErrorKind::Tag,
                        value: s.to_owned(),
                        reason: "layer: must be one of base, org, project, user, lane".to_owned(),
                    });
                }
            }
            "channel" => {
                if !["stable", "beta", "pinned"].contains(&tag.value.as_str()) {
                    return Err(ValidationError {
                        kind: ErrorKind::Tag,
                        value: s.to_owned(),
                        reason: "channel: must be one of stable, beta, pinned".to_owned(),
                    });
                }
            }
            "applied" => {
                if tag.version.is_none() {
                    return Err(ValidationError {
                        kind: ErrorKind::Tag,
                        value: s.to_owned(),
                        reason: "applied: requires a @sha version suffix".to_owned(),
                    });
                }
            }
            "org" | "project" | "role" => {}
            _ => {}
        }

        Ok(tag)
    }

    /// Whether this tag lives in a management-related namespace
    /// (`managed`, `layer`, `applied`, `channel`, `org`, `project`), as
    /// opposed to a user-introduced tag.
    #[must_use]
    pub fn is_management(&self) -> bool {
        matches!(
            self.namespace.as_str(),
            "managed" | "layer" | "applied" | "channel" | "org" | "project"
        )
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

fn is_valid_namespace(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_valid_value(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_valid_sha(s: &str) -> bool {
    (7..=40).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// The result of diffing a desired tag set against an existing one
/// (§4.7 Diff).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Tags present in desired but not existing.
    pub to_add: Vec<String>,
    /// Tags present in existing but not desired.
    pub to_remove: Vec<String>,
    /// Tags present in both.
    pub unchanged: Vec<String>,
}

/// Options narrowing which tags a [`diff`] call considers.
#[derive(Clone, Debug, Default)]
pub struct TagDiffOptions {
    /// Only consider tags in these namespaces, if non-empty.
    pub include_namespaces: Vec<String>,
    /// Exclude tags in these namespaces.
    pub exclude_namespaces: Vec<String>,
    /// Restrict the diff to management-namespace tags only.
    pub management_only: bool,
}

fn passes_filter(tag: &str, options: &TagDiffOptions) -> bool {
    let Some(parsed) = Tag::parse(tag) else {
        return true;
    };
    if options.management_only && !parsed.is_management() {
        return false;
    }
    if !options.include_namespaces.is_empty() && !options.include_namespaces.contains(&parsed.namespace) {
        return false;
    }
    !options.exclude_namespaces.contains(&parsed.namespace)
}

/// Set-difference two tag collections (§4.7 Diff).
#[must_use]
pub fn diff(desired: &[String], existing: &[String], options: &TagDiffOptions) -> TagDiff {
    let desired_set: BTreeSet<&String> = desired.iter().filter(|t| passes_filter(t, options)).collect();
    let existing_set: BTreeSet<&String> = existing.iter().filter(|t| passes_filter(t, options)).collect();

    TagDiff {
        to_add: desired_set.difference(&existing_set).map(|s| (*s).clone()).collect(),
        to_remove: existing_set.difference(&desired_set).map(|s| (*s).clone()).collect(),
        unchanged: desired_set.intersection(&existing_set).map(|s| (*s).clone()).collect(),
    }
}

/// Merge desired management tags with a remote's existing tags,
/// preserving non-management user tags by default (§4.7 Merge).
#[must_use]
pub fn merge_tags(desired_management_tags: &[String], existing_tags: &[String], preserve_user_tags: bool) -> Vec<String> {
    let mut result: BTreeSet<String> = desired_management_tags.iter().cloned().collect();
    if preserve_user_tags {
        for tag in existing_tags {
            let is_user_tag = Tag::parse(tag).is_none_or(|t| !t.is_management());
            if is_user_tag {
                result.insert(tag.clone());
            }
        }
    }
    result.into_iter().collect()
}

/// Strip any prior `applied:<layer>@*` tags and append the new one
/// (§4.7 Applied-version update).
#[must_use]
pub fn update_applied_tags(existing: &[String], layer: &str, new_sha: &str) -> Vec<String> {
    let prefix = format!("applied:{layer}@");
    let mut result: Vec<String> = existing.iter().filter(|t| !t.starts_with(&prefix)).cloned().collect();
    result.push(format!("{prefix}{new_sha}"));
    result
}

/// Whether removing a `managed:<reconciler-id>` tag from `to_remove` is
/// permitted given `allow_remove_managed` (§4.7 Apply).
///
/// # Errors
/// Returns a plain string reason when the removal would strip the
/// management marker without explicit authorization.
pub fn check_remove_managed(to_remove: &[String], allow_remove_managed: bool) -> Result<(), String> {
    let removes_marker = to_remove
        .iter()
        .any(|t| Tag::parse(t).is_some_and(|parsed| parsed.namespace == "managed"));
    if removes_marker && !allow_remove_managed {
        return Err("cannot remove management tags".to_owned());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tag_without_version() {
        let tag = Tag::parse("layer:base").unwrap();
        assert_eq!(tag.namespace, "layer");
        assert_eq!(tag.value, "base");
        assert_eq!(tag.version, None);
    }

    #[test]
    fn parses_tag_with_version() {
        let tag = Tag::parse("applied:org@abc1234").unwrap();
        assert_eq!(tag.namespace, "applied");
        assert_eq!(tag.value, "org");
        assert_eq!(tag.version.as_deref(), Some("abc1234"));
    }

    #[test]
    fn format_roundtrips_parse() {
        for s in ["layer:base", "applied:org@abc1234", "role:lane-dev"] {
            let tag = Tag::parse(s).unwrap();
            assert_eq!(tag.format(), s);
        }
    }

    #[test]
    fn rejects_malformed_grammar() {
        assert!(Tag::parse("no-colon-here").is_none());
        assert!(Tag::parse(":novalue").is_none());
        assert!(Tag::parse("UPPER:value").is_none());
    }

    #[test]
    fn rejects_short_or_uppercase_sha() {
        assert!(Tag::parse("applied:org@abc").is_none());
        assert!(Tag::parse("applied:org@ABCDEFG").is_none());
    }

    #[test]
    fn validate_enforces_managed_literal() {
        assert!(Tag::validate("managed:agentsync").is_ok());
        assert!(Tag::validate("managed:someone-else").is_err());
    }

    #[test]
    fn validate_enforces_layer_values() {
        assert!(Tag::validate("layer:base").is_ok());
        assert!(Tag::validate("layer:staging").is_err());
    }

    #[test]
    fn validate_enforces_channel_values() {
        assert!(Tag::validate("channel:stable").is_ok());
        assert!(Tag::validate("channel:nightly").is_err());
    }

    #[test]
    fn validate_requires_version_for_applied() {
        assert!(Tag::validate("applied:org@abc1234").is_ok());
        assert!(Tag::validate("applied:org").is_err());
    }

    #[test]
    fn diff_computes_add_remove_unchanged() {
        let desired = vec!["layer:base".to_owned(), "role:lane-dev".to_owned()];
        let existing = vec!["layer:base".to_owned(), "role:supervisor".to_owned()];
        let result = diff(&desired, &existing, &TagDiffOptions::default());
        assert_eq!(result.to_add, vec!["role:lane-dev".to_owned()]);
        assert_eq!(result.to_remove, vec!["role:supervisor".to_owned()]);
        assert_eq!(result.unchanged, vec!["layer:base".to_owned()]);
    }

    #[test]
    fn diff_management_only_filters_user_tags() {
        let desired = vec!["layer:base".to_owned(), "custom-note".to_owned()];
        let existing: Vec<String> = vec![];
        let options = TagDiffOptions {
            management_only: true,
            ..Default::default()
        };
        let result = diff(&desired, &existing, &options);
        assert_eq!(result.to_add, vec!["layer:base".to_owned()]);
    }

    #[test]
    fn merge_tags_preserves_user_tags_by_default() {
        let desired = vec!["managed:agentsync".to_owned(), "layer:base".to_owned()];
        let existing = vec!["managed:agentsync".to_owned(), "custom-note".to_owned()];
        let merged = merge_tags(&desired, &existing, true);
        assert!(merged.contains(&"custom-note".to_owned()));
        assert!(merged.contains(&"layer:base".to_owned()));
    }

    #[test]
    fn merge_tags_drops_user_tags_when_not_preserving() {
        let desired = vec!["managed:agentsync".to_owned()];
        let existing = vec!["managed:agentsync".to_owned(), "custom-note".to_owned()];
        let merged = merge_tags(&desired, &existing, false);
        assert!(!merged.contains(&"custom-note".to_owned()));
    }

    #[test]
    fn update_applied_tags_strips_prior_and_appends_new() {
        let existing = vec!["applied:org@aaaaaaa".to_owned(), "layer:org".to_owned()];
        let updated = update_applied_tags(&existing, "org", "bbbbbbb");
        assert!(!updated.contains(&"applied:org@aaaaaaa".to_owned()));
        assert!(updated.contains(&"applied:org@bbbbbbb".to_owned()));
        assert!(updated.contains(&"layer:org".to_owned()));
    }

    #[test]
    fn check_remove_managed_blocks_without_opt_in() {
        let to_remove = vec!["managed:agentsync".to_owned()];
        assert!(check_remove_managed(&to_remove, false).is_err());
        assert!(check_remove_managed(&to_remove, true).is_ok());
    }

    #[test]
    fn check_remove_managed_allows_unrelated_removals() {
        let to_remove = vec!["role:supervisor".to_owned()];
        assert!(check_remove_managed(&to_remove, false).is_ok());
    }
}
