use crate::core::feed::types::RemoteTerm;
use crate::core::storage::models::TermKind;
use crate::core::storage::repository::ContentRepository;

/// Local term identifiers and names grouped per kind, deduplicated by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTerms {
    pub category_ids: Vec<i64>,
    pub category_names: Vec<String>,
    pub tag_ids: Vec<i64>,
    pub tag_names: Vec<String>,
}

impl ResolvedTerms {
    fn push(&mut self, kind: TermKind, term_id: i64, name: String) {
        let (ids, names) = match kind {
            TermKind::Category => (&mut self.category_ids, &mut self.category_names),
            TermKind::Tag => (&mut self.tag_ids, &mut self.tag_names),
        };
        if ids.contains(&term_id) {
            return;
        }
        ids.push(term_id);
        names.push(name);
    }
}

/// Maps remote terms onto local ones, creating any that are missing. Remote
/// terms with an unrecognized taxonomy or an empty name are dropped, and a
/// failed creation skips only that term.
pub async fn resolve_terms(
    repository: &ContentRepository,
    remote_terms: &[RemoteTerm],
) -> ResolvedTerms {
    let mut resolved = ResolvedTerms::default();
    for remote in remote_terms {
        let Some(kind) = TermKind::from_taxonomy(&remote.taxonomy) else {
            continue;
        };
        let name = remote.name.trim();
        if name.is_empty() {
            continue;
        }
        let raw_slug = if remote.slug.trim().is_empty() {
            name
        } else {
            remote.slug.trim()
        };
        let slug = slugify(raw_slug);
        if slug.is_empty() {
            continue;
        }

        let lookup = match repository.get_or_create_term(kind, name, &slug).await {
            Ok(lookup) => lookup,
            Err(error) => {
                tracing::warn!("term '{name}' could not be resolved: {error}");
                continue;
            }
        };
        let term_id = lookup.term_id();
        let local_name = match repository.get_term_by_id(term_id).await {
            Ok(Some(term)) => term.name,
            _ => name.to_string(),
        };
        resolved.push(kind, term_id, local_name);
    }
    resolved
}

/// Normalizes a slug or name into the natural key used for term matching.
/// Creation and lookup both go through this, so repeated imports of the same
/// name always converge on the same local term.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;
    for ch in input.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }
    slug
}
