//! Ontology Index (spec.md §4.1): an arena of interned term ids supporting
//! ancestor/descendant/subclass queries over a fixed is-a DAG.
//!
//! Terms are interned into small integers at build time (spec.md §9); the
//! public API still speaks in [`TermId`], a cheap `Arc<str>`-backed handle
//! whose equality and ordering are by canonical string, matching the data
//! model's contract. No mutation is possible once `OntologyBuilder::build`
//! returns.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::err::ConfigurationError;

/// Opaque ontology term identifier, e.g. `HP:0001265`. Equality and
/// ordering are by the canonical string.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(Arc<str>);

impl TermId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: AsRef<str>> From<S> for TermId {
    fn from(s: S) -> Self {
        TermId(Arc::from(s.as_ref()))
    }
}

impl std::fmt::Display for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq for TermId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}
impl Eq for TermId {}

impl PartialOrd for TermId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for TermId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_ref().cmp(other.0.as_ref())
    }
}
impl std::hash::Hash for TermId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_ref().hash(state)
    }
}

/// One ontology term as supplied by a collaborator (spec.md §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TermRecord {
    pub id: TermId,
    pub name: String,
    #[serde(default)]
    pub is_obsolete: bool,
    #[serde(default)]
    pub alt_ids: Vec<TermId>,
}

/// Collaborator input to [`OntologyBuilder`]: a term list and an is-a edge
/// list (child, parent), matching spec.md §6 verbatim.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OntologyInput {
    pub terms: Vec<TermRecord>,
    pub edges: Vec<(TermId, TermId)>,
}

type Idx = u32;

#[derive(Debug)]
struct TermNode {
    id: TermId,
    name: String,
    is_obsolete: bool,
    parents: Vec<Idx>,
    children: Vec<Idx>,
}

/// Immutable ontology index. Construct via [`OntologyBuilder`].
#[derive(Debug)]
pub struct Ontology {
    terms: Vec<TermNode>,
    index: HashMap<TermId, Idx>,
    alt_to_primary: HashMap<TermId, TermId>,
    /// Ancestor closure including self, precomputed once at build time.
    ancestors_incl_self: Vec<BTreeSet<Idx>>,
    /// Descendant closure including self, precomputed once at build time.
    descendants_incl_self: Vec<BTreeSet<Idx>>,
}

/// Builds an [`Ontology`] from collaborator-supplied terms and edges. No
/// process-wide state: every build produces an independent, immutable value
/// (spec.md §9 "global state and singletons").
#[derive(Default)]
pub struct OntologyBuilder {
    terms: Vec<TermRecord>,
    edges: Vec<(TermId, TermId)>,
}

impl OntologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(mut self, term: TermRecord) -> Self {
        self.terms.push(term);
        self
    }

    pub fn add_edge(mut self, child: TermId, parent: TermId) -> Self {
        self.edges.push((child, parent));
        self
    }

    pub fn from_input(input: OntologyInput) -> Self {
        Self {
            terms: input.terms,
            edges: input.edges,
        }
    }

    pub fn build(self) -> Result<Ontology, ConfigurationError> {
        if self.terms.is_empty() {
            return Err(ConfigurationError::EmptyOntology);
        }

        let mut index = HashMap::with_capacity(self.terms.len());
        let mut terms = Vec::with_capacity(self.terms.len());
        let mut alt_to_primary = HashMap::new();

        for record in &self.terms {
            let idx = terms.len() as Idx;
            index.insert(record.id.clone(), idx);
            terms.push(TermNode {
                id: record.id.clone(),
                name: record.name.clone(),
                is_obsolete: record.is_obsolete,
                parents: Vec::new(),
                children: Vec::new(),
            });
            for alt in &record.alt_ids {
                alt_to_primary.insert(alt.clone(), record.id.clone());
            }
        }

        for (child, parent) in &self.edges {
            let child_idx = *index
                .get(child)
                .ok_or_else(|| ConfigurationError::UnknownEdgeTerm(child.to_string()))?;
            let parent_idx = *index
                .get(parent)
                .ok_or_else(|| ConfigurationError::UnknownEdgeTerm(parent.to_string()))?;
            terms[child_idx as usize].parents.push(parent_idx);
            terms[parent_idx as usize].children.push(child_idx);
        }

        let n = terms.len();
        let mut ancestors_incl_self = vec![BTreeSet::new(); n];
        for idx in 0..n {
            compute_ancestors(idx as Idx, &terms, &mut ancestors_incl_self);
        }
        let mut descendants_incl_self: Vec<BTreeSet<Idx>> = vec![BTreeSet::new(); n];
        for (idx, ancestors) in ancestors_incl_self.iter().enumerate() {
            for &ancestor in ancestors {
                descendants_incl_self[ancestor as usize].insert(idx as Idx);
            }
        }

        Ok(Ontology {
            terms,
            index,
            alt_to_primary,
            ancestors_incl_self,
            descendants_incl_self,
        })
    }
}

/// Memoized post-order closure computation. Safe against an already-visited
/// (possibly still-empty-looking) entry because every term's direct parents
/// are resolved before the term is added to `out`, which only happens once
/// per index.
fn compute_ancestors(idx: Idx, terms: &[TermNode], out: &mut [BTreeSet<Idx>]) {
    if !out[idx as usize].is_empty() || terms[idx as usize].parents.is_empty() {
        out[idx as usize].insert(idx);
        return;
    }
    let parents = terms[idx as usize].parents.clone();
    let mut closure = BTreeSet::new();
    closure.insert(idx);
    for parent in parents {
        if out[parent as usize].is_empty() {
            compute_ancestors(parent, terms, out);
        }
        closure.extend(out[parent as usize].iter().copied());
    }
    out[idx as usize] = closure;
}

impl Ontology {
    /// Follows the alt-id chain to the canonical term id. Returns `None` if
    /// `term` is neither a primary id nor a known alt id.
    pub fn primary_id(&self, term: &TermId) -> Option<TermId> {
        if self.index.contains_key(term) {
            Some(term.clone())
        } else {
            self.alt_to_primary.get(term).cloned()
        }
    }

    fn idx_of(&self, term: &TermId) -> Option<Idx> {
        let primary = self.primary_id(term)?;
        self.index.get(&primary).copied()
    }

    pub fn contains(&self, term: &TermId) -> bool {
        self.idx_of(term).is_some()
    }

    pub fn name(&self, term: &TermId) -> Option<&str> {
        let idx = self.idx_of(term)?;
        Some(&self.terms[idx as usize].name)
    }

    pub fn is_obsolete(&self, term: &TermId) -> Option<bool> {
        let idx = self.idx_of(term)?;
        Some(self.terms[idx as usize].is_obsolete)
    }

    pub fn parents(&self, term: &TermId) -> Option<Vec<TermId>> {
        let idx = self.idx_of(term)?;
        Some(
            self.terms[idx as usize]
                .parents
                .iter()
                .map(|&p| self.terms[p as usize].id.clone())
                .collect(),
        )
    }

    pub fn children(&self, term: &TermId) -> Option<Vec<TermId>> {
        let idx = self.idx_of(term)?;
        Some(
            self.terms[idx as usize]
                .children
                .iter()
                .map(|&c| self.terms[c as usize].id.clone())
                .collect(),
        )
    }

    /// Transitive closure over is-a, as a set of [`TermId`]. `ancestors(t,
    /// true)` always contains `t` itself.
    pub fn ancestors(&self, term: &TermId, include_self: bool) -> Option<BTreeSet<TermId>> {
        let idx = self.idx_of(term)?;
        Some(self.idx_set_to_term_set(&self.ancestors_incl_self[idx as usize], idx, include_self))
    }

    pub fn descendants(&self, term: &TermId, include_self: bool) -> Option<BTreeSet<TermId>> {
        let idx = self.idx_of(term)?;
        Some(self.idx_set_to_term_set(
            &self.descendants_incl_self[idx as usize],
            idx,
            include_self,
        ))
    }

    fn idx_set_to_term_set(
        &self,
        set: &BTreeSet<Idx>,
        self_idx: Idx,
        include_self: bool,
    ) -> BTreeSet<TermId> {
        set.iter()
            .filter(|&&i| include_self || i != self_idx)
            .map(|&i| self.terms[i as usize].id.clone())
            .collect()
    }

    /// `b ∈ ancestors(a, true)`.
    pub fn is_subclass(&self, a: &TermId, b: &TermId) -> bool {
        let (Some(a_idx), Some(b_idx)) = (self.idx_of(a), self.idx_of(b)) else {
            return false;
        };
        self.ancestors_incl_self[a_idx as usize].contains(&b_idx)
    }

    /// Union of `ancestors(t, include_self)` for every `t` in `terms`.
    /// Unknown terms are silently skipped (the caller is expected to have
    /// already surfaced them via the evaluator's errors collector).
    pub fn all_ancestors_of_set<'a>(
        &self,
        terms: impl IntoIterator<Item = &'a TermId>,
        include_self: bool,
    ) -> BTreeSet<TermId> {
        let mut result = BTreeSet::new();
        for term in terms {
            if let Some(ancestors) = self.ancestors(term, include_self) {
                result.extend(ancestors);
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_fixture {
    //! A tiny synthetic ontology reused by the `lr`, `background`, and
    //! `evaluate` test modules: a two-level tree under the phenotypic
    //! abnormality root.
    //!
    //! ```text
    //! HP:0000118 (root)
    //!  └─ HP:parent
    //!      ├─ HP:specific (4 children total, used for the prop() tests)
    //!      ├─ HP:child2
    //!      ├─ HP:child3
    //!      └─ HP:child4
    //!  └─ HP:ancestor
    //!      └─ HP:specific2
    //! ```
    use super::*;

    pub fn small_ontology() -> Ontology {
        let root = TermId::from("HP:0000118");
        let parent = TermId::from("HP:parent");
        let specific = TermId::from("HP:specific");
        let child2 = TermId::from("HP:child2");
        let child3 = TermId::from("HP:child3");
        let child4 = TermId::from("HP:child4");
        let ancestor = TermId::from("HP:ancestor");
        let specific2 = TermId::from("HP:specific2");
        let unrelated = TermId::from("HP:foo");

        let mut builder = OntologyBuilder::new();
        for (id, name) in [
            (&root, "Phenotypic abnormality"),
            (&parent, "Parent term"),
            (&specific, "Specific term"),
            (&child2, "Child 2"),
            (&child3, "Child 3"),
            (&child4, "Child 4"),
            (&ancestor, "Ancestor term"),
            (&specific2, "Specific term 2"),
            (&unrelated, "Unrelated term"),
        ] {
            builder = builder.add_term(TermRecord {
                id: id.clone(),
                name: name.to_string(),
                is_obsolete: false,
                alt_ids: vec![],
            });
        }
        builder = builder
            .add_edge(parent.clone(), root.clone())
            .add_edge(ancestor.clone(), root.clone())
            .add_edge(specific.clone(), parent.clone())
            .add_edge(child2.clone(), parent.clone())
            .add_edge(child3.clone(), parent.clone())
            .add_edge(child4.clone(), parent.clone())
            .add_edge(specific2.clone(), ancestor.clone())
            .add_edge(unrelated.clone(), root.clone());
        builder.build().expect("fixture ontology must build")
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixture::small_ontology;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ancestors_include_self_contains_term() {
        let ont = small_ontology();
        let t = TermId::from("HP:specific");
        let anc = ont.ancestors(&t, true).unwrap();
        assert!(anc.contains(&t));
        assert!(anc.contains(&TermId::from("HP:parent")));
        assert!(anc.contains(&TermId::from("HP:0000118")));
        assert_eq!(anc.len(), 3);
    }

    #[test]
    fn ancestors_exclude_self() {
        let ont = small_ontology();
        let t = TermId::from("HP:specific");
        let anc = ont.ancestors(&t, false).unwrap();
        assert!(!anc.contains(&t));
        assert_eq!(anc.len(), 2);
    }

    #[test]
    fn is_subclass_true_and_false() {
        let ont = small_ontology();
        let specific = TermId::from("HP:specific");
        let parent = TermId::from("HP:parent");
        let ancestor = TermId::from("HP:ancestor");
        assert!(ont.is_subclass(&specific, &parent));
        assert!(ont.is_subclass(&specific, &specific));
        assert!(!ont.is_subclass(&specific, &ancestor));
    }

    #[test]
    fn unknown_term_returns_none() {
        let ont = small_ontology();
        let missing = TermId::from("HP:9999999");
        assert!(ont.ancestors(&missing, true).is_none());
        assert!(!ont.contains(&missing));
    }

    #[test]
    fn children_of_parent() {
        let ont = small_ontology();
        let parent = TermId::from("HP:parent");
        let children = ont.children(&parent).unwrap();
        assert_eq!(children.len(), 4);
    }

    #[test]
    fn alt_id_resolves_to_primary() {
        let root = TermId::from("HP:0000118");
        let alt = TermId::from("HP:0000001");
        let builder = OntologyBuilder::new().add_term(TermRecord {
            id: root.clone(),
            name: "root".into(),
            is_obsolete: false,
            alt_ids: vec![alt.clone()],
        });
        let ont = builder.build().unwrap();
        assert_eq!(ont.primary_id(&alt), Some(root.clone()));
        assert_eq!(ont.name(&alt), Some("root"));
    }
}
