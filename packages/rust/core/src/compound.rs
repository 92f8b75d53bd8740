//! Compound tree.
//!
//! Documentation entities (namespaces, classes, groups, ...) live in an arena
//! owned by [`CompoundTree`]. Each node owns its children through the arena
//! indices listed in its child table; the parent link is a plain index used
//! only for re-parenting and cycle checks.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use doxymark_shared::{
    BaseRef, ChildView, CompoundKind, CompoundView, DoxymarkError, MemberRecord, Result,
    SCOPE_SEPARATOR,
};

/// Stable handle to a node in a [`CompoundTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompoundId(usize);

/// Which collection of a compound an operation walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Direct member declarations.
    Members,
    /// Child compounds (recursive where the operation recurses).
    Compounds,
}

/// An entry produced by enumeration or filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    Compound(CompoundId),
    Member { owner: CompoundId, index: usize },
}

impl Item {
    pub fn as_compound(&self) -> Option<CompoundId> {
        match self {
            Item::Compound(id) => Some(*id),
            Item::Member { .. } => None,
        }
    }
}

/// Ordered category lists controlling what is rendered and in which order.
#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    /// Member section kinds, in output order.
    pub member_sections: Vec<String>,
    /// Compound kinds, in output order.
    pub compound_kinds: Vec<String>,
}

// ---------------------------------------------------------------------------
// Compound
// ---------------------------------------------------------------------------

/// One documentation entity.
#[derive(Debug, Clone, Default)]
pub struct Compound {
    name: String,
    kind: Option<CompoundKind>,
    parent: Option<CompoundId>,
    children: Vec<CompoundId>,
    child_index: HashMap<String, CompoundId>,
    group_id: Option<String>,
    filtered_members: Vec<usize>,
    filtered_children: Vec<CompoundId>,

    /// Doxygen compound id (also the group identifier for groups).
    pub refid: String,
    pub brief: String,
    pub detailed: String,
    /// Members in declaration order.
    pub members: Vec<MemberRecord>,
    /// Base class references, passed through to templates untouched.
    pub base_refs: Vec<BaseRef>,
    /// Template-only attributes.
    pub extra: BTreeMap<String, String>,
}

impl Compound {
    fn new(name: String, parent: Option<CompoundId>) -> Self {
        Self {
            name,
            parent,
            ..Default::default()
        }
    }

    /// Qualified name; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` while the node is only a path placeholder.
    pub fn kind(&self) -> Option<CompoundKind> {
        self.kind
    }

    pub fn parent(&self) -> Option<CompoundId> {
        self.parent
    }

    /// Child compounds in insertion order.
    pub fn children(&self) -> &[CompoundId] {
        &self.children
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// Indexes into [`Compound::members`] that passed the last filter run.
    pub fn filtered_members(&self) -> &[usize] {
        &self.filtered_members
    }

    /// Children that passed the last filter run, in category order.
    pub fn filtered_children(&self) -> &[CompoundId] {
        &self.filtered_children
    }
}

// ---------------------------------------------------------------------------
// CompoundTree
// ---------------------------------------------------------------------------

/// Arena holding every compound; index 0 is the unnamed root.
///
/// Groups hang off the root like any top-level compound but are indexed by
/// name separately, so a group and a namespace may share a name.
#[derive(Debug, Clone)]
pub struct CompoundTree {
    nodes: Vec<Compound>,
    group_index: HashMap<String, CompoundId>,
}

impl Default for CompoundTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CompoundTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Compound::new(String::new(), None)],
            group_index: HashMap::new(),
        }
    }

    pub fn root(&self) -> CompoundId {
        CompoundId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Panics if `id` was not issued by this tree.
    pub fn get(&self, id: CompoundId) -> &Compound {
        &self.nodes[id.0]
    }

    /// Panics if `id` was not issued by this tree.
    pub fn get_mut(&mut self, id: CompoundId) -> &mut Compound {
        &mut self.nodes[id.0]
    }

    /// Look up a direct child of `at` by its qualified name segments.
    pub fn lookup<S: AsRef<str>>(&self, at: CompoundId, parts: &[S]) -> Option<CompoundId> {
        let name = join_parts(parts);
        self.get(at).child_index.get(&name).copied()
    }

    /// Find the direct child of `at` named by `parts`, creating an
    /// unset-kind placeholder when absent and `create` is set.
    ///
    /// Repeated calls with the same arguments return the same node.
    pub fn find<S: AsRef<str>>(
        &mut self,
        at: CompoundId,
        parts: &[S],
        create: bool,
    ) -> Result<Option<CompoundId>> {
        let name = join_parts(parts);

        if let Some(id) = self.get(at).child_index.get(&name) {
            return Ok(Some(*id));
        }
        if !create {
            return Ok(None);
        }
        if name.is_empty() {
            return Err(DoxymarkError::config("cannot create compound without name"));
        }

        let id = CompoundId(self.nodes.len());
        self.nodes.push(Compound::new(name.clone(), Some(at)));
        let parent = self.get_mut(at);
        parent.children.push(id);
        parent.child_index.insert(name, id);
        trace!(name = %self.get(id).name, "created compound");
        Ok(Some(id))
    }

    /// [`CompoundTree::find`] with creation, for callers that always want a node.
    pub fn find_or_create<S: AsRef<str>>(&mut self, at: CompoundId, parts: &[S]) -> Result<CompoundId> {
        self.find(at, parts, true)?
            .ok_or_else(|| DoxymarkError::hierarchy("lookup-or-create returned no compound"))
    }

    /// Find or create the top-level group `name`.
    ///
    /// The node is a child of the root with kind [`CompoundKind::Group`], but
    /// it is not entered in the root's scope index: scope lookups through
    /// [`CompoundTree::find`] never see it.
    pub fn find_or_create_group(&mut self, name: &str) -> Result<CompoundId> {
        if let Some(id) = self.group_index.get(name) {
            return Ok(*id);
        }
        if name.is_empty() {
            return Err(DoxymarkError::config("cannot create group without name"));
        }

        let root = self.root();
        let id = CompoundId(self.nodes.len());
        let mut group = Compound::new(name.to_string(), Some(root));
        group.kind = Some(CompoundKind::Group);
        self.nodes.push(group);
        self.get_mut(root).children.push(id);
        self.group_index.insert(name.to_string(), id);
        trace!(name, "created group");
        Ok(id)
    }

    /// Record the node's real kind. A kind can be set once; setting the
    /// same kind again is a no-op.
    pub fn set_kind(&mut self, id: CompoundId, kind: CompoundKind) -> Result<()> {
        let node = self.get_mut(id);
        match node.kind {
            None => {
                node.kind = Some(kind);
                Ok(())
            }
            Some(existing) if existing == kind => Ok(()),
            Some(existing) => Err(DoxymarkError::hierarchy(format!(
                "compound '{}' is already a {existing}, cannot become a {kind}",
                node.name
            ))),
        }
    }

    /// True when `ancestor` is `id` itself or lies on `id`'s parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: CompoundId, id: CompoundId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.get(current).parent;
        }
        false
    }

    /// Move `id` under `new_parent`, keeping its name.
    ///
    /// Fails without touching the tree when the move would create a cycle
    /// or collide with an existing sibling of the same name.
    pub fn reparent(&mut self, id: CompoundId, new_parent: CompoundId) -> Result<()> {
        if id == self.root() {
            return Err(DoxymarkError::hierarchy("the root compound cannot be moved"));
        }
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(DoxymarkError::hierarchy(format!(
                "'{}' cannot be moved under itself or its descendant '{}'",
                self.get(id).name,
                self.get(new_parent).name
            )));
        }

        let name = self.get(id).name.clone();
        if let Some(existing) = self.get(new_parent).child_index.get(&name) {
            if *existing == id {
                return Ok(());
            }
            return Err(DoxymarkError::hierarchy(format!(
                "'{}' already has a child named '{name}'",
                self.get(new_parent).name
            )));
        }

        if let Some(old_parent) = self.get(id).parent {
            let old = self.get_mut(old_parent);
            if old.child_index.get(&name) == Some(&id) {
                old.child_index.remove(&name);
            }
            old.children.retain(|child| *child != id);
        }

        let parent = self.get_mut(new_parent);
        parent.children.push(id);
        parent.child_index.insert(name, id);
        self.get_mut(id).parent = Some(new_parent);

        debug!(
            compound = %self.get(id).name,
            parent = %self.get(new_parent).name,
            "reparented compound"
        );
        Ok(())
    }

    /// Tag the node and each of its direct members with `group_id`.
    /// Child compounds keep their own assignment.
    pub fn assign_group(&mut self, id: CompoundId, group_id: &str) {
        let node = self.get_mut(id);
        node.group_id = Some(group_id.to_string());
        for member in &mut node.members {
            member.group_id = Some(group_id.to_string());
        }
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    /// Unfiltered depth-first pre-order enumeration of a collection.
    pub fn to_array(&self, id: CompoundId, collection: Collection) -> Vec<Item> {
        self.get_all(id, collection, false)
    }

    /// Depth-first pre-order enumeration: every compound is immediately
    /// followed by its own descendants, before its next sibling.
    ///
    /// With `filtered`, only the cached filter results are walked. No
    /// pruning happens here; [`CompoundTree::filter`] already decided.
    pub fn get_all(&self, id: CompoundId, collection: Collection, filtered: bool) -> Vec<Item> {
        let node = self.get(id);
        match collection {
            Collection::Members => {
                if filtered {
                    node.filtered_members
                        .iter()
                        .map(|&index| Item::Member { owner: id, index })
                        .collect()
                } else {
                    (0..node.members.len())
                        .map(|index| Item::Member { owner: id, index })
                        .collect()
                }
            }
            Collection::Compounds => {
                let mut all = Vec::new();
                self.collect_compounds(id, filtered, &mut all);
                all
            }
        }
    }

    fn collect_compounds(&self, id: CompoundId, filtered: bool, out: &mut Vec<Item>) {
        let node = self.get(id);
        let children = if filtered {
            &node.filtered_children
        } else {
            &node.children
        };
        for &child in children {
            out.push(Item::Compound(child));
            self.collect_compounds(child, filtered, out);
        }
    }

    // -----------------------------------------------------------------------
    // Filtering
    // -----------------------------------------------------------------------

    /// Bucket a collection of `id` by category and emit the buckets in the
    /// order of `categories`, declaration order inside each bucket.
    ///
    /// Categories not listed are dropped. A namespace with nothing left in
    /// its own filtered collections is dropped. With a `group`, any other
    /// item whose group differs is dropped.
    pub fn filter(
        &self,
        id: CompoundId,
        collection: Collection,
        categories: &[String],
        group: Option<&str>,
    ) -> Vec<Item> {
        let node = self.get(id);
        let mut buckets: HashMap<&str, Vec<Item>> = HashMap::new();

        match collection {
            Collection::Members => {
                for (index, member) in node.members.iter().enumerate() {
                    if group.is_some_and(|g| member.group_id.as_deref() != Some(g)) {
                        trace!(member = %member.name, owner = %node.name, "skip foreign group");
                        continue;
                    }
                    buckets
                        .entry(member.section.as_str())
                        .or_default()
                        .push(Item::Member { owner: id, index });
                }
            }
            Collection::Compounds => {
                for &child_id in &node.children {
                    let child = self.get(child_id);
                    let Some(kind) = child.kind else {
                        trace!(name = %child.name, "skip placeholder compound");
                        continue;
                    };
                    if kind == CompoundKind::Namespace {
                        if child.filtered_children.is_empty() && child.filtered_members.is_empty() {
                            debug!(name = %child.name, "skip empty namespace");
                            continue;
                        }
                    } else if group.is_some_and(|g| child.group_id.as_deref() != Some(g)) {
                        debug!(
                            kind = %kind,
                            name = %child.name,
                            group_id = ?child.group_id,
                            "skip foreign group"
                        );
                        continue;
                    }
                    buckets
                        .entry(kind.as_str())
                        .or_default()
                        .push(Item::Compound(child_id));
                }
            }
        }

        categories
            .iter()
            .flat_map(|category| buckets.remove(category.as_str()).unwrap_or_default())
            .collect()
    }

    /// Recompute the filter caches of `id` and its whole subtree.
    ///
    /// Children are refreshed before their parent so the empty-namespace
    /// rule sees up-to-date results.
    pub fn refresh_filters(&mut self, id: CompoundId, policy: &FilterPolicy, group: Option<&str>) {
        let children = self.get(id).children.clone();
        for child in children {
            self.refresh_filters(child, policy, group);
        }

        let members = self
            .filter(id, Collection::Members, &policy.member_sections, group)
            .into_iter()
            .filter_map(|item| match item {
                Item::Member { index, .. } => Some(index),
                Item::Compound(_) => None,
            })
            .collect();
        let children = self
            .filter(id, Collection::Compounds, &policy.compound_kinds, group)
            .into_iter()
            .filter_map(|item| item.as_compound())
            .collect();

        let node = self.get_mut(id);
        node.filtered_members = members;
        node.filtered_children = children;
    }

    // -----------------------------------------------------------------------
    // Rendering support
    // -----------------------------------------------------------------------

    /// A namespace whose only child is another namespace adds nothing of
    /// its own and is skipped at render time.
    pub fn is_pass_through(&self, id: CompoundId) -> bool {
        let node = self.get(id);
        node.kind == Some(CompoundKind::Namespace)
            && node.children.len() == 1
            && self.get(node.children[0]).kind == Some(CompoundKind::Namespace)
    }

    /// Snapshot of a node for the renderer, built from the filter caches.
    pub fn view(&self, id: CompoundId) -> CompoundView {
        let node = self.get(id);
        CompoundView {
            kind: node.kind.map(|k| k.as_str()).unwrap_or_default().to_string(),
            name: node.name.clone(),
            refid: node.refid.clone(),
            brief: node.brief.clone(),
            detailed: node.detailed.clone(),
            pass_through: self.is_pass_through(id),
            base_refs: node.base_refs.clone(),
            members: node
                .filtered_members
                .iter()
                .filter_map(|&index| node.members.get(index).cloned())
                .collect(),
            children: node
                .filtered_children
                .iter()
                .map(|&child_id| {
                    let child = self.get(child_id);
                    ChildView {
                        kind: child.kind.map(|k| k.as_str()).unwrap_or_default().to_string(),
                        name: child.name.clone(),
                        refid: child.refid.clone(),
                        brief: child.brief.clone(),
                    }
                })
                .collect(),
            extra: node.extra.clone(),
        }
    }
}

fn join_parts<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(SCOPE_SEPARATOR)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
