//! Core domain types: parsed entity records and the views handed to templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Separator between qualified name segments.
pub const SCOPE_SEPARATOR: &str = "::";

// ---------------------------------------------------------------------------
// CompoundKind
// ---------------------------------------------------------------------------

/// Kind of a documentation compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundKind {
    Namespace,
    Class,
    Struct,
    Union,
    Typedef,
    Group,
    Other,
}

impl CompoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompoundKind::Namespace => "namespace",
            CompoundKind::Class => "class",
            CompoundKind::Struct => "struct",
            CompoundKind::Union => "union",
            CompoundKind::Typedef => "typedef",
            CompoundKind::Group => "group",
            CompoundKind::Other => "other",
        }
    }

    /// Map a Doxygen `kind` attribute. Anything outside the closed set is `Other`.
    pub fn from_doxygen(kind: &str) -> Self {
        match kind {
            "namespace" => CompoundKind::Namespace,
            "class" => CompoundKind::Class,
            "struct" => CompoundKind::Struct,
            "union" => CompoundKind::Union,
            "typedef" => CompoundKind::Typedef,
            "group" => CompoundKind::Group,
            _ => CompoundKind::Other,
        }
    }
}

impl std::fmt::Display for CompoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records produced by the parser
// ---------------------------------------------------------------------------

/// Reference to a base class, as listed in the compound's inheritance list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRef {
    /// Displayed base name (may include template arguments).
    pub name: String,
    /// Refid of the base compound, when Doxygen resolved it.
    pub refid: Option<String>,
    /// Inheritance protection (`public`, `protected`, `private`).
    pub prot: String,
    /// Virtual inheritance marker (`non-virtual`, `virtual`).
    pub virt: String,
}

/// A declaration directly owned by a compound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Doxygen member id.
    pub refid: String,
    /// Member kind (`function`, `variable`, `typedef`, `enum`, ...).
    pub kind: String,
    /// Section category used for filtering (e.g. `public-func`).
    pub section: String,
    /// Short name.
    pub name: String,
    /// Protection level.
    pub prot: String,
    /// Whether the member is static.
    pub is_static: bool,
    /// Return/declared type.
    pub type_name: String,
    /// Full declaration text.
    pub definition: String,
    /// Argument list, for functions.
    pub argsstring: String,
    /// Brief description.
    pub brief: String,
    /// Detailed description.
    pub detailed: String,
    /// Group this member was assigned to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// One compound entity as produced by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Doxygen compound id; doubles as the group identifier for groups.
    pub refid: String,
    /// Compound kind.
    pub kind: CompoundKind,
    /// Qualified name split into scope segments.
    pub path: Vec<String>,
    /// Brief description.
    pub brief: String,
    /// Detailed description.
    pub detailed: String,
    /// Members in declaration order.
    pub members: Vec<MemberRecord>,
    /// Base class references in declaration order.
    pub base_refs: Vec<BaseRef>,
    /// Refids of compounds declared inside this one (classes, namespaces, groups).
    pub inner: Vec<String>,
    /// Template-only attributes (e.g. a group's title).
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl EntityRecord {
    /// Qualified name, joined with `::`.
    pub fn qualified_name(&self) -> String {
        self.path.join(SCOPE_SEPARATOR)
    }
}

/// Split a qualified name into its scope segments.
pub fn split_qualified_name(name: &str) -> Vec<String> {
    name.split(SCOPE_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Views handed to the renderer
// ---------------------------------------------------------------------------

/// A child compound as listed on its parent's page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildView {
    pub kind: String,
    pub name: String,
    pub refid: String,
    pub brief: String,
}

/// Everything a template may reference for one compound.
///
/// All fields are always serialized so strict-mode templates never hit a
/// missing variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundView {
    pub kind: String,
    pub name: String,
    pub refid: String,
    pub brief: String,
    pub detailed: String,
    /// True for a namespace whose only child is another namespace.
    pub pass_through: bool,
    pub base_refs: Vec<BaseRef>,
    /// Filtered members, in category order.
    pub members: Vec<MemberRecord>,
    /// Filtered child compounds, in category order.
    pub children: Vec<ChildView>,
    pub extra: BTreeMap<String, String>,
}
