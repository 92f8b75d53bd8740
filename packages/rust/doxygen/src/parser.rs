//! Doxygen XML parser.
//!
//! Understands the two document types Doxygen's XML output consists of:
//! - `index.xml`: `<doxygenindex>` with one `<compound refid kind>` per entity
//! - `<refid>.xml`: `<doxygen><compounddef>` with descriptions, base classes,
//!   inner compounds and `<sectiondef kind>` blocks of `<memberdef>`s

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};

use doxymark_shared::{
    BaseRef, CompoundKind, DoxymarkError, EntityRecord, MemberRecord, Result,
    split_qualified_name,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One `<compound>` entry of `index.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Compound id; also the compound file's base name.
    pub refid: String,
    /// Raw Doxygen kind (`class`, `namespace`, `file`, ...).
    pub kind: String,
    /// Qualified compound name.
    pub name: String,
}

impl IndexEntry {
    /// Compounds that have no place in the API hierarchy.
    pub fn is_structural(&self) -> bool {
        !matches!(self.kind.as_str(), "file" | "dir" | "page" | "example")
    }

    /// Record built from the index alone, used when the compound file is missing.
    pub fn to_record(&self) -> EntityRecord {
        EntityRecord {
            refid: self.refid.clone(),
            kind: CompoundKind::from_doxygen(&self.kind),
            path: split_qualified_name(&self.name),
            brief: String::new(),
            detailed: String::new(),
            members: vec![],
            base_refs: vec![],
            inner: vec![],
            extra: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Runs of whitespace, collapsed to a single space in descriptions.
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

fn parse_document(xml: &str) -> Result<Document<'_>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, options)
        .map_err(|e| DoxymarkError::parse(format!("XML parse error: {e}")))
}

/// Parse `index.xml` into its compound entries, in document order.
pub fn parse_index(xml: &str) -> Result<Vec<IndexEntry>> {
    let doc = parse_document(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "doxygenindex" {
        return Err(DoxymarkError::parse(format!(
            "expected <doxygenindex>, found <{}>",
            root.tag_name().name()
        )));
    }

    let mut entries = Vec::new();
    for compound in children_named(root, "compound") {
        let (Some(refid), Some(kind)) = (compound.attribute("refid"), compound.attribute("kind"))
        else {
            return Err(DoxymarkError::parse("<compound> without refid or kind"));
        };
        let name = child_text(compound, "name").unwrap_or_default();
        entries.push(IndexEntry {
            refid: refid.to_string(),
            kind: kind.to_string(),
            name,
        });
    }
    Ok(entries)
}

/// Parse a compound file (`<refid>.xml`) into an entity record.
pub fn parse_compound(xml: &str) -> Result<EntityRecord> {
    let doc = parse_document(xml)?;
    let def = doc
        .descendants()
        .find(|n| n.has_tag_name("compounddef"))
        .ok_or_else(|| DoxymarkError::parse("missing <compounddef>"))?;

    let refid = def
        .attribute("id")
        .ok_or_else(|| DoxymarkError::parse("<compounddef> without id"))?
        .to_string();
    let kind = CompoundKind::from_doxygen(def.attribute("kind").unwrap_or_default());
    let name = child_text(def, "compoundname")
        .ok_or_else(|| DoxymarkError::parse(format!("compound {refid} has no <compoundname>")))?;

    let mut extra = BTreeMap::new();
    if let Some(title) = child_text(def, "title") {
        extra.insert("title".to_string(), title);
    }
    if let Some(language) = def.attribute("language") {
        extra.insert("language".to_string(), language.to_string());
    }

    let base_refs = children_named(def, "basecompoundref")
        .map(|base| BaseRef {
            name: flatten_text(base),
            refid: base.attribute("refid").map(String::from),
            prot: base.attribute("prot").unwrap_or("public").to_string(),
            virt: base.attribute("virt").unwrap_or("non-virtual").to_string(),
        })
        .collect();

    let inner = def
        .children()
        .filter(|n| {
            n.is_element()
                && matches!(
                    n.tag_name().name(),
                    "innerclass" | "innernamespace" | "innergroup"
                )
        })
        .filter_map(|n| n.attribute("refid").map(String::from))
        .collect();

    let mut members = Vec::new();
    for section in children_named(def, "sectiondef") {
        let section_kind = section.attribute("kind").unwrap_or_default();
        for memberdef in children_named(section, "memberdef") {
            members.push(parse_member(memberdef, section_kind));
        }
    }

    Ok(EntityRecord {
        refid,
        kind,
        path: split_qualified_name(&name),
        brief: description(def, "briefdescription"),
        detailed: description(def, "detaileddescription"),
        members,
        base_refs,
        inner,
        extra,
    })
}

fn parse_member(memberdef: Node<'_, '_>, section: &str) -> MemberRecord {
    MemberRecord {
        refid: memberdef.attribute("id").unwrap_or_default().to_string(),
        kind: memberdef.attribute("kind").unwrap_or_default().to_string(),
        section: section.to_string(),
        name: child_text(memberdef, "name").unwrap_or_default(),
        prot: memberdef.attribute("prot").unwrap_or("public").to_string(),
        is_static: memberdef.attribute("static") == Some("yes"),
        type_name: child_text(memberdef, "type").unwrap_or_default(),
        definition: child_text(memberdef, "definition").unwrap_or_default(),
        argsstring: child_text(memberdef, "argsstring").unwrap_or_default(),
        brief: description(memberdef, "briefdescription"),
        detailed: description(memberdef, "detaileddescription"),
        group_id: None,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn children_named<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    parent
        .children()
        .filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

/// All text below `node`, whitespace collapsed.
fn flatten_text(node: Node<'_, '_>) -> String {
    let raw: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}

/// Text of the first child element named `tag`, if non-empty.
fn child_text(parent: Node<'_, '_>, tag: &str) -> Option<String> {
    parent
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
        .map(flatten_text)
        .filter(|s| !s.is_empty())
}

/// A description element rendered as paragraphs separated by blank lines.
fn description(parent: Node<'_, '_>, tag: &str) -> String {
    let Some(desc) = parent
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
    else {
        return String::new();
    };

    let paragraphs: Vec<String> = children_named(desc, "para")
        .map(flatten_text)
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        flatten_text(desc)
    } else {
        paragraphs.join("\n\n")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
