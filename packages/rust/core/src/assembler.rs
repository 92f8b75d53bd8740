//! Assembly and grouping pass.
//!
//! Turns parser records into a [`CompoundTree`], moves nested compounds under
//! their declaring scope, hands grouped compounds to their group, and plans
//! the ordered node sequence of every output document.

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use doxymark_shared::{CompoundKind, CompoundView, EntityRecord, RenderConfig, Result};

use crate::compound::{Collection, CompoundId, CompoundTree, FilterPolicy};

/// Whether the run produces one document or one document per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Single,
    PerGroup,
}

impl From<&RenderConfig> for OutputMode {
    fn from(config: &RenderConfig) -> Self {
        if config.groups {
            OutputMode::PerGroup
        } else {
            OutputMode::Single
        }
    }
}

impl From<&RenderConfig> for FilterPolicy {
    fn from(config: &RenderConfig) -> Self {
        Self {
            member_sections: config.member_filter.clone(),
            compound_kinds: config.compound_filter.clone(),
        }
    }
}

/// One output document: the nodes to render, in emission order.
#[derive(Debug, Clone)]
pub struct OutputUnit {
    /// Group name for per-group documents, `None` for the single document.
    pub group: Option<String>,
    /// Emission sequence.
    pub nodes: Vec<CompoundId>,
    /// Render snapshots of `nodes`, taken right after filtering.
    pub views: Vec<CompoundView>,
}

/// A populated compound tree plus the refid index used to wire it up.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub tree: CompoundTree,
    by_refid: HashMap<String, CompoundId>,
    mode: OutputMode,
}

impl Assembly {
    /// Node registered under a Doxygen refid.
    pub fn by_refid(&self, refid: &str) -> Option<CompoundId> {
        self.by_refid.get(refid).copied()
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }
}

/// Build the compound tree from parser records.
///
/// Every record is first placed at the root under its qualified name (groups
/// in their own keyspace, so they never collide with a scope), then
/// nested compounds are moved under the scope that declares them. In
/// per-group mode each group then claims the compounds it lists and tags
/// them (and its own members) with its refid. A compound belongs to at most
/// one group: later claims are ignored.
#[instrument(skip_all, fields(records = records.len(), mode = ?mode))]
pub fn build(records: &[EntityRecord], mode: OutputMode) -> Result<Assembly> {
    let mut tree = CompoundTree::new();
    let root = tree.root();
    let mut by_refid: HashMap<String, CompoundId> = HashMap::new();

    for record in records {
        if by_refid.contains_key(&record.refid) {
            warn!(refid = %record.refid, name = %record.qualified_name(), "duplicate compound record, skipping");
            continue;
        }

        let id = if record.kind == CompoundKind::Group {
            tree.find_or_create_group(&record.qualified_name())?
        } else {
            let id = tree.find_or_create(root, &record.path)?;
            tree.set_kind(id, record.kind)?;
            id
        };
        by_refid.insert(record.refid.clone(), id);

        let node = tree.get_mut(id);
        node.refid = record.refid.clone();
        node.brief = record.brief.clone();
        node.detailed = record.detailed.clone();
        node.members.extend(record.members.iter().cloned());
        node.base_refs.extend(record.base_refs.iter().cloned());
        node.extra.extend(record.extra.clone());
    }

    // Structural nesting: namespaces and classes adopt what they declare.
    for record in records.iter().filter(|r| r.kind != CompoundKind::Group) {
        let Some(parent) = by_refid.get(&record.refid).copied() else {
            continue;
        };
        for inner in &record.inner {
            match by_refid.get(inner).copied() {
                Some(child) if tree.get(child).kind() == Some(CompoundKind::Group) => {}
                Some(child) => tree.reparent(child, parent)?,
                None => debug!(parent = %record.qualified_name(), inner = %inner, "inner compound not documented"),
            }
        }
    }

    if mode == OutputMode::PerGroup {
        for record in records.iter().filter(|r| r.kind == CompoundKind::Group) {
            let Some(group) = by_refid.get(&record.refid).copied() else {
                continue;
            };
            claim_for_group(&mut tree, &by_refid, group, record)?;
        }
    }

    info!(compounds = tree.len() - 1, "compound tree built");

    Ok(Assembly {
        tree,
        by_refid,
        mode,
    })
}

/// Move the compounds a group lists under it and tag them with its refid.
fn claim_for_group(
    tree: &mut CompoundTree,
    by_refid: &HashMap<String, CompoundId>,
    group: CompoundId,
    record: &EntityRecord,
) -> Result<()> {
    let group_id = record.refid.as_str();

    for inner in &record.inner {
        let Some(child) = by_refid.get(inner).copied() else {
            debug!(group = %record.qualified_name(), inner = %inner, "grouped compound not documented");
            continue;
        };
        let compound = tree.get(child);
        if compound.kind() == Some(CompoundKind::Group) {
            // Nested groups get their own document.
            continue;
        }
        if let Some(owner) = compound.group_id() {
            warn!(
                compound = %compound.name(),
                owner,
                ignored = group_id,
                "compound already belongs to a group"
            );
            continue;
        }
        tree.reparent(child, group)?;
        tree.assign_group(child, group_id);
    }

    tree.assign_group(group, group_id);
    Ok(())
}

/// Filter the tree and linearize it into output documents.
///
/// Single mode yields one unit covering every top-level compound. Per-group
/// mode yields one unit per top-level group, each starting with the group
/// node and filtered with that group as context.
#[instrument(skip_all, fields(mode = ?assembly.mode))]
pub fn plan(assembly: &mut Assembly, policy: &FilterPolicy) -> Vec<OutputUnit> {
    let tree = &mut assembly.tree;
    let root = tree.root();

    let units = match assembly.mode {
        OutputMode::Single => {
            tree.refresh_filters(root, policy, None);
            let nodes: Vec<CompoundId> = tree
                .get_all(root, Collection::Compounds, true)
                .into_iter()
                .filter_map(|item| item.as_compound())
                .collect();
            let views = nodes.iter().map(|&id| tree.view(id)).collect();
            vec![OutputUnit {
                group: None,
                nodes,
                views,
            }]
        }
        OutputMode::PerGroup => {
            let groups: Vec<CompoundId> = tree
                .get(root)
                .children()
                .iter()
                .copied()
                .filter(|&id| tree.get(id).kind() == Some(CompoundKind::Group))
                .collect();

            groups
                .into_iter()
                .map(|group| {
                    let group_id = tree.get(group).refid.clone();
                    tree.refresh_filters(group, policy, Some(group_id.as_str()));

                    let mut nodes = vec![group];
                    nodes.extend(
                        tree.get_all(group, Collection::Compounds, true)
                            .into_iter()
                            .filter_map(|item| item.as_compound()),
                    );
                    let views = nodes.iter().map(|&id| tree.view(id)).collect();
                    OutputUnit {
                        group: Some(tree.get(group).name().to_string()),
                        nodes,
                        views,
                    }
                })
                .collect()
        }
    };

    for unit in &units {
        debug!(group = ?unit.group, nodes = unit.nodes.len(), "planned output unit");
    }
    units
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use doxymark_shared::{BaseRef, MemberRecord, split_qualified_name};

    fn record(refid: &str, kind: CompoundKind, name: &str, inner: &[&str]) -> EntityRecord {
        EntityRecord {
            refid: refid.into(),
            kind,
            path: split_qualified_name(name),
            brief: String::new(),
            detailed: String::new(),
            members: vec![],
            base_refs: vec![],
            inner: inner.iter().map(|s| s.to_string()).collect(),
            extra: Default::default(),
        }
    }

    fn member(name: &str, section: &str) -> MemberRecord {
        MemberRecord {
            refid: format!("m_{name}"),
            kind: "function".into(),
            section: section.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    fn default_policy() -> FilterPolicy {
        FilterPolicy {
            member_sections: vec!["public-attrib".into(), "public-func".into()],
            compound_kinds: ["namespace", "class", "struct", "union", "typedef"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    fn sample_records() -> Vec<EntityRecord> {
        let mut socket = record("classnet_1_1Socket", CompoundKind::Class, "net::Socket", &[]);
        socket.members = vec![
            member("connect", "public-func"),
            member("fd_", "private-attrib"),
            member("timeout", "public-attrib"),
        ];
        socket.base_refs = vec![BaseRef {
            name: "Stream".into(),
            refid: None,
            prot: "public".into(),
            virt: "non-virtual".into(),
        }];

        let mut codec = record("structcodec_1_1Frame", CompoundKind::Struct, "codec::Frame", &[]);
        codec.members = vec![member("len", "public-attrib")];

        let mut io_group = record("group__io", CompoundKind::Group, "io", &["classnet_1_1Socket"]);
        io_group.members = vec![member("poll", "public-func")];
        io_group.extra.insert("title".into(), "I/O".into());

        vec![
            record("namespacenet", CompoundKind::Namespace, "net", &["classnet_1_1Socket"]),
            socket,
            record("namespacecodec", CompoundKind::Namespace, "codec", &["structcodec_1_1Frame"]),
            codec,
            io_group,
            record("group__codec", CompoundKind::Group, "codec_group", &["structcodec_1_1Frame", "classnet_1_1Socket"]),
        ]
    }

    fn unit_names(assembly: &Assembly, unit: &OutputUnit) -> Vec<String> {
        unit.nodes
            .iter()
            .map(|&id| assembly.tree.get(id).name().to_string())
            .collect()
    }

    #[test]
    fn build_nests_declared_compounds() {
        let assembly = build(&sample_records(), OutputMode::Single).unwrap();
        let tree = &assembly.tree;
        let net = assembly.by_refid("namespacenet").unwrap();
        let socket = assembly.by_refid("classnet_1_1Socket").unwrap();

        assert_eq!(tree.get(socket).parent(), Some(net));
        assert_eq!(tree.get(socket).kind(), Some(CompoundKind::Class));
        assert_eq!(tree.get(socket).members.len(), 3);
        assert_eq!(tree.get(socket).base_refs[0].name, "Stream");
        assert_eq!(tree.get(tree.root()).children().len(), 4);
    }

    #[test]
    fn build_fails_on_conflicting_kind() {
        let records = vec![
            record("a1", CompoundKind::Class, "Thing", &[]),
            record("a2", CompoundKind::Struct, "Thing", &[]),
        ];
        let err = build(&records, OutputMode::Single).unwrap_err();
        assert!(err.to_string().contains("Thing"));
    }

    #[test]
    fn single_mode_emits_filtered_preorder() {
        let mut assembly = build(&sample_records(), OutputMode::Single).unwrap();
        let units = plan(&mut assembly, &default_policy());

        assert_eq!(units.len(), 1);
        assert!(units[0].group.is_none());
        assert_eq!(
            unit_names(&assembly, &units[0]),
            vec!["net", "net::Socket", "codec", "codec::Frame"]
        );

        let socket_view = &units[0].views[1];
        let members: Vec<_> = socket_view.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, vec!["timeout", "connect"]);
    }

    #[test]
    fn per_group_mode_claims_and_scopes() {
        let mut assembly = build(&sample_records(), OutputMode::PerGroup).unwrap();
        let tree = &assembly.tree;
        let group = assembly.by_refid("group__io").unwrap();
        let socket = assembly.by_refid("classnet_1_1Socket").unwrap();

        assert_eq!(tree.get(socket).parent(), Some(group));
        assert_eq!(tree.get(socket).group_id(), Some("group__io"));
        assert!(tree.get(socket).members.iter().all(|m| m.group_id.as_deref() == Some("group__io")));
        assert_eq!(tree.get(group).members[0].group_id.as_deref(), Some("group__io"));

        let units = plan(&mut assembly, &default_policy());
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].group.as_deref(), Some("io"));
        assert_eq!(unit_names(&assembly, &units[0]), vec!["io", "net::Socket"]);
        assert_eq!(units[0].views[0].extra["title"], "I/O");
        assert_eq!(units[0].views[0].members[0].name, "poll");

        // The socket was claimed by the first group only.
        assert_eq!(units[1].group.as_deref(), Some("codec_group"));
        assert_eq!(unit_names(&assembly, &units[1]), vec!["codec_group", "codec::Frame"]);
    }

    #[test]
    fn single_mode_hides_groups() {
        let mut assembly = build(&sample_records(), OutputMode::Single).unwrap();
        let units = plan(&mut assembly, &default_policy());
        assert!(units[0].views.iter().all(|v| v.kind != "group"));
    }

    fn same_name_records() -> Vec<EntityRecord> {
        let mut socket = record("classnet_1_1Socket", CompoundKind::Class, "net::Socket", &[]);
        socket.members = vec![member("connect", "public-func")];
        vec![
            record("namespacenet", CompoundKind::Namespace, "net", &["classnet_1_1Socket"]),
            socket,
            record("group__net", CompoundKind::Group, "net", &["classnet_1_1Socket"]),
        ]
    }

    #[test]
    fn group_named_like_namespace_single_mode() {
        let mut assembly = build(&same_name_records(), OutputMode::Single).unwrap();
        let namespace = assembly.by_refid("namespacenet").unwrap();
        let group = assembly.by_refid("group__net").unwrap();
        assert_ne!(namespace, group);
        assert_eq!(assembly.tree.get(group).kind(), Some(CompoundKind::Group));
        assert_eq!(assembly.tree.get(namespace).kind(), Some(CompoundKind::Namespace));

        let units = plan(&mut assembly, &default_policy());
        assert_eq!(unit_names(&assembly, &units[0]), vec!["net", "net::Socket"]);
        assert_eq!(units[0].views[0].kind, "namespace");
    }

    #[test]
    fn group_named_like_namespace_per_group_mode() {
        let mut assembly = build(&same_name_records(), OutputMode::PerGroup).unwrap();
        let group = assembly.by_refid("group__net").unwrap();
        let socket = assembly.by_refid("classnet_1_1Socket").unwrap();
        assert_eq!(assembly.tree.get(socket).parent(), Some(group));

        // The namespace still resolves through the scope index.
        let root = assembly.tree.root();
        assert_eq!(assembly.tree.lookup(root, &["net"]), assembly.by_refid("namespacenet"));

        let units = plan(&mut assembly, &default_policy());
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].group.as_deref(), Some("net"));
        assert_eq!(unit_names(&assembly, &units[0]), vec!["net", "net::Socket"]);
        assert_eq!(units[0].views[0].kind, "group");
        assert_eq!(units[0].views[1].members[0].name, "connect");
    }

    #[test]
    fn output_mode_from_config() {
        let mut config = RenderConfig::from(&doxymark_shared::AppConfig::default());
        assert_eq!(OutputMode::from(&config), OutputMode::PerGroup);
        config.groups = false;
        assert_eq!(OutputMode::from(&config), OutputMode::Single);

        let policy = FilterPolicy::from(&config);
        assert_eq!(policy.compound_kinds[0], "namespace");
        assert_eq!(policy.member_sections.len(), 4);
    }
}
