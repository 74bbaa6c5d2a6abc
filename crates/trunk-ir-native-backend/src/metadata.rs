//! Debug metadata nodes of a backend module.
//!
//! Uniqued nodes are deduplicated by content. Distinct nodes (compile units
//! and subprograms) always get a fresh id, even when their content matches
//! an existing node.

use std::collections::HashMap;

use cranelift_entity::{PrimaryMap, entity_impl};
use trunk_ir::debug_info::{
    CallingConvention, DwTag, EmissionKind, NameTableKind, SourceLanguage, SubprogramFlags,
    TypeEncoding,
};

/// Reference to a metadata node, printed as `!N`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetadataId(u32);
entity_impl!(MetadataId, "!");

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MetadataNode {
    File {
        filename: String,
        directory: String,
    },
    BasicType {
        tag: DwTag,
        name: String,
        size_in_bits: u64,
        encoding: TypeEncoding,
    },
    /// `None` entries stand for the null type (a `void` result).
    SubroutineType {
        calling_convention: CallingConvention,
        types: Vec<Option<MetadataId>>,
    },
    CompileUnit {
        language: SourceLanguage,
        file: MetadataId,
        producer: String,
        is_optimized: bool,
        emission_kind: EmissionKind,
        name_table_kind: NameTableKind,
    },
    Subprogram {
        scope: MetadataId,
        name: String,
        linkage_name: String,
        file: MetadataId,
        line: u32,
        scope_line: u32,
        sp_flags: SubprogramFlags,
        ty: MetadataId,
        unit: MetadataId,
    },
    LexicalBlock {
        scope: MetadataId,
        file: MetadataId,
        line: u32,
        column: u32,
    },
    Module {
        scope: MetadataId,
        name: String,
        config_macros: String,
        include_path: String,
        apinotes: String,
        file: MetadataId,
        line: u32,
        is_decl: bool,
    },
    Location {
        line: u32,
        column: u32,
        scope: MetadataId,
    },
}

impl MetadataNode {
    /// LLVM-style node name, e.g. `DICompileUnit`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MetadataNode::File { .. } => "DIFile",
            MetadataNode::BasicType { .. } => "DIBasicType",
            MetadataNode::SubroutineType { .. } => "DISubroutineType",
            MetadataNode::CompileUnit { .. } => "DICompileUnit",
            MetadataNode::Subprogram { .. } => "DISubprogram",
            MetadataNode::LexicalBlock { .. } => "DILexicalBlock",
            MetadataNode::Module { .. } => "DIModule",
            MetadataNode::Location { .. } => "DILocation",
        }
    }
}

#[derive(Debug)]
struct NodeEntry {
    node: MetadataNode,
    distinct: bool,
}

#[derive(Debug, Default)]
pub struct MetadataArena {
    nodes: PrimaryMap<MetadataId, NodeEntry>,
    uniqued: HashMap<MetadataNode, MetadataId>,
}

impl MetadataArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the uniqued node with this content.
    pub fn unique(&mut self, node: MetadataNode) -> MetadataId {
        if let Some(&existing) = self.uniqued.get(&node) {
            return existing;
        }
        let id = self.nodes.push(NodeEntry {
            node: node.clone(),
            distinct: false,
        });
        self.uniqued.insert(node, id);
        id
    }

    /// Create a fresh distinct node.
    pub fn distinct(&mut self, node: MetadataNode) -> MetadataId {
        self.nodes.push(NodeEntry {
            node,
            distinct: true,
        })
    }

    pub fn get(&self, id: MetadataId) -> &MetadataNode {
        &self.nodes[id].node
    }

    pub fn is_distinct(&self, id: MetadataId) -> bool {
        self.nodes[id].distinct
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (MetadataId, &MetadataNode)> {
        self.nodes.iter().map(|(id, entry)| (id, &entry.node))
    }

    /// Number of nodes of the given kind, e.g. `"DICompileUnit"`.
    pub fn count_kind(&self, kind_name: &str) -> usize {
        self.iter()
            .filter(|(_, node)| node.kind_name() == kind_name)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(arena: &mut MetadataArena) -> MetadataId {
        arena.unique(MetadataNode::File {
            filename: "a.cairo".to_owned(),
            directory: "/src".to_owned(),
        })
    }

    #[test]
    fn uniqued_nodes_are_shared() {
        let mut arena = MetadataArena::new();
        let a = file(&mut arena);
        let b = file(&mut arena);
        assert_eq!(a, b);
        assert_eq!(arena.len(), 1);
        assert!(!arena.is_distinct(a));
    }

    #[test]
    fn distinct_nodes_are_never_merged() {
        let mut arena = MetadataArena::new();
        let f = file(&mut arena);
        let cu = MetadataNode::CompileUnit {
            language: SourceLanguage::C,
            file: f,
            producer: "compiler-v1".to_owned(),
            is_optimized: false,
            emission_kind: EmissionKind::Full,
            name_table_kind: NameTableKind::Default,
        };
        let a = arena.distinct(cu.clone());
        let b = arena.distinct(cu);
        assert_ne!(a, b);
        assert!(arena.is_distinct(a));
        assert_eq!(arena.get(a), arena.get(b));
        assert_eq!(arena.count_kind("DICompileUnit"), 2);
    }

    #[test]
    fn metadata_id_display() {
        use cranelift_entity::EntityRef;
        assert_eq!(MetadataId::new(4).to_string(), "!4");
    }
}
