//! Flow diagram model
//!
//! The semantic counterpart of the text syntax: named steps, merge points,
//! directed links and collapse marks. `into_diagram` lowers a module to the
//! record model the layout and routing passes consume, assigning
//! `output-<i>` / `input-<i>` handles in declaration order.
use std::collections::HashMap;

use derive_builder::Builder;

use crate::diagram::{Diagram, EdgeRecord, NodeRecordBuilder};

#[derive(Debug, Clone, Default)]
pub struct FlowModule {
    name: Option<String>,
    nodes: Vec<FlowNode>,
    links: Vec<FlowLink>,
    collapsed: Vec<String>,
}

#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct FlowNode {
    #[builder(setter(into))]
    pub name: String,
    pub label: Option<String>,
    pub is_merge: bool,
}

#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct FlowLink {
    #[builder(setter(into))]
    pub source: String,
    #[builder(setter(into))]
    pub target: String,
    pub label: Option<String>,
}

impl FlowModule {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &FlowNode> {
        self.nodes.iter()
    }

    pub fn links(&self) -> impl ExactSizeIterator<Item = &FlowLink> {
        self.links.iter()
    }

    pub fn add_node(&mut self, node: FlowNode) {
        self.nodes.push(node);
    }

    pub fn add_link(&mut self, link: FlowLink) {
        self.links.push(link);
    }

    pub fn collapse(&mut self, name: impl Into<String>) {
        self.collapsed.push(name.into());
    }

    /// Lowers the module to diagram records.
    ///
    /// Link endpoints that were never declared become plain nodes. Outgoing
    /// links of one node take `output-0, output-1, ...` in declaration
    /// order, incoming links `input-<i>` likewise; repeated node pairs get
    /// a `#<n>` suffix on the edge id to stay unique.
    pub fn into_diagram(&self) -> Diagram {
        let mut diagram = Diagram::new();
        let mut known: Vec<&str> = vec![];

        for node in &self.nodes {
            let label = node.label.clone().or_else(|| Some(node.name.clone()));

            diagram.add_node(
                NodeRecordBuilder::default()
                    .id(node.name.clone())
                    .label(label)
                    .is_merge(node.is_merge)
                    .collapsed(self.collapsed.iter().any(|c| *c == node.name))
                    .build()
                    .unwrap(),
            );
            known.push(&node.name);
        }

        // Implicit nodes for link endpoints nobody declared.
        for link in &self.links {
            for name in [&link.source, &link.target] {
                if !known.contains(&name.as_str()) {
                    diagram.add_node(
                        NodeRecordBuilder::default()
                            .id(name.clone())
                            .label(Some(name.clone()))
                            .collapsed(self.collapsed.iter().any(|c| c == name))
                            .build()
                            .unwrap(),
                    );
                    known.push(name);
                }
            }
        }

        let mut outputs: HashMap<&str, usize> = HashMap::new();
        let mut inputs: HashMap<&str, usize> = HashMap::new();
        let mut pairs: HashMap<(&str, &str), usize> = HashMap::new();

        for link in &self.links {
            let out_index = outputs.entry(&link.source).or_insert(0);
            let source_handle = format!("output-{}", out_index);
            *out_index += 1;

            let in_index = inputs.entry(&link.target).or_insert(0);
            let target_handle = format!("input-{}", in_index);
            *in_index += 1;

            let copies = pairs
                .entry((link.source.as_str(), link.target.as_str()))
                .or_insert(0);
            let id = if *copies == 0 {
                format!("{}->{}", link.source, link.target)
            } else {
                format!("{}->{}#{}", link.source, link.target, copies)
            };
            *copies += 1;

            let mut edge = EdgeRecord::new(id, link.source.clone(), link.target.clone());
            edge.source_handle = source_handle;
            edge.target_handle = target_handle;
            edge.label = link.label.clone();
            diagram.add_edge(edge);
        }

        diagram
    }
}
