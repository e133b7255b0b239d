/*!
Flow module EBNF
----------------

```ebnf
program = PAD, flow_module, PAD ;
flow_module = "flow", PAD, [ identifier, PAD ], "{", PAD, module_entries, PAD, "}", PAD ;
module_entries = module_entry, { SP, SEP, PAD, module_entry }
               | EMPTY
module_entry = node_decl | merge_decl | collapse_decl | link_stmt ;
node_decl = "node", SP, identifier, [ SP, string ] ;
merge_decl = "merge", SP, identifier ;
collapse_decl = "collapse", SP, identifier ;
link_stmt = identifier, SP, "->", SP, identifier, [ SP, string ] ;
string = '"', { ? not '"' ? }, '"' ;
identifier = identifier_start, { identifier_continue } ;
identifier_start = "_" | letter ;
identifier_continue = "_" | letter | digit ;
letter = ? a-zA-Z ? ;
digit = ? 0-9 ? ;
whitespace = ? whitespace ? ;
newline = "\n" | "\r\n" ;
PAD = { whitespace | newline } ;
SP = { whitespace } ;
SEP = newline | ";" ;
EMPTY = ? (empty) ? ;
```
*/

use std::fmt;

use chumsky::prelude::*;
use derive_builder::Builder;
use derive_more::Display;

use crate::flow::{FlowLinkBuilder, FlowModule, FlowNodeBuilder};

#[derive(Debug, Clone, Display)]
pub enum ModuleEntry {
    #[display(fmt = "{}", _0)]
    Node(NodeDecl),
    #[display(fmt = "merge {}", _0)]
    Merge(String),
    #[display(fmt = "{}", _0)]
    Link(LinkDecl),
    #[display(fmt = "collapse {}", _0)]
    Collapse(String),
}

#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct NodeDecl {
    #[builder(setter(into))]
    pub name: String,
    pub label: Option<String>,
}

impl fmt::Display for NodeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}", self.name)?;
        let Some(label) = &self.label else { return Ok(()) };
        write!(f, " \"{}\"", label)
    }
}

#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct LinkDecl {
    #[builder(setter(into))]
    pub source: String,
    #[builder(setter(into))]
    pub target: String,
    pub label: Option<String>,
}

impl fmt::Display for LinkDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)?;
        let Some(label) = &self.label else { return Ok(()) };
        write!(f, " \"{}\"", label)
    }
}

/// Parses a flow module source, recovering as many entries as possible.
pub fn parse(src: &str) -> (Option<FlowModule>, Vec<Simple<char>>) {
    parser().parse_recovery(src)
}

pub fn parser() -> impl Parser<char, FlowModule, Error = Simple<char>> {
    flow_module().padded().then_ignore(end())
}

fn spaces() -> impl Parser<char, String, Error = Simple<char>> {
    one_of::<_, _, Simple<char>>(" \t")
        .repeated()
        .collect::<String>()
}

fn separator() -> impl Parser<char, String, Error = Simple<char>> {
    choice((just("\n"), just("\r\n"), just(";"))).map(|x| x.to_string())
}

fn flow_module() -> impl Parser<char, FlowModule, Error = Simple<char>> {
    just("flow")
        .ignore_then(text::whitespace())
        .ignore_then(text::ident().or_not())
        .then_ignore(just("{").padded())
        .then(module_entries())
        .then_ignore(just("}").padded())
        .map(|(name, entries)| {
            let mut module = FlowModule::new(name);

            for entry in entries {
                match entry {
                    ModuleEntry::Node(decl) => module.add_node(
                        FlowNodeBuilder::default()
                            .name(decl.name)
                            .label(decl.label)
                            .build()
                            .unwrap(),
                    ),
                    ModuleEntry::Merge(name) => module.add_node(
                        FlowNodeBuilder::default()
                            .name(name)
                            .is_merge(true)
                            .build()
                            .unwrap(),
                    ),
                    ModuleEntry::Link(decl) => module.add_link(
                        FlowLinkBuilder::default()
                            .source(decl.source)
                            .target(decl.target)
                            .label(decl.label)
                            .build()
                            .unwrap(),
                    ),
                    ModuleEntry::Collapse(name) => module.collapse(name),
                }
            }

            module
        })
}

fn module_entries() -> impl Parser<char, Vec<ModuleEntry>, Error = Simple<char>> {
    module_entry()
        .chain(
            spaces()
                .ignore_then(separator())
                .ignore_then(text::whitespace())
                .ignore_then(module_entry())
                .repeated(),
        )
        .or_not()
        .padded()
        .map(|entries| entries.unwrap_or_else(|| vec![]))
}

fn module_entry() -> impl Parser<char, ModuleEntry, Error = Simple<char>> {
    choice((node_decl(), merge_decl(), collapse_decl(), link_stmt()))
}

fn node_decl() -> impl Parser<char, ModuleEntry, Error = Simple<char>> {
    text::keyword("node")
        .ignore_then(spaces())
        .ignore_then(text::ident())
        .then(spaces().ignore_then(string_literal()).or_not())
        .map(|(name, label)| {
            ModuleEntry::Node(
                NodeDeclBuilder::default()
                    .name(name)
                    .label(label)
                    .build()
                    .unwrap(),
            )
        })
}

fn merge_decl() -> impl Parser<char, ModuleEntry, Error = Simple<char>> {
    text::keyword("merge")
        .ignore_then(spaces())
        .ignore_then(text::ident())
        .map(ModuleEntry::Merge)
}

fn collapse_decl() -> impl Parser<char, ModuleEntry, Error = Simple<char>> {
    text::keyword("collapse")
        .ignore_then(spaces())
        .ignore_then(text::ident())
        .map(ModuleEntry::Collapse)
}

fn link_stmt() -> impl Parser<char, ModuleEntry, Error = Simple<char>> {
    text::ident()
        .then(just("->").padded().ignore_then(text::ident()))
        .then(spaces().ignore_then(string_literal()).or_not())
        .map(|((source, target), label)| {
            ModuleEntry::Link(
                LinkDeclBuilder::default()
                    .source(source)
                    .target(target)
                    .label(label)
                    .build()
                    .unwrap(),
            )
        })
}

fn string_literal() -> impl Parser<char, String, Error = Simple<char>> {
    just('"')
        .ignore_then(filter(|c: &char| *c != '"').repeated().collect::<String>())
        .then_ignore(just('"'))
}
