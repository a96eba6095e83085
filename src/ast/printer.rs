//! Tree rendering for `tu print-ast`.

use super::{AstNode, NodeKind};
use crate::symbol::Symbol;
use crate::types::SymbolKind;
use crate::unit::TranslationUnit;
use std::collections::{BTreeMap, HashSet};

const RULE_WIDTH: usize = 80;
const SYMBOLS_PER_KIND: usize = 5;
const MAX_TYPE_HINT: usize = 50;

#[derive(Debug, Clone)]
pub struct PrintOptions {
    pub show_types: bool,
    pub show_locations: bool,
    pub max_depth: Option<usize>,
    /// Only nodes of these kinds are printed (with their subtrees). `None` prints all.
    pub filter_kinds: Option<HashSet<NodeKind>>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            show_types: true,
            show_locations: true,
            max_depth: None,
            filter_kinds: None,
        }
    }
}

pub struct AstPrinter {
    options: PrintOptions,
}

impl AstPrinter {
    pub fn new(options: PrintOptions) -> Self {
        Self { options }
    }

    /// Render the tree followed by a per-kind symbol summary.
    pub fn print_unit(&self, unit: &TranslationUnit) -> String {
        let mut lines = vec![
            "=".repeat(RULE_WIDTH),
            format!("TRANSLATION UNIT: {} ({})", unit.path, unit.language),
            "=".repeat(RULE_WIDTH),
            String::new(),
            "AST TREE:".to_string(),
            "-".repeat(RULE_WIDTH),
        ];
        lines.extend(self.print_node(&unit.root));

        if !unit.symbols.is_empty() {
            lines.push(String::new());
            lines.push("SYMBOL TABLE SUMMARY:".to_string());
            lines.push("-".repeat(RULE_WIDTH));
            lines.extend(summarize(&unit.symbols));
        }

        if !unit.diagnostics.is_empty() {
            lines.push(String::new());
            lines.push("DIAGNOSTICS:".to_string());
            lines.push("-".repeat(RULE_WIDTH));
            lines.extend(unit.diagnostics.iter().map(|d| format!("  {d}")));
        }

        lines.push(String::new());
        lines.push("=".repeat(RULE_WIDTH));
        lines.join("\n")
    }

    pub fn print_node(&self, node: &AstNode) -> Vec<String> {
        let mut lines = Vec::new();
        self.render(node, "", "", 0, &mut lines);
        lines
    }

    fn render(
        &self,
        node: &AstNode,
        head: &str,
        tail: &str,
        depth: usize,
        lines: &mut Vec<String>,
    ) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        if let Some(kinds) = &self.options.filter_kinds {
            if depth > 0 && !kinds.contains(&node.kind) {
                return;
            }
        }

        lines.push(format!("{head}{}", self.describe(node)));

        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            let (child_head, child_tail) = if i + 1 == count {
                (format!("{tail}└── "), format!("{tail}    "))
            } else {
                (format!("{tail}├── "), format!("{tail}│   "))
            };
            self.render(child, &child_head, &child_tail, depth + 1, lines);
        }
    }

    fn describe(&self, node: &AstNode) -> String {
        let mut out = node.kind.to_string();
        if node.kind == NodeKind::Other {
            out.push_str(&format!("({})", node.native_kind));
        }
        if let Some(name) = node.name() {
            out.push_str(&format!(": '{name}'"));
        }
        if self.options.show_types {
            if let Some(ty) = &node.type_hint {
                if ty.len() > MAX_TYPE_HINT {
                    let cut = ty
                        .char_indices()
                        .take_while(|(i, _)| *i < MAX_TYPE_HINT - 3)
                        .last()
                        .map(|(i, c)| i + c.len_utf8())
                        .unwrap_or(0);
                    out.push_str(&format!(" <{}...>", &ty[..cut]));
                } else {
                    out.push_str(&format!(" <{ty}>"));
                }
            }
        }
        if self.options.show_locations {
            out.push_str(&format!("  @ {}:{}", node.location.line, node.location.column));
        }
        out
    }
}

fn summarize(symbols: &[Symbol]) -> Vec<String> {
    let mut by_kind: BTreeMap<SymbolKind, Vec<&Symbol>> = BTreeMap::new();
    for symbol in symbols {
        by_kind.entry(symbol.kind).or_default().push(symbol);
    }

    let mut lines = vec![format!("Total symbols: {}", symbols.len())];
    for (kind, group) in by_kind {
        lines.push(format!("  {kind}: {}", group.len()));
        for symbol in group.iter().take(SYMBOLS_PER_KIND) {
            lines.push(format!("    - {} @ {}", symbol.name, symbol.definition));
        }
        if group.len() > SYMBOLS_PER_KIND {
            lines.push(format!("    ... and {} more", group.len() - SYMBOLS_PER_KIND));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Extent, Position};

    fn leaf(kind: NodeKind, name: &str, start: u32, end: u32) -> AstNode {
        AstNode::new(
            kind,
            "leaf",
            Extent::new(Position::new(1, start + 1, start), Position::new(1, end + 1, end)),
        )
        .with_name(name, Position::new(1, start + 1, start))
    }

    #[test]
    fn test_tree_connectors() {
        let mut class = leaf(NodeKind::Class, "Foo", 0, 30);
        class.children.push(leaf(NodeKind::Field, "a", 5, 10));
        class.children.push(leaf(NodeKind::Method, "bar", 12, 28));
        class.children[1]
            .children
            .push(leaf(NodeKind::Identifier, "x", 20, 21).with_type_hint(Some("int")));

        let printer = AstPrinter::new(PrintOptions {
            show_locations: false,
            ..PrintOptions::default()
        });
        let lines = printer.print_node(&class);
        assert_eq!(
            lines,
            vec![
                "Class: 'Foo'",
                "├── Field: 'a'",
                "└── Method: 'bar'",
                "    └── Identifier: 'x' <int>",
            ]
        );
    }

    #[test]
    fn test_depth_and_kind_filters() {
        let mut class = leaf(NodeKind::Class, "Foo", 0, 30);
        class.children.push(leaf(NodeKind::Field, "a", 5, 10));
        let mut method = leaf(NodeKind::Method, "bar", 12, 28);
        method.children.push(leaf(NodeKind::Identifier, "x", 20, 21));
        class.children.push(method);

        let shallow = AstPrinter::new(PrintOptions {
            max_depth: Some(1),
            ..PrintOptions::default()
        });
        assert_eq!(shallow.print_node(&class).len(), 3);

        let methods_only = AstPrinter::new(PrintOptions {
            show_locations: false,
            filter_kinds: Some([NodeKind::Method].into_iter().collect()),
            ..PrintOptions::default()
        });
        assert_eq!(
            methods_only.print_node(&class),
            vec!["Class: 'Foo'", "└── Method: 'bar'"]
        );
    }
}
