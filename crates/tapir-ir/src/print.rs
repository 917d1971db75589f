//! Debug dumps of program trees. The format is for humans and not
//! contractual.

use std::fmt::Write;

use crate::node::NodeRef;

/// Renders the tree, one node per line, indented by depth.
pub fn dump(root: &NodeRef) -> String {
    let mut out = String::new();
    write_node(root, None, 0, &mut out);
    out
}

fn write_node(n: &NodeRef, slot: Option<&'static str>, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    match slot {
        Some(slot) => {
            let _ = writeln!(out, "{slot}: {n}");
        }
        None => {
            let _ = writeln!(out, "{n}");
        }
    }
    n.for_each_child(&mut |name, child| write_node(child, Some(name), depth + 1, out));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Constant, ReturnStatement, node};

    #[test]
    fn dump_shows_nesting_and_slots() {
        let root = node(ReturnStatement {
            value: Some(node(Constant {
                value: 3,
                width: None,
            })),
        });

        let text = dump(&root);
        assert!(text.starts_with("ReturnStatement"));
        assert!(text.contains("  value: Constant"));
    }
}
