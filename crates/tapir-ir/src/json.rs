//! Serialized program trees.
//!
//! `load(emit(t))` yields a tree structurally equal to `t`. Identity is not
//! round-tripped: loaded nodes get fresh ids, and subtrees that were shared
//! on emit come back as separate copies.

use std::io::{Read, Write};
use std::rc::Rc;

use thiserror::Error;

use crate::node::{Node, NodeRef};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed program tree: {0}")]
    Schema(#[from] serde_json::Error),
    #[error("cannot read program tree: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes the tree as JSON.
pub fn emit(root: &NodeRef, writer: impl Write) -> Result<(), LoadError> {
    serde_json::to_writer_pretty(writer, &**root)?;
    Ok(())
}

/// Reads a tree back from JSON.
pub fn load(reader: impl Read) -> Result<NodeRef, LoadError> {
    let node: Node = serde_json::from_reader(reader)?;
    Ok(Rc::new(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{
        BlockStatement, Constant, Direction, Param, ParamList, Path, PathExpression, node,
    };

    #[test]
    fn load_after_emit_is_structurally_equal() {
        let root = node(BlockStatement {
            components: vec![
                node(Constant {
                    value: 42,
                    width: Some(8),
                }),
                node(PathExpression {
                    path: node(Path::new("x")),
                }),
                node(ParamList {
                    params: vec![node(Param {
                        name: "p".into(),
                        direction: Direction::In,
                        ty: node(crate::node::BitsType { width: 4 }),
                    })],
                }),
            ],
        });

        let mut buffer = Vec::new();
        emit(&root, &mut buffer).unwrap();
        let loaded = load(buffer.as_slice()).unwrap();

        assert_eq!(*loaded, *root);
        assert_ne!(loaded.id(), root.id());
    }

    #[test]
    fn malformed_input_is_an_error_not_a_panic() {
        let result = load(br#"{"kind": {"Nonsense": {}}}"#.as_slice());
        assert!(matches!(result, Err(LoadError::Schema(_))));
    }
}
