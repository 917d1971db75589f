use serde::{Deserialize, Serialize};

use crate::node::{NodeRef, impl_children};

/// `{ ... }`. Declarations among the components open a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStatement {
    pub components: Vec<NodeRef>,
}

impl_children!(BlockStatement { list components });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentStatement {
    pub left: NodeRef,
    pub right: NodeRef,
}

impl_children!(AssignmentStatement {
    node left,
    node right,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub condition: NodeRef,
    pub if_true: NodeRef,
    pub if_false: Option<NodeRef>,
}

impl_children!(IfStatement {
    node condition,
    node if_true,
    opt if_false,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCallStatement {
    pub call: NodeRef,
}

impl_children!(MethodCallStatement { node call });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatement {
    pub value: Option<NodeRef>,
}

impl_children!(ReturnStatement { opt value });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmptyStatement {}

impl_children!(EmptyStatement {});
