use serde::{Deserialize, Serialize};

use crate::node::{NodeRef, impl_children};

/// A type spelled as a name, to be bound to a type declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeName {
    pub path: NodeRef,
}

impl_children!(TypeName { node path });

/// A generic type applied to arguments, e.g. `register<bit<32>>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializedType {
    pub base: NodeRef,
    pub type_args: Vec<NodeRef>,
}

impl_children!(SpecializedType {
    node base,
    list type_args,
});

/// `bit<w>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitsType {
    pub width: u32,
}

impl_children!(BitsType {});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolType {}

impl_children!(BoolType {});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidType {}

impl_children!(VoidType {});
