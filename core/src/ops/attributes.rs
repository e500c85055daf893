//! Operator configuration introspection.
use std::fmt;

use itertools::Itertools;

use crate::internal::*;

/// A single operator attribute value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attribute {
    Usizes(TVec<usize>),
    Ints(TVec<i64>),
    Int(i64),
    Str(String),
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Attribute::Usizes(v) => write!(f, "{}", v.iter().join(",")),
            Attribute::Ints(v) => write!(f, "{}", v.iter().join(",")),
            Attribute::Int(i) => write!(f, "{i}"),
            Attribute::Str(s) => write!(f, "{s}"),
        }
    }
}

pub trait AttributeVisitor {
    fn on_attribute(&mut self, name: &str, value: Attribute) -> ConvPadResult<()>;
}

/// Collects attributes as strings, in visiting order.
#[derive(Clone, Debug, Default)]
pub struct AttributeDump(pub Vec<(String, String)>);

impl AttributeDump {
    pub fn of(op: &dyn TypedOp) -> ConvPadResult<AttributeDump> {
        let mut dump = AttributeDump::default();
        op.visit_attributes(&mut dump)?;
        Ok(dump)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| &**v)
    }
}

impl AttributeVisitor for AttributeDump {
    fn on_attribute(&mut self, name: &str, value: Attribute) -> ConvPadResult<()> {
        ensure!(self.get(name).is_none(), "Attribute {} visited twice", name);
        self.0.push((name.to_string(), value.to_string()));
        Ok(())
    }
}
