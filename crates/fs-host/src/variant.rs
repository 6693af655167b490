//! Late-bound values exchanged with the host.

use core::fmt;
use std::rc::Rc;

use crate::dispatch::AutomationObject;

/// Shared handle to a host object.
pub type ObjectRef = Rc<dyn AutomationObject>;

/// A value crossing the automation boundary.
#[derive(Clone, Default)]
pub enum Variant {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    Object(ObjectRef),
}

impl Variant {
    pub fn kind(&self) -> &'static str {
        match self {
            Variant::Empty => "empty",
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Real(_) => "real",
            Variant::Str(_) => "string",
            Variant::Object(_) => "object",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// Numeric view; strings are parsed the way hosts coerce them.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variant::Real(v) => Some(*v),
            Variant::Int(v) => Some(*v as f64),
            Variant::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Variant::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::Int(v) => Some(*v),
            Variant::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            Variant::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            Variant::Int(v) => Some(*v != 0),
            Variant::Real(v) => Some(*v != 0.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Variant::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<ObjectRef> {
        match self {
            Variant::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => write!(f, "Empty"),
            Variant::Bool(b) => write!(f, "Bool({b})"),
            Variant::Int(v) => write!(f, "Int({v})"),
            Variant::Real(v) => write!(f, "Real({v})"),
            Variant::Str(s) => write!(f, "Str({s:?})"),
            Variant::Object(o) => write!(f, "Object({})", o.type_name()),
        }
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Real(v)
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Variant::Int(v)
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Int(i64::from(v))
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::Str(v.to_string())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::Str(v)
    }
}

impl From<ObjectRef> for Variant {
    fn from(v: ObjectRef) -> Self {
        Variant::Object(v)
    }
}
