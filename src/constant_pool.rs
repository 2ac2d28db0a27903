use std::{
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

use thiserror::Error;

use crate::types::Type;

/// A literal value known at compile time.
#[derive(Clone, Debug)]
pub enum Constant {
    Int(i32),
    Real(f64),
    Char(char),
    Bool(bool),
    Str(Box<str>),
}

impl Constant {
    pub fn ty(&self) -> Type {
        match self {
            Constant::Int(_) => Type::Int,
            Constant::Real(_) => Type::Real,
            Constant::Char(_) => Type::Char,
            Constant::Bool(_) => Type::Bool,
            Constant::Str(_) => Type::Str,
        }
    }

    /// The value a variable of type `ty` holds when declared without an
    /// initializer.
    pub fn default_of(ty: Type) -> Constant {
        match ty {
            Type::Int => Constant::Int(0),
            Type::Real => Constant::Real(0.0),
            Type::Char => Constant::Char('\0'),
            Type::Bool => Constant::Bool(false),
            Type::Str => Constant::Str("".into()),
        }
    }
}

// Reals are compared bit by bit, so that `0.0` and `-0.0` are distinct
// entries and `NaN` can still be interned.
impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Int(a), Constant::Int(b)) => a == b,
            (Constant::Real(a), Constant::Real(b)) => a.to_bits() == b.to_bits(),
            (Constant::Char(a), Constant::Char(b)) => a == b,
            (Constant::Bool(a), Constant::Bool(b)) => a == b,
            (Constant::Str(a), Constant::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Constant::Int(v) => v.hash(state),
            Constant::Real(v) => v.to_bits().hash(state),
            Constant::Char(v) => v.hash(state),
            Constant::Bool(v) => v.hash(state),
            Constant::Str(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Real(v) => write!(f, "{v:?}"),
            Constant::Char(v) => write!(f, "{v:?}"),
            Constant::Bool(v) => write!(f, "{v}"),
            Constant::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// A handle to a pooled [`Constant`]. To retrieve the value, use
/// [`ConstantPool::get`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstId(u32);

impl ConstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ConstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstId({})", self.0)
    }
}

impl fmt::Display for ConstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("constant {id} is out of range for a pool of {len} constants")]
    OutOfRange { id: ConstId, len: usize },
}

/// Deduplicated storage for every literal in a compilation.
///
/// Ids are handed out densely, starting at zero, in first-seen order.
#[derive(Default)]
pub struct ConstantPool {
    map: HashMap<Rc<Constant>, ConstId>,
    vec: Vec<Rc<Constant>>,
}

impl fmt::Debug for ConstantPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (i, constant) in self.vec.iter().enumerate() {
            map.entry(&i, &constant);
        }
        map.finish()
    }
}

impl ConstantPool {
    pub fn with_capacity(capacity: usize) -> Self {
        ConstantPool {
            map: HashMap::with_capacity(capacity),
            vec: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    /// Adds the provided value to the pool, returning its id. Adding a value
    /// that is already pooled returns the existing id.
    pub fn add(&mut self, value: Constant) -> ConstId {
        if let Some(id) = self.map.get(&value) {
            return *id;
        }
        // More than `u32::MAX` distinct literals cannot come from any
        // realistic source text.
        let id = ConstId(u32::try_from(self.vec.len()).unwrap_or(u32::MAX));
        let value = Rc::new(value);
        self.vec.push(Rc::clone(&value));
        self.map.insert(value, id);
        id
    }

    pub fn get(&self, id: ConstId) -> Result<&Constant, PoolError> {
        self.vec
            .get(id.index())
            .map(AsRef::as_ref)
            .ok_or(PoolError::OutOfRange {
                id,
                len: self.vec.len(),
            })
    }

    /// Iterates over every constant, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ConstId, &Constant)> {
        self.vec
            .iter()
            .zip(0..)
            .map(|(constant, i)| (ConstId(i), constant.as_ref()))
    }
}
