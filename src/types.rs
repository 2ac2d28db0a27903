use std::{collections::HashMap, fmt};

use crate::ir::Address;

/// A type that can be named in source through a reserved type name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Int,
    Real,
    Char,
    Bool,
}

impl PrimitiveType {
    pub const ALL: &[PrimitiveType] = &[
        PrimitiveType::Int,
        PrimitiveType::Real,
        PrimitiveType::Char,
        PrimitiveType::Bool,
    ];

    /// Storage width, in bytes.
    pub const fn width(self) -> u8 {
        match self {
            PrimitiveType::Int => 4,
            PrimitiveType::Real => 8,
            PrimitiveType::Char | PrimitiveType::Bool => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveType::Int => "int",
            PrimitiveType::Real => "real",
            PrimitiveType::Char => "char",
            PrimitiveType::Bool => "bool",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The type of a value held by an [`Address`].
///
/// Every primitive type is a value type. Strings only exist as literals and
/// interpolations, so [`Type::Str`] has no declarable counterpart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Real,
    Char,
    Bool,
    Str,
}

impl Type {
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Real)
    }
}

impl From<PrimitiveType> for Type {
    fn from(value: PrimitiveType) -> Self {
        match value {
            PrimitiveType::Int => Type::Int,
            PrimitiveType::Real => Type::Real,
            PrimitiveType::Char => Type::Char,
            PrimitiveType::Bool => Type::Bool,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Int => "int",
            Type::Real => "real",
            Type::Char => "char",
            Type::Bool => "bool",
            Type::Str => "string",
        };
        f.write_str(name)
    }
}

/// Maps every address that may appear as an operand to its type.
///
/// Named variables enter the table when declared; temporaries enter it right
/// after the instruction that defines them.
#[derive(Debug, Default)]
pub struct SymbolTable {
    map: HashMap<Address, Type>,
}

impl SymbolTable {
    pub fn with_capacity(capacity: usize) -> SymbolTable {
        SymbolTable {
            map: HashMap::with_capacity(capacity),
        }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.map.contains_key(address)
    }

    pub fn get(&self, address: &Address) -> Option<Type> {
        self.map.get(address).copied()
    }

    /// Records the type of `address`, returning the previous one, if any.
    pub fn insert(&mut self, address: Address, ty: Type) -> Option<Type> {
        self.map.insert(address, ty)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, Type)> {
        self.map.iter().map(|(address, ty)| (address, *ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_widths() {
        let widths: Vec<_> = PrimitiveType::ALL.iter().map(|ty| ty.width()).collect();
        assert_eq!(widths, [4, 8, 1, 1]);
    }

    #[test]
    fn only_int_and_real_are_numeric() {
        assert!(Type::Int.is_numeric());
        assert!(Type::Real.is_numeric());
        assert!(!Type::Char.is_numeric());
        assert!(!Type::Bool.is_numeric());
        assert!(!Type::Str.is_numeric());
    }

    #[test]
    fn symbol_table() {
        let mut table = SymbolTable::with_capacity(4);
        let a = Address::named("a");
        let t = Address::temp(1);

        assert!(table.is_empty());
        assert_eq!(table.insert(a.clone(), Type::Int), None);
        assert_eq!(table.insert(t.clone(), Type::Real), None);
        assert_eq!(table.insert(a.clone(), Type::Bool), Some(Type::Int));

        assert!(table.contains(&a));
        assert_eq!(table.get(&a), Some(Type::Bool));
        assert_eq!(table.get(&t), Some(Type::Real));
        assert_eq!(table.get(&Address::named("b")), None);
        assert_eq!(table.len(), 2);
    }
}
