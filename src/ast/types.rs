//! Type descriptors as written in source.

use std::fmt;

/// A type as it appears in a declaration: base name, template arguments,
/// optional array size, and the lock/ref qualifiers.
///
/// Equality is structural over name, array size and template arguments.
/// `locked` is excluded so that promoted types still match their operands;
/// `is_ref` is checked explicitly at the sites that care.
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub name: String,
    pub args: Vec<TypeExpr>,
    /// 0 means "not an array".
    pub array_size: u32,
    /// Compile-time immutability marker.
    pub locked: bool,
    /// The runtime representation is a pointer.
    pub is_ref: bool,
}

impl TypeExpr {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            array_size: 0,
            locked: false,
            is_ref: false,
        }
    }

    /// A literal's type: same shape as a plain named type but locked,
    /// since constants are immutable.
    pub fn literal(name: impl Into<String>) -> Self {
        Self {
            locked: true,
            ..Self::new(name)
        }
    }

    pub fn void() -> Self {
        Self::literal("void")
    }
}

impl PartialEq for TypeExpr {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.array_size == other.array_size
            && self.args == other.args
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.locked {
            write!(f, "lock ")?;
        }
        if self.is_ref {
            write!(f, "ref ")?;
        }
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        if self.array_size != 0 {
            write!(f, "[{}]", self.array_size)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_lock_and_ref() {
        let plain = TypeExpr::new("u16");
        let locked = TypeExpr {
            locked: true,
            ..TypeExpr::new("u16")
        };
        let reference = TypeExpr {
            is_ref: true,
            ..TypeExpr::new("u16")
        };
        assert_eq!(plain, locked);
        assert_eq!(plain, reference);
    }

    #[test]
    fn test_equality_is_structural() {
        let a = TypeExpr {
            args: vec![TypeExpr::new("u8")],
            ..TypeExpr::new("Vec")
        };
        let b = TypeExpr {
            args: vec![TypeExpr::new("u16")],
            ..TypeExpr::new("Vec")
        };
        assert_ne!(a, b);
        assert_ne!(TypeExpr::new("u8"), TypeExpr::new("u16"));

        let arr = TypeExpr {
            array_size: 4,
            ..TypeExpr::new("u8")
        };
        assert_ne!(arr, TypeExpr::new("u8"));
    }

    #[test]
    fn test_display() {
        let ty = TypeExpr {
            is_ref: true,
            ..TypeExpr::new("u16")
        };
        assert_eq!(ty.to_string(), "ref u16");
    }
}
