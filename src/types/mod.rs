//! Primitive type classification and promotion.
//!
//! Primitive numeric types pack into a single byte: the upper nibble is the
//! category (1 unsigned, 2 signed, 3 float), the lower nibble the width in
//! bytes (1, 2, 4 or 8). `0x00` is the TYPE_NONE sentinel for "invalid";
//! a valid primitive byte never has a zero lower nibble.

use crate::ast::TypeExpr;

/// Sentinel for "not a primitive type".
pub const TYPE_NONE: u8 = 0x00;
/// Unsigned integer category nibble.
pub const CAT_UNSIGNED: u8 = 0x01;
/// Signed integer category nibble.
pub const CAT_SIGNED: u8 = 0x02;
/// Floating-point category nibble.
pub const CAT_FLOAT: u8 = 0x03;

/// Pack a category nibble and a byte width into a primitive byte.
pub const fn pack(category: u8, size: u8) -> u8 {
    (category << 4) | size
}

/// The category nibble of a primitive byte.
pub const fn category(prim: u8) -> u8 {
    prim >> 4
}

/// The width in bytes of a primitive byte.
pub const fn width(prim: u8) -> u8 {
    prim & 0x0f
}

pub const U8: u8 = pack(CAT_UNSIGNED, 1);
pub const U16: u8 = pack(CAT_UNSIGNED, 2);
pub const U32: u8 = pack(CAT_UNSIGNED, 4);
pub const U64: u8 = pack(CAT_UNSIGNED, 8);
pub const I8: u8 = pack(CAT_SIGNED, 1);
pub const I16: u8 = pack(CAT_SIGNED, 2);
pub const I32: u8 = pack(CAT_SIGNED, 4);
pub const I64: u8 = pack(CAT_SIGNED, 8);
pub const F32: u8 = pack(CAT_FLOAT, 4);
pub const F64: u8 = pack(CAT_FLOAT, 8);

/// True for each of the ten valid primitive bytes.
pub fn is_valid_prim_byte(prim: u8) -> bool {
    let size_ok = matches!(width(prim), 1 | 2 | 4 | 8);
    match category(prim) {
        CAT_UNSIGNED | CAT_SIGNED => size_ok,
        CAT_FLOAT => matches!(width(prim), 4 | 8),
        _ => false,
    }
}

/// A type is primitive iff it has no template arguments, no array size, and
/// its name is `{u|i|f}{8|16|32|64}` with floats restricted to f32/f64.
pub fn is_primitive(ty: &TypeExpr) -> bool {
    ty.array_size == 0 && ty.args.is_empty() && primitive_byte(ty) != TYPE_NONE
}

/// The packed primitive byte for a type name, or TYPE_NONE.
pub fn primitive_byte(ty: &TypeExpr) -> u8 {
    let name = ty.name.as_bytes();
    if name.len() < 2 || name.len() > 3 {
        return TYPE_NONE;
    }

    let category = match name[0] {
        b'u' => CAT_UNSIGNED,
        b'i' => CAT_SIGNED,
        b'f' => CAT_FLOAT,
        _ => return TYPE_NONE,
    };

    let size = match &ty.name[1..] {
        "8" => 1,
        "16" => 2,
        "32" => 4,
        "64" => 8,
        _ => return TYPE_NONE,
    };

    if category == CAT_FLOAT && size < 4 {
        return TYPE_NONE;
    }

    pack(category, size)
}

/// Byte size of a value of this type on the VM stack. References occupy a
/// pointer (8 bytes) regardless of target; aggregates are not sized yet.
pub fn type_size(ty: &TypeExpr) -> u32 {
    if ty.is_ref {
        return 8;
    }
    let prim = primitive_byte(ty);
    if prim != TYPE_NONE {
        return width(prim) as u32;
    }
    // TODO: aggregate sizing once layouts exist
    0
}

/// The stronger of two category nibbles: unsigned < signed < float.
pub fn best_category(l: u8, r: u8) -> u8 {
    l.max(r)
}

/// Promote two primitive types for a binary operation.
///
/// Different categories: the stronger operand's type wins wholesale.
/// Same category: the larger width wins. The result's lock flag is the OR
/// of the operands'. Returns `None` when either side is not primitive.
pub fn promote(left: &TypeExpr, right: &TypeExpr) -> Option<TypeExpr> {
    let lp = if is_primitive(left) {
        primitive_byte(left)
    } else {
        return None;
    };
    let rp = if is_primitive(right) {
        primitive_byte(right)
    } else {
        return None;
    };

    let locked = left.locked || right.locked;

    let mut result = if category(lp) != category(rp) {
        if category(lp) == best_category(category(lp), category(rp)) {
            left.clone()
        } else {
            right.clone()
        }
    } else if width(lp) >= width(rp) {
        left.clone()
    } else {
        right.clone()
    };

    result.locked = locked;
    result.is_ref = false;
    Some(result)
}

/// Human-readable type name for a primitive byte, for disassembly.
pub fn prim_name(prim: u8) -> &'static str {
    match prim {
        U8 => "u8",
        U16 => "u16",
        U32 => "u32",
        U64 => "u64",
        I8 => "i8",
        I16 => "i16",
        I32 => "i32",
        I64 => "i64",
        F32 => "f32",
        F64 => "f64",
        _ => "none",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> TypeExpr {
        TypeExpr::new(name)
    }

    #[test]
    fn test_primitive_classification() {
        for name in ["u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64", "f32", "f64"] {
            assert!(is_primitive(&ty(name)), "{} should be primitive", name);
        }
        for name in ["f8", "f16", "u128", "x8", "u", "void", "Vec"] {
            assert!(!is_primitive(&ty(name)), "{} should not be primitive", name);
        }

        let with_args = TypeExpr {
            args: vec![ty("u8")],
            ..ty("u8")
        };
        assert!(!is_primitive(&with_args));

        let array = TypeExpr {
            array_size: 3,
            ..ty("u8")
        };
        assert!(!is_primitive(&array));
    }

    #[test]
    fn test_primitive_byte_packing() {
        assert_eq!(primitive_byte(&ty("u8")), 0x11);
        assert_eq!(primitive_byte(&ty("u16")), 0x12);
        assert_eq!(primitive_byte(&ty("u32")), 0x14);
        assert_eq!(primitive_byte(&ty("u64")), 0x18);
        assert_eq!(primitive_byte(&ty("i8")), 0x21);
        assert_eq!(primitive_byte(&ty("f32")), 0x34);
        assert_eq!(primitive_byte(&ty("f64")), 0x38);
        assert_eq!(primitive_byte(&ty("bogus")), TYPE_NONE);
        // A primitive byte never has a zero lower nibble
        for name in ["u8", "i64", "f32"] {
            assert_ne!(width(primitive_byte(&ty(name))), 0);
        }
    }

    #[test]
    fn test_valid_prim_bytes() {
        let valid = [U8, U16, U32, U64, I8, I16, I32, I64, F32, F64];
        for b in valid {
            assert!(is_valid_prim_byte(b), "{:#04x}", b);
        }
        for b in [0x00, 0x10, 0x13, 0x31, 0x32, 0x41, 0xff] {
            assert!(!is_valid_prim_byte(b), "{:#04x}", b);
        }
    }

    #[test]
    fn test_type_size() {
        assert_eq!(type_size(&ty("u8")), 1);
        assert_eq!(type_size(&ty("f64")), 8);
        let reference = TypeExpr {
            is_ref: true,
            ..ty("u16")
        };
        assert_eq!(type_size(&reference), 8);
        assert_eq!(type_size(&ty("Vec")), 0);
    }

    #[test]
    fn test_promote_same_category() {
        assert_eq!(promote(&ty("u8"), &ty("u32")).unwrap().name, "u32");
        assert_eq!(promote(&ty("i16"), &ty("i8")).unwrap().name, "i16");
        assert_eq!(promote(&ty("f32"), &ty("f64")).unwrap().name, "f64");
    }

    #[test]
    fn test_promote_stronger_category_wins() {
        assert_eq!(promote(&ty("u8"), &ty("f32")).unwrap().name, "f32");
        assert_eq!(promote(&ty("u32"), &ty("i8")).unwrap().name, "i8");
        // The stronger operand wins wholesale, including its width
        assert_eq!(promote(&ty("i64"), &ty("f32")).unwrap().name, "f32");
    }

    #[test]
    fn test_promote_commutative_and_idempotent() {
        let names = ["u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64", "f32", "f64"];
        for a in names {
            assert_eq!(promote(&ty(a), &ty(a)).unwrap(), ty(a));
            for b in names {
                assert_eq!(promote(&ty(a), &ty(b)), promote(&ty(b), &ty(a)));
            }
        }
    }

    #[test]
    fn test_promote_locks_or() {
        let locked = TypeExpr::literal("u8");
        let plain = ty("u32");
        assert!(promote(&locked, &plain).unwrap().locked);
        assert!(promote(&plain, &locked).unwrap().locked);
        assert!(!promote(&plain, &plain).unwrap().locked);
    }

    #[test]
    fn test_promote_rejects_non_primitives() {
        assert!(promote(&ty("Vec"), &ty("u8")).is_none());
        assert!(promote(&ty("u8"), &ty("void")).is_none());
    }
}
