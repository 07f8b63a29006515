//! Built-in YANG types to target types.

use crate::schema::BuiltinType;

/// A target type: its namespace (empty for primitives) and short name.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TargetType {
    pub namespace: &'static str,
    pub name: &'static str,
}

impl TargetType {
    const fn primitive(name: &'static str) -> Self {
        Self { namespace: "", name }
    }

    const fn class(namespace: &'static str, name: &'static str) -> Self {
        Self { namespace, name }
    }

    pub fn is_primitive(&self) -> bool {
        self.namespace.is_empty()
    }

    /// The reference type to use where primitives are not allowed
    /// (type arguments).
    pub fn boxed(self) -> Self {
        let name = match self.name {
            "byte" => "Byte",
            "short" => "Short",
            "int" => "Integer",
            "long" => "Long",
            "boolean" => "Boolean",
            _ => return self,
        };
        Self::class("java.lang", name)
    }
}

/// Unsigned types widen to the next signed type; `uint64` and `decimal64`
/// need arbitrary precision.
pub fn builtin(ty: BuiltinType) -> TargetType {
    match ty {
        BuiltinType::Int8 => TargetType::primitive("byte"),
        BuiltinType::Int16 | BuiltinType::Uint8 => TargetType::primitive("short"),
        BuiltinType::Int32 | BuiltinType::Uint16 => TargetType::primitive("int"),
        BuiltinType::Int64 | BuiltinType::Uint32 => TargetType::primitive("long"),
        BuiltinType::Uint64 => TargetType::class("java.math", "BigInteger"),
        BuiltinType::Decimal64 => TargetType::class("java.math", "BigDecimal"),
        BuiltinType::String | BuiltinType::InstanceIdentifier => {
            TargetType::class("java.lang", "String")
        }
        BuiltinType::Boolean | BuiltinType::Empty => TargetType::primitive("boolean"),
        BuiltinType::Binary => TargetType::primitive("byte[]"),
    }
}
