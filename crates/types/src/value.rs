//! Value-type descriptors used as parser registry and context keys.

use std::any::{self, TypeId};
use std::fmt;

/// Opaque handle describing the Rust type a parser produces.
///
/// Two `ValueType`s compare equal when both the erased [`TypeId`] and the
/// element parameters match, so parameterised constructs (pair parsers,
/// alternative parsers) remain distinguishable after generic erasure. The
/// handle is cheap to clone and usable as a map key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
    params: Vec<ValueType>,
}

impl ValueType {
    /// Descriptor for a plain, unparameterised type.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
            params: Vec::new(),
        }
    }

    /// Descriptor for a parameterised construct carrying its element types.
    pub fn parameterised<T: 'static>(params: Vec<ValueType>) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
            params,
        }
    }

    /// The erased type identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully-qualified Rust type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Short name with module paths stripped, for user-facing messages.
    pub fn short_name(&self) -> &'static str {
        match self.name.split('<').next() {
            Some(head) => {
                let start = head.rfind("::").map(|i| i + 2).unwrap_or(0);
                &self.name[start..]
            }
            None => self.name,
        }
    }

    /// Element types for parameterised constructs; empty for plain types.
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "ValueType({})", self.short_name())
        } else {
            write!(f, "ValueType({}, params: {:?})", self.short_name(), self.params)
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_by_type() {
        assert_eq!(ValueType::of::<i32>(), ValueType::of::<i32>());
        assert_ne!(ValueType::of::<i32>(), ValueType::of::<i64>());
    }

    #[test]
    fn test_params_distinguish_descriptors() {
        let plain = ValueType::of::<Vec<String>>();
        let with_elem = ValueType::parameterised::<Vec<String>>(vec![ValueType::of::<String>()]);
        assert_ne!(plain, with_elem);
        assert_eq!(with_elem.params(), &[ValueType::of::<String>()]);
    }

    #[test]
    fn test_short_name_strips_path() {
        assert_eq!(ValueType::of::<String>().short_name(), "String");
        assert_eq!(ValueType::of::<i32>().short_name(), "i32");
    }

    #[test]
    fn test_usable_as_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(ValueType::of::<bool>(), "boolean");
        assert_eq!(map.get(&ValueType::of::<bool>()), Some(&"boolean"));
    }
}
