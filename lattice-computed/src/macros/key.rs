//! Macro descriptors: the things a computed macro can depend on.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::computed::AuxiliaryHelper;
use crate::object::Object;

/// A composable value producer that can appear as a dependency of another
/// macro.
pub trait Macro: Send + Sync + fmt::Debug {
    /// Descriptors this macro depends on. Flattening follows these
    /// recursively down to leaf key paths.
    fn dependencies(&self) -> Vec<MacroKey>;

    /// Produce the macro's value on `context`. `key` is the property the
    /// value is being produced for, when there is one.
    fn resolve(&self, context: &Object, key: Option<&str>) -> Value;

    /// Whether this macro announces its own changes to the helpers that
    /// depend on it. Such macros are not observed through their leaf keys.
    fn pushes_changes(&self) -> bool {
        false
    }

    /// The helper backing this macro on `context`, for macros that push their
    /// changes.
    fn helper(&self, _context: &Object, _key: Option<&str>) -> Option<Arc<AuxiliaryHelper>> {
        None
    }
}

/// One dependency passed to a computed macro.
#[derive(Clone)]
pub enum MacroKey {
    /// A dotted key path on the owning object.
    Path(String),
    /// A nested macro.
    Macro(Arc<dyn Macro>),
    /// A literal value with no dependencies.
    Literal(Value),
}

impl MacroKey {
    /// The key path, if this is a path descriptor.
    pub fn as_path(&self) -> Option<&str> {
        match self {
            MacroKey::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(self, MacroKey::Path(_))
    }

    /// Whether both descriptors name the same dependency. Macros compare by
    /// identity, literals never compare equal.
    pub fn same_as(&self, other: &MacroKey) -> bool {
        match (self, other) {
            (MacroKey::Path(a), MacroKey::Path(b)) => a == b,
            (MacroKey::Macro(a), MacroKey::Macro(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for MacroKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroKey::Path(path) => f.debug_tuple("Path").field(path).finish(),
            MacroKey::Macro(m) => f.debug_tuple("Macro").field(m).finish(),
            MacroKey::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
        }
    }
}

impl From<&str> for MacroKey {
    fn from(path: &str) -> Self {
        MacroKey::Path(path.to_string())
    }
}

impl From<String> for MacroKey {
    fn from(path: String) -> Self {
        MacroKey::Path(path)
    }
}

impl From<Arc<dyn Macro>> for MacroKey {
    fn from(m: Arc<dyn Macro>) -> Self {
        MacroKey::Macro(m)
    }
}

impl<M: Macro + 'static> From<Arc<M>> for MacroKey {
    fn from(m: Arc<M>) -> Self {
        MacroKey::Macro(m)
    }
}

/// A literal dependency. It is passed to the combining function as-is and is
/// never observed.
pub fn raw(value: impl Into<Value>) -> MacroKey {
    MacroKey::Literal(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Constant;

    impl Macro for Constant {
        fn dependencies(&self) -> Vec<MacroKey> {
            Vec::new()
        }

        fn resolve(&self, _context: &Object, _key: Option<&str>) -> Value {
            json!(1)
        }
    }

    #[test]
    fn paths_compare_by_value() {
        assert!(MacroKey::from("a.b").same_as(&MacroKey::from("a.b".to_string())));
        assert!(!MacroKey::from("a.b").same_as(&MacroKey::from("a.c")));
    }

    #[test]
    fn macros_compare_by_identity() {
        let shared = Arc::new(Constant);
        let a = MacroKey::from(Arc::clone(&shared));
        let b = MacroKey::from(shared);
        let other = MacroKey::from(Arc::new(Constant));

        assert!(a.same_as(&b));
        assert!(!a.same_as(&other));
    }

    #[test]
    fn literals_never_compare_equal() {
        assert!(!raw(1).same_as(&raw(1)));
        assert_eq!(raw("x").as_path(), None);
        assert!(MacroKey::from("x").is_path());
    }
}
