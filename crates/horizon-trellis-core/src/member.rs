//! Member tables: the ordered bags of methods and data that classes and
//! mixins are composed from.
//!
//! A `MemberTable` maps member names to either a method slot (a boxed
//! closure invoked with the owning instance and an argument list) or a
//! data member (a [`Variant`] default). Tables are what mixins register,
//! what class builders merge, and what instances dispatch through.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::class::Instance;
use crate::error::Result;
use crate::ordered_map::OrderedMap;
use crate::soon::SoonHandle;
use crate::variant::Variant;

/// What a method slot may hand back to the dispatcher.
pub enum MethodReturn {
    /// An immediate value.
    Value(Variant),
    /// A pending deferred result; callers chaining on the outer handle
    /// settle when this inner handle settles.
    Deferred(SoonHandle),
}

impl MethodReturn {
    /// Convenience for the common "no meaningful result" case.
    pub fn nothing() -> Result<MethodReturn> {
        Ok(MethodReturn::Value(Variant::Null))
    }

    /// Convenience for returning an immediate value.
    pub fn value(value: impl Into<Variant>) -> Result<MethodReturn> {
        Ok(MethodReturn::Value(value.into()))
    }
}

impl fmt::Debug for MethodReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

/// A method slot: invoked with the owning instance and the call arguments.
pub type MethodFn = Arc<dyn Fn(&Arc<Instance>, &[Variant]) -> Result<MethodReturn> + Send + Sync>;

/// A single named member of a class or mixin.
#[derive(Clone)]
pub enum Member {
    /// A callable method slot.
    Method(MethodFn),
    /// A data member (used as the initial state value for instances).
    Data(Variant),
    /// A data member excluded from state enumeration. Reads and writes
    /// work normally; `state_keys`/`state_snapshot` skip it.
    Hidden(Variant),
}

impl Member {
    /// Whether this member is callable.
    pub fn is_method(&self) -> bool {
        matches!(self, Self::Method(_))
    }

    /// Whether this member is excluded from enumeration.
    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Hidden(_))
    }

    /// The method slot, if this is callable.
    pub fn as_method(&self) -> Option<&MethodFn> {
        match self {
            Self::Method(f) => Some(f),
            Self::Data(_) | Self::Hidden(_) => None,
        }
    }

    /// The data payload, if this is a data member (hidden or not).
    pub fn as_data(&self) -> Option<&Variant> {
        match self {
            Self::Data(v) | Self::Hidden(v) => Some(v),
            Self::Method(_) => None,
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(_) => write!(f, "Member::Method(..)"),
            Self::Data(v) => f.debug_tuple("Member::Data").field(v).finish(),
            Self::Hidden(v) => f.debug_tuple("Member::Hidden").field(v).finish(),
        }
    }
}

/// An ordered, named collection of members.
#[derive(Debug, Clone, Default)]
pub struct MemberTable {
    members: OrderedMap<Member>,
}

impl MemberTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            members: OrderedMap::new(),
        }
    }

    /// Builder-style method registration.
    pub fn with_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Arc<Instance>, &[Variant]) -> Result<MethodReturn> + Send + Sync + 'static,
    {
        self.set_method(name, f);
        self
    }

    /// Builder-style data registration.
    pub fn with_data(mut self, name: impl Into<String>, value: impl Into<Variant>) -> Self {
        self.members.insert(name, Member::Data(value.into()));
        self
    }

    /// Builder-style registration of a hidden data member.
    pub fn with_hidden(mut self, name: impl Into<String>, value: impl Into<Variant>) -> Self {
        self.set_hidden(name, value);
        self
    }

    /// Builder form of [`extend`](Self::extend).
    pub fn extended(mut self, other: &MemberTable) -> Self {
        self.extend(other);
        self
    }

    /// Insert or overwrite a method slot.
    pub fn set_method<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Arc<Instance>, &[Variant]) -> Result<MethodReturn> + Send + Sync + 'static,
    {
        self.members.insert(name, Member::Method(Arc::new(f)));
    }

    /// Insert or overwrite a data member.
    pub fn set_data(&mut self, name: impl Into<String>, value: impl Into<Variant>) {
        self.members.insert(name, Member::Data(value.into()));
    }

    /// Insert or overwrite a hidden data member.
    pub fn set_hidden(&mut self, name: impl Into<String>, value: impl Into<Variant>) {
        self.members.insert(name, Member::Hidden(value.into()));
    }

    /// Look a member up by name.
    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Whether the table contains `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Member names in declaration order.
    pub fn names(&self) -> &[String] {
        self.members.keys()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate `(name, member)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter()
    }

    /// Copy every member of `other` into this table, overwriting
    /// same-named members.
    pub fn extend(&mut self, other: &MemberTable) {
        for (name, member) in other.iter() {
            self.members.insert(name, member.clone());
        }
    }

    /// Copy members of `other` into this table, but never overwrite a
    /// member that is already defined.
    pub fn patch(&mut self, other: &MemberTable) {
        for (name, member) in other.iter() {
            if !self.members.contains_key(name) {
                self.members.insert(name, member.clone());
            }
        }
    }

    /// Like [`extend`](Self::extend), but when both sides hold a map-shaped
    /// data member under the same name the maps are merged recursively
    /// instead of replaced.
    pub fn merge(&mut self, other: &MemberTable) {
        for (name, member) in other.iter() {
            let merged = match (self.members.get(name), member) {
                (Some(Member::Data(Variant::Map(ours))), Member::Data(Variant::Map(theirs))) => {
                    Member::Data(Variant::Map(merge_maps(ours, theirs)))
                }
                _ => member.clone(),
            };
            self.members.insert(name, merged);
        }
    }
}

fn merge_maps(
    ours: &BTreeMap<String, Variant>,
    theirs: &BTreeMap<String, Variant>,
) -> BTreeMap<String, Variant> {
    let mut out = ours.clone();
    for (key, value) in theirs {
        match (out.get(key), value) {
            (Some(Variant::Map(a)), Variant::Map(b)) => {
                out.insert(key.clone(), Variant::Map(merge_maps(a, b)));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_table(pairs: &[(&str, i64)]) -> MemberTable {
        let mut table = MemberTable::new();
        for (name, value) in pairs {
            table.set_data(*name, *value);
        }
        table
    }

    #[test]
    fn test_method_return_debug_is_opaque_for_deferred() {
        let value = MethodReturn::Value(Variant::from(7));
        assert_eq!(format!("{value:?}"), "Value(Int(7))");

        let scheduler = crate::soon::SoonScheduler::new(Arc::new(|_, _| MethodReturn::nothing()));
        let deferred = MethodReturn::Deferred(scheduler.soon("noop", vec![]));
        assert_eq!(format!("{deferred:?}"), "Deferred(..)");
    }

    #[test]
    fn test_extend_overwrites() {
        let mut a = data_table(&[("x", 1), ("y", 2)]);
        let b = data_table(&[("y", 20), ("z", 30)]);
        a.extend(&b);

        assert_eq!(a.get("y").and_then(Member::as_data), Some(&Variant::from(20)));
        assert_eq!(a.get("z").and_then(Member::as_data), Some(&Variant::from(30)));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_patch_never_overwrites() {
        let mut a = data_table(&[("x", 1)]);
        let b = data_table(&[("x", 100), ("y", 2)]);
        a.patch(&b);

        assert_eq!(a.get("x").and_then(Member::as_data), Some(&Variant::from(1)));
        assert_eq!(a.get("y").and_then(Member::as_data), Some(&Variant::from(2)));
    }

    #[test]
    fn test_merge_recurses_into_maps() {
        let mut inner_a = BTreeMap::new();
        inner_a.insert("left".to_string(), Variant::from(1));
        let mut inner_b = BTreeMap::new();
        inner_b.insert("right".to_string(), Variant::from(2));

        let mut a = MemberTable::new();
        a.set_data("options", Variant::Map(inner_a));
        let mut b = MemberTable::new();
        b.set_data("options", Variant::Map(inner_b));

        a.merge(&b);
        let options = a.get("options").and_then(Member::as_data).unwrap();
        assert_eq!(options.get("left").and_then(Variant::as_int), Some(1));
        assert_eq!(options.get("right").and_then(Variant::as_int), Some(2));
    }

    #[test]
    fn test_extend_preserves_hidden_flag() {
        let mut a = MemberTable::new();
        let b = MemberTable::new()
            .with_data("visible", 1)
            .with_hidden("secret", 2);
        a.extend(&b);

        assert!(!a.get("visible").is_some_and(Member::is_hidden));
        assert!(a.get("secret").is_some_and(Member::is_hidden));
        assert_eq!(
            a.get("secret").and_then(Member::as_data),
            Some(&Variant::from(2))
        );
    }

    #[test]
    fn test_declaration_order_preserved() {
        let table = data_table(&[("c", 3), ("a", 1), ("b", 2)]);
        assert_eq!(
            table.names(),
            &["c".to_string(), "a".to_string(), "b".to_string()]
        );
    }
}
