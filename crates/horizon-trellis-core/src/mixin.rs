//! Mixin definitions and the mixin registry.
//!
//! A mixin is a named, reusable bundle of members that classes fold into
//! their own member tables at build time. Mixins are applied in the order
//! they are listed; a later mixin overwrites same-named members from an
//! earlier one, and the class's own members overwrite both.
//!
//! Lookups by name are soft: asking for an unregistered mixin logs a
//! warning and skips it rather than failing the class build.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::member::MemberTable;

/// Runs after a mixin's members are merged, letting the mixin adjust the
/// target table (wrap methods, derive extra members).
pub type MixinApplyFn = Arc<dyn Fn(&mut MemberTable) + Send + Sync>;

/// A named, reusable bundle of members.
pub struct MixinDef {
    name: String,
    members: MemberTable,
    apply: Option<MixinApplyFn>,
}

impl MixinDef {
    /// Define a mixin.
    pub fn new(name: impl Into<String>, members: MemberTable) -> Self {
        Self {
            name: name.into(),
            members,
            apply: None,
        }
    }

    /// Attach a post-merge hook.
    pub fn with_apply<F>(mut self, apply: F) -> Self
    where
        F: Fn(&mut MemberTable) + Send + Sync + 'static,
    {
        self.apply = Some(Arc::new(apply));
        self
    }

    /// The mixin's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The members this mixin contributes.
    pub fn members(&self) -> &MemberTable {
        &self.members
    }

    /// Merge this mixin into `target`, then run the apply hook.
    pub fn apply_to(&self, target: &mut MemberTable) {
        target.extend(&self.members);
        if let Some(apply) = &self.apply {
            apply(target);
        }
    }
}

impl fmt::Debug for MixinDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixinDef")
            .field("name", &self.name)
            .field("members", &self.members.len())
            .field("has_apply", &self.apply.is_some())
            .finish()
    }
}

/// How a caller names the mixins to apply.
///
/// Accepts a single name, a comma-separated list, an explicit name slice,
/// or a raw member table applied inline without registry involvement.
pub enum MixinSpec {
    /// One or more names; a string containing commas is split.
    Names(Vec<String>),
    /// An anonymous member table merged as-is.
    Table(MemberTable),
}

impl From<&str> for MixinSpec {
    fn from(value: &str) -> Self {
        Self::Names(
            value
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }
}

impl From<String> for MixinSpec {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Vec<String>> for MixinSpec {
    fn from(value: Vec<String>) -> Self {
        Self::Names(value)
    }
}

impl From<&[&str]> for MixinSpec {
    fn from(value: &[&str]) -> Self {
        Self::Names(value.iter().map(|s| s.to_string()).collect())
    }
}

impl From<MemberTable> for MixinSpec {
    fn from(value: MemberTable) -> Self {
        Self::Table(value)
    }
}

/// Registry of mixin definitions, keyed by globally unique name.
///
/// Re-registering a name silently replaces the previous definition.
#[derive(Default)]
pub struct MixinRegistry {
    mixins: RwLock<HashMap<String, Arc<MixinDef>>>,
}

impl MixinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mixin, replacing any previous definition of the name.
    pub fn register(&self, def: MixinDef) -> Arc<MixinDef> {
        let def = Arc::new(def);
        let previous = self
            .mixins
            .write()
            .insert(def.name().to_string(), def.clone());
        if previous.is_some() {
            tracing::trace!(
                target: "horizon_trellis_core::mixin",
                name = %def.name(),
                "replacing registered mixin"
            );
        }
        def
    }

    /// Look up a mixin by name.
    pub fn get(&self, name: &str) -> Option<Arc<MixinDef>> {
        self.mixins.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mixins.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.mixins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mixins.read().is_empty()
    }

    /// Apply the named mixins to `target` in listed order.
    ///
    /// Names that miss the registry log a warning and are skipped. Returns
    /// the names that were actually applied, in application order, for
    /// recording in the class's ancestor chain.
    pub fn apply(&self, target: &mut MemberTable, spec: impl Into<MixinSpec>) -> Vec<String> {
        match spec.into() {
            MixinSpec::Names(names) => {
                let mut applied = Vec::with_capacity(names.len());
                for name in names {
                    match self.get(&name) {
                        Some(def) => {
                            def.apply_to(target);
                            applied.push(name);
                        }
                        None => {
                            tracing::warn!(
                                target: "horizon_trellis_core::mixin",
                                name = %name,
                                "unknown mixin; skipping"
                            );
                        }
                    }
                }
                applied
            }
            MixinSpec::Table(table) => {
                target.extend(&table);
                Vec::new()
            }
        }
    }
}

impl fmt::Debug for MixinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixinRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::Variant;

    fn data_mixin(name: &str, key: &str, value: i64) -> MixinDef {
        MixinDef::new(name, MemberTable::new().with_data(key, Variant::from(value)))
    }

    #[test]
    fn test_register_and_apply() {
        let registry = MixinRegistry::new();
        registry.register(data_mixin("counter", "count", 0));

        let mut target = MemberTable::new();
        let applied = registry.apply(&mut target, "counter");
        assert_eq!(applied, vec!["counter".to_string()]);
        assert_eq!(target.get("count").unwrap().as_data(), Some(&Variant::from(0)));
    }

    #[test]
    fn test_comma_list_later_wins() {
        let registry = MixinRegistry::new();
        registry.register(data_mixin("a", "value", 1));
        registry.register(data_mixin("b", "value", 2));

        let mut target = MemberTable::new();
        let applied = registry.apply(&mut target, "a, b");
        assert_eq!(applied, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(target.get("value").unwrap().as_data(), Some(&Variant::from(2)));
    }

    #[test]
    fn test_unknown_name_skipped() {
        let registry = MixinRegistry::new();
        registry.register(data_mixin("known", "x", 1));

        let mut target = MemberTable::new();
        let applied = registry.apply(&mut target, "known, missing");
        assert_eq!(applied, vec!["known".to_string()]);
        assert!(target.get("missing").is_none());
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn test_reregister_overwrites_silently() {
        let registry = MixinRegistry::new();
        registry.register(data_mixin("m", "v", 1));
        registry.register(data_mixin("m", "v", 2));
        assert_eq!(registry.len(), 1);

        let mut target = MemberTable::new();
        registry.apply(&mut target, "m");
        assert_eq!(target.get("v").unwrap().as_data(), Some(&Variant::from(2)));
    }

    #[test]
    fn test_inline_table_applies_without_registry() {
        let registry = MixinRegistry::new();
        let inline = MemberTable::new().with_data("free", Variant::from(true));

        let mut target = MemberTable::new();
        let applied = registry.apply(&mut target, inline);
        assert!(applied.is_empty());
        assert!(target.contains("free"));
    }

    #[test]
    fn test_apply_hook_runs_after_merge() {
        let registry = MixinRegistry::new();
        let def = data_mixin("hooked", "base", 1).with_apply(|table| {
            table.set_data("derived", Variant::from(2));
        });
        registry.register(def);

        let mut target = MemberTable::new();
        registry.apply(&mut target, "hooked");
        assert_eq!(target.get("derived").unwrap().as_data(), Some(&Variant::from(2)));
    }
}
