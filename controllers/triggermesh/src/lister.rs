//! Read-only access to declared resources.
//!
//! A thin wrapper over the reflector store kept up to date by the
//! `kube_runtime::Controller` watching the kind. Returned objects are shared
//! snapshots; callers clone before mutating.

use kube::runtime::reflector::{ObjectRef, Store};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Lister<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    store: Store<K>,
}

impl<K> std::fmt::Debug for Lister<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lister").field("kind", &K::kind(&())).finish_non_exhaustive()
    }
}

impl<K> Clone for Lister<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<K> Lister<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    pub fn new(store: Store<K>) -> Self {
        Self { store }
    }

    /// Returns the object `namespace/name`, if cached.
    pub fn get(&self, namespace: &str, name: &str) -> Option<Arc<K>> {
        self.store.get(&ObjectRef::new(name).within(namespace))
    }

    /// Lists cached objects in `namespace` (all namespaces when `None`)
    /// carrying every label of `selector`.
    pub fn list(&self, namespace: Option<&str>, selector: &BTreeMap<String, String>) -> Vec<Arc<K>> {
        let mut objects: Vec<Arc<K>> = self
            .store
            .state()
            .into_iter()
            .filter(|obj| namespace.is_none_or(|ns| obj.namespace().as_deref() == Some(ns)))
            .filter(|obj| {
                let labels = obj.labels();
                selector.iter().all(|(k, v)| labels.get(k) == Some(v))
            })
            .collect();
        objects.sort_by_key(|obj| (obj.namespace(), obj.name_any()));
        objects
    }
}
