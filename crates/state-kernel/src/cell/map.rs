use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::{CellCore, CellId, CellKind, CellValue};
use crate::change::{Change, ChangeKind};
use crate::error::StateError;
use crate::manager::StateManager;
use crate::observe::{Model, Observer};

/// Sorted key to value mapping cell.
pub struct MapState<K: CellValue + Ord, V: CellValue> {
    core: Rc<CellCore<BTreeMap<K, V>>>,
}

impl<K: CellValue + Ord, V: CellValue> MapState<K, V> {
    pub fn new(manager: &StateManager, id: impl Into<String>) -> Result<Self, StateError> {
        let core = CellCore::create(manager, id, CellKind::Map, BTreeMap::new())?;
        Ok(Self { core })
    }

    pub fn id(&self) -> &CellId {
        self.core.id()
    }

    /// Inserts or overwrites `key`.
    ///
    /// Returns `false` and records nothing when the entry already holds `value`.
    pub fn put(&self, key: K, value: V) -> bool {
        let old = self.get(&key);
        if old.as_ref() == Some(&value) {
            return false;
        }
        self.record(key, MapOp::Put { old, new: value });
        true
    }

    /// Removes `key`, returning its value; an absent key records nothing.
    pub fn remove(&self, key: &K) -> Option<V> {
        let old = self.get(key)?;
        self.record(key.clone(), MapOp::Remove { old: old.clone() });
        Some(old)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.core.read(|map| map.get(key).cloned())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.core.read(|map| map.contains_key(key))
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> Vec<K> {
        self.core.read(|map| map.keys().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.core.read(BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.core.read(BTreeMap::is_empty)
    }

    /// Snapshot of the current entries.
    pub fn view(&self) -> BTreeMap<K, V> {
        self.core.read(BTreeMap::clone)
    }

    /// Folds over the entries in key order without cloning them.
    pub fn fold<R>(&self, init: R, f: impl FnMut(R, (&K, &V)) -> R) -> R {
        self.core.read(|map| map.iter().fold(init, f))
    }

    pub fn subscribe(&self, observer: Rc<dyn Observer>) {
        self.core.subscribe(observer);
    }

    pub fn add_model(&self, model: &Rc<Model>) {
        self.core.add_model(model);
    }

    pub fn render(&self) -> String {
        self.core.render()
    }

    #[must_use]
    pub fn with_formatter(self, formatter: impl Fn(&BTreeMap<K, V>) -> String + 'static) -> Self {
        self.core.set_formatter(Box::new(formatter));
        self
    }

    fn record(&self, key: K, op: MapOp<V>) {
        self.core.record(Box::new(MapChange {
            cell: Rc::clone(&self.core),
            key,
            op,
        }));
    }
}

impl<K: CellValue + Ord, V: CellValue> Clone for MapState<K, V> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<K: CellValue + Ord, V: CellValue> fmt::Debug for MapState<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core
            .read(|map| f.debug_tuple("MapState").field(self.id()).field(map).finish())
    }
}

/// `old: None` on a put means the key did not exist before.
#[derive(Debug)]
enum MapOp<V> {
    Put { old: Option<V>, new: V },
    Remove { old: V },
}

struct MapChange<K: CellValue + Ord, V: CellValue> {
    cell: Rc<CellCore<BTreeMap<K, V>>>,
    key: K,
    op: MapOp<V>,
}

impl<K: CellValue + Ord, V: CellValue> MapChange<K, V> {
    fn install(&self, value: Option<&V>) {
        let key = self.key.clone();
        let value = value.cloned();
        self.cell.apply(|map| match value {
            Some(value) => {
                map.insert(key, value);
            }
            None => {
                map.remove(&key);
            }
        });
    }
}

impl<K: CellValue + Ord, V: CellValue> Change for MapChange<K, V> {
    fn execute(&self) {
        match &self.op {
            MapOp::Put { new, .. } => self.install(Some(new)),
            MapOp::Remove { .. } => self.install(None),
        }
    }

    fn undo(&self) {
        match &self.op {
            MapOp::Put { old, .. } => self.install(old.as_ref()),
            MapOp::Remove { old } => self.install(Some(old)),
        }
    }

    fn kind(&self) -> ChangeKind {
        match self.op {
            MapOp::Put { .. } => ChangeKind::MapPut,
            MapOp::Remove { .. } => ChangeKind::MapRemove,
        }
    }

    fn target(&self) -> &CellId {
        self.cell.id()
    }

    fn describe(&self) -> String {
        let id = self.cell.id();
        let key = &self.key;
        match &self.op {
            MapOp::Put { old: None, new } => format!("{id}[{key:?}]: new {new:?}"),
            MapOp::Put { old: Some(old), new } => format!("{id}[{key:?}]: {old:?} -> {new:?}"),
            MapOp::Remove { old } => format!("{id}[{key:?}]: removed {old:?}"),
        }
    }
}
