//! Indexed multi-key tables
//!
//! A [`MultiKeyTable`] is a sparse tensor of values indexed by a tuple of
//! named string keys. Its authoritative store is a [`NestedDict`] in the
//! declared key order. Other key orders can be cached with
//! [`MultiKeyTable::cache`], after which filters whose bound keys form a
//! prefix of that order walk the cache instead of scanning every row.
//!
//! Fixing some keys gives a child view. [`View`] reads through to the
//! parent; [`ViewMut`] writes through to the parent and remembers its bound
//! keys, so the parent stays the only owner of the data.

use std::collections::{BTreeMap, BTreeSet};

/// Values that can be stored as one or more columns of a flat table
pub trait TableValue: Sized {
    /// Default column names for this value
    fn value_names() -> Vec<&'static str>;

    /// Render this value as one field per column
    fn to_fields(&self) -> Vec<String>;

    /// Parse a value from its fields, in `value_names()` order
    fn from_fields(fields: &[&str]) -> Result<Self, String>;
}

/// Format a float for a flat table: `nan`, `inf`, `-inf` or full precision
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x == f64::INFINITY {
        "inf".to_string()
    } else if x == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{}", x)
    }
}

/// Parse a float written by [`format_float`] (or any standard spelling)
pub fn parse_float(s: &str) -> Result<f64, String> {
    let s = s.trim();
    match s.to_ascii_lowercase().as_str() {
        "" | "nan" => Ok(f64::NAN),
        "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
        "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
        _ => s.parse::<f64>().map_err(|_| format!("Invalid number: {}", s)),
    }
}

/// Parse a boolean: `true/false/1/0`, case-insensitive
pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(format!("Invalid boolean: {}", other)),
    }
}

impl TableValue for f64 {
    fn value_names() -> Vec<&'static str> {
        vec!["value"]
    }

    fn to_fields(&self) -> Vec<String> {
        vec![format_float(*self)]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        match fields {
            [x] => parse_float(x),
            _ => Err(format!("Expected 1 field, got {}", fields.len())),
        }
    }
}

impl TableValue for bool {
    fn value_names() -> Vec<&'static str> {
        vec!["public"]
    }

    fn to_fields(&self) -> Vec<String> {
        vec![self.to_string()]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        match fields {
            [x] => parse_bool(x),
            _ => Err(format!("Expected 1 field, got {}", fields.len())),
        }
    }
}

impl TableValue for () {
    fn value_names() -> Vec<&'static str> {
        Vec::new()
    }

    fn to_fields(&self) -> Vec<String> {
        Vec::new()
    }

    fn from_fields(_fields: &[&str]) -> Result<Self, String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node<V> {
    Leaf(V),
    Branch(BTreeMap<String, Node<V>>),
}

/// A dictionary of fixed depth keyed by string tuples
///
/// Keys are kept sorted at every level, so iteration order is the
/// lexicographic order of key tuples.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedDict<V> {
    depth: usize,
    root: BTreeMap<String, Node<V>>,
    len: usize,
}

impl<V> NestedDict<V> {
    /// Create an empty dictionary whose keys have `depth` components
    ///
    /// # Panics
    /// Panics if depth is 0
    pub fn new(depth: usize) -> Self {
        assert!(depth > 0, "NestedDict depth must be at least 1");
        Self {
            depth,
            root: BTreeMap::new(),
            len: 0,
        }
    }

    /// Number of key components
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the dictionary holds no value
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value, returning the previous one
    ///
    /// # Panics
    /// Panics if the key tuple does not have `depth` components
    pub fn insert<K: AsRef<str>>(&mut self, keys: &[K], value: V) -> Option<V> {
        assert_eq!(keys.len(), self.depth, "Expected {} keys", self.depth);
        let (last, init) = keys.split_last()?;
        let mut map = &mut self.root;
        for key in init {
            let node = map
                .entry(key.as_ref().to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            map = match node {
                Node::Branch(m) => m,
                Node::Leaf(_) => unreachable!("leaf above the configured depth"),
            };
        }
        let previous = match map.insert(last.as_ref().to_string(), Node::Leaf(value)) {
            Some(Node::Leaf(v)) => Some(v),
            _ => None,
        };
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Get the value stored at a full key tuple
    pub fn get<K: AsRef<str>>(&self, keys: &[K]) -> Option<&V> {
        if keys.len() != self.depth {
            return None;
        }
        let (last, init) = keys.split_last()?;
        let mut map = &self.root;
        for key in init {
            match map.get(key.as_ref())? {
                Node::Branch(m) => map = m,
                Node::Leaf(_) => return None,
            }
        }
        match map.get(last.as_ref())? {
            Node::Leaf(v) => Some(v),
            Node::Branch(_) => None,
        }
    }

    /// Get a mutable reference to the value stored at a full key tuple
    pub fn get_mut<K: AsRef<str>>(&mut self, keys: &[K]) -> Option<&mut V> {
        if keys.len() != self.depth {
            return None;
        }
        let (last, init) = keys.split_last()?;
        let mut map = &mut self.root;
        for key in init {
            match map.get_mut(key.as_ref())? {
                Node::Branch(m) => map = m,
                Node::Leaf(_) => return None,
            }
        }
        match map.get_mut(last.as_ref())? {
            Node::Leaf(v) => Some(v),
            Node::Branch(_) => None,
        }
    }

    /// Remove a value, pruning branches left empty
    pub fn remove<K: AsRef<str>>(&mut self, keys: &[K]) -> Option<V> {
        if keys.len() != self.depth {
            return None;
        }
        let removed = remove_rec(&mut self.root, keys);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// All `(keys, value)` pairs in key order
    pub fn iter(&self) -> Vec<(Vec<String>, &V)> {
        let mut out = Vec::with_capacity(self.len);
        collect(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// All `(keys, value)` pairs whose keys start with `prefix`
    pub fn iter_prefix<K: AsRef<str>>(&self, prefix: &[K]) -> Vec<(Vec<String>, &V)> {
        let mut out = Vec::new();
        if prefix.len() > self.depth {
            return out;
        }
        let mut path: Vec<String> = Vec::with_capacity(self.depth);
        let mut map = &self.root;
        for (i, key) in prefix.iter().enumerate() {
            path.push(key.as_ref().to_string());
            match map.get(key.as_ref()) {
                None => return out,
                Some(Node::Leaf(v)) => {
                    if i + 1 == self.depth {
                        out.push((path, v));
                    }
                    return out;
                }
                Some(Node::Branch(m)) => map = m,
            }
        }
        collect(map, &mut path, &mut out);
        out
    }

    /// Mutable references to every value, in key order
    pub fn values_mut(&mut self) -> Vec<&mut V> {
        let mut out = Vec::with_capacity(self.len);
        collect_mut(&mut self.root, &mut out);
        out
    }

    /// Distinct values of the first key component
    pub fn first_keys(&self) -> impl Iterator<Item = &String> {
        self.root.keys()
    }
}

fn remove_rec<V, K: AsRef<str>>(map: &mut BTreeMap<String, Node<V>>, keys: &[K]) -> Option<V> {
    let (first, rest) = keys.split_first()?;
    if rest.is_empty() {
        return match map.remove(first.as_ref())? {
            Node::Leaf(v) => Some(v),
            branch => {
                map.insert(first.as_ref().to_string(), branch);
                None
            }
        };
    }
    let child = match map.get_mut(first.as_ref())? {
        Node::Branch(m) => m,
        Node::Leaf(_) => return None,
    };
    let removed = remove_rec(child, rest);
    if child.is_empty() {
        map.remove(first.as_ref());
    }
    removed
}

fn collect<'a, V>(
    map: &'a BTreeMap<String, Node<V>>,
    path: &mut Vec<String>,
    out: &mut Vec<(Vec<String>, &'a V)>,
) {
    for (key, node) in map {
        path.push(key.clone());
        match node {
            Node::Leaf(v) => out.push((path.clone(), v)),
            Node::Branch(m) => collect(m, path, out),
        }
        path.pop();
    }
}

fn collect_mut<'a, V>(map: &'a mut BTreeMap<String, Node<V>>, out: &mut Vec<&'a mut V>) {
    for node in map.values_mut() {
        match node {
            Node::Leaf(v) => out.push(v),
            Node::Branch(m) => collect_mut(m, out),
        }
    }
}

/// A sparse table of values indexed by named string keys
#[derive(Debug, Clone)]
pub struct MultiKeyTable<V> {
    keynames: Vec<String>,
    valuenames: Vec<String>,
    main: NestedDict<V>,
    /// Key orders other than the declared one, each a permutation of key indices
    caches: BTreeMap<Vec<usize>, NestedDict<()>>,
}

impl<V> MultiKeyTable<V> {
    /// Create an empty table
    ///
    /// # Panics
    /// Panics if `keynames` is empty or contains duplicates
    pub fn new(keynames: &[&str]) -> Self {
        assert!(!keynames.is_empty(), "A table needs at least one key name");
        let distinct: BTreeSet<&str> = keynames.iter().copied().collect();
        assert_eq!(distinct.len(), keynames.len(), "Duplicate key names: {:?}", keynames);
        Self {
            keynames: keynames.iter().map(|k| k.to_string()).collect(),
            valuenames: Vec::new(),
            main: NestedDict::new(keynames.len()),
            caches: BTreeMap::new(),
        }
    }

    /// Override the column names used for values when serializing
    pub fn with_valuenames(mut self, valuenames: &[&str]) -> Self {
        self.valuenames = valuenames.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Build a table from `(keys, value)` records
    pub fn from_records<K, I>(keynames: &[&str], records: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (Vec<K>, V)>,
    {
        let mut table = Self::new(keynames);
        for (keys, value) in records {
            table.insert(&keys, value);
        }
        table
    }

    /// Declared key names
    pub fn keynames(&self) -> &[String] {
        &self.keynames
    }

    /// Position of a key name in the declared order
    pub fn index_of(&self, keyname: &str) -> Option<usize> {
        self.keynames.iter().position(|k| k == keyname)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.main.len()
    }

    /// Whether the table holds no value
    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    /// Insert a value at a full key tuple (declared order), returning the previous one
    pub fn insert<K: AsRef<str>>(&mut self, keys: &[K], value: V) -> Option<V> {
        let previous = self.main.insert(keys, value);
        if previous.is_none() {
            for (order, cache) in self.caches.iter_mut() {
                cache.insert(&permute(keys, order), ());
            }
        }
        previous
    }

    /// Get the value at a full key tuple (declared order)
    pub fn get<K: AsRef<str>>(&self, keys: &[K]) -> Option<&V> {
        self.main.get(keys)
    }

    /// Get a mutable reference to the value at a full key tuple
    pub fn get_mut<K: AsRef<str>>(&mut self, keys: &[K]) -> Option<&mut V> {
        self.main.get_mut(keys)
    }

    /// Remove the value at a full key tuple
    pub fn remove<K: AsRef<str>>(&mut self, keys: &[K]) -> Option<V> {
        let removed = self.main.remove(keys);
        if removed.is_some() {
            for (order, cache) in self.caches.iter_mut() {
                cache.remove(&permute(keys, order));
            }
        }
        removed
    }

    /// Index the table by `keynames` first, followed by the remaining keys
    pub fn cache(&mut self, keynames: &[&str]) -> Result<(), String> {
        let mut order = Vec::with_capacity(self.keynames.len());
        for name in keynames {
            let index = self
                .index_of(name)
                .ok_or_else(|| format!("Unknown key name: {}", name))?;
            if !order.contains(&index) {
                order.push(index);
            }
        }
        for index in 0..self.keynames.len() {
            if !order.contains(&index) {
                order.push(index);
            }
        }
        if is_identity(&order) || self.caches.contains_key(&order) {
            return Ok(());
        }
        let mut cache = NestedDict::new(self.keynames.len());
        for (keys, _) in self.main.iter() {
            cache.insert(&permute(&keys, &order), ());
        }
        self.caches.insert(order, cache);
        Ok(())
    }

    /// Number of cached key orders
    pub fn cached_orders(&self) -> usize {
        self.caches.len()
    }

    /// All `(keys, value)` pairs in declared key order
    pub fn iter(&self) -> Vec<(Vec<String>, &V)> {
        self.main.iter()
    }

    /// Mutable references to every value
    pub fn values_mut(&mut self) -> Vec<&mut V> {
        self.main.values_mut()
    }

    /// Read-only child view with some keys fixed
    ///
    /// # Panics
    /// Panics if a bound key name is unknown
    pub fn filter(&self, bound: &[(&str, &str)]) -> View<'_, V> {
        View {
            bound: self.resolve(bound),
            table: self,
        }
    }

    /// Writable child view with some keys fixed
    ///
    /// # Panics
    /// Panics if a bound key name is unknown
    pub fn filter_mut(&mut self, bound: &[(&str, &str)]) -> ViewMut<'_, V> {
        ViewMut {
            bound: self.resolve(bound),
            table: self,
        }
    }

    /// Group rows by the values of `keynames`
    pub fn iter_by(&self, keynames: &[&str]) -> Vec<(Vec<String>, View<'_, V>)> {
        let indices: Vec<usize> = keynames
            .iter()
            .map(|name| self.index_or_panic(name))
            .collect();
        let groups: BTreeSet<Vec<String>> = self
            .main
            .iter()
            .into_iter()
            .map(|(keys, _)| indices.iter().map(|&i| keys[i].clone()).collect())
            .collect();
        groups
            .into_iter()
            .map(|values| {
                let bound = indices.iter().copied().zip(values.iter().cloned()).collect();
                (values, View { table: self, bound })
            })
            .collect()
    }

    /// Distinct values taken by one key
    pub fn keys(&self, keyname: &str) -> BTreeSet<String> {
        let index = self.index_or_panic(keyname);
        if index == 0 {
            return self.main.first_keys().cloned().collect();
        }
        if let Some((_, cache)) = self.caches.iter().find(|(order, _)| order[0] == index) {
            return cache.first_keys().cloned().collect();
        }
        self.main
            .iter()
            .into_iter()
            .map(|(keys, _)| keys[index].clone())
            .collect()
    }

    /// Copy of this table with keys declared in another order
    pub fn reorder(&self, keynames: &[&str]) -> Result<Self, String>
    where
        V: Clone,
    {
        if keynames.len() != self.keynames.len() {
            return Err(format!(
                "Expected {} key names, got {}",
                self.keynames.len(),
                keynames.len()
            ));
        }
        let mut order = Vec::with_capacity(keynames.len());
        for name in keynames {
            order.push(
                self.index_of(name)
                    .ok_or_else(|| format!("Unknown key name: {}", name))?,
            );
        }
        let mut table = Self::new(keynames);
        table.valuenames = self.valuenames.clone();
        for (keys, value) in self.main.iter() {
            table.insert(&permute(&keys, &order), value.clone());
        }
        Ok(table)
    }

    fn index_or_panic(&self, keyname: &str) -> usize {
        match self.index_of(keyname) {
            Some(index) => index,
            None => panic!("Unknown key name {} in {:?}", keyname, self.keynames),
        }
    }

    fn resolve(&self, bound: &[(&str, &str)]) -> Vec<(usize, String)> {
        let mut resolved: Vec<(usize, String)> = bound
            .iter()
            .map(|(name, value)| (self.index_or_panic(name), value.to_string()))
            .collect();
        resolved.sort();
        resolved.dedup_by_key(|(index, _)| *index);
        resolved
    }

    /// Rows matching bound keys, using the main store or a cache when one fits
    fn matching(&self, bound: &[(usize, String)]) -> Vec<(Vec<String>, &V)> {
        if bound.is_empty() {
            return self.main.iter();
        }
        let indices: BTreeSet<usize> = bound.iter().map(|(i, _)| *i).collect();
        let value_of = |index: usize| {
            bound
                .iter()
                .find(|(i, _)| *i == index)
                .map(|(_, v)| v.as_str())
                .unwrap_or_default()
        };

        if indices.iter().copied().eq(0..indices.len()) {
            let prefix: Vec<&str> = (0..indices.len()).map(value_of).collect();
            return self.main.iter_prefix(&prefix);
        }

        let fitting = self.caches.iter().find(|(order, _)| {
            order[..indices.len()].iter().copied().collect::<BTreeSet<_>>() == indices
        });
        if let Some((order, cache)) = fitting {
            let prefix: Vec<&str> = order[..indices.len()].iter().map(|&i| value_of(i)).collect();
            let mut rows: Vec<(Vec<String>, &V)> = cache
                .iter_prefix(&prefix)
                .into_iter()
                .filter_map(|(permuted, _)| {
                    let keys = unpermute(&permuted, order);
                    self.main.get(&keys).map(|v| (keys, v))
                })
                .collect();
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            return rows;
        }

        self.main
            .iter()
            .into_iter()
            .filter(|(keys, _)| bound.iter().all(|(i, v)| &keys[*i] == v))
            .collect()
    }

    /// Full key tuple from bound keys plus free keys in declared order
    fn compose<K: AsRef<str>>(&self, bound: &[(usize, String)], free: &[K]) -> Vec<String> {
        assert_eq!(
            free.len() + bound.len(),
            self.keynames.len(),
            "Expected {} free keys",
            self.keynames.len() - bound.len()
        );
        let mut free = free.iter();
        (0..self.keynames.len())
            .map(|index| match bound.iter().find(|(i, _)| *i == index) {
                Some((_, value)) => value.clone(),
                None => free
                    .next()
                    .map(|k| k.as_ref().to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

impl<V: PartialEq> PartialEq for MultiKeyTable<V> {
    fn eq(&self, other: &Self) -> bool {
        self.keynames == other.keynames && self.main == other.main
    }
}

impl<V: TableValue> MultiKeyTable<V> {
    /// Column names: key names followed by value names
    pub fn header(&self) -> Vec<String> {
        let mut header = self.keynames.clone();
        if self.valuenames.is_empty() {
            header.extend(V::value_names().into_iter().map(String::from));
        } else {
            header.extend(self.valuenames.iter().cloned());
        }
        header
    }

    /// Flat rows: key fields followed by value fields
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.main
            .iter()
            .into_iter()
            .map(|(mut keys, value)| {
                keys.extend(value.to_fields());
                keys
            })
            .collect()
    }
}

fn is_identity(order: &[usize]) -> bool {
    order.iter().enumerate().all(|(i, &o)| i == o)
}

fn permute<K: AsRef<str>>(keys: &[K], order: &[usize]) -> Vec<String> {
    order.iter().map(|&i| keys[i].as_ref().to_string()).collect()
}

fn unpermute(permuted: &[String], order: &[usize]) -> Vec<String> {
    let mut keys = vec![String::new(); permuted.len()];
    for (position, &index) in order.iter().enumerate() {
        keys[index] = permuted[position].clone();
    }
    keys
}

/// Read-only child of a [`MultiKeyTable`] with some keys fixed
#[derive(Debug)]
pub struct View<'a, V> {
    table: &'a MultiKeyTable<V>,
    bound: Vec<(usize, String)>,
}

impl<'a, V> View<'a, V> {
    /// Fixed keys as `(keyname, value)` pairs
    pub fn bound(&self) -> Vec<(&str, &str)> {
        self.bound
            .iter()
            .map(|(i, v)| (self.table.keynames[*i].as_str(), v.as_str()))
            .collect()
    }

    /// Names of the keys left free, in declared order
    pub fn free_keynames(&self) -> Vec<&str> {
        free_keynames(self.table, &self.bound)
    }

    /// Matching rows with their full key tuples
    pub fn iter(&self) -> Vec<(Vec<String>, &'a V)> {
        self.table.matching(&self.bound)
    }

    /// Matching rows keyed by their free keys only
    pub fn iter_free(&self) -> Vec<(Vec<String>, &'a V)> {
        let bound: BTreeSet<usize> = self.bound.iter().map(|(i, _)| *i).collect();
        self.iter()
            .into_iter()
            .map(|(keys, v)| {
                let free = keys
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| !bound.contains(i))
                    .map(|(_, k)| k)
                    .collect();
                (free, v)
            })
            .collect()
    }

    /// Value at the given free keys
    pub fn get<K: AsRef<str>>(&self, free: &[K]) -> Option<&'a V> {
        let keys = self.table.compose(&self.bound, free);
        self.table.get(&keys)
    }

    /// Number of matching rows
    pub fn len(&self) -> usize {
        self.iter().len()
    }

    /// Whether no row matches
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct values of one key among matching rows
    pub fn keys(&self, keyname: &str) -> BTreeSet<String> {
        let index = self.table.index_or_panic(keyname);
        self.iter()
            .into_iter()
            .map(|(keys, _)| keys[index].clone())
            .collect()
    }
}

/// Writable child of a [`MultiKeyTable`] with some keys fixed
///
/// Every write lands in the parent table, including its caches.
#[derive(Debug)]
pub struct ViewMut<'a, V> {
    table: &'a mut MultiKeyTable<V>,
    bound: Vec<(usize, String)>,
}

impl<'a, V> ViewMut<'a, V> {
    /// Fixed keys as `(keyname, value)` pairs
    pub fn bound(&self) -> Vec<(&str, &str)> {
        self.bound
            .iter()
            .map(|(i, v)| (self.table.keynames[*i].as_str(), v.as_str()))
            .collect()
    }

    /// Names of the keys left free, in declared order
    pub fn free_keynames(&self) -> Vec<&str> {
        free_keynames(self.table, &self.bound)
    }

    /// Insert at the given free keys
    pub fn insert<K: AsRef<str>>(&mut self, free: &[K], value: V) -> Option<V> {
        let keys = self.table.compose(&self.bound, free);
        self.table.insert(&keys, value)
    }

    /// Value at the given free keys
    pub fn get<K: AsRef<str>>(&self, free: &[K]) -> Option<&V> {
        let keys = self.table.compose(&self.bound, free);
        self.table.get(&keys)
    }

    /// Mutable value at the given free keys
    pub fn get_mut<K: AsRef<str>>(&mut self, free: &[K]) -> Option<&mut V> {
        let keys = self.table.compose(&self.bound, free);
        self.table.get_mut(&keys)
    }

    /// Remove the value at the given free keys
    pub fn remove<K: AsRef<str>>(&mut self, free: &[K]) -> Option<V> {
        let keys = self.table.compose(&self.bound, free);
        self.table.remove(&keys)
    }

    /// Matching rows with their full key tuples
    pub fn iter(&self) -> Vec<(Vec<String>, &V)> {
        self.table.matching(&self.bound)
    }

    /// Number of matching rows
    pub fn len(&self) -> usize {
        self.iter().len()
    }

    /// Whether no row matches
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn free_keynames<'t, V>(table: &'t MultiKeyTable<V>, bound: &[(usize, String)]) -> Vec<&'t str> {
    table
        .keynames
        .iter()
        .enumerate()
        .filter(|(i, _)| !bound.iter().any(|(b, _)| b == i))
        .map(|(_, k)| k.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MultiKeyTable<f64> {
        let mut table = MultiKeyTable::new(&["username", "entity_name", "criterion"]);
        table.insert(&["alice", "a", "importance"], 1.0);
        table.insert(&["alice", "b", "importance"], 2.0);
        table.insert(&["bob", "a", "importance"], 3.0);
        table.insert(&["bob", "a", "reliability"], 4.0);
        table
    }

    #[test]
    fn test_nested_dict_insert_get_remove() {
        let mut dict = NestedDict::new(2);
        assert!(dict.insert(&["x", "y"], 1).is_none());
        assert_eq!(dict.insert(&["x", "y"], 2), Some(1));
        dict.insert(&["x", "z"], 3);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(&["x", "y"]), Some(&2));
        assert_eq!(dict.get(&["x"]), None);

        assert_eq!(dict.remove(&["x", "y"]), Some(2));
        assert_eq!(dict.remove(&["x", "z"]), Some(3));
        assert!(dict.is_empty());
        assert_eq!(dict.first_keys().count(), 0);
    }

    #[test]
    fn test_nested_dict_prefix_iteration() {
        let mut dict = NestedDict::new(2);
        dict.insert(&["b", "2"], 'd');
        dict.insert(&["a", "1"], 'a');
        dict.insert(&["a", "2"], 'b');
        let under_a: Vec<_> = dict.iter_prefix(&["a"]).into_iter().map(|(_, v)| *v).collect();
        assert_eq!(under_a, vec!['a', 'b']);
        assert_eq!(dict.iter_prefix(&["a", "2"]).len(), 1);
        assert!(dict.iter_prefix(&["c"]).is_empty());
    }

    #[test]
    fn test_filter_without_cache() {
        let table = sample();
        let importance = table.filter(&[("criterion", "importance")]);
        assert_eq!(importance.len(), 3);
        assert_eq!(importance.keys("username").len(), 2);
        assert_eq!(importance.free_keynames(), vec!["username", "entity_name"]);
        assert_eq!(importance.get(&["bob", "a"]), Some(&3.0));
    }

    #[test]
    fn test_filter_with_cache_matches_scan() {
        let mut table = sample();
        let scanned: Vec<_> = table
            .filter(&[("entity_name", "a")])
            .iter()
            .into_iter()
            .map(|(k, v)| (k, *v))
            .collect();
        table.cache(&["entity_name"]).unwrap();
        assert_eq!(table.cached_orders(), 1);
        let cached: Vec<_> = table
            .filter(&[("entity_name", "a")])
            .iter()
            .into_iter()
            .map(|(k, v)| (k, *v))
            .collect();
        assert_eq!(scanned.len(), 3);
        assert_eq!(scanned, cached);
    }

    #[test]
    fn test_cache_tracks_later_writes() {
        let mut table = sample();
        table.cache(&["criterion", "entity_name"]).unwrap();
        table.insert(&["carol", "c", "reliability"], 5.0);
        table.remove(&["bob", "a", "reliability"]);
        let view = table.filter(&[("entity_name", "c"), ("criterion", "reliability")]);
        assert_eq!(view.len(), 1);
        assert!(table
            .filter(&[("criterion", "reliability"), ("entity_name", "a")])
            .is_empty());
        assert_eq!(table.keys("criterion").len(), 2);
    }

    #[test]
    fn test_child_writes_propagate_to_parent() {
        let mut table = sample();
        {
            let mut child = table.filter_mut(&[("username", "carol")]);
            assert_eq!(child.bound(), vec![("username", "carol")]);
            child.insert(&["z", "importance"], 9.0);
            if let Some(v) = child.get_mut(&["z", "importance"]) {
                *v += 1.0;
            }
        }
        assert_eq!(table.get(&["carol", "z", "importance"]), Some(&10.0));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_iter_by_groups() {
        let table = sample();
        let groups = table.iter_by(&["criterion"]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, vec!["importance".to_string()]);
        assert_eq!(groups[0].1.len(), 3);
        assert_eq!(groups[1].1.len(), 1);
    }

    #[test]
    fn test_reorder_and_rows() {
        let table = sample().with_valuenames(&["voting_right"]);
        let reordered = table.reorder(&["criterion", "username", "entity_name"]).unwrap();
        assert_eq!(reordered.get(&["reliability", "bob", "a"]), Some(&4.0));
        assert_eq!(
            table.header(),
            vec!["username", "entity_name", "criterion", "voting_right"]
        );
        let rows = table.to_rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["alice", "a", "importance", "1"]);
        assert!(table.reorder(&["criterion"]).is_err());
    }

    #[test]
    fn test_unknown_cache_key() {
        let mut table = sample();
        assert!(table.cache(&["nope"]).is_err());
    }

    #[test]
    fn test_float_fields() {
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
        assert!(parse_float("nan").unwrap().is_nan());
        assert_eq!(parse_float(" 2.5 ").unwrap(), 2.5);
        assert_eq!(parse_float("inf").unwrap(), f64::INFINITY);
        assert!(parse_float("abc").is_err());
        assert!(parse_bool("True").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
