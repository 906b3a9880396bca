use std::collections::HashMap;
use std::str::FromStr;

use super::error::{CoreError, Result};

/// Anything that carries its own identity-bearing name.
pub trait Named {
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Missing – policy for absent names in drop / select
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Missing {
    /// Fail with a not-found error.
    #[default]
    Raise,
    /// Skip absent names silently.
    Ignore,
}

impl FromStr for Missing {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raise" => Ok(Missing::Raise),
            "ignore" => Ok(Missing::Ignore),
            other => Err(CoreError::InvalidArgument(format!(
                "missing must be one of: raise, ignore (got '{other}')"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// IntoNames – one name or many
// ---------------------------------------------------------------------------

/// Accepts either a single name or a collection of names.
pub trait IntoNames {
    fn into_names(self) -> Vec<String>;
}

impl IntoNames for &str {
    fn into_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoNames for String {
    fn into_names(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoNames for &String {
    fn into_names(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<S: AsRef<str>> IntoNames for Vec<S> {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>> IntoNames for &[S] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> IntoNames for [S; N] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

// ---------------------------------------------------------------------------
// NamedMap – insertion-ordered map whose keys equal the children's names
// ---------------------------------------------------------------------------

/// What the containers tell [`NamedMap`] about themselves for error messages.
#[derive(Clone, Copy)]
pub(crate) struct Kind {
    /// Container type, e.g. `"Segment"`.
    pub container: &'static str,
    /// Child type, e.g. `"Channel"`.
    pub child: &'static str,
    pub invalid: fn(String) -> CoreError,
    pub not_found: fn(String) -> CoreError,
}

/// Insertion-ordered mapping from name to child.
///
/// Every key equals its child's [`Named::name`]; this holds for every
/// value the map can be in, since all constructors check it.
#[derive(Debug, Clone)]
pub(crate) struct NamedMap<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for NamedMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

pub(crate) fn check_name(name: &str, what: &str, invalid: fn(String) -> CoreError) -> Result<()> {
    if name.trim().is_empty() {
        return Err(invalid(format!("{what} must be a non-empty string")));
    }
    Ok(())
}

impl<T: Named + Clone> NamedMap<T> {
    /// Build from `(key, child)` pairs. A repeated key replaces the earlier
    /// child in place.
    pub fn from_pairs<K, I>(pairs: I, kind: Kind) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, T)>,
    {
        let mut map = Self::default();
        for (key, child) in pairs {
            let key = key.as_ref();
            if key.trim().is_empty() {
                return Err((kind.invalid)(format!(
                    "{}.{}s keys must be non-empty strings",
                    kind.container,
                    kind.child.to_ascii_lowercase()
                )));
            }
            if child.name() != key {
                return Err((kind.invalid)(format!(
                    "{} name mismatch: key '{key}' but {}.name is '{}'",
                    kind.child,
                    kind.child,
                    child.name()
                )));
            }
            map.upsert(child);
        }
        Ok(map)
    }

    pub fn from_children<I>(children: I, kind: Kind) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let mut map = Self::default();
        for child in children {
            check_name(child.name(), &format!("{}.name", kind.child), kind.invalid)?;
            map.upsert(child);
        }
        Ok(map)
    }

    pub(crate) fn upsert(&mut self, child: T) {
        match self.index.get(child.name()) {
            Some(&pos) => self.entries[pos] = child,
            None => {
                self.index.insert(child.name().to_string(), self.entries.len());
                self.entries.push(child);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&pos| &self.entries[pos])
    }

    pub fn lookup(&self, name: &str, kind: Kind) -> Result<&T> {
        self.get(name).ok_or_else(|| (kind.not_found)(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Copy with `child` inserted; an existing name is only replaced with
    /// `overwrite`.
    pub fn with(&self, child: T, overwrite: bool, kind: Kind) -> Result<Self> {
        if self.contains(child.name()) && !overwrite {
            return Err((kind.invalid)(format!(
                "{} '{}' already exists (overwrite=false)",
                kind.child,
                child.name()
            )));
        }
        let mut map = self.clone();
        map.upsert(child);
        Ok(map)
    }

    /// Copy without the given names.
    pub fn without(&self, names: &[String], missing: Missing, kind: Kind) -> Result<Self> {
        if missing == Missing::Raise {
            if let Some(absent) = names.iter().find(|n| !self.contains(n)) {
                return Err((kind.not_found)(absent.clone()));
            }
        }
        let kept = self
            .entries
            .iter()
            .filter(|child| !names.iter().any(|n| n == child.name()))
            .cloned();
        Ok(Self::from_valid(kept))
    }

    /// Copy holding only the given names, in the order of `names`.
    pub fn only(&self, names: &[String], missing: Missing, kind: Kind) -> Result<Self> {
        let mut map = Self::default();
        for name in names {
            match self.get(name) {
                Some(child) => map.upsert(child.clone()),
                None if missing == Missing::Raise => return Err((kind.not_found)(name.clone())),
                None => {}
            }
        }
        Ok(map)
    }

    /// Copy built from children already known to satisfy the invariant.
    pub fn from_valid<I>(children: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut map = Self::default();
        for child in children {
            map.upsert(child);
        }
        map
    }

    /// Copy with `old` re-keyed to `new` at the same position.
    pub fn rekey<F>(&self, old: &str, new: &str, kind: Kind, rename: F) -> Result<Self>
    where
        F: FnOnce(&T) -> Result<T>,
    {
        let child = self.lookup(old, kind)?;
        check_name(new, &format!("new {} name", kind.child.to_ascii_lowercase()), kind.invalid)?;
        if self.contains(new) {
            return Err((kind.invalid)(format!("{} '{new}' already exists", kind.child)));
        }
        let renamed = rename(child)?;
        Ok(Self::from_valid(self.entries.iter().map(|c| {
            if c.name() == old {
                renamed.clone()
            } else {
                c.clone()
            }
        })))
    }
}
