//! Ordered, duplicate-free union of input headers.

use std::collections::HashMap;

/// Union of every input's header names, in first-seen order: files in command
/// order, columns in header order within a file. Each name appears exactly
/// once, at the position of its first occurrence.
#[derive(Debug, Default, Clone)]
pub struct SchemaUnion {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl SchemaUnion {
    pub fn unify<S, I>(schemas: I) -> Self
    where
        S: AsRef<[String]>,
        I: IntoIterator<Item = S>,
    {
        let mut union = SchemaUnion::default();
        for schema in schemas {
            for name in schema.as_ref() {
                union.insert(name);
            }
        }
        union
    }

    fn insert(&mut self, name: &str) {
        if !self.positions.contains_key(name) {
            self.positions.insert(name.to_string(), self.columns.len());
            self.columns.push(name.to_string());
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
