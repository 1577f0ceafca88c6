use std::collections::HashSet;
use std::ffi::c_int;

use fastlite_core::Result;

use super::Value;
use crate::native::{ConnectionHandle, StatementHandle};
use crate::query::QueryBinder;
use crate::status;

/// Prefixes the engine accepts for named parameters.
const PREFIXES: [char; 3] = ['@', ':', '$'];

/// A named parameter value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

/// Named values bound into every statement of a command.
///
/// A name may carry its prefix (`@id`) or not (`id`); an unprefixed name
/// matches `@id`, `:id` and `$id` slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    items: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, replacing any existing value with the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.items.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.items.push(Parameter { name, value }),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.items.iter().position(|p| p.name == name)?;
        Some(self.items.remove(index).value)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.items.iter()
    }

    /// Bind every parameter the statement has a slot for. Returns how many
    /// distinct slots were written; when two names reach the same slot
    /// (`@a` and `a`) the later one wins and the slot counts once.
    pub(crate) fn bind(
        &self,
        statement: &StatementHandle,
        connection: &ConnectionHandle,
    ) -> Result<usize> {
        let binder = QueryBinder::new(statement);
        let mut bound = HashSet::new();
        for parameter in &self.items {
            if let Some(index) = slot_for(statement, &parameter.name) {
                status::check(parameter.value.bind(&binder, index), Some(connection))?;
                bound.insert(index);
            }
        }
        Ok(bound.len())
    }

    /// Names of the statement's slots no parameter covers, comma separated.
    pub(crate) fn unbound(&self, statement: &StatementHandle) -> String {
        (1..=statement.parameter_count())
            .map(|index| statement.parameter_name(index).unwrap_or_else(|| format!("?{index}")))
            .filter(|slot| !self.items.iter().any(|p| matches_slot(slot, &p.name)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn slot_for(statement: &StatementHandle, name: &str) -> Option<c_int> {
    if name.starts_with(PREFIXES) || name.starts_with('?') {
        return statement.parameter_index(name);
    }
    PREFIXES
        .iter()
        .find_map(|prefix| statement.parameter_index(&format!("{prefix}{name}")))
}

fn matches_slot(slot: &str, name: &str) -> bool {
    slot == name || (slot.starts_with(PREFIXES) && &slot[1..] == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_by_name() {
        let mut params = Parameters::new();
        params.add("@a", 1).add("@b", "x").add("@a", 2);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("@a"), Some(&Value::Integer(2)));
        assert_eq!(params.remove("@b"), Some(Value::Text("x".into())));
        assert_eq!(params.remove("@b"), None);
    }

    #[test]
    fn test_matches_slot() {
        assert!(matches_slot("@id", "@id"));
        assert!(matches_slot("@id", "id"));
        assert!(matches_slot(":id", "id"));
        assert!(!matches_slot("@id", ":id"));
        assert!(!matches_slot("?1", "1"));
    }
}
