use crate::columns::Column;
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// A caller-declared target slot; `name` is its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub is_optional: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            is_optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    fn match_key(&self) -> String {
        self.label.trim().to_lowercase()
    }
}

/// Ordered, name-deduplicated list of declared fields.
///
/// Redeclaring a name updates it in place; order is that of first declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: Vec<Field>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_field(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Field> {
        let pos = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(pos))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<Field> for FieldRegistry {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut registry = Self::new();
        for field in iter {
            registry.declare_field(field);
        }
        registry
    }
}

/// Field name -> source column index.
///
/// A column backs at most one field. Every operation returns a new map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAssignmentMap {
    entries: BTreeMap<String, usize>,
}

impl FieldAssignmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_name: &str) -> Option<usize> {
        self.entries.get(field_name).copied()
    }

    /// The field currently backed by `column_index`, if any.
    pub fn field_for_column(&self, column_index: usize) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, &idx)| idx == column_index)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, usize> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Point `field_name` at `column_index`, releasing whichever field held it.
    #[must_use]
    pub fn assign(&self, column_index: usize, field_name: &str) -> Self {
        let mut next = self.clone();
        next.entries.retain(|_, idx| *idx != column_index);
        next.entries.insert(field_name.to_string(), column_index);
        next
    }

    #[must_use]
    pub fn unassign(&self, column_index: usize) -> Self {
        let mut next = self.clone();
        next.entries.retain(|_, idx| *idx != column_index);
        next
    }

    /// Fill unassigned fields whose label matches a column header
    /// (trimmed, case-insensitive). Existing assignments are never touched and
    /// a column already backing another field is skipped.
    #[must_use]
    pub fn auto_match(&self, fields: &[Field], columns: &[Column]) -> Self {
        let mut next = self.clone();
        for field in fields {
            if next.entries.contains_key(&field.name) {
                continue;
            }
            let key = field.match_key();
            let matched = columns.iter().find(|col| {
                col.header
                    .as_deref()
                    .is_some_and(|h| h.trim().to_lowercase() == key)
            });
            if let Some(col) = matched {
                if next.field_for_column(col.index).is_none() {
                    next.entries.insert(field.name.clone(), col.index);
                }
            }
        }
        next
    }

    /// Drop entries for fields no longer declared.
    #[must_use]
    pub fn prune_removed_fields(&self, fields: &[Field]) -> Self {
        let names: BTreeSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        let mut next = self.clone();
        next.entries.retain(|name, _| names.contains(name.as_str()));
        next
    }

    pub fn has_unassigned_required(&self, fields: &[Field]) -> bool {
        fields
            .iter()
            .any(|f| !f.is_optional && !self.entries.contains_key(&f.name))
    }

    pub fn unassigned_required<'a>(&self, fields: &'a [Field]) -> Vec<&'a Field> {
        fields
            .iter()
            .filter(|f| !f.is_optional && !self.entries.contains_key(&f.name))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for FieldAssignmentMap {
    /// Later pairs win a contested column, as with repeated [`assign`](Self::assign).
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, idx) in iter {
            map.entries.retain(|_, held| *held != idx);
            map.entries.insert(name.into(), idx);
        }
        map
    }
}

/// Assignment map plus the bookkeeping that decides when a missing required
/// field is shown as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentState {
    pub assignments: FieldAssignmentMap,
    touched: BTreeSet<String>,
    validation_forced: bool,
}

impl AssignmentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A completed assignment gesture; marks the field touched.
    #[must_use]
    pub fn assign(&self, column_index: usize, field_name: &str) -> Self {
        let mut next = self.clone();
        next.assignments = self.assignments.assign(column_index, field_name);
        next.touched.insert(field_name.to_string());
        next
    }

    #[must_use]
    pub fn unassign(&self, column_index: usize) -> Self {
        let mut next = self.clone();
        next.assignments = self.assignments.unassign(column_index);
        next
    }

    /// Re-run after the field list or the column list changes.
    #[must_use]
    pub fn sync(&self, fields: &[Field], columns: &[Column]) -> Self {
        let mut next = self.clone();
        next.assignments = self
            .assignments
            .prune_removed_fields(fields)
            .auto_match(fields, columns);
        next.touched
            .retain(|name| fields.iter().any(|f| &f.name == name));
        next
    }

    #[must_use]
    pub fn force_validation(&self) -> Self {
        let mut next = self.clone();
        next.validation_forced = true;
        next
    }

    pub fn is_touched(&self, field_name: &str) -> bool {
        self.validation_forced || self.touched.contains(field_name)
    }

    /// Whether `field` should currently be flagged as missing.
    pub fn shows_missing(&self, field: &Field) -> bool {
        !field.is_optional
            && self.assignments.get(&field.name).is_none()
            && self.is_touched(&field.name)
    }
}
