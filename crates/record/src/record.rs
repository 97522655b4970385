use std::fmt;
use std::ops::Index;

use serde_json::{Map, Value};

use crate::error::{RecordError, Result};
use crate::schema::RecordType;

/// One instance of a [`RecordType`]: a value per declared field.
#[derive(Debug, Clone)]
pub struct Record {
    record_type: RecordType,
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn from_parts(record_type: RecordType, values: Vec<Value>) -> Self {
        Self {
            record_type,
            values,
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn fields(&self) -> &[String] {
        self.record_type.fields()
    }

    /// Field values in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        let index = self.record_type.position(field).ok()?;
        self.values.get(index)
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Field name to value, as a JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        self.fields()
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    /// Overwrite one field of a mutable record.
    pub fn set(&mut self, field: &str, value: Value) -> Result<()> {
        let index = self.record_type.position(field)?;
        if !self.record_type.is_mutable() {
            return Err(RecordError::Immutable {
                type_name: self.record_type.name().to_string(),
                field: field.to_string(),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    /// A copy of an immutable record with `(field, value)` changes applied.
    ///
    /// Mutable records are changed in place instead, see
    /// [`replace_in_place`](Record::replace_in_place).
    pub fn replace<I, S>(&self, changes: I) -> Result<Record>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        if self.record_type.is_mutable() {
            return Err(self.replace_mode("mutable", "replace_in_place"));
        }
        let mut values = self.values.clone();
        for (index, value) in self.positions(changes)? {
            values[index] = value;
        }
        Ok(Record::from_parts(self.record_type.clone(), values))
    }

    /// Apply `(field, value)` changes to a mutable record.
    ///
    /// Every field name is checked before anything changes.
    pub fn replace_in_place<I, S>(&mut self, changes: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        if !self.record_type.is_mutable() {
            return Err(self.replace_mode("immutable", "replace"));
        }
        for (index, value) in self.positions(changes)? {
            self.values[index] = value;
        }
        Ok(())
    }

    fn positions<I, S>(&self, changes: I) -> Result<Vec<(usize, Value)>>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        changes
            .into_iter()
            .map(|(field, value)| Ok((self.record_type.position(field.as_ref())?, value)))
            .collect()
    }

    fn replace_mode(&self, mode: &'static str, method: &'static str) -> RecordError {
        RecordError::ReplaceMode {
            type_name: self.record_type.name().to_string(),
            mode,
            method,
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.record_type == other.record_type && self.values == other.values
    }
}

impl Index<usize> for Record {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.record_type.name())?;
        for (i, (field, value)) in self.fields().iter().zip(&self.values).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coordinate(mutable: bool) -> RecordType {
        RecordType::builder("Coordinate")
            .fields("x y")
            .mutable(mutable)
            .build()
            .unwrap()
    }

    #[test]
    fn field_and_index_access() {
        let c = coordinate(false).make([json!(1), json!(2)]).unwrap();
        assert_eq!(c.get("y"), Some(&json!(2)));
        assert_eq!(c.get("z"), None);
        assert_eq!(c[0], json!(1));
        assert_eq!(c.get_index(2), None);
    }

    #[test]
    fn to_map_pairs_fields_with_values() {
        let c = coordinate(false).make([json!(1), json!("two")]).unwrap();
        assert_eq!(Value::Object(c.to_map()), json!({"x": 1, "y": "two"}));
    }

    #[test]
    fn immutable_records_reject_set() {
        let mut c = coordinate(false).make([json!(1), json!(2)]).unwrap();
        let err = c.set("x", json!(5)).unwrap_err();
        assert!(matches!(err, RecordError::Immutable { .. }));
        assert_eq!(c[0], json!(1));
    }

    #[test]
    fn mutable_records_accept_set() {
        let mut c = coordinate(true).make([json!(1), json!(2)]).unwrap();
        c.set("x", json!(5)).unwrap();
        assert_eq!(c[0], json!(5));
        assert!(matches!(c.set("z", json!(0)), Err(RecordError::UnknownField { .. })));
    }

    #[test]
    fn replace_on_immutable_returns_new_record() {
        let c = coordinate(false).make([json!(0), json!(0)]).unwrap();
        let shared = &c;
        let replaced = shared.replace([("x", json!(5))]).unwrap();
        assert_eq!(replaced.to_string(), "Coordinate(x=5, y=0)");
        assert_eq!(c.to_string(), "Coordinate(x=0, y=0)");
    }

    #[test]
    fn replace_in_place_on_mutable_updates_record() {
        let mut c = coordinate(true).make([json!(0), json!(0)]).unwrap();
        c.replace_in_place([("y", json!(9))]).unwrap();
        assert_eq!(c[1], json!(9));
    }

    #[test]
    fn replace_mode_follows_mutability() {
        let mut frozen = coordinate(false).make([json!(0), json!(0)]).unwrap();
        let err = frozen.replace_in_place([("x", json!(1))]).unwrap_err();
        assert!(matches!(err, RecordError::ReplaceMode { mode: "immutable", .. }));

        let open = coordinate(true).make([json!(0), json!(0)]).unwrap();
        let err = open.replace([("x", json!(1))]).unwrap_err();
        assert!(err.to_string().contains("replace_in_place"));
    }

    #[test]
    fn replace_checks_every_field_first() {
        let mut c = coordinate(true).make([json!(0), json!(0)]).unwrap();
        let err = c
            .replace_in_place([("x", json!(1)), ("nope", json!(2))])
            .unwrap_err();
        assert!(matches!(err, RecordError::UnknownField { .. }));
        assert_eq!(c[0], json!(0));
    }

    #[test]
    fn equality_is_per_type_and_field() {
        let t = coordinate(false);
        assert_eq!(t.make([json!(1), json!(2)]).unwrap(), t.make([json!(1), json!(2)]).unwrap());
        assert_ne!(t.make([json!(1), json!(2)]).unwrap(), t.make([json!(2), json!(1)]).unwrap());

        let other = RecordType::builder("Vector").fields("x y").build().unwrap();
        assert_ne!(t.make([json!(1), json!(2)]).unwrap(), other.make([json!(1), json!(2)]).unwrap());
    }
}
