use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::models::object_id::ObjectId;

/// Field holding the caller-visible song id.
pub const ID_FIELD: &str = "id";
/// Field under which the internal object id is exposed.
pub const OBJECT_ID_FIELD: &str = "_id";

pub type Fields = Map<String, Value>;

/// External, caller-visible song id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SongId(pub i64);

impl SongId {
    /// Parses a path segment. Only plain non-negative decimal integers match.
    pub fn from_path(segment: &str) -> Option<Self> {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        segment.parse::<i64>().ok().map(SongId)
    }

    /// Reads the id from a JSON value, accepting integral numbers only.
    /// `2.0` counts as `2`, as it does for the JSONB comparison in the database.
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(id) = value.as_i64() {
            return Some(SongId(id));
        }
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| SongId(f as i64))
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(ID_FIELD).and_then(SongId::from_value) == Some(*self)
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a request body could not be turned into a song document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("song must be a JSON object")]
    NotAnObject,
    #[error("song must include an integer \"id\" field")]
    MissingId,
    #[error("song \"id\" must be an integer")]
    InvalidId,
}

/// A semi-structured song record before it is stored.
///
/// Fields are free-form; only `id` is checked, and only where the caller
/// asks for it. A caller supplied `_id` is dropped since the store owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct SongDocument {
    fields: Fields,
}

impl SongDocument {
    /// Accepts any JSON object. Used for seed records.
    pub fn from_object(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Object(mut fields) => {
                fields.remove(OBJECT_ID_FIELD);
                Ok(SongDocument { fields })
            }
            _ => Err(DocumentError::NotAnObject),
        }
    }

    /// Accepts a JSON object carrying an integer `id`. Used for creates.
    pub fn with_id(value: Value) -> Result<Self, DocumentError> {
        let doc = Self::from_object(value)?;
        match doc.fields.get(ID_FIELD) {
            None => Err(DocumentError::MissingId),
            Some(v) if SongId::from_value(v).is_none() => Err(DocumentError::InvalidId),
            Some(_) => Ok(doc),
        }
    }

    /// Accepts a partial update. `id` may be absent but must be an integer when present.
    pub fn patch(value: Value) -> Result<Self, DocumentError> {
        let doc = Self::from_object(value)?;
        match doc.fields.get(ID_FIELD) {
            Some(v) if SongId::from_value(v).is_none() => Err(DocumentError::InvalidId),
            _ => Ok(doc),
        }
    }

    pub fn id(&self) -> Option<SongId> {
        self.fields.get(ID_FIELD).and_then(SongId::from_value)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }
}

/// A stored song: the internal object id plus the document fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub oid: ObjectId,
    pub fields: Fields,
}

impl Song {
    pub fn new(oid: ObjectId, fields: Fields) -> Self {
        Song { oid, fields }
    }

    pub fn id(&self) -> Option<SongId> {
        self.fields.get(ID_FIELD).and_then(SongId::from_value)
    }

    /// Applies `patch` as a shallow merge. Returns whether any field changed.
    pub fn merge(&mut self, patch: &Fields) -> bool {
        let mut changed = false;
        for (key, value) in patch {
            if self.fields.get(key) != Some(value) {
                self.fields.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }
}

impl Serialize for Song {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(OBJECT_ID_FIELD, &self.oid)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_ids_are_plain_digits() {
        assert_eq!(SongId::from_path("42"), Some(SongId(42)));
        assert_eq!(SongId::from_path("0"), Some(SongId(0)));
        assert_eq!(SongId::from_path("-1"), None);
        assert_eq!(SongId::from_path("+1"), None);
        assert_eq!(SongId::from_path("abc"), None);
        assert_eq!(SongId::from_path(""), None);
        assert_eq!(SongId::from_path("99999999999999999999"), None);
    }

    #[test]
    fn integral_floats_are_ids() {
        assert_eq!(SongId::from_value(&json!(2.0)), Some(SongId(2)));
        assert_eq!(SongId::from_value(&json!(2.5)), None);
        assert_eq!(SongId::from_value(&json!(1e300)), None);
        assert!(SongId(2).matches(json!({"id": 2.0}).as_object().unwrap()));
        assert!(SongDocument::with_id(json!({"id": 4.0})).is_ok());
    }

    #[test]
    fn create_requires_integer_id() {
        assert!(SongDocument::with_id(json!({"id": 3, "title": "x"})).is_ok());
        assert_eq!(
            SongDocument::with_id(json!({"title": "x"})),
            Err(DocumentError::MissingId)
        );
        assert_eq!(
            SongDocument::with_id(json!({"id": "3"})),
            Err(DocumentError::InvalidId)
        );
        assert_eq!(
            SongDocument::with_id(json!({"id": 3.5})),
            Err(DocumentError::InvalidId)
        );
        assert_eq!(
            SongDocument::with_id(json!([1, 2])),
            Err(DocumentError::NotAnObject)
        );
    }

    #[test]
    fn patch_allows_missing_id_but_not_a_bad_one() {
        assert!(SongDocument::patch(json!({"title": "x"})).is_ok());
        assert_eq!(
            SongDocument::patch(json!({"id": null})),
            Err(DocumentError::InvalidId)
        );
    }

    #[test]
    fn caller_supplied_object_id_is_dropped() {
        let doc = SongDocument::from_object(json!({"_id": {"$oid": "abc"}, "id": 1})).unwrap();
        assert!(!doc.fields().contains_key(OBJECT_ID_FIELD));
        assert_eq!(doc.id(), Some(SongId(1)));
    }

    #[test]
    fn merge_reports_changes() {
        let mut song = Song::new(
            ObjectId::new(),
            json!({"id": 1, "title": "Old"}).as_object().unwrap().clone(),
        );
        let patch = json!({"title": "New"}).as_object().unwrap().clone();
        assert!(song.merge(&patch));
        assert_eq!(song.fields["title"], "New");
        assert!(!song.merge(&patch));
        assert!(!song.merge(&Fields::new()));
    }

    #[test]
    fn serializes_with_object_id() {
        let oid = ObjectId::parse_hex("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        let song = Song::new(oid, json!({"id": 7, "title": "T"}).as_object().unwrap().clone());
        assert_eq!(
            serde_json::to_value(&song).unwrap(),
            json!({"_id": {"$oid": "65a1f0c2e4b0a1b2c3d4e5f6"}, "id": 7, "title": "T"})
        );
    }
}
