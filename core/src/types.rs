//! Record-facing types: the `Record` trait, record references and change sets.
//!
//! # Design
//! A record type names its backend class through `Record::CLASS_NAME` rather
//! than having the name inferred from the Rust type. Encoding and decoding go
//! through serde, so a record is any `Serialize + DeserializeOwned` struct
//! that declares its class.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// A typed object stored in a named backend class.
///
/// ```
/// use record_core::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct GameScore {
///     score: u32,
/// }
///
/// impl Record for GameScore {
///     const CLASS_NAME: &'static str = "GameScore";
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned {
    const CLASS_NAME: &'static str;
}

/// Identifies one stored record: its class plus the backend object id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReference {
    pub class_name: String,
    pub id: String,
}

impl RecordReference {
    pub fn new(class_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            id: id.into(),
        }
    }

    /// Reference to record `id` of the class declared by `R`.
    pub fn of<R: Record>(id: impl Into<String>) -> Self {
        Self::new(R::CLASS_NAME, id)
    }

    /// Path of this record under API version `version`, every segment
    /// percent-encoded.
    pub fn path(&self, version: &str) -> String {
        format!(
            "{}/{}",
            collection_path(version, &self.class_name),
            encode_segment(&self.id)
        )
    }
}

/// Path of the collection holding `class_name` under API version `version`.
pub(crate) fn collection_path(version: &str, class_name: &str) -> String {
    format!(
        "/{}/classes/{}",
        encode_segment(version),
        encode_segment(class_name)
    )
}

/// Encode one path segment so it can neither split into several segments
/// nor act as a `.`/`..` dot segment.
fn encode_segment(segment: &str) -> String {
    match segment {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => urlencoding::encode(segment).into_owned(),
    }
}

/// Partial-update document sent verbatim as the body of an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(Map<String, Value>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous value for `key`.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for ChangeSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for ChangeSet {
    type Error = ApiError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ApiError::SerializationError(format!(
                "change set must be a JSON object, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    struct Player {
        name: String,
    }

    impl Record for Player {
        const CLASS_NAME: &'static str = "Player";
    }

    #[test]
    fn reference_path_includes_version_class_and_id() {
        let reference = RecordReference::of::<Player>("xWMyZ4YEGZ");
        assert_eq!(reference.class_name, "Player");
        assert_eq!(reference.path("1"), "/1/classes/Player/xWMyZ4YEGZ");
        assert_eq!(reference.path("2"), "/2/classes/Player/xWMyZ4YEGZ");
    }

    #[test]
    fn reference_path_encodes_reserved_characters() {
        let reference = RecordReference::of::<Player>("abc/../../2/classes/Other?where=1");
        assert_eq!(
            reference.path("1"),
            "/1/classes/Player/abc%2F..%2F..%2F2%2Fclasses%2FOther%3Fwhere%3D1"
        );
        assert_eq!(
            RecordReference::of::<Player>("a b").path("1"),
            "/1/classes/Player/a%20b"
        );
    }

    #[test]
    fn reference_path_escapes_dot_segments() {
        assert_eq!(
            RecordReference::of::<Player>("..").path("1"),
            "/1/classes/Player/%2E%2E"
        );
        assert_eq!(RecordReference::new("Player", ".").path("1"), "/1/classes/Player/%2E");
    }

    #[test]
    fn collection_path_encodes_class_and_version() {
        assert_eq!(collection_path("1", "Game Score"), "/1/classes/Game%20Score");
        assert_eq!(collection_path("1/../2", "Player"), "/1%2F..%2F2/classes/Player");
    }

    #[test]
    fn change_set_serializes_as_plain_object() {
        let changes = ChangeSet::new().set("score", 73).set("cheatMode", false);
        let body = serde_json::to_value(&changes).unwrap();
        assert_eq!(body, json!({"score": 73, "cheatMode": false}));
    }

    #[test]
    fn change_set_later_set_wins() {
        let changes = ChangeSet::new().set("score", 1).set("score", 2);
        assert_eq!(changes.as_map().len(), 1);
        assert_eq!(changes.as_map()["score"], 2);
    }

    #[test]
    fn change_set_passes_operators_through() {
        let changes =
            ChangeSet::try_from(json!({"score": {"__op": "Increment", "amount": 1}})).unwrap();
        let body = serde_json::to_string(&changes).unwrap();
        assert_eq!(body, r#"{"score":{"__op":"Increment","amount":1}}"#);
    }

    #[test]
    fn change_set_rejects_non_object() {
        let err = ChangeSet::try_from(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ApiError::SerializationError(_)));
    }
}
