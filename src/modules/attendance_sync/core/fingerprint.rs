use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::modules::attendance_sync::core::projection::FieldProjection;

const FINGERPRINT_VERSION: &[u8] = b"attendance-fields/v1";

/// Digest of a projection's column values. Equal fingerprints mean the board
/// item needs no write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes every key/value pair in order. Each part is length-prefixed so no
/// two distinct projections share an input stream.
pub fn fingerprint(projection: &FieldProjection) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_VERSION);
    for (key, value) in projection.fields() {
        update_part(&mut hasher, key.as_bytes());
        update_part(&mut hasher, value.canonical().as_bytes());
    }
    Fingerprint(hex::encode(hasher.finalize()))
}

fn update_part(hasher: &mut Sha256, part: &[u8]) {
    hasher.update((part.len() as u64).to_le_bytes());
    hasher.update(part);
}

#[cfg(test)]
mod fingerprint_tests {
    use super::*;
    use crate::modules::attendance_sync::core::projection::{FieldValue, Hours};
    use chrono::TimeDelta;
    use rstest::{fixture, rstest};

    #[fixture]
    fn projection() -> FieldProjection {
        FieldProjection::new("Ada Lovelace")
            .with_field("text_mkzm7ea3", FieldValue::Text("a1b2c3".into()))
            .with_field(
                "numeric_mkzm4ydj",
                FieldValue::Numeric(Hours::from_elapsed(TimeDelta::hours(8))),
            )
    }

    #[rstest]
    fn it_should_be_deterministic_for_equal_projections(projection: FieldProjection) {
        let again = projection.clone();
        assert_eq!(fingerprint(&projection), fingerprint(&again));
        assert_eq!(fingerprint(&projection).as_str().len(), 64);
    }

    #[rstest]
    fn it_should_differ_when_only_the_duration_differs(projection: FieldProjection) {
        let changed = projection.clone().with_field(
            "numeric_mkzm4ydj",
            FieldValue::Numeric(Hours::from_elapsed(TimeDelta::minutes(8 * 60 + 1))),
        );
        assert_ne!(fingerprint(&projection), fingerprint(&changed));
    }

    #[rstest]
    fn it_should_be_sensitive_to_field_order() {
        let a = FieldProjection::new("x")
            .with_field("a", FieldValue::Text("1".into()))
            .with_field("b", FieldValue::Text("2".into()));
        let b = FieldProjection::new("x")
            .with_field("b", FieldValue::Text("2".into()))
            .with_field("a", FieldValue::Text("1".into()));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[rstest]
    fn it_should_ignore_the_item_name(projection: FieldProjection) {
        let mut renamed = FieldProjection::new("Someone Else");
        for (key, value) in projection.fields() {
            renamed.set(key.clone(), value.clone());
        }
        assert_eq!(fingerprint(&projection), fingerprint(&renamed));
    }

    #[rstest]
    fn it_should_not_confuse_shifted_key_value_boundaries() {
        let a = FieldProjection::new("x").with_field("ab", FieldValue::Text("c".into()));
        let b = FieldProjection::new("x").with_field("a", FieldValue::Text("bc".into()));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
