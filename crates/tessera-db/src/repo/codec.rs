use mongodb::bson::{self, doc, Bson, Document};
use serde_json::Value;
use tessera_core::{User, UserFields, UserId};

use crate::store::StoreError;

/// Encodes a user as a document keyed by `_id`.
pub fn user_to_document(user: &User) -> Result<Document, StoreError> {
    let fields = bson::to_document(user.fields.as_map())?;
    let mut document = doc! { "_id": user.id.as_object_id() };
    document.extend(fields);
    Ok(document)
}

/// Decodes a stored document. Non-`_id` values are rendered as relaxed
/// extended JSON, so driver-specific types (dates, nested ids) stay readable.
pub fn document_to_user(mut document: Document) -> Result<User, StoreError> {
    let id = match document.remove("_id") {
        Some(Bson::ObjectId(oid)) => UserId::from_object_id(oid),
        Some(other) => {
            return Err(StoreError::Decode(format!(
                "_id is {:?}, expected ObjectId",
                other.element_type()
            )))
        }
        None => return Err(StoreError::Decode("missing _id".to_string())),
    };
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => Ok(User::new(id, UserFields::from_map(map))),
        other => Err(StoreError::Decode(format!("unexpected document shape: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_user() -> User {
        let fields = UserFields::from_json_slice(
            br#"{"name":"Ada","age":36,"score":1.5,"tags":["math"],"address":{"city":"London"}}"#,
        )
        .expect("fields");
        User::new(
            "65a1f0c2b3d4e5f601234567".parse().expect("id"),
            fields,
        )
    }

    #[test]
    fn encode_places_object_id_first() {
        let user = sample_user();
        let document = user_to_document(&user).expect("encode");
        let (first_key, first_value) = document.iter().next().expect("non-empty");
        assert_eq!(first_key, "_id");
        assert_eq!(first_value, &Bson::ObjectId(user.id.as_object_id()));
        assert_eq!(document.get_str("name").expect("name"), "Ada");
    }

    #[test]
    fn decode_restores_fields() {
        let user = sample_user();
        let decoded = document_to_user(user_to_document(&user).expect("encode")).expect("decode");
        assert_eq!(decoded, user);
        assert_eq!(decoded.fields.get("address"), Some(&json!({"city": "London"})));
    }

    #[test]
    fn decode_rejects_foreign_ids() {
        let err = document_to_user(doc! { "_id": "plain-string", "name": "Ada" })
            .expect_err("string id");
        assert!(matches!(err, StoreError::Decode(_)));

        let err = document_to_user(doc! { "name": "Ada" }).expect_err("missing id");
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn decode_drops_stray_id_field() {
        let oid = mongodb::bson::oid::ObjectId::new();
        let user = document_to_user(doc! { "_id": oid, "id": "legacy", "name": "Ada" })
            .expect("decode");
        assert_eq!(user.id.as_object_id(), oid);
        assert!(user.fields.get("id").is_none());
    }
}
