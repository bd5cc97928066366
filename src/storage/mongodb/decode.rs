//! Conversions from MongoDB documents and change events.

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::change_stream::event::{ChangeStreamEvent, OperationType};
use serde_json::{Map, Value};

use crate::booking::{Booking, BookingStatus, AMOUNT_FIELD, STATUS_FIELD};
use crate::interfaces::booking_store::{OperationKind, RawChange, Result, StorageError};

/// Render a document `_id` as the opaque string id used by the relay.
fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::String(s) => s.clone(),
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}

/// Filter matching a booking by its relay id.
///
/// Bookings are stored with string ids, but a hex id may also be a real
/// ObjectId, so ids that parse as one match either form.
pub fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! {
            "_id": { "$in": [Bson::ObjectId(oid), Bson::String(id.to_string())] }
        },
        Err(_) => doc! { "_id": id },
    }
}

fn document_to_map(doc: Document) -> Map<String, Value> {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn number(value: Option<&Bson>) -> f64 {
    match value {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        _ => 0.0,
    }
}

/// Decode a stored booking document.
pub fn booking_from_document(doc: &Document) -> Result<Booking> {
    let id = doc
        .get("_id")
        .map(id_to_string)
        .ok_or_else(|| StorageError::InvalidDocument("missing _id".to_string()))?;

    let status = doc
        .get_str(STATUS_FIELD)
        .map_err(|e| StorageError::InvalidDocument(format!("booking {}: {}", id, e)))?
        .parse::<BookingStatus>()
        .map_err(|e| StorageError::InvalidDocument(format!("booking {}: {}", id, e)))?;

    Ok(Booking {
        name: doc.get_str("name").unwrap_or_default().to_string(),
        total_booking_amount: number(doc.get(AMOUNT_FIELD)),
        status,
        id,
    })
}

/// Adapt a change stream event into a store-independent notification.
pub fn raw_change_from_event(event: ChangeStreamEvent<Document>) -> Result<RawChange> {
    let operation = match event.operation_type {
        OperationType::Insert => OperationKind::Insert,
        OperationType::Update => OperationKind::Update,
        OperationType::Replace => OperationKind::Replace,
        OperationType::Delete => OperationKind::Delete,
        _ => OperationKind::Other,
    };

    let document_id = event
        .document_key
        .as_ref()
        .and_then(|key| key.get("_id"))
        .map(id_to_string);

    let document_id = match (operation, document_id) {
        (_, Some(id)) => id,
        // Collection-level events (drop, rename, invalidate) carry no key.
        (OperationKind::Other, None) => String::new(),
        (_, None) => {
            return Err(StorageError::InvalidDocument(
                "change event without document key".to_string(),
            ))
        }
    };

    let updated_fields = event
        .update_description
        .map(|desc| document_to_map(desc.updated_fields))
        .unwrap_or_default();

    Ok(RawChange {
        operation,
        document_id,
        updated_fields,
        before: event.full_document_before_change.map(document_to_map),
    })
}
