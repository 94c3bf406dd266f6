use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Field-name to value tree handed to a [`DocumentStore`](crate::store::DocumentStore).
pub type Document = Value;

/// Where a document lives in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentAddress {
    pub collection: String,
    pub document_id: String,
}

impl fmt::Display for DocumentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.document_id)
    }
}

pub fn to_document<T: Serialize + ?Sized>(value: &T) -> Result<Document, serde_json::Error> {
    serde_json::to_value(value)
}
