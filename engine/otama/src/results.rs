//! Materialization of engine search results into host records.

use tracing::warn;

use crate::decode::decode;
use crate::id::Identifier;
use crate::value::{mapping_key_text, HostValue};
use crate::variant::{VariantPool, VariantRef};

/// Reserved record key bound to the identifier's hex form.
pub const ID_KEY: &str = "id";

/// Ordered `(identifier, payload)` pairs produced by an engine search.
///
/// The result set owns the pool its payloads live in.
pub struct ResultSet {
    pool: VariantPool,
    entries: Vec<(Identifier, usize)>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self {
            pool: VariantPool::open(),
            entries: Vec::new(),
        }
    }

    /// Append a result and return its (initially `Null`) payload slot.
    pub fn push(&mut self, id: Identifier) -> VariantRef<'_> {
        let var = self.pool.new_variant();
        self.entries.push((id, var.index()));
        var
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn id(&self, index: usize) -> Option<Identifier> {
        self.entries.get(index).map(|(id, _)| *id)
    }

    pub fn value(&self, index: usize) -> Option<VariantRef<'_>> {
        self.entries
            .get(index)
            .map(|(_, node)| self.pool.node(*node))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Identifier, VariantRef<'_>)> + '_ {
        self.entries
            .iter()
            .map(|(id, node)| (*id, self.pool.node(*node)))
    }
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::new()
    }
}

/// One search hit: the decoded payload plus its identifier under [`ID_KEY`].
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    fields: Vec<(String, HostValue)>,
}

impl Record {
    fn new(id: Identifier, payload: HostValue) -> Self {
        let mut fields = match payload {
            HostValue::Mapping(entries) => {
                let mut fields: Vec<(String, HostValue)> = Vec::with_capacity(entries.len() + 1);
                for (key, value) in entries {
                    let Some(key) = mapping_key_text(&key) else {
                        continue;
                    };
                    match fields.iter_mut().find(|(k, _)| *k == key) {
                        Some(slot) => slot.1 = value,
                        None => fields.push((key, value)),
                    }
                }
                fields
            }
            other => {
                warn!(
                    id = %id,
                    kind = other.kind(),
                    "engine result payload is not a hash, payload dropped"
                );
                Vec::with_capacity(1)
            }
        };
        let hex = HostValue::Text(id.to_hex());
        match fields.iter_mut().find(|(k, _)| k == ID_KEY) {
            Some(slot) => slot.1 = hex,
            None => fields.push((ID_KEY.to_string(), hex)),
        }
        Self { fields }
    }

    /// Hex identifier of the record.
    pub fn id(&self) -> &str {
        self.get(ID_KEY).and_then(HostValue::as_str).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&HostValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn fields(&self) -> &[(String, HostValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_value(self) -> HostValue {
        HostValue::mapping(self.fields)
    }
}

/// Turn an engine result set into host records, one per result, in engine order.
pub fn materialize(results: &ResultSet) -> Vec<Record> {
    results
        .iter()
        .map(|(id, payload)| Record::new(id, decode(payload)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ID_LEN;

    fn id(byte: u8) -> Identifier {
        Identifier::from_bytes([byte; ID_LEN])
    }

    #[test]
    fn identifier_overrides_payload_id() {
        let mut results = ResultSet::new();
        let payload = results.push(id(1));
        payload.set_hash().unwrap();
        payload.hash_at("id").unwrap().set_string("x").unwrap();
        payload.hash_at("similarity").unwrap().set_float(0.9).unwrap();

        let records = materialize(&results);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), id(1).to_hex());
        let keys: Vec<&str> = records[0].keys().collect();
        assert_eq!(keys, vec!["id", "similarity"]);
    }

    #[test]
    fn preserves_engine_order() {
        let mut results = ResultSet::new();
        for byte in [3u8, 1, 2] {
            let payload = results.push(id(byte));
            payload.set_hash().unwrap();
            let nested = payload.hash_at("rank").unwrap();
            nested.set_int(i64::from(byte)).unwrap();
        }
        let ids: Vec<String> = materialize(&results)
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec![id(3).to_hex(), id(1).to_hex(), id(2).to_hex()]);
    }

    #[test]
    fn non_hash_payload_keeps_only_id() {
        let mut results = ResultSet::new();
        results.push(id(9)).set_int(5).unwrap();
        let records = materialize(&results);
        assert_eq!(records[0].len(), 1);
        assert_eq!(records[0].id(), id(9).to_hex());
    }

    #[test]
    fn indexed_access_matches_push_order() {
        let mut results = ResultSet::new();
        let first = results.push(id(4));
        first.set_array().unwrap();
        first.array_push().unwrap().set_int(1).unwrap();
        results.push(id(5)).set_float(0.25).unwrap();

        assert_eq!(results.id(1), Some(id(5)));
        assert_eq!(results.value(1).and_then(|v| v.as_float()), Some(0.25));
        assert_eq!(results.value(0).and_then(|v| v.array_len()), Some(1));
        assert!(results.id(2).is_none());
        assert!(results.value(2).is_none());
    }

    #[test]
    fn record_converts_back_into_a_mapping() {
        let mut results = ResultSet::new();
        let payload = results.push(id(2));
        payload.set_hash().unwrap();
        payload.hash_at("score").unwrap().set_int(7).unwrap();

        let record = materialize(&results).remove(0);
        let expected = HostValue::mapping([
            ("score", HostValue::Int(7)),
            ("id", HostValue::Text(id(2).to_hex())),
        ]);
        assert_eq!(record.into_value(), expected);
    }
}
