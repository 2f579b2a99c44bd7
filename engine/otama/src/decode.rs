use tracing::debug;

use crate::value::HostValue;
use crate::variant::{VariantKind, VariantRef};

/// Lift a variant tree into an owned host value.
///
/// Total over every tag. Hash keys come out as text in stored order. Opaque
/// handles are not host-decodable and yield `Null`.
pub fn decode(var: VariantRef<'_>) -> HostValue {
    match var.kind() {
        VariantKind::Null => HostValue::Null,
        VariantKind::Int => var.as_int().map_or(HostValue::Null, HostValue::Int),
        VariantKind::Float => var.as_float().map_or(HostValue::Null, HostValue::Float),
        VariantKind::String => var.as_string().map_or(HostValue::Null, HostValue::Text),
        VariantKind::Binary => var.as_binary().map_or(HostValue::Null, HostValue::Bytes),
        VariantKind::Array => {
            HostValue::Sequence(var.array_items().into_iter().map(decode).collect())
        }
        VariantKind::Hash => HostValue::Mapping(
            var.hash_entries()
                .into_iter()
                .map(|(key, child)| (HostValue::Text(key), decode(child)))
                .collect(),
        ),
        VariantKind::Opaque => {
            debug!("opaque variant decoded as null");
            HostValue::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::OpaqueHandle;
    use crate::variant::VariantPool;

    #[test]
    fn decodes_nested_hash_in_order() {
        let pool = VariantPool::open();
        let root = pool.new_variant();
        root.set_hash().unwrap();
        root.hash_at("z").unwrap().set_int(1).unwrap();
        let list = root.hash_at("a").unwrap();
        list.set_array().unwrap();
        list.array_push().unwrap().set_float(0.5).unwrap();
        list.array_push().unwrap().set_string("x").unwrap();

        let expected = HostValue::mapping([
            ("z", HostValue::Int(1)),
            (
                "a",
                HostValue::Sequence(vec![HostValue::Float(0.5), HostValue::text("x")]),
            ),
        ]);
        assert_eq!(decode(root), expected);
    }

    #[test]
    fn binary_and_opaque_do_not_fail() {
        let pool = VariantPool::open();
        let blob = pool.new_variant();
        blob.set_binary(vec![0u8, 1, 2]).unwrap();
        let opaque = pool.new_variant();
        opaque.set_opaque(OpaqueHandle::new(11).unwrap()).unwrap();

        assert_eq!(decode(blob), HostValue::Bytes(vec![0, 1, 2]));
        assert_eq!(decode(opaque), HostValue::Null);
    }
}
