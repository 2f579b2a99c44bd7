//! Lowering of host values into variant trees.

use tracing::warn;

use crate::error::{OtamaError, OtamaResult};
use crate::value::{mapping_key_text, HostValue};
use crate::variant::VariantRef;

/// Encode `value` into the `Null` slot `into`.
///
/// Booleans become `Int(1)`/`Int(0)`. Text is routed to `String` only when
/// every character is one byte wide in UTF-8, otherwise the raw UTF-8 bytes
/// are stored as `Binary`. Host bytes are always `Binary`. Unrecognized
/// host values encode as `Null`.
///
/// # Errors
///
/// Fails with [`OtamaError::Argument`] for a mapping key that has no text
/// form, and for a [`crate::FeatureRaw`] that was already disposed, since a
/// released handle cannot be passed back to the engine.
pub fn encode(value: &HostValue, into: VariantRef<'_>) -> OtamaResult<()> {
    match value {
        HostValue::Null => into.set_null(),
        HostValue::Bool(v) => into.set_int(i64::from(*v)),
        HostValue::Int(v) => into.set_int(*v),
        HostValue::Float(v) => into.set_float(*v),
        HostValue::Text(s) => {
            if is_single_byte_text(s) {
                into.set_string(s.as_str())
            } else {
                into.set_binary(s.as_bytes())
            }
        }
        HostValue::Bytes(bytes) => into.set_binary(bytes.as_slice()),
        HostValue::Sequence(items) => {
            into.set_array()?;
            for (idx, item) in items.iter().enumerate() {
                encode(item, into.array_at(idx)?)?;
            }
            Ok(())
        }
        HostValue::Mapping(entries) => {
            into.set_hash()?;
            for (key, item) in entries {
                let key = mapping_key_text(key).ok_or_else(|| {
                    OtamaError::argument(format!("unsupported mapping key type: {}", key.kind()))
                })?;
                encode(item, into.hash_at(&key)?)?;
            }
            Ok(())
        }
        HostValue::Feature(feature) => match feature.handle() {
            Some(handle) => into.set_opaque(handle),
            None => Err(OtamaError::argument("feature has already been disposed")),
        },
        HostValue::Unrecognized(type_name) => {
            warn!(host_type = %type_name, "unsupported host value encoded as null");
            into.set_null()
        }
    }
}

/// Whether the UTF-8 byte length of `text` equals its character count.
pub fn is_single_byte_text(text: &str) -> bool {
    text.len() == text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::{VariantKind, VariantPool};

    #[test]
    fn booleans_become_ints() {
        let pool = VariantPool::open();
        let yes = pool.new_variant();
        let no = pool.new_variant();
        encode(&HostValue::Bool(true), yes).unwrap();
        encode(&HostValue::Bool(false), no).unwrap();
        assert_eq!(yes.as_int(), Some(1));
        assert_eq!(no.as_int(), Some(0));
    }

    #[test]
    fn multibyte_text_becomes_binary() {
        let pool = VariantPool::open();
        let var = pool.new_variant();
        encode(&HostValue::text("naïve"), var).unwrap();
        assert_eq!(var.kind(), VariantKind::Binary);
        assert_eq!(var.as_binary().unwrap(), "naïve".as_bytes());
    }

    #[test]
    fn host_bytes_always_become_binary() {
        let pool = VariantPool::open();
        let ascii = pool.new_variant();
        let blob = pool.new_variant();
        let empty = pool.new_variant();
        encode(&HostValue::Bytes(b"abc".to_vec()), ascii).unwrap();
        encode(&HostValue::Bytes(vec![0x61, 0x00, 0x62]), blob).unwrap();
        encode(&HostValue::Bytes(Vec::new()), empty).unwrap();
        assert_eq!(ascii.as_binary().unwrap(), b"abc".to_vec());
        assert_eq!(blob.as_binary().unwrap(), vec![0x61, 0x00, 0x62]);
        assert_eq!(empty.kind(), VariantKind::Binary);
    }

    #[test]
    fn disposed_feature_is_rejected() {
        struct Ignore;
        impl crate::feature::ReleaseFeature for Ignore {
            fn release_feature(&self, _handle: crate::feature::OpaqueHandle) {}
        }

        let handle = crate::feature::OpaqueHandle::new(5).unwrap();
        let feature = crate::feature::FeatureRaw::wrap(handle, std::sync::Arc::new(Ignore));
        let pool = VariantPool::open();
        let live = pool.new_variant();
        encode(&HostValue::Feature(feature.clone()), live).unwrap();
        assert_eq!(live.as_opaque(), Some(handle));

        feature.dispose();
        let dead = pool.new_variant();
        let err = encode(&HostValue::Feature(feature), dead).unwrap_err();
        assert!(matches!(err, OtamaError::Argument(_)));
        assert!(dead.is_null());
    }

    #[test]
    fn duplicate_mapping_keys_last_write_wins() {
        let pool = VariantPool::open();
        let var = pool.new_variant();
        let value = HostValue::Mapping(vec![
            (HostValue::text("k"), HostValue::Int(1)),
            (HostValue::Int(5), HostValue::Int(2)),
            (HostValue::text("k"), HostValue::Int(3)),
        ]);
        encode(&value, var).unwrap();
        assert_eq!(var.hash_keys(), vec!["k".to_string(), "5".to_string()]);
        assert_eq!(var.hash_get("k").unwrap().as_int(), Some(3));
    }

    #[test]
    fn unrecognized_values_encode_as_null() {
        let pool = VariantPool::open();
        let var = pool.new_variant();
        encode(&HostValue::Unrecognized("set".into()), var).unwrap();
        assert!(var.is_null());
    }

    #[test]
    fn sequence_key_is_rejected() {
        let pool = VariantPool::open();
        let var = pool.new_variant();
        let value = HostValue::Mapping(vec![(HostValue::Sequence(vec![]), HostValue::Null)]);
        assert!(matches!(encode(&value, var), Err(OtamaError::Argument(_))));
    }
}
