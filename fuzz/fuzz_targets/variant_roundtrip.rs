#![no_main]

use std::fs;
use std::path::Path;

use libfuzzer_sys::fuzz_target;
use otama::{decode, encode, VariantPool, VariantRef};

const MAX_DEPTH: usize = 8;
const MAX_LEN: usize = 16;

fuzz_target!(|data: &[u8]| {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut cursor = Cursor { data, offset: 0 };
        let pool = VariantPool::open();
        let first = pool.new_variant();
        cursor.fill(first, 0);
        let lifted = decode(first);

        let second = pool.new_variant();
        encode(&lifted, second).expect("decoded trees always encode");
        assert_eq!(decode(second), lifted);
    }));

    if result.is_err() {
        record_panic("variant_roundtrip", data);
    }
});

struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn byte(&mut self) -> u8 {
        let byte = self.data.get(self.offset).copied().unwrap_or(0);
        self.offset += 1;
        byte
    }

    fn take(&mut self, len: usize) -> Vec<u8> {
        let start = self.offset.min(self.data.len());
        let end = (start + len).min(self.data.len());
        self.offset = start + len;
        self.data[start..end].to_vec()
    }

    fn word(&mut self) -> [u8; 8] {
        let mut out = [0u8; 8];
        let bytes = self.take(8);
        out[..bytes.len()].copy_from_slice(&bytes);
        out
    }

    fn count(&mut self) -> usize {
        usize::from(self.byte()) % MAX_LEN
    }

    // Builds the tree the way an engine would, straight into the pool.
    fn fill(&mut self, var: VariantRef<'_>, depth: usize) {
        let tag = self.byte();
        let tag = if depth >= MAX_DEPTH { tag % 5 } else { tag % 7 };
        let outcome = match tag {
            0 => var.set_null(),
            1 => var.set_int(i64::from_le_bytes(self.word())),
            2 => {
                let float = f64::from_le_bytes(self.word());
                var.set_float(if float.is_nan() { 0.0 } else { float })
            }
            3 => {
                let len = self.count();
                let text: String = self.take(len).iter().map(|b| char::from(b & 0x7f)).collect();
                var.set_string(text)
            }
            4 => {
                let len = self.count();
                var.set_binary(self.take(len))
            }
            5 => var.set_array().map(|()| {
                for _ in 0..self.count() {
                    if let Ok(child) = var.array_push() {
                        self.fill(child, depth + 1);
                    }
                }
            }),
            _ => var.set_hash().map(|()| {
                for _ in 0..self.count() {
                    let key_len = self.count();
                    let key = String::from_utf8_lossy(&self.take(key_len)).into_owned();
                    if let Ok(child) = var.hash_at(&key) {
                        self.fill(child, depth + 1);
                    }
                }
            }),
        };
        outcome.expect("fresh slots accept any tag");
    }
}

fn record_panic(target: &str, data: &[u8]) {
    let hash = fnv1a64(data);
    let dir = Path::new("fuzz").join("artifacts").join(target);
    if let Err(err) = fs::create_dir_all(&dir) {
        eprintln!("fuzz panic capture failed: target={} err={}", target, err);
        return;
    }
    let path = dir.join(format!("panic_{:016x}.bin", hash));
    if let Err(err) = fs::write(&path, data) {
        eprintln!(
            "fuzz panic capture failed: target={} path={} err={}",
            target,
            path.display(),
            err
        );
        return;
    }
    eprintln!(
        "fuzz panic captured: target={} path={} len={} seed_hex={}",
        target,
        path.display(),
        data.len(),
        hex::encode(&data[..data.len().min(64)])
    );
}

fn fnv1a64(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
