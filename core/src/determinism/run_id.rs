use sha2::{Digest, Sha256};
use ulid::Ulid;

pub fn new_run_id() -> String {
    format!("wr_{}", Ulid::new())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
