use sha2::{Digest, Sha256};

/// Namespace tag prepended to every certificate code.
pub const CODE_PREFIX: &str = "RR-";

const CODE_HEX_LEN: usize = 10;

/// Derives the verification code for one unit of a line item.
///
/// The code is `RR-` followed by the first ten uppercase hex digits of
/// `SHA-256("{order_id}|{line_item_id}|{unit_index}")`. It depends on nothing
/// else, so the same unit always gets the same code and a verifier can
/// recompute it without any stored state. Empty ids are hashed as-is.
pub fn generate_code(order_id: &str, line_item_id: &str, unit_index: u32) -> String {
    let canonical = format!("{}|{}|{}", order_id, line_item_id, unit_index);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hex::encode_upper(hasher.finalize());

    format!("{}{}", CODE_PREFIX, &digest[..CODE_HEX_LEN])
}
