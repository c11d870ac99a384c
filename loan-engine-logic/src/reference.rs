use chrono::Utc;

/// Generate an opaque, unique reference for a disbursement or payment. Not
/// a cryptographic identifier, just timestamp-plus-random the way the
/// teacher mints transaction references.
pub fn new_reference(prefix: &str) -> String {
    let now = Utc::now();
    let timestamp = now.format("%Y%m%d%H%M%S");
    let random_suffix: u32 = rand::random::<u32>() % 1_000_000;
    format!("{prefix}{timestamp}{random_suffix:06}")
}
