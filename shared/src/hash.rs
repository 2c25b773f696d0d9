/// Case-insensitive Jenkins one-at-a-time hash identifying reliable-command
/// types on the wire. Each byte is lowercased before mixing; the result is
/// stable across platforms and releases.
pub fn hash_rage_string(name: &str) -> u32 {
    let mut hash: u32 = 0;

    for byte in name.bytes() {
        hash = hash.wrapping_add(u32::from(byte.to_ascii_lowercase()));
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }

    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}
