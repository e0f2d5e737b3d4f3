/// Backend key for `field` in a per-field store with optional prefix `id`.
///
/// `Some("ns")` + `"foo"` gives `"ns.foo"`; no prefix (or an empty one) gives
/// the bare field name.
pub fn prefixed_key(id: Option<&str>, field: &str) -> String {
    match id {
        Some(id) if !id.is_empty() => format!("{id}.{field}"),
        _ => field.to_string(),
    }
}
