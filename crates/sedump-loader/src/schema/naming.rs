/// Convert a mixed-case source identifier to a lower-case, underscore
/// separated database identifier
///
/// An underscore goes between every ASCII lowercase letter and an ASCII
/// uppercase letter that immediately follows it; the result is then
/// lowercased. `PostLinks` becomes `post_links`, `LinkTypeId` becomes
/// `link_type_id`. Already snake-cased input is returned unchanged.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;

    for c in name.chars() {
        if c.is_ascii_uppercase() && prev.is_some_and(|p| p.is_ascii_lowercase()) {
            out.push('_');
        }
        out.extend(c.to_lowercase());
        prev = Some(c);
    }

    out
}
