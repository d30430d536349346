use crate::request::FormMap;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Decodes a query string or `application/x-www-form-urlencoded` body.
///
/// `+` becomes a space and percent escapes are decoded, with invalid UTF-8
/// replaced. Repeated keys accumulate their values in order. Pairs with an
/// empty value (`a=` or a bare `a`) are dropped.
pub fn parse_form(input: &[u8]) -> FormMap {
    let mut fields = FormMap::new();
    for (key, value) in form_urlencoded::parse(input) {
        if value.is_empty() {
            continue;
        }
        fields
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    fields
}
