use std::sync::OnceLock;

use regex::Regex;

fn measurement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<key>[A-Za-z]+)(?:\[(?P<idx>\d+)\])?$").expect("static measurement regex")
    })
}

/// Last component of a recorder source path, splitting on `/` and `\`.
///
/// `"Concerto/RecResult[1]"` → `"RecResult[1]"`, `""` → `""`.
pub fn extract_measurement_name(source_path: &str) -> &str {
    source_path.rsplit(['/', '\\']).next().unwrap_or("")
}

/// Split a measurement name into `(key, index)`.
///
/// ```text
/// "RecResult[1]" -> ("RecResult", Some(1))
/// "D[3]"         -> ("D", Some(3))
/// "Foo"          -> ("Foo", None)
/// "x_1[2]"       -> ("x_1[2]", None)    (no match: whole name is the key)
/// ```
pub fn parse_key_and_index(measurement_name: &str) -> (String, Option<u32>) {
    let Some(caps) = measurement_re().captures(measurement_name) else {
        log::trace!("measurement name {measurement_name:?} has no key[index] form");
        return (measurement_name.to_string(), None);
    };

    match caps.name("idx").map(|m| m.as_str().parse::<u32>()) {
        None => (caps["key"].to_string(), None),
        Some(Ok(idx)) => (caps["key"].to_string(), Some(idx)),
        Some(Err(_)) => {
            log::trace!("measurement index in {measurement_name:?} out of range");
            (measurement_name.to_string(), None)
        }
    }
}
