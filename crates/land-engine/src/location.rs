//! Normalization of administrative location names so that `MI`, `Michigan` and
//! ` michigan ` (or `Clare`, `Clare County`) resolve to the same key.

const STATE_NAMES: &[(&str, &str)] = &[
    ("al", "alabama"),
    ("ak", "alaska"),
    ("az", "arizona"),
    ("ar", "arkansas"),
    ("ca", "california"),
    ("co", "colorado"),
    ("ct", "connecticut"),
    ("de", "delaware"),
    ("fl", "florida"),
    ("ga", "georgia"),
    ("hi", "hawaii"),
    ("id", "idaho"),
    ("il", "illinois"),
    ("in", "indiana"),
    ("ia", "iowa"),
    ("ks", "kansas"),
    ("ky", "kentucky"),
    ("la", "louisiana"),
    ("me", "maine"),
    ("md", "maryland"),
    ("ma", "massachusetts"),
    ("mi", "michigan"),
    ("mn", "minnesota"),
    ("ms", "mississippi"),
    ("mo", "missouri"),
    ("mt", "montana"),
    ("ne", "nebraska"),
    ("nv", "nevada"),
    ("nh", "new hampshire"),
    ("nj", "new jersey"),
    ("nm", "new mexico"),
    ("ny", "new york"),
    ("nc", "north carolina"),
    ("nd", "north dakota"),
    ("oh", "ohio"),
    ("ok", "oklahoma"),
    ("or", "oregon"),
    ("pa", "pennsylvania"),
    ("ri", "rhode island"),
    ("sc", "south carolina"),
    ("sd", "south dakota"),
    ("tn", "tennessee"),
    ("tx", "texas"),
    ("ut", "utah"),
    ("vt", "vermont"),
    ("va", "virginia"),
    ("wa", "washington"),
    ("wv", "west virginia"),
    ("wi", "wisconsin"),
    ("wy", "wyoming"),
];

/// Lowercase full state name for any abbreviation or spelling of a state.
///
/// Unknown values are returned trimmed and lowercased.
pub fn normalize_state(value: &str) -> String {
    let cleaned = value.trim().to_lowercase();
    if cleaned.len() == 2 {
        if let Some((_, name)) = STATE_NAMES.iter().find(|(abbr, _)| *abbr == cleaned) {
            return (*name).to_string();
        }
    }
    cleaned
}

/// Lowercase county name without a trailing ` county` suffix.
pub fn normalize_county(value: &str) -> String {
    let cleaned = value.trim().to_lowercase();
    match cleaned.strip_suffix(" county") {
        Some(stripped) => stripped.trim().to_string(),
        None => cleaned,
    }
}
