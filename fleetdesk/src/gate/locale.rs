//! `Accept-Language` negotiation.

/// One weighted language range from an `Accept-Language` header.
#[derive(Debug, Clone, PartialEq)]
struct LanguageRange {
    tag: String,
    quality: f32,
}

fn parse_accept_language(header: &str) -> Vec<LanguageRange> {
    let mut ranges: Vec<LanguageRange> = header
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split(';');
            let tag = parts.next()?.trim().to_ascii_lowercase();
            if tag.is_empty() {
                return None;
            }

            let mut quality = 1.0;
            for param in parts {
                if let Some(q) = param.trim().strip_prefix("q=") {
                    // A malformed weight disqualifies the range.
                    quality = q.trim().parse::<f32>().ok().filter(|q| (0.0..=1.0).contains(q))?;
                }
            }

            (quality > 0.0).then_some(LanguageRange { tag, quality })
        })
        .collect();

    // Stable sort keeps header order among equal weights.
    ranges.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    ranges
}

/// Pick the best supported locale for a request.
///
/// Exact tag matches win, then primary-subtag matches (`fr-CA` → `fr`).
/// Anything unsupported or malformed falls back to `default`.
pub fn negotiate<'a>(header: Option<&str>, supported: &'a [String], default: &'a str) -> &'a str {
    let Some(header) = header else {
        return default;
    };

    for range in parse_accept_language(header) {
        if range.tag == "*" {
            return default;
        }

        if let Some(exact) = supported.iter().find(|s| s.eq_ignore_ascii_case(&range.tag)) {
            return exact;
        }

        let primary = range.tag.split('-').next().unwrap_or_default();
        if let Some(partial) = supported.iter().find(|s| {
            s.split('-')
                .next()
                .is_some_and(|p| p.eq_ignore_ascii_case(primary))
        }) {
            return partial;
        }
    }

    default
}
