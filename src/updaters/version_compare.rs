use std::cmp::Ordering;

/// Strip the `v` prefix release tags usually carry.
/// e.g. "v1.4.0" → "1.4.0"
pub fn normalize_tag(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix('v')
        .or_else(|| tag.strip_prefix('V'))
        .unwrap_or(tag)
}

/// Returns true if `available` is newer than `current`.
pub fn is_newer(current: &str, available: &str) -> bool {
    flexible_compare(normalize_tag(current), normalize_tag(available)) == Ordering::Less
}

/// True for semver pre-release versions ("2.0.0-beta.1").
pub fn is_prerelease(version: &str) -> bool {
    semver::Version::parse(normalize_tag(version))
        .map(|v| !v.pre.is_empty())
        .unwrap_or(false)
}

/// Semver when both sides parse, otherwise segment by segment with missing
/// segments counted as zero.
pub fn flexible_compare(a: &str, b: &str) -> Ordering {
    if let (Ok(va), Ok(vb)) = (semver::Version::parse(a), semver::Version::parse(b)) {
        return va.cmp(&vb);
    }

    let (seg_a, seg_b) = (split_segments(a), split_segments(b));
    (0..seg_a.len().max(seg_b.len()))
        .map(|i| {
            compare_segment(
                seg_a.get(i).map_or("0", String::as_str),
                seg_b.get(i).map_or("0", String::as_str),
            )
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn split_segments(version: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut was_digit = false;

    for ch in version.chars() {
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != was_digit {
            segments.push(std::mem::take(&mut current));
        }
        if !matches!(ch, '.' | '-' | '+' | '_' | ' ') {
            current.push(ch);
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
        was_digit = is_digit;
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}
