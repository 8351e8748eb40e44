use super::{Pattern, Segment};

/// Split a request path into the segments patterns are matched against.
///
/// One leading `/` is stripped; an empty remainder has no segments. Empty
/// components are kept, so `/foo/` yields `["foo", ""]`.
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').collect()
}

impl Pattern {
    /// Whether a concrete request matches this pattern.
    pub fn matches(&self, method: &str, segments: &[&str]) -> bool {
        if let Some(expected) = self.method {
            if expected.as_str() != method {
                return false;
            }
        }

        if segments.len() != self.segments.len()
            && !(self.ends_with_multi() && segments.len() >= self.segments.len())
        {
            return false;
        }

        for (segment, value) in self.segments.iter().zip(segments) {
            match segment {
                Segment::MultiIdentifier(_) => return true,
                Segment::Identifier(_) => {}
                Segment::Literal(text) => {
                    if text.as_str() != *value {
                        return false;
                    }
                }
            }
        }
        true
    }
}
