// Relative parameter paths used by linked parameters in snapshots and copy buffers
//
// A path is a '.'-separated list of segments ending with a parameter name.
// Inside a collection a segment is the member index; otherwise it is the
// child's field name. A literal '.' is written as "\." and a literal
// backslash as "\\".

use crate::model::ids::ParameterId;
use crate::model::structure::StructureNode;

/// Why a path could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Linked parameter path '{0}' contains an empty segment")]
    EmptySegment(String),
    #[error("Linked parameter path '{0}' ends with an unpaired escape")]
    TrailingEscape(String),
}

/// Escape a field name so it can be used as one path segment
pub fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c == '.' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Split a path into its unescaped segments.
///
/// A backslash escapes '.' and '\\'; before any other character it is kept
/// literally.
pub fn parse_path(path: &str) -> Result<Vec<String>, PathError> {
    let mut segments = Vec::new();
    let mut current = String::with_capacity(path.len());
    let mut escape = false;
    for c in path.chars() {
        if escape {
            if c != '.' && c != '\\' {
                current.push('\\');
            }
            current.push(c);
            escape = false;
        } else if c == '\\' {
            escape = true;
        } else if c == '.' {
            if current.is_empty() {
                return Err(PathError::EmptySegment(path.to_string()));
            }
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if escape {
        return Err(PathError::TrailingEscape(path.to_string()));
    }
    if current.is_empty() {
        return Err(PathError::EmptySegment(path.to_string()));
    }
    segments.push(current);
    Ok(segments)
}

/// Build the path from `current` to the parameter, if it lives in this subtree
pub fn lookup_path(current: &StructureNode, parameter: ParameterId) -> Option<String> {
    if let Some(found) = current.parameters().get(parameter) {
        return Some(escape_segment(found.name()));
    }
    current
        .children()
        .iter()
        .enumerate()
        .find_map(|(index, child)| {
            let rest = lookup_path(child, parameter)?;
            let segment = if current.is_collection() {
                index.to_string()
            } else {
                escape_segment(child.parent_field_name())
            };
            Some(format!("{}.{}", segment, rest))
        })
}

/// Resolve parsed segments starting from `current`.
///
/// `index_offset` shifts the first collection index; it is used when a copied
/// collection is appended after existing members.
pub fn resolve_parameter(
    current: &StructureNode,
    segments: &[String],
    index_offset: usize,
) -> Option<ParameterId> {
    resolve_from(current, segments, 0, index_offset)
}

fn resolve_from(
    current: &StructureNode,
    segments: &[String],
    depth: usize,
    index_offset: usize,
) -> Option<ParameterId> {
    if current.module_type().is_none() && !current.is_collection() {
        return None;
    }
    let segment = segments.get(depth)?;
    if depth == segments.len() - 1 {
        return current.parameters().by_name(segment).map(|p| p.id());
    }
    let next = if current.is_collection() {
        let mut index: usize = segment.parse().ok()?;
        if depth == 0 {
            index += index_offset;
        }
        current.children().get(index)?
    } else {
        current
            .children()
            .iter()
            .find(|child| child.parent_field_name() == segment)?
    };
    resolve_from(next, segments, depth + 1, index_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_path() {
        assert_eq!(parse_path("0.SomeParam").unwrap(), vec!["0", "SomeParam"]);
        assert_eq!(parse_path("Value").unwrap(), vec!["Value"]);
    }

    #[test]
    fn test_parse_escaped_dot() {
        assert_eq!(
            parse_path("Zone\\.System.Count").unwrap(),
            vec!["Zone.System", "Count"]
        );
    }

    #[test]
    fn test_backslash_before_other_characters_is_literal() {
        assert_eq!(parse_path("C:\\data.Name").unwrap(), vec!["C:\\data", "Name"]);
    }

    #[test]
    fn test_escape_then_parse() {
        let field = "Network.Data";
        let path = format!("{}.{}", escape_segment(field), "Value");
        assert_eq!(parse_path(&path).unwrap(), vec![field.to_string(), "Value".to_string()]);
    }

    #[test]
    fn test_backslashes_in_field_names_survive() {
        for field in ["Data\\", "C:\\data", "a\\.b", "\\\\share"] {
            let path = format!("{}.{}", escape_segment(field), escape_segment("Value"));
            assert_eq!(
                parse_path(&path).unwrap(),
                vec![field.to_string(), "Value".to_string()],
                "field {field:?} escaped as {path:?}"
            );
        }
        assert_eq!(escape_segment("Data\\"), "Data\\\\");
    }

    #[test]
    fn test_malformed_paths_are_rejected() {
        assert!(matches!(parse_path(""), Err(PathError::EmptySegment(_))));
        assert!(matches!(parse_path("a..b"), Err(PathError::EmptySegment(_))));
        assert!(matches!(parse_path("a.b."), Err(PathError::EmptySegment(_))));
        assert!(matches!(parse_path(".a"), Err(PathError::EmptySegment(_))));
        assert!(matches!(parse_path("a.b\\"), Err(PathError::TrailingEscape(_))));
    }
}
