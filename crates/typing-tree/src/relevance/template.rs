//! `${name}` variable references in XPath expressions.
//!
//! The grammar is deliberately small: a reference is `${`, a non-empty name
//! made of letters, digits, `_`, `-` or `.`, and a closing `}`. References do
//! not nest. Any other `$` or `}` is literal text.

use super::RelevanceError;

/// A piece of a parsed template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Variable(&'a str),
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn malformed(template: &str, position: usize) -> RelevanceError {
    RelevanceError::MalformedTemplate {
        template: template.to_string(),
        position,
    }
}

/// Split a template into literal text and variable references.
pub fn parse(template: &str) -> Result<Vec<Segment<'_>>, RelevanceError> {
    let mut segments = Vec::new();
    let mut rest = 0;

    while let Some(offset) = template[rest..].find("${") {
        let start = rest + offset;
        if start > rest {
            segments.push(Segment::Text(&template[rest..start]));
        }
        let name_start = start + 2;
        let end = template[name_start..]
            .find('}')
            .map(|i| name_start + i)
            .ok_or_else(|| malformed(template, start))?;
        let name = &template[name_start..end];
        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(malformed(template, start));
        }
        segments.push(Segment::Variable(name));
        rest = end + 1;
    }

    if rest < template.len() {
        segments.push(Segment::Text(&template[rest..]));
    }
    Ok(segments)
}

/// Whether the template references `name`.
pub fn references(template: &str, name: &str) -> bool {
    parse(template).is_ok_and(|segments| segments.contains(&Segment::Variable(name)))
}

/// Rewrite every reference `${name}` as `${lookup(name)}`.
pub fn resolve<F>(template: &str, mut lookup: F) -> Result<String, RelevanceError>
where
    F: FnMut(&str) -> Result<String, RelevanceError>,
{
    let mut out = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Variable(name) => {
                out.push_str("${");
                out.push_str(&lookup(name)?);
                out.push('}');
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_text_and_variables() {
        let segments = parse("${a} > 3 and ${b_c} = 'x'").unwrap();
        assert_eq!(
            segments,
            [
                Segment::Variable("a"),
                Segment::Text(" > 3 and "),
                Segment::Variable("b_c"),
                Segment::Text(" = 'x'"),
            ]
        );
    }

    #[test]
    fn literal_dollar_and_brace_are_text() {
        assert_eq!(
            parse("cost$ } end").unwrap(),
            [Segment::Text("cost$ } end")]
        );
    }

    #[rstest]
    #[case("${a", 0)]
    #[case("x = ${}", 4)]
    #[case("${a ${b}}", 0)]
    #[case("${a b}", 0)]
    fn malformed_references(#[case] template: &str, #[case] position: usize) {
        assert_eq!(
            parse(template).unwrap_err(),
            RelevanceError::MalformedTemplate {
                template: template.to_string(),
                position,
            }
        );
    }

    #[test]
    fn resolve_rewrites_names() {
        let out = resolve("${a} = ${b}", |name| Ok(format!("{name}_uid"))).unwrap();
        assert_eq!(out, "${a_uid} = ${b_uid}");
    }

    #[test]
    fn resolve_propagates_lookup_errors() {
        let err = resolve("${a}", |name| {
            Err(RelevanceError::UnresolvedVariable {
                variable: name.to_string(),
                node: "n".into(),
            })
        })
        .unwrap_err();
        assert!(matches!(err, RelevanceError::UnresolvedVariable { .. }));
    }

    #[test]
    fn references_matches_whole_names() {
        assert!(references("${age_x1} > 2", "age_x1"));
        assert!(!references("${age_x12} > 2", "age_x1"));
    }
}
