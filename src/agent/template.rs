//! Typed prompt templates.
//!
//! A template is parsed once into literal and placeholder segments.
//! Placeholders are `{name}` where `name` is an identifier; `{{` and `}}`
//! produce literal braces. Rendering fails if any placeholder lacks a value,
//! so a prompt is never sent with an unfilled slot.

use crate::error::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    source: String,
    segments: Vec<Segment>,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl PromptTemplate {
    /// Parses template text.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Syntax`] on an unclosed `{`, a stray `}`,
    /// or a placeholder that is not an identifier.
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let syntax = |message: String| TemplateError::Syntax {
            template: name.to_string(),
            message,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut placeholder = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        placeholder.push(n);
                    }
                    if !closed {
                        return Err(syntax(format!("unclosed '{{' at byte {pos}")));
                    }
                    if !is_identifier(&placeholder) {
                        return Err(syntax(format!(
                            "invalid placeholder '{{{placeholder}}}' at byte {pos} (use '{{{{' for a literal brace)"
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(placeholder));
                }
                '}' => {
                    return Err(syntax(format!("unmatched '}}' at byte {pos}")));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            name: name.to_string(),
            source: source.to_string(),
            segments,
        })
    }

    /// Template name used in error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Original template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct placeholder names in order of first appearance.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(p) = segment
                && !names.contains(&p.as_str())
            {
                names.push(p);
            }
        }
        names
    }

    /// Checks that every `required` placeholder is declared.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingRequired`] for the first absent name.
    pub fn require(&self, required: &[&str]) -> Result<(), TemplateError> {
        let declared = self.placeholders();
        match required.iter().find(|r| !declared.contains(r)) {
            Some(missing) => Err(TemplateError::MissingRequired {
                template: self.name.clone(),
                placeholder: (*missing).to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Checks that every declared placeholder is in `allowed`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnknownPlaceholder`] for the first name
    /// outside the set.
    pub fn allow_only(&self, allowed: &[&str]) -> Result<(), TemplateError> {
        match self.placeholders().into_iter().find(|p| !allowed.contains(p)) {
            Some(unknown) => Err(TemplateError::UnknownPlaceholder {
                template: self.name.clone(),
                placeholder: unknown.to_string(),
                allowed: allowed.join(", "),
            }),
            None => Ok(()),
        }
    }

    /// Renders the template with the given values.
    ///
    /// Extra values that the template does not use are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingPlaceholder`] if a placeholder has no value.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(p) => {
                    let value = vars
                        .iter()
                        .find_map(|(k, v)| (*k == p).then_some(*v))
                        .ok_or_else(|| TemplateError::MissingPlaceholder {
                            template: self.name.clone(),
                            placeholder: p.clone(),
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_render_fills_placeholders() {
        let t = PromptTemplate::parse("qa", "Context:\n{context}\nQuestion: {query}")
            .unwrap_or_else(|_| unreachable!());
        let out = t
            .render(&[("query", "Who regulates?"), ("context", "IRDAI")])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(out, "Context:\nIRDAI\nQuestion: Who regulates?");
    }

    #[test]
    fn test_missing_value_fails() {
        let t = PromptTemplate::parse("qa", "{context} {query}").unwrap_or_else(|_| unreachable!());
        let err = t.render(&[("query", "q")]);
        assert_eq!(
            err,
            Err(TemplateError::MissingPlaceholder {
                template: "qa".to_string(),
                placeholder: "context".to_string(),
            })
        );
    }

    #[test]
    fn test_escaped_braces_are_literal() {
        let t = PromptTemplate::parse("json", r#"Return {{"items": []}} for {query}"#)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(t.placeholders(), vec!["query"]);
        let out = t.render(&[("query", "x")]).unwrap_or_else(|_| unreachable!());
        assert_eq!(out, r#"Return {"items": []} for x"#);
    }

    #[test]
    fn test_placeholders_deduplicated_in_order() {
        let t = PromptTemplate::parse("t", "{b}{a}{b}").unwrap_or_else(|_| unreachable!());
        assert_eq!(t.placeholders(), vec!["b", "a"]);
    }

    #[test]
    fn test_require_reports_missing() {
        let t = PromptTemplate::parse("react", "{tools}").unwrap_or_else(|_| unreachable!());
        assert!(t.require(&["tools"]).is_ok());
        assert!(matches!(
            t.require(&["tools", "tool_names"]),
            Err(TemplateError::MissingRequired { ref placeholder, .. }) if placeholder == "tool_names"
        ));
    }

    #[test]
    fn test_allow_only_rejects_unsupplied_placeholders() {
        let t = PromptTemplate::parse("react_user", "{input}{intermediate_steps}")
            .unwrap_or_else(|_| unreachable!());
        assert!(t.allow_only(&["input", "intermediate_steps"]).is_ok());
        assert!(matches!(
            t.allow_only(&["input", "agent_scratchpad"]),
            Err(TemplateError::UnknownPlaceholder { ref placeholder, .. })
                if placeholder == "intermediate_steps"
        ));
    }

    #[test_case("open {query" ; "unclosed brace")]
    #[test_case("stray } brace" ; "unmatched close")]
    #[test_case("{not valid}" ; "space in name")]
    #[test_case(r#"{"items": []}"# ; "unescaped json")]
    #[test_case("{}" ; "empty name")]
    fn test_syntax_errors(source: &str) {
        assert!(matches!(
            PromptTemplate::parse("t", source),
            Err(TemplateError::Syntax { .. })
        ));
    }
}
