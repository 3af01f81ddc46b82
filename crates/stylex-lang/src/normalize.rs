const QUOTES: [char; 3] = ['"', '\'', '`'];

#[derive(Clone, Copy)]
enum State {
    Code,
    /// Inside a literal opened by a bare quote; escapes belong to the lexer.
    Literal(char),
    /// Inside a literal opened by an escaped quote (`\"`); an escaped quote closes it.
    EscapedLiteral(char),
}

/// Removes the escaping that embedding an expression in a quoted
/// configuration string adds.
///
/// A backslash in front of a quote is dropped when that quote opens or closes
/// a string literal, as in `\"a\" + b`. Inside a literal opened by a plain
/// quote, escapes such as `'it\'s'` are left for the lexer. Every other
/// backslash, such as the one in a `\d` regex class, is kept.
pub fn normalize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut state = State::Code;

    while let Some(c) = chars.next() {
        let next = chars.peek().copied();

        state = match (state, c, next) {
            (_, '\\', Some('\\')) => {
                chars.next();
                normalized.push_str("\\\\");
                state
            }
            (State::Code, '\\', Some(q)) if QUOTES.contains(&q) => {
                chars.next();
                normalized.push(q);
                State::EscapedLiteral(q)
            }
            (State::Code, q, _) if QUOTES.contains(&q) => {
                normalized.push(q);
                State::Literal(q)
            }
            (State::Literal(quote), '\\', Some(escaped)) => {
                chars.next();
                normalized.push('\\');
                normalized.push(escaped);
                State::Literal(quote)
            }
            (State::Literal(quote), c, _) if c == quote => {
                normalized.push(c);
                State::Code
            }
            (State::EscapedLiteral(quote), '\\', Some(q)) if q == quote => {
                chars.next();
                normalized.push(q);
                State::Code
            }
            // A bare quote of the enclosing kind is text, not the end of the literal.
            (State::EscapedLiteral(quote), c, _) if c == quote => {
                normalized.push('\\');
                normalized.push(c);
                state
            }
            (state, c, _) => {
                normalized.push(c);
                state
            }
        };
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("a + 1", "a + 1")]
    #[case::double_quote(r#"\"a\" + b"#, r#""a" + b"#)]
    #[case::single_quote(r"\'x\'", "'x'")]
    #[case::backtick(r"\`x\`", "`x`")]
    #[case::regex_class(r"name =~ '\d+'", r"name =~ '\d+'")]
    #[case::escaped_backslash(r"'a\\' + b", r"'a\\' + b")]
    #[case::trailing_backslash(r"a\", r"a\")]
    #[case::escaped_quote_in_literal(r"'it\'s'", r"'it\'s'")]
    #[case::escaped_double_quote_in_literal(r#""say \"hi\"""#, r#""say \"hi\"""#)]
    #[case::other_quote_in_escaped_literal(r#"\"it's\" + a"#, r#""it's" + a"#)]
    #[case::bare_quote_in_escaped_literal(r#"\"a"b\""#, r#""a\"b""#)]
    #[case::escaped_literals_then_plain(r#"\"a\" + 'b\'c'"#, r#""a" + 'b\'c'"#)]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }
}
