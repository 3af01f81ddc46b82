pub mod error;
pub mod token;

use error::LexerError;
use nom::{
    IResult, Input, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, one_of},
    combinator::{map, map_res, opt, recognize},
    error::ErrorKind,
    multi::many0,
    sequence::{pair, preceded, terminated},
};
use smol_str::SmolStr;
use token::{Token, TokenKind};

use crate::number::Number;
use crate::range::{Position, Range, Span};

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: span.into(),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

/// Splits expression text into tokens.
///
/// Operator symbols are configured per lexer so that parsers with custom
/// binary operators tokenize them as single units; symbols are matched
/// longest first.
#[derive(Debug, Clone)]
pub struct Lexer {
    operators: Vec<SmolStr>,
}

impl Lexer {
    pub fn new(operators: impl IntoIterator<Item = SmolStr>) -> Self {
        let mut operators: Vec<SmolStr> = operators.into_iter().collect();
        operators.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        operators.dedup();
        Self { operators }
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexerError> {
        match tokens(Span::new(input), &self.operators) {
            Ok((rest, mut tokens)) => match rest.fragment().chars().next() {
                Some(c) => Err(LexerError::UnexpectedCharacter(single_char_range(rest), c)),
                None => {
                    let eof: Position = rest.into();
                    tokens.push(Token {
                        range: Range::new(eof, eof),
                        kind: TokenKind::Eof,
                    });
                    Ok(tokens)
                }
            },
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let range = single_char_range(e.input);
                match e.input.fragment().chars().next() {
                    Some('"' | '\'') => Err(LexerError::UnterminatedString(range)),
                    Some(c) => Err(LexerError::UnexpectedCharacter(range, c)),
                    None => Err(LexerError::UnterminatedString(range)),
                }
            }
            Err(nom::Err::Incomplete(_)) => unreachable!(),
        }
    }
}

fn single_char_range(span: Span) -> Range {
    let start: Position = span.into();
    Range::new(start, Position::new(start.line, start.column + 1))
}

define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(l_bracket, "[", TokenKind::LBracket);
define_token_parser!(r_bracket, "]", TokenKind::RBracket);
define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(dot, ".", TokenKind::Dot);
define_token_parser!(question, "?", TokenKind::Question);
define_token_parser!(colon, ":", TokenKind::Colon);

fn punctuations(input: Span) -> IResult<Span, Token> {
    alt((l_paren, r_paren, l_bracket, r_bracket, comma, dot, question, colon)).parse(input)
}

fn exponent(input: Span) -> IResult<Span, Span> {
    recognize((one_of("eE"), opt(one_of("+-")), digit1)).parse(input)
}

fn number_literal(input: Span) -> IResult<Span, Token> {
    map_res(
        alt((
            recognize((digit1, opt(pair(char('.'), digit1)), opt(exponent))),
            recognize((char('.'), digit1, opt(exponent))),
        )),
        |span: Span| {
            span.fragment().parse::<f64>().map(|n| Token {
                range: span.into(),
                kind: TokenKind::NumberLiteral(Number::new(n)),
            })
        },
    )
    .parse(input)
}

// Unknown escapes keep their backslash so regex patterns such as '\d+' survive.
fn string_literal(input: Span) -> IResult<Span, Token> {
    let mut chars = input.fragment().char_indices();

    let quote = match chars.next() {
        Some((_, c @ ('"' | '\''))) => c,
        _ => return Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Char))),
    };
    let mut value = String::new();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, 't')) => value.push('\t'),
                Some((_, escaped @ ('\\' | '"' | '\''))) => value.push(escaped),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            c if c == quote => {
                let (rest, span) = input.take_split(i + c.len_utf8());
                return Ok((
                    rest,
                    Token {
                        range: span.into(),
                        kind: TokenKind::StringLiteral(value),
                    },
                ));
            }
            c => value.push(c),
        }
    }

    Err(nom::Err::Failure(nom::error::Error::new(input, ErrorKind::Char)))
}

fn ident(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"), tag("$"))),
            many0(alt((alphanumeric1, tag("_"), tag("$")))),
        )),
        |span: Span| Token {
            range: span.into(),
            kind: TokenKind::Ident(SmolStr::new(span.fragment())),
        },
    )
    .parse(input)
}

fn operator<'a>(input: Span<'a>, operators: &[SmolStr]) -> IResult<Span<'a>, Token> {
    for op in operators {
        let matched: IResult<Span<'a>, Span<'a>> = tag(op.as_str()).parse(input);

        if let Ok((rest, span)) = matched {
            return Ok((
                rest,
                Token {
                    range: span.into(),
                    kind: TokenKind::Operator(op.clone()),
                },
            ));
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Tag)))
}

fn token<'a>(input: Span<'a>, operators: &[SmolStr]) -> IResult<Span<'a>, Token> {
    alt((
        number_literal,
        punctuations,
        string_literal,
        ident,
        |input: Span<'a>| operator(input, operators),
    ))
    .parse(input)
}

fn tokens<'a>(input: Span<'a>, operators: &[SmolStr]) -> IResult<Span<'a>, Vec<Token>> {
    preceded(
        multispace0,
        many0(terminated(
            |input: Span<'a>| token(input, operators),
            multispace0,
        )),
    )
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lexer() -> Lexer {
        Lexer::new(
            ["+", "-", "*", "/", "%", "!", "==", "!=", "<", "<=", ">", ">=", "&&", "||", "=~", "!~"]
                .into_iter()
                .map(SmolStr::new),
        )
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lexer()
            .tokenize(input)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn op(symbol: &str) -> TokenKind {
        TokenKind::Operator(SmolStr::new(symbol))
    }

    #[rstest]
    #[case::arithmetic("1 + 2.5*3", vec![
        TokenKind::NumberLiteral(1.0.into()),
        op("+"),
        TokenKind::NumberLiteral(2.5.into()),
        op("*"),
        TokenKind::NumberLiteral(3.0.into()),
        TokenKind::Eof])]
    #[case::longest_operator_first("a!=b !~ c !d", vec![
        TokenKind::Ident("a".into()),
        op("!="),
        TokenKind::Ident("b".into()),
        op("!~"),
        TokenKind::Ident("c".into()),
        op("!"),
        TokenKind::Ident("d".into()),
        TokenKind::Eof])]
    #[case::member_and_index("a[0].b", vec![
        TokenKind::Ident("a".into()),
        TokenKind::LBracket,
        TokenKind::NumberLiteral(0.0.into()),
        TokenKind::RBracket,
        TokenKind::Dot,
        TokenKind::Ident("b".into()),
        TokenKind::Eof])]
    #[case::leading_dot_number(".5e1", vec![TokenKind::NumberLiteral(5.0.into()), TokenKind::Eof])]
    #[case::strings(r#"'a\'b' "c\"d" 'x\d'"#, vec![
        TokenKind::StringLiteral("a'b".to_string()),
        TokenKind::StringLiteral("c\"d".to_string()),
        TokenKind::StringLiteral("x\\d".to_string()),
        TokenKind::Eof])]
    #[case::ternary("a ? 'y' : \"\"", vec![
        TokenKind::Ident("a".into()),
        TokenKind::Question,
        TokenKind::StringLiteral("y".to_string()),
        TokenKind::Colon,
        TokenKind::StringLiteral(String::new()),
        TokenKind::Eof])]
    #[case::empty("   ", vec![TokenKind::Eof])]
    fn test_tokenize(#[case] input: &str, #[case] expected: Vec<TokenKind>) {
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn test_token_range() {
        let tokens = lexer().tokenize("ab + 'cd'").unwrap();
        assert_eq!(tokens[0].range, Range::new(Position::new(1, 1), Position::new(1, 3)));
        assert_eq!(tokens[2].range, Range::new(Position::new(1, 6), Position::new(1, 10)));
        assert_eq!(tokens[3].range, Range::new(Position::new(1, 10), Position::new(1, 10)));
    }

    #[rstest]
    #[case::unknown_char("1 # 2", LexerError::UnexpectedCharacter(Range::new(Position::new(1, 3), Position::new(1, 4)), '#'))]
    #[case::single_equal("a = 1", LexerError::UnexpectedCharacter(Range::new(Position::new(1, 3), Position::new(1, 4)), '='))]
    #[case::unterminated("'abc", LexerError::UnterminatedString(Range::new(Position::new(1, 1), Position::new(1, 2))))]
    fn test_tokenize_error(#[case] input: &str, #[case] expected: LexerError) {
        assert_eq!(lexer().tokenize(input), Err(expected));
    }

    #[test]
    fn test_custom_operator_is_configurable() {
        let lexer = Lexer::new([SmolStr::new("+"), SmolStr::new("**")]);
        let kinds: Vec<_> = lexer
            .tokenize("2 ** 3")
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect();
        assert_eq!(kinds[1], op("**"));
        assert!(lexer.tokenize("a =~ b").is_err());
    }
}
