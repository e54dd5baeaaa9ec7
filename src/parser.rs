use crate::error::{ConfigError, ParseError};
use crate::include::IncludeResolver;
use crate::lexer::{Lexer, Token, TokenType};
use crate::setting::{Format, Setting};
use crate::value::Value;
use log::debug;
use miette::{NamedSource, SourceSpan};

/// Deepest nesting of groups, arrays and lists the parser accepts.
pub const MAX_DEPTH: usize = 256;

/// Deepest chain of `@include` directives the parser follows.
pub const MAX_INCLUDE_DEPTH: usize = 10;

/// A recursive descent parser that builds a [`Setting`] tree.
///
/// The whole input is tokenized up front, with included files spliced in
/// place, so parsing itself never touches I/O.
pub struct Parser<'a> {
    sources: Vec<NamedSource<String>>,
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
    includes: Option<&'a dyn IncludeResolver>,
}

impl<'a> Parser<'a> {
    pub fn new(source_text: &str) -> Result<Self, ConfigError> {
        Self::new_with_name(source_text, "<input>".to_string())
    }

    /// A parser that reports errors against `name`. `@include` is rejected.
    pub fn new_with_name(source_text: &str, name: String) -> Result<Self, ConfigError> {
        Self::build(source_text, name, None)
    }

    /// A parser that loads `@include` files through `includes`.
    pub fn with_includes(
        source_text: &str,
        name: String,
        includes: &'a dyn IncludeResolver,
    ) -> Result<Self, ConfigError> {
        Self::build(source_text, name, Some(includes))
    }

    fn build(
        source_text: &str,
        name: String,
        includes: Option<&'a dyn IncludeResolver>,
    ) -> Result<Self, ConfigError> {
        let mut parser = Self {
            sources: Vec::new(),
            tokens: Vec::new(),
            position: 0,
            depth: 0,
            includes,
        };
        let mut tokens = Vec::new();
        parser.tokenize(source_text, name, 0, &mut tokens)?;
        parser.tokens = tokens;
        Ok(parser)
    }

    /// Lexes one source into `out`, recursing into includes. Only the
    /// outermost source contributes its `Eof` token.
    fn tokenize(
        &mut self,
        text: &str,
        name: String,
        include_depth: usize,
        out: &mut Vec<Token>,
    ) -> Result<(), ConfigError> {
        let index = self.sources.len();
        self.sources
            .push(NamedSource::new(name.clone(), text.to_string()));

        for token in Lexer::with_name(text, name.clone()) {
            let mut token = token?;
            token.source = index;
            if let TokenType::Include(path) = &token.ttype {
                let path = path.clone();
                let Some(includes) = self.includes else {
                    return Err(self.include_error(&token, path, "includes are not enabled"));
                };
                if include_depth >= MAX_INCLUDE_DEPTH {
                    return Err(self.include_error(
                        &token,
                        path,
                        &format!("includes nested deeper than {MAX_INCLUDE_DEPTH}"),
                    ));
                }
                let included = includes
                    .load(&path)
                    .map_err(|e| self.include_error(&token, path.clone(), &e.to_string()))?;
                debug!("including `{}` from {}:{}", included.name, name, token.line);
                self.tokenize(&included.text, included.name, include_depth + 1, out)?;
                continue;
            }
            if include_depth > 0 && token.ttype == TokenType::Eof {
                break;
            }
            out.push(token);
        }
        Ok(())
    }

    fn include_error(&self, token: &Token, path: String, reason: &str) -> ConfigError {
        ParseError::Include {
            src: self.sources[token.source].clone(),
            span: span_of(token),
            path,
            reason: reason.to_string(),
            line: token.line,
        }
        .into()
    }

    // === Main Parsing Methods ===

    ///    Document ::= { Setting } EOF
    pub fn parse_document(&mut self) -> Result<Setting, ConfigError> {
        let mut children = Vec::new();
        while !self.check(TokenType::Eof) {
            self.parse_setting(&mut children)?;
        }
        self.expect(TokenType::Eof)?;
        debug!(
            "parsed {} top-level settings from {}",
            children.len(),
            self.sources.first().map_or("<input>", |s| s.name())
        );
        Ok(Setting::group(children))
    }

    /// Setting ::= Name ( ":" | "=" ) Value [ ";" | "," ]
    fn parse_setting(&mut self, siblings: &mut Vec<Setting>) -> Result<(), ConfigError> {
        let name_token = self.current_token()?.clone();
        let name = match &name_token.ttype {
            TokenType::Identifier(name) => name.clone(),
            _ => return self.err_unexpected("a setting name"),
        };
        if siblings.iter().any(|s| s.name() == Some(name.as_str())) {
            return Err(ParseError::DuplicateSetting {
                src: self.source_of(&name_token),
                span: span_of(&name_token),
                name,
                line: name_token.line,
            }
            .into());
        }
        self.advance();

        if !self.match_token(TokenType::Equals) && !self.match_token(TokenType::Colon) {
            return self.err_unexpected("'=' or ':' after setting name");
        }

        let value = self.parse_value()?;

        if !self.match_token(TokenType::Semicolon) {
            self.match_token(TokenType::Comma);
        }

        siblings.push(value.with_name(name).with_line(name_token.line));
        Ok(())
    }

    /// Value ::= Scalar | Group | Array | List
    fn parse_value(&mut self) -> Result<Setting, ConfigError> {
        let token = self.current_token()?.clone();
        match &token.ttype {
            TokenType::LBrace => self.parse_group(),
            TokenType::LBracket => self.parse_array(),
            TokenType::LParen => self.parse_list(),
            t if t.is_scalar() => self.parse_scalar(),
            _ => self.err_unexpected("a value"),
        }
    }

    /// Group ::= "{" { Setting } "}"
    fn parse_group(&mut self) -> Result<Setting, ConfigError> {
        let start_token = self.current_token()?.clone();
        self.expect(TokenType::LBrace)?;
        self.enter(&start_token)?;
        let mut children = Vec::new();
        while !self.check(TokenType::RBrace) {
            if self.check(TokenType::Eof) {
                return self.err_unexpected("'}'");
            }
            self.parse_setting(&mut children)?;
        }
        self.expect(TokenType::RBrace)?;
        self.leave();
        Ok(Setting::group(children).with_line(start_token.line))
    }

    /// Array ::= "[" [ Scalar { "," Scalar } ] "]"
    fn parse_array(&mut self) -> Result<Setting, ConfigError> {
        let start_token = self.current_token()?.clone();
        self.expect(TokenType::LBracket)?;
        self.enter(&start_token)?;
        let mut elements: Vec<Setting> = Vec::new();
        if !self.check(TokenType::RBracket) {
            loop {
                let element_token = self.current_token()?.clone();
                match &element_token.ttype {
                    t if t.is_scalar() => {}
                    TokenType::LBrace | TokenType::LBracket | TokenType::LParen => {
                        return Err(ParseError::NonScalarInArray {
                            src: self.source_of(&element_token),
                            span: span_of(&element_token),
                            found: element_token.ttype.to_string(),
                            line: element_token.line,
                        }
                        .into());
                    }
                    _ => return self.err_unexpected("a scalar value"),
                }
                let element = self.parse_scalar()?;
                if let Some(first) = elements.first() {
                    if first.setting_type() != element.setting_type() {
                        return Err(ParseError::ArrayTypeMismatch {
                            src: self.source_of(&element_token),
                            span: span_of(&element_token),
                            expected: first.setting_type().to_string(),
                            found: element.setting_type().to_string(),
                            line: element_token.line,
                        }
                        .into());
                    }
                }
                elements.push(element);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RBracket)?;
        self.leave();
        Ok(Setting::array(elements).with_line(start_token.line))
    }

    /// List ::= "(" [ Value { "," Value } ] ")"
    fn parse_list(&mut self) -> Result<Setting, ConfigError> {
        let start_token = self.current_token()?.clone();
        self.expect(TokenType::LParen)?;
        self.enter(&start_token)?;
        let mut elements = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                elements.push(self.parse_value()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RParen)?;
        self.leave();
        Ok(Setting::list(elements).with_line(start_token.line))
    }

    /// Scalar ::= Integer | Float | String { String } | Boolean
    fn parse_scalar(&mut self) -> Result<Setting, ConfigError> {
        let token = self.current_token()?.clone();
        let setting = match &token.ttype {
            TokenType::Integer { value, hex } => {
                self.advance();
                let format = if *hex {
                    Format::Hexadecimal
                } else {
                    Format::Default
                };
                Setting::scalar(Value::Int(*value)).with_format(format)
            }
            TokenType::Float(f) => {
                self.advance();
                Setting::scalar(Value::Float(*f))
            }
            TokenType::Boolean(b) => {
                self.advance();
                Setting::scalar(Value::Boolean(*b))
            }
            TokenType::String(s) => {
                self.advance();
                let mut text = s.clone();
                // Adjacent string literals concatenate.
                loop {
                    let next = match &self.current_token()?.ttype {
                        TokenType::String(next) => next.clone(),
                        _ => break,
                    };
                    text.push_str(&next);
                    self.advance();
                }
                Setting::scalar(Value::String(text))
            }
            _ => return self.err_unexpected("a scalar value"),
        };
        Ok(setting.with_line(token.line))
    }

    fn enter(&mut self, token: &Token) -> Result<(), ConfigError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::NestingTooDeep {
                src: self.source_of(token),
                span: span_of(token),
                limit: MAX_DEPTH,
                line: token.line,
            }
            .into());
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // === Tokenizer Helper Methods ===

    fn current_token(&self) -> Result<&Token, ConfigError> {
        self.tokens.get(self.position).ok_or_else(|| {
            let src = self
                .sources
                .first()
                .cloned()
                .unwrap_or_else(|| NamedSource::new("<input>", String::new()));
            ParseError::UnexpectedEof {
                src,
                span: (0, 0).into(),
                expected: "more input".to_string(),
                line: self.tokens.last().map_or(1, |t| t.line),
            }
            .into()
        })
    }

    fn source_of(&self, token: &Token) -> NamedSource<String> {
        self.sources[token.source].clone()
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: TokenType) -> Result<(), ConfigError> {
        if self.check(expected.clone()) {
            self.advance();
            Ok(())
        } else {
            self.err_unexpected(&expected.to_string())
        }
    }

    fn match_token(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, ttype: TokenType) -> bool {
        if let Ok(token) = self.current_token() {
            std::mem::discriminant(&token.ttype) == std::mem::discriminant(&ttype)
        } else {
            false
        }
    }

    fn err_unexpected<T>(&self, expected: &str) -> Result<T, ConfigError> {
        let token = self.current_token()?;
        let error = if token.ttype == TokenType::Eof {
            ParseError::UnexpectedEof {
                src: self.source_of(token),
                span: span_of(token),
                expected: expected.to_string(),
                line: token.line,
            }
        } else {
            ParseError::UnexpectedToken {
                src: self.source_of(token),
                span: span_of(token),
                expected: expected.to_string(),
                found: token.ttype.to_string(),
                line: token.line,
            }
        };
        Err(error.into())
    }
}

fn span_of(token: &Token) -> SourceSpan {
    (token.pos_start, token.pos_end - token.pos_start).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include::IncludedSource;
    use crate::setting::SettingType;
    use miette::Report;
    use std::collections::HashMap;
    use std::io;

    fn parse_ok(source: &str) -> Setting {
        let mut parser = Parser::new_with_name(source, "test.cfg".to_string()).unwrap();
        match parser.parse_document() {
            Ok(doc) => doc,
            Err(err) => {
                let report = Report::from(err);
                panic!("{:?}", report);
            }
        }
    }

    fn parse_err(source: &str) -> ParseError {
        let result = Parser::new(source).and_then(|mut p| p.parse_document());
        match result {
            Err(ConfigError::Parse(e)) => e,
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    struct MemoryIncludes(HashMap<&'static str, &'static str>);

    impl IncludeResolver for MemoryIncludes {
        fn load(&self, path: &str) -> io::Result<IncludedSource> {
            self.0
                .get(path)
                .map(|text| IncludedSource {
                    name: path.to_string(),
                    text: text.to_string(),
                })
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }

    #[test]
    fn test_empty_document() {
        let root = parse_ok("");
        assert!(root.is_group());
        assert!(root.is_empty());
        assert!(parse_ok("  # only a comment\n").is_empty());
    }

    #[test]
    fn test_simple_settings() {
        let root = parse_ok(r#"name = "value"; count: 3, ratio = 0.5; on = TRUE"#);
        assert_eq!(root.len(), 4);
        assert_eq!(root.get("name").unwrap().as_str().unwrap(), "value");
        assert_eq!(root.get("count").unwrap().as_int().unwrap(), 3);
        assert_eq!(root.get("ratio").unwrap().as_float().unwrap(), 0.5);
        assert!(root.get("on").unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_server_example() {
        let root =
            parse_ok(r#"server = { port = 8080; host = "localhost"; flags = [1,2,3]; };"#);
        assert_eq!(root.len(), 1);
        let server = root.get("server").unwrap();
        assert!(server.is_group());
        assert_eq!(server.get("port").unwrap().as_int().unwrap(), 8080);
        assert_eq!(server.get("host").unwrap().as_str().unwrap(), "localhost");
        let flags = server.get("flags").unwrap();
        assert!(flags.is_array());
        let values: Vec<i64> = flags.children().map(|c| c.as_int().unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_lists_are_heterogeneous() {
        let root = parse_ok(r#"l = ( 1, "two", 3.0, { x = 1; }, [ true ], ( ) );"#);
        let l = root.get("l").unwrap();
        assert!(l.is_list());
        let kinds: Vec<SettingType> = l.children().map(Setting::setting_type).collect();
        assert_eq!(
            kinds,
            vec![
                SettingType::Int,
                SettingType::String,
                SettingType::Float,
                SettingType::Group,
                SettingType::Array,
                SettingType::List,
            ]
        );
        assert_eq!(l.at(0).unwrap().name(), None);
    }

    #[test]
    fn test_hex_sets_format() {
        let root = parse_ok("mask = 0xFF; plain = 255;");
        assert_eq!(root.get("mask").unwrap().format(), Format::Hexadecimal);
        assert_eq!(root.get("plain").unwrap().format(), Format::Default);
        assert_eq!(root.get("mask").unwrap(), root.get("mask").unwrap());
        assert_eq!(root.get("mask").unwrap().as_int().unwrap(), 255);
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        let root = parse_ok("s = \"hello, \"\n    \"world\";");
        assert_eq!(root.get("s").unwrap().as_str().unwrap(), "hello, world");
    }

    #[test]
    fn test_terminators_are_optional() {
        let root = parse_ok("a = 1 b = 2; c = { d = 3 }, e = [ ]");
        assert_eq!(root.len(), 4);
        assert!(root.lookup("e").unwrap().is_empty());
    }

    #[test]
    fn test_source_lines_are_recorded() {
        let root = parse_ok("a = 1;\n\ngroup = {\n  inner = \"x\";\n};");
        assert_eq!(root.get("a").unwrap().source_line(), Some(1));
        assert_eq!(root.get("group").unwrap().source_line(), Some(3));
        assert_eq!(root.lookup("group.inner").unwrap().source_line(), Some(4));
    }

    #[test]
    fn test_duplicate_names_fail_immediately() {
        let err = parse_err("a = 1;\nb = { x = 1; x = 2; };");
        assert!(matches!(err, ParseError::DuplicateSetting { ref name, line: 2, .. } if name == "x"));
        // the same name in different groups is fine
        parse_ok("x = 1; g = { x = 2; };");
    }

    #[test]
    fn test_array_type_mismatch_cites_the_element_line() {
        let err = parse_err("arr = [ 1,\n 2,\n \"three\" ];");
        match err {
            ParseError::ArrayTypeMismatch {
                expected,
                found,
                line,
                ..
            } => {
                assert_eq!(expected, "int");
                assert_eq!(found, "string");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            parse_err("arr = [ 1, 2.0 ];"),
            ParseError::ArrayTypeMismatch { .. }
        ));
    }

    #[test]
    fn test_arrays_reject_composites() {
        assert!(matches!(
            parse_err("arr = [ { a = 1; } ];"),
            ParseError::NonScalarInArray { .. }
        ));
        assert!(matches!(
            parse_err("arr = [ [1] ];"),
            ParseError::NonScalarInArray { .. }
        ));
    }

    #[test]
    fn test_grammar_violations() {
        assert!(matches!(parse_err("= 1;"), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("a 1;"), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("a = ;"), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("a = { b = 1;"), ParseError::UnexpectedEof { .. }));
        assert!(matches!(parse_err("a = [1, 2"), ParseError::UnexpectedEof { .. }));
        assert!(matches!(parse_err("a = (1,)"), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("a = [1,]"), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("a = 1;;"), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("a = 1; }"), ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_error_line_and_message() {
        let err = parse_err("a = 1;\nb = 2;\nc = ;");
        assert_eq!(err.line(), 3);
        assert!(err.message().starts_with("line 3:"));
    }

    #[test]
    fn test_lex_errors_surface_from_new() {
        let result = Parser::new("a = \"open");
        assert!(matches!(result, Err(ConfigError::Lex(ref e)) if e.line == 1));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("a = {}{};", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(parse_err(&deep), ParseError::NestingTooDeep { .. }));
        let ok = format!("a = {}{};", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        parse_ok(&ok);
    }

    #[test]
    fn test_include_without_resolver_fails() {
        assert!(matches!(
            parse_err("@include \"other.cfg\"\n"),
            ParseError::Include { .. }
        ));
    }

    #[test]
    fn test_includes_are_spliced_in_place() {
        let includes = MemoryIncludes(HashMap::from([
            ("common.cfg", "shared = 1;\n@include \"nested.cfg\"\n"),
            ("nested.cfg", "deep = \"yes\";"),
        ]));
        let source = "first = 0;\n@include \"common.cfg\"\nlast = 2;";
        let mut parser = Parser::with_includes(source, "main.cfg".into(), &includes).unwrap();
        let root = parser.parse_document().unwrap();
        let names: Vec<&str> = root.children().filter_map(Setting::name).collect();
        assert_eq!(names, vec!["first", "shared", "deep", "last"]);
    }

    #[test]
    fn test_include_failures() {
        let includes = MemoryIncludes(HashMap::from([("loop.cfg", "@include \"loop.cfg\"\n")]));
        let result = Parser::with_includes("@include \"loop.cfg\"", "main.cfg".into(), &includes);
        assert!(matches!(
            result,
            Err(ConfigError::Parse(ParseError::Include { ref reason, .. })) if reason.contains("deeper")
        ));

        let result = Parser::with_includes("@include \"missing.cfg\"", "main.cfg".into(), &includes);
        assert!(matches!(
            result,
            Err(ConfigError::Parse(ParseError::Include { ref path, line: 1, .. })) if path == "missing.cfg"
        ));
    }

    #[test]
    fn test_errors_in_included_files_name_that_file() {
        let includes = MemoryIncludes(HashMap::from([("bad.cfg", "ok = 1;\nbroken = ;")]));
        let mut parser =
            Parser::with_includes("@include \"bad.cfg\"", "main.cfg".into(), &includes).unwrap();
        match parser.parse_document() {
            Err(ConfigError::Parse(ParseError::UnexpectedToken { src, line, .. })) => {
                assert_eq!(src.name(), "bad.cfg");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
