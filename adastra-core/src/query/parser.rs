//! # 过滤表达式解析器
//!
//! 递归下降解析器，语法接近 SQL `WHERE` 子句。

use crate::error::FilterError;
use crate::query::expr::{CompareOp, Expr, Value};

/// 解析过滤表达式字符串
///
/// 支持的语法:
/// - 字面量: `'string'`, `"string"`, `42`, `-0.5`, `true`, `false`, `null`
/// - 列: `speaker`, `is_read`
/// - 比较: `=`, `==`, `!=`, `<>`, `<`, `<=`, `>`, `>=`
/// - 集合/模式: `speaker in ('cato', 'cassius')`, `line like '%sea%'`
/// - 空值: `speaker is null`, `speaker is not null`
/// - 逻辑: `expr and expr`, `expr or expr`, `not expr`
/// - 括号: `(expr)`
pub fn parse_expression(input: &str) -> Result<Expr, FilterError> {
    let mut parser = ExprParser::new(input);
    parser.skip_whitespace();
    if parser.remaining().is_empty() {
        return Err(FilterError::UnexpectedEnd {
            message: "空表达式".to_string(),
        });
    }

    let expr = parser.parse_or()?;
    parser.skip_whitespace();
    if !parser.remaining().is_empty() {
        return Err(parser.error(format!(
            "表达式末尾存在无法解析的内容: '{}'",
            parser.remaining()
        )));
    }
    Ok(expr)
}

/// 表达式解析器
struct ExprParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> FilterError {
        FilterError::InvalidSyntax {
            position: self.pos,
            message: message.into(),
        }
    }

    fn unexpected_end(message: impl Into<String>) -> FilterError {
        FilterError::UnexpectedEnd {
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.remaining();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// 是否以关键字开头（大小写不敏感，且关键字后是边界）
    fn starts_with_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        if remaining.len() < keyword.len()
            || !remaining.is_char_boundary(keyword.len())
            || !remaining[..keyword.len()].eq_ignore_ascii_case(keyword)
        {
            return false;
        }
        let after = &remaining[keyword.len()..];
        !after.starts_with(|c: char| c.is_alphanumeric() || c == '_')
    }

    fn consume_keyword(&mut self, keyword: &str) {
        self.pos += keyword.len();
        self.skip_whitespace();
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), FilterError> {
        self.skip_whitespace();
        if self.starts_with_keyword(keyword) {
            self.consume_keyword(keyword);
            Ok(())
        } else {
            Err(self.error(format!("期望关键字 '{}'", keyword)))
        }
    }

    /// 解析 or 表达式（最低优先级）
    fn parse_or(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_and()?;

        loop {
            self.skip_whitespace();
            if self.starts_with_keyword("or") {
                self.consume_keyword("or");
                let right = self.parse_and()?;
                left = Expr::or(left, right);
            } else {
                break;
            }
        }

        Ok(left)
    }

    /// 解析 and 表达式
    fn parse_and(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_not()?;

        loop {
            self.skip_whitespace();
            if self.starts_with_keyword("and") {
                self.consume_keyword("and");
                let right = self.parse_not()?;
                left = Expr::and(left, right);
            } else {
                break;
            }
        }

        Ok(left)
    }

    /// 解析 not 表达式
    fn parse_not(&mut self) -> Result<Expr, FilterError> {
        self.skip_whitespace();
        if self.starts_with_keyword("not") {
            self.consume_keyword("not");
            let expr = self.parse_not()?;
            Ok(Expr::not(expr))
        } else {
            self.parse_predicate()
        }
    }

    /// 解析谓词：比较、in、like、is null
    fn parse_predicate(&mut self) -> Result<Expr, FilterError> {
        let left = self.parse_primary()?;
        self.skip_whitespace();

        if let Some(op) = self.parse_compare_op() {
            self.skip_whitespace();
            let right = self.parse_primary()?;
            return Ok(Expr::compare(op, left, right));
        }

        if self.starts_with_keyword("is") {
            self.consume_keyword("is");
            let negated = self.starts_with_keyword("not");
            if negated {
                self.consume_keyword("not");
            }
            self.expect_keyword("null")?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        // `not in` / `not like`：先试探，不匹配则回退
        let checkpoint = self.pos;
        let negated = self.starts_with_keyword("not");
        if negated {
            self.consume_keyword("not");
        }

        if self.starts_with_keyword("in") {
            self.consume_keyword("in");
            let list = self.parse_list()?;
            return Ok(Expr::In {
                expr: Box::new(left),
                list,
                negated,
            });
        }

        if self.starts_with_keyword("like") {
            self.consume_keyword("like");
            let pattern = match self.parse_literal()? {
                Value::String(s) => s,
                other => {
                    return Err(self.error(format!(
                        "like 需要字符串模式，实际为 {}",
                        other.type_name()
                    )));
                }
            };
            return Ok(Expr::Like {
                expr: Box::new(left),
                pattern,
                negated,
            });
        }

        self.pos = checkpoint;
        Ok(left)
    }

    fn parse_compare_op(&mut self) -> Option<CompareOp> {
        // 两字符运算符优先
        let ops = [
            ("==", CompareOp::Eq),
            ("!=", CompareOp::NotEq),
            ("<>", CompareOp::NotEq),
            ("<=", CompareOp::LtEq),
            (">=", CompareOp::GtEq),
            ("=", CompareOp::Eq),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ];
        let (token, op) = ops
            .into_iter()
            .find(|(token, _)| self.remaining().starts_with(token))?;
        self.pos += token.len();
        Some(op)
    }

    /// 解析 `( literal, literal, ... )`
    fn parse_list(&mut self) -> Result<Vec<Value>, FilterError> {
        self.skip_whitespace();
        if self.peek_char() != Some('(') {
            return Err(self.error("in 之后缺少 '('"));
        }
        self.consume_char();

        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek_char() == Some(')') && items.is_empty() {
                self.consume_char();
                return Ok(items);
            }
            items.push(self.parse_literal()?);
            self.skip_whitespace();
            match self.consume_char() {
                Some(',') => continue,
                Some(')') => return Ok(items),
                Some(c) => return Err(self.error(format!("列表中出现意外字符: '{}'", c))),
                None => return Err(Self::unexpected_end("列表缺少右括号 ')'")),
            }
        }
    }

    /// 解析基本表达式
    fn parse_primary(&mut self) -> Result<Expr, FilterError> {
        self.skip_whitespace();

        let c = self
            .peek_char()
            .ok_or_else(|| Self::unexpected_end("期望操作数"))?;

        if c == '(' {
            self.consume_char();
            let expr = self.parse_or()?;
            self.skip_whitespace();
            if self.peek_char() != Some(')') {
                return Err(self.error("缺少右括号 ')'"));
            }
            self.consume_char();
            return Ok(expr);
        }

        if c.is_alphabetic() || c == '_' {
            // 关键字字面量优先于列名
            for (keyword, value) in [
                ("true", Value::Bool(true)),
                ("false", Value::Bool(false)),
                ("null", Value::Null),
            ] {
                if self.starts_with_keyword(keyword) {
                    self.pos += keyword.len();
                    return Ok(Expr::Literal(value));
                }
            }
            let name = self.parse_identifier()?;
            return Ok(Expr::Column(name));
        }

        self.parse_literal().map(Expr::Literal)
    }

    /// 解析字面量
    fn parse_literal(&mut self) -> Result<Value, FilterError> {
        self.skip_whitespace();
        let c = self
            .peek_char()
            .ok_or_else(|| Self::unexpected_end("期望字面量"))?;

        match c {
            '\'' | '"' => self.parse_string_literal(c).map(Value::String),
            c if c.is_ascii_digit() || c == '-' || c == '.' => self.parse_number(),
            _ => {
                for (keyword, value) in [
                    ("true", Value::Bool(true)),
                    ("false", Value::Bool(false)),
                    ("null", Value::Null),
                ] {
                    if self.starts_with_keyword(keyword) {
                        self.pos += keyword.len();
                        return Ok(value);
                    }
                }
                Err(self.error(format!("无法解析表达式，意外字符: '{}'", c)))
            }
        }
    }

    /// 解析标识符
    fn parse_identifier(&mut self) -> Result<String, FilterError> {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }

        if self.pos == start {
            return Err(self.error("期望标识符"));
        }

        Ok(self.input[start..self.pos].to_string())
    }

    /// 解析字符串字面量（连续两个引号表示转义的引号）
    fn parse_string_literal(&mut self, quote: char) -> Result<String, FilterError> {
        self.consume_char(); // 消费开始引号
        let mut value = String::new();

        while let Some(c) = self.consume_char() {
            if c == quote {
                if self.peek_char() == Some(quote) {
                    self.consume_char();
                    value.push(quote);
                    continue;
                }
                return Ok(value);
            }
            value.push(c);
        }

        Err(Self::unexpected_end(format!(
            "字符串字面量未闭合，缺少 '{}'",
            quote
        )))
    }

    /// 解析数字（整数或浮点数）
    fn parse_number(&mut self) -> Result<Value, FilterError> {
        let start = self.pos;

        if self.peek_char() == Some('-') {
            self.consume_char();
        }

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }

        let num_str = &self.input[start..self.pos];
        if num_str.contains('.') {
            num_str
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.error(format!("无法解析数字: '{}'", num_str)))
        } else {
            num_str
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.error(format!("无法解析数字: '{}'", num_str)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse_expression("speaker = 'cato'").unwrap();
        assert_eq!(expr, Expr::eq(Expr::column("speaker"), Expr::string("cato")));

        let expr = parse_expression("speaker == \"cato\"").unwrap();
        assert_eq!(expr, Expr::eq(Expr::column("speaker"), Expr::string("cato")));
    }

    #[test]
    fn test_parse_compare_operators() {
        let cases = [
            ("num_words != 3", CompareOp::NotEq),
            ("num_words <> 3", CompareOp::NotEq),
            ("num_words < 3", CompareOp::Lt),
            ("num_words <= 3", CompareOp::LtEq),
            ("num_words > 3", CompareOp::Gt),
            ("num_words >= 3", CompareOp::GtEq),
        ];
        for (input, op) in cases {
            let expr = parse_expression(input).unwrap();
            assert_eq!(
                expr,
                Expr::compare(op, Expr::column("num_words"), Expr::int(3)),
                "{}",
                input
            );
        }
    }

    #[test]
    fn test_parse_numbers() {
        let expr = parse_expression("sentiment < -0.5").unwrap();
        assert_eq!(
            expr,
            Expr::compare(
                CompareOp::Lt,
                Expr::column("sentiment"),
                Expr::Literal(Value::Float(-0.5))
            )
        );
    }

    #[test]
    fn test_parse_keyword_literals() {
        let expr = parse_expression("is_read = TRUE").unwrap();
        assert_eq!(expr, Expr::eq(Expr::column("is_read"), Expr::bool(true)));

        let expr = parse_expression("speaker = null").unwrap();
        assert_eq!(
            expr,
            Expr::eq(Expr::column("speaker"), Expr::Literal(Value::Null))
        );
    }

    #[test]
    fn test_keyword_prefix_is_still_a_column() {
        // `is_read` 以 `is` 开头，`nothing` 以 `not` 开头
        let expr = parse_expression("is_read").unwrap();
        assert_eq!(expr, Expr::column("is_read"));

        let expr = parse_expression("nothing = 1").unwrap();
        assert_eq!(expr, Expr::eq(Expr::column("nothing"), Expr::int(1)));
    }

    #[test]
    fn test_parse_precedence() {
        // a or b and c == a or (b and c)
        let expr = parse_expression("is_read or is_choice and is_branch").unwrap();
        assert_eq!(
            expr,
            Expr::or(
                Expr::column("is_read"),
                Expr::and(Expr::column("is_choice"), Expr::column("is_branch"))
            )
        );

        let expr = parse_expression("(is_read or is_choice) and not is_branch").unwrap();
        assert_eq!(
            expr,
            Expr::and(
                Expr::or(Expr::column("is_read"), Expr::column("is_choice")),
                Expr::not(Expr::column("is_branch"))
            )
        );
    }

    #[test]
    fn test_parse_in_list() {
        let expr = parse_expression("speaker in ('cato', 'cassius')").unwrap();
        assert_eq!(
            expr,
            Expr::In {
                expr: Box::new(Expr::column("speaker")),
                list: vec![
                    Value::String("cato".to_string()),
                    Value::String("cassius".to_string()),
                ],
                negated: false,
            }
        );

        let expr = parse_expression("speaker NOT IN ('cato')").unwrap();
        assert!(matches!(expr, Expr::In { negated: true, .. }));

        let expr = parse_expression("line_idx in ()").unwrap();
        assert!(matches!(expr, Expr::In { ref list, .. } if list.is_empty()));
    }

    #[test]
    fn test_parse_like() {
        let expr = parse_expression("line like '%sea%'").unwrap();
        assert_eq!(
            expr,
            Expr::Like {
                expr: Box::new(Expr::column("line")),
                pattern: "%sea%".to_string(),
                negated: false,
            }
        );

        let expr = parse_expression("line not like 'A%'").unwrap();
        assert!(matches!(expr, Expr::Like { negated: true, .. }));
    }

    #[test]
    fn test_parse_is_null() {
        let expr = parse_expression("speaker is null").unwrap();
        assert_eq!(
            expr,
            Expr::IsNull {
                expr: Box::new(Expr::column("speaker")),
                negated: false,
            }
        );

        let expr = parse_expression("speaker is not null").unwrap();
        assert!(matches!(expr, Expr::IsNull { negated: true, .. }));
    }

    #[test]
    fn test_parse_escaped_quote() {
        let expr = parse_expression("line = 'Who''s there?'").unwrap();
        assert_eq!(expr, Expr::eq(Expr::column("line"), Expr::string("Who's there?")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_expression("   "),
            Err(FilterError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_expression("speaker = 'cato"),
            Err(FilterError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_expression("speaker ="),
            Err(FilterError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_expression("(is_read"),
            Err(FilterError::InvalidSyntax { .. })
        ));
        assert!(matches!(
            parse_expression("speaker is 3"),
            Err(FilterError::InvalidSyntax { .. })
        ));
        assert!(matches!(
            parse_expression("line like 3"),
            Err(FilterError::InvalidSyntax { .. })
        ));
        assert!(matches!(
            parse_expression("speaker = 'cato' extra"),
            Err(FilterError::InvalidSyntax { .. })
        ));
    }

    #[test]
    fn test_error_reports_position() {
        let err = parse_expression("is_read and @").unwrap_err();
        match err {
            FilterError::InvalidSyntax { position, .. } => assert_eq!(position, 12),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
