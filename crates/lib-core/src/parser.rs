use chrono::NaiveDate;
use corpusql_parser_core::{Lexer, Token, TokenKind};
use smol_str::SmolStr;

use crate::ast::*;
use crate::error::ParseError;
use crate::variable::{ConditionKind, VariableKind, VariableRegistry};

/// Parses corpusql query text into a `Query` AST. The parser is total:
/// every malformed input produces a `ParseError`, never a partial tree.
pub fn parse(text: &str) -> Result<Query, ParseError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        next_condition_id: 0,
        registry: VariableRegistry::new(),
    };
    let query = parser.parse_query()?;
    Ok(query)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_condition_id: u32,
    registry: VariableRegistry,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, rule: &'static str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek().clone();
            Err(ParseError::syntax(
                tok.line,
                tok.col,
                rule,
                format!("expected {kind:?}, found {:?} ({:?})", tok.kind, tok.raw),
            ))
        }
    }

    fn err(&self, rule: &'static str, reason: impl Into<String>) -> ParseError {
        let tok = self.peek();
        ParseError::syntax(tok.line, tok.col, rule, reason)
    }

    fn next_condition_id(&mut self) -> u32 {
        let id = self.next_condition_id;
        self.next_condition_id += 1;
        id
    }

    // query := SELECT columnList FROM identifier whereClause? groupClause? orderClause? limitClause?
    fn parse_query(&mut self) -> Result<Query, ParseError> {
        self.expect(TokenKind::Select, "query")?;
        let select_columns = self.parse_column_list()?;
        self.expect(TokenKind::From, "query")?;
        let source = self.expect_identifier_like("query")?;

        let mut conditions = Vec::new();
        if self.eat(TokenKind::Where) {
            conditions.push(self.parse_or_expr()?);
        }

        let mut granularity = Granularity::Document;
        let mut granularity_size = None;
        if self.eat(TokenKind::Granularity) {
            if self.eat(TokenKind::Document) {
                granularity = Granularity::Document;
            } else {
                self.expect(TokenKind::Sentence, "groupClause")?;
                granularity = Granularity::Sentence;
                if self.at(TokenKind::Int) {
                    let tok = self.advance();
                    granularity_size = Some(tok.raw.parse().map_err(|_| {
                        self.err("groupClause", "invalid GRANULARITY SENTENCE size")
                    })?);
                }
            }
        }

        let mut order_by = Vec::new();
        if self.eat(TokenKind::Order) {
            self.expect(TokenKind::By, "orderClause")?;
            order_by.push(self.parse_order_spec()?);
            while self.eat(TokenKind::Comma) {
                order_by.push(self.parse_order_spec()?);
            }
        }

        let mut limit = None;
        if self.eat(TokenKind::Limit) {
            let tok = self.expect(TokenKind::Int, "limitClause")?;
            limit = Some(
                tok.raw
                    .parse()
                    .map_err(|_| self.err("limitClause", "invalid LIMIT value"))?,
            );
        }

        self.expect(TokenKind::Eof, "query")?;

        for column in &select_columns {
            self.record_projection_consumer(column);
        }
        for spec in &order_by {
            if spec.key.starts_with('?') {
                self.registry.register_consumer(
                    spec.key.clone(),
                    VariableKind::Any,
                    ConditionKind::Temporal,
                );
            }
        }

        Ok(Query {
            source,
            conditions,
            select_columns,
            order_by,
            limit,
            granularity,
            granularity_size,
            subqueries: Vec::new(),
            join_condition: None,
            variable_registry: std::mem::take(&mut self.registry),
        })
    }

    fn record_projection_consumer(&mut self, column: &SelectColumn) {
        match column {
            SelectColumn::Variable(name) => {
                self.registry
                    .register_consumer(name.clone(), VariableKind::Any, ConditionKind::Temporal);
            }
            SelectColumn::Snippet { var, .. } => {
                self.registry
                    .register_consumer(var.clone(), VariableKind::TextSpan, ConditionKind::Temporal);
            }
            SelectColumn::Count {
                unique_var: Some(var),
                ..
            } => {
                self.registry
                    .register_consumer(var.clone(), VariableKind::Any, ConditionKind::Temporal);
            }
            _ => {}
        }
    }

    fn expect_identifier_like(&mut self, rule: &'static str) -> Result<SmolStr, ParseError> {
        if self.at(TokenKind::Ident) {
            Ok(self.advance().raw)
        } else {
            Err(self.err(rule, "expected an identifier"))
        }
    }

    // columnList := columnSpec ( ',' columnSpec )*
    fn parse_column_list(&mut self) -> Result<Vec<SelectColumn>, ParseError> {
        let mut columns = vec![self.parse_column_spec()?];
        while self.eat(TokenKind::Comma) {
            columns.push(self.parse_column_spec()?);
        }
        Ok(columns)
    }

    fn parse_column_spec(&mut self) -> Result<SelectColumn, ParseError> {
        match self.peek_kind() {
            TokenKind::Variable => {
                let name = self.advance().raw;
                Ok(SelectColumn::Variable(name))
            }
            TokenKind::Title => {
                self.advance();
                Ok(SelectColumn::Title)
            }
            TokenKind::Timestamp => {
                self.advance();
                Ok(SelectColumn::Timestamp)
            }
            TokenKind::Snippet => {
                self.advance();
                self.expect(TokenKind::LParen, "SNIPPET")?;
                let var = self.expect(TokenKind::Variable, "SNIPPET")?.raw;
                let mut window = 0u8;
                if self.eat(TokenKind::Comma) {
                    self.expect(TokenKind::Window, "SNIPPET")?;
                    self.expect(TokenKind::Eq, "SNIPPET")?;
                    let tok = self.expect(TokenKind::Int, "SNIPPET")?;
                    window = tok
                        .raw
                        .parse()
                        .map_err(|_| self.err("SNIPPET", "invalid WINDOW value"))?;
                }
                self.expect(TokenKind::RParen, "SNIPPET")?;
                Ok(SelectColumn::Snippet { var, window })
            }
            TokenKind::Count => {
                self.advance();
                self.expect(TokenKind::LParen, "COUNT")?;
                let result = if self.eat(TokenKind::Star) {
                    SelectColumn::Count {
                        target: CountTarget::All,
                        unique_var: None,
                    }
                } else if self.eat(TokenKind::Documents) {
                    SelectColumn::Count {
                        target: CountTarget::Documents,
                        unique_var: None,
                    }
                } else if self.eat(TokenKind::Unique) {
                    let var = self.expect(TokenKind::Variable, "COUNT")?.raw;
                    SelectColumn::Count {
                        target: CountTarget::Unique,
                        unique_var: Some(var),
                    }
                } else {
                    return Err(self.err("COUNT", "expected '*', DOCUMENTS, or UNIQUE variable"));
                };
                self.expect(TokenKind::RParen, "COUNT")?;
                Ok(result)
            }
            TokenKind::Ident => {
                let name = self.advance().raw;
                Ok(SelectColumn::Variable(SmolStr::new(format!("#{name}"))))
            }
            _ => Err(self.err("columnSpec", "expected a select column")),
        }
    }

    fn parse_order_spec(&mut self) -> Result<OrderSpec, ParseError> {
        let key = match self.peek_kind() {
            TokenKind::Variable => self.advance().raw,
            TokenKind::Ident => self.advance().raw,
            _ => return Err(self.err("orderSpec", "expected an identifier or variable")),
        };
        let direction = if self.eat(TokenKind::Asc) {
            OrderDirection::Asc
        } else if self.eat(TokenKind::Desc) {
            OrderDirection::Desc
        } else {
            OrderDirection::Asc
        };
        Ok(OrderSpec { key, direction })
    }

    // orExpr := andExpr ( 'OR' andExpr )*
    fn parse_or_expr(&mut self) -> Result<Condition, ParseError> {
        let mut left = self.parse_and_expr()?;
        let mut children = vec![];
        while self.eat(TokenKind::Or) {
            if children.is_empty() {
                children.push(left);
            }
            children.push(self.parse_and_expr()?);
            left = Condition::Logical {
                op: LogicalOp::Or,
                children: children.clone(),
            };
        }
        Ok(left)
    }

    // andExpr := notExpr ( 'AND' notExpr )*
    fn parse_and_expr(&mut self) -> Result<Condition, ParseError> {
        let mut left = self.parse_not_expr()?;
        let mut children = vec![];
        while self.eat(TokenKind::And) {
            if children.is_empty() {
                children.push(left);
            }
            children.push(self.parse_not_expr()?);
            left = Condition::Logical {
                op: LogicalOp::And,
                children: children.clone(),
            };
        }
        Ok(left)
    }

    // notExpr := 'NOT' notExpr | atom
    fn parse_not_expr(&mut self) -> Result<Condition, ParseError> {
        if self.at(TokenKind::Not) {
            let tok = self.advance();
            let child = self.parse_not_expr()?;
            Ok(Condition::Not {
                child: Box::new(child),
                span: Span {
                    line: tok.line,
                    col: tok.col,
                },
            })
        } else {
            self.parse_atom()
        }
    }

    // atom := '(' orExpr ')' | condition
    fn parse_atom(&mut self) -> Result<Condition, ParseError> {
        let _panic = corpusql_helpers::enter_panic(format!(
            "atom at {}:{}",
            self.peek().line,
            self.peek().col
        ));
        if self.eat(TokenKind::LParen) {
            let inner = self.parse_or_expr()?;
            self.expect(TokenKind::RParen, "atom")?;
            Ok(inner)
        } else {
            self.parse_condition()
        }
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Contains => self.parse_contains(),
            TokenKind::Ner => self.parse_ner(),
            TokenKind::Pos => self.parse_pos(),
            TokenKind::Depends => self.parse_depends(),
            TokenKind::Date => self.parse_date(),
            _ => Err(self.err("condition", "expected CONTAINS, NER, POS, DEPENDS or DATE")),
        }
    }

    fn parse_contains(&mut self) -> Result<Condition, ParseError> {
        let tok = self.advance();
        self.expect(TokenKind::LParen, "CONTAINS")?;
        let mut terms = vec![self.expect(TokenKind::String, "CONTAINS")?.raw];
        while self.eat(TokenKind::Comma) {
            terms.push(self.expect(TokenKind::String, "CONTAINS")?.raw);
        }
        self.expect(TokenKind::RParen, "CONTAINS")?;
        Ok(Condition::Contains {
            terms,
            span: Span {
                line: tok.line,
                col: tok.col,
            },
        })
    }

    fn parse_ner(&mut self) -> Result<Condition, ParseError> {
        let tok = self.advance();
        self.expect(TokenKind::LParen, "NER")?;
        let ty_tok = if self.eat(TokenKind::Star) {
            SmolStr::new("*")
        } else {
            self.expect(TokenKind::String, "NER")?.raw
        };
        let mut var = None;
        if self.eat(TokenKind::Comma) {
            var = Some(self.expect(TokenKind::Variable, "NER")?.raw);
        }
        self.expect(TokenKind::RParen, "NER")?;
        if self.eat(TokenKind::As) {
            var = Some(self.expect(TokenKind::Variable, "NER")?.raw);
        }
        let entity_type = NerType::parse(&ty_tok)
            .ok_or_else(|| self.err("NER", format!("unknown NER type {ty_tok:?}")))?;
        if let Some(v) = &var {
            self.registry
                .register_producer(v.clone(), VariableKind::Entity, ConditionKind::Ner);
        }
        Ok(Condition::Ner {
            entity_type,
            var,
            span: Span {
                line: tok.line,
                col: tok.col,
            },
        })
    }

    fn parse_pos(&mut self) -> Result<Condition, ParseError> {
        let tok = self.advance();
        self.expect(TokenKind::LParen, "POS")?;
        let tag = self.expect(TokenKind::String, "POS")?.raw;
        let mut term = None;
        if self.eat(TokenKind::Comma) {
            term = Some(self.expect(TokenKind::String, "POS")?.raw);
        }
        self.expect(TokenKind::RParen, "POS")?;
        let mut var = None;
        if self.eat(TokenKind::As) {
            var = Some(self.expect(TokenKind::Variable, "POS")?.raw);
        }
        if let Some(v) = &var {
            self.registry
                .register_producer(v.clone(), VariableKind::PosTag, ConditionKind::Pos);
        }
        Ok(Condition::Pos {
            tag,
            term,
            var,
            span: Span {
                line: tok.line,
                col: tok.col,
            },
        })
    }

    fn parse_dependency_arg(&mut self) -> Result<DependencyArg, ParseError> {
        if self.at(TokenKind::Variable) {
            let name = self.advance().raw;
            self.registry
                .register_producer(name.clone(), VariableKind::TextSpan, ConditionKind::Dependency);
            Ok(DependencyArg::Variable(name))
        } else if self.at(TokenKind::String) {
            Ok(DependencyArg::Literal(self.advance().raw))
        } else {
            Err(self.err("DEPENDS", "expected a string or variable"))
        }
    }

    fn parse_depends(&mut self) -> Result<Condition, ParseError> {
        let tok = self.advance();
        self.expect(TokenKind::LParen, "DEPENDS")?;
        let governor = self.parse_dependency_arg()?;
        self.expect(TokenKind::Comma, "DEPENDS")?;
        let relation = self.parse_dependency_arg()?;
        self.expect(TokenKind::Comma, "DEPENDS")?;
        let dependent = self.parse_dependency_arg()?;
        self.expect(TokenKind::RParen, "DEPENDS")?;

        if matches!(governor, DependencyArg::Literal(ref s) if s.is_empty())
            || matches!(relation, DependencyArg::Literal(ref s) if s.is_empty())
            || matches!(dependent, DependencyArg::Literal(ref s) if s.is_empty())
        {
            return Err(self.err("DEPENDS", "components may not be empty"));
        }

        let mut var = None;
        if self.eat(TokenKind::As) {
            var = Some(self.expect(TokenKind::Variable, "DEPENDS")?.raw);
        }
        if let Some(v) = &var {
            self.registry
                .register_producer(v.clone(), VariableKind::Dependency, ConditionKind::Dependency);
        }
        Ok(Condition::Dependency {
            governor,
            relation,
            dependent,
            var,
            span: Span {
                line: tok.line,
                col: tok.col,
            },
        })
    }

    fn parse_date_value(&mut self) -> Result<NaiveDate, ParseError> {
        if self.at(TokenKind::String) {
            let raw = self.advance().raw;
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| self.err("DATE", format!("invalid date literal {raw:?}")))
        } else if self.at(TokenKind::Int) {
            let raw = self.advance().raw;
            let year: i32 = raw
                .parse()
                .map_err(|_| self.err("DATE", "invalid year literal"))?;
            NaiveDate::from_ymd_opt(year, 1, 1)
                .ok_or_else(|| self.err("DATE", "year out of range"))
        } else {
            Err(self.err("DATE", "expected a date string or year"))
        }
    }

    fn parse_date(&mut self) -> Result<Condition, ParseError> {
        let tok = self.advance();
        self.expect(TokenKind::LParen, "DATE")?;

        let mut var = None;
        if self.at(TokenKind::Variable) {
            var = Some(self.advance().raw);
        }

        let mut start_date = None;
        let mut end_date = None;
        let mut range_days = None;
        let mut predicate = TemporalPredicate::Equal;
        let mut has_predicate = false;

        if self.eat(TokenKind::Comma) {
            has_predicate = true;
            predicate = match self.peek_kind() {
                TokenKind::Lt => {
                    self.advance();
                    TemporalPredicate::Before
                }
                TokenKind::Gt => {
                    self.advance();
                    TemporalPredicate::After
                }
                TokenKind::Le => {
                    self.advance();
                    TemporalPredicate::BeforeEqual
                }
                TokenKind::Ge => {
                    self.advance();
                    TemporalPredicate::AfterEqual
                }
                TokenKind::EqEq => {
                    self.advance();
                    TemporalPredicate::Equal
                }
                TokenKind::Contains => {
                    self.advance();
                    TemporalPredicate::Contains
                }
                TokenKind::ContainedBy => {
                    self.advance();
                    TemporalPredicate::ContainedBy
                }
                TokenKind::Intersect => {
                    self.advance();
                    TemporalPredicate::Intersect
                }
                TokenKind::Near => {
                    self.advance();
                    TemporalPredicate::Proximity
                }
                TokenKind::Between => {
                    self.advance();
                    TemporalPredicate::Between
                }
                _ => return Err(self.err("DATE", "expected a date operator")),
            };

            start_date = Some(self.parse_date_value()?);

            if predicate == TemporalPredicate::Between {
                self.expect(TokenKind::And, "DATE")?;
                end_date = Some(self.parse_date_value()?);
            }

            if predicate == TemporalPredicate::Proximity {
                self.expect(TokenKind::Radius, "DATE")?;
                let n_tok = self.expect(TokenKind::Int, "DATE")?;
                let n: u32 = n_tok
                    .raw
                    .parse()
                    .map_err(|_| self.err("DATE", "invalid RADIUS magnitude"))?;
                let unit_tok = self.expect(TokenKind::Ident, "DATE")?;
                let unit = match unit_tok.raw.as_str() {
                    "y" => DateRangeUnit::Years,
                    "m" => DateRangeUnit::Months,
                    "d" => DateRangeUnit::Days,
                    other => {
                        return Err(self.err("DATE", format!("unknown RADIUS unit {other:?}")));
                    }
                };
                range_days = Some(unit.to_days(n));
            }
        }

        self.expect(TokenKind::RParen, "DATE")?;

        if let Some(v) = &var {
            self.registry
                .register_producer(v.clone(), VariableKind::Temporal, ConditionKind::Temporal);
            if has_predicate {
                self.registry
                    .register_consumer(v.clone(), VariableKind::Temporal, ConditionKind::Temporal);
            }
        }

        Ok(Condition::Temporal {
            start_date,
            end_date,
            range_days,
            predicate,
            var,
            span: Span {
                line: tok.line,
                col: tok.col,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_count_documents_query() {
        let q = parse("SELECT COUNT(DOCUMENTS) FROM wikipedia").unwrap();
        assert_eq!(q.source, "wikipedia");
        assert!(q.conditions.is_empty());
        assert_eq!(q.limit, None);
        assert!(q.order_by.is_empty());
        assert_eq!(
            q.select_columns,
            vec![SelectColumn::Count {
                target: CountTarget::Documents,
                unique_var: None
            }]
        );
    }

    #[test]
    fn parses_ner_with_order_and_limit() {
        let q = parse(
            r#"SELECT ?p FROM wikipedia WHERE NER("PERSON") AS ?p ORDER BY ?p DESC LIMIT 2"#,
        )
        .unwrap();
        assert_eq!(q.limit, Some(2));
        assert_eq!(q.order_by[0].direction, OrderDirection::Desc);
        assert!(q.variable_registry.has_producer("?p"));
    }

    #[test]
    fn parses_and_not_precedence() {
        let q = parse(
            r#"SELECT COUNT(DOCUMENTS) FROM w WHERE CONTAINS("ai") AND NOT CONTAINS("fiction")"#,
        )
        .unwrap();
        match &q.conditions[0] {
            Condition::Logical { op, children } => {
                assert_eq!(*op, LogicalOp::And);
                assert_eq!(children.len(), 2);
                assert!(matches!(children[1], Condition::Not { .. }));
            }
            other => panic!("expected Logical(AND), got {other:?}"),
        }
    }

    #[test]
    fn parses_date_comparison() {
        let q = parse("SELECT ?d FROM w WHERE DATE(?d, > 2000)").unwrap();
        match &q.conditions[0] {
            Condition::Temporal {
                predicate,
                start_date,
                ..
            } => {
                assert_eq!(*predicate, TemporalPredicate::After);
                assert_eq!(
                    *start_date,
                    Some(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
                );
            }
            other => panic!("expected Temporal, got {other:?}"),
        }
    }

    #[test]
    fn parses_near_radius() {
        let q = parse(r#"SELECT date FROM e WHERE NER("ORG")"#).unwrap();
        assert_eq!(q.source, "e");
        let _ = q;
        let q2 = parse("SELECT ?d FROM w WHERE DATE(?d, NEAR \"2020-01-10\" RADIUS 30d)").unwrap();
        match &q2.conditions[0] {
            Condition::Temporal {
                predicate,
                range_days,
                ..
            } => {
                assert_eq!(*predicate, TemporalPredicate::Proximity);
                assert_eq!(*range_days, Some(30));
            }
            other => panic!("expected Temporal, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_query_with_position() {
        let err = parse("SELECT FROM w").unwrap_err();
        match err {
            ParseError::Syntax { line, col, .. } => {
                assert_eq!(line, 1);
                assert_eq!(col, 8);
            }
            other => panic!("expected Syntax error, got {other:?}"),
        }
    }
}
