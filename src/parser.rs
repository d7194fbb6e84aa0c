//! Drives the tree builder from the grammar's parse tree.
//!
//! The grammar only decides *whether* the input reduces; this module performs
//! the reductions bottom-up, calling exactly one semantic action per production
//! and finishing with program assembly.

use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use tracing::debug;

use crate::ast::{BinaryOperator, Expression, MatchType, MetaType, Metaorder, Metatag, OrderType, Query, StringValue, Subqueries, Subquery, Tag};
use crate::builder::{self, CompilerState};
use crate::error::{Result, TagQueryError};
use crate::source::{self, ContextKind, LexicalContext, QueryParser, Rule, Vocabulary};

lazy_static! {
    // lowest precedence first
    static ref PRATT: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::prefix(Rule::not_op));
}

fn unexpected(rule: Rule) -> TagQueryError {
    TagQueryError::Invariant(format!("unexpected grammar rule {:?}", rule))
}

fn match_type_of(text: &str) -> MatchType {
    if text.contains('*') { MatchType::Pattern } else { MatchType::Exact }
}

/// Value of a scalar metatag before it is typed.
#[derive(Debug)]
enum ScalarShape {
    Single(String),
    Quantified(String, String),
    Ranged(String, String),
}
impl ScalarShape {
    fn scalars(&self) -> Vec<&str> {
        match self {
            ScalarShape::Single(value) | ScalarShape::Quantified(_, value) => vec![value.as_str()],
            ScalarShape::Ranged(start, end) => vec![start.as_str(), end.as_str()],
        }
    }
}

fn type_label(kind: MetaType) -> &'static str {
    match kind {
        MetaType::String => "string",
        MetaType::Integer => "integer",
        MetaType::Date => "date",
        MetaType::Size => "size",
        MetaType::Recall => "recall",
    }
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    vocabulary: Vocabulary,
}

impl Compiler {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Parses `input` and builds its tree. Grammar and token errors are
    /// returned as `Err`; a context leak yields `Ok` with a failed state.
    pub fn compile(&self, input: &str) -> Result<CompilerState> {
        debug!(length = input.len(), "Compiling query");
        let program = QueryParser::parse(Rule::program, input)?
            .next()
            .ok_or_else(|| TagQueryError::Invariant("grammar produced no program".into()))?;
        let query = program
            .into_inner()
            .find(|pair| pair.as_rule() == Rule::query)
            .ok_or_else(|| TagQueryError::Invariant("program without a query".into()))?;
        let mut context = LexicalContext::new();
        let query = self.reduce_query(query, &mut context)?;
        let mut state = CompilerState::new();
        builder::program(&mut state, query, &context);
        debug!(succeeded = state.succeeded(), "Compilation is done");
        Ok(state)
    }

    fn reduce_query(&self, pair: Pair<Rule>, context: &mut LexicalContext) -> Result<Query> {
        let mut declared = Vec::new();
        let mut expression = None;
        let mut order = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::subquery => declared.push(self.reduce_subquery(inner, context)?),
                Rule::expression => expression = Some(self.reduce_expression(inner, context)?),
                Rule::order => order = Some(reduce_order(inner)?),
                rule => return Err(unexpected(rule)),
            }
        }
        let expression = match expression {
            Some(expression) => expression,
            None => builder::factor_expression(builder::tag_factor(builder::empty_tag())),
        };
        Ok(match (reduce_subqueries(declared), order) {
            (None, None) => builder::expression_query(expression),
            (None, Some(order)) => builder::expression_with_order_query(expression, order),
            (Some(subqueries), None) => builder::expression_subquery_query(subqueries, expression),
            (Some(subqueries), Some(order)) => {
                builder::expression_subquery_ordered_query(subqueries, expression, order)
            }
        })
    }

    fn reduce_subquery(&self, pair: Pair<Rule>, context: &mut LexicalContext) -> Result<Subquery> {
        let mut expression = None;
        let mut name = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::expression => expression = Some(self.reduce_expression(inner, context)?),
                Rule::subquery_name => name = Some(builder::subquery_name(inner.as_str().to_string())),
                Rule::kw_as => (),
                rule => return Err(unexpected(rule)),
            }
        }
        match (name, expression) {
            (Some(name), Some(expression)) => Ok(builder::subquery(name, expression)),
            _ => Err(TagQueryError::Invariant("incomplete subquery".into())),
        }
    }

    fn reduce_expression(&self, pair: Pair<Rule>, context: &mut LexicalContext) -> Result<Expression> {
        PRATT
            .map_primary(|primary| self.reduce_primary(primary, context))
            .map_prefix(|op, operand| match op.as_rule() {
                Rule::not_op => Ok(builder::negated_expression(operand?)),
                rule => Err(unexpected(rule)),
            })
            .map_infix(|left, op, right| {
                let operator = match op.as_rule() {
                    Rule::and_op => BinaryOperator::And,
                    Rule::or_op => BinaryOperator::Or,
                    rule => return Err(unexpected(rule)),
                };
                Ok(builder::binary_expression(left?, right?, operator))
            })
            .parse(pair.into_inner())
    }

    fn reduce_primary(&self, pair: Pair<Rule>, context: &mut LexicalContext) -> Result<Expression> {
        let factor = match pair.as_rule() {
            Rule::group => {
                let inner = pair
                    .into_inner()
                    .next()
                    .ok_or_else(|| TagQueryError::Invariant("empty group".into()))?;
                builder::expression_factor(self.reduce_expression(inner, context)?)
            }
            Rule::metatag => builder::metatag_factor(self.reduce_metatag(pair, context)?),
            Rule::recall => builder::metatag_factor(reduce_recall(pair)?),
            Rule::tag => builder::tag_factor(reduce_tag(pair)),
            rule => return Err(unexpected(rule)),
        };
        Ok(builder::factor_expression(factor))
    }

    fn reduce_metatag(&self, pair: Pair<Rule>, context: &mut LexicalContext) -> Result<Metatag> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let (name, value) = match (inner.next(), inner.next()) {
            (Some(name), Some(value)) => (name.as_str().to_string(), value),
            _ => return Err(TagQueryError::Invariant("metatag without a value".into())),
        };
        let kind = self
            .vocabulary
            .classify(&name)
            .ok_or_else(|| TagQueryError::parse_at(format!("Unknown metatag '{}'", name), position))?;
        context.enter(ContextKind::MetatagValue);
        let metatag = match kind {
            MetaType::String => {
                let argument = reduce_string_value(value, context);
                builder::string_metatag(name, argument)
            }
            MetaType::Integer => {
                let argument = match read_shape(value, kind, &name)? {
                    ScalarShape::Single(value) => builder::integer(value),
                    ScalarShape::Quantified(quantifier, value) => builder::undefined_range_integer(&quantifier, value),
                    ScalarShape::Ranged(start, end) => builder::ranged_integer(start, end),
                };
                builder::integer_metatag(name, argument)
            }
            MetaType::Date => {
                let argument = match read_shape(value, kind, &name)? {
                    ScalarShape::Single(value) => builder::date(value),
                    ScalarShape::Quantified(quantifier, value) => builder::undefined_range_date(&quantifier, value),
                    ScalarShape::Ranged(start, end) => builder::ranged_date(start, end),
                };
                builder::date_metatag(name, argument)
            }
            MetaType::Size => {
                let argument = match read_shape(value, kind, &name)? {
                    ScalarShape::Single(value) => builder::size(value),
                    ScalarShape::Quantified(quantifier, value) => builder::undefined_range_size(&quantifier, value),
                    ScalarShape::Ranged(start, end) => builder::ranged_size(start, end),
                };
                builder::size_metatag(name, argument)
            }
            MetaType::Recall => {
                return Err(TagQueryError::Invariant(format!("metatag '{}' classified as recall", name)));
            }
        };
        context.leave(ContextKind::MetatagValue);
        Ok(metatag)
    }
}

fn reduce_subqueries(declared: Vec<Subquery>) -> Option<Subqueries> {
    let mut declared = declared.into_iter().rev();
    let last = declared.next()?;
    Some(declared.fold(builder::subquery_single(last), |remaining, subquery| {
        builder::subquery_recursive(subquery, remaining)
    }))
}

fn reduce_order(pair: Pair<Rule>) -> Result<Metaorder> {
    let mut field = None;
    let mut descending = false;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::order_field => field = OrderType::from_keyword(inner.as_str()),
            Rule::direction => descending = inner.as_str().eq_ignore_ascii_case("desc"),
            Rule::kw_order | Rule::kw_by => (),
            rule => return Err(unexpected(rule)),
        }
    }
    let field = field.ok_or_else(|| TagQueryError::Invariant("order clause without a field".into()))?;
    Ok(builder::metaorder(builder::order_type(field), descending))
}

fn reduce_tag(pair: Pair<Rule>) -> Tag {
    let text = pair.as_str();
    builder::tag(builder::string(text.to_string(), match_type_of(text)))
}

fn reduce_recall(pair: Pair<Rule>) -> Result<Metatag> {
    let name = pair
        .into_inner()
        .find(|inner| inner.as_rule() == Rule::recall_name)
        .ok_or_else(|| TagQueryError::Invariant("recall without a name".into()))?;
    Ok(builder::recall_metatag(builder::string(name.as_str().to_string(), MatchType::Exact)))
}

/// Quoted values are exact; an unterminated quote leaves the token source
/// inside its string context.
fn reduce_string_value(value: Pair<Rule>, context: &mut LexicalContext) -> StringValue {
    if value.as_rule() != Rule::quoted {
        let text = value.as_str();
        return builder::string(text.to_string(), match_type_of(text));
    }
    context.enter(ContextKind::QuotedString);
    let mut text = String::new();
    for inner in value.into_inner() {
        match inner.as_rule() {
            Rule::quoted_text => text = inner.as_str().to_string(),
            Rule::closing_quote => {
                context.leave(ContextKind::QuotedString);
            }
            _ => (),
        }
    }
    builder::string(text, MatchType::Exact)
}

fn read_shape(value: Pair<Rule>, kind: MetaType, name: &str) -> Result<ScalarShape> {
    let position = value.line_col();
    let rule = value.as_rule();
    let mut parts = value.into_inner().map(|inner| inner.as_str().to_string());
    let mut next = || parts.next().ok_or_else(|| unexpected(rule));
    let shape = match rule {
        Rule::single => ScalarShape::Single(next()?),
        Rule::quantified => {
            let quantifier = next()?;
            ScalarShape::Quantified(quantifier, next()?)
        }
        Rule::range => {
            let start = next()?;
            ScalarShape::Ranged(start, next()?)
        }
        Rule::quoted | Rule::text => {
            return Err(TagQueryError::parse_at(
                format!("Metatag '{}' expects {} value", name, indefinite(type_label(kind))),
                position,
            ));
        }
        rule => return Err(unexpected(rule)),
    };
    if let Some(invalid) = shape.scalars().into_iter().find(|text| !source::accepts(kind, *text)) {
        return Err(TagQueryError::parse_at(
            format!("'{}' is not a valid {} for metatag '{}'", invalid, type_label(kind), name),
            position,
        ));
    }
    Ok(shape)
}

fn indefinite(label: &str) -> String {
    match label.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => format!("an {}", label),
        _ => format!("a {}", label),
    }
}
