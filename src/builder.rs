//! Semantic actions, one per grammar production.
//!
//! Each action takes already built children by value and returns the new
//! owning parent. Actions never fail: they only run once the grammar has
//! accepted a production. The single failure signal is raised by [`program`],
//! which checks that the token source ended in its initial context.

use tracing::{debug, error, warn};

use crate::ast::{
    BinaryOperator, Bound, Date, Expression, Factor, Integer, MatchType, Metaorder, Metatag,
    MetatagValue, OrderType, OrderTypeNode, Program, Quantifier, Query, Scalar, ScalarKind,
    SemanticSize, StringValue, Subqueries, Subquery, SubqueryName, Tag,
};
use crate::error::{Result, TagQueryError};
use crate::source::LexicalContext;

/// Outcome of a compilation pass.
#[derive(Debug, Default)]
pub struct CompilerState {
    program: Option<Program>,
    succeed: bool,
    leaked_depth: usize,
}
impl CompilerState {
    pub fn new() -> Self {
        Self::default()
    }
    /// True only when a program was assembled and the token source ended in
    /// its initial context. A program may exist even when this is false.
    pub fn succeeded(&self) -> bool {
        self.succeed
    }
    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }
    pub fn take_program(&mut self) -> Option<Program> {
        self.program.take()
    }
    pub fn into_program(self) -> Result<Program> {
        if !self.succeed {
            return Err(TagQueryError::ContextLeak { depth: self.leaked_depth });
        }
        self.program
            .ok_or_else(|| TagQueryError::Invariant("no program was assembled".into()))
    }
}

fn log_action(action: &'static str) {
    debug!(action, "syntactic analyzer action");
}

// ------------- Program -------------

pub fn program(state: &mut CompilerState, query: Query, context: &LexicalContext) {
    log_action("program");
    state.program = Some(Program { query });
    if context.is_initial() {
        state.succeed = true;
        state.leaked_depth = 0;
    } else {
        error!(depth = context.depth(), current = ?context.current(), "The final context is not the initial one");
        state.succeed = false;
        state.leaked_depth = context.depth();
    }
}

// ------------- Query -------------

pub fn expression_query(expression: Expression) -> Query {
    log_action("expression_query");
    Query { subqueries: None, main_query: expression, order: None }
}

pub fn expression_with_order_query(expression: Expression, order: Metaorder) -> Query {
    log_action("expression_with_order_query");
    Query { subqueries: None, main_query: expression, order: Some(order) }
}

pub fn expression_subquery_query(subqueries: Subqueries, expression: Expression) -> Query {
    log_action("expression_subquery_query");
    Query { subqueries: Some(subqueries), main_query: expression, order: None }
}

pub fn expression_subquery_ordered_query(
    subqueries: Subqueries,
    expression: Expression,
    order: Metaorder,
) -> Query {
    log_action("expression_subquery_ordered_query");
    Query { subqueries: Some(subqueries), main_query: expression, order: Some(order) }
}

// ------------- Subqueries -------------

pub fn subquery_single(subquery: Subquery) -> Subqueries {
    log_action("subquery_single");
    Subqueries { subqueries: vec![subquery] }
}

/// Prepends `subquery` onto an already built tail.
pub fn subquery_recursive(subquery: Subquery, remaining: Subqueries) -> Subqueries {
    log_action("subquery_recursive");
    let mut subqueries = Vec::with_capacity(remaining.subqueries.len() + 1);
    subqueries.push(subquery);
    subqueries.extend(remaining.subqueries);
    Subqueries { subqueries }
}

pub fn subquery(name: SubqueryName, expression: Expression) -> Subquery {
    log_action("subquery");
    Subquery { expression, name }
}

pub fn subquery_name(name: String) -> SubqueryName {
    log_action("subquery_name");
    SubqueryName { name }
}

// ------------- Ordering -------------

pub fn metaorder(order: OrderTypeNode, descending: bool) -> Metaorder {
    log_action("metaorder");
    Metaorder { order, descending }
}

pub fn order_type(order: OrderType) -> OrderTypeNode {
    log_action("order_type");
    OrderTypeNode { order }
}

// ------------- Expressions -------------

pub fn binary_expression(left: Expression, right: Expression, operator: BinaryOperator) -> Expression {
    log_action("binary_expression");
    Expression::Binary { operator, left: Box::new(left), right: Box::new(right) }
}

pub fn negated_expression(expression: Expression) -> Expression {
    log_action("negated_expression");
    Expression::Not(Box::new(expression))
}

pub fn factor_expression(factor: Factor) -> Expression {
    log_action("factor_expression");
    Expression::Factor(Box::new(factor))
}

// ------------- Factors -------------

pub fn expression_factor(expression: Expression) -> Factor {
    log_action("expression_factor");
    Factor::Expression(Box::new(expression))
}

pub fn tag_factor(tag: Tag) -> Factor {
    log_action("tag_factor");
    Factor::Tag(tag)
}

pub fn metatag_factor(metatag: Metatag) -> Factor {
    log_action("metatag_factor");
    Factor::Metatag(metatag)
}

// ------------- Metatags -------------

pub fn string_metatag(name: String, argument: StringValue) -> Metatag {
    log_action("string_metatag");
    Metatag { name: Some(name), value: MetatagValue::String(argument) }
}

pub fn integer_metatag(name: String, argument: Integer) -> Metatag {
    log_action("integer_metatag");
    Metatag { name: Some(name), value: MetatagValue::Integer(argument) }
}

pub fn date_metatag(name: String, argument: Date) -> Metatag {
    log_action("date_metatag");
    Metatag { name: Some(name), value: MetatagValue::Date(argument) }
}

pub fn size_metatag(name: String, argument: SemanticSize) -> Metatag {
    log_action("size_metatag");
    Metatag { name: Some(name), value: MetatagValue::Size(argument) }
}

/// A recall is identified by its value alone and carries no metatag name.
pub fn recall_metatag(recallable: StringValue) -> Metatag {
    log_action("recall_metatag");
    Metatag { name: None, value: MetatagValue::Recall(recallable) }
}

pub fn string(text: String, match_type: MatchType) -> StringValue {
    log_action("string");
    StringValue { text, match_type }
}

// ------------- Scalars -------------

/// Maps quantifier token text to its operator. The grammar only produces the
/// five known operators; anything else degrades to `=`.
pub fn convert_to_quantifier(quantifier: &str) -> Quantifier {
    quantifier.parse().unwrap_or_else(|e: String| {
        warn!(%e, "defaulting to equality");
        Quantifier::Equals
    })
}

fn exact<K: ScalarKind>(value: String) -> Scalar<K> {
    Scalar::new(Bound::Exact { value })
}

fn quantified<K: ScalarKind>(quantifier: &str, value: String) -> Scalar<K> {
    Scalar::new(Bound::Quantified { value, quantifier: convert_to_quantifier(quantifier) })
}

fn ranged<K: ScalarKind>(start: String, end: String) -> Scalar<K> {
    Scalar::new(Bound::Ranged { start, end })
}

pub fn integer(integer: String) -> Integer {
    log_action("integer");
    exact(integer)
}

pub fn ranged_integer(start: String, end: String) -> Integer {
    log_action("ranged_integer");
    ranged(start, end)
}

pub fn undefined_range_integer(quantifier: &str, integer: String) -> Integer {
    log_action("undefined_range_integer");
    quantified(quantifier, integer)
}

pub fn date(date: String) -> Date {
    log_action("date");
    exact(date)
}

pub fn ranged_date(start: String, end: String) -> Date {
    log_action("ranged_date");
    ranged(start, end)
}

pub fn undefined_range_date(quantifier: &str, date: String) -> Date {
    log_action("undefined_range_date");
    quantified(quantifier, date)
}

pub fn size(size: String) -> SemanticSize {
    log_action("size");
    exact(size)
}

pub fn ranged_size(start: String, end: String) -> SemanticSize {
    log_action("ranged_size");
    ranged(start, end)
}

pub fn undefined_range_size(quantifier: &str, size: String) -> SemanticSize {
    log_action("undefined_range_size");
    quantified(quantifier, size)
}

// ------------- Tags -------------

pub fn tag(string: StringValue) -> Tag {
    log_action("tag");
    Tag { tagname: Some(string) }
}

pub fn empty_tag() -> Tag {
    log_action("empty_tag");
    Tag { tagname: None }
}
