//! Explicit teardown of compiled trees.
//!
//! Dropping a [`Program`] already frees it. [`Release`] makes the teardown
//! observable: it consumes a node, releases its children first and then the
//! node itself, logging each step and tallying it in a [`ReleaseLedger`].
//! [`Census`] counts a borrowed tree the same way, so a release can be checked
//! against what was actually there.

use std::collections::BTreeMap;

use tracing::trace;

use crate::ast::{
    Expression, Factor, Metaorder, Metatag, MetatagValue, NodeKind, OrderTypeNode, Program, Query,
    Scalar, ScalarKind, StringValue, Subqueries, Subquery, SubqueryName, Tag,
};

// ------------- Ledger -------------

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReleaseLedger {
    counts: BTreeMap<NodeKind, usize>,
}
impl ReleaseLedger {
    pub fn new() -> Self {
        Self::default()
    }
    fn record(&mut self, kind: NodeKind) {
        trace!(?kind, "released node");
        *self.counts.entry(kind).or_insert(0) += 1;
    }
    pub fn count(&self, kind: NodeKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
    pub fn counts(&self) -> &BTreeMap<NodeKind, usize> {
        &self.counts
    }
}

/// Consuming post-order teardown.
pub trait Release {
    fn release(self, ledger: &mut ReleaseLedger);
}

/// Releases `node` and returns what was freed.
pub fn release<T: Release>(node: T) -> ReleaseLedger {
    let mut ledger = ReleaseLedger::new();
    node.release(&mut ledger);
    ledger
}

impl<T: Release> Release for Option<T> {
    fn release(self, ledger: &mut ReleaseLedger) {
        if let Some(node) = self {
            node.release(ledger);
        }
    }
}

impl<T: Release> Release for Box<T> {
    fn release(self, ledger: &mut ReleaseLedger) {
        (*self).release(ledger);
    }
}

impl Release for Program {
    fn release(self, ledger: &mut ReleaseLedger) {
        self.query.release(ledger);
        ledger.record(NodeKind::Program);
    }
}

impl Release for Query {
    fn release(self, ledger: &mut ReleaseLedger) {
        self.subqueries.release(ledger);
        self.main_query.release(ledger);
        self.order.release(ledger);
        ledger.record(NodeKind::Query);
    }
}

impl Release for Subqueries {
    // Each cell owns its subquery and the tail, so every subquery goes before
    // the cells, and the last cell before the first.
    fn release(self, ledger: &mut ReleaseLedger) {
        let cells = self.subqueries.len();
        for subquery in self.subqueries {
            subquery.release(ledger);
        }
        for _ in 0..cells {
            ledger.record(NodeKind::Subqueries);
        }
    }
}

impl Release for Subquery {
    fn release(self, ledger: &mut ReleaseLedger) {
        self.expression.release(ledger);
        self.name.release(ledger);
        ledger.record(NodeKind::Subquery);
    }
}

impl Release for SubqueryName {
    fn release(self, ledger: &mut ReleaseLedger) {
        drop(self.name);
        ledger.record(NodeKind::SubqueryName);
    }
}

impl Release for Metaorder {
    fn release(self, ledger: &mut ReleaseLedger) {
        self.order.release(ledger);
        ledger.record(NodeKind::Metaorder);
    }
}

impl Release for OrderTypeNode {
    fn release(self, ledger: &mut ReleaseLedger) {
        ledger.record(NodeKind::OrderTypeNode);
    }
}

impl Release for Expression {
    fn release(self, ledger: &mut ReleaseLedger) {
        match self {
            Expression::Binary { left, right, .. } => {
                left.release(ledger);
                right.release(ledger);
            }
            Expression::Not(expression) => expression.release(ledger),
            Expression::Factor(factor) => factor.release(ledger),
        }
        ledger.record(NodeKind::Expression);
    }
}

impl Release for Factor {
    fn release(self, ledger: &mut ReleaseLedger) {
        match self {
            Factor::Tag(tag) => tag.release(ledger),
            Factor::Metatag(metatag) => metatag.release(ledger),
            Factor::Expression(expression) => expression.release(ledger),
        }
        ledger.record(NodeKind::Factor);
    }
}

impl Release for Tag {
    fn release(self, ledger: &mut ReleaseLedger) {
        self.tagname.release(ledger);
        ledger.record(NodeKind::Tag);
    }
}

impl Release for Metatag {
    fn release(self, ledger: &mut ReleaseLedger) {
        drop(self.name);
        match self.value {
            MetatagValue::String(string) | MetatagValue::Recall(string) => string.release(ledger),
            MetatagValue::Integer(integer) => integer.release(ledger),
            MetatagValue::Date(date) => date.release(ledger),
            MetatagValue::Size(size) => size.release(ledger),
        }
        ledger.record(NodeKind::Metatag);
    }
}

impl Release for StringValue {
    fn release(self, ledger: &mut ReleaseLedger) {
        drop(self.text);
        ledger.record(NodeKind::String);
    }
}

impl<K: ScalarKind> Release for Scalar<K> {
    fn release(self, ledger: &mut ReleaseLedger) {
        drop(self.bound);
        ledger.record(K::KIND);
    }
}

// ------------- Census -------------

/// Node counts of a borrowed tree, per kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Census {
    counts: BTreeMap<NodeKind, usize>,
}
impl Census {
    pub fn of<T: Countable + ?Sized>(node: &T) -> Self {
        let mut census = Self::default();
        node.count(&mut census);
        census
    }
    fn add(&mut self, kind: NodeKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }
    pub fn count(&self, kind: NodeKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
    pub fn counts(&self) -> &BTreeMap<NodeKind, usize> {
        &self.counts
    }
}

impl PartialEq<ReleaseLedger> for Census {
    fn eq(&self, ledger: &ReleaseLedger) -> bool {
        self.counts == ledger.counts
    }
}

pub trait Countable {
    fn count(&self, census: &mut Census);
}

impl<T: Countable> Countable for Option<T> {
    fn count(&self, census: &mut Census) {
        if let Some(node) = self {
            node.count(census);
        }
    }
}

impl<T: Countable + ?Sized> Countable for Box<T> {
    fn count(&self, census: &mut Census) {
        (**self).count(census);
    }
}

impl Countable for Program {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::Program);
        self.query.count(census);
    }
}

impl Countable for Query {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::Query);
        self.subqueries.count(census);
        self.main_query.count(census);
        self.order.count(census);
    }
}

impl Countable for Subqueries {
    fn count(&self, census: &mut Census) {
        for subquery in self {
            census.add(NodeKind::Subqueries);
            subquery.count(census);
        }
    }
}

impl Countable for Subquery {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::Subquery);
        self.expression.count(census);
        self.name.count(census);
    }
}

impl Countable for SubqueryName {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::SubqueryName);
    }
}

impl Countable for Metaorder {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::Metaorder);
        self.order.count(census);
    }
}

impl Countable for OrderTypeNode {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::OrderTypeNode);
    }
}

impl Countable for Expression {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::Expression);
        match self {
            Expression::Binary { left, right, .. } => {
                left.count(census);
                right.count(census);
            }
            Expression::Not(expression) => expression.count(census),
            Expression::Factor(factor) => factor.count(census),
        }
    }
}

impl Countable for Factor {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::Factor);
        match self {
            Factor::Tag(tag) => tag.count(census),
            Factor::Metatag(metatag) => metatag.count(census),
            Factor::Expression(expression) => expression.count(census),
        }
    }
}

impl Countable for Tag {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::Tag);
        self.tagname.count(census);
    }
}

impl Countable for Metatag {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::Metatag);
        match &self.value {
            MetatagValue::String(string) | MetatagValue::Recall(string) => string.count(census),
            MetatagValue::Integer(integer) => integer.count(census),
            MetatagValue::Date(date) => date.count(census),
            MetatagValue::Size(size) => size.count(census),
        }
    }
}

impl Countable for StringValue {
    fn count(&self, census: &mut Census) {
        census.add(NodeKind::String);
    }
}

impl<K: ScalarKind> Countable for Scalar<K> {
    fn count(&self, census: &mut Census) {
        census.add(K::KIND);
    }
}
