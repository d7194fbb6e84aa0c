//! Abstract syntax tree for compiled tag queries.
//!
//! Every node exclusively owns its children, so a [`Program`] is a strict tree:
//! no sharing, no back references. Nodes are built only by the semantic actions
//! in [`crate::builder`] and are immutable afterwards; fields are read through
//! getters. Union-like nodes are plain enums, so a consumer always matches on the
//! variant before it can reach the payload.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

// ------------- Discriminants -------------

/// The fifteen kinds of node a tree can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Program,
    Query,
    Subqueries,
    Subquery,
    SubqueryName,
    Metaorder,
    OrderTypeNode,
    Expression,
    Factor,
    Tag,
    Metatag,
    String,
    Integer,
    Date,
    SemanticSize,
}

impl NodeKind {
    pub const ALL: [NodeKind; 15] = [
        NodeKind::Program,
        NodeKind::Query,
        NodeKind::Subqueries,
        NodeKind::Subquery,
        NodeKind::SubqueryName,
        NodeKind::Metaorder,
        NodeKind::OrderTypeNode,
        NodeKind::Expression,
        NodeKind::Factor,
        NodeKind::Tag,
        NodeKind::Metatag,
        NodeKind::String,
        NodeKind::Integer,
        NodeKind::Date,
        NodeKind::SemanticSize,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchType {
    Exact,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionType {
    And,
    Or,
    Not,
    Factor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorType {
    Tag,
    Metatag,
    Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    CreationDate,
    LastEdit,
    Likes,
    Size,
    Views,
    Random,
}

impl OrderType {
    /// Maps an order-field keyword (any case) to its field.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "creationdate" => Some(OrderType::CreationDate),
            "lastedit" => Some(OrderType::LastEdit),
            "likes" => Some(OrderType::Likes),
            "size" => Some(OrderType::Size),
            "views" => Some(OrderType::Views),
            "random" => Some(OrderType::Random),
            _ => None,
        }
    }
    pub fn constant(&self) -> &'static str {
        match self {
            OrderType::CreationDate => "CREATIONDATE",
            OrderType::LastEdit => "LASTEDIT",
            OrderType::Likes => "LIKES",
            OrderType::Size => "SIZE",
            OrderType::Views => "VIEWS",
            OrderType::Random => "RANDOM",
        }
    }
}

/// Shape of a scalar filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A bare value, implicitly compared with `=`.
    Exact,
    /// A value with an explicit quantifier.
    UndefinedRanged,
    /// An inclusive `start-end` range.
    Ranged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaType {
    String,
    Integer,
    Date,
    Size,
    Recall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quantifier {
    #[default]
    Equals,
    GreaterThan,
    GreaterEquals,
    LesserThan,
    LesserEquals,
}

impl Quantifier {
    pub fn symbol(&self) -> &'static str {
        match self {
            Quantifier::Equals => "=",
            Quantifier::GreaterThan => ">",
            Quantifier::GreaterEquals => ">=",
            Quantifier::LesserThan => "<",
            Quantifier::LesserEquals => "<=",
        }
    }
}

impl FromStr for Quantifier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Quantifier::Equals),
            ">" => Ok(Quantifier::GreaterThan),
            ">=" => Ok(Quantifier::GreaterEquals),
            "<" => Ok(Quantifier::LesserThan),
            "<=" => Ok(Quantifier::LesserEquals),
            other => Err(format!("Unknown quantifier '{}'", other)),
        }
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// ------------- Program -------------
#[derive(Debug, PartialEq)]
pub struct Program {
    pub(crate) query: Query,
}
impl Program {
    pub fn query(&self) -> &Query {
        &self.query
    }
}

// ------------- Query -------------
#[derive(Debug, PartialEq)]
pub struct Query {
    pub(crate) subqueries: Option<Subqueries>,
    pub(crate) main_query: Expression,
    pub(crate) order: Option<Metaorder>,
}
impl Query {
    pub fn subqueries(&self) -> Option<&Subqueries> {
        self.subqueries.as_ref()
    }
    pub fn main_query(&self) -> &Expression {
        &self.main_query
    }
    pub fn order(&self) -> Option<&Metaorder> {
        self.order.as_ref()
    }
}

// ------------- Subqueries -------------
// Logically a cons-list (one cell per subquery, in declaration order); stored
// as a vector.
#[derive(Debug, PartialEq)]
pub struct Subqueries {
    pub(crate) subqueries: Vec<Subquery>,
}
impl Subqueries {
    pub fn subquery(&self) -> &Subquery {
        &self.subqueries[0]
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Subquery> {
        self.subqueries.iter()
    }
    pub fn as_slice(&self) -> &[Subquery] {
        &self.subqueries
    }
    pub fn len(&self) -> usize {
        self.subqueries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.subqueries.is_empty()
    }
}
impl<'a> IntoIterator for &'a Subqueries {
    type Item = &'a Subquery;
    type IntoIter = std::slice::Iter<'a, Subquery>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, PartialEq)]
pub struct Subquery {
    pub(crate) expression: Expression,
    pub(crate) name: SubqueryName,
}
impl Subquery {
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
    pub fn name(&self) -> &SubqueryName {
        &self.name
    }
}

#[derive(Debug, PartialEq)]
pub struct SubqueryName {
    pub(crate) name: String,
}
impl SubqueryName {
    pub fn name(&self) -> &str {
        &self.name
    }
}

// ------------- Ordering -------------
#[derive(Debug, PartialEq)]
pub struct Metaorder {
    pub(crate) order: OrderTypeNode,
    pub(crate) descending: bool,
}
impl Metaorder {
    pub fn order(&self) -> &OrderTypeNode {
        &self.order
    }
    pub fn descending(&self) -> bool {
        self.descending
    }
}

#[derive(Debug, PartialEq)]
pub struct OrderTypeNode {
    pub(crate) order: OrderType,
}
impl OrderTypeNode {
    pub fn order(&self) -> OrderType {
        self.order
    }
}

// ------------- Expression -------------
#[derive(Debug, PartialEq)]
pub enum Expression {
    /// Left and right keep their source order.
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not(Box<Expression>),
    Factor(Box<Factor>),
}
impl Expression {
    pub fn expression_type(&self) -> ExpressionType {
        match self {
            Expression::Binary { operator: BinaryOperator::And, .. } => ExpressionType::And,
            Expression::Binary { operator: BinaryOperator::Or, .. } => ExpressionType::Or,
            Expression::Not(_) => ExpressionType::Not,
            Expression::Factor(_) => ExpressionType::Factor,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Factor {
    Tag(Tag),
    Metatag(Metatag),
    /// A parenthesized expression.
    Expression(Box<Expression>),
}
impl Factor {
    pub fn factor_type(&self) -> FactorType {
        match self {
            Factor::Tag(_) => FactorType::Tag,
            Factor::Metatag(_) => FactorType::Metatag,
            Factor::Expression(_) => FactorType::Expression,
        }
    }
}

// ------------- Tags -------------
#[derive(Debug, PartialEq)]
pub struct Tag {
    pub(crate) tagname: Option<StringValue>,
}
impl Tag {
    /// `None` for the empty tag.
    pub fn tagname(&self) -> Option<&StringValue> {
        self.tagname.as_ref()
    }
}

#[derive(Debug, PartialEq)]
pub struct Metatag {
    // absent for recall metatags
    pub(crate) name: Option<String>,
    pub(crate) value: MetatagValue,
}
impl Metatag {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    pub fn value(&self) -> &MetatagValue {
        &self.value
    }
    pub fn meta_type(&self) -> MetaType {
        self.value.meta_type()
    }
}

#[derive(Debug, PartialEq)]
pub enum MetatagValue {
    String(StringValue),
    Integer(Integer),
    Date(Date),
    Size(SemanticSize),
    Recall(StringValue),
}
impl MetatagValue {
    pub fn meta_type(&self) -> MetaType {
        match self {
            MetatagValue::String(_) => MetaType::String,
            MetatagValue::Integer(_) => MetaType::Integer,
            MetatagValue::Date(_) => MetaType::Date,
            MetatagValue::Size(_) => MetaType::Size,
            MetatagValue::Recall(_) => MetaType::Recall,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringValue {
    pub(crate) text: String,
    pub(crate) match_type: MatchType,
}
impl StringValue {
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn match_type(&self) -> MatchType {
        self.match_type
    }
}

// ------------- Scalars -------------

/// Marker trait for the three isomorphic scalar filter nodes.
pub trait ScalarKind {
    const KIND: NodeKind;
    const LABEL: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegerKind;
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateKind;
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeKind;

impl ScalarKind for IntegerKind {
    const KIND: NodeKind = NodeKind::Integer;
    const LABEL: &'static str = "I";
}
impl ScalarKind for DateKind {
    const KIND: NodeKind = NodeKind::Date;
    const LABEL: &'static str = "D";
}
impl ScalarKind for SizeKind {
    const KIND: NodeKind = NodeKind::SemanticSize;
    const LABEL: &'static str = "SZ";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Bound {
    Exact { value: String },
    Quantified { value: String, quantifier: Quantifier },
    Ranged { start: String, end: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scalar<K: ScalarKind> {
    pub(crate) bound: Bound,
    kind: PhantomData<K>,
}

pub type Integer = Scalar<IntegerKind>;
pub type Date = Scalar<DateKind>;
pub type SemanticSize = Scalar<SizeKind>;

impl<K: ScalarKind> Scalar<K> {
    pub(crate) fn new(bound: Bound) -> Self {
        Self { bound, kind: PhantomData }
    }
    pub fn bound(&self) -> &Bound {
        &self.bound
    }
    pub fn field_type(&self) -> FieldType {
        match self.bound {
            Bound::Exact { .. } => FieldType::Exact,
            Bound::Quantified { .. } => FieldType::UndefinedRanged,
            Bound::Ranged { .. } => FieldType::Ranged,
        }
    }
    pub fn value(&self) -> Option<&str> {
        match &self.bound {
            Bound::Exact { value } | Bound::Quantified { value, .. } => Some(value),
            Bound::Ranged { .. } => None,
        }
    }
    /// A bare value compares with `=`; ranges carry no quantifier.
    pub fn quantifier(&self) -> Option<Quantifier> {
        match &self.bound {
            Bound::Exact { .. } => Some(Quantifier::Equals),
            Bound::Quantified { quantifier, .. } => Some(*quantifier),
            Bound::Ranged { .. } => None,
        }
    }
    pub fn start(&self) -> Option<&str> {
        match &self.bound {
            Bound::Ranged { start, .. } => Some(start),
            _ => None,
        }
    }
    pub fn end(&self) -> Option<&str> {
        match &self.bound {
            Bound::Ranged { end, .. } => Some(end),
            _ => None,
        }
    }
}
