//! Renders a compiled tree as a LaTeX `forest` document.
//!
//! One bracket per node, children one indentation level below their parent.
//! Every line is flushed as soon as it is written so partial output survives a
//! failure further down the tree.

use std::io::Write;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::ast::{
    BinaryOperator, Expression, Factor, MatchType, Metaorder, Metatag, MetatagValue, Program,
    Query, Scalar, ScalarKind, StringValue, Subqueries, Subquery, Tag,
};
use crate::error::Result;
use crate::settings::GeneratorSettings;

lazy_static! {
    static ref LATEX_SPECIAL: Regex = Regex::new(r"[\\{}$&#^_%~\[\]]").unwrap();
}

const PROLOGUE: &str = "\\documentclass{standalone}\n\n\
\\usepackage[utf8]{inputenc}\n\
\\usepackage[T1]{fontenc}\n\
\\usepackage{amsmath}\n\
\\usepackage{forest}\n\
\\usepackage{microtype}\n\n\
\\begin{document}\n    \\centering\n    \\begin{forest}\n";

const EPILOGUE: &str = "    \\end{forest}\n\\end{document}\n\n";

// level of the program bracket, inside document and forest
const PROGRAM_LEVEL: usize = 2;

/// Escapes characters that are special in LaTeX math mode.
pub fn escape(value: &str) -> String {
    LATEX_SPECIAL
        .replace_all(value, |caps: &Captures| match &caps[0] {
            "\\" => "\\backslash{}".to_string(),
            "^" => "\\hat{}".to_string(),
            "~" => "\\sim{}".to_string(),
            // forest reads bare brackets as tree structure
            "[" => "\\lbrack{}".to_string(),
            "]" => "\\rbrack{}".to_string(),
            other => format!("\\{}", other),
        })
        .into_owned()
}

fn operator_symbol(operator: BinaryOperator) -> char {
    match operator {
        BinaryOperator::And => '+',
        BinaryOperator::Or => '|',
    }
}

#[derive(Debug, Clone)]
pub struct Generator {
    indent_unit: String,
}

impl Generator {
    pub fn new(settings: &GeneratorSettings) -> Self {
        Self { indent_unit: settings.indent_char.to_string().repeat(settings.indent_size) }
    }

    pub fn generate<W: Write>(&self, program: &Program, out: &mut W) -> Result<()> {
        debug!("Generating final output");
        let mut emitter = Emitter { out, indent_unit: &self.indent_unit };
        emitter.raw(PROLOGUE)?;
        emitter.program(PROGRAM_LEVEL, program)?;
        emitter.raw(EPILOGUE)?;
        debug!("Generation is done");
        Ok(())
    }

    pub fn generate_to_string(&self, program: &Program) -> Result<String> {
        let mut buffer = Vec::new();
        self.generate(program, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(&GeneratorSettings::default())
    }
}

struct Emitter<'a, W: Write> {
    out: &'a mut W,
    indent_unit: &'a str,
}

impl<W: Write> Emitter<'_, W> {
    fn raw(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn line(&mut self, level: usize, text: &str) -> Result<()> {
        let line = format!("{}{}\n", self.indent_unit.repeat(level), text);
        self.raw(&line)
    }

    fn open(&mut self, level: usize, label: &str, colour: &str) -> Result<()> {
        self.line(level, &format!("[ ${}$, circle, draw, {}", label, colour))
    }

    fn close(&mut self, level: usize) -> Result<()> {
        self.line(level, "]")
    }

    fn constant(&mut self, level: usize, value: &str) -> Result<()> {
        self.line(level, &format!("[ ${{{}}}$, draw, black]", escape(value)))
    }

    fn operator(&mut self, level: usize, symbol: char) -> Result<()> {
        self.line(level, &format!("[ ${}$, circle, draw, purple ]", symbol))
    }

    fn program(&mut self, level: usize, program: &Program) -> Result<()> {
        self.open(level, "P", "green")?;
        self.query(level + 1, program.query())?;
        self.close(level)
    }

    fn query(&mut self, level: usize, query: &Query) -> Result<()> {
        self.open(level, "Q", "red")?;
        if let Some(subqueries) = query.subqueries() {
            self.subqueries(level + 1, subqueries)?;
        }
        self.expression(level + 1, query.main_query())?;
        if let Some(order) = query.order() {
            self.metaorder(level + 1, order)?;
        }
        self.close(level)
    }

    fn subqueries(&mut self, level: usize, subqueries: &Subqueries) -> Result<()> {
        self.cells(level, subqueries.as_slice())
    }

    // one S bracket per list cell, the tail nested inside its head
    fn cells(&mut self, level: usize, cells: &[Subquery]) -> Result<()> {
        let Some((head, tail)) = cells.split_first() else {
            return Ok(());
        };
        self.open(level, "S", "orange")?;
        self.subquery(level + 1, head)?;
        self.cells(level + 1, tail)?;
        self.close(level)
    }

    fn subquery(&mut self, level: usize, subquery: &Subquery) -> Result<()> {
        let name = subquery.name().name();
        if name.is_empty() {
            warn!("Skipping subquery without a name");
            return Ok(());
        }
        self.open(level, "sub", "magenta")?;
        self.expression(level + 1, subquery.expression())?;
        self.open(level + 1, "N", "magenta")?;
        self.constant(level + 2, name)?;
        self.close(level + 1)?;
        self.close(level)
    }

    fn metaorder(&mut self, level: usize, order: &Metaorder) -> Result<()> {
        self.open(level, "O", "magenta")?;
        self.constant(level + 1, order.order().order().constant())?;
        self.constant(level + 1, if order.descending() { "DESC" } else { "ASC" })?;
        self.close(level)
    }

    fn expression(&mut self, level: usize, expression: &Expression) -> Result<()> {
        self.open(level, "E", "black!20")?;
        match expression {
            Expression::Binary { operator, left, right } => {
                self.expression(level + 1, left)?;
                self.operator(level + 1, operator_symbol(*operator))?;
                self.expression(level + 1, right)?;
            }
            Expression::Not(negated) => {
                self.operator(level + 1, '!')?;
                self.expression(level + 1, negated)?;
            }
            Expression::Factor(factor) => self.factor(level + 1, factor)?,
        }
        self.close(level)
    }

    fn factor(&mut self, level: usize, factor: &Factor) -> Result<()> {
        self.open(level, "F", "black!20")?;
        match factor {
            Factor::Tag(tag) => self.tag(level + 1, tag)?,
            Factor::Metatag(metatag) => self.metatag(level + 1, metatag)?,
            Factor::Expression(expression) => {
                self.operator(level + 1, '(')?;
                self.expression(level + 1, expression)?;
                self.operator(level + 1, ')')?;
            }
        }
        self.close(level)
    }

    fn tag(&mut self, level: usize, tag: &Tag) -> Result<()> {
        self.open(level, "T", "cyan")?;
        if let Some(tagname) = tag.tagname() {
            self.string(level + 1, tagname)?;
        }
        self.close(level)
    }

    fn metatag(&mut self, level: usize, metatag: &Metatag) -> Result<()> {
        let name = match (metatag.value(), metatag.name()) {
            (MetatagValue::Recall(_), _) => "recall",
            (_, Some(name)) => name,
            (value, None) => {
                warn!(meta_type = ?value.meta_type(), "Skipping metatag without a name");
                return Ok(());
            }
        };
        self.open(level, "M", "brown")?;
        self.constant(level + 1, name)?;
        match metatag.value() {
            MetatagValue::String(string) | MetatagValue::Recall(string) => self.string(level + 1, string)?,
            MetatagValue::Integer(integer) => self.scalar(level + 1, integer)?,
            MetatagValue::Date(date) => self.scalar(level + 1, date)?,
            MetatagValue::Size(size) => self.scalar(level + 1, size)?,
        }
        self.close(level)
    }

    fn scalar<K: ScalarKind>(&mut self, level: usize, scalar: &Scalar<K>) -> Result<()> {
        self.open(level, K::LABEL, "black!20")?;
        match (scalar.start(), scalar.end(), scalar.value()) {
            (Some(start), Some(end), _) => {
                self.constant(level + 1, start)?;
                self.constant(level + 1, end)?;
            }
            (_, _, Some(value)) => {
                self.constant(level + 1, value)?;
                let quantifier = scalar.quantifier().unwrap_or_default();
                self.constant(level + 1, quantifier.symbol())?;
            }
            _ => warn!(label = K::LABEL, "Scalar without a value"),
        }
        self.close(level)
    }

    fn string(&mut self, level: usize, string: &StringValue) -> Result<()> {
        self.open(level, "STR", "teal")?;
        let mode = match string.match_type() {
            MatchType::Exact => "Exact",
            MatchType::Pattern => "Pattern",
        };
        self.line(level + 1, &format!("[ ${}$, circle, draw, black!20]", mode))?;
        self.constant(level + 1, string.text())?;
        self.close(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Query, SubqueryName};
    use crate::builder;

    fn program(main_query: Expression, subqueries: Option<Subqueries>) -> Program {
        Program { query: Query { subqueries, main_query, order: None } }
    }

    fn tag(text: &str) -> Expression {
        builder::factor_expression(builder::tag_factor(builder::tag(builder::string(
            text.to_string(),
            MatchType::Exact,
        ))))
    }

    #[test]
    fn escapes_latex_specials() {
        assert_eq!(escape("red_panda"), "red\\_panda");
        assert_eq!(escape("100%"), "100\\%");
        assert_eq!(escape("a\\b"), "a\\backslash{}b");
        assert_eq!(escape("a[b]"), "a\\lbrack{}b\\rbrack{}");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn skips_named_metatag_without_name() {
        let nameless = Metatag {
            name: None,
            value: MetatagValue::String(builder::string("x".into(), MatchType::Exact)),
        };
        let tree = program(builder::factor_expression(builder::metatag_factor(nameless)), None);
        let document = Generator::default().generate_to_string(&tree).unwrap();
        assert!(!document.contains("$M$"));
        assert!(document.contains("$F$"));
        assert_eq!(document.matches('[').count(), document.matches(']').count());
    }

    #[test]
    fn skips_subquery_with_empty_name() {
        let subquery = Subquery { expression: tag("cat"), name: SubqueryName { name: String::new() } };
        let tree = program(tag("dog"), Some(builder::subquery_single(subquery)));
        let document = Generator::default().generate_to_string(&tree).unwrap();
        assert!(document.contains("$S$"));
        assert!(!document.contains("$sub$"));
        assert!(!document.contains("{cat}"));
        assert!(document.contains("{dog}"));
    }

    #[test]
    fn recall_uses_constant_name() {
        let recall = builder::recall_metatag(builder::string("pets".into(), MatchType::Exact));
        let tree = program(builder::factor_expression(builder::metatag_factor(recall)), None);
        let document = Generator::default().generate_to_string(&tree).unwrap();
        assert!(document.contains("[ ${recall}$, draw, black]"));
        assert!(document.contains("[ ${pets}$, draw, black]"));
    }

    #[test]
    fn honours_indentation_settings() {
        let settings = GeneratorSettings { indent_char: '\t', indent_size: 1 };
        let document = Generator::new(&settings).generate_to_string(&program(tag("cat"), None)).unwrap();
        assert!(document.contains("\n\t\t[ $P$, circle, draw, green\n\t\t\t[ $Q$, circle, draw, red\n"));
    }
}
