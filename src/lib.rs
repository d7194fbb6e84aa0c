//! Tagquery – a compiler front end for a boolean tag-search query language.
//!
//! A query combines plain *tags* and typed *metatags* (`name:value` filters)
//! with `AND`, `OR`, `NOT` and parentheses. It may be preceded by named
//! subqueries (`(cat OR dog) AS pets`) and followed by an ordering clause
//! (`ORDER BY likes DESC`).
//!
//! Compilation runs in stages:
//! * [`source`] – the `pest` grammar (`tagquery.pest`), the lexical context
//!   stack and the metatag [`source::Vocabulary`].
//! * [`parser`] – the [`parser::Compiler`], which walks the parse tree and calls
//!   one semantic action per reduced production.
//! * [`builder`] – the semantic actions themselves and the program assembler,
//!   which reports a failed compilation when the token source ends inside an
//!   unterminated context.
//! * [`ast`] – the owned, immutable tree those actions produce.
//! * [`generator`] – renders a tree as a LaTeX `forest` document.
//! * [`release`] – explicit post-order teardown of a tree, with per-kind tallies.
//!
//! [`settings`] layers the embedded defaults, a user file and `TAGQUERY__*`
//! environment variables.
//!
//! ## Quick Start
//! ```
//! use tagquery::{Compiler, Generator, Vocabulary};
//! let compiler = Compiler::new(Vocabulary::standard());
//! let program = compiler.compile("red_panda AND NOT blue").unwrap().into_program().unwrap();
//! let document = Generator::default().generate_to_string(&program).unwrap();
//! assert!(document.contains("\\begin{forest}"));
//! ```

pub mod ast;
pub mod builder;
pub mod error;
pub mod generator;
pub mod parser;
pub mod release;
pub mod settings;
pub mod source;

pub use builder::CompilerState;
pub use error::{Result, TagQueryError};
pub use generator::Generator;
pub use parser::Compiler;
pub use release::{Census, Release, ReleaseLedger};
pub use settings::{Loader, Settings};
pub use source::Vocabulary;

/// Compiles `input` with the built-in metatag vocabulary.
pub fn compile(input: &str) -> Result<CompilerState> {
    Compiler::new(Vocabulary::standard()).compile(input)
}
