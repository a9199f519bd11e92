//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Parser table generator.
//!
//! `tabula-gen` reads a grammar (JSON or built with [`GrammarSpec`]) and
//! produces tables for the `tabula` runtime with one of:
//!  * **LR(0)**, **SLR(1)** and **canonical LR(1)**
//!  * **LALR(1)**, with lookaheads propagated through an auxiliary grammar
//!  * **LL(1)** prediction tables
//!
//! Tables are emitted as a Rust module and as JSON by [`generate`], or used
//! in process through [`LrGenerator::create_parser`].

pub mod actions;
pub mod automaton;
pub mod error;
pub mod generate;
pub mod generator;
pub mod grammar;
pub mod lalr;
pub mod ll;
pub mod lookahead;
pub mod spec;
pub mod symtab;
pub mod table;
pub mod variant;

pub use crate::error::GrammarError;
pub use crate::generate::{Overrides, generate};
pub use crate::generator::{Algorithm, Generator, GeneratorOptions, LlGenerator, LrGenerator};
pub use crate::grammar::Grammar;
pub use crate::spec::{Alternative, GrammarSpec};
pub use crate::table::{Resolution, Solution, describe_action};
