//! Logicad – a small execution service for Logica graph programs.
//!
//! A client supplies two fragments of a logic program: the *domain* text
//! (facts and rules) and an optional *visual* text (presentation rules).
//! Logicad splices them into one program under a single `@Engine(...)`
//! directive, hands the program to the external Logica engine through an
//! ordered chain of invocation strategies, parses the engine's ASCII table
//! output, and returns structured tables for the `Graph`, `Node` and `Edge`
//! predicates that a frontend renders as a graph.
//!
//! ## Modules
//! * [`program`] – directive splicing and the scratch program file.
//! * [`table`] – the table parser and cell value normalizer.
//! * [`engine`] – invocation strategies, process lifecycle, the fallback chain.
//! * [`executor`] – per-request aggregation and the soft/hard failure policy.
//! * [`settings`] – configuration from file and environment.
//! * [`server`] – the HTTP surface.
//!
//! ## Quick Start
//! ```
//! use logicad::program::Program;
//! use logicad::table::parse_table;
//!
//! let program = Program::assemble("@Engine(\"duckdb\");\nEdge(1, 2);", None);
//! assert!(program.text().starts_with("@Engine(\"duckdb\");"));
//!
//! let table = parse_table("| col |\n+-----+\n| 1   |\n").unwrap();
//! assert_eq!(table.columns, vec!["col"]);
//! assert_eq!(table.rows, vec![vec!["1".to_string()]]);
//! ```
//!
//! ## Execution model
//! Engine invocations are synchronous with a hard per-attempt timeout; the
//! HTTP layer runs them on blocking-pool threads. Nothing persists between
//! requests: each request writes its own uniquely named scratch program file
//! and removes it when done, whatever the outcome.

pub mod error;
pub mod program;
pub mod table;
pub mod engine;
pub mod executor;
pub mod settings;
pub mod server;
