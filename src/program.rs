//! Assembly of one executable program from "domain" and "visual" fragments.
//!
//! Both fragments may carry `@Engine(...)` directives. Exactly one survives
//! assembly: the first one found in the domain fragment, or
//! [`DEFAULT_DIRECTIVE`] when the domain has none. Every other occurrence is
//! stripped so the engine never sees a second directive.

use std::io::Write;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use tempfile::NamedTempFile;

use crate::error::Result;

/// Directive used when the domain fragment does not pick an engine itself.
pub const DEFAULT_DIRECTIVE: &str = "@Engine(\"sqlite\");";

// names the answer-set solver backend, in any casing
const SOLVER_MARKER: &str = "clingo";

lazy_static! {
    // single-line, no nested parentheses; the directive grammar is the
    // engine's, and this is as far as it goes
    static ref ENGINE_DIRECTIVE: Regex =
        Regex::new(r"(?i)@Engine\s*\([^)]*\)\s*;?\s*").unwrap();
}

/// An assembled program ready to be handed to the engine.
#[derive(Debug, Clone)]
pub struct Program {
    text: String,
}

impl Program {
    /// Merge the two fragments into one program.
    ///
    /// The effective directive (parameters preserved verbatim) becomes the
    /// first line, followed by a blank line and the cleaned domain text. The
    /// cleaned visual text is appended after another blank line only when it
    /// is non-empty.
    pub fn assemble(domain: &str, visual: Option<&str>) -> Self {
        let directive = ENGINE_DIRECTIVE
            .find(domain)
            .map(|m| m.as_str().trim().to_owned())
            .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_owned());

        let clean_domain = ENGINE_DIRECTIVE.replace_all(domain, "");
        let clean_domain = clean_domain.trim();
        let clean_visual = ENGINE_DIRECTIVE.replace_all(visual.unwrap_or(""), "");
        let clean_visual = clean_visual.trim();

        let mut text = format!("{directive}\n\n{clean_domain}");
        if !clean_visual.is_empty() {
            text.push_str("\n\n");
            text.push_str(clean_visual);
        }
        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the program depends on the external answer-set solver. Such a
    /// program has no legitimately empty result, which changes how an
    /// all-empty run is reported.
    pub fn invokes_solver(&self) -> bool {
        self.text.to_ascii_lowercase().contains(SOLVER_MARKER)
    }
}

/// A program externalized to a uniquely named scratch file so external
/// processes can read it. The file lives for one request; dropping the guard
/// removes it on every exit path.
pub struct ScratchProgram {
    file: NamedTempFile,
}

impl ScratchProgram {
    pub fn write(program: &Program) -> Result<ScratchProgram> {
        let mut file = tempfile::Builder::new()
            .prefix("logicad-")
            .suffix(".l")
            .tempfile()?;
        file.write_all(program.text().as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
