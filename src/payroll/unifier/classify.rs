//! Filename-based entity classification.
//!
//! Source files follow the naming convention `code-entity name-year.xlsx`.
//! The organizational type is recognized from Spanish institutional tokens
//! in the name; precedence between the pattern groups is an explicit,
//! ordered data structure rather than implicit code order.

use std::path::Path;

use regex::RegexSet;
use tracing::debug;

use crate::payroll::unifier::error::Result;
use crate::payroll::unifier::model::EntityKind;

/// Code recorded in field 25 when the filename carries no usable prefix.
pub const NO_CODE: &str = "NO_CODE";

/// Pattern groups in precedence order: the first group with a match wins,
/// so a file named after both a municipal fund and a school classifies as
/// a municipal fund.
const PATTERN_GROUPS: [(EntityKind, &[&str]); 5] = [
    (
        EntityKind::MunicipalFund,
        &[
            "caja",
            "caja.*municipal",
            "caja.*provincial",
            "banco.*municipal",
            "caja de jubilaciones",
            "caja de previsión",
            "caja de prevision",
        ],
    ),
    (
        EntityKind::School,
        &[
            "idessa",
            "escuela",
            "instituto.*educacion",
            "instituto.*educación",
            "colegio",
            "universidad",
            "facultad",
        ],
    ),
    (
        EntityKind::DecentralizedEntity,
        &[
            "ente",
            "ente.*descentralizado",
            "ente.*autarq",
            "autarquico",
            "autárquico",
            "instituto.*autarq",
            "organismo.*descentralizado",
            "entidad.*autonoma",
            "entidad.*autónoma",
            "autarq",
        ],
    ),
    (EntityKind::Commune, &["comuna", r"^com\.", "comuna de"]),
    (
        EntityKind::Municipality,
        &[
            "municipio",
            "municipalidad",
            "intendencia",
            "municipal",
            r"^mun\.",
            "municipio de",
        ],
    ),
];

/// Maps filenames to [`EntityKind`] labels using ordered pattern groups.
pub struct EntityClassifier {
    groups: Vec<(EntityKind, RegexSet)>,
}

impl EntityClassifier {
    pub fn new() -> Result<Self> {
        let mut groups = Vec::with_capacity(PATTERN_GROUPS.len());
        for (kind, patterns) in PATTERN_GROUPS {
            groups.push((kind, RegexSet::new(patterns)?));
        }
        Ok(Self { groups })
    }

    /// Assigns exactly one label per filename. Both the lowercased raw name
    /// and a variant with separator runs collapsed to single spaces are
    /// tested; files matching no group fall back to [`EntityKind::Other`].
    pub fn classify(&self, file_name: &str) -> EntityKind {
        let lowered = file_name.to_lowercase();
        let collapsed = collapse_separators(&stem(file_name).to_lowercase());

        for (kind, set) in &self.groups {
            if set.is_match(&lowered) || set.is_match(&collapsed) {
                debug!(file = file_name, kind = %kind, "classified source file");
                return *kind;
            }
        }

        debug!(file = file_name, "no classification pattern matched");
        EntityKind::Other
    }
}

/// Extracts the source code recorded as field 25: the trimmed text before
/// the first `-` of the file stem (`1234-Municipality X-2025.xlsx` → `1234`).
pub fn source_code(file_name: &str) -> String {
    let stem = stem(file_name);
    let code = stem.split('-').next().unwrap_or("").trim();
    if code.is_empty() {
        NO_CODE.to_string()
    } else {
        code.to_string()
    }
}

fn stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}

fn collapse_separators(name: &str) -> String {
    let mut collapsed = String::with_capacity(name.len());
    let mut pending_space = false;
    for ch in name.chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            pending_space = !collapsed.is_empty();
        } else {
            if pending_space {
                collapsed.push(' ');
                pending_space = false;
            }
            collapsed.push(ch);
        }
    }
    collapsed
}
