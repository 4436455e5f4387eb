use serde::{Deserialize, Serialize};

/// Number of columns extracted from each worksheet row (columns A-X).
pub const EXTRACTED_FIELDS: usize = 24;

/// Total width of an emitted record: the 24 extracted fields plus the
/// source code appended as field 25.
pub const RECORD_WIDTH: usize = 25;

/// Fixed header of the pipe-delimited extract. Field roles are positional:
/// 1-8 are identity/text fields, 9-24 monetary amounts, 25 the source code.
pub const CSV_HEADER: [&str; RECORD_WIDTH] = [
    "1-member-id",
    "2-document",
    "3-document-type",
    "4-full-name",
    "5-payroll-code",
    "6-employment-status",
    "7-member-status",
    "8-assigned-unit",
    "9-personal-contrib",
    "10-affiliate-secondary",
    "11-voluntary-fund",
    "12-child-under-35",
    "13-dependent-minor",
    "14-assistance-credit",
    "15-gross-salary",
    "16-net-salary",
    "17-personal-adjust",
    "18-affiliate-adjust",
    "19-voluntary-fund-adjust",
    "20-child-under-35-adjust",
    "21-dependent-minor-adjust",
    "22-assistance-credit-adjust",
    "23-employer-contrib",
    "24-employer-adjust",
    "25-source-code",
];

/// One normalized row extracted from a source workbook.
///
/// Width is fixed at construction time: every record holds exactly
/// [`RECORD_WIDTH`] fields, so downstream CSV output stays rectangular.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    /// Builds a record from the extracted cells plus the source code that
    /// becomes field 25. Short cell vectors are padded with empty strings
    /// up to the 24 extracted columns.
    pub fn from_extracted(mut cells: Vec<String>, source_code: &str) -> Self {
        cells.resize(EXTRACTED_FIELDS, String::new());
        cells.push(source_code.to_string());
        Self { fields: cells }
    }

    /// All 25 fields in column order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Consumes the record into its raw field vector.
    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    /// The classification code appended as field 25.
    pub fn source_code(&self) -> &str {
        &self.fields[RECORD_WIDTH - 1]
    }

    /// True when every extracted field (positions 1-24) is empty.
    pub fn is_blank(&self) -> bool {
        self.fields[..EXTRACTED_FIELDS]
            .iter()
            .all(|field| field.is_empty())
    }
}

/// Organizational type of a source file, derived from its filename.
///
/// Variants are declared in classification precedence order: when a
/// filename matches several pattern groups, the first declared kind wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    MunicipalFund,
    School,
    DecentralizedEntity,
    Commune,
    Municipality,
    Other,
}

impl EntityKind {
    /// Every kind, in precedence order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::MunicipalFund,
        EntityKind::School,
        EntityKind::DecentralizedEntity,
        EntityKind::Commune,
        EntityKind::Municipality,
        EntityKind::Other,
    ];

    /// Human-readable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::MunicipalFund => "Municipal Funds",
            EntityKind::School => "Schools",
            EntityKind::DecentralizedEntity => "Decentralized Entities",
            EntityKind::Commune => "Communes",
            EntityKind::Municipality => "Municipalities",
            EntityKind::Other => "Other",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
