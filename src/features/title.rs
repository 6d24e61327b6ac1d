use crate::models::ParsedTitle;
use regex::Regex;
use std::sync::LazyLock;

/// `<year> <make> <model> [rest]`, e.g. "2023 Honda Civic LX Sedan"
pub const TITLE_PATTERN: &str = r"^\s*(\d{4})\s+([A-Za-z]+)\s+([A-Za-z-]+)(?:\s+(.*?))?\s*$";

/// Looser year match used when the title does not start with a year
pub const DEFAULT_YEAR_PATTERN: &str = r"(?:19|20)\d{2}";

pub const UNKNOWN_MAKE: &str = "Unknown";
pub const UNKNOWN_MODEL: &str = "Model";
pub const UNKNOWN_NAME: &str = "Unknown Make/Model";

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TITLE_PATTERN).expect("title pattern compiles"));

/// Parse a listing title. All fields are `None` when it does not match.
pub fn parse_title(title: &str) -> ParsedTitle {
    let Some(caps) = TITLE_RE.captures(title) else {
        return ParsedTitle::default();
    };

    let year = caps.get(1).and_then(|m| m.as_str().parse().ok());
    let make = caps.get(2).map(|m| m.as_str().to_string());
    let model = caps.get(3).map(|m| {
        let token = m.as_str();
        match caps.get(4).map(|r| r.as_str().trim()).filter(|r| !r.is_empty()) {
            Some(rest) => format!("{} {}", token, rest),
            None => token.to_string(),
        }
    });

    ParsedTitle { year, make, model }
}

/// Year lookup from titles: the strict title pattern first, then a looser
/// pattern (persisted with the model) for titles that don't lead with a year.
#[derive(Debug, Clone)]
pub struct YearExtractor {
    pattern: Regex,
}

impl YearExtractor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn year(&self, title: &str, parsed: &ParsedTitle) -> Option<i32> {
        parsed.year.or_else(|| {
            self.pattern
                .find(title)
                .and_then(|m| m.as_str().get(..4))
                .and_then(|digits| digits.parse().ok())
        })
    }
}

impl Default for YearExtractor {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_YEAR_PATTERN).expect("year pattern compiles"),
        }
    }
}

/// Make, model and label for display, never failing on odd titles
pub fn display_parts(parsed: &ParsedTitle) -> (String, String, String) {
    let make = parsed.make.clone().unwrap_or_else(|| UNKNOWN_MAKE.to_string());
    let model = parsed.model.clone().unwrap_or_else(|| UNKNOWN_MODEL.to_string());
    let name = match (&parsed.make, &parsed.model) {
        (Some(make), Some(model)) => format!("{} {}", make, model),
        _ => UNKNOWN_NAME.to_string(),
    };
    (make, model, name)
}
