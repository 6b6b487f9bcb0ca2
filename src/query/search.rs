//! Free-text search terms and their local / remote evaluation

use crate::types::{AgentWithCount, Customer, CustomerRow};

/// Parsed search box contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    raw: String,
    lowered: String,
    id: Option<i64>,
}

impl SearchTerm {
    /// Parse user input. Blank input means "no filter" and yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            lowered: raw.to_lowercase(),
            id: raw.parse::<i64>().ok(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric interpretation of the term, if it has one
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Case-insensitive substring match
    pub fn matches_text(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.lowered)
    }

    /// Identifier clause: only present when the term is numeric.
    /// The parsed value matches exactly; the id's decimal text also matches
    /// the term as a substring.
    pub fn matches_id(&self, id: i64) -> bool {
        match self.id {
            Some(value) => value == id || id.to_string().contains(&self.raw),
            None => false,
        }
    }

    /// Evaluate against a record's text fields and identifier
    pub fn matches<R: Searchable + ?Sized>(&self, record: &R) -> bool {
        record.search_fields().iter().any(|f| self.matches_text(f))
            || self.matches_id(record.search_id())
    }

    /// PostgREST `or` logic tree: `ilike` on each text column, plus `eq` on
    /// the id column when the term is numeric. LIKE wildcards in the term
    /// are escaped so they match literally.
    pub fn to_or_filter(&self, text_columns: &[&str], id_column: &str) -> String {
        let pattern = quote_value(&format!("*{}*", escape_like(&self.raw)));
        let mut clauses: Vec<String> = text_columns
            .iter()
            .map(|col| format!("{}.ilike.{}", quote_column(col), pattern))
            .collect();
        if let Some(id) = self.id {
            clauses.push(format!("{}.eq.{}", quote_column(id_column), id));
        }
        format!("({})", clauses.join(","))
    }
}

/// Records that can be matched by a search term
pub trait Searchable {
    fn search_id(&self) -> i64;
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for Customer {
    fn search_id(&self) -> i64 {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        if let Some(phone) = &self.phone {
            fields.push(phone);
        }
        fields
    }
}

impl Searchable for CustomerRow {
    fn search_id(&self) -> i64 {
        self.customer.id
    }

    fn search_fields(&self) -> Vec<&str> {
        self.customer.search_fields()
    }
}

impl Searchable for AgentWithCount {
    fn search_id(&self) -> i64 {
        self.agent.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.agent.full_name.as_str()]
    }
}

/// Characters PostgREST treats as syntax inside a logic tree
const RESERVED: &[char] = &[',', '.', ':', '(', ')', '"', '\\'];

/// Double-quote a column name when it contains spaces or reserved characters
pub fn quote_column(name: &str) -> String {
    if name.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c)) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name.to_string()
    }
}

fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn quote_value(value: &str) -> String {
    if value.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c)) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Agent;

    fn customer(id: i64, name: &str, phone: Option<&str>) -> Customer {
        Customer {
            id,
            name: name.to_string(),
            phone: phone.map(String::from),
            agent_id: None,
            created_at: None,
        }
    }

    #[test]
    fn test_parse_blank_is_none() {
        assert!(SearchTerm::parse("").is_none());
        assert!(SearchTerm::parse("   ").is_none());
    }

    #[test]
    fn test_parse_numeric() {
        let term = SearchTerm::parse(" 42 ").unwrap();
        assert_eq!(term.as_str(), "42");
        assert_eq!(term.id(), Some(42));
        assert_eq!(SearchTerm::parse("ali").unwrap().id(), None);
    }

    #[test]
    fn test_text_match_is_case_insensitive() {
        let term = SearchTerm::parse("OSMAN").unwrap();
        assert!(term.matches(&customer(1, "Amna Osman", None)));
        assert!(!term.matches(&customer(2, "Ali Hassan", None)));
    }

    #[test]
    fn test_phone_match() {
        let term = SearchTerm::parse("0912").unwrap();
        assert!(term.matches(&customer(1, "Someone", Some("+249 0912 555"))));
    }

    #[test]
    fn test_non_numeric_term_never_matches_id() {
        let term = SearchTerm::parse("x").unwrap();
        assert!(!term.matches_id(1));
        assert!(!term.matches(&customer(10, "Bob", None)));
    }

    #[test]
    fn test_numeric_term_is_superset_of_exact_id() {
        let term = SearchTerm::parse("12").unwrap();
        let rows = vec![
            customer(12, "No match", None),
            customer(3, "Room 12", None),
            customer(4, "Phone", Some("0012")),
            customer(112, "Contains id", None),
            customer(5, "Unrelated", None),
        ];

        let matched: Vec<i64> = rows.iter().filter(|c| term.matches(*c)).map(|c| c.id).collect();
        assert_eq!(matched, vec![12, 3, 4, 112]);
    }

    #[test]
    fn test_agent_search_by_name_and_id() {
        let term = SearchTerm::parse("7").unwrap();
        let agent = AgentWithCount::new(Agent::new(17, "Huda"), 0);
        assert!(term.matches(&agent));

        let term = SearchTerm::parse("hud").unwrap();
        assert!(term.matches(&agent));
    }

    #[test]
    fn test_padded_numeric_term_matches_exact_id() {
        let agent = AgentWithCount::new(Agent::new(7, "Huda"), 0);
        for input in ["007", "+7", " 7 "] {
            let term = SearchTerm::parse(input).unwrap();
            assert_eq!(term.id(), Some(7), "{}", input);
            assert!(term.matches(&agent), "{}", input);
        }
        assert!(!SearchTerm::parse("007").unwrap().matches_id(70));
    }

    #[test]
    fn test_wildcards_match_literally() {
        let term = SearchTerm::parse("50%").unwrap();
        assert!(term.matches(&customer(1, "Discount 50%", None)));
        assert!(!term.matches(&customer(2, "Discount 500", None)));
    }

    #[test]
    fn test_or_filter_text_only() {
        let term = SearchTerm::parse("ali").unwrap();
        assert_eq!(
            term.to_or_filter(&["Customer_Name", "Customer_Mobile"], "Customer ID"),
            "(Customer_Name.ilike.*ali*,Customer_Mobile.ilike.*ali*)"
        );
    }

    #[test]
    fn test_or_filter_numeric_adds_id_clause() {
        let term = SearchTerm::parse("42").unwrap();
        assert_eq!(
            term.to_or_filter(&["Customer_Name"], "Customer ID"),
            "(Customer_Name.ilike.*42*,\"Customer ID\".eq.42)"
        );
    }

    #[test]
    fn test_or_filter_escapes_like_wildcards() {
        let term = SearchTerm::parse("a_b%").unwrap();
        assert_eq!(
            term.to_or_filter(&["Customer_Name"], "Customer ID"),
            "(Customer_Name.ilike.\"*a\\\\_b\\\\%*\")"
        );
    }

    #[test]
    fn test_or_filter_quotes_reserved_values() {
        let term = SearchTerm::parse("a, b").unwrap();
        assert_eq!(
            term.to_or_filter(&["Customer_Name"], "Customer ID"),
            "(Customer_Name.ilike.\"*a, b*\")"
        );
    }
}
