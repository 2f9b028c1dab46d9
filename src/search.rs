use crate::model::Person;

/// Whitespace-separated, lower-cased query terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    terms: Vec<String>,
}

impl SearchQuery {
    pub fn parse(raw: &str) -> Self {
        Self {
            terms: raw.split_whitespace().map(|t| t.to_lowercase()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Every term must be a substring of at least one name field.
    pub fn matches(&self, person: &Person) -> bool {
        let fields = [
            Some(person.first_name.to_lowercase()),
            Some(person.last_name.to_lowercase()),
            person.nickname.as_ref().map(|n| n.to_lowercase()),
        ];
        self.terms.iter().all(|term| {
            fields
                .iter()
                .flatten()
                .any(|field| field.contains(term.as_str()))
        })
    }
}

/// Filters `persons`, orders by (given name, family name) and truncates to `limit`.
pub fn search<'a>(persons: &'a [Person], query: &SearchQuery, limit: usize) -> Vec<&'a Person> {
    let mut hits: Vec<&Person> = persons.iter().filter(|p| query.matches(p)).collect();
    hits.sort_by(|a, b| {
        a.first_name
            .cmp(&b.first_name)
            .then_with(|| a.last_name.cmp(&b.last_name))
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(limit);
    hits
}
