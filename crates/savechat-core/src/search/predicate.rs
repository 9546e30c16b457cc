//! Parameterized SELECT builder over a closed set of predicate kinds.

use std::fmt::Write as _;

use libsql::Value;

/// Type-safe parameter binding for generated queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Integer(i64),
    Text(String),
    /// Bound as a JSON array and expanded with `json_each`
    TextSet(Vec<String>),
}

impl QueryParam {
    fn to_value(&self) -> Value {
        match self {
            Self::Integer(value) => Value::Integer(*value),
            Self::Text(value) => Value::Text(value.clone()),
            Self::TextSet(values) => Value::Text(serde_json::Value::from(values.clone()).to_string()),
        }
    }
}

/// One conjunct of a WHERE clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column = ?`
    Equals {
        column: &'static str,
        value: QueryParam,
    },
    /// Case-insensitive substring match against any of `columns`.
    ///
    /// The needle is lowercased with `str::to_lowercase`, so `columns` must
    /// hold text folded the same way. It is bound once and referenced from
    /// every column test. `%`, `_` and `\` in the needle match literally.
    Contains {
        columns: &'static [&'static str],
        needle: String,
    },
    /// The JSON array in `column` shares at least one element with `values`.
    Overlaps {
        column: &'static str,
        values: Vec<String>,
    },
}

/// A finished query: SQL text plus parameters in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    sql: String,
    params: Vec<QueryParam>,
}

impl SelectQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    /// Parameters converted for binding on a libSQL connection.
    pub fn values(&self) -> Vec<Value> {
        self.params.iter().map(QueryParam::to_value).collect()
    }
}

/// Builds `SELECT {columns} FROM {table} [WHERE ...] ORDER BY ... DESC LIMIT n`.
pub struct SelectBuilder {
    table: &'static str,
    columns: &'static str,
    predicates: Vec<Predicate>,
    order_by: Option<&'static str>,
    limit: Option<u32>,
}

impl SelectBuilder {
    pub const fn new(table: &'static str, columns: &'static str) -> Self {
        Self {
            table,
            columns,
            predicates: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add the predicate only when it is `Some`.
    #[must_use]
    pub fn filter_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(predicate) => self.filter(predicate),
            None => self,
        }
    }

    #[must_use]
    pub const fn order_by_desc(mut self, column: &'static str) -> Self {
        self.order_by = Some(column);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self) -> SelectQuery {
        let mut clauses = Vec::with_capacity(self.predicates.len());
        let mut params = Vec::with_capacity(self.predicates.len());

        for predicate in self.predicates {
            let idx = params.len() + 1;
            match predicate {
                Predicate::Equals { column, value } => {
                    clauses.push(format!("{column} = ?{idx}"));
                    params.push(value);
                }
                Predicate::Contains { columns, needle } => {
                    let tests = columns
                        .iter()
                        .map(|column| format!("{column} LIKE ?{idx} ESCAPE '\\'"))
                        .collect::<Vec<_>>()
                        .join(" OR ");
                    clauses.push(format!("({tests})"));
                    params.push(QueryParam::Text(like_pattern(&needle)));
                }
                Predicate::Overlaps { column, values } => {
                    clauses.push(format!(
                        "EXISTS (SELECT 1 FROM json_each({table}.{column}) AS t \
                         WHERE t.value IN (SELECT value FROM json_each(?{idx})))",
                        table = self.table
                    ));
                    params.push(QueryParam::TextSet(values));
                }
            }
        }

        let mut sql = format!("SELECT {} FROM {}", self.columns, self.table);
        if !clauses.is_empty() {
            let _ = write!(sql, " WHERE {}", clauses.join(" AND "));
        }
        if let Some(column) = self.order_by {
            let _ = write!(sql, " ORDER BY {column} DESC");
        }
        if let Some(limit) = self.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }

        SelectQuery { sql, params }
    }
}

/// Lowercase `needle` and wrap it in `%` after escaping LIKE metacharacters with `\`.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
