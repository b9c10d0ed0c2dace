//! SQL WHERE clause builder for the route listing query.
//!
//! Tracks positional parameter indices so callers can bind values in the
//! same order the conditions were added.

/// Builder for SQL WHERE clauses with parameter tracking.
///
/// # Example
/// ```ignore
/// let mut qb = QueryBuilder::new();
/// qb.add_param_condition("user_id = ");
/// qb.add_optional(&query.from, |idx| format!("started_at >= ${idx}"));
/// let sql = format!("SELECT * FROM routes WHERE {}", qb.build_where());
/// ```
#[derive(Debug)]
pub struct QueryBuilder {
    conditions: Vec<String>,
    param_idx: usize,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            param_idx: 1,
        }
    }

    /// Adds `{prefix}$n` and returns `n`.
    pub fn add_param_condition(&mut self, condition_prefix: &str) -> usize {
        let idx = self.next_param_idx();
        self.conditions.push(format!("{condition_prefix}${idx}"));
        idx
    }

    /// Adds the condition built by `condition_fn` only when `value` is present.
    pub fn add_optional<T, F>(&mut self, value: &Option<T>, condition_fn: F) -> &mut Self
    where
        F: FnOnce(usize) -> String,
    {
        if value.is_some() {
            let idx = self.next_param_idx();
            self.conditions.push(condition_fn(idx));
        }
        self
    }

    /// Reserves the next parameter index, e.g. for a LIMIT clause.
    pub fn next_param_idx(&mut self) -> usize {
        let idx = self.param_idx;
        self.param_idx += 1;
        idx
    }

    /// The conditions joined by AND, without the keyword.
    pub fn build_where(&self) -> String {
        self.conditions.join(" AND ")
    }
}
