use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
	Startups,
	Updates,
}

impl Table {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Startups => "startups",
			Self::Updates => "updates",
		}
	}
}

impl fmt::Display for Table {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// An equality filter, `column = value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
	pub column: String,
	pub value: String,
}

impl Filter {
	pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
		Self {
			column: column.into(),
			value: value.to_string(),
		}
	}

	/// Whether a row satisfies the filter, comparing the textual form of the
	/// column the way the data API does.
	pub fn matches(&self, row: &Value) -> bool {
		match row.get(&self.column) {
			Some(Value::String(s)) => *s == self.value,
			Some(Value::Null) | None => self.value == "null",
			Some(other) => other.to_string() == self.value,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
	pub column: String,
	pub descending: bool,
}

/// A read against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
	pub table: Table,
	pub filters: Vec<Filter>,
	pub order: Option<Order>,
	pub limit: Option<usize>,
	/// Embed the owning startup of each update under `startup`
	pub embed_startup: bool,
}

impl Query {
	pub fn new(table: Table) -> Self {
		Self {
			table,
			filters: Vec::new(),
			order: None,
			limit: None,
			embed_startup: false,
		}
	}

	pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
		self.filters.push(Filter::eq(column, value));
		self
	}

	pub fn order_desc(mut self, column: impl Into<String>) -> Self {
		self.order = Some(Order {
			column: column.into(),
			descending: true,
		});
		self
	}

	pub fn limit(mut self, limit: usize) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn with_startup(mut self) -> Self {
		self.embed_startup = true;
		self
	}

	/// The PostgREST query string for this read.
	pub fn to_params(&self) -> Vec<(String, String)> {
		let select = if self.embed_startup {
			"*,startup:startups(*)"
		} else {
			"*"
		};

		let mut params = vec![("select".to_owned(), select.to_owned())];
		params.extend(filter_params(&self.filters));

		if let Some(order) = &self.order {
			let direction = if order.descending { "desc" } else { "asc" };
			params.push(("order".to_owned(), format!("{}.{direction}", order.column)));
		}

		if let Some(limit) = self.limit {
			params.push(("limit".to_owned(), limit.to_string()));
		}

		params
	}
}

pub fn filter_params(filters: &[Filter]) -> impl Iterator<Item = (String, String)> + '_ {
	filters.iter().map(|f| (f.column.clone(), format!("eq.{}", f.value)))
}
