//! Table component used by the dashboard pages.

use maud::{html, Markup, Render};

/// A table with a header row and pre-rendered body rows.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Markup>,
}

impl Table {
    #[must_use]
    pub fn new(headers: Vec<&str>) -> Self {
        Self {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn rows(mut self, rows: Vec<Markup>) -> Self {
        self.rows = rows;
        self
    }
}

impl Render for Table {
    fn render(&self) -> Markup {
        html! {
            table {
                thead {
                    tr {
                        @for header in &self.headers {
                            th scope="col" { (header) }
                        }
                    }
                }
                tbody {
                    @for row in &self.rows {
                        (row)
                    }
                }
            }
        }
    }
}

/// A single table row built cell by cell.
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    cells: Vec<Markup>,
}

impl TableRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cell(mut self, content: &str) -> Self {
        self.cells.push(html! { td { (content) } });
        self
    }

    #[must_use]
    pub fn cell_markup(mut self, content: Markup) -> Self {
        self.cells.push(html! { td { (content) } });
        self
    }
}

impl Render for TableRow {
    fn render(&self) -> Markup {
        html! {
            tr {
                @for cell in &self.cells {
                    (cell)
                }
            }
        }
    }
}
