use scraper::{ElementRef, Html, Selector};

use crate::Error;

use super::{FieldMap, Source};

pub trait FieldExtractor: Send + Sync {
    /// Returns `None` when the page lacks the expected results container.
    fn extract(&self, body: &str) -> Option<FieldMap>;
}

/// Reads two-cell rows of the first table under a container element.
///
/// The first cell is the field name. The second cell is the value, except for
/// `nested_field`, whose value is taken from the inner `span` when there is one.
pub struct TableExtractor {
    container: Selector,
    table: Selector,
    row: Selector,
    cell: Selector,
    nested: Selector,
    nested_field: &'static str,
}

impl TableExtractor {
    pub fn new(container: &str, nested_field: &'static str) -> Result<Self, Error> {
        Ok(Self {
            container: parse_selector(container)?,
            table: parse_selector("table")?,
            row: parse_selector("tr")?,
            cell: parse_selector("td")?,
            nested: parse_selector("span")?,
            nested_field,
        })
    }

    pub fn ipshudi() -> Result<Self, Error> {
        Self::new("div.ft", "归属地")
    }

    pub fn ip138() -> Result<Self, Error> {
        Self::new("div.table-box", "ASN归属地")
    }

    pub fn for_source(source: Source) -> Result<Self, Error> {
        match source {
            Source::Ipshudi => Self::ipshudi(),
            Source::Ip138 => Self::ip138(),
        }
    }

    fn field_value(&self, name: &str, cell: ElementRef<'_>) -> String {
        if name == self.nested_field {
            if let Some(inner) = cell.select(&self.nested).next() {
                return stripped_text(inner);
            }
        }
        stripped_text(cell)
    }
}

impl FieldExtractor for TableExtractor {
    fn extract(&self, body: &str) -> Option<FieldMap> {
        let document = Html::parse_document(body);
        let container = document.select(&self.container).next()?;
        let table = container.select(&self.table).next()?;

        let mut fields = FieldMap::new();
        for row in table.select(&self.row) {
            let cells: Vec<ElementRef<'_>> = row.select(&self.cell).collect();
            let [name, value] = cells.as_slice() else {
                continue;
            };
            let name = name.text().collect::<String>().trim().to_string();
            let value = self.field_value(&name, *value);
            fields.insert(name, value);
        }
        Some(fields)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, Error> {
    Selector::parse(selector).map_err(|e| Error::selector(selector, format!("{e:?}")))
}

/// Text of every descendant text node, each trimmed, empty ones dropped.
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
