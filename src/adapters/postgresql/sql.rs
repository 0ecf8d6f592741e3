//! SQL statement builders
//!
//! Every identifier coming from the configuration is quoted; the search
//! condition is the only raw SQL fragment and is inserted as configured.

use crate::core::plan::TableShape;

/// PostgreSQL truncates identifiers longer than this
const MAX_IDENTIFIER_LEN: usize = 63;

const STAGING_PREFIX: &str = "pganon_tmp_";

/// Name of the server-side cursor used for streaming
pub const CURSOR_NAME: &str = "pganon_cursor";

/// Quote one identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified table name (`schema.table`)
pub fn quote_table(name: &str) -> String {
    match name.split_once('.') {
        Some((schema, table)) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
        None => quote_ident(name),
    }
}

/// Unquoted name of the staging table for `table`
pub fn staging_table_name(table: &str) -> String {
    let mut name = format!("{}{}", STAGING_PREFIX, table.replace('.', "_"));
    if name.len() > MAX_IDENTIFIER_LEN {
        let mut end = MAX_IDENTIFIER_LEN;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(shape: &TableShape) -> String {
    match &shape.search {
        Some(search) => format!(" WHERE ({})", search),
        None => String::new(),
    }
}

/// `SELECT COUNT(*)` over the rows the table's search condition selects
pub fn count_sql(shape: &TableShape) -> String {
    format!(
        "SELECT COUNT(*) FROM {}{}",
        quote_table(&shape.table),
        where_clause(shape)
    )
}

/// Select of the fetched columns
///
/// `text_casts[i]` selects column `i` as `::text`; missing entries mean no cast.
pub fn select_sql(shape: &TableShape, text_casts: &[bool]) -> String {
    let columns = shape
        .fetch_columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if text_casts.get(i).copied().unwrap_or(false) {
                format!("{}::text", quote_ident(c))
            } else {
                quote_ident(c)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "SELECT {} FROM {}{}",
        columns,
        quote_table(&shape.table),
        where_clause(shape)
    )
}

/// Declare the streaming cursor over `select`
pub fn declare_cursor_sql(select: &str) -> String {
    format!("DECLARE {} NO SCROLL CURSOR FOR {}", CURSOR_NAME, select)
}

/// Fetch the next `size` rows from the streaming cursor
pub fn fetch_sql(size: usize) -> String {
    format!("FETCH FORWARD {} FROM {}", size, CURSOR_NAME)
}

/// Empty staging table with the source types of the identifying and rule columns
pub fn create_staging_sql(shape: &TableShape) -> String {
    format!(
        "CREATE TEMP TABLE {} ON COMMIT DROP AS SELECT {} FROM {} WITH NO DATA",
        quote_ident(&staging_table_name(&shape.table)),
        column_list(&shape.staging_columns()),
        quote_table(&shape.table)
    )
}

/// Text-format bulk load into the staging table
pub fn copy_sql(shape: &TableShape, delimiter_literal: &str) -> String {
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT text, DELIMITER {}, NULL '\\N')",
        quote_ident(&staging_table_name(&shape.table)),
        column_list(&shape.staging_columns()),
        delimiter_literal
    )
}

/// Index on the identifying column of the staging table
pub fn staging_index_sql(shape: &TableShape) -> String {
    format!(
        "CREATE INDEX ON {} ({})",
        quote_ident(&staging_table_name(&shape.table)),
        quote_ident(&shape.primary_key)
    )
}

/// Join-based update copying every staged column into the source table
pub fn merge_sql(shape: &TableShape) -> String {
    let assignments = shape
        .rule_columns
        .iter()
        .map(|c| {
            let column = quote_ident(c);
            format!("{column} = s.{column}")
        })
        .collect::<Vec<_>>()
        .join(", ");
    let key = quote_ident(&shape.primary_key);

    format!(
        "UPDATE {} t SET {} FROM {} s WHERE t.{key} = s.{key}",
        quote_table(&shape.table),
        assignments,
        quote_ident(&staging_table_name(&shape.table)),
    )
}

/// One `TRUNCATE` over all `tables`
pub fn truncate_sql(tables: &[String]) -> String {
    let tables = tables
        .iter()
        .map(|t| quote_table(t))
        .collect::<Vec<_>>()
        .join(", ");
    format!("TRUNCATE TABLE {}", tables)
}
