use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::errors::ServiceError;

/// Cell text of one spreadsheet row, starting at column A.
pub type Row = Vec<String>;

/// Read every row of the first sheet as text.
///
/// The format is detected from the bytes (xlsx, xlsm, xlsb, xls, ods). Rows
/// and columns before the first used cell come back empty so that index 0 is
/// always row 1 / column A.
pub fn read_rows(bytes: &[u8]) -> Result<Vec<Row>, ServiceError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ServiceError::Format(format!("failed to open workbook: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ServiceError::Format("workbook does not contain any sheets".into()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ServiceError::Format(format!("failed to get rows from sheet {sheet_name}: {e}")))?;

    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Row> = vec![Vec::new(); first_row as usize];
    for cells in range.rows() {
        let mut row: Row = vec![String::new(); first_col as usize];
        row.extend(cells.iter().map(cell_text));
        rows.push(row);
    }
    Ok(rows)
}

/// Whole numbers print without a fractional part, so a numeric student
/// number `1001` reads back as `"1001"`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{xlsx_fixture, xlsx_without_sheets};

    #[test]
    fn garbage_is_a_format_error() {
        let res = read_rows(b"definitely not a spreadsheet");
        assert!(matches!(res, Err(ServiceError::Format(_))));
        assert!(matches!(read_rows(&[]), Err(ServiceError::Format(_))));
    }

    #[test]
    fn workbook_without_sheets_is_a_format_error() {
        let res = read_rows(&xlsx_without_sheets());
        assert!(matches!(res, Err(ServiceError::Format(_))));
    }

    #[test]
    fn reads_first_sheet_rows() {
        let bytes = xlsx_fixture(&[&["id", "name"], &["S1", " Ann "], &["S2", "Bo"]]);
        let rows = read_rows(&bytes).expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["id", "name"]);
        assert_eq!(rows[1], vec!["S1", "Ann"]);
    }

    #[test]
    fn leading_blank_cells_keep_column_positions() {
        let bytes = xlsx_fixture(&[&["id", "name"], &["", "NoId"], &["S3", "Cy"]]);
        let rows = read_rows(&bytes).expect("rows");
        assert_eq!(rows[1].first().map(String::as_str), Some(""));
        assert_eq!(rows[1].get(1).map(String::as_str), Some("NoId"));
    }

    #[test]
    fn whole_floats_print_as_integers() {
        assert_eq!(cell_text(&Data::Float(1001.0)), "1001");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
