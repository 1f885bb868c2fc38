use crate::RawRow;

const LETTERS: u64 = 26;

/// A source column as shown to the user while assigning fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub index: usize,
    /// Spreadsheet-style label: `A`..`Z`, `AA`..
    pub code: String,
    /// First preview cell, when the file has a header row.
    pub header: Option<String>,
    /// Sample cells, header excluded.
    pub values: Vec<String>,
}

/// Derive the column list from the preview rows.
///
/// Column count is the width of the first row; shorter rows contribute
/// empty strings.
pub fn generate_preview_columns(first_rows: &[RawRow], has_headers: bool) -> Vec<Column> {
    let width = first_rows.first().map_or(0, Vec::len);

    (0..width)
        .map(|index| {
            let mut values: Vec<String> = first_rows
                .iter()
                .map(|row| row.get(index).cloned().unwrap_or_default())
                .collect();
            let header = if has_headers && !values.is_empty() {
                Some(values.remove(0))
            } else {
                None
            };

            Column {
                index,
                code: generate_column_code(index as isize),
                header,
                values,
            }
        })
        .collect()
}

/// Bijective base-26 column name; negative indices (no column) give `""`.
///
/// Defined for every non-negative `isize`.
pub fn generate_column_code(index: isize) -> String {
    if index < 0 {
        return String::new();
    }
    // 1-based, so `A` is 1 and `Z` is 26; cannot overflow from isize
    let mut n = index as u64 + 1;
    let mut code = Vec::new();
    while n > 0 {
        n -= 1;
        code.push(b'A' + (n % LETTERS) as u8);
        n /= LETTERS;
    }
    code.into_iter().rev().map(char::from).collect()
}

/// Inverse of [`generate_column_code`]; `None` for anything but ASCII letters.
pub fn parse_column_code(code: &str) -> Option<usize> {
    if code.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for b in code.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = (b.to_ascii_uppercase() - b'A') as usize + 1;
        n = n.checked_mul(LETTERS as usize)?.checked_add(digit)?;
    }
    Some(n - 1)
}
