//! Minimal RFC 4180 reader for metadata files.
//!
//! Handles quoted fields with embedded commas, doubled quotes and line
//! breaks, CRLF or LF line endings, and a UTF-8 BOM. The reader never
//! fails: an unterminated quote simply runs to the end of the input.

/// Decode raw file bytes to a string.
///
/// Tries UTF-8 first (BOM stripped), then falls back to Windows-1254,
/// the code page Turkish Outlook installations export with.
pub fn decode_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1254.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Split CSV text into rows of fields.
///
/// Blank lines are skipped.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                row.push(std::mem::take(&mut field));
                push_row(&mut rows, std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        push_row(&mut rows, row);
    }

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    let blank = row.len() == 1 && row[0].is_empty();
    if !blank {
        rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_rows() {
        let rows = parse_rows("a,b,c\n1,2,3\n");
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_quoted_comma_and_quote() {
        let rows = parse_rows("id,subject\n1,\"Hello, \"\"world\"\"\"\n");
        assert_eq!(rows[1], vec!["1", "Hello, \"world\""]);
    }

    #[test]
    fn test_quoted_newline() {
        let rows = parse_rows("id,subject\r\n1,\"line1\r\nline2\"\r\n2,x\r\n");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], "line1\r\nline2");
        assert_eq!(rows[2], vec!["2", "x"]);
    }

    #[test]
    fn test_blank_lines_and_missing_trailing_newline() {
        let rows = parse_rows("a,b\n\n1,2");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_empty_trailing_field() {
        let rows = parse_rows("a,b\n1,\n");
        assert_eq!(rows[1], vec!["1", ""]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        let rows = parse_rows("a,b\n1,\"open\n");
        assert_eq!(rows[1], vec!["1", "open\n"]);
    }

    #[test]
    fn test_decode_strips_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, b'i', b'd'];
        assert_eq!(decode_bytes(&bytes), "id");
    }

    #[test]
    fn test_decode_windows_1254_fallback() {
        // "Şube" in Windows-1254: Ş = 0xDE
        let bytes = [0xDE, b'u', b'b', b'e'];
        assert_eq!(decode_bytes(&bytes), "Şube");
    }
}
