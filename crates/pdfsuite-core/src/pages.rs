//! Page counting and page selection parsing

use std::collections::BTreeSet;

use crate::error::PdfSuiteError;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfSuiteError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| PdfSuiteError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Parse a user page selection against a document of `page_count` pages.
///
/// Returns zero-indexed, deduplicated, sorted page indices. Pages outside
/// `1..=page_count` are dropped and reversed ranges select nothing. Malformed
/// numbers and selections that end up empty are errors.
pub fn parse_page_selection(input: &str, page_count: u32) -> Result<Vec<usize>, PdfSuiteError> {
    let mut pages = BTreeSet::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_page_number(start)?, parse_page_number(end)?),
            None => {
                let page = parse_page_number(part)?;
                (page, page)
            }
        };

        // Clamp before iterating so "1-4000000000" stays cheap
        let lo = start.max(1);
        let hi = end.min(page_count as u64);
        for page in lo..=hi {
            pages.insert(page as usize - 1);
        }
    }

    if pages.is_empty() {
        return Err(PdfSuiteError::InvalidRange(format!(
            "No pages selected from \"{}\" (document has {} pages)",
            input.trim(),
            page_count
        )));
    }

    Ok(pages.into_iter().collect())
}

fn parse_page_number(value: &str) -> Result<u64, PdfSuiteError> {
    let value = value.trim();
    value
        .parse()
        .map_err(|_| PdfSuiteError::InvalidRange(format!("Invalid page number: \"{}\"", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pdf;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_page_count() {
        assert_eq!(get_page_count(&create_test_pdf(3, "Count")).unwrap(), 3);
        assert!(matches!(
            get_page_count(b"garbage"),
            Err(PdfSuiteError::ParseError(_))
        ));
    }

    #[test]
    fn test_selection_mixed() {
        assert_eq!(
            parse_page_selection("1,3-5,8", 10).unwrap(),
            vec![0, 2, 3, 4, 7]
        );
    }

    #[test]
    fn test_selection_drops_out_of_bounds() {
        assert_eq!(parse_page_selection("0, 2, 9-12", 10).unwrap(), vec![1, 8, 9]);
        assert_eq!(parse_page_selection("3, 1-4000000000", 4).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_selection_dedupes_and_sorts() {
        assert_eq!(parse_page_selection("4, 2, 1-3, 2", 5).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_selection_reversed_range_selects_nothing() {
        assert_eq!(parse_page_selection("5-3, 1", 10).unwrap(), vec![0]);
        assert!(parse_page_selection("5-3", 10).is_err());
    }

    #[test]
    fn test_selection_errors() {
        assert!(matches!(
            parse_page_selection("", 10),
            Err(PdfSuiteError::InvalidRange(_))
        ));
        assert!(parse_page_selection("1, x", 10).is_err());
        assert!(parse_page_selection("1-", 10).is_err());
        assert!(parse_page_selection("11-20", 10).is_err());
        assert!(parse_page_selection("1", 0).is_err());
    }
}
