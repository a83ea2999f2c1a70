// 📄 Pagination - Loop-until-short-page drains for both API shapes
//
// Avalara lists with $skip/$top offsets, BigCommerce with page numbers.
// Both loops stop as soon as a page comes back shorter than the requested
// size. A page-level failure ends the loop early; whatever was collected
// up to that point is kept and returned (no retry).

use anyhow::Result;

/// Drain an offset-paginated listing ($skip/$top style).
///
/// `fetch` receives the current offset and returns one page. The offset
/// advances by `page_size` until a short page signals the end of data.
///
/// On a page error the partial result is returned along with the error
/// message, so the caller can log it and still persist what it has.
pub fn drain_offset_pages<T, F>(page_size: usize, mut fetch: F) -> (Vec<T>, Option<String>)
where
    F: FnMut(usize) -> Result<Vec<T>>,
{
    let mut collected = Vec::new();
    let mut skip = 0;

    loop {
        let page = match fetch(skip) {
            Ok(page) => page,
            Err(e) => return (collected, Some(e.to_string())),
        };

        let page_len = page.len();
        collected.extend(page);

        if page_len < page_size {
            break;
        }
        skip += page_size;
    }

    (collected, None)
}

/// Drain a page-numbered listing (page/limit style, first page = 1).
///
/// Same termination and failure contract as [`drain_offset_pages`].
pub fn drain_numbered_pages<T, F>(page_size: usize, mut fetch: F) -> (Vec<T>, Option<String>)
where
    F: FnMut(usize) -> Result<Vec<T>>,
{
    let mut collected = Vec::new();
    let mut page_number = 1;

    loop {
        let page = match fetch(page_number) {
            Ok(page) => page,
            Err(e) => return (collected, Some(e.to_string())),
        };

        let page_len = page.len();
        collected.extend(page);

        if page_len < page_size {
            break;
        }
        page_number += 1;
    }

    (collected, None)
}

// ============================================================================
// TESTS
// ============================================================================
