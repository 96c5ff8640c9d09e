/// One comma-separated token of a page specification.
///
/// Page numbers are 1-based, exactly as the user typed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: Option<u32>,
}

impl PageRange {
    /// Parse a single token like "5" or "2-5".
    ///
    /// Returns `None` for anything that is not an integer or an
    /// integer pair; callers drop such tokens without complaint.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        match s.split_once('-') {
            Some((start, end)) => Some(PageRange {
                start: parse_page_number(start)?,
                end: Some(parse_page_number(end)?),
            }),
            None => Some(PageRange {
                start: parse_page_number(s)?,
                end: None,
            }),
        }
    }

    /// Expand into zero-based indices, dropping pages outside `1..=page_count`.
    ///
    /// A range whose start is past its end expands to nothing.
    pub fn expand(&self, page_count: usize) -> impl Iterator<Item = usize> {
        let start = (self.start as usize).max(1);
        let end = (self.end.unwrap_or(self.start) as usize).min(page_count);
        (start..=end).map(|page| page - 1)
    }
}

fn parse_page_number(s: &str) -> Option<u32> {
    s.trim().parse::<u32>().ok()
}

/// Parse a comma-separated list of page ranges like "1,3-5,7".
pub fn parse_page_ranges(s: &str) -> Vec<PageRange> {
    s.split(',').filter_map(PageRange::parse).collect()
}

/// Expand a page specification into zero-based indices in the order the
/// tokens appear. Duplicates are kept.
pub fn parse_page_indices(s: &str, page_count: usize) -> Vec<usize> {
    parse_page_ranges(s)
        .iter()
        .flat_map(|range| range.expand(page_count))
        .collect()
}

/// Expand a page specification into sorted, deduplicated split points.
pub fn parse_split_points(s: &str, page_count: usize) -> Vec<usize> {
    let mut points = parse_page_indices(s, page_count);
    points.sort_unstable();
    points.dedup();
    points
}

/// Split points for cutting a document every `n` pages: `n, 2n, ...` below
/// `page_count`.
pub fn every_n_pages(n: usize, page_count: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    (n..page_count).step_by(n).collect()
}

/// Which pages an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelection {
    All,
    Ranges(String),
}

impl PageSelection {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("all") {
            PageSelection::All
        } else {
            PageSelection::Ranges(s.to_string())
        }
    }

    pub fn indices(&self, page_count: usize) -> Vec<usize> {
        match self {
            PageSelection::All => (0..page_count).collect(),
            PageSelection::Ranges(spec) => parse_page_indices(spec, page_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pages() {
        assert_eq!(parse_page_indices("1,3,5", 10), vec![0, 2, 4]);
    }

    #[test]
    fn test_page_range() {
        assert_eq!(parse_page_indices("2-5", 10), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_mixed_keeps_order() {
        assert_eq!(parse_page_indices("1,3-5,7", 10), vec![0, 2, 3, 4, 6]);
        assert_eq!(parse_page_indices("7,1-2,1", 10), vec![6, 0, 1, 0]);
    }

    #[test]
    fn test_reverse_range_is_empty() {
        assert_eq!(parse_page_indices("5-2", 10), Vec::<usize>::new());
        assert_eq!(parse_page_indices("5-2,1", 10), vec![0]);
    }

    #[test]
    fn test_out_of_range_dropped() {
        assert_eq!(parse_page_indices("0,4,11", 10), vec![3]);
        assert_eq!(parse_page_indices("8-14", 10), vec![7, 8, 9]);
        assert_eq!(parse_page_indices("1-3", 0), Vec::<usize>::new());
    }

    #[test]
    fn test_garbage_tokens_ignored() {
        assert_eq!(parse_page_indices("a, 2 ,x-3,-4, 3 - 4 ,", 10), vec![1, 2, 3]);
        assert_eq!(parse_page_indices("", 10), Vec::<usize>::new());
    }

    #[test]
    fn test_indices_always_in_bounds() {
        let specs = ["1-100", "0-0", "3,2,1", "50", "2-1,4-9", "1,1,1"];
        for page_count in 0..12 {
            for spec in specs {
                for index in parse_page_indices(spec, page_count) {
                    assert!(index < page_count, "{spec} with {page_count} gave {index}");
                }
            }
        }
    }

    #[test]
    fn test_split_points_sorted_dedup() {
        assert_eq!(parse_split_points("5,2,5,3-4", 10), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_every_n_pages() {
        assert_eq!(every_n_pages(10, 25), vec![10, 20]);
        assert_eq!(every_n_pages(5, 10), vec![5]);
        assert_eq!(every_n_pages(10, 10), Vec::<usize>::new());
        assert_eq!(every_n_pages(0, 10), Vec::<usize>::new());
    }

    #[test]
    fn test_selection_all() {
        assert_eq!(PageSelection::parse(" ALL ").indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::parse("2").indices(3), vec![1]);
    }
}
