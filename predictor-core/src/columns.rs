//! Column resolution: map human-authored header names to the date and quantity roles.
//!
//! Deterministic keyword matching; when several headers match, a positional score picks one:
//! - `PreferLeftShort`: earlier keyword rank first, then shorter header text
//! - `PreferRight`: the right-most column

/// Keywords that mark the date column, strongest first.
pub const DATE_KEYWORDS: &[&str] = &["date", "day", "ds", "when", "timestamp", "дата", "день"];

/// Keywords that mark the quantity column, strongest first.
pub const QUANTITY_KEYWORDS: &[&str] = &[
    "quantity",
    "qty",
    "y",
    "amount",
    "count",
    "value",
    "effort",
    "количество",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// Rewards earlier keyword rank and shorter header text (date role).
    PreferLeftShort,
    /// Rewards columns further right (quantity role).
    PreferRight,
}

/// A header that won resolution for a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub index: usize,
    pub header: String,
}

/// Resolve the header for one role.
///
/// Returns `None` when no header equals any keyword (after trimming and lower-casing).
pub fn resolve_column(headers: &[String], keywords: &[&str], mode: TieBreak) -> Option<ResolvedColumn> {
    // (position, keyword rank)
    let candidates: Vec<(usize, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(pos, h)| {
            let lower = h.trim().to_lowercase();
            keywords
                .iter()
                .position(|k| *k == lower)
                .map(|rank| (pos, rank))
        })
        .collect();

    let pick = match candidates.as_slice() {
        [] => return None,
        [only] => only.0,
        _ => {
            let mut best: Option<(usize, i64)> = None; // (position, score)
            for &(pos, rank) in &candidates {
                let score = match mode {
                    TieBreak::PreferLeftShort => {
                        (keywords.len() - rank) as i64 * 1000
                            + (999 - headers[pos].chars().count() as i64)
                    }
                    TieBreak::PreferRight => pos as i64,
                };
                match best {
                    None => best = Some((pos, score)),
                    Some((_, best_score)) if score > best_score => best = Some((pos, score)),
                    _ => {}
                }
            }
            best?.0
        }
    };

    Some(ResolvedColumn {
        index: pick,
        header: headers[pick].clone(),
    })
}

pub fn resolve_date_column(headers: &[String]) -> Option<ResolvedColumn> {
    resolve_column(headers, DATE_KEYWORDS, TieBreak::PreferLeftShort)
}

pub fn resolve_quantity_column(headers: &[String]) -> Option<ResolvedColumn> {
    resolve_column(headers, QUANTITY_KEYWORDS, TieBreak::PreferRight)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(hs: &[&str]) -> Vec<String> {
        hs.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn test_no_match_is_none() {
        let hs = headers(&["token", "note"]);
        assert_eq!(resolve_date_column(&hs), None);
        assert_eq!(resolve_quantity_column(&hs), None);
    }

    #[test]
    fn test_single_match_case_insensitive() {
        let hs = headers(&["Token", "Y", " Date "]);
        assert_eq!(resolve_date_column(&hs).unwrap().index, 2);
        let q = resolve_quantity_column(&hs).unwrap();
        assert_eq!(q.index, 1);
        assert_eq!(q.header, "Y");
    }

    #[test]
    fn test_date_prefers_keyword_rank() {
        // "day" (rank 1) loses to "date" (rank 0) regardless of position.
        let hs = headers(&["day", "token", "date"]);
        assert_eq!(resolve_date_column(&hs).unwrap().index, 2);
    }

    #[test]
    fn test_date_prefers_shorter_header_on_same_keyword() {
        let hs = headers(&["DATE  ", "date"]);
        assert_eq!(resolve_date_column(&hs).unwrap().index, 1);
    }

    #[test]
    fn test_quantity_prefers_right_most() {
        let hs = headers(&["qty", "token", "y", "date"]);
        assert_eq!(resolve_quantity_column(&hs).unwrap().index, 2);
    }

    #[test]
    fn test_tie_goes_to_first_header() {
        let hs = headers(&["date", "Date"]);
        assert_eq!(resolve_date_column(&hs).unwrap().index, 0);
    }
}
