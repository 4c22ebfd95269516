//! Pre-transfer file-count gate.

use super::UploadError;

/// The effective file-count policy of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileLimit {
    /// `upload_multi_count == 1`: every selection replaces the current file
    Single,
    /// At most this many files in the collection
    Capped(u32),
    /// No cap (count absent or 0)
    Unlimited,
}

impl FileLimit {
    pub fn from_count(upload_multi_count: Option<u32>) -> Self {
        match upload_multi_count {
            Some(1) => FileLimit::Single,
            None | Some(0) => FileLimit::Unlimited,
            Some(n) => FileLimit::Capped(n),
        }
    }

    /// Decide whether a selection of `batch_size` files may proceed when the
    /// field already holds `current_size`.
    ///
    /// A rejected batch is rejected whole.
    pub fn check(&self, current_size: usize, batch_size: usize) -> Result<(), UploadError> {
        match *self {
            FileLimit::Single | FileLimit::Unlimited => Ok(()),
            FileLimit::Capped(limit) => {
                let cap = limit as usize;
                if current_size >= cap || current_size + batch_size > cap {
                    Err(UploadError::LimitExceeded { limit })
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_count() {
        assert_eq!(FileLimit::from_count(Some(1)), FileLimit::Single);
        assert_eq!(FileLimit::from_count(None), FileLimit::Unlimited);
        assert_eq!(FileLimit::from_count(Some(0)), FileLimit::Unlimited);
        assert_eq!(FileLimit::from_count(Some(5)), FileLimit::Capped(5));
    }

    #[test]
    fn test_single_always_allows() {
        assert!(FileLimit::Single.check(1, 10).is_ok());
        assert!(FileLimit::Single.check(0, 2).is_ok());
    }

    #[test]
    fn test_capped_matches_sum_rule() {
        for cap in 2u32..=5 {
            let limit = FileLimit::Capped(cap);
            for current in 0..=6usize {
                for batch in 1..=6usize {
                    let allowed = limit.check(current, batch).is_ok();
                    assert_eq!(
                        allowed,
                        current + batch <= cap as usize,
                        "cap={cap} current={current} batch={batch}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_full_collection_rejects_even_empty_batch() {
        assert_eq!(
            FileLimit::Capped(3).check(3, 0),
            Err(UploadError::LimitExceeded { limit: 3 })
        );
    }

    #[test]
    fn test_oversized_batch_rejected() {
        assert!(FileLimit::Capped(2).check(0, 3).is_err());
    }
}
