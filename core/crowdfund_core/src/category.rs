//! Category deletion guard.

use crate::errors::CategoryError;

/// A category can be soft-deleted only when it is not the default category
/// and no ACTIVE or PENDING fundraiser references it.
pub fn check_deletable(is_default: bool, blocking_funds: i64) -> Result<(), CategoryError> {
    if is_default {
        return Err(CategoryError::DefaultProtected);
    }
    if blocking_funds > 0 {
        return Err(CategoryError::InUse(blocking_funds));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_category_is_protected_even_when_unused() {
        assert_eq!(check_deletable(true, 0), Err(CategoryError::DefaultProtected));
    }

    #[test]
    fn test_blocking_funds_are_counted() {
        assert_eq!(check_deletable(false, 2), Err(CategoryError::InUse(2)));
        assert_eq!(check_deletable(false, 0), Ok(()));
    }
}
