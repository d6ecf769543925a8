use crate::application::repos::RepoError;

/// Translate a write-path sqlx error into the repository taxonomy.
///
/// Classification is by Postgres SQLSTATE: unique violations become
/// `Duplicate` (carrying the constraint name), foreign-key and malformed
/// input become `InvalidInput`, the remaining integrity class (23xxx) maps
/// to `Integrity`, and statement cancellation to `Timeout`.
/// Wrap a search term in `%...%`, escaping LIKE metacharacters so user input
/// matches literally. Backslash is the Postgres default escape character.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    let sqlx::Error::Database(db) = err else {
        return match err {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            other => RepoError::from_persistence(other),
        };
    };

    match db.code().as_deref() {
        Some("23505") => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        Some("23503") | Some("22P02") => RepoError::InvalidInput {
            message: db.message().to_string(),
        },
        Some(code) if code.starts_with("23") => RepoError::Integrity {
            message: db.message().to_string(),
        },
        Some("57014") => RepoError::Timeout,
        _ => RepoError::from_persistence(db.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_plain_terms() {
        assert_eq!(like_pattern("Amina"), "%Amina%");
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("%"), "%\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c\\d"), "%c\\\\d%");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn pool_errors_map_to_persistence() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Persistence(_)
        ));
    }
}
