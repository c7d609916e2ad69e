use std::collections::HashSet;
use upgate_core::AppError;

/// Fixed set of emails allowed through the gate, compared case-insensitively.
///
/// Built once at startup and shared read-only. An empty policy denies everyone.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    allowed: HashSet<String>,
}

impl AccessPolicy {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_allowed(&self, email: &str) -> bool {
        self.allowed.contains(&email.to_lowercase())
    }

    /// Deny with a reason naming the caller's email and nothing about the list.
    pub fn check(&self, email: &str) -> Result<(), AppError> {
        if self.is_allowed(email) {
            Ok(())
        } else {
            Err(AppError::AccessDenied {
                reason: format!(
                    "Email '{}' is not authorized to access this application",
                    email
                ),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        let policy = AccessPolicy::new(["Owner@Example.com", " second@example.com "]);
        assert!(policy.is_allowed("owner@example.com"));
        assert!(policy.is_allowed("OWNER@EXAMPLE.COM"));
        assert!(policy.is_allowed("Second@Example.com"));
        assert!(!policy.is_allowed("other@example.com"));
        assert_eq!(policy.len(), 2);
    }

    #[test]
    fn test_denial_names_email_only() {
        let policy = AccessPolicy::new(["owner@example.com"]);
        match policy.check("x@y.com") {
            Err(AppError::AccessDenied { reason }) => {
                assert_eq!(
                    reason,
                    "Email 'x@y.com' is not authorized to access this application"
                );
                assert!(!reason.contains("owner@example.com"));
            }
            other => panic!("Expected AccessDenied, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_sentinel_is_denied() {
        let policy = AccessPolicy::new(["owner@example.com"]);
        assert!(policy.check("unknown").is_err());
        assert!(AccessPolicy::default().check("owner@example.com").is_err());
    }
}
