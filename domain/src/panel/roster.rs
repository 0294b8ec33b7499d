//! Roster: the validated, ordered set of responders for one run.

use super::responder::ResponderProfile;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered list of panel members with unique names (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    members: Vec<ResponderProfile>,
}

impl Roster {
    /// Build a roster, rejecting empty rosters, blank names and duplicates
    pub fn new(members: Vec<ResponderProfile>) -> Result<Self, DomainError> {
        if members.is_empty() {
            return Err(DomainError::EmptyRoster);
        }

        let mut seen = HashSet::new();
        for member in &members {
            if member.name.trim().is_empty() {
                return Err(DomainError::EmptyResponderName);
            }
            if !seen.insert(member.name.as_str()) {
                return Err(DomainError::DuplicateResponder(member.name.clone()));
            }
        }

        Ok(Self { members })
    }

    pub fn members(&self) -> &[ResponderProfile] {
        &self.members
    }

    pub fn names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ResponderProfile> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of responders holding the reflection role
    pub fn reflection_names(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter(|m| m.is_reflection())
            .map(|m| m.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_rejects_empty() {
        assert_eq!(Roster::new(vec![]), Err(DomainError::EmptyRoster));
    }

    #[test]
    fn test_roster_rejects_duplicates() {
        let result = Roster::new(vec![
            ResponderProfile::expert("a", "first"),
            ResponderProfile::expert("a", "again"),
        ]);
        assert_eq!(result, Err(DomainError::DuplicateResponder("a".into())));
    }

    #[test]
    fn test_roster_rejects_blank_name() {
        let result = Roster::new(vec![ResponderProfile::expert("  ", "blank")]);
        assert_eq!(result, Err(DomainError::EmptyResponderName));
    }

    #[test]
    fn test_reflection_names() {
        let roster = Roster::new(vec![
            ResponderProfile::expert("a", "expert"),
            ResponderProfile::reflection("r", "reflects"),
        ])
        .unwrap();
        assert_eq!(roster.reflection_names(), vec!["r"]);
        assert_eq!(roster.names(), vec!["a".to_string(), "r".to_string()]);
        assert!(roster.contains("r"));
        assert!(!roster.contains("z"));
    }
}
