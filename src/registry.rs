//! Page registry
//!
//! Immutable ordered list of pages. Order and keys are fixed at
//! construction; only per-page state (completion, handler payload)
//! changes afterwards.

use std::collections::HashMap;

use crate::error::{Result, WizardError};
use crate::page::Page;

#[derive(Debug)]
pub struct PageRegistry {
    pages: Vec<Page>,
    index: HashMap<String, usize>,
}

impl PageRegistry {
    /// Build a registry.
    ///
    /// # Errors
    ///
    /// - `Registry` if `pages` is empty
    /// - `Registry` if two pages share a key
    pub fn new(pages: Vec<Page>) -> Result<Self> {
        if pages.is_empty() {
            return Err(WizardError::registry("a wizard needs at least one page"));
        }

        let mut index = HashMap::with_capacity(pages.len());
        for (position, page) in pages.iter().enumerate() {
            if page.key().is_empty() {
                return Err(WizardError::registry(format!(
                    "page at position {} has an empty key",
                    position
                )));
            }
            if index.insert(page.key().to_string(), position).is_some() {
                return Err(WizardError::registry(format!(
                    "duplicate page key {:?}",
                    page.key()
                )));
            }
        }

        Ok(Self { pages, index })
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Always false: construction rejects empty registries.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn get(&self, key: &str) -> Option<&Page> {
        self.position_of(key).map(|i| &self.pages[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Page> {
        let position = self.position_of(key)?;
        self.pages.get_mut(position)
    }

    pub fn at(&self, position: usize) -> Option<&Page> {
        self.pages.get(position)
    }

    pub fn at_mut(&mut self, position: usize) -> Option<&mut Page> {
        self.pages.get_mut(position)
    }

    pub fn as_slice(&self) -> &[Page] {
        &self.pages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Page> {
        self.pages.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{res, PageTitles};

    fn page(key: &str) -> Page {
        Page::simple(key, PageTitles::new(res::WELCOME))
    }

    #[test]
    fn test_lookup_by_key_and_position() {
        let registry = PageRegistry::new(vec![page("a"), page("b"), page("c")]).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.position_of("b"), Some(1));
        assert_eq!(registry.get("c").map(|p| p.key()), Some("c"));
        assert_eq!(registry.at(0).map(|p| p.key()), Some("a"));
        assert!(registry.get("zzz").is_none());
        assert!(registry.at(3).is_none());
    }

    #[test]
    fn test_every_key_resolves_to_its_position() {
        let registry = PageRegistry::new(vec![page("a"), page("b"), page("c")]).unwrap();
        for (position, key) in registry.keys().enumerate() {
            assert_eq!(registry.position_of(key), Some(position));
        }
    }

    #[test]
    fn test_empty_registry_rejected() {
        let err = PageRegistry::new(Vec::new()).unwrap_err();
        assert!(matches!(err, WizardError::Registry(_)));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = PageRegistry::new(vec![page("a"), page("a")]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(PageRegistry::new(vec![page("")]).is_err());
    }
}
