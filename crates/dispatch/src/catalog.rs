//! The schema catalog: the authoritative, ordered list of available tools.

use indexmap::IndexMap;

use crate::descriptor::ToolDescriptor;
use crate::error::RegistryError;

/// Holds every tool descriptor for one server instance, in registration
/// order. Constructing a catalog never performs I/O.
#[derive(Debug, Default)]
pub struct Catalog {
    descriptors: IndexMap<String, ToolDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            descriptors: IndexMap::new(),
        }
    }

    /// Add a descriptor. Fails if the name is already present.
    pub fn add(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.descriptors.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateDescriptor(descriptor.name));
        }
        self.descriptors
            .insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// All descriptors in registration order.
    pub fn list(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.descriptors.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ParamSpec;

    fn desc(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, "test tool", vec![ParamSpec::string("x", "x")])
    }

    #[test]
    fn test_add_and_get() {
        let mut catalog = Catalog::new();
        catalog.add(desc("create_author")).unwrap();
        assert!(catalog.contains("create_author"));
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut catalog = Catalog::new();
        catalog.add(desc("create_author")).unwrap();
        let err = catalog.add(desc("create_author")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDescriptor(_)));
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut catalog = Catalog::new();
        for name in ["zeta", "alpha", "mid"] {
            catalog.add(desc(name)).unwrap();
        }
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
