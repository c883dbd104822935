//! Class definitions and method lookup (§3.5).

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Node;

#[derive(Debug, Clone)]
pub struct Method {
    pub params: Vec<String>,
    pub body: Rc<Vec<Node>>,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    pub methods: HashMap<String, Method>,
}

/// Global class table. Method lookup ascends the parent chain, matching
/// `method_find` in the original source.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, Rc<ClassDef>>,
}

impl ClassRegistry {
    pub fn register(&mut self, def: ClassDef) -> Rc<ClassDef> {
        let rc = Rc::new(def);
        self.classes.insert(rc.name.clone(), rc.clone());
        rc
    }

    pub fn get(&self, name: &str) -> Option<Rc<ClassDef>> {
        self.classes.get(name).cloned()
    }

    /// Finds `method_name` starting at `class` and ascending through
    /// `extends` parents, per §3.5.
    pub fn find_method(&self, class: &Rc<ClassDef>, method_name: &str) -> Option<(Rc<ClassDef>, Method)> {
        let mut current = class.clone();
        loop {
            if let Some(m) = current.methods.get(method_name) {
                return Some((current.clone(), m.clone()));
            }
            match &current.parent {
                Some(parent_name) => match self.get(parent_name) {
                    Some(p) => current = p,
                    None => return None,
                },
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method() -> Method {
        Method { params: vec![], body: Rc::new(vec![]) }
    }

    #[test]
    fn find_method_ascends_to_parent() {
        let mut registry = ClassRegistry::default();
        let mut animal_methods = HashMap::new();
        animal_methods.insert("speak".to_string(), method());
        registry.register(ClassDef { name: "Animal".to_string(), parent: None, methods: animal_methods });

        let dog_methods = HashMap::new();
        let dog = registry.register(ClassDef { name: "Dog".to_string(), parent: Some("Animal".to_string()), methods: dog_methods });

        let found = registry.find_method(&dog, "speak");
        assert!(found.is_some());
        assert_eq!(found.unwrap().0.name, "Animal");
    }

    #[test]
    fn find_method_prefers_own_override() {
        let mut registry = ClassRegistry::default();
        let mut animal_methods = HashMap::new();
        animal_methods.insert("speak".to_string(), method());
        registry.register(ClassDef { name: "Animal".to_string(), parent: None, methods: animal_methods });

        let mut dog_methods = HashMap::new();
        dog_methods.insert("speak".to_string(), method());
        let dog = registry.register(ClassDef { name: "Dog".to_string(), parent: Some("Animal".to_string()), methods: dog_methods });

        let found = registry.find_method(&dog, "speak").unwrap();
        assert_eq!(found.0.name, "Dog");
    }

    #[test]
    fn find_method_returns_none_when_absent_up_the_chain() {
        let mut registry = ClassRegistry::default();
        let dog = registry.register(ClassDef { name: "Dog".to_string(), parent: None, methods: HashMap::new() });
        assert!(registry.find_method(&dog, "fly").is_none());
    }
}
