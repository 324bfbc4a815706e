//! # Modifier Stack
//!
//! Non-structural decorations attached to a node: formats (bold, links…),
//! attribute sets and explicit editability flags.
//!
//! The stack is ordered. Lookups that need "the nearest" modifier scan it from
//! the top (last pushed) down. Derived state such as editability is never
//! cached; it is recomputed from the stack on demand.

use serde::{Deserialize, Serialize};

/// Ordered attribute set with structured `class` and `style` values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    entries: Vec<(String, String)>,
    classes: Vec<String>,
    style: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Attributes::set`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Value of a plain attribute. `class` and `style` are serialized on the fly.
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            "style" if !self.style.is_empty() => Some(serialize_style(&self.style)),
            "class" | "style" => None,
            _ => self
                .entries
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
        }
    }

    /// Set an attribute. Setting `class` or `style` replaces the whole list/map.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match name.as_str() {
            "class" => {
                self.classes.clear();
                for token in value.split_whitespace() {
                    self.add_class(token);
                }
            }
            "style" => self.style = parse_style(&value),
            _ => match self.entries.iter_mut().find(|(key, _)| *key == name) {
                Some(entry) => entry.1 = value,
                None => self.entries.push((name, value)),
            },
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        match name {
            "class" => !std::mem::take(&mut self.classes).is_empty(),
            "style" => !std::mem::take(&mut self.style).is_empty(),
            _ => {
                let before = self.entries.len();
                self.entries.retain(|(key, _)| key != name);
                before != self.entries.len()
            }
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn remove_class(&mut self, class: &str) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| c != class);
        before != self.classes.len()
    }

    /// Toggle a class; returns whether it is present afterwards
    pub fn toggle_class(&mut self, class: &str) -> bool {
        if self.remove_class(class) {
            false
        } else {
            self.add_class(class);
            true
        }
    }

    pub fn style(&self) -> &[(String, String)] {
        &self.style
    }

    pub fn style_value(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .find(|(key, _)| key == property)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_style(&mut self, property: impl Into<String>, value: impl Into<String>) {
        let property = property.into();
        let value = value.into();
        match self.style.iter_mut().find(|(key, _)| *key == property) {
            Some(entry) => entry.1 = value,
            None => self.style.push((property, value)),
        }
    }

    pub fn remove_style(&mut self, property: &str) -> bool {
        let before = self.style.len();
        self.style.retain(|(key, _)| key != property);
        before != self.style.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.classes.is_empty() && self.style.is_empty()
    }

    /// Flatten into ordered key/value pairs: plain attributes first, then
    /// `class`, then `style`.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.entries.clone();
        if !self.classes.is_empty() {
            pairs.push(("class".to_string(), self.classes.join(" ")));
        }
        if !self.style.is_empty() {
            pairs.push(("style".to_string(), serialize_style(&self.style)));
        }
        pairs
    }
}

/// Parse an inline style declaration list (`"color: red; margin: 0"`)
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    let mut declarations: Vec<(String, String)> = Vec::new();
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim();
        let value = value.trim();
        if property.is_empty() {
            continue;
        }
        match declarations.iter_mut().find(|(key, _)| key == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => declarations.push((property.to_string(), value.to_string())),
        }
    }
    declarations
}

pub fn serialize_style(style: &[(String, String)]) -> String {
    style
        .iter()
        .map(|(property, value)| format!("{}: {}", property, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single decoration on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    /// Inline format such as `b`, `i` or `a`, rendered as a wrapping element
    Format { name: String, attributes: Attributes },

    /// Attributes applied to the node's own rendering
    Attributes(Attributes),

    /// Explicit editability flag
    Editable(bool),
}

impl Modifier {
    pub fn format(name: impl Into<String>) -> Self {
        Modifier::Format {
            name: name.into(),
            attributes: Attributes::new(),
        }
    }

    /// Explicit editability carried by this modifier, if any.
    ///
    /// An attribute set with `contenteditable` counts as explicit.
    pub fn editable(&self) -> Option<bool> {
        match self {
            Modifier::Editable(editable) => Some(*editable),
            Modifier::Attributes(attributes) => attributes
                .get("contenteditable")
                .map(|value| value != "false"),
            Modifier::Format { .. } => None,
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Modifier::Format { .. })
    }
}

/// Ordered modifier stack owned by a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    stack: Vec<Modifier>,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Modifier> {
        self.stack.iter()
    }

    pub fn push(&mut self, modifier: Modifier) {
        self.stack.push(modifier);
    }

    pub fn prepend(&mut self, modifier: Modifier) {
        self.stack.insert(0, modifier);
    }

    pub fn insert(&mut self, index: usize, modifier: Modifier) {
        let index = index.min(self.stack.len());
        self.stack.insert(index, modifier);
    }

    /// Remove the first modifier equal to `modifier`
    pub fn remove(&mut self, modifier: &Modifier) -> bool {
        match self.stack.iter().position(|m| m == modifier) {
            Some(index) => {
                self.stack.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Modifier> {
        (index < self.stack.len()).then(|| self.stack.remove(index))
    }

    pub fn replace(&mut self, old: &Modifier, new: Modifier) -> bool {
        match self.stack.iter_mut().find(|m| *m == old) {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }

    /// Add the modifier if absent, remove it if present
    pub fn toggle(&mut self, modifier: Modifier) {
        if !self.remove(&modifier) {
            self.push(modifier);
        }
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn find(&self, predicate: impl Fn(&Modifier) -> bool) -> Option<&Modifier> {
        self.stack.iter().find(|m| predicate(m))
    }

    pub fn find_mut(&mut self, predicate: impl Fn(&Modifier) -> bool) -> Option<&mut Modifier> {
        self.stack.iter_mut().find(|m| predicate(m))
    }

    pub fn contains(&self, modifier: &Modifier) -> bool {
        self.stack.contains(modifier)
    }

    /// Formats in stack order (outermost first)
    pub fn formats(&self) -> impl Iterator<Item = &Modifier> {
        self.stack.iter().filter(|m| m.is_format())
    }

    /// First attribute set on the stack
    pub fn attributes(&self) -> Option<&Attributes> {
        self.stack.iter().find_map(|m| match m {
            Modifier::Attributes(attributes) => Some(attributes),
            _ => None,
        })
    }

    /// Attribute set on the stack, creating an empty one at the bottom if needed
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        let index = match self
            .stack
            .iter()
            .position(|m| matches!(m, Modifier::Attributes(_)))
        {
            Some(index) => index,
            None => {
                self.stack.insert(0, Modifier::Attributes(Attributes::new()));
                0
            }
        };
        match &mut self.stack[index] {
            Modifier::Attributes(attributes) => attributes,
            _ => unreachable!("position matched an attributes modifier"),
        }
    }

    /// All attribute sets merged in stack order into ordered pairs
    pub fn attribute_pairs(&self) -> Vec<(String, String)> {
        let mut merged = Attributes::new();
        for modifier in &self.stack {
            if let Modifier::Attributes(attributes) = modifier {
                for (name, value) in attributes.to_pairs() {
                    match name.as_str() {
                        "class" => {
                            for class in value.split_whitespace() {
                                merged.add_class(class);
                            }
                        }
                        "style" => {
                            for (property, value) in parse_style(&value) {
                                merged.set_style(property, value);
                            }
                        }
                        _ => merged.set(name, value),
                    }
                }
            }
        }
        merged.to_pairs()
    }

    /// Explicit editability from the topmost modifier that carries one
    pub fn editable(&self) -> Option<bool> {
        self.stack.iter().rev().find_map(Modifier::editable)
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<T: IntoIterator<Item = Modifier>>(iter: T) -> Self {
        Self {
            stack: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_and_style_are_structured() {
        let mut attributes = Attributes::new()
            .with("class", "a b  a")
            .with("style", "color: red; margin:0;");
        assert_eq!(attributes.classes(), &["a".to_string(), "b".to_string()]);
        assert_eq!(attributes.style_value("margin"), Some("0"));
        assert_eq!(attributes.get("style").as_deref(), Some("color: red; margin: 0"));

        assert!(!attributes.toggle_class("a"));
        assert_eq!(attributes.get("class").as_deref(), Some("b"));
    }

    #[test]
    fn test_pairs_keep_insertion_order() {
        let attributes = Attributes::new()
            .with("class", "x")
            .with("href", "#")
            .with("title", "t");
        let names: Vec<_> = attributes.to_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["href", "title", "class"]);
    }

    #[test]
    fn test_topmost_editable_flag_wins() {
        let mut modifiers = Modifiers::new();
        assert_eq!(modifiers.editable(), None);

        modifiers.push(Modifier::Editable(false));
        modifiers.push(Modifier::format("b"));
        assert_eq!(modifiers.editable(), Some(false));

        modifiers.push(Modifier::Attributes(
            Attributes::new().with("contenteditable", "true"),
        ));
        assert_eq!(modifiers.editable(), Some(true));
    }

    #[test]
    fn test_toggle_and_replace() {
        let mut modifiers = Modifiers::new();
        modifiers.toggle(Modifier::format("b"));
        assert!(modifiers.contains(&Modifier::format("b")));
        modifiers.toggle(Modifier::format("b"));
        assert!(modifiers.is_empty());

        modifiers.push(Modifier::format("i"));
        assert!(modifiers.replace(&Modifier::format("i"), Modifier::format("u")));
        assert_eq!(modifiers.formats().count(), 1);
        assert!(modifiers.contains(&Modifier::format("u")));
    }

    #[test]
    fn test_attribute_pairs_merge_stack() {
        let mut modifiers = Modifiers::new();
        modifiers.push(Modifier::Attributes(Attributes::new().with("class", "a").with("id", "x")));
        modifiers.push(Modifier::Attributes(Attributes::new().with("class", "b").with("id", "y")));
        assert_eq!(
            modifiers.attribute_pairs(),
            vec![
                ("id".to_string(), "y".to_string()),
                ("class".to_string(), "a b".to_string())
            ]
        );
    }
}
