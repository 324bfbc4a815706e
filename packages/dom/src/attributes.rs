//! Attribute diffing - compute granular updates for an external element
//!
//! Plain attributes diff per key, `class` per token and `style` per property.
//! Diffs are taken against the state the engine last applied, never against
//! the element's full current state, so tokens and properties added by
//! foreign code are never candidates for removal.

use crate::errors::DomResult;
use crate::external::{ExternalDom, ExternalId};
use serde::{Deserialize, Serialize};
use vellum_document::parse_style;

/// Attribute state the engine owns on one element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeState {
    pub attributes: Vec<(String, String)>,
    pub classes: Vec<String>,
    pub style: Vec<(String, String)>,
}

impl AttributeState {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut state = Self::default();
        for (name, value) in pairs {
            match name.as_str() {
                "class" => {
                    for class in value.split_whitespace() {
                        if !state.classes.iter().any(|c| c == class) {
                            state.classes.push(class.to_string());
                        }
                    }
                }
                "style" => {
                    for (property, value) in parse_style(value) {
                        set_entry(&mut state.style, property, value);
                    }
                }
                _ => set_entry(&mut state.attributes, name.clone(), value.clone()),
            }
        }
        state
    }

    /// What `ext` currently holds for the keys, tokens and properties named by
    /// `previous` or `desired`. Used to re-examine an element changed out of
    /// band.
    pub fn observe(
        dom: &ExternalDom,
        ext: ExternalId,
        previous: &AttributeState,
        desired: &AttributeState,
    ) -> Self {
        let mut state = Self::default();
        for (name, _) in previous.attributes.iter().chain(&desired.attributes) {
            if let Some(value) = dom.attribute(ext, name) {
                set_entry(&mut state.attributes, name.clone(), value);
            }
        }
        for class in previous.classes.iter().chain(&desired.classes) {
            if dom.has_class(ext, class) && !state.classes.contains(class) {
                state.classes.push(class.clone());
            }
        }
        for (property, _) in previous.style.iter().chain(&desired.style) {
            if let Some(value) = dom.style_value(ext, property) {
                set_entry(&mut state.style, property.clone(), value);
            }
        }
        state
    }
}

fn set_entry(entries: &mut Vec<(String, String)>, key: String, value: String) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

fn lookup<'a>(entries: &'a [(String, String)], key: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// A single attribute update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AttributePatch {
    Set { name: String, value: String },
    Remove { name: String },
    AddClass { class: String },
    RemoveClass { class: String },
    SetStyle { property: String, value: String },
    RemoveStyle { property: String },
}

/// Compute the patches turning `old` into `new`
pub fn diff_attributes(old: &AttributeState, new: &AttributeState) -> Vec<AttributePatch> {
    let mut patches = Vec::new();

    for (name, _) in &old.attributes {
        if lookup(&new.attributes, name).is_none() {
            patches.push(AttributePatch::Remove { name: name.clone() });
        }
    }
    for (name, value) in &new.attributes {
        if lookup(&old.attributes, name) != Some(value.as_str()) {
            patches.push(AttributePatch::Set {
                name: name.clone(),
                value: value.clone(),
            });
        }
    }

    for class in &old.classes {
        if !new.classes.contains(class) {
            patches.push(AttributePatch::RemoveClass { class: class.clone() });
        }
    }
    for class in &new.classes {
        if !old.classes.contains(class) {
            patches.push(AttributePatch::AddClass { class: class.clone() });
        }
    }

    for (property, _) in &old.style {
        if lookup(&new.style, property).is_none() {
            patches.push(AttributePatch::RemoveStyle {
                property: property.clone(),
            });
        }
    }
    for (property, value) in &new.style {
        if lookup(&old.style, property) != Some(value.as_str()) {
            patches.push(AttributePatch::SetStyle {
                property: property.clone(),
                value: value.clone(),
            });
        }
    }

    patches
}

/// Apply patches to an external element
pub fn apply_attribute_patches(
    dom: &mut ExternalDom,
    ext: ExternalId,
    patches: &[AttributePatch],
) -> DomResult<()> {
    for patch in patches {
        match patch {
            AttributePatch::Set { name, value } => dom.set_attribute(ext, name, value)?,
            AttributePatch::Remove { name } => {
                dom.remove_attribute(ext, name)?;
            }
            AttributePatch::AddClass { class } => dom.add_class(ext, class)?,
            AttributePatch::RemoveClass { class } => dom.remove_class(ext, class)?,
            AttributePatch::SetStyle { property, value } => dom.set_style(ext, property, value)?,
            AttributePatch::RemoveStyle { property } => dom.remove_style(ext, property)?,
        }
    }
    Ok(())
}
