//! Result assembly: turn a satisfying assignment into a selections
//! document.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::model::{Command, Element, ImplKind, Implementation, Importance};
use crate::provider::ImplementationProvider;

use super::builder::Req;
use super::cache::Snapshot;
use super::candidates::{CommandCandidates, ImplCandidates, Sat};

/// The assembled selections document.
#[derive(Debug)]
pub struct Selections {
    pub root_iface: String,
    pub root_command: Option<String>,
    doc: Element,
}

impl Selections {
    pub fn document(&self) -> &Element {
        &self.doc
    }
}

impl fmt::Display for Selections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.doc)
    }
}

/// Build the selections document for a satisfying assignment.
///
/// Selections appear in ascending lexicographic interface order. An
/// implementation that is compiled from source contributes a second,
/// parallel selection for its source form with the single `compile`
/// command.
pub fn assemble(
    sat: &Sat,
    impls: &Snapshot<String, Rc<ImplCandidates>>,
    commands: &Snapshot<(String, String), Rc<CommandCandidates>>,
    provider: &dyn ImplementationProvider,
    root: &Req,
) -> Selections {
    let mut doc = Element::new("selections").with_attr("interface", root.iface());
    if let Some(command) = root.command() {
        doc.set_attr("command", command);
    }

    for (iface, candidates) in impls.bindings() {
        let Some((_lit, imp)) = candidates.selected(sat) else {
            continue;
        };

        // Command names requested for this interface whose governing clause
        // has a selected literal, deduplicated and sorted.
        let requested: BTreeSet<&str> = commands
            .bindings()
            .into_iter()
            .filter(|(key, candidates)| key.1 == *iface && candidates.selected(sat).is_some())
            .map(|(key, _)| key.0.as_str())
            .collect();

        doc.children
            .push(build_selection(iface, &imp, &requested, provider));

        if let ImplKind::RequiresCompilation(source) = &imp.kind {
            let source = source.force();
            let mut compile = BTreeSet::new();
            if source.commands.contains_key("compile") {
                compile.insert("compile");
            }
            doc.children
                .push(build_selection(iface, &source, &compile, provider));
        }
    }

    Selections {
        root_iface: root.iface().to_string(),
        root_command: root.command().map(str::to_string),
        doc,
    }
}

fn build_selection(
    iface: &str,
    imp: &Implementation,
    command_names: &BTreeSet<&str>,
    provider: &dyn ImplementationProvider,
) -> Element {
    let mut selection = Element::new("selection");
    selection.attrs = imp.attrs.clone();
    selection.remove_attr("stability");
    selection.remove_attr("main");
    selection.remove_attr("self-test");
    selection.set_attr("interface", iface);
    if selection.attr("from-feed") == Some(iface) {
        selection.remove_attr("from-feed");
    }

    if imp.is_dummy() {
        return selection;
    }

    for name in command_names {
        if let Some(command) = imp.commands.get(*name) {
            selection.children.push(command_node(command, provider));
        }
    }
    for binding in &imp.bindings {
        selection.children.push(binding.clone());
    }
    for dep in &imp.requires {
        if dep.importance != Importance::Restricts && provider.is_dep_needed(dep) {
            selection.children.push(dep.element.clone());
        }
    }
    if let Some(digest) = &imp.manifest_digest {
        selection.children.push(digest.clone());
    }

    selection
}

/// Copy a command node, dropping its dependency children and appending back
/// exactly the ones that are in use and non-restricting.
fn command_node(command: &Rc<Command>, provider: &dyn ImplementationProvider) -> Element {
    let mut node = command.element.clone();
    node.children
        .retain(|child| !matches!(child.name.as_str(), "requires" | "restricts" | "runner"));
    for dep in &command.requires {
        if dep.importance != Importance::Restricts && provider.is_dep_needed(dep) {
            node.children.push(dep.element.clone());
        }
    }
    node
}
