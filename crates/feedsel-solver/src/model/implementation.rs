use std::cell::{OnceCell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use feedsel_version::Version;

use super::dependency::Dependency;
use super::element::Element;

/// A named invocation entry point exported by an implementation.
#[derive(Debug)]
pub struct Command {
    pub name: String,
    pub requires: Vec<Rc<Dependency>>,
    pub bindings: Vec<Element>,
    /// The command's own node, copied into the selections document.
    pub element: Element,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let element = Element::new("command").with_attr("name", name.clone());
        Command {
            name,
            requires: Vec::new(),
            bindings: Vec::new(),
            element,
        }
    }

    /// The command every dummy implementation offers for any requested name.
    pub fn dummy(name: &str) -> Rc<Command> {
        Rc::new(Command::new(name))
    }
}

/// Memoised single-shot reference to a companion source implementation.
pub struct SourceRef {
    cell: OnceCell<Rc<Implementation>>,
    thunk: RefCell<Option<Box<dyn FnOnce() -> Rc<Implementation>>>>,
}

impl SourceRef {
    pub fn lazy(thunk: impl FnOnce() -> Rc<Implementation> + 'static) -> Self {
        SourceRef {
            cell: OnceCell::new(),
            thunk: RefCell::new(Some(Box::new(thunk))),
        }
    }

    pub fn from_value(value: Rc<Implementation>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(value);
        SourceRef {
            cell,
            thunk: RefCell::new(None),
        }
    }

    /// Force the reference. The thunk runs at most once.
    pub fn force(&self) -> Rc<Implementation> {
        self.cell
            .get_or_init(|| {
                let thunk = self
                    .thunk
                    .borrow_mut()
                    .take()
                    .expect("source reference forced without a thunk");
                thunk()
            })
            .clone()
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(source) => write!(f, "SourceRef({})", source.id),
            None => write!(f, "SourceRef(<unforced>)"),
        }
    }
}

/// How an implementation becomes runnable.
#[derive(Debug)]
pub enum ImplKind {
    /// Usable as-is.
    Immediate,
    /// Must be compiled from the referenced source implementation first.
    RequiresCompilation(SourceRef),
}

/// A concrete candidate version of an interface.
#[derive(Debug)]
pub struct Implementation {
    pub id: String,
    pub version: Version,
    pub os: Option<String>,
    pub machine: Option<String>,
    /// Languages this implementation is available in (empty = any).
    pub langs: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub requires: Vec<Rc<Dependency>>,
    pub commands: BTreeMap<String, Rc<Command>>,
    pub bindings: Vec<Element>,
    pub manifest_digest: Option<Element>,
    pub kind: ImplKind,
}

impl Implementation {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        let id = id.into();
        let mut attrs = BTreeMap::new();
        attrs.insert("id".to_string(), id.clone());
        attrs.insert("version".to_string(), version.to_string());
        Implementation {
            id,
            version,
            os: None,
            machine: None,
            langs: Vec::new(),
            attrs,
            requires: Vec::new(),
            commands: BTreeMap::new(),
            bindings: Vec::new(),
            manifest_digest: None,
            kind: ImplKind::Immediate,
        }
    }

    /// Bare implementation, mostly for tests.
    pub fn simple(id: impl Into<String>, version: Version) -> Self {
        Implementation::new(id, version)
    }

    /// The sentinel candidate appended in diagnostic mode: satisfies every
    /// restriction and provides any requested command.
    pub fn dummy() -> Implementation {
        let mut dummy = Implementation::new("[dummy]", Version::dummy());
        dummy.attrs.insert("local-path".to_string(), "/dummy".to_string());
        dummy
    }

    pub fn is_dummy(&self) -> bool {
        self.version.is_dummy()
    }

    pub fn is_source(&self) -> bool {
        self.machine.as_deref() == Some(super::machine::SOURCE_MACHINE)
    }

    /// The command this implementation offers under `name`. Dummy
    /// implementations offer every command.
    pub fn command(&self, name: &str) -> Option<Rc<Command>> {
        if self.is_dummy() {
            Some(Command::dummy(name))
        } else {
            self.commands.get(name).cloned()
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_offers_any_command() {
        let dummy = Implementation::dummy();
        assert!(dummy.is_dummy());
        let cmd = dummy.command("anything").unwrap();
        assert_eq!(cmd.name, "anything");
    }

    #[test]
    fn test_regular_impl_commands() {
        let mut imp = Implementation::simple("a1", Version::parse("1.0").unwrap());
        imp.commands
            .insert("run".to_string(), Rc::new(Command::new("run")));
        assert!(imp.command("run").is_some());
        assert!(imp.command("test").is_none());
    }

    #[test]
    fn test_source_ref_forces_once() {
        use std::cell::Cell;

        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let source = SourceRef::lazy(move || {
            counter.set(counter.get() + 1);
            Rc::new(Implementation::simple(
                "src",
                Version::parse("1.0").unwrap(),
            ))
        });

        let first = source.force();
        let second = source.force();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_source_machine() {
        let mut imp = Implementation::simple("s", Version::parse("1").unwrap());
        imp.machine = Some("src".to_string());
        assert!(imp.is_source());
    }
}
